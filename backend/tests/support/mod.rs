#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

#[cfg(feature = "http-server")]
mod app;
#[cfg(feature = "http-server")]
pub use app::{TestApp, TEST_SECRET};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with the given variables set (`Some`) or removed (`None`),
/// restoring the previous values afterwards, even on panic.
///
/// Calls are serialized: the environment is process-global and the test
/// harness runs tests on several threads.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}
