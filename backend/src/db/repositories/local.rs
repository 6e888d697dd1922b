//! In-memory repository used for local development and tests.
//!
//! Documents are kept in insertion order behind `parking_lot` locks. Each
//! method holds its lock for the whole read-check-write, so username
//! uniqueness and revision checks are atomic with respect to other callers.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::api::{Race, RaceFilter, RaceId, User, UserId};
use crate::db::repository::{
    ErrorContext, FullRepository, RaceRepository, RepositoryError, RepositoryResult,
    UserRepository,
};

/// Insertion-ordered map of documents.
#[derive(Debug)]
struct Collection<K, V> {
    docs: HashMap<K, V>,
    order: Vec<K>,
}

impl<K: Copy + Eq + Hash, V: Clone> Collection<K, V> {
    fn new() -> Self {
        Self {
            docs: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, key: K, value: V) {
        if self.docs.insert(key, value).is_none() {
            self.order.push(key);
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.docs.get(key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.docs.get_mut(key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.docs.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|k| self.docs.get(k))
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

/// In-memory document store implementing every repository trait.
pub struct LocalRepository {
    users: RwLock<Collection<UserId, User>>,
    races: RwLock<Collection<RaceId, Race>>,
    offline: AtomicBool,
    pending_conflicts: AtomicU32,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Collection::new()),
            races: RwLock::new(Collection::new()),
            offline: AtomicBool::new(false),
            pending_conflicts: AtomicU32::new(0),
        }
    }

    /// Simulate an unreachable store: every call fails with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `replace_race` fail with a revision conflict,
    /// as if another writer had updated the race in between.
    pub fn inject_revision_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    pub fn race_count(&self) -> usize {
        self.races.read().len()
    }

    fn ensure_online(&self, operation: &str) -> RepositoryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::connection_with_context(
                "local store is offline",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    fn take_injected_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_username(operation: &str, username: &str) -> RepositoryError {
    RepositoryError::duplicate_with_context(
        format!("username '{}' already exists", username),
        ErrorContext::new(operation)
            .with_entity("user")
            .with_details("unique=username"),
    )
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn insert_user(&self, user: &User) -> RepositoryResult<User> {
        self.ensure_online("insert_user")?;
        let mut users = self.users.write();
        if users.values().any(|u| u.username == user.username) {
            return Err(duplicate_username("insert_user", &user.username));
        }
        if users.get(&user.id).is_some() {
            return Err(RepositoryError::duplicate_with_context(
                "user id already exists",
                ErrorContext::new("insert_user")
                    .with_entity("user")
                    .with_entity_id(user.id),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.ensure_online("get_user")?;
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.ensure_online("find_user_by_username")?;
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<Option<User>> {
        self.ensure_online("update_user")?;
        let mut users = self.users.write();
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(duplicate_username("update_user", &user.username));
        }
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(Some(stored.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.ensure_online("delete_user")?;
        Ok(self.users.write().remove(&id))
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.ensure_online("list_users")?;
        Ok(self.users.read().values().cloned().collect())
    }

    async fn usernames_for(&self, ids: &[UserId]) -> RepositoryResult<HashMap<UserId, String>> {
        self.ensure_online("usernames_for")?;
        let users = self.users.read();
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.username.clone())))
            .collect())
    }
}

#[async_trait]
impl RaceRepository for LocalRepository {
    async fn insert_race(&self, race: &Race) -> RepositoryResult<Race> {
        self.ensure_online("insert_race")?;
        let mut races = self.races.write();
        if races.get(&race.id).is_some() {
            return Err(RepositoryError::duplicate_with_context(
                "race id already exists",
                ErrorContext::new("insert_race")
                    .with_entity("race")
                    .with_entity_id(race.id),
            ));
        }
        let mut stored = race.clone();
        stored.revision = 1;
        races.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_race(&self, id: RaceId) -> RepositoryResult<Option<Race>> {
        self.ensure_online("get_race")?;
        Ok(self.races.read().get(&id).cloned())
    }

    async fn find_races(&self, filter: &RaceFilter) -> RepositoryResult<Vec<Race>> {
        self.ensure_online("find_races")?;
        Ok(self
            .races
            .read()
            .values()
            .filter(|race| filter.matches(race))
            .cloned()
            .collect())
    }

    async fn replace_race(&self, race: &Race) -> RepositoryResult<Option<Race>> {
        self.ensure_online("replace_race")?;
        let context = || {
            ErrorContext::new("replace_race")
                .with_entity("race")
                .with_entity_id(race.id)
        };

        let mut races = self.races.write();
        let Some(stored) = races.get_mut(&race.id) else {
            return Ok(None);
        };
        if self.take_injected_conflict() || stored.revision != race.revision {
            return Err(RepositoryError::revision_conflict(
                format!(
                    "expected revision {}, found {}",
                    race.revision, stored.revision
                ),
                context(),
            ));
        }
        let mut next = race.clone();
        next.revision = stored.revision + 1;
        *stored = next.clone();
        Ok(Some(next))
    }

    async fn delete_race(&self, id: RaceId) -> RepositoryResult<Option<Race>> {
        self.ensure_online("delete_race")?;
        Ok(self.races.write().remove(&id))
    }
}

#[async_trait]
impl FullRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }
}
