//! Roster mutations and the per-racer state machine.
//!
//! These functions only touch the in-memory race document; persistence and
//! retry on concurrent writes are the caller's job. Each one either applies
//! its change completely or leaves the race untouched.
//!
//! ```text
//! NotStarted --start--> Running --end--> Finished
//! ```

use chrono::{DateTime, Utc};

use super::error::{ServiceError, ServiceResult};
use crate::api::{Race, RacerEntry, RacerState, User, UserId};

fn not_in_race() -> ServiceError {
    ServiceError::InvalidState("Racer not found in race".to_string())
}

/// Append `user` with no timestamps and a snapshot of the current username.
pub fn add_racer(race: &mut Race, user: &User) -> ServiceResult<()> {
    if race.has_racer(user.id) {
        return Err(ServiceError::Conflict("Racer already in race".to_string()));
    }
    race.racers.push(RacerEntry::new(user.id, user.username.clone()));
    Ok(())
}

/// Remove the entry for `user_id`, keeping the order of everyone else.
pub fn remove_racer(race: &mut Race, user_id: UserId) -> ServiceResult<RacerEntry> {
    let index = race
        .racers
        .iter()
        .position(|r| r.user_id == user_id)
        .ok_or_else(not_in_race)?;
    Ok(race.racers.remove(index))
}

/// `at` is only evaluated once the transition is known to be legal, so a
/// bad timestamp never masks a roster or state error.
pub fn start_racer<F>(race: &mut Race, user_id: UserId, at: F) -> ServiceResult<DateTime<Utc>>
where
    F: FnOnce() -> ServiceResult<DateTime<Utc>>,
{
    let entry = race.entry_mut(user_id).ok_or_else(not_in_race)?;
    match entry.state() {
        RacerState::NotStarted => {
            let at = at()?;
            entry.start_time = Some(at);
            Ok(at)
        }
        RacerState::Running | RacerState::Finished => {
            Err(ServiceError::InvalidState("Racer already started".to_string()))
        }
    }
}

pub fn end_racer<F>(race: &mut Race, user_id: UserId, at: F) -> ServiceResult<DateTime<Utc>>
where
    F: FnOnce() -> ServiceResult<DateTime<Utc>>,
{
    let entry = race.entry_mut(user_id).ok_or_else(not_in_race)?;
    match entry.state() {
        RacerState::NotStarted => Err(ServiceError::InvalidState(
            "Racer has not started".to_string(),
        )),
        RacerState::Running => {
            let at = at()?;
            entry.end_time = Some(at);
            Ok(at)
        }
        RacerState::Finished => Err(ServiceError::InvalidState(
            "Racer already finished".to_string(),
        )),
    }
}
