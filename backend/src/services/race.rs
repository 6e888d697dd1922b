//! Race management: race CRUD, roster changes, timing and leaderboards.
//!
//! Every read-modify-write of a race goes through [`RaceService::mutate`],
//! which applies a pure roster function to a freshly read document and
//! stores it only if nobody else wrote the race in between. On a lost race
//! the mutation is re-evaluated against the new document, so two concurrent
//! `add_racer` calls for the same user can never both succeed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::require_role;
use super::error::{ServiceError, ServiceResult};
use super::ids::{parse_race_id, parse_user_id};
use super::leaderboard::{compute_leaderboard, Leaderboard};
use super::roster;
use super::tokens::Claims;
use crate::api::{
    NewRace, Race, RaceFilter, RaceId, RaceUpdate, RaceView, Role, TimeInput, UserId,
};
use crate::db::{FullRepository, RaceRepository, UserRepository};
use crate::models::instant_or_now;

pub const DEFAULT_MUTATION_ATTEMPTS: u32 = 3;

pub struct RaceService {
    repo: Arc<dyn FullRepository>,
    mutation_attempts: u32,
}

fn validate_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Race name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_points(points: &[Option<crate::api::GeoPoint>]) -> ServiceResult<()> {
    points
        .iter()
        .flatten()
        .try_for_each(|p| p.validate().map_err(ServiceError::InvalidInput))
}

impl RaceService {
    pub fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self::with_mutation_attempts(repo, DEFAULT_MUTATION_ATTEMPTS)
    }

    pub fn with_mutation_attempts(repo: Arc<dyn FullRepository>, attempts: u32) -> Self {
        Self {
            repo,
            mutation_attempts: attempts.max(1),
        }
    }

    // =========================================================================
    // Race CRUD
    // =========================================================================

    pub async fn create_race(&self, caller: &Claims, new_race: NewRace) -> ServiceResult<RaceId> {
        require_role(caller, Role::Admin)?;
        let name = validate_name(&new_race.name)?;
        validate_points(&[new_race.starting_point, new_race.ending_point])?;

        let race = Race::create(NewRace { name, ..new_race }, Utc::now());
        let stored = self.repo.insert_race(&race).await?;
        log::info!("Race '{}' created by {}", stored.name, caller.username);
        Ok(stored.id)
    }

    pub async fn list_races(&self) -> ServiceResult<Vec<RaceView>> {
        let races = self.repo.find_races(&RaceFilter::default()).await?;
        self.views(races).await
    }

    /// Looks `key` up as a race id when it parses as one, otherwise as a race name.
    pub async fn get_race(&self, key: &str) -> ServiceResult<RaceView> {
        let key = key.trim();
        let race = match RaceId::parse(key) {
            Some(id) => self.repo.get_race(id).await?,
            None => self
                .repo
                .find_races(&RaceFilter::default().named(key))
                .await?
                .into_iter()
                .next(),
        };
        self.view(race.ok_or_else(ServiceError::race_not_found)?).await
    }

    pub async fn update_race(
        &self,
        caller: &Claims,
        race_id: &str,
        mut update: RaceUpdate,
    ) -> ServiceResult<RaceView> {
        require_role(caller, Role::Admin)?;
        let id = parse_race_id(race_id)?;
        if let Some(name) = &update.name {
            update.name = Some(validate_name(name)?);
        }
        validate_points(&[
            update.starting_point.flatten(),
            update.ending_point.flatten(),
        ])?;

        let (race, ()) = self
            .mutate(id, |race| {
                update.apply_to(race);
                Ok(())
            })
            .await?;
        self.view(race).await
    }

    pub async fn delete_race(&self, caller: &Claims, race_id: &str) -> ServiceResult<()> {
        require_role(caller, Role::Admin)?;
        let id = parse_race_id(race_id)?;
        let deleted = self
            .repo
            .delete_race(id)
            .await?
            .ok_or_else(ServiceError::race_not_found)?;
        log::info!("Race '{}' deleted by {}", deleted.name, caller.username);
        Ok(())
    }

    // =========================================================================
    // Roster and timing
    // =========================================================================

    pub async fn add_racer(&self, race_id: &str, user_id: &str) -> ServiceResult<RaceView> {
        let (race_id, user_id) = (parse_race_id(race_id)?, parse_user_id(user_id)?);
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Racer not found".to_string()))?;

        let (race, ()) = self
            .mutate(race_id, |race| roster::add_racer(race, &user))
            .await?;
        log::info!("Racer {} added to race '{}'", user.username, race.name);
        self.view(race).await
    }

    pub async fn remove_racer(&self, race_id: &str, user_id: &str) -> ServiceResult<RaceView> {
        let (race_id, user_id) = (parse_race_id(race_id)?, parse_user_id(user_id)?);
        self.repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Racer not found".to_string()))?;

        let (race, removed) = self
            .mutate(race_id, |race| roster::remove_racer(race, user_id))
            .await?;
        log::info!("Racer {} removed from race '{}'", removed.username, race.name);
        self.view(race).await
    }

    /// Records a start time: `at` when supplied, the current time otherwise.
    pub async fn start_racer(
        &self,
        race_id: &str,
        user_id: &str,
        at: Option<&TimeInput>,
    ) -> ServiceResult<DateTime<Utc>> {
        let (race_id, user_id) = (parse_race_id(race_id)?, parse_user_id(user_id)?);
        let now = Utc::now();

        let (_, recorded) = self
            .mutate(race_id, |race| {
                roster::start_racer(race, user_id, || {
                    instant_or_now(at, now).map_err(ServiceError::from)
                })
            })
            .await
            .inspect_err(|e| log_rejected("start", race_id, user_id, e))?;
        log::info!("Start time recorded for racer {} in race {}: {}", user_id, race_id, recorded);
        Ok(recorded)
    }

    /// Records an end time: `at` when supplied, the current time otherwise.
    pub async fn end_racer(
        &self,
        race_id: &str,
        user_id: &str,
        at: Option<&TimeInput>,
    ) -> ServiceResult<DateTime<Utc>> {
        let (race_id, user_id) = (parse_race_id(race_id)?, parse_user_id(user_id)?);
        let now = Utc::now();

        let (_, recorded) = self
            .mutate(race_id, |race| {
                roster::end_racer(race, user_id, || {
                    instant_or_now(at, now).map_err(ServiceError::from)
                })
            })
            .await
            .inspect_err(|e| log_rejected("end", race_id, user_id, e))?;
        log::info!("End time recorded for racer {} in race {}: {}", user_id, race_id, recorded);
        Ok(recorded)
    }

    pub async fn leaderboard(&self, race_id: &str) -> ServiceResult<Leaderboard> {
        let id = parse_race_id(race_id)?;
        let race = self
            .repo
            .get_race(id)
            .await?
            .ok_or_else(ServiceError::race_not_found)?;
        Ok(compute_leaderboard(&race))
    }

    // =========================================================================
    // Racer queries
    // =========================================================================

    pub async fn races_for_racer(&self, user_id: &str) -> ServiceResult<Vec<RaceView>> {
        let user_id = parse_user_id(user_id)?;
        if self.repo.get_user(user_id).await?.is_none() {
            return Err(ServiceError::user_not_found());
        }
        let races = self.repo.find_races(&RaceFilter::with_racer(user_id)).await?;
        self.views(races).await
    }

    /// Races called `race_name` whose roster lists `username`.
    pub async fn races_for_racer_by_name(
        &self,
        username: &str,
        race_name: &str,
    ) -> ServiceResult<Vec<RaceView>> {
        let username = username.trim();
        if self.repo.find_user_by_username(username).await?.is_none() {
            return Err(ServiceError::user_not_found());
        }
        let filter = RaceFilter {
            name: Some(race_name.trim().to_string()),
            racer_id: None,
            racer_username: Some(username.to_string()),
        };
        let races = self.repo.find_races(&filter).await?;
        if races.is_empty() {
            return Err(ServiceError::NotFound(
                "No races found for this user in the specified race".to_string(),
            ));
        }
        self.views(races).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Read, apply `apply`, and write back under the read revision.
    ///
    /// A revision conflict re-reads and re-applies, up to the configured number
    /// of attempts. Errors from `apply` are returned without writing anything.
    async fn mutate<T, F>(&self, id: RaceId, mut apply: F) -> ServiceResult<(Race, T)>
    where
        T: Send,
        F: FnMut(&mut Race) -> ServiceResult<T> + Send,
    {
        for attempt in 1..=self.mutation_attempts {
            let mut race = self
                .repo
                .get_race(id)
                .await?
                .ok_or_else(ServiceError::race_not_found)?;
            let output = apply(&mut race)?;

            match self.repo.replace_race(&race).await {
                Ok(Some(stored)) => return Ok((stored, output)),
                Ok(None) => return Err(ServiceError::race_not_found()),
                Err(e) if e.is_revision_conflict() => {
                    log::debug!(
                        "Race {} changed underneath us (attempt {}/{}): {}",
                        id,
                        attempt,
                        self.mutation_attempts,
                        e
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        log::warn!(
            "Giving up on race {} after {} conflicting writes",
            id,
            self.mutation_attempts
        );
        Err(ServiceError::Conflict(
            "Race was modified concurrently, please retry".to_string(),
        ))
    }

    async fn view(&self, race: Race) -> ServiceResult<RaceView> {
        let mut views = self.views(vec![race]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::Internal("race projection was empty".to_string()))
    }

    /// Resolves every racer's current username in one store round trip.
    async fn views(&self, races: Vec<Race>) -> ServiceResult<Vec<RaceView>> {
        let mut ids: Vec<UserId> = races
            .iter()
            .flat_map(|race| race.racers.iter().map(|r| r.user_id))
            .collect();
        ids.sort();
        ids.dedup();

        let names: HashMap<UserId, String> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.repo.usernames_for(&ids).await?
        };
        Ok(races
            .into_iter()
            .map(|race| RaceView::project(race, |id| names.get(&id).cloned()))
            .collect())
    }
}

fn log_rejected(action: &str, race_id: RaceId, user_id: UserId, err: &ServiceError) {
    if matches!(err, ServiceError::InvalidState(_)) {
        log::warn!("Rejected {} for racer {} in race {}: {}", action, user_id, race_id, err);
    }
}

#[cfg(test)]
#[path = "race_tests.rs"]
mod tests;
