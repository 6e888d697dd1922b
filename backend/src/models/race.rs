use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{RaceId, UserId};

/// Geographic coordinate pair attached to a race as start or finish point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err("Latitude must be between -90 and 90 degrees".to_string());
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err("Longitude must be between -180 and 180 degrees".to_string());
        }
        Ok(())
    }
}

/// Progress of a single racer, derived from which timestamps are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacerState {
    NotStarted,
    Running,
    Finished,
}

/// Roster record embedded in a race.
///
/// `username` is a snapshot taken when the racer was added and is not kept in
/// sync with later profile changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerEntry {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl RacerEntry {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn state(&self) -> RacerState {
        match (self.start_time, self.end_time) {
            (_, Some(_)) => RacerState::Finished,
            (Some(_), None) => RacerState::Running,
            (None, None) => RacerState::NotStarted,
        }
    }
}

/// Race document as persisted in the race store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub id: RaceId,
    pub name: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub starting_point: Option<GeoPoint>,
    #[serde(default)]
    pub ending_point: Option<GeoPoint>,
    #[serde(default)]
    pub racers: Vec<RacerEntry>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token maintained by the store.
    #[serde(skip)]
    pub revision: u64,
}

impl Race {
    /// Build a fresh race with an empty roster.
    pub fn create(new_race: NewRace, now: DateTime<Utc>) -> Self {
        Self {
            id: RaceId::generate(),
            name: new_race.name,
            start_time: new_race.start_time,
            end_time: new_race.end_time,
            description: new_race.description,
            starting_point: new_race.starting_point,
            ending_point: new_race.ending_point,
            racers: Vec::new(),
            created_at: now,
            revision: 0,
        }
    }

    pub fn entry(&self, user_id: UserId) -> Option<&RacerEntry> {
        self.racers.iter().find(|r| r.user_id == user_id)
    }

    pub fn entry_mut(&mut self, user_id: UserId) -> Option<&mut RacerEntry> {
        self.racers.iter_mut().find(|r| r.user_id == user_id)
    }

    pub fn has_racer(&self, user_id: UserId) -> bool {
        self.entry(user_id).is_some()
    }
}

/// Fields accepted when creating a race.
#[derive(Debug, Clone, Default)]
pub struct NewRace {
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub starting_point: Option<GeoPoint>,
    pub ending_point: Option<GeoPoint>,
}

/// Partial race update.
///
/// The doubly optional fields separate "leave unchanged" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct RaceUpdate {
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub description: Option<String>,
    pub starting_point: Option<Option<GeoPoint>>,
    pub ending_point: Option<Option<GeoPoint>>,
}

impl RaceUpdate {
    pub fn apply_to(&self, race: &mut Race) {
        if let Some(name) = &self.name {
            race.name = name.clone();
        }
        if let Some(start_time) = self.start_time {
            race.start_time = Some(start_time);
        }
        if let Some(end_time) = self.end_time {
            race.end_time = end_time;
        }
        if let Some(description) = &self.description {
            race.description = Some(description.clone());
        }
        if let Some(point) = self.starting_point {
            race.starting_point = point;
        }
        if let Some(point) = self.ending_point {
            race.ending_point = point;
        }
    }
}

/// Query over the race store. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceFilter {
    pub name: Option<String>,
    pub racer_id: Option<UserId>,
    pub racer_username: Option<String>,
}

impl RaceFilter {
    pub fn with_racer(user_id: UserId) -> Self {
        Self {
            racer_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn matches(&self, race: &Race) -> bool {
        if let Some(name) = &self.name {
            if &race.name != name {
                return false;
            }
        }
        if let Some(user_id) = self.racer_id {
            if !race.has_racer(user_id) {
                return false;
            }
        }
        if let Some(username) = &self.racer_username {
            if !race.racers.iter().any(|r| &r.username == username) {
                return false;
            }
        }
        true
    }
}

/// Roster entry as shown to clients, with the display name resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerView {
    pub user_id: UserId,
    pub username: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub state: RacerState,
}

/// Race as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceView {
    pub id: RaceId,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub starting_point: Option<GeoPoint>,
    pub ending_point: Option<GeoPoint>,
    pub racers: Vec<RacerView>,
    pub created_at: DateTime<Utc>,
}

impl RaceView {
    /// Project a race, resolving each racer's display name with `resolve`.
    /// Falls back to the stored snapshot when `resolve` yields nothing.
    pub fn project<F>(race: Race, resolve: F) -> Self
    where
        F: Fn(UserId) -> Option<String>,
    {
        let racers = race
            .racers
            .into_iter()
            .map(|entry| {
                let state = entry.state();
                RacerView {
                    username: resolve(entry.user_id).unwrap_or(entry.username),
                    user_id: entry.user_id,
                    start_time: entry.start_time,
                    end_time: entry.end_time,
                    state,
                }
            })
            .collect();

        Self {
            id: race.id,
            name: race.name,
            start_time: race.start_time,
            end_time: race.end_time,
            description: race.description,
            starting_point: race.starting_point,
            ending_point: race.ending_point,
            racers,
            created_at: race.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race_with(entries: Vec<RacerEntry>) -> Race {
        let mut race = Race::create(
            NewRace {
                name: "5k".to_string(),
                ..Default::default()
            },
            Utc::now(),
        );
        race.racers = entries;
        race
    }

    #[test]
    fn test_geo_point_bounds() {
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_racer_state_follows_timestamps() {
        let mut entry = RacerEntry::new(UserId::generate(), "bob");
        assert_eq!(entry.state(), RacerState::NotStarted);
        entry.start_time = Some(Utc::now());
        assert_eq!(entry.state(), RacerState::Running);
        entry.end_time = Some(Utc::now());
        assert_eq!(entry.state(), RacerState::Finished);
    }

    #[test]
    fn test_update_distinguishes_absent_from_null() {
        let mut race = race_with(vec![]);
        race.end_time = Some(Utc::now());
        race.starting_point = Some(GeoPoint::new(1.0, 2.0).unwrap());
        race.description = Some("before".to_string());

        RaceUpdate::default().apply_to(&mut race);
        assert!(race.end_time.is_some());
        assert!(race.starting_point.is_some());

        RaceUpdate {
            end_time: Some(None),
            starting_point: Some(None),
            ..Default::default()
        }
        .apply_to(&mut race);
        assert!(race.end_time.is_none());
        assert!(race.starting_point.is_none());
        assert_eq!(race.description.as_deref(), Some("before"));
        assert_eq!(race.name, "5k");
    }

    #[test]
    fn test_filter_matches_racer_and_name() {
        let bob = UserId::generate();
        let race = race_with(vec![RacerEntry::new(bob, "bob")]);

        assert!(RaceFilter::default().matches(&race));
        assert!(RaceFilter::with_racer(bob).matches(&race));
        assert!(RaceFilter::with_racer(bob).named("5k").matches(&race));
        assert!(!RaceFilter::with_racer(bob).named("10k").matches(&race));
        assert!(!RaceFilter::with_racer(UserId::generate()).matches(&race));
        let by_name = RaceFilter {
            racer_username: Some("bob".to_string()),
            ..Default::default()
        };
        assert!(by_name.matches(&race));
    }

    #[test]
    fn test_projection_falls_back_to_snapshot() {
        let bob = UserId::generate();
        let carol = UserId::generate();
        let race = race_with(vec![
            RacerEntry::new(bob, "bob"),
            RacerEntry::new(carol, "carol-old"),
        ]);

        let view = RaceView::project(race, |id| {
            if id == carol {
                Some("carol".to_string())
            } else {
                None
            }
        });
        assert_eq!(view.racers[0].username, "bob");
        assert_eq!(view.racers[1].username, "carol");
    }

    #[test]
    fn test_revision_is_not_serialized() {
        let mut race = race_with(vec![]);
        race.revision = 7;
        let json = serde_json::to_value(&race).unwrap();
        assert!(json.get("revision").is_none());
        let back: Race = serde_json::from_value(json).unwrap();
        assert_eq!(back.revision, 0);
    }
}
