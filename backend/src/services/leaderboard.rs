//! Leaderboard derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Race, UserId};
use crate::models::elapsed_seconds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    /// Snapshot taken when the racer joined.
    pub username: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Elapsed seconds; negative only for out-of-order explicit timestamps.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub race_name: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Finished racers, fastest first. Ties keep roster order.
pub fn compute_leaderboard(race: &Race) -> Leaderboard {
    let mut entries: Vec<LeaderboardEntry> = race
        .racers
        .iter()
        .filter_map(|racer| {
            let (start, end) = (racer.start_time?, racer.end_time?);
            Some(LeaderboardEntry {
                user_id: racer.user_id,
                username: racer.username.clone(),
                start_time: start,
                end_time: end,
                duration: elapsed_seconds(start, end),
            })
        })
        .collect();

    // slice::sort_by is stable
    entries.sort_by(|a, b| a.duration.total_cmp(&b.duration));

    Leaderboard {
        race_name: race.name.clone(),
        leaderboard: entries,
    }
}
