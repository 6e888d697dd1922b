//! Public API surface for the race backend.
//!
//! This file consolidates identifier types and the DTOs exchanged with
//! clients. All types derive Serialize/Deserialize for JSON serialization.

pub use crate::models::{
    GeoPoint, NewRace, Race, RaceFilter, RaceUpdate, RaceView, RacerEntry, RacerState, RacerView,
    Role, TimeInput, User, UserProfile, UserSummary, UserUpdate,
};
pub use crate::services::leaderboard::{Leaderboard, LeaderboardEntry};
pub use crate::services::tokens::Claims;

crate::define_id_type!(UserId);
crate::define_id_type!(RaceId);

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
