//! Race store trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{Race, RaceFilter, RaceId};

/// Repository trait for race documents (including their embedded rosters).
///
/// Writes to an existing race go through [`RaceRepository::replace_race`],
/// which is guarded by the document's `revision`: the write only lands if the
/// stored revision still equals the one the caller read.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait RaceRepository: Send + Sync {
    /// Persist a new race. The stored copy starts at revision 1.
    async fn insert_race(&self, race: &Race) -> RepositoryResult<Race>;

    /// Fetch a race by id, `None` if absent.
    async fn get_race(&self, id: RaceId) -> RepositoryResult<Option<Race>>;

    /// Fetch races matching `filter`, in creation order.
    async fn find_races(&self, filter: &RaceFilter) -> RepositoryResult<Vec<Race>>;

    /// Replace a stored race if its revision is unchanged.
    ///
    /// # Returns
    /// * `Ok(Some(Race))` - The stored race, with its revision bumped
    /// * `Ok(None)` - If the race no longer exists
    /// * `Err(RepositoryError::RevisionConflict)` - If another writer got there first
    async fn replace_race(&self, race: &Race) -> RepositoryResult<Option<Race>>;

    /// Delete a race, returning the removed document if it existed.
    async fn delete_race(&self, id: RaceId) -> RepositoryResult<Option<Race>>;
}
