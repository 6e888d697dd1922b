//! Service layer: authentication and race management.
//!
//! Services own the business rules and error taxonomy; they receive the
//! repository handle at construction and never touch transport concerns.

pub mod auth;
pub mod error;
mod ids;
pub mod leaderboard;
pub mod passwords;
pub mod race;
pub mod roster;
pub mod tokens;

pub use auth::{require_role, AuthService, LoginOutcome, Registration};
pub use error::{ServiceError, ServiceResult};
pub use leaderboard::{compute_leaderboard, Leaderboard, LeaderboardEntry};
pub use passwords::{PasswordHasher, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
pub use race::{RaceService, DEFAULT_MUTATION_ATTEMPTS};
pub use tokens::{Claims, TokenIssuer};
