//! axum HTTP surface.
//!
//! ```text
//! request ─▶ CORS ─▶ trace ─▶ compression ─▶ error details ─▶ handler
//!                                                              │
//!                                       AuthUser / ApiJson extractors
//!                                                              │
//!                                        AuthService / RaceService
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;
