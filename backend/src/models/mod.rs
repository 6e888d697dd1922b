pub mod macros;
pub mod race;
pub mod time;
pub mod user;

pub use race::*;
pub use time::*;
pub use user::*;
