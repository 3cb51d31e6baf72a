//! Database models split into domain-specific modules.

pub mod business;
pub mod review;
pub mod user;

pub use business::*;
pub use review::*;
pub use user::*;
