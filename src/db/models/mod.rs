//! Database models split into domain-specific modules.

pub mod client;
pub mod client_case;
pub mod user;

pub use client::*;
pub use client_case::*;
pub use user::*;
