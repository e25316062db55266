//! # MentorLink Domain
//!
//! Plain data shared by the MentorLink client crates.
//!
//! This crate contains:
//! - Client configuration structures and validation
//! - The typed endpoint catalog
//! - Domain constants and error types
//!
//! ## Architecture
//! - No dependencies on other MentorLink crates
//! - Only external dependencies allowed
//! - No I/O; loading configuration lives in `mentorlink-infra`

pub mod config;
pub mod constants;
pub mod endpoints;
pub mod errors;
pub mod macros;

// Re-export commonly used items
pub use config::*;
pub use endpoints::{
    ConversationId, Endpoint, HttpMethod, MentorId, NotificationId, ProjectId, SessionId,
};
pub use errors::*;
