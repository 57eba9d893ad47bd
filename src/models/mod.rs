//! Domain models for the hackathon registry.
//!
//! # Core Concepts
//!
//! ## Referenced Entities
//!
//! - [`Participant`]: A person who can take part in hackathons, linked to an
//!   external identity.
//! - [`Hackathon`]: An event with a time window that participants register for.
//! - [`Team`]: A group inside one hackathon, led by exactly one participant.
//!
//! ## Owned Entities
//!
//! - [`Registration`]: The record linking one participant to one hackathon,
//!   optionally to a team. Only the registration engine writes these.

mod hackathon;
mod participant;
mod registration;
mod team;

pub use hackathon::*;
pub use participant::*;
pub use registration::*;
pub use team::*;
