//! Hackathon registration and team membership.
//!
//! The [`registration::RegistrationEngine`] admits participants into a
//! hackathon and the [`team::TeamAuthority`] guards who may change a team.
//! Both work against the [`db::Database`] entity store; [`api`] exposes them
//! over HTTP.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod registration;
pub mod team;
