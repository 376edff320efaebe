//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and filesystem effects into use-case APIs.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod case_service;
pub mod client_service;
