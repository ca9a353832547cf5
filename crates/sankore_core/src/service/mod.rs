//! Catalog use-case services.
//!
//! # Responsibility
//! - Orchestrate store mutations and repository flushes into use-case APIs.
//! - Keep front ends decoupled from storage details.

pub mod library_service;
pub mod stats;
