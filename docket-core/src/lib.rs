//! Docket Core
//!
//! Core types for tracking document-processing jobs submitted to a remote
//! pipeline service.
//!
//! This crate contains:
//! - Domain types: pipeline configurations, executions, batches
//! - DTOs: request bodies and raw response payloads
//! - The decode step that validates raw payloads into domain values

pub mod domain;
pub mod dto;
pub mod error;

pub use error::ContractViolation;
