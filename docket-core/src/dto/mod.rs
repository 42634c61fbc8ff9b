//! Data Transfer Objects for the pipeline service API
//!
//! Request bodies are serialized as-is. Response payloads are deserialized
//! into permissive `*Payload` structs and then validated into domain values,
//! so a malformed response is rejected in exactly one place.

pub mod batch;
pub mod execution;
pub mod pipeline;
