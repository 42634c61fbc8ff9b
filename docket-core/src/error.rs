//! Contract errors raised while decoding remote payloads

use thiserror::Error;

/// A response payload did not carry a field the service contract requires.
///
/// Storing such a payload would corrupt the tracker maps, so it is rejected
/// at the decode boundary instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("{entity} response is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}

impl ContractViolation {
    pub(crate) fn missing(entity: &'static str, field: &'static str) -> Self {
        Self::MissingField { entity, field }
    }
}
