//! Fatal generation defects.

use crate::variant::{ExclusionRule, Family};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("invalid generator tables: {0}")]
    InvalidTables(String),

    #[error("duplicate {family} kernel name `{name}`")]
    DuplicateName { family: Family, name: String },

    #[error("{family} kernel `{name}` violates exclusion rule: {rule}")]
    ExcludedVariant {
        family: Family,
        name: String,
        rule: ExclusionRule,
    },

    #[error("{family} kernels `{first}` and `{second}` have no strict dispatch order")]
    AmbiguousPriority {
        family: Family,
        first: String,
        second: String,
    },

    #[error("{family} {grouping} grouping covers {found} kernels, expected {expected}")]
    PartitionMismatch {
        family: Family,
        grouping: &'static str,
        expected: usize,
        found: usize,
    },
}
