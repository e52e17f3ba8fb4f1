//! Error types for host-tree operations.
//!
//! Simple, flat error hierarchy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(u64),

    #[error("Missing field in tree payload: {0}")]
    MissingField(&'static str),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
