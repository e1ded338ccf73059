//! Error types for spicemos-core.

use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    #[error("node {0} is not part of the node table")]
    UnknownNode(NodeId),

    #[error("state slot {index} out of range (allocated {len})")]
    StateOutOfRange { index: usize, len: usize },

    #[error("history depth {0} is too shallow (need at least 3)")]
    HistoryDepth(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
