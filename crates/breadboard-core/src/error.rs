//! Error types for breadboard-core.

use thiserror::Error;

use crate::element::ComponentId;
use crate::node::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("terminal {terminal} out of range for component with {count} terminals")]
    InvalidTerminal { terminal: usize, count: usize },

    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("wire endpoints must be distinct nodes")]
    SelfLoop,

    #[error("matrix index {index} out of range for dimension {dimension}")]
    Dimension { index: usize, dimension: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
