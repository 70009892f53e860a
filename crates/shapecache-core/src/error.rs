//! Error types for shapecache

use std::collections::TryReserveError;

use thiserror::Error;

use crate::types::NodeId;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for shapecache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("Script variant {index} out of range (store holds {count})")]
    ScriptOutOfRange { index: usize, count: usize },

    #[error("Cache entry has no glyph graph")]
    EmptyEntry,

    #[error("Node {node:?} references {target:?} outside the captured sub-run")]
    ForeignReference { node: NodeId, target: NodeId },

    #[error("Invalid character range {start}..{end} for run of {len} characters")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Shaping failed: {0}")]
    Shaping(#[from] ShapingError),

    #[error("Font error: {0}")]
    Font(#[from] FontError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Structural failures of a live glyph run
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("Node {0:?} does not exist in this run")]
    InvalidNode(NodeId),

    #[error("Node chain from {first:?} never reaches {last:?}")]
    BrokenChain { first: NodeId, last: NodeId },

    #[error("Scope state does not belong to the active scope")]
    ScopeMismatch,

    #[error("Replacement graph is empty")]
    EmptyReplacement,

    #[error("Character index {0} is out of range")]
    CharOutOfRange(usize),
}

/// Shaping engine failures
#[derive(Debug, Error)]
pub enum ShapingError {
    #[error("Pass range {start}..{end} exceeds {passes} passes")]
    PassOutOfRange {
        start: usize,
        end: usize,
        passes: usize,
    },

    #[error("Run error: {0}")]
    Run(#[from] RunError),
}

/// Character map loading errors
#[derive(Debug, Error)]
pub enum FontError {
    #[error("Invalid font data")]
    InvalidData,

    #[error("Font has no usable character map")]
    MissingCharMap,

    #[error("Font file not found: {0}")]
    FileNotFound(String),
}
