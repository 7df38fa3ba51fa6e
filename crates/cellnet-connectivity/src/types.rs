// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for connection generation.
*/

use crate::expression::ExpressionError;
use crate::geometry::SynapticRole;

/// Index of a cell inside its population
pub type CellIndex = usize;

/// Result type for connectivity operations
pub type ConnResult<T> = Result<T, ConnError>;

/// Errors that can occur while generating, querying or persisting connections
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    #[error("Invalid connectivity spec: {0}")]
    InvalidSpec(String),

    #[error("Unknown population: {0}")]
    UnknownPopulation(String),

    #[error("Cell index {index} out of range for population {group} (size {size})")]
    CellIndexOutOfRange {
        group: String,
        index: CellIndex,
        size: usize,
    },

    #[error(
        "No {role} attachment point on cell {cell_index} of {cell_group} for synapse types {synapse_types:?}"
    )]
    NoAttachmentPoint {
        cell_group: String,
        cell_index: CellIndex,
        role: SynapticRole,
        synapse_types: Vec<String>,
    },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("Invalid number generator: {0}")]
    InvalidGenerator(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
