// SPDX-License-Identifier: Apache-2.0

//! Validation errors raised while editing or synthesizing a table definition.

use thiserror::Error;

/// Every way a table definition can be rejected before SQL is produced.
///
/// Each variant maps to a distinct, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdlError {
    #[error("Table name is required")]
    EmptyTableName,

    #[error("'{name}' is not a valid identifier (letters, digits and underscore, not starting with a digit, at most 64 characters)")]
    InvalidIdentifier { name: String },

    #[error("The table must contain at least one field")]
    NoFields,

    #[error("Field #{position} has an empty name")]
    EmptyFieldName { position: usize },

    #[error("Duplicate field name: {name}")]
    DuplicateFieldName { name: String },

    #[error("At least one field must be marked as primary key")]
    MissingPrimaryKey,

    #[error("Cannot delete the last remaining field")]
    LastField,

    #[error("Field index {index} is out of range (table has {len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Field '{name}' has an invalid column type '{data_type}'")]
    InvalidColumnType { name: String, data_type: String },

    #[error("Field '{name}' must have a length greater than zero")]
    InvalidLength { name: String },

    #[error("Field '{name}' has {decimals} decimals, which exceeds its length {length}")]
    DecimalsExceedLength {
        name: String,
        length: u32,
        decimals: u32,
    },

    #[error("Field '{name}' requires at least one option value")]
    MissingOptions { name: String },

    #[error("Field '{name}' is not marked as new but does not exist in the original table")]
    UnknownOriginalField { name: String },
}

pub type DdlResult<T> = Result<T, DdlError>;
