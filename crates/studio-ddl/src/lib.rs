// SPDX-License-Identifier: Apache-2.0

//! Table designer core for MySQL Studio.
//!
//! Holds everything needed to edit a table definition in memory and turn it
//! into DDL text:
//!
//! - [`catalog`]: the static registry of supported column types
//! - [`field`]: the editable column model and its normalization rules
//! - [`table`]: ordered field lists with add/delete/move/update operations
//! - [`synth`]: `CREATE TABLE` and diff-based `ALTER TABLE` synthesis
//!
//! Nothing in this crate performs I/O. Generated SQL is handed to the
//! caller, which decides whether and where to execute it.

pub mod catalog;
pub mod error;
pub mod field;
pub mod synth;
pub mod table;

mod lenient;

pub use catalog::{descriptor_for, TypeDescriptor, TYPE_CATALOG};
pub use error::{DdlError, DdlResult};
pub use field::{EditContext, FieldSpec, FieldUpdate};
pub use synth::{
    build_column_definition, quote_ident, quote_literal, synthesize_alter, synthesize_create,
    AlterOutcome, AlterStatement, Nullability,
};
pub use table::{AlterSession, FieldOperation, TableDefinition};
