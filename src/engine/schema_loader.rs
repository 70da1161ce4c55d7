// SPDX-License-Identifier: Apache-2.0

//! Schema Loader
//!
//! Reads live column metadata and reshapes it into designer [`FieldSpec`]s.
//! The loaded list doubles as the snapshot an alter session diffs against.

use std::collections::BTreeMap;

use studio_ddl::{descriptor_for, FieldSpec};
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::session_manager::SessionContext;
use crate::engine::types::{ColumnMetadata, DatabaseSchema, StructureColumn};

/// Maps one `information_schema.COLUMNS` row onto a designer field.
pub fn field_from_column(column: &ColumnMetadata) -> FieldSpec {
    let data_type = column.data_type.trim().to_lowercase();
    let descriptor = descriptor_for(&data_type);
    let declared = declared_arguments(&column.full_type);

    let mut field = FieldSpec::new(column.name.clone(), data_type);
    field.not_null = !column.nullable;
    field.is_primary = column.key.eq_ignore_ascii_case("PRI");
    field.auto_increment = column.extra.to_lowercase().contains("auto_increment");
    field.default_value = column.default_value.clone();
    field.comment = Some(column.comment.clone()).filter(|c| !c.is_empty());

    match descriptor {
        Some(d) if d.has_options => {
            field.options = parse_enum_options(&column.full_type);
        }
        // FLOAT/DOUBLE without (M,D) report a precision but must not gain one.
        Some(d) if d.has_decimals => {
            if let Some((length, decimals)) = declared {
                field.length = column.numeric_precision.and_then(to_u32).or(Some(length));
                field.decimals = column.numeric_scale.and_then(to_u32).or(decimals);
            }
        }
        Some(d) if d.has_length => {
            field.length = column
                .character_length
                .and_then(to_u32)
                .or(declared.map(|(length, _)| length));
        }
        Some(_) => {}
        None => {
            if let Some((length, decimals)) = declared {
                field.length = Some(length);
                field.decimals = decimals;
            }
        }
    }

    field
}

fn to_u32(value: u64) -> Option<u32> {
    u32::try_from(value).ok()
}

/// Numeric arguments of a column type, e.g. `decimal(10,2)` -> `(10, Some(2))`.
fn declared_arguments(full_type: &str) -> Option<(u32, Option<u32>)> {
    let open = full_type.find('(')?;
    let close = full_type[open..].find(')')? + open;
    let mut args = full_type[open + 1..close].split(',').map(str::trim);
    let length = args.next()?.parse().ok()?;
    let decimals = match args.next() {
        Some(raw) => Some(raw.parse().ok()?),
        None => None,
    };
    Some((length, decimals))
}

/// Parses the quoted members of `enum('a','b')` / `set('x','y')`.
///
/// Quotes inside members are doubled by MySQL (`'it''s'`); commas inside
/// quotes belong to the member.
pub fn parse_enum_options(full_type: &str) -> Vec<String> {
    let Some(open) = full_type.find('(') else {
        return Vec::new();
    };
    let Some(close) = full_type.rfind(')') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let mut options = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = full_type[open + 1..close].chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('\'', false) => in_quotes = true,
            ('\'', true) if chars.peek() == Some(&'\'') => {
                chars.next();
                current.push('\'');
            }
            ('\'', true) => {
                in_quotes = false;
                options.push(std::mem::take(&mut current));
            }
            ('\\', true) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (_, true) => current.push(c),
            (_, false) => {}
        }
    }

    options
}

/// Loads a table's columns as designer fields, in ordinal order.
#[instrument(skip(ctx), fields(session_id = %ctx.id()))]
pub async fn load_columns(
    ctx: &SessionContext,
    database: &str,
    table: &str,
) -> EngineResult<Vec<FieldSpec>> {
    let columns = ctx
        .engine()
        .describe_columns(ctx.config(), database, table)
        .await?;
    if columns.is_empty() {
        return Err(EngineError::execution_error(format!(
            "Table '{database}.{table}' doesn't exist"
        )));
    }
    Ok(columns.iter().map(field_from_column).collect())
}

/// Collects the structure of every table in `database`.
#[instrument(skip(ctx), fields(session_id = %ctx.id()))]
pub async fn load_database_schema(
    ctx: &SessionContext,
    database: &str,
) -> EngineResult<DatabaseSchema> {
    let engine = ctx.engine();
    let tables = engine.list_tables(ctx.config(), database).await?;

    let mut schema = BTreeMap::new();
    for table in &tables {
        let columns = engine
            .describe_columns(ctx.config(), database, &table.name)
            .await?;
        schema.insert(
            table.name.clone(),
            columns.iter().map(StructureColumn::from).collect(),
        );
    }

    Ok(DatabaseSchema {
        database: database.to_string(),
        tables: tables.into_iter().map(|t| t.name).collect(),
        schema,
    })
}
