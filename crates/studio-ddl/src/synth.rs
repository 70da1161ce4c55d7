// SPDX-License-Identifier: Apache-2.0

//! DDL Synthesizer
//!
//! Turns field lists into `CREATE TABLE` statements and diff-based
//! `ALTER TABLE` statements. Both paths render columns through
//! [`build_column_definition`]; they differ only in the wrapping clause and
//! in whether nullability is always spelled out.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{DdlError, DdlResult};
use crate::field::FieldSpec;

const TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

/// How the nullability clause is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    /// `NOT NULL` when set, nothing otherwise (CREATE TABLE)
    OmitNull,
    /// Always `NOT NULL` or `NULL` (ADD / MODIFY COLUMN)
    Explicit,
}

/// Result of diffing a working field list against its snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlterOutcome {
    NoChanges,
    Statement(AlterStatement),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterStatement {
    pub sql: String,
    pub dropped: Vec<String>,
    pub added: Vec<String>,
    pub modified: Vec<String>,
}

/// Quotes a MySQL identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a MySQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid regex"))
}

fn type_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_ ]*$").expect("valid regex"))
}

pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

fn require_identifier(name: &str) -> DdlResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(DdlError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Defaults that are SQL expressions rather than literals.
fn is_default_expression(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    upper == "NULL"
        || upper == "NOW()"
        || upper == "CURRENT_TIMESTAMP"
        || (upper.starts_with("CURRENT_TIMESTAMP(") && upper.ends_with(')'))
}

fn render_default(field: &FieldSpec, value: &str) -> String {
    if is_default_expression(value) {
        return value.trim().to_ascii_uppercase();
    }
    let quoted = match field.descriptor() {
        Some(descriptor) => descriptor.quotes_default,
        None => value.trim().parse::<f64>().is_err(),
    };
    if quoted {
        quote_literal(value)
    } else {
        value.to_string()
    }
}

fn render_type(field: &FieldSpec) -> DdlResult<String> {
    let raw = field.data_type.trim();
    let descriptor = field.descriptor();
    if descriptor.is_none() && !type_name_pattern().is_match(raw) {
        return Err(DdlError::InvalidColumnType {
            name: field.name.clone(),
            data_type: field.data_type.clone(),
        });
    }

    let mut sql = raw.to_uppercase();

    if descriptor.is_some_and(|d| d.has_options) {
        if field.options.is_empty() {
            return Err(DdlError::MissingOptions {
                name: field.name.clone(),
            });
        }
        let options: Vec<String> = field.options.iter().map(|o| quote_literal(o)).collect();
        sql.push_str(&format!("({})", options.join(",")));
        return Ok(sql);
    }

    // Unknown types pass their length/decimals through as given.
    let allows_length = descriptor.map_or(true, |d| d.has_length);
    let allows_decimals = descriptor.map_or(true, |d| d.has_decimals);

    if let Some(length) = field.length.filter(|_| allows_length) {
        if length == 0 {
            return Err(DdlError::InvalidLength {
                name: field.name.clone(),
            });
        }
        match field.decimals.filter(|_| allows_decimals) {
            Some(decimals) if decimals > length => {
                return Err(DdlError::DecimalsExceedLength {
                    name: field.name.clone(),
                    length,
                    decimals,
                });
            }
            Some(decimals) => sql.push_str(&format!("({}, {})", length, decimals)),
            None => sql.push_str(&format!("({})", length)),
        }
    }

    Ok(sql)
}

/// Renders one column definition, without any wrapping clause.
///
/// `` `name` TYPE[(len[, dec])] [NOT NULL|NULL] [DEFAULT v] [AUTO_INCREMENT] [COMMENT '...'] ``
pub fn build_column_definition(field: &FieldSpec, nullability: Nullability) -> DdlResult<String> {
    let mut parts = vec![quote_ident(&field.name), render_type(field)?];

    match (field.not_null, nullability) {
        (true, _) => parts.push("NOT NULL".to_string()),
        (false, Nullability::Explicit) => parts.push("NULL".to_string()),
        (false, Nullability::OmitNull) => {}
    }

    if !field.auto_increment {
        if let Some(value) = field.default_value.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("DEFAULT {}", render_default(field, value)));
        }
    }

    if field.auto_increment {
        parts.push("AUTO_INCREMENT".to_string());
    }

    if let Some(comment) = field.comment.as_deref().filter(|c| !c.is_empty()) {
        parts.push(format!("COMMENT {}", quote_literal(comment)));
    }

    Ok(parts.join(" "))
}

fn check_names<'a>(fields: impl Iterator<Item = &'a FieldSpec>) -> DdlResult<()> {
    let mut seen = HashSet::new();
    for (position, field) in fields.enumerate() {
        if field.name.trim().is_empty() {
            return Err(DdlError::EmptyFieldName {
                position: position + 1,
            });
        }
        if !seen.insert(field.name.to_ascii_lowercase()) {
            return Err(DdlError::DuplicateFieldName {
                name: field.name.clone(),
            });
        }
    }
    Ok(())
}

/// Builds a `CREATE TABLE` statement.
///
/// Checks, in order: table name, field names (non-empty, identifiers,
/// unique) and the presence of a primary key. No SQL is produced when any
/// of them fails.
pub fn synthesize_create(table: &str, fields: &[FieldSpec]) -> DdlResult<String> {
    if table.trim().is_empty() {
        return Err(DdlError::EmptyTableName);
    }
    require_identifier(table)?;
    if fields.is_empty() {
        return Err(DdlError::NoFields);
    }
    check_names(fields.iter())?;
    for field in fields {
        require_identifier(&field.name)?;
    }

    let primary: Vec<String> = fields
        .iter()
        .filter(|f| f.is_primary)
        .map(|f| quote_ident(&f.name))
        .collect();
    if primary.is_empty() {
        return Err(DdlError::MissingPrimaryKey);
    }

    let mut definitions = fields
        .iter()
        .map(|f| build_column_definition(f, Nullability::OmitNull))
        .collect::<DdlResult<Vec<_>>>()?;
    definitions.push(format!("PRIMARY KEY ({})", primary.join(", ")));

    let body = definitions
        .iter()
        .map(|d| format!("  {}", d))
        .collect::<Vec<_>>()
        .join(",\n");

    Ok(format!(
        "CREATE TABLE {} (\n{}\n) {};",
        quote_ident(table),
        body,
        TABLE_OPTIONS
    ))
}

/// Diffs `current` against `original` and builds one `ALTER TABLE`.
///
/// Clauses are emitted as drops (original order), then adds and modifies
/// (current order). Identical lists yield [`AlterOutcome::NoChanges`].
pub fn synthesize_alter(
    table: &str,
    current: &[FieldSpec],
    original: &[FieldSpec],
) -> DdlResult<AlterOutcome> {
    if table.trim().is_empty() {
        return Err(DdlError::EmptyTableName);
    }
    if current.is_empty() {
        return Err(DdlError::NoFields);
    }
    check_names(current.iter())?;

    let find_original = |name: &str| original.iter().find(|o| o.name == name);

    for field in current {
        if field.is_new {
            require_identifier(&field.name)?;
        } else if find_original(&field.name).is_none() {
            return Err(DdlError::UnknownOriginalField {
                name: field.name.clone(),
            });
        }
    }

    let mut clauses = Vec::new();
    let mut dropped = Vec::new();
    let mut added = Vec::new();
    let mut modified = Vec::new();

    for old in original {
        let kept = current.iter().any(|c| !c.is_new && c.name == old.name);
        if !kept {
            clauses.push(format!("DROP COLUMN {}", quote_ident(&old.name)));
            dropped.push(old.name.clone());
        }
    }

    for field in current.iter().filter(|f| f.is_new) {
        clauses.push(format!(
            "ADD COLUMN {}",
            build_column_definition(field, Nullability::Explicit)?
        ));
        added.push(field.name.clone());
    }

    for field in current.iter().filter(|f| !f.is_new) {
        let Some(old) = find_original(&field.name) else {
            continue;
        };
        if !field.same_definition(old) {
            clauses.push(format!(
                "MODIFY COLUMN {}",
                build_column_definition(field, Nullability::Explicit)?
            ));
            modified.push(field.name.clone());
        }
    }

    if clauses.is_empty() {
        return Ok(AlterOutcome::NoChanges);
    }

    Ok(AlterOutcome::Statement(AlterStatement {
        sql: format!("ALTER TABLE {} {};", quote_ident(table), clauses.join(", ")),
        dropped,
        added,
        modified,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn users() -> Vec<FieldSpec> {
        let mut id = FieldSpec::new("id", "int").with_length(11).primary();
        id.auto_increment = true;
        let email = FieldSpec::new("email", "varchar").with_length(255).not_null();
        vec![id, email]
    }

    fn sql_of(outcome: AlterOutcome) -> AlterStatement {
        match outcome {
            AlterOutcome::Statement(statement) => statement,
            AlterOutcome::NoChanges => panic!("expected a statement"),
        }
    }

    #[test]
    fn test_create_users_table() {
        let sql = synthesize_create("users", &users()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE `users` (\n  `id` INT(11) NOT NULL AUTO_INCREMENT,\n  `email` VARCHAR(255) NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;"
        );
    }

    #[test]
    fn test_create_validation_order() {
        assert_eq!(synthesize_create("", &users()), Err(DdlError::EmptyTableName));
        assert!(matches!(
            synthesize_create("1users", &users()),
            Err(DdlError::InvalidIdentifier { .. })
        ));
        assert_eq!(synthesize_create("t", &[]), Err(DdlError::NoFields));

        let mut fields = users();
        fields[1].name = String::new();
        assert_eq!(
            synthesize_create("t", &fields),
            Err(DdlError::EmptyFieldName { position: 2 })
        );

        let mut fields = users();
        fields[1].name = "ID".into();
        assert_eq!(
            synthesize_create("t", &fields),
            Err(DdlError::DuplicateFieldName { name: "ID".into() })
        );

        let mut fields = users();
        fields[1].name = "e-mail".into();
        assert!(matches!(
            synthesize_create("t", &fields),
            Err(DdlError::InvalidIdentifier { .. })
        ));

        let mut fields = users();
        fields[0].is_primary = false;
        assert_eq!(
            synthesize_create("t", &fields),
            Err(DdlError::MissingPrimaryKey)
        );
    }

    #[test]
    fn test_composite_primary_key_in_field_order() {
        let fields = vec![
            FieldSpec::new("tenant", "int").primary(),
            FieldSpec::new("label", "text"),
            FieldSpec::new("code", "char").with_length(4).primary(),
        ];
        let sql = synthesize_create("t", &fields).unwrap();
        assert!(sql.contains("PRIMARY KEY (`tenant`, `code`)"));
    }

    #[test]
    fn test_column_definition_details() {
        let price = FieldSpec::new("price", "decimal")
            .with_length(10)
            .with_decimals(2)
            .with_default("0.00")
            .with_comment("Unit price");
        assert_eq!(
            build_column_definition(&price, Nullability::OmitNull).unwrap(),
            "`price` DECIMAL(10, 2) DEFAULT 0.00 COMMENT 'Unit price'"
        );
        assert_eq!(
            build_column_definition(&price, Nullability::Explicit).unwrap(),
            "`price` DECIMAL(10, 2) NULL DEFAULT 0.00 COMMENT 'Unit price'"
        );
    }

    #[test]
    fn test_default_quoting_by_type() {
        let name = FieldSpec::new("name", "varchar").with_length(20).with_default("it's");
        assert_eq!(
            build_column_definition(&name, Nullability::OmitNull).unwrap(),
            "`name` VARCHAR(20) DEFAULT 'it''s'"
        );

        let created = FieldSpec::new("created", "timestamp").with_default("current_timestamp");
        assert_eq!(
            build_column_definition(&created, Nullability::OmitNull).unwrap(),
            "`created` TIMESTAMP DEFAULT CURRENT_TIMESTAMP"
        );

        let day = FieldSpec::new("day", "date").with_default("2024-01-01");
        assert!(build_column_definition(&day, Nullability::OmitNull)
            .unwrap()
            .ends_with("DEFAULT '2024-01-01'"));

        let count = FieldSpec::new("count", "int").with_default("5");
        assert!(build_column_definition(&count, Nullability::OmitNull)
            .unwrap()
            .ends_with("DEFAULT 5"));
    }

    #[test]
    fn test_default_ignored_with_auto_increment() {
        let mut id = FieldSpec::new("id", "int").primary().with_default("1");
        id.auto_increment = true;
        let sql = build_column_definition(&id, Nullability::OmitNull).unwrap();
        assert!(!sql.contains("DEFAULT"));
        assert!(sql.ends_with("AUTO_INCREMENT"));
    }

    #[test]
    fn test_comment_escaping() {
        let field = FieldSpec::new("a", "int").with_comment(r"it's a\b");
        assert!(build_column_definition(&field, Nullability::OmitNull)
            .unwrap()
            .ends_with(r"COMMENT 'it''s a\\b'"));
    }

    #[test]
    fn test_enum_options() {
        let mut field = FieldSpec::new("state", "enum");
        field.options = vec!["on".into(), "o'ff".into()];
        field.default_value = Some("on".into());
        assert_eq!(
            build_column_definition(&field, Nullability::OmitNull).unwrap(),
            "`state` ENUM('on','o''ff') DEFAULT 'on'"
        );

        field.options.clear();
        assert_eq!(
            build_column_definition(&field, Nullability::OmitNull),
            Err(DdlError::MissingOptions {
                name: "state".into()
            })
        );
    }

    #[test]
    fn test_length_rules() {
        let text = FieldSpec::new("body", "text").with_length(500);
        assert_eq!(
            build_column_definition(&text, Nullability::OmitNull).unwrap(),
            "`body` TEXT"
        );

        let zero = FieldSpec::new("code", "varchar").with_length(0);
        assert_eq!(
            build_column_definition(&zero, Nullability::OmitNull),
            Err(DdlError::InvalidLength {
                name: "code".into()
            })
        );

        let wide = FieldSpec::new("ratio", "decimal").with_length(4).with_decimals(6);
        assert_eq!(
            build_column_definition(&wide, Nullability::OmitNull),
            Err(DdlError::DecimalsExceedLength {
                name: "ratio".into(),
                length: 4,
                decimals: 6
            })
        );

        let only_decimals = FieldSpec::new("ratio", "double").with_decimals(2);
        assert_eq!(
            build_column_definition(&only_decimals, Nullability::OmitNull).unwrap(),
            "`ratio` DOUBLE"
        );
    }

    #[test]
    fn test_unknown_types() {
        let tiny = FieldSpec::new("flag", "tinyint").with_length(1).with_default("0");
        assert_eq!(
            build_column_definition(&tiny, Nullability::Explicit).unwrap(),
            "`flag` TINYINT(1) NULL DEFAULT 0"
        );

        let medium = FieldSpec::new("body", "mediumtext").with_default("x");
        assert!(build_column_definition(&medium, Nullability::OmitNull)
            .unwrap()
            .ends_with("DEFAULT 'x'"));

        let evil = FieldSpec::new("x", "int) ; DROP TABLE t; --");
        assert!(matches!(
            build_column_definition(&evil, Nullability::OmitNull),
            Err(DdlError::InvalidColumnType { .. })
        ));
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
        assert!(is_valid_identifier("_tmp1"));
        assert!(!is_valid_identifier("9lives"));
        assert!(!is_valid_identifier(&"a".repeat(65)));
    }

    #[test]
    fn test_alter_diff_order() {
        let original = vec![
            FieldSpec::new("A", "int"),
            FieldSpec::new("B", "varchar").with_length(255),
        ];
        let current = vec![
            FieldSpec::new("A", "int").with_comment("changed"),
            FieldSpec::new("C", "varchar").with_length(255).new_in_alter(),
        ];

        let statement = sql_of(synthesize_alter("t", &current, &original).unwrap());
        assert_eq!(
            statement.sql,
            "ALTER TABLE `t` DROP COLUMN `B`, ADD COLUMN `C` VARCHAR(255) NULL, MODIFY COLUMN `A` INT NULL COMMENT 'changed';"
        );
        assert_eq!(statement.dropped, ["B"]);
        assert_eq!(statement.added, ["C"]);
        assert_eq!(statement.modified, ["A"]);
    }

    #[test]
    fn test_alter_identical_is_no_changes() {
        let fields = users();
        assert_eq!(
            synthesize_alter("users", &fields, &fields).unwrap(),
            AlterOutcome::NoChanges
        );
    }

    #[test]
    fn test_alter_recreate_dropped_name() {
        let original = vec![FieldSpec::new("id", "int").primary(), FieldSpec::new("b", "int")];
        let current = vec![
            FieldSpec::new("id", "int").primary(),
            FieldSpec::new("b", "text").new_in_alter(),
        ];
        let statement = sql_of(synthesize_alter("t", &current, &original).unwrap());
        assert_eq!(
            statement.sql,
            "ALTER TABLE `t` DROP COLUMN `b`, ADD COLUMN `b` TEXT NULL;"
        );
    }

    #[test]
    fn test_alter_validation() {
        let original = users();

        assert_eq!(
            synthesize_alter("users", &[], &original),
            Err(DdlError::NoFields)
        );

        let mut current = users();
        current[1].name = "renamed".into();
        assert_eq!(
            synthesize_alter("users", &current, &original),
            Err(DdlError::UnknownOriginalField {
                name: "renamed".into()
            })
        );

        let mut current = users();
        current.push(FieldSpec::new("email", "text").new_in_alter());
        assert_eq!(
            synthesize_alter("users", &current, &original),
            Err(DdlError::DuplicateFieldName {
                name: "email".into()
            })
        );

        let mut current = users();
        current.push(FieldSpec::new("", "text").new_in_alter());
        assert_eq!(
            synthesize_alter("users", &current, &original),
            Err(DdlError::EmptyFieldName { position: 3 })
        );
    }

    #[test]
    fn test_alter_existing_odd_names_are_quoted() {
        let original = vec![FieldSpec::new("my-col", "int")];
        let current = vec![FieldSpec::new("my-col", "int").not_null()];
        let statement = sql_of(synthesize_alter("legacy table", &current, &original).unwrap());
        assert_eq!(
            statement.sql,
            "ALTER TABLE `legacy table` MODIFY COLUMN `my-col` INT NOT NULL;"
        );
    }

    fn field_strategy() -> impl Strategy<Value = FieldSpec> {
        let types = prop::sample::select(vec!["int", "bigint", "varchar", "text", "date", "json"]);
        (
            "[a-z][a-z0-9_]{0,10}",
            types,
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(name, data_type, primary, not_null)| {
                let mut field = FieldSpec::new(name, data_type);
                if data_type == "varchar" {
                    field.length = Some(64);
                }
                field.is_primary = primary;
                field.not_null = not_null || primary;
                field
            })
    }

    proptest! {
        #[test]
        fn prop_create_lists_every_primary_once(fields in prop::collection::vec(field_strategy(), 1..8)) {
            let mut seen = HashSet::new();
            let fields: Vec<FieldSpec> = fields
                .into_iter()
                .filter(|f| seen.insert(f.name.clone()))
                .collect();
            prop_assume!(fields.iter().any(|f| f.is_primary));

            let sql = synthesize_create("t", &fields).unwrap();
            prop_assert_eq!(sql.matches("PRIMARY KEY (").count(), 1);

            let expected: Vec<String> = fields
                .iter()
                .filter(|f| f.is_primary)
                .map(|f| quote_ident(&f.name))
                .collect();
            let clause = format!("PRIMARY KEY ({})", expected.join(", "));
            prop_assert!(sql.contains(&clause));
        }

        #[test]
        fn prop_duplicate_names_never_produce_sql(field in field_strategy()) {
            let mut twin = field.clone();
            twin.is_primary = true;
            let fields = vec![field, twin];
            let result = synthesize_create("t", &fields);
            prop_assert!(
                matches!(result, Err(DdlError::DuplicateFieldName { .. })),
                "unexpected result: {:?}",
                result
            );
        }

        #[test]
        fn prop_identical_lists_have_no_changes(fields in prop::collection::vec(field_strategy(), 1..6)) {
            let mut seen = HashSet::new();
            let fields: Vec<FieldSpec> = fields
                .into_iter()
                .filter(|f| seen.insert(f.name.clone()))
                .collect();
            prop_assert_eq!(synthesize_alter("t", &fields, &fields).unwrap(), AlterOutcome::NoChanges);
        }
    }

    proptest! {
        #[test]
        fn prop_auto_increment_always_not_null(
            data_type in prop::sample::select(vec!["int", "bigint", "varchar", "decimal", "tinyint"]),
            not_null in any::<bool>(),
            alter in any::<bool>(),
        ) {
            use crate::field::{EditContext, FieldUpdate};
            let context = if alter { EditContext::Alter } else { EditContext::Create };
            let mut field = FieldSpec::new("n", data_type);
            field.not_null = not_null;
            field.apply(FieldUpdate::AutoIncrement(true), context);
            prop_assert!(field.not_null);
        }

        #[test]
        fn prop_type_without_length_clears_length_and_decimals(
            target in prop::sample::select(vec!["text", "datetime", "date", "time", "timestamp", "boolean", "enum", "set", "json", "blob", "longblob"]),
            length in prop::option::of(1u32..1000),
            decimals in prop::option::of(0u32..30),
        ) {
            use crate::field::{EditContext, FieldUpdate};
            let mut field = FieldSpec::new("n", "decimal");
            field.length = length;
            field.decimals = decimals;
            field.apply(FieldUpdate::Type(target.to_string()), EditContext::Create);
            prop_assert_eq!(field.length, None);
            prop_assert_eq!(field.decimals, None);
        }
    }
}
