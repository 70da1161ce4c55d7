// SPDX-License-Identifier: BUSL-1.1

//! Context builder: turns a loaded database schema into the compact text the
//! completion prompts embed.

use std::fmt::Write;

use crate::engine::types::{DatabaseSchema, StructureColumn};

const MAX_TABLES: usize = 40;
const MAX_SCHEMA_WORDS: usize = 4000;

/// Describes the schema, tables mentioned in `user_prompt` first.
///
/// At most `MAX_TABLES` tables are described in full; the rest are listed by
/// name only.
pub fn format_schema_for_prompt(schema: &DatabaseSchema, user_prompt: &str) -> String {
    let prompt_lower = user_prompt.to_lowercase();
    let mut names: Vec<&String> = schema.schema.keys().collect();
    // Stable sort keeps alphabetical order within each group.
    names.sort_by_key(|name| !prompt_lower.contains(&name.to_lowercase()));

    let mut out = String::new();
    let _ = writeln!(out, "Database: {}", schema.database);

    let mut described = 0;
    let mut total_words = 0;
    for name in &names {
        if described >= MAX_TABLES || total_words > MAX_SCHEMA_WORDS {
            break;
        }
        let desc = format_table(name, &schema.schema[*name]);
        total_words += desc.split_whitespace().count();
        out.push('\n');
        out.push_str(&desc);
        described += 1;
    }

    if names.len() > described {
        let rest: Vec<&str> = names[described..].iter().map(|n| n.as_str()).collect();
        let _ = write!(out, "\nOther tables (not described): {}\n", rest.join(", "));
    }

    out
}

fn format_table(name: &str, columns: &[StructureColumn]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Table: {name}");
    let _ = writeln!(out, "Columns:");
    for col in columns {
        let key = match col.key.as_str() {
            "PRI" => " PRIMARY KEY",
            "UNI" => " UNIQUE",
            "MUL" => " INDEXED",
            _ => "",
        };
        let null = if col.nullable { "" } else { " NOT NULL" };
        let default = col
            .default
            .as_ref()
            .map(|d| format!(" DEFAULT {d}"))
            .unwrap_or_default();
        let extra = if col.extra.is_empty() {
            String::new()
        } else {
            format!(" {}", col.extra)
        };
        let _ = writeln!(
            out,
            "- {}: {}{}{}{}{}",
            col.name, col.column_type, key, null, default, extra
        );
    }
    out
}

pub fn build_generation_prompt(schema_description: &str) -> String {
    format!(
        r#"You are an expert MySQL developer. Your task is to convert natural language requests into SQL statements.

Given the following database schema:
{schema_description}

Convert the user's request into a single valid MySQL statement.
Use the exact table and column names from the schema.
Only return the SQL statement without any explanation."#
    )
}

pub fn build_validation_prompt(sql: &str, schema_description: &str) -> String {
    format!(
        r#"You are an expert MySQL developer. Your task is to validate the following SQL query and suggest improvements if necessary.

Given the following database schema:
{schema_description}

Analyze this SQL query:
{sql}

Return only a JSON object with the following structure:
{{
    "isValid": boolean,
    "errors": string[] | null,
    "suggestions": string[] | null,
    "improvedQuery": string | null
}}"#
    )
}

pub const VALIDATION_USER_PROMPT: &str = "Please validate this query.";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn col(name: &str, ty: &str, key: &str, nullable: bool) -> StructureColumn {
        StructureColumn {
            name: name.into(),
            column_type: ty.into(),
            nullable,
            key: key.into(),
            default: None,
            extra: String::new(),
        }
    }

    fn schema() -> DatabaseSchema {
        let mut tables = BTreeMap::new();
        tables.insert(
            "accounts".to_string(),
            vec![col("id", "int", "PRI", false)],
        );
        tables.insert(
            "orders".to_string(),
            vec![
                col("id", "bigint", "PRI", false),
                col("note", "varchar(50)", "", true),
            ],
        );
        DatabaseSchema {
            database: "shop".into(),
            tables: tables.keys().cloned().collect(),
            schema: tables,
        }
    }

    #[test]
    fn test_table_format() {
        let text = format_schema_for_prompt(&schema(), "");
        assert!(text.starts_with("Database: shop\n"));
        assert!(text.contains("Table: orders\nColumns:\n- id: bigint PRIMARY KEY NOT NULL\n- note: varchar(50)\n"));
    }

    #[test]
    fn test_mentioned_tables_come_first() {
        let text = format_schema_for_prompt(&schema(), "count all Orders");
        let orders = text.find("Table: orders").unwrap();
        let accounts = text.find("Table: accounts").unwrap();
        assert!(orders < accounts);
    }

    #[test]
    fn test_large_schemas_are_truncated() {
        let mut tables = BTreeMap::new();
        for i in 0..(MAX_TABLES + 5) {
            tables.insert(format!("t{i:03}"), vec![col("id", "int", "PRI", false)]);
        }
        let schema = DatabaseSchema {
            database: "big".into(),
            tables: tables.keys().cloned().collect(),
            schema: tables,
        };
        let text = format_schema_for_prompt(&schema, "");
        assert_eq!(text.matches("Table: ").count(), MAX_TABLES);
        assert!(text.contains("Other tables (not described): t040, t041"));
    }

    #[test]
    fn test_prompts_embed_inputs() {
        let prompt = build_validation_prompt("SELECT 1", "Table: x");
        assert!(prompt.contains("SELECT 1"));
        assert!(prompt.contains("\"improvedQuery\""));
        assert!(build_generation_prompt("Table: x").contains("Table: x"));
    }
}
