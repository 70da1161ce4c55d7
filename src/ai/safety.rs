// SPDX-License-Identifier: BUSL-1.1

//! Safety analysis for AI-generated SQL.
//!
//! Parses with the MySQL dialect and flags writes and destructive statements
//! so the UI can ask for confirmation before running them.

use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use super::types::SafetyInfo;

const MUTATION_WARNING: &str = "This query modifies data or schema.";
const DANGER_WARNING: &str =
    "This query is potentially dangerous (DROP, TRUNCATE, or UPDATE/DELETE without WHERE).";

#[derive(Debug, Default)]
struct Analysis {
    is_mutation: bool,
    is_dangerous: bool,
}

fn has_where(statement: &Statement) -> bool {
    statement.to_string().to_ascii_uppercase().contains(" WHERE ")
}

fn analyze_statement(statement: &Statement) -> Analysis {
    match statement {
        Statement::Drop { .. } | Statement::Truncate { .. } => Analysis {
            is_mutation: true,
            is_dangerous: true,
        },
        Statement::Update { .. } | Statement::Delete { .. } => Analysis {
            is_mutation: true,
            is_dangerous: !has_where(statement),
        },
        Statement::Insert { .. }
        | Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::AlterTable { .. } => Analysis {
            is_mutation: true,
            is_dangerous: false,
        },
        _ => Analysis::default(),
    }
}

// Used when the parser rejects the statement.
fn analyze_keywords(sql: &str) -> Analysis {
    let upper = sql.trim_start().to_ascii_uppercase();
    let first = upper.split_whitespace().next().unwrap_or("");
    let is_mutation = matches!(
        first,
        "INSERT" | "REPLACE" | "UPDATE" | "DELETE" | "CREATE" | "ALTER" | "DROP" | "TRUNCATE" | "RENAME"
    );
    let is_dangerous = matches!(first, "DROP" | "TRUNCATE")
        || (matches!(first, "UPDATE" | "DELETE") && !upper.contains(" WHERE "));
    Analysis {
        is_mutation,
        is_dangerous,
    }
}

/// Analyzes one or more `;`-separated MySQL statements.
pub fn analyze_sql(sql: &str) -> SafetyInfo {
    let mut warnings = Vec::new();

    let analysis = match Parser::parse_sql(&MySqlDialect {}, sql.trim()) {
        Ok(statements) => statements
            .iter()
            .map(analyze_statement)
            .fold(Analysis::default(), |acc, a| Analysis {
                is_mutation: acc.is_mutation || a.is_mutation,
                is_dangerous: acc.is_dangerous || a.is_dangerous,
            }),
        Err(_) => {
            warnings.push("Could not parse generated query for safety analysis.".to_string());
            analyze_keywords(sql)
        }
    };

    if analysis.is_mutation {
        warnings.push(MUTATION_WARNING.to_string());
    }
    if analysis.is_dangerous {
        warnings.push(DANGER_WARNING.to_string());
    }

    SafetyInfo {
        is_mutation: analysis.is_mutation,
        is_dangerous: analysis.is_dangerous,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_select() {
        let info = analyze_sql("SELECT * FROM users WHERE id = 1");
        assert!(!info.is_mutation);
        assert!(!info.is_dangerous);
        assert!(info.warnings.is_empty());
    }

    #[test]
    fn test_update_with_where() {
        let info = analyze_sql("UPDATE users SET name = 'x' WHERE id = 1");
        assert!(info.is_mutation);
        assert!(!info.is_dangerous);
    }

    #[test]
    fn test_delete_without_where_is_dangerous() {
        let info = analyze_sql("DELETE FROM users");
        assert!(info.is_mutation);
        assert!(info.is_dangerous);
        assert_eq!(info.warnings.len(), 2);
    }

    #[test]
    fn test_drop_is_dangerous() {
        let info = analyze_sql("DROP TABLE users");
        assert!(info.is_dangerous);
    }

    #[test]
    fn test_any_statement_in_a_batch_counts() {
        let info = analyze_sql("SELECT 1; TRUNCATE TABLE logs");
        assert!(info.is_mutation && info.is_dangerous);
    }

    #[test]
    fn test_unparseable_falls_back_to_keywords() {
        let info = analyze_sql("DELETE FROM )))");
        assert!(info.is_mutation);
        assert!(info.is_dangerous);
        assert!(info.warnings[0].contains("Could not parse"));
    }
}
