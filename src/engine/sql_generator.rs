//! SQL Generator
//!
//! Builds the data-grid statements (page, insert, update, delete) and the
//! small metadata statements the table endpoints need. Values never appear in
//! the SQL text: they travel as `?` parameters.

use studio_ddl::{quote_ident, quote_literal};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{RowValues, Value};

/// Largest page the data grid may request in one call.
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// `` `db`.`table` ``
pub fn qualified_table(database: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(database), quote_ident(table))
}

/// One page of rows in storage order.
pub fn generate_select_page(database: &str, table: &str, limit: u32, offset: u64) -> BoundStatement {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    BoundStatement {
        sql: format!(
            "SELECT * FROM {} LIMIT ? OFFSET ?",
            qualified_table(database, table)
        ),
        params: vec![Value::Int(i64::from(limit)), Value::Int(offset.min(i64::MAX as u64) as i64)],
    }
}

/// Every row, for spreadsheet export.
pub fn generate_select_all(database: &str, table: &str) -> String {
    format!("SELECT * FROM {}", qualified_table(database, table))
}

/// Generate an INSERT statement
pub fn generate_insert(database: &str, table: &str, data: &RowValues) -> EngineResult<BoundStatement> {
    if data.is_empty() {
        return Err(EngineError::validation("Cannot insert a row without values"));
    }

    let columns: Vec<String> = data.keys().map(|col| quote_ident(col)).collect();
    let placeholders = vec!["?"; data.len()].join(", ");

    Ok(BoundStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            qualified_table(database, table),
            columns.join(", "),
            placeholders
        ),
        params: data.values().cloned().collect(),
    })
}

/// Generate an UPDATE statement
pub fn generate_update(
    database: &str,
    table: &str,
    data: &RowValues,
    filter: &RowValues,
) -> EngineResult<BoundStatement> {
    if data.is_empty() {
        return Err(EngineError::validation("Cannot update a row without values"));
    }
    if filter.is_empty() {
        return Err(EngineError::validation(
            "Cannot generate UPDATE without a WHERE condition",
        ));
    }

    let mut params: Vec<Value> = data.values().cloned().collect();
    let set_parts: Vec<String> = data
        .keys()
        .map(|col| format!("{} = ?", quote_ident(col)))
        .collect();
    let where_clause = where_clause(filter, &mut params);

    Ok(BoundStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}",
            qualified_table(database, table),
            set_parts.join(", "),
            where_clause
        ),
        params,
    })
}

/// Generate a DELETE statement
pub fn generate_delete(database: &str, table: &str, filter: &RowValues) -> EngineResult<BoundStatement> {
    if filter.is_empty() {
        return Err(EngineError::validation(
            "Cannot generate DELETE without a WHERE condition",
        ));
    }

    let mut params = Vec::with_capacity(filter.len());
    let where_clause = where_clause(filter, &mut params);

    Ok(BoundStatement {
        sql: format!(
            "DELETE FROM {} WHERE {}",
            qualified_table(database, table),
            where_clause
        ),
        params,
    })
}

/// `ALTER TABLE ... COMMENT = '...'`. DDL cannot take placeholders, so the
/// comment is escaped as a literal.
pub fn generate_table_comment(database: &str, table: &str, comment: &str) -> String {
    format!(
        "ALTER TABLE {} COMMENT = {}",
        qualified_table(database, table),
        quote_literal(comment)
    )
}

// NULL never compares equal, so it is matched with IS NULL and not bound.
fn where_clause(filter: &RowValues, params: &mut Vec<Value>) -> String {
    filter
        .iter()
        .map(|(col, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote_ident(col))
            } else {
                params.push(value.clone());
                format!("{} = ?", quote_ident(col))
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> RowValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_generate_insert() {
        let data = row(&[
            ("name", Value::Text("John".into())),
            ("age", Value::Int(30)),
        ]);
        let stmt = generate_insert("app", "users", &data).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `app`.`users` (`age`, `name`) VALUES (?, ?)"
        );
        assert_eq!(stmt.params, vec![Value::Int(30), Value::Text("John".into())]);
    }

    #[test]
    fn test_generate_update() {
        let data = row(&[("name", Value::Text("Jane".into()))]);
        let filter = row(&[("id", Value::Int(1)), ("deleted_at", Value::Null)]);
        let stmt = generate_update("app", "users", &data, &filter).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE `app`.`users` SET `name` = ? WHERE `deleted_at` IS NULL AND `id` = ?"
        );
        assert_eq!(stmt.params, vec![Value::Text("Jane".into()), Value::Int(1)]);
    }

    #[test]
    fn test_generate_delete() {
        let filter = row(&[("id", Value::Int(1))]);
        let stmt = generate_delete("app", "users", &filter).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM `app`.`users` WHERE `id` = ?");
        assert_eq!(stmt.params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_empty_where_is_rejected() {
        let empty = RowValues::new();
        let data = row(&[("name", Value::Text("x".into()))]);
        assert!(matches!(
            generate_delete("app", "users", &empty),
            Err(EngineError::ValidationError { .. })
        ));
        assert!(generate_update("app", "users", &data, &empty).is_err());
        assert!(generate_insert("app", "users", &empty).is_err());
    }

    #[test]
    fn test_identifiers_are_quoted() {
        let filter = row(&[("we`ird", Value::Int(1))]);
        let stmt = generate_delete("my`db", "t", &filter).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM `my``db`.`t` WHERE `we``ird` = ?");
    }

    #[test]
    fn test_page_is_clamped() {
        let page = generate_select_page("app", "users", 0, 20);
        assert_eq!(page.sql, "SELECT * FROM `app`.`users` LIMIT ? OFFSET ?");
        assert_eq!(page.params, vec![Value::Int(1), Value::Int(20)]);

        let page = generate_select_page("app", "users", 1_000_000, 0);
        assert_eq!(page.params[0], Value::Int(i64::from(MAX_PAGE_SIZE)));
    }

    #[test]
    fn test_table_comment_is_escaped() {
        assert_eq!(
            generate_table_comment("app", "users", "it's"),
            "ALTER TABLE `app`.`users` COMMENT = 'it''s'"
        );
    }
}
