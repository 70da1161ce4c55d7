// SPDX-License-Identifier: Apache-2.0

//! Ordered field lists and the designer operations that mutate them.

use serde::{Deserialize, Serialize};

use crate::error::{DdlError, DdlResult};
use crate::field::{EditContext, FieldSpec, FieldUpdate};
use crate::synth::{self, AlterOutcome};

/// A named, ordered list of fields being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub context: EditContext,
}

/// One designer action, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FieldOperation {
    Add,
    Delete { index: usize },
    MoveUp { index: usize },
    MoveDown { index: usize },
    Update { index: usize, update: FieldUpdate },
}

impl TableDefinition {
    /// A new table seeded with an auto-increment `id` primary key.
    pub fn for_create(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![FieldSpec::default_id()],
            context: EditContext::Create,
        }
    }

    /// Wraps fields loaded from a live table.
    pub fn for_alter(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
            context: EditContext::Alter,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn check_index(&self, index: usize) -> DdlResult<()> {
        if index < self.fields.len() {
            Ok(())
        } else {
            Err(DdlError::IndexOutOfRange {
                index,
                len: self.fields.len(),
            })
        }
    }

    /// Appends a blank `varchar(255)` field and returns its index.
    pub fn add_field(&mut self) -> usize {
        let mut field = FieldSpec::blank();
        field.is_new = self.context == EditContext::Alter;
        self.fields.push(field);
        self.fields.len() - 1
    }

    /// Removes a field. The create designer refuses to remove the last one.
    pub fn delete_field(&mut self, index: usize) -> DdlResult<FieldSpec> {
        self.check_index(index)?;
        if self.context == EditContext::Create && self.fields.len() == 1 {
            return Err(DdlError::LastField);
        }
        Ok(self.fields.remove(index))
    }

    pub fn move_up(&mut self, index: usize) -> DdlResult<()> {
        self.check_index(index)?;
        if index > 0 {
            self.fields.swap(index - 1, index);
        }
        Ok(())
    }

    pub fn move_down(&mut self, index: usize) -> DdlResult<()> {
        self.check_index(index)?;
        if index + 1 < self.fields.len() {
            self.fields.swap(index, index + 1);
        }
        Ok(())
    }

    pub fn update_field(&mut self, index: usize, update: FieldUpdate) -> DdlResult<()> {
        self.check_index(index)?;
        let context = self.context;
        self.fields[index].apply(update, context);
        Ok(())
    }

    pub fn apply(&mut self, operation: FieldOperation) -> DdlResult<()> {
        match operation {
            FieldOperation::Add => {
                self.add_field();
                Ok(())
            }
            FieldOperation::Delete { index } => self.delete_field(index).map(|_| ()),
            FieldOperation::MoveUp { index } => self.move_up(index),
            FieldOperation::MoveDown { index } => self.move_down(index),
            FieldOperation::Update { index, update } => self.update_field(index, update),
        }
    }

    /// Runs the normalization pass over every field.
    pub fn normalize(&mut self) {
        let context = self.context;
        for field in &mut self.fields {
            field.normalize(context);
        }
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_primary)
    }

    pub fn synthesize_create(&self) -> DdlResult<String> {
        synth::synthesize_create(&self.name, &self.fields)
    }
}

/// An alter session: the snapshot loaded from the database plus the working
/// copy the user edits. The snapshot is never handed out mutably.
#[derive(Debug, Clone)]
pub struct AlterSession {
    original: Vec<FieldSpec>,
    pub definition: TableDefinition,
}

impl AlterSession {
    pub fn load(table: impl Into<String>, loaded: Vec<FieldSpec>) -> Self {
        let working = loaded.clone();
        Self {
            original: loaded,
            definition: TableDefinition::for_alter(table, working),
        }
    }

    pub fn original(&self) -> &[FieldSpec] {
        &self.original
    }

    pub fn synthesize(&self) -> DdlResult<AlterOutcome> {
        synth::synthesize_alter(
            &self.definition.name,
            &self.definition.fields,
            &self.original,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(table: &TableDefinition) -> Vec<&str> {
        table.fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_create_is_seeded_with_id() {
        let table = TableDefinition::for_create("users");
        assert_eq!(table.len(), 1);
        let id = &table.fields[0];
        assert_eq!(id.name, "id");
        assert!(id.is_primary && id.auto_increment && id.not_null);
    }

    #[test]
    fn test_cannot_delete_last_field_in_create() {
        let mut table = TableDefinition::for_create("users");
        assert_eq!(table.delete_field(0), Err(DdlError::LastField));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_alter_can_delete_every_field() {
        let mut table = TableDefinition::for_alter("t", vec![FieldSpec::new("a", "int")]);
        assert!(table.delete_field(0).is_ok());
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_field_marks_new_only_in_alter() {
        let mut create = TableDefinition::for_create("t");
        let idx = create.add_field();
        assert!(!create.fields[idx].is_new);

        let mut alter = TableDefinition::for_alter("t", vec![]);
        let idx = alter.add_field();
        assert!(alter.fields[idx].is_new);
    }

    #[test]
    fn test_move_is_noop_at_boundaries() {
        let mut table = TableDefinition::for_alter(
            "t",
            vec![FieldSpec::new("a", "int"), FieldSpec::new("b", "int")],
        );
        table.move_up(0).unwrap();
        table.move_down(1).unwrap();
        assert_eq!(names(&table), ["a", "b"]);

        table.move_down(0).unwrap();
        assert_eq!(names(&table), ["b", "a"]);
        table.move_up(1).unwrap();
        assert_eq!(names(&table), ["a", "b"]);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut table = TableDefinition::for_create("t");
        assert_eq!(
            table.move_up(3),
            Err(DdlError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(table
            .update_field(5, FieldUpdate::Name("x".into()))
            .is_err());
    }

    #[test]
    fn test_update_uses_table_context() {
        let mut table = TableDefinition::for_alter("t", vec![FieldSpec::new("n", "int")]);
        table
            .update_field(0, FieldUpdate::AutoIncrement(true))
            .unwrap();
        assert!(!table.fields[0].is_primary);
    }

    #[test]
    fn test_apply_operations_from_json() {
        let mut table = TableDefinition::for_create("t");
        let ops = r#"[
            {"op":"add"},
            {"op":"update","index":1,"update":{"attribute":"name","value":"email"}},
            {"op":"update","index":1,"update":{"attribute":"type","value":"text"}},
            {"op":"moveUp","index":1}
        ]"#;
        let ops: Vec<FieldOperation> = serde_json::from_str(ops).unwrap();
        for op in ops {
            table.apply(op).unwrap();
        }
        assert_eq!(names(&table), ["email", "id"]);
        assert_eq!(table.fields[0].length, None);
    }

    #[test]
    fn test_alter_session_snapshot_is_independent() {
        let mut session = AlterSession::load("t", vec![FieldSpec::new("a", "int")]);
        session
            .definition
            .update_field(0, FieldUpdate::Comment(Some("edited".into())))
            .unwrap();
        assert_eq!(session.original()[0].comment, None);
        assert!(matches!(
            session.synthesize().unwrap(),
            AlterOutcome::Statement(_)
        ));
    }
}
