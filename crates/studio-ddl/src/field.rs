// SPDX-License-Identifier: Apache-2.0

//! Field Model
//!
//! A [`FieldSpec`] is one column under edit. Invalid flag combinations are
//! corrected by [`FieldSpec::normalize`] rather than rejected; every
//! attribute change goes through [`FieldSpec::apply`], which runs the
//! normalization pass afterwards.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, TypeDescriptor};
use crate::lenient;

/// Which designer is editing the field.
///
/// The create designer treats AUTO_INCREMENT as implying PRIMARY KEY; the
/// alter designer only implies NOT NULL, so an existing key layout is never
/// changed behind the user's back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditContext {
    #[default]
    Create,
    Alter,
}

impl EditContext {
    pub fn auto_increment_implies_primary(self) -> bool {
        matches!(self, EditContext::Create)
    }
}

/// One column definition under edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, with = "lenient::number")]
    pub length: Option<u32>,
    #[serde(default, with = "lenient::number")]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, with = "lenient::scalar")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Literal values for ENUM / SET columns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Set for fields added during an alter session
    #[serde(default)]
    pub is_new: bool,
}

/// A single attribute assignment, as sent by the designer UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "attribute", content = "value", rename_all = "camelCase")]
pub enum FieldUpdate {
    Name(String),
    Type(String),
    Length(#[serde(with = "lenient::number")] Option<u32>),
    Decimals(#[serde(with = "lenient::number")] Option<u32>),
    NotNull(bool),
    IsPrimary(bool),
    AutoIncrement(bool),
    DefaultValue(#[serde(with = "lenient::scalar")] Option<String>),
    Comment(Option<String>),
    Options(Vec<String>),
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            length: None,
            decimals: None,
            not_null: false,
            is_primary: false,
            auto_increment: false,
            default_value: None,
            comment: None,
            options: Vec::new(),
            is_new: false,
        }
    }

    /// The row appended by "add field": unnamed `varchar(255)`, all flags off.
    pub fn blank() -> Self {
        Self::new("", "varchar").with_length(255)
    }

    /// The seed field of a new table.
    pub fn default_id() -> Self {
        let mut field = Self::new("id", "int").with_length(11);
        field.not_null = true;
        field.is_primary = true;
        field.auto_increment = true;
        field.comment = Some("Primary key".to_string());
        field
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.not_null = true;
        self
    }

    pub fn new_in_alter(mut self) -> Self {
        self.is_new = true;
        self
    }

    pub fn descriptor(&self) -> Option<&'static TypeDescriptor> {
        catalog::descriptor_for(&self.data_type)
    }

    /// Sets one attribute, applies the cascade tied to that attribute, then
    /// runs [`normalize`](Self::normalize).
    pub fn apply(&mut self, update: FieldUpdate, context: EditContext) {
        match update {
            FieldUpdate::Name(name) => self.name = name,
            FieldUpdate::Type(data_type) => {
                self.data_type = data_type.trim().to_lowercase();
                if let Some(descriptor) = self.descriptor() {
                    if descriptor.has_length && self.length.is_none() {
                        self.length = Some(catalog::default_length(descriptor.name));
                    }
                }
            }
            FieldUpdate::Length(length) => self.length = length,
            FieldUpdate::Decimals(decimals) => self.decimals = decimals,
            FieldUpdate::NotNull(value) => self.not_null = value,
            FieldUpdate::IsPrimary(value) => {
                self.is_primary = value;
                if value {
                    self.not_null = true;
                }
            }
            FieldUpdate::AutoIncrement(value) => {
                self.auto_increment = value;
                if value {
                    self.not_null = true;
                    if context.auto_increment_implies_primary() {
                        self.is_primary = true;
                    }
                }
            }
            FieldUpdate::DefaultValue(value) => self.default_value = value,
            FieldUpdate::Comment(comment) => self.comment = comment,
            FieldUpdate::Options(options) => self.options = options,
        }

        self.normalize(context);
    }

    /// Restores the field invariants after any mutation.
    ///
    /// Types outside the catalog keep their length, decimals and
    /// AUTO_INCREMENT untouched since their capabilities are unknown.
    pub fn normalize(&mut self, context: EditContext) {
        if let Some(descriptor) = self.descriptor() {
            if !descriptor.has_length {
                self.length = None;
            }
            if !descriptor.has_decimals {
                self.decimals = None;
            }
            if !descriptor.has_options {
                self.options.clear();
            }
            if self.auto_increment && !catalog::supports_auto_increment(descriptor.name) {
                self.auto_increment = false;
            }
        }

        if self.auto_increment {
            self.not_null = true;
            if context.auto_increment_implies_primary() {
                self.is_primary = true;
            }
        }
        if self.is_primary {
            self.not_null = true;
        }

        if self.default_value.as_deref().is_some_and(str::is_empty) {
            self.default_value = None;
        }
        if self.comment.as_deref().is_some_and(str::is_empty) {
            self.comment = None;
        }
    }

    /// Compares everything that ends up in a column definition.
    ///
    /// `is_new` is ignored; blank defaults/comments equal absent ones and
    /// type names compare case-insensitively.
    pub fn same_definition(&self, other: &FieldSpec) -> bool {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        self.name == other.name
            && self.data_type.trim().eq_ignore_ascii_case(other.data_type.trim())
            && self.length == other.length
            && self.decimals == other.decimals
            && self.not_null == other.not_null
            && self.is_primary == other.is_primary
            && self.auto_increment == other.auto_increment
            && present(&self.default_value) == present(&other.default_value)
            && present(&self.comment) == present(&other.comment)
            && self.options == other.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_field() {
        let field = FieldSpec::blank();
        assert_eq!(field.name, "");
        assert_eq!(field.data_type, "varchar");
        assert_eq!(field.length, Some(255));
        assert!(!field.not_null && !field.is_primary && !field.auto_increment);
    }

    #[test]
    fn test_auto_increment_in_create_forces_primary() {
        let mut field = FieldSpec::new("id", "int");
        field.apply(FieldUpdate::AutoIncrement(true), EditContext::Create);
        assert!(field.auto_increment);
        assert!(field.not_null);
        assert!(field.is_primary);
    }

    #[test]
    fn test_auto_increment_in_alter_keeps_key_layout() {
        let mut field = FieldSpec::new("seq", "bigint");
        field.apply(FieldUpdate::AutoIncrement(true), EditContext::Alter);
        assert!(field.auto_increment);
        assert!(field.not_null);
        assert!(!field.is_primary);
    }

    #[test]
    fn test_auto_increment_on_text_type_is_dropped() {
        let mut field = FieldSpec::new("code", "varchar").with_length(20);
        field.apply(FieldUpdate::AutoIncrement(true), EditContext::Create);
        assert!(!field.auto_increment);
        assert!(field.not_null);
    }

    #[test]
    fn test_primary_forces_not_null() {
        let mut field = FieldSpec::new("code", "char").with_length(2);
        field.apply(FieldUpdate::IsPrimary(true), EditContext::Alter);
        assert!(field.not_null);

        field.apply(FieldUpdate::NotNull(false), EditContext::Alter);
        assert!(field.not_null, "primary key columns stay NOT NULL");
    }

    #[test]
    fn test_type_change_clears_length_and_decimals() {
        let mut field = FieldSpec::new("price", "decimal")
            .with_length(10)
            .with_decimals(2);
        field.apply(FieldUpdate::Type("text".into()), EditContext::Create);
        assert_eq!(field.length, None);
        assert_eq!(field.decimals, None);
    }

    #[test]
    fn test_type_change_defaults_empty_length() {
        let mut field = FieldSpec::new("note", "text");
        field.apply(FieldUpdate::Type("VARCHAR".into()), EditContext::Create);
        assert_eq!(field.data_type, "varchar");
        assert_eq!(field.length, Some(255));

        let mut field = FieldSpec::new("qty", "json");
        field.apply(FieldUpdate::Type("int".into()), EditContext::Create);
        assert_eq!(field.length, Some(11));
    }

    #[test]
    fn test_type_change_keeps_existing_length() {
        let mut field = FieldSpec::new("code", "varchar").with_length(32);
        field.apply(FieldUpdate::Type("char".into()), EditContext::Create);
        assert_eq!(field.length, Some(32));
    }

    #[test]
    fn test_type_change_drops_auto_increment() {
        let mut field = FieldSpec::default_id();
        field.apply(FieldUpdate::Type("varchar".into()), EditContext::Create);
        assert!(!field.auto_increment);
        assert!(field.is_primary);
    }

    #[test]
    fn test_type_change_clears_options() {
        let mut field = FieldSpec::new("state", "enum");
        field.apply(
            FieldUpdate::Options(vec!["on".into(), "off".into()]),
            EditContext::Create,
        );
        assert_eq!(field.options.len(), 2);
        field.apply(FieldUpdate::Type("varchar".into()), EditContext::Create);
        assert!(field.options.is_empty());
    }

    #[test]
    fn test_unknown_type_keeps_loaded_attributes() {
        let mut field = FieldSpec::new("flag", "tinyint").with_length(1);
        field.auto_increment = true;
        field.apply(FieldUpdate::Comment(Some("x".into())), EditContext::Alter);
        assert_eq!(field.length, Some(1));
        assert!(field.auto_increment);
    }

    #[test]
    fn test_blank_default_and_comment_become_absent() {
        let mut field = FieldSpec::new("a", "int");
        field.apply(FieldUpdate::DefaultValue(Some(String::new())), EditContext::Create);
        field.apply(FieldUpdate::Comment(Some(String::new())), EditContext::Create);
        assert_eq!(field.default_value, None);
        assert_eq!(field.comment, None);
    }

    #[test]
    fn test_same_definition_ignores_is_new_and_blank_comment() {
        let a = FieldSpec::new("a", "INT").with_comment("");
        let b = FieldSpec::new("a", "int").new_in_alter();
        assert!(a.same_definition(&b));
        assert!(!a.same_definition(&b.clone().with_comment("changed")));
    }

    #[test]
    fn test_deserialize_form_values() {
        let json = r#"{
            "name": "price",
            "type": "decimal",
            "length": "10",
            "decimals": "",
            "notNull": true,
            "defaultValue": 0,
            "comment": "it's"
        }"#;
        let field: FieldSpec = serde_json::from_str(json).unwrap();
        assert_eq!(field.length, Some(10));
        assert_eq!(field.decimals, None);
        assert_eq!(field.default_value.as_deref(), Some("0"));
        assert!(!field.is_new);
    }

    #[test]
    fn test_deserialize_rejects_garbage_length() {
        let json = r#"{"name":"a","type":"varchar","length":"abc"}"#;
        assert!(serde_json::from_str::<FieldSpec>(json).is_err());
    }

    #[test]
    fn test_field_update_wire_format() {
        let update: FieldUpdate =
            serde_json::from_str(r#"{"attribute":"autoIncrement","value":true}"#).unwrap();
        assert_eq!(update, FieldUpdate::AutoIncrement(true));

        let update: FieldUpdate =
            serde_json::from_str(r#"{"attribute":"length","value":"64"}"#).unwrap();
        assert_eq!(update, FieldUpdate::Length(Some(64)));
    }
}
