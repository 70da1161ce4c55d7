// SPDX-License-Identifier: Apache-2.0

//! Type Catalog
//!
//! Static registry of the column types offered by the table designer and
//! what each of them accepts.

use serde::Serialize;

/// Capabilities of a single column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub has_length: bool,
    pub has_decimals: bool,
    pub has_options: bool,
    /// DEFAULT literals are written as quoted strings for this type
    #[serde(skip)]
    pub quotes_default: bool,
}

const fn descriptor(
    name: &'static str,
    has_length: bool,
    has_decimals: bool,
    has_options: bool,
    quotes_default: bool,
) -> TypeDescriptor {
    TypeDescriptor {
        name,
        has_length,
        has_decimals,
        has_options,
        quotes_default,
    }
}

/// Supported column types, in the order the designer presents them.
pub static TYPE_CATALOG: &[TypeDescriptor] = &[
    descriptor("varchar", true, false, false, true),
    descriptor("char", true, false, false, true),
    descriptor("text", false, false, false, true),
    descriptor("int", true, false, false, false),
    descriptor("bigint", true, false, false, false),
    descriptor("float", true, true, false, false),
    descriptor("double", true, true, false, false),
    descriptor("decimal", true, true, false, false),
    descriptor("datetime", false, false, false, true),
    descriptor("date", false, false, false, true),
    descriptor("time", false, false, false, true),
    descriptor("timestamp", false, false, false, true),
    descriptor("boolean", false, false, false, false),
    descriptor("enum", false, false, true, true),
    descriptor("set", false, false, true, true),
    descriptor("json", false, false, false, false),
    descriptor("blob", false, false, false, false),
    descriptor("longblob", false, false, false, false),
];

/// Looks up a type by name, ignoring case and surrounding whitespace.
///
/// Returns `None` for names outside the catalog. Callers that still need to
/// render such a type (for example one loaded from a live table) must fall
/// back to pass-through behavior.
pub fn descriptor_for(type_name: &str) -> Option<&'static TypeDescriptor> {
    let needle = type_name.trim();
    TYPE_CATALOG
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(needle))
}

/// Types that may carry AUTO_INCREMENT.
pub fn supports_auto_increment(type_name: &str) -> bool {
    let t = type_name.trim();
    t.eq_ignore_ascii_case("int") || t.eq_ignore_ascii_case("bigint")
}

/// Length filled in when a type that takes one is selected with no length.
pub fn default_length(type_name: &str) -> u32 {
    if type_name.trim().eq_ignore_ascii_case("varchar") {
        255
    } else {
        11
    }
}
