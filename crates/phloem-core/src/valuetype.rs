//! The closed catalogue of property valuetypes.
//!
//! Valuetypes classify configuration property values and expression
//! results. The same literal-acceptance rules back both runtime-parameter
//! coercion and table-cell validation.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static INTEGER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*$").unwrap());
static DECIMAL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?$").unwrap());

/// The static type of a configuration property or expression result.
/// Exactly one of these applies to any property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyValuetype {
    Text,
    Integer,
    Decimal,
    Boolean,
    CellRange,
    Regex,
    Collection,
    ValuetypeAssignment,
    Constraint,
}

impl std::fmt::Display for PropertyValuetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PropertyValuetype::Text => "text",
            PropertyValuetype::Integer => "integer",
            PropertyValuetype::Decimal => "decimal",
            PropertyValuetype::Boolean => "boolean",
            PropertyValuetype::CellRange => "cell-range",
            PropertyValuetype::Regex => "regex",
            PropertyValuetype::Collection => "collection",
            PropertyValuetype::ValuetypeAssignment => "valuetype-assignment",
            PropertyValuetype::Constraint => "constraint",
        };
        write!(f, "{name}")
    }
}

impl PropertyValuetype {
    pub fn is_numeric(self) -> bool {
        matches!(self, PropertyValuetype::Integer | PropertyValuetype::Decimal)
    }

    /// Whether a value of this type may be supplied from an external
    /// string environment entry.
    pub fn allows_runtime_parameter(self) -> bool {
        match self {
            PropertyValuetype::Text
            | PropertyValuetype::Integer
            | PropertyValuetype::Decimal
            | PropertyValuetype::Boolean => true,
            PropertyValuetype::CellRange
            | PropertyValuetype::Regex
            | PropertyValuetype::Collection
            | PropertyValuetype::ValuetypeAssignment
            | PropertyValuetype::Constraint => false,
        }
    }

    /// Whether a raw textual value is a valid literal of this type.
    ///
    /// Integers must not carry a sign or a leading zero. Types without a
    /// bare string form accept nothing.
    pub fn accepts_literal(self, raw: &str) -> bool {
        match self {
            PropertyValuetype::Text => true,
            PropertyValuetype::Integer => INTEGER_LITERAL.is_match(raw),
            PropertyValuetype::Decimal => DECIMAL_LITERAL.is_match(raw),
            PropertyValuetype::Boolean => raw == "true" || raw == "false",
            PropertyValuetype::CellRange
            | PropertyValuetype::Regex
            | PropertyValuetype::Collection
            | PropertyValuetype::ValuetypeAssignment
            | PropertyValuetype::Constraint => false,
        }
    }
}
