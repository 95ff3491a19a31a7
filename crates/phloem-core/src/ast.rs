//! Abstract syntax nodes consumed by the semantic core.
//!
//! The grammar and parser live outside this crate; a front-end hands over
//! blocks, pipes and expressions as the tagged unions below. Definitions
//! can also be loaded from serialized pipeline files (see
//! [`Pipeline::from_bytes`](crate::Pipeline::from_bytes)), in which case
//! spans default to zero.

use crate::diagnostic::DiagnosticSink;
use crate::expression::infer_expression_type;
use crate::operators::{BinaryOperator, UnaryOperator};
use crate::valuetype::PropertyValuetype;
use serde::Deserialize;

/// A half-open byte range into the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// The payload of a literal expression.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LiteralKind {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

/// A literal expression node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "LiteralKind")]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: Span,
}

impl Literal {
    pub fn new(kind: LiteralKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl From<LiteralKind> for Literal {
    fn from(kind: LiteralKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }
}

/// An expression with a single operand.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnaryExpression {
    pub op: UnaryOperator,
    pub expr: Box<Expression>,
    #[serde(default)]
    pub span: Span,
}

/// An expression with a left and a right operand.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinaryExpression {
    pub op: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    #[serde(default)]
    pub span: Span,
}

/// An expression tree: one variant per node kind, matched exhaustively.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Literal(Literal),
}

impl Expression {
    pub fn literal(kind: LiteralKind, span: Span) -> Self {
        Expression::Literal(Literal::new(kind, span))
    }

    pub fn unary(op: UnaryOperator, expr: Expression, span: Span) -> Self {
        Expression::Unary(UnaryExpression {
            op,
            expr: Box::new(expr),
            span,
        })
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression, span: Span) -> Self {
        Expression::Binary(BinaryExpression {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    pub fn span(&self) -> Span {
        match self {
            Expression::Unary(unary) => unary.span,
            Expression::Binary(binary) => binary.span,
            Expression::Literal(literal) => literal.span,
        }
    }
}

/// A placeholder resolved from the external environment at run start.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuntimeParameterRef {
    pub param: String,
    #[serde(default)]
    pub span: Span,
}

/// A literal range of sheet cells, e.g. `A1:B3`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellRangeLiteral {
    pub cells: String,
    #[serde(default)]
    pub span: Span,
}

/// A literal regular expression.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegexLiteral {
    pub regex: String,
    #[serde(default)]
    pub span: Span,
}

/// Assigns a valuetype to a named column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValuetypeAssignment {
    pub column: String,
    pub valuetype: PropertyValuetype,
    #[serde(default)]
    pub span: Span,
}

/// A reference to a named constraint definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConstraintRef {
    pub constraint: String,
    #[serde(default)]
    pub span: Span,
}

/// An ordered collection of property values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Vec<PropertyValue>")]
pub struct CollectionLiteral {
    pub values: Vec<PropertyValue>,
    pub span: Span,
}

impl From<Vec<PropertyValue>> for CollectionLiteral {
    fn from(values: Vec<PropertyValue>) -> Self {
        Self {
            values,
            span: Span::default(),
        }
    }
}

/// The value assigned to a block property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    RuntimeParameter(RuntimeParameterRef),
    CellRange(CellRangeLiteral),
    Regex(RegexLiteral),
    ValuetypeAssignment(ValuetypeAssignment),
    Constraint(ConstraintRef),
    Collection(CollectionLiteral),
    Expression(Expression),
}

impl PropertyValue {
    pub fn span(&self) -> Span {
        match self {
            PropertyValue::RuntimeParameter(r) => r.span,
            PropertyValue::CellRange(c) => c.span,
            PropertyValue::Regex(r) => r.span,
            PropertyValue::ValuetypeAssignment(v) => v.span,
            PropertyValue::Constraint(c) => c.span,
            PropertyValue::Collection(c) => c.span,
            PropertyValue::Expression(e) => e.span(),
        }
    }

    /// Infer the static type of this value. Non-expression literals carry
    /// their type directly; expressions are inferred bottom-up. Runtime
    /// parameter placeholders have no inherent type (their type is the
    /// enclosing property's declared type), so they infer to `None`.
    pub fn infer_type(&self, sink: &mut DiagnosticSink) -> Option<PropertyValuetype> {
        match self {
            PropertyValue::RuntimeParameter(_) => None,
            PropertyValue::CellRange(_) => Some(PropertyValuetype::CellRange),
            PropertyValue::Regex(_) => Some(PropertyValuetype::Regex),
            PropertyValue::ValuetypeAssignment(_) => Some(PropertyValuetype::ValuetypeAssignment),
            PropertyValue::Constraint(_) => Some(PropertyValuetype::Constraint),
            PropertyValue::Collection(_) => Some(PropertyValuetype::Collection),
            PropertyValue::Expression(expression) => infer_expression_type(expression, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_from_yaml() {
        let value: PropertyValue = serde_yaml::from_str("{ param: DB_NAME }").unwrap();
        assert!(matches!(
            value,
            PropertyValue::RuntimeParameter(RuntimeParameterRef { ref param, .. }) if param == "DB_NAME"
        ));

        let value: PropertyValue = serde_yaml::from_str("true").unwrap();
        assert!(matches!(
            value,
            PropertyValue::Expression(Expression::Literal(Literal {
                kind: LiteralKind::Boolean(true),
                ..
            }))
        ));

        let value: PropertyValue =
            serde_yaml::from_str("{ column: Id, valuetype: integer }").unwrap();
        assert!(matches!(
            value,
            PropertyValue::ValuetypeAssignment(ValuetypeAssignment {
                valuetype: PropertyValuetype::Integer,
                ..
            })
        ));
    }

    #[test]
    fn test_expression_from_yaml() {
        let expression: Expression =
            serde_yaml::from_str("{ op: 'and', left: true, right: false }").unwrap();
        let Expression::Binary(binary) = expression else {
            panic!("expected a binary expression");
        };
        assert_eq!(binary.op, BinaryOperator::And);
        assert_eq!(
            *binary.left,
            Expression::literal(LiteralKind::Boolean(true), Span::default())
        );
    }

    #[test]
    fn test_collection_infers_collection_type() {
        let mut sink = DiagnosticSink::new();
        let value = PropertyValue::Collection(CollectionLiteral::from(vec![]));
        assert_eq!(
            value.infer_type(&mut sink),
            Some(PropertyValuetype::Collection)
        );
        assert!(sink.is_empty());
    }
}
