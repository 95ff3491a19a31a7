//! The operator registry: a closed set of operator kinds, each carrying a
//! type-inference function and an evaluation function.
//!
//! Inference reports mismatches as diagnostics and yields `None` for an
//! untypeable expression. Evaluation assumes inference already succeeded;
//! a value of the wrong runtime shape is a representation-invariant
//! violation and panics.

use crate::ast::{BinaryExpression, UnaryExpression};
use crate::diagnostic::{DiagnosticSink, Severity};
use crate::expression::EvalValue;
use crate::valuetype::PropertyValuetype;
use serde::Deserialize;

/// Operators with a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "not")]
    Not,
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "not"),
        }
    }
}

impl UnaryOperator {
    /// Infer the result type from the operand type.
    pub fn infer_type(
        self,
        inner: PropertyValuetype,
        expression: &UnaryExpression,
        sink: &mut DiagnosticSink,
    ) -> Option<PropertyValuetype> {
        match self {
            UnaryOperator::Not => {
                if inner != PropertyValuetype::Boolean {
                    sink.accept(
                        Severity::Error,
                        format!(
                            "The operand needs to be of type {} but is of type {}",
                            PropertyValuetype::Boolean,
                            inner
                        ),
                        expression.expr.span(),
                    );
                    return None;
                }
                Some(PropertyValuetype::Boolean)
            }
        }
    }

    /// Evaluate on a value whose type inference already succeeded.
    pub fn evaluate(self, inner: EvalValue) -> EvalValue {
        match self {
            UnaryOperator::Not => EvalValue::Boolean(!as_boolean(inner)),
        }
    }
}

/// Operators with a left and a right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "xor")]
    Xor,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Xor => "xor",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        };
        write!(f, "{symbol}")
    }
}

impl BinaryOperator {
    /// Infer the result type from the operand types.
    pub fn infer_type(
        self,
        left: PropertyValuetype,
        right: PropertyValuetype,
        expression: &BinaryExpression,
        sink: &mut DiagnosticSink,
    ) -> Option<PropertyValuetype> {
        match self {
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                infer_equality(left, right, expression, sink)
            }
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => infer_relational(left, right, expression, sink),
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Xor => {
                infer_logical(left, right, expression, sink)
            }
            BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Multiply => {
                infer_arithmetic(left, right, expression, sink, true)
            }
            BinaryOperator::Divide => infer_arithmetic(left, right, expression, sink, false),
        }
    }

    /// Evaluate with a lazily supplied right operand; `and` and `or`
    /// short-circuit and leave the right operand unevaluated.
    pub fn evaluate(self, left: EvalValue, right: impl FnOnce() -> EvalValue) -> EvalValue {
        match self {
            BinaryOperator::And => {
                if !as_boolean(left) {
                    return EvalValue::Boolean(false);
                }
                EvalValue::Boolean(as_boolean(right()))
            }
            BinaryOperator::Or => {
                if as_boolean(left) {
                    return EvalValue::Boolean(true);
                }
                EvalValue::Boolean(as_boolean(right()))
            }
            BinaryOperator::Xor => EvalValue::Boolean(as_boolean(left) ^ as_boolean(right())),
            BinaryOperator::Equal => EvalValue::Boolean(values_equal(&left, &right())),
            BinaryOperator::NotEqual => EvalValue::Boolean(!values_equal(&left, &right())),
            BinaryOperator::Less => EvalValue::Boolean(as_number(&left) < as_number(&right())),
            BinaryOperator::LessEqual => {
                EvalValue::Boolean(as_number(&left) <= as_number(&right()))
            }
            BinaryOperator::Greater => EvalValue::Boolean(as_number(&left) > as_number(&right())),
            BinaryOperator::GreaterEqual => {
                EvalValue::Boolean(as_number(&left) >= as_number(&right()))
            }
            BinaryOperator::Add => arithmetic(left, right(), i64::wrapping_add, |a, b| a + b),
            BinaryOperator::Subtract => {
                arithmetic(left, right(), i64::wrapping_sub, |a, b| a - b)
            }
            BinaryOperator::Multiply => {
                arithmetic(left, right(), i64::wrapping_mul, |a, b| a * b)
            }
            BinaryOperator::Divide => {
                EvalValue::Decimal(as_number(&left) / as_number(&right()))
            }
        }
    }
}

fn infer_equality(
    left: PropertyValuetype,
    right: PropertyValuetype,
    expression: &BinaryExpression,
    sink: &mut DiagnosticSink,
) -> Option<PropertyValuetype> {
    if left != right {
        if left.is_numeric() && right.is_numeric() {
            sink.accept(
                Severity::Warning,
                format!("The operands are of different numeric types (left: {left}, right: {right})"),
                expression.span,
            );
        } else {
            sink.accept(
                Severity::Error,
                format!(
                    "The types of the operands need to be equal but they differ (left: {left}, right: {right})"
                ),
                expression.span,
            );
            return None;
        }
    }
    Some(PropertyValuetype::Boolean)
}

fn infer_relational(
    left: PropertyValuetype,
    right: PropertyValuetype,
    expression: &BinaryExpression,
    sink: &mut DiagnosticSink,
) -> Option<PropertyValuetype> {
    if !left.is_numeric() {
        sink.accept(
            Severity::Error,
            format!(
                "The operand needs to be of type {} or {} but is of type {}",
                PropertyValuetype::Decimal,
                PropertyValuetype::Integer,
                left
            ),
            expression.left.span(),
        );
        return None;
    }
    if !right.is_numeric() {
        sink.accept(
            Severity::Error,
            format!(
                "The operand needs to be of type {} or {} but is of type {}",
                PropertyValuetype::Decimal,
                PropertyValuetype::Integer,
                right
            ),
            expression.right.span(),
        );
        return None;
    }
    if left != right {
        sink.accept(
            Severity::Warning,
            format!("The operands are of different numeric types (left: {left}, right: {right})"),
            expression.span,
        );
    }
    Some(PropertyValuetype::Boolean)
}

fn infer_logical(
    left: PropertyValuetype,
    right: PropertyValuetype,
    expression: &BinaryExpression,
    sink: &mut DiagnosticSink,
) -> Option<PropertyValuetype> {
    if left != PropertyValuetype::Boolean || right != PropertyValuetype::Boolean {
        if left != PropertyValuetype::Boolean {
            sink.accept(
                Severity::Error,
                format!(
                    "The operand needs to be of type {} but is of type {}",
                    PropertyValuetype::Boolean,
                    left
                ),
                expression.left.span(),
            );
        }
        if right != PropertyValuetype::Boolean {
            sink.accept(
                Severity::Error,
                format!(
                    "The operand needs to be of type {} but is of type {}",
                    PropertyValuetype::Boolean,
                    right
                ),
                expression.right.span(),
            );
        }
        return None;
    }
    Some(PropertyValuetype::Boolean)
}

fn infer_arithmetic(
    left: PropertyValuetype,
    right: PropertyValuetype,
    expression: &BinaryExpression,
    sink: &mut DiagnosticSink,
    integer_preserving: bool,
) -> Option<PropertyValuetype> {
    if !left.is_numeric() {
        sink.accept(
            Severity::Error,
            format!(
                "The operand needs to be of type {} or {} but is of type {}",
                PropertyValuetype::Decimal,
                PropertyValuetype::Integer,
                left
            ),
            expression.left.span(),
        );
        return None;
    }
    if !right.is_numeric() {
        sink.accept(
            Severity::Error,
            format!(
                "The operand needs to be of type {} or {} but is of type {}",
                PropertyValuetype::Decimal,
                PropertyValuetype::Integer,
                right
            ),
            expression.right.span(),
        );
        return None;
    }
    if integer_preserving
        && left == PropertyValuetype::Integer
        && right == PropertyValuetype::Integer
    {
        Some(PropertyValuetype::Integer)
    } else {
        Some(PropertyValuetype::Decimal)
    }
}

fn as_boolean(value: EvalValue) -> bool {
    match value {
        EvalValue::Boolean(b) => b,
        other => panic!("operand must be a boolean value but is {other:?}"),
    }
}

fn as_number(value: &EvalValue) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("operand must be a numeric value but is {value:?}"))
}

fn values_equal(left: &EvalValue, right: &EvalValue) -> bool {
    match (left, right) {
        (l, r) if l.is_numeric() && r.is_numeric() => as_number(l) == as_number(r),
        (EvalValue::Boolean(l), EvalValue::Boolean(r)) => l == r,
        (EvalValue::Text(l), EvalValue::Text(r)) => l == r,
        (l, r) => panic!("equality operands must share a runtime shape but are {l:?} and {r:?}"),
    }
}

fn arithmetic(
    left: EvalValue,
    right: EvalValue,
    int_op: impl FnOnce(i64, i64) -> i64,
    float_op: impl FnOnce(f64, f64) -> f64,
) -> EvalValue {
    match (&left, &right) {
        (EvalValue::Integer(l), EvalValue::Integer(r)) => EvalValue::Integer(int_op(*l, *r)),
        _ => EvalValue::Decimal(float_op(as_number(&left), as_number(&right))),
    }
}
