//! Expression walking: bottom-up type inference and constant evaluation.
//!
//! Evaluation covers only expressions that are constant at configuration
//! time. Runtime parameter placeholders are substituted by the parameter
//! resolver before any value reaches an executor, so they never appear
//! inside an expression tree handed to [`evaluate_expression`].

use crate::ast::{Expression, Literal, LiteralKind};
use crate::diagnostic::DiagnosticSink;
use crate::valuetype::PropertyValuetype;

/// A constant value produced by expression evaluation or runtime
/// parameter coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl EvalValue {
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            EvalValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            EvalValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EvalValue::Integer(n) => Some(*n as f64),
            EvalValue::Decimal(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EvalValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, EvalValue::Integer(_) | EvalValue::Decimal(_))
    }

    pub fn valuetype(&self) -> PropertyValuetype {
        match self {
            EvalValue::Boolean(_) => PropertyValuetype::Boolean,
            EvalValue::Integer(_) => PropertyValuetype::Integer,
            EvalValue::Decimal(_) => PropertyValuetype::Decimal,
            EvalValue::Text(_) => PropertyValuetype::Text,
        }
    }
}

impl std::fmt::Display for EvalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalValue::Boolean(b) => write!(f, "{b}"),
            EvalValue::Integer(n) => write!(f, "{n}"),
            EvalValue::Decimal(n) => write!(f, "{n}"),
            EvalValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Infer the type of an expression bottom-up, reporting operand
/// mismatches to the sink. Returns `None` if the expression (or one of
/// its operands) is untypeable.
pub fn infer_expression_type(
    expression: &Expression,
    sink: &mut DiagnosticSink,
) -> Option<PropertyValuetype> {
    match expression {
        Expression::Literal(literal) => Some(infer_literal_type(literal)),
        Expression::Unary(unary) => {
            let inner = infer_expression_type(&unary.expr, sink)?;
            unary.op.infer_type(inner, unary, sink)
        }
        Expression::Binary(binary) => {
            let left = infer_expression_type(&binary.left, sink);
            let right = infer_expression_type(&binary.right, sink);
            binary.op.infer_type(left?, right?, binary, sink)
        }
    }
}

fn infer_literal_type(literal: &Literal) -> PropertyValuetype {
    match &literal.kind {
        LiteralKind::Text(_) => PropertyValuetype::Text,
        LiteralKind::Boolean(_) => PropertyValuetype::Boolean,
        LiteralKind::Integer(_) => PropertyValuetype::Integer,
        // A numeric literal is an integer iff its value is a mathematical
        // integer, regardless of how it was written.
        LiteralKind::Decimal(value) => {
            if value.is_finite() && value.fract() == 0.0 {
                PropertyValuetype::Integer
            } else {
                PropertyValuetype::Decimal
            }
        }
    }
}

/// Evaluate a constant expression. Assumes type inference succeeded;
/// operands of the wrong runtime shape panic.
pub fn evaluate_expression(expression: &Expression) -> EvalValue {
    match expression {
        Expression::Literal(literal) => match &literal.kind {
            LiteralKind::Boolean(b) => EvalValue::Boolean(*b),
            LiteralKind::Integer(n) => EvalValue::Integer(*n),
            LiteralKind::Decimal(n) => EvalValue::Decimal(*n),
            LiteralKind::Text(s) => EvalValue::Text(s.clone()),
        },
        Expression::Unary(unary) => unary.op.evaluate(evaluate_expression(&unary.expr)),
        Expression::Binary(binary) => binary
            .op
            .evaluate(evaluate_expression(&binary.left), || {
                evaluate_expression(&binary.right)
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::operators::{BinaryOperator, UnaryOperator};

    fn int(value: i64) -> Expression {
        Expression::literal(LiteralKind::Integer(value), Span::default())
    }

    fn decimal(value: f64) -> Expression {
        Expression::literal(LiteralKind::Decimal(value), Span::default())
    }

    fn text(value: &str) -> Expression {
        Expression::literal(LiteralKind::Text(value.into()), Span::default())
    }

    fn boolean(value: bool) -> Expression {
        Expression::literal(LiteralKind::Boolean(value), Span::default())
    }

    #[test]
    fn test_literal_inference() {
        let mut sink = DiagnosticSink::new();
        assert_eq!(
            infer_expression_type(&int(1), &mut sink),
            Some(PropertyValuetype::Integer)
        );
        assert_eq!(
            infer_expression_type(&decimal(1.5), &mut sink),
            Some(PropertyValuetype::Decimal)
        );
        // Mathematical integers infer as integer even when written 1.0.
        assert_eq!(
            infer_expression_type(&decimal(1.0), &mut sink),
            Some(PropertyValuetype::Integer)
        );
        assert_eq!(
            infer_expression_type(&text("a"), &mut sink),
            Some(PropertyValuetype::Text)
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_equality_of_equal_types() {
        let mut sink = DiagnosticSink::new();
        let expression = Expression::binary(BinaryOperator::Equal, int(1), int(2), Span::default());
        assert_eq!(
            infer_expression_type(&expression, &mut sink),
            Some(PropertyValuetype::Boolean)
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_equality_of_incompatible_types() {
        let mut sink = DiagnosticSink::new();
        let expression =
            Expression::binary(BinaryOperator::Equal, int(1), text("a"), Span::default());
        assert_eq!(infer_expression_type(&expression, &mut sink), None);
        assert_eq!(sink.len(), 1);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_equality_of_mixed_numerics() {
        let mut sink = DiagnosticSink::new();
        let expression =
            Expression::binary(BinaryOperator::Equal, int(1), decimal(1.5), Span::default());
        assert_eq!(
            infer_expression_type(&expression, &mut sink),
            Some(PropertyValuetype::Boolean)
        );
        assert_eq!(sink.len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_logical_names_the_offending_side() {
        let mut sink = DiagnosticSink::new();
        let right = Expression::literal(LiteralKind::Integer(1), Span::new(9, 10));
        let expression =
            Expression::binary(BinaryOperator::And, boolean(true), right, Span::new(0, 10));
        assert_eq!(infer_expression_type(&expression, &mut sink), None);

        let diagnostics: Vec<_> = sink.iter().collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span, Span::new(9, 10));
        assert!(diagnostics[0].message.contains("boolean"));
    }

    #[test]
    fn test_untypeable_operand_propagates() {
        let mut sink = DiagnosticSink::new();
        let bad = Expression::binary(BinaryOperator::Equal, int(1), text("a"), Span::default());
        let expression =
            Expression::binary(BinaryOperator::And, bad, boolean(true), Span::default());
        assert_eq!(infer_expression_type(&expression, &mut sink), None);
        // Only the inner mismatch is reported; the outer operator never
        // sees a typed left operand.
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_constant_evaluation() {
        let left = Expression::binary(BinaryOperator::Greater, int(3), int(2), Span::default());
        let right = Expression::binary(BinaryOperator::Greater, int(2), int(3), Span::default());
        let expression = Expression::binary(BinaryOperator::And, left, right, Span::default());
        assert_eq!(evaluate_expression(&expression), EvalValue::Boolean(false));
    }

    #[test]
    fn test_or_skips_right_operand() {
        // The right operand would panic if evaluated: `not` on an integer.
        let poisoned = Expression::unary(UnaryOperator::Not, int(1), Span::default());
        let expression =
            Expression::binary(BinaryOperator::Or, boolean(true), poisoned, Span::default());
        assert_eq!(evaluate_expression(&expression), EvalValue::Boolean(true));
    }

    #[test]
    fn test_and_skips_right_operand() {
        let poisoned = Expression::unary(UnaryOperator::Not, int(1), Span::default());
        let expression =
            Expression::binary(BinaryOperator::And, boolean(false), poisoned, Span::default());
        assert_eq!(evaluate_expression(&expression), EvalValue::Boolean(false));
    }

    #[test]
    fn test_not_evaluation() {
        let expression = Expression::unary(UnaryOperator::Not, boolean(false), Span::default());
        assert_eq!(evaluate_expression(&expression), EvalValue::Boolean(true));
    }

    #[test]
    fn test_arithmetic_evaluation() {
        let expression =
            Expression::binary(BinaryOperator::Add, int(40), int(2), Span::default());
        assert_eq!(evaluate_expression(&expression), EvalValue::Integer(42));

        let expression =
            Expression::binary(BinaryOperator::Multiply, decimal(1.5), int(2), Span::default());
        assert_eq!(evaluate_expression(&expression), EvalValue::Decimal(3.0));
    }
}
