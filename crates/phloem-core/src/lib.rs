//! Phloem: semantic core of a declarative pipeline description language.
//!
//! A pipeline is a set of typed blocks connected by directional pipes.
//! This crate resolves the induced data-flow graph, statically infers and
//! checks the types flowing through it, evaluates configuration-time
//! constant expressions, resolves runtime parameters from an external
//! environment and executes the graph by routing typed artifacts through
//! pluggable block executors, collecting diagnostics instead of aborting
//! on the first error.

mod ast;
mod diagnostic;
mod executor;
mod expression;
mod graph;
mod io;
mod operators;
mod params;
mod signature;
mod valuetype;

pub use ast::{
    BinaryExpression, CellRangeLiteral, CollectionLiteral, ConstraintRef, Expression, Literal,
    LiteralKind, PropertyValue, RegexLiteral, RuntimeParameterRef, Span, UnaryExpression,
    ValuetypeAssignment,
};
pub use diagnostic::{Diagnostic, DiagnosticSink, Severity};
pub use executor::{
    BlockExecutor, ExecutionContext, ExecutionEngine, ExecutorRegistry, RunResult, Timers,
};
pub use expression::{EvalValue, evaluate_expression, infer_expression_type};
pub use graph::{Block, BlockId, Pipe, PipeStatement, Pipeline, PipelineError};
pub use io::{Artifact, BinaryFile, ColumnInfo, FileSystemNode, IOType, Sheet, Table, TextFile};
pub use operators::{BinaryOperator, UnaryOperator};
pub use params::{ParameterSite, collect_runtime_parameters, resolve_runtime_parameters};
pub use signature::{BlockTypeSignature, PropertySpec, SignatureRegistry};
pub use valuetype::PropertyValuetype;
