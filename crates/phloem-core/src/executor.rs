//! The block executor protocol and the execution engine.
//!
//! Executors transform one typed artifact into another. The engine drives
//! them in topological order, enforcing the declared input/output
//! contract, sharing produced artifacts read-only with every consumer and
//! accumulating all diagnostics in one sink for the whole run. A failed
//! block stops its own downstream path; sibling branches continue
//! independently.

use crate::ast::{PropertyValue, Span, ValuetypeAssignment};
use crate::diagnostic::{Diagnostic, DiagnosticSink, Severity};
use crate::expression::{EvalValue, evaluate_expression};
use crate::graph::{Block, BlockId, Pipeline};
use crate::io::{Artifact, IOType};
use crate::params::resolve_runtime_parameters;
use crate::signature::{BlockTypeSignature, SignatureRegistry};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Implemented by every concrete block executor.
///
/// Executors must not mutate artifacts they receive; an input artifact may
/// be shared by several consumers. At most one invocation per block is in
/// flight at any time during a run.
pub trait BlockExecutor: Send + Sync {
    /// The block type this executor handles.
    fn block_type(&self) -> &str;

    /// The artifact type consumed, `IOType::None` for source blocks.
    fn input_type(&self) -> IOType;

    /// The artifact type produced, `IOType::None` for sink blocks.
    fn output_type(&self) -> IOType;

    /// Execute on the input artifact (`None` for a starting block).
    /// Returning `Ok(None)` is valid only for sink blocks.
    fn execute(
        &self,
        input: Option<&Artifact>,
        context: &mut ExecutionContext<'_>,
    ) -> Result<Option<Artifact>, Diagnostic>;
}

/// Registry of block executors, keyed by block type name.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: IndexMap<String, Arc<dyn BlockExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: impl BlockExecutor + 'static) {
        self.executors
            .insert(executor.block_type().to_owned(), Arc::new(executor));
    }

    pub fn get(&self, block_type: &str) -> Option<Arc<dyn BlockExecutor>> {
        self.executors.get(block_type).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn BlockExecutor>> {
        self.executors.values()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

/// Scoped timers for executor instrumentation.
#[derive(Debug, Default)]
pub struct Timers {
    active: IndexMap<String, Instant>,
}

impl Timers {
    pub fn start(&mut self, label: impl Into<String>) {
        self.active.insert(label.into(), Instant::now());
    }

    /// Stop a timer and return its elapsed time, or `None` if no timer
    /// with that label is running.
    pub fn stop(&mut self, label: &str) -> Option<Duration> {
        self.active
            .shift_remove(label)
            .map(|started| started.elapsed())
    }
}

/// Execution state handed to a block executor: the block's resolved
/// property values, the run's shared diagnostic sink and a timer facility
/// for instrumentation.
pub struct ExecutionContext<'a> {
    pub block: &'a Block,
    pub signature: &'a BlockTypeSignature,
    parameters: &'a IndexMap<String, EvalValue>,
    sink: &'a mut DiagnosticSink,
    pub timers: Timers,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        block: &'a Block,
        signature: &'a BlockTypeSignature,
        parameters: &'a IndexMap<String, EvalValue>,
        sink: &'a mut DiagnosticSink,
    ) -> Self {
        Self {
            block,
            signature,
            parameters,
            sink,
            timers: Timers::default(),
        }
    }

    /// Emit a warning into the run's diagnostic sink. Warnings never fail
    /// the run; an executor that cannot proceed returns an error instead.
    pub fn warn(&mut self, message: impl Into<String>, span: Span) {
        self.sink.accept(Severity::Warning, message, span);
    }

    /// The declared property value, if present.
    pub fn property(&self, name: &str) -> Option<&'a PropertyValue> {
        self.block.properties.get(name)
    }

    /// The declared property value.
    ///
    /// # Panics
    ///
    /// Panics if the property is absent; required properties are enforced
    /// during validation.
    pub fn require_property(&self, name: &str) -> &'a PropertyValue {
        self.property(name).unwrap_or_else(|| {
            panic!(
                "block {} has no value for property \"{name}\"",
                self.block.name
            )
        })
    }

    /// Resolve a property to a constant value: expressions are evaluated,
    /// runtime parameter placeholders are substituted from the resolved
    /// map, and absent properties fall back to their declared default.
    pub fn resolved_property(&self, name: &str) -> Option<EvalValue> {
        match self.property(name) {
            Some(PropertyValue::Expression(expression)) => Some(evaluate_expression(expression)),
            Some(PropertyValue::RuntimeParameter(reference)) => {
                let value = self.parameters.get(&reference.param).unwrap_or_else(|| {
                    panic!(
                        "runtime parameter {} was not resolved before execution",
                        reference.param
                    )
                });
                Some(value.clone())
            }
            Some(_) => None,
            None => self
                .signature
                .property_spec(name)
                .and_then(|spec| spec.default.clone()),
        }
    }

    pub fn boolean_property(&self, name: &str) -> bool {
        self.resolved_property(name)
            .and_then(|value| value.as_boolean())
            .unwrap_or_else(|| self.missing(name, "boolean"))
    }

    pub fn integer_property(&self, name: &str) -> i64 {
        self.resolved_property(name)
            .and_then(|value| value.as_integer())
            .unwrap_or_else(|| self.missing(name, "integer"))
    }

    pub fn decimal_property(&self, name: &str) -> f64 {
        self.resolved_property(name)
            .and_then(|value| value.as_f64())
            .unwrap_or_else(|| self.missing(name, "decimal"))
    }

    pub fn text_property(&self, name: &str) -> String {
        self.resolved_property(name)
            .and_then(|value| value.as_text().map(str::to_owned))
            .unwrap_or_else(|| self.missing(name, "text"))
    }

    /// The valuetype assignments of a collection-typed property.
    ///
    /// # Panics
    ///
    /// Panics if the property holds anything other than valuetype
    /// assignments; the property schema is enforced during validation.
    pub fn valuetype_assignments(&self, name: &str) -> Vec<&'a ValuetypeAssignment> {
        let entry = |value: &'a PropertyValue| match value {
            PropertyValue::ValuetypeAssignment(assignment) => assignment,
            other => panic!(
                "property \"{name}\" of block {} must contain valuetype assignments, found {other:?}",
                self.block.name
            ),
        };
        match self.require_property(name) {
            PropertyValue::Collection(collection) => {
                collection.values.iter().map(entry).collect()
            }
            single => vec![entry(single)],
        }
    }

    pub fn start_timer(&mut self, label: impl Into<String>) {
        self.timers.start(label);
    }

    pub fn stop_timer(&mut self, label: &str) -> Option<Duration> {
        self.timers.stop(label)
    }

    fn missing(&self, name: &str, expected: &str) -> ! {
        panic!(
            "block {} has no {expected} value for property \"{name}\"",
            self.block.name
        )
    }
}

/// Result of a whole pipeline run. The run failed iff at least one
/// error-severity diagnostic was emitted; warnings alone do not fail it.
#[derive(Debug)]
pub struct RunResult {
    pub successful: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Artifacts produced by each completed block, keyed by block name.
    pub artifacts: IndexMap<String, Arc<Artifact>>,
}

/// Drives a pipeline through its block executors in topological order.
pub struct ExecutionEngine<'a> {
    signatures: &'a SignatureRegistry,
    executors: &'a ExecutorRegistry,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(signatures: &'a SignatureRegistry, executors: &'a ExecutorRegistry) -> Self {
        Self {
            signatures,
            executors,
        }
    }

    /// Run the pipeline against the given environment.
    ///
    /// Runtime parameters are resolved up front; if any are missing or
    /// mismatched, no block executes. Execution is strictly sequential in
    /// topological order. A failed block stops its own downstream path
    /// while sibling branches continue.
    pub fn run(&self, pipeline: &Pipeline, env: &IndexMap<String, String>) -> RunResult {
        let parameters = match resolve_runtime_parameters(pipeline, self.signatures, env) {
            Ok(parameters) => parameters,
            Err(diagnostics) => {
                return RunResult {
                    successful: false,
                    diagnostics,
                    artifacts: IndexMap::new(),
                };
            }
        };

        let order = pipeline.topological_order(self.signatures);
        let mut sink = DiagnosticSink::new();
        let mut outputs: IndexMap<BlockId, Arc<Artifact>> = IndexMap::new();
        let mut failed: HashSet<BlockId> = HashSet::new();

        for id in order {
            let block = pipeline.block(id);
            let ingoing = pipeline.ingoing_pipes(id);
            assert!(
                ingoing.len() <= 1,
                "block {} has more than one ingoing pipe",
                block.name
            );

            let parent = ingoing.first().map(|pipe| pipe.from);
            if let Some(parent) = parent {
                if failed.contains(&parent) {
                    debug!(block = %block.name, "skipping block, upstream producer failed");
                    failed.insert(id);
                    continue;
                }
            }

            let Some(executor) = self.executors.get(&block.block_type) else {
                sink.push(Diagnostic::error(
                    format!("No executor registered for block type {}", block.block_type),
                    block.span,
                ));
                failed.insert(id);
                continue;
            };

            let signature = self.signatures.get(&block.block_type).unwrap_or_else(|| {
                panic!("no signature registered for block type {}", block.block_type)
            });

            let input = match parent {
                Some(parent) => {
                    let artifact = outputs.get(&parent).unwrap_or_else(|| {
                        panic!("block {} executed before its producer", block.name)
                    });
                    Some(Arc::clone(artifact))
                }
                None => {
                    assert!(
                        executor.input_type() == IOType::None,
                        "starting block {} must not declare an input",
                        block.name
                    );
                    None
                }
            };
            if let Some(artifact) = input.as_deref() {
                assert!(
                    artifact.io_type() == executor.input_type(),
                    "block {} expects a {} input but its producer emitted a {}",
                    block.name,
                    executor.input_type(),
                    artifact.io_type()
                );
            }

            let span = tracing::debug_span!("block", name = %block.name, block_type = %block.block_type);
            let _guard = span.enter();

            let mut context = ExecutionContext::new(block, signature, &parameters, &mut sink);
            let outcome = executor.execute(input.as_deref(), &mut context);
            drop(context);
            match outcome {
                Ok(Some(artifact)) => {
                    assert!(
                        artifact.io_type() == executor.output_type(),
                        "block {} declares a {} output but produced a {}",
                        block.name,
                        executor.output_type(),
                        artifact.io_type()
                    );
                    outputs.insert(id, Arc::new(artifact));
                }
                Ok(None) => {
                    assert!(
                        executor.output_type() == IOType::None,
                        "block {} declares a {} output but produced none",
                        block.name,
                        executor.output_type()
                    );
                    debug!(block = %block.name, "sink block completed");
                }
                Err(diagnostic) => {
                    sink.push(diagnostic);
                    failed.insert(id);
                }
            }
        }

        let successful = !sink.has_errors();
        let artifacts = outputs
            .into_iter()
            .map(|(id, artifact)| (pipeline.block(id).name.clone(), artifact))
            .collect();
        RunResult {
            successful,
            diagnostics: sink.into_vec(),
            artifacts,
        }
    }
}
