//! Runtime parameter resolution against the external environment.
//!
//! Placeholders referenced anywhere in a pipeline are matched against an
//! environment of distinct string keys (typically sourced from
//! `-e NAME=value` command line entries) and coerced to the statically
//! required property valuetype. All failures across the whole set are
//! reported in one batch; resolution never stops at the first problem.

use crate::ast::{PropertyValue, RuntimeParameterRef};
use crate::diagnostic::Diagnostic;
use crate::expression::EvalValue;
use crate::graph::{Block, Pipeline};
use crate::signature::SignatureRegistry;
use crate::valuetype::PropertyValuetype;
use indexmap::IndexMap;

/// A runtime parameter placeholder together with its declaration site.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSite<'a> {
    pub block: &'a Block,
    pub property: &'a str,
    pub reference: &'a RuntimeParameterRef,
}

/// Collect every runtime parameter placeholder referenced in the
/// pipeline, in declaration order.
pub fn collect_runtime_parameters(pipeline: &Pipeline) -> Vec<ParameterSite<'_>> {
    let mut sites = Vec::new();
    for block in &pipeline.blocks {
        for (property, value) in &block.properties {
            if let PropertyValue::RuntimeParameter(reference) = value {
                sites.push(ParameterSite {
                    block,
                    property,
                    reference,
                });
            }
        }
    }
    sites
}

/// Resolve every placeholder against the environment, coercing string
/// values to the required property valuetype.
///
/// Returns the fully resolved parameter map, or the complete list of
/// diagnostics for every missing or mismatched parameter.
///
/// # Panics
///
/// Panics if a placeholder's enclosing property is unknown to the block
/// type's signature, or if its valuetype is not runtime-parameter
/// eligible. Both indicate a bug in the upstream validator.
pub fn resolve_runtime_parameters(
    pipeline: &Pipeline,
    signatures: &SignatureRegistry,
    env: &IndexMap<String, String>,
) -> Result<IndexMap<String, EvalValue>, Vec<Diagnostic>> {
    let mut parameters = IndexMap::new();
    let mut diagnostics = Vec::new();

    for site in collect_runtime_parameters(pipeline) {
        let name = &site.reference.param;
        let Some(raw) = env.get(name) else {
            diagnostics.push(Diagnostic::error(
                format!(
                    "Runtime parameter {name} is missing. \
                     Please provide a value by adding \"-e {name}=<value>\" to your command."
                ),
                site.reference.span,
            ));
            continue;
        };

        match parse_parameter_as_matching_type(raw, &site, signatures) {
            Ok(value) => {
                parameters.insert(name.clone(), value);
            }
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    if diagnostics.is_empty() {
        Ok(parameters)
    } else {
        Err(diagnostics)
    }
}

/// Parse a runtime parameter value to the type required by its enclosing
/// property.
fn parse_parameter_as_matching_type(
    value: &str,
    site: &ParameterSite<'_>,
    signatures: &SignatureRegistry,
) -> Result<EvalValue, Diagnostic> {
    let block_type = &site.block.block_type;
    let signature = signatures
        .get(block_type)
        .unwrap_or_else(|| panic!("no signature registered for block type {block_type}"));
    let spec = signature.property_spec(site.property).unwrap_or_else(|| {
        panic!(
            "property \"{}\" is not allowed in a block of type {block_type}",
            site.property
        )
    });
    assert!(
        spec.allows_runtime_parameter(),
        "runtime parameters are not allowed for properties of type {}",
        spec.valuetype
    );

    let name = &site.reference.param;
    let required = spec.valuetype;
    let mismatch = || {
        Diagnostic::error(
            format!("Runtime parameter {name} has value {value:?} but should be of type {required}."),
            site.reference.span,
        )
    };

    if !required.accepts_literal(value) {
        return Err(mismatch());
    }

    match required {
        PropertyValuetype::Text => Ok(EvalValue::Text(value.to_owned())),
        PropertyValuetype::Integer => value
            .parse::<i64>()
            .map(EvalValue::Integer)
            .map_err(|_| mismatch()),
        PropertyValuetype::Decimal => value
            .parse::<f64>()
            .map(EvalValue::Decimal)
            .map_err(|_| mismatch()),
        PropertyValuetype::Boolean => Ok(EvalValue::Boolean(value == "true")),
        PropertyValuetype::CellRange
        | PropertyValuetype::Regex
        | PropertyValuetype::Collection
        | PropertyValuetype::ValuetypeAssignment
        | PropertyValuetype::Constraint => {
            unreachable!("ineligible valuetypes are rejected above")
        }
    }
}
