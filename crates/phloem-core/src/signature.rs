//! Block type signatures and their registry.
//!
//! A signature is the static interface of a block type: its input and
//! output artifact types plus the schema of its configuration properties.
//! Signatures are registered once at startup into an explicitly
//! constructed [`SignatureRegistry`] value that is passed to every
//! component needing the lookup; there is no global registry.

use crate::expression::EvalValue;
use crate::io::IOType;
use crate::valuetype::PropertyValuetype;
use indexmap::IndexMap;

/// Specification of a single configuration property.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub valuetype: PropertyValuetype,
    pub required: bool,
    pub default: Option<EvalValue>,
    runtime_parameter: bool,
}

impl PropertySpec {
    pub fn required(valuetype: PropertyValuetype) -> Self {
        Self {
            valuetype,
            required: true,
            default: None,
            runtime_parameter: true,
        }
    }

    pub fn optional(valuetype: PropertyValuetype) -> Self {
        Self {
            required: false,
            ..Self::required(valuetype)
        }
    }

    pub fn optional_with_default(valuetype: PropertyValuetype, default: EvalValue) -> Self {
        Self {
            default: Some(default),
            ..Self::optional(valuetype)
        }
    }

    /// Forbid supplying this property from the runtime environment even
    /// though its valuetype would allow it.
    pub fn forbid_runtime_parameter(mut self) -> Self {
        self.runtime_parameter = false;
        self
    }

    pub fn allows_runtime_parameter(&self) -> bool {
        self.runtime_parameter && self.valuetype.allows_runtime_parameter()
    }
}

/// Static metadata for a block type: input/output artifact types and the
/// property schema. Immutable after registration.
#[derive(Debug, Clone)]
pub struct BlockTypeSignature {
    pub name: String,
    pub input: IOType,
    pub output: IOType,
    pub properties: IndexMap<String, PropertySpec>,
}

impl BlockTypeSignature {
    /// Create a signature with no input, no output and no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: IOType::None,
            output: IOType::None,
            properties: IndexMap::new(),
        }
    }

    pub fn input(mut self, io: IOType) -> Self {
        self.input = io;
        self
    }

    pub fn output(mut self, io: IOType) -> Self {
        self.output = io;
        self
    }

    pub fn property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Whether blocks of this type consume an input artifact. Source
    /// blocks do not.
    pub fn has_input(&self) -> bool {
        self.input != IOType::None
    }

    /// Whether blocks of this type produce an output artifact. Sink
    /// blocks do not.
    pub fn has_output(&self) -> bool {
        self.output != IOType::None
    }

    pub fn property_spec(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.get(name)
    }
}

/// Registry of block type signatures, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    signatures: IndexMap<String, BlockTypeSignature>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, signature: BlockTypeSignature) {
        self.signatures.insert(signature.name.clone(), signature);
    }

    pub fn get(&self, name: &str) -> Option<&BlockTypeSignature> {
        self.signatures.get(name)
    }

    /// The required valuetype of a block type's property, if both exist.
    pub fn property_valuetype(
        &self,
        block_type: &str,
        property: &str,
    ) -> Option<PropertyValuetype> {
        self.get(block_type)?
            .property_spec(property)
            .map(|spec| spec.valuetype)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockTypeSignature> {
        self.signatures.values()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
