//! Standard block executors.
//!
//! Provides the `TextFileInterpreter` block type: it decodes a raw binary
//! file into text and splits it into lines.

use encoding_rs::Encoding;
use phloem_core::{
    Artifact, BlockExecutor, BlockTypeSignature, Diagnostic, EvalValue, ExecutionContext,
    ExecutorRegistry, IOType, PropertySpec, PropertyValue, PropertyValuetype, SignatureRegistry,
    TextFile,
};
use regex::Regex;
use tracing::debug;

const DEFAULT_LINE_BREAK: &str = r"\r?\n";

/// Register the signatures of all standard block types.
pub fn register_signatures(signatures: &mut SignatureRegistry) {
    signatures.register(TextFileInterpreter::signature());
}

/// Register all standard block executors.
pub fn register_all(executors: &mut ExecutorRegistry) {
    executors.register(TextFileInterpreter);
}

/// Decodes a binary file into a text file.
///
/// The `encoding` property selects the character encoding (any label
/// understood by the WHATWG encoding standard); malformed sequences are
/// replaced rather than fatal, matching the behavior of a streaming text
/// decoder. The `lineBreak` property is a regular expression used to
/// split the decoded content into lines.
pub struct TextFileInterpreter;

impl TextFileInterpreter {
    pub fn signature() -> BlockTypeSignature {
        BlockTypeSignature::new("TextFileInterpreter")
            .input(IOType::File)
            .output(IOType::TextFile)
            .property(
                "encoding",
                PropertySpec::optional_with_default(
                    PropertyValuetype::Text,
                    EvalValue::Text("utf-8".into()),
                ),
            )
            .property("lineBreak", PropertySpec::optional(PropertyValuetype::Regex))
    }

    fn line_break(context: &ExecutionContext<'_>) -> Result<Regex, Diagnostic> {
        match context.property("lineBreak") {
            Some(PropertyValue::Regex(literal)) => {
                Regex::new(&literal.regex).map_err(|_| {
                    Diagnostic::error(
                        format!("{:?} is not a valid regular expression", literal.regex),
                        literal.span,
                    )
                })
            }
            Some(other) => panic!(
                "property \"lineBreak\" must be a regex literal, found {other:?}"
            ),
            None => Ok(Regex::new(DEFAULT_LINE_BREAK).expect("default pattern is valid")),
        }
    }
}

impl BlockExecutor for TextFileInterpreter {
    fn block_type(&self) -> &str {
        "TextFileInterpreter"
    }

    fn input_type(&self) -> IOType {
        IOType::File
    }

    fn output_type(&self) -> IOType {
        IOType::TextFile
    }

    fn execute(
        &self,
        input: Option<&Artifact>,
        context: &mut ExecutionContext<'_>,
    ) -> Result<Option<Artifact>, Diagnostic> {
        let Some(Artifact::File(file)) = input else {
            unreachable!("the engine guarantees a file input");
        };

        let label = context.text_property("encoding");
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            let span = context
                .property("encoding")
                .map(PropertyValue::span)
                .unwrap_or(context.block.span);
            return Err(Diagnostic::error(format!("Unknown encoding {label:?}"), span));
        };

        let line_break = Self::line_break(context)?;

        let (decoded, _, had_errors) = encoding.decode(&file.content);
        if had_errors {
            debug!(file = %file.name, "replaced malformed byte sequences while decoding");
        }

        let lines = line_break.split(&decoded).map(str::to_owned).collect();
        Ok(Some(Artifact::TextFile(TextFile {
            name: file.name.clone(),
            lines,
        })))
    }
}
