//! Pipeline graph model: blocks, pipes and topological ordering.
//!
//! Blocks are stored in an arena owned by their [`Pipeline`] and addressed
//! by [`BlockId`]. Semantic pipe edges are derived from the declared pipe
//! statements on demand rather than cached, so they can never go stale
//! after edits.

use crate::ast::{PropertyValue, Span};
use crate::signature::SignatureRegistry;
use indexmap::IndexMap;
use serde::Deserialize;

/// Index of a block within its owning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// A named, typed processing step.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub name: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
    #[serde(default)]
    pub span: Span,
}

/// A declared pipe statement: a chain of two or more block names.
/// `a -> b -> c` desugars into the semantic edges a→b and b→c.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct PipeStatement {
    pub chain: Vec<String>,
    pub span: Span,
}

impl From<Vec<String>> for PipeStatement {
    fn from(chain: Vec<String>) -> Self {
        Self {
            chain,
            span: Span::default(),
        }
    }
}

/// A semantic pipe edge. Two edges are equal iff they connect the same
/// pair of blocks, regardless of which statement produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipe {
    pub from: BlockId,
    pub to: BlockId,
}

/// A pipeline: an ordered set of blocks plus the declared pipe statements
/// connecting them. The induced graph must be acyclic; the surrounding
/// validator rejects cyclic programs before they reach this model.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub pipes: Vec<PipeStatement>,
    #[serde(default)]
    pub span: Span,
}

impl Pipeline {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|block| block.name == name)
            .map(BlockId)
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Blocks whose type signature declares no input. Blocks with an
    /// unregistered type are skipped; reporting them is the validator's
    /// concern.
    pub fn starting_blocks(&self, signatures: &SignatureRegistry) -> Vec<BlockId> {
        self.block_ids()
            .filter(|id| {
                signatures
                    .get(&self.block(*id).block_type)
                    .is_some_and(|signature| !signature.has_input())
            })
            .collect()
    }

    /// Expand every declared pipe statement into semantic edges. Pure
    /// function of the pipeline, recomputed on each call. Chain segments
    /// naming unknown blocks are skipped; unresolved references are the
    /// validator's to report.
    pub fn all_pipes(&self) -> Vec<Pipe> {
        let mut result = Vec::new();
        for statement in &self.pipes {
            for pair in statement.chain.windows(2) {
                let (Some(from), Some(to)) = (self.block_id(&pair[0]), self.block_id(&pair[1]))
                else {
                    continue;
                };
                result.push(Pipe { from, to });
            }
        }
        result
    }

    pub fn ingoing_pipes(&self, block: BlockId) -> Vec<Pipe> {
        self.all_pipes()
            .into_iter()
            .filter(|pipe| pipe.to == block)
            .collect()
    }

    pub fn outgoing_pipes(&self, block: BlockId) -> Vec<Pipe> {
        self.all_pipes()
            .into_iter()
            .filter(|pipe| pipe.from == block)
            .collect()
    }

    pub fn parents(&self, block: BlockId) -> Vec<BlockId> {
        self.ingoing_pipes(block)
            .into_iter()
            .map(|pipe| pipe.from)
            .collect()
    }

    pub fn children(&self, block: BlockId) -> Vec<BlockId> {
        self.outgoing_pipes(block)
            .into_iter()
            .map(|pipe| pipe.to)
            .collect()
    }

    /// Blocks in topological order, based on Kahn's algorithm.
    ///
    /// A list in topological order has the property that parent blocks are
    /// always listed before their children. The tie-break among
    /// simultaneously ready blocks is stack order (LIFO) and deliberately
    /// unspecified; callers needing a deterministic order must impose one.
    ///
    /// Kahn, A. B. (1962). Topological sorting of large networks.
    /// Communications of the ACM, 5(11), 558-562.
    ///
    /// # Panics
    ///
    /// Panics if edges remain after the frontier empties, i.e. the graph
    /// contains a cycle. Cyclic pipelines must be rejected during
    /// validation and never reach this function.
    pub fn topological_order(&self, signatures: &SignatureRegistry) -> Vec<BlockId> {
        let mut sorted = Vec::new();
        let mut frontier = self.starting_blocks(signatures);
        let mut unvisited = self.all_pipes();

        while let Some(node) = frontier.pop() {
            sorted.push(node);

            for child in self.children(node) {
                // Mark edges between parent and child as visited.
                unvisited.retain(|edge| !(edge.from == node && edge.to == child));

                // The child becomes ready once all its ingoing edges are
                // visited.
                if self
                    .ingoing_pipes(child)
                    .iter()
                    .all(|edge| !unvisited.contains(edge))
                {
                    frontier.push(child);
                }
            }
        }

        assert!(
            unvisited.is_empty(),
            "the pipeline {} is expected to have no cycles",
            self.name
        );

        sorted
    }

    /// Parse a pipeline definition from bytes, detecting the format from
    /// the file extension (defaults to YAML).
    pub fn from_bytes(data: &[u8], path: Option<&str>) -> Result<Self, PipelineError> {
        let format = path
            .and_then(detect_format)
            .unwrap_or_else(|| "yaml".to_string());
        Self::from_bytes_format(data, &format)
    }

    /// Parse a pipeline definition from bytes with an explicit format.
    pub fn from_bytes_format(data: &[u8], format: &str) -> Result<Self, PipelineError> {
        match format {
            "json" => serde_json::from_slice(data).map_err(|e| PipelineError::Parse(e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_slice(data).map_err(|e| PipelineError::Parse(e.to_string()))
            }
            "toml" => {
                let s = std::str::from_utf8(data)
                    .map_err(|e| PipelineError::Parse(format!("Invalid UTF-8: {}", e)))?;
                toml::from_str(s).map_err(|e| PipelineError::Parse(e.to_string()))
            }
            _ => Err(PipelineError::Parse(format!(
                "Unsupported pipeline definition format: {}",
                format
            ))),
        }
    }
}

/// Errors related to loading pipeline definitions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to parse pipeline definition: {0}")]
    Parse(String),
}

/// Detect format from file path extension.
fn detect_format(path: &str) -> Option<String> {
    let ext = path.rsplit('.').next()?;
    match ext.to_lowercase().as_str() {
        "json" => Some("json".into()),
        "yaml" | "yml" => Some("yaml".into()),
        "toml" => Some("toml".into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::IOType;
    use crate::signature::BlockTypeSignature;

    fn block(name: &str, block_type: &str) -> Block {
        Block {
            name: name.into(),
            block_type: block_type.into(),
            properties: IndexMap::new(),
            span: Span::default(),
        }
    }

    fn statement(chain: &[&str]) -> PipeStatement {
        PipeStatement::from(chain.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    fn registry() -> SignatureRegistry {
        let mut signatures = SignatureRegistry::new();
        signatures.register(BlockTypeSignature::new("Source").output(IOType::Sheet));
        signatures.register(
            BlockTypeSignature::new("Transform")
                .input(IOType::Sheet)
                .output(IOType::Sheet),
        );
        signatures.register(BlockTypeSignature::new("Sink").input(IOType::Sheet));
        signatures
    }

    fn diamond() -> Pipeline {
        // source -> left -> sink, source -> right -> sink2
        Pipeline {
            name: "diamond".into(),
            blocks: vec![
                block("source", "Source"),
                block("left", "Transform"),
                block("right", "Transform"),
                block("left_sink", "Sink"),
                block("right_sink", "Sink"),
            ],
            pipes: vec![
                statement(&["source", "left", "left_sink"]),
                statement(&["source", "right", "right_sink"]),
            ],
            span: Span::default(),
        }
    }

    #[test]
    fn test_starting_blocks() {
        let pipeline = diamond();
        let starting = pipeline.starting_blocks(&registry());
        assert_eq!(starting, vec![BlockId(0)]);
    }

    #[test]
    fn test_chained_statement_desugars_into_edges() {
        let pipeline = diamond();
        let pipes = pipeline.all_pipes();
        assert_eq!(pipes.len(), 4);
        assert!(pipes.contains(&Pipe {
            from: BlockId(0),
            to: BlockId(1),
        }));
        assert!(pipes.contains(&Pipe {
            from: BlockId(1),
            to: BlockId(3),
        }));
    }

    #[test]
    fn test_pipe_equality_across_statements() {
        // The same edge produced by two different statements compares
        // equal.
        let mut pipeline = diamond();
        pipeline.pipes.push(statement(&["source", "left"]));

        let pipes = pipeline.all_pipes();
        let edge = Pipe {
            from: BlockId(0),
            to: BlockId(1),
        };
        assert_eq!(pipes.iter().filter(|pipe| **pipe == edge).count(), 2);
    }

    #[test]
    fn test_ingoing_and_outgoing() {
        let pipeline = diamond();
        let source = BlockId(0);
        assert!(pipeline.ingoing_pipes(source).is_empty());
        assert_eq!(pipeline.outgoing_pipes(source).len(), 2);
        assert_eq!(pipeline.children(source), vec![BlockId(1), BlockId(2)]);
        assert_eq!(pipeline.parents(BlockId(3)), vec![BlockId(1)]);
    }

    #[test]
    fn test_topological_order_respects_ancestry() {
        let pipeline = diamond();
        let order = pipeline.topological_order(&registry());
        assert_eq!(order.len(), pipeline.blocks.len());

        let position = |id: BlockId| order.iter().position(|o| *o == id).unwrap();
        assert!(position(BlockId(0)) < position(BlockId(1)));
        assert!(position(BlockId(0)) < position(BlockId(2)));
        assert!(position(BlockId(1)) < position(BlockId(3)));
        assert!(position(BlockId(2)) < position(BlockId(4)));
    }

    #[test]
    #[should_panic(expected = "no cycles")]
    fn test_cycle_is_fatal() {
        let mut pipeline = diamond();
        // left_sink feeding back into left introduces a cycle.
        pipeline.pipes.push(statement(&["left_sink", "left"]));
        let _ = pipeline.topological_order(&registry());
    }

    #[test]
    fn test_from_yaml_definition() {
        let definition = r#"
name: cars
blocks:
  - name: extractor
    type: Source
  - name: loader
    type: Sink
    properties:
      table: { param: TABLE_NAME }
pipes:
  - [extractor, loader]
"#;
        let pipeline = Pipeline::from_bytes_format(definition.as_bytes(), "yaml").unwrap();
        assert_eq!(pipeline.name, "cars");
        assert_eq!(pipeline.blocks.len(), 2);
        assert_eq!(pipeline.all_pipes().len(), 1);
        assert!(pipeline.blocks[1].properties.contains_key("table"));
    }

    #[test]
    fn test_unsupported_format() {
        let result = Pipeline::from_bytes_format(b"", "ini");
        assert!(matches!(result, Err(PipelineError::Parse(_))));
    }
}
