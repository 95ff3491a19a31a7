//! Tabular block executors.
//!
//! Provides the `TableInterpreter` block type: it converts a sheet of raw
//! string cells into a validated, typed table by matching declared
//! columns against the sheet (by header name or by position) and checking
//! every cell against its column's valuetype.

use phloem_core::{
    Artifact, BlockExecutor, BlockTypeSignature, ColumnInfo, Diagnostic, ExecutionContext,
    ExecutorRegistry, IOType, PropertySpec, PropertyValuetype, SignatureRegistry, Table,
    ValuetypeAssignment,
};
use tracing::debug;

/// Register the signatures of all tabular block types.
pub fn register_signatures(signatures: &mut SignatureRegistry) {
    signatures.register(TableInterpreter::signature());
}

/// Register all tabular block executors.
pub fn register_all(executors: &mut ExecutorRegistry) {
    executors.register(TableInterpreter);
}

/// A declared column matched to its position in the sheet.
struct ColumnEntry<'a> {
    sheet_column_index: usize,
    assignment: &'a ValuetypeAssignment,
}

/// Interprets a sheet as a table.
///
/// With `header: true` the declared columns are matched against the
/// sheet's first row by exact name; declared columns without a matching
/// header are omitted from the result. Without a header the declared
/// columns map to sheet columns positionally. Rows containing any cell
/// that is not a valid literal of its column's valuetype are dropped in
/// their entirety.
pub struct TableInterpreter;

impl TableInterpreter {
    pub fn signature() -> BlockTypeSignature {
        BlockTypeSignature::new("TableInterpreter")
            .input(IOType::Sheet)
            .output(IOType::Table)
            .property("header", PropertySpec::required(PropertyValuetype::Boolean))
            .property(
                "columns",
                PropertySpec::required(PropertyValuetype::Collection),
            )
    }

    fn derive_column_entries_from_header<'a>(
        column_definitions: &[&'a ValuetypeAssignment],
        header_row: &[String],
    ) -> Vec<ColumnEntry<'a>> {
        debug!("matching the header against the declared column names");

        let mut entries = Vec::new();
        for definition in column_definitions {
            let Some(index) = header_row.iter().position(|cell| *cell == definition.column)
            else {
                debug!(
                    column = %definition.column,
                    "omitting column, name not found in the header"
                );
                continue;
            };
            entries.push(ColumnEntry {
                sheet_column_index: index,
                assignment: definition,
            });
        }
        entries
    }

    fn derive_column_entries_by_position<'a>(
        column_definitions: &[&'a ValuetypeAssignment],
    ) -> Vec<ColumnEntry<'a>> {
        column_definitions
            .iter()
            .enumerate()
            .map(|(index, assignment)| ColumnEntry {
                sheet_column_index: index,
                assignment,
            })
            .collect()
    }

    /// Validate one sheet row against the matched columns. Returns `None`
    /// if any cell is invalid; rows are kept or dropped as a whole.
    fn build_row(
        sheet_row: &[String],
        row_index: usize,
        entries: &[ColumnEntry<'_>],
    ) -> Option<Vec<String>> {
        let mut cells = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(value) = sheet_row.get(entry.sheet_column_index) else {
                debug!(
                    row = row_index,
                    column = entry.sheet_column_index,
                    "missing cell"
                );
                return None;
            };
            if !entry.assignment.valuetype.accepts_literal(value) {
                debug!(
                    row = row_index,
                    column = entry.sheet_column_index,
                    value = %value,
                    valuetype = %entry.assignment.valuetype,
                    "invalid cell value"
                );
                return None;
            }
            cells.push(value.clone());
        }
        Some(cells)
    }
}

impl BlockExecutor for TableInterpreter {
    fn block_type(&self) -> &str {
        "TableInterpreter"
    }

    fn input_type(&self) -> IOType {
        IOType::Sheet
    }

    fn output_type(&self) -> IOType {
        IOType::Table
    }

    fn execute(
        &self,
        input: Option<&Artifact>,
        context: &mut ExecutionContext<'_>,
    ) -> Result<Option<Artifact>, Diagnostic> {
        let Some(Artifact::Sheet(sheet)) = input else {
            unreachable!("the engine guarantees a sheet input");
        };

        let header = context.boolean_property("header");
        let column_definitions = context.valuetype_assignments("columns");

        let entries = if header {
            if sheet.num_rows() < 1 {
                return Err(Diagnostic::error(
                    "The input sheet is empty and thus has no header",
                    context.require_property("header").span(),
                ));
            }
            let header_row = sheet.header_row().expect("non-empty sheet has a first row");
            Self::derive_column_entries_from_header(&column_definitions, header_row)
        } else {
            if sheet.num_columns() < column_definitions.len() {
                return Err(Diagnostic::error(
                    format!(
                        "There are {} column definitions but the input sheet only has {} columns",
                        column_definitions.len(),
                        sheet.num_columns()
                    ),
                    context.require_property("columns").span(),
                ));
            }
            Self::derive_column_entries_by_position(&column_definitions)
        };

        let data_rows = if header {
            sheet.num_rows() - 1
        } else {
            sheet.num_rows()
        };
        debug!(
            rows = data_rows,
            "validating rows against the declared column types"
        );
        context.start_timer("validation");

        let mut rows = Vec::new();
        for (row_index, sheet_row) in sheet.rows().iter().enumerate() {
            if header && row_index == 0 {
                continue;
            }
            match Self::build_row(sheet_row, row_index, &entries) {
                Some(row) => rows.push(row),
                None => debug!(row = row_index, "omitting row"),
            }
        }

        let elapsed = context.stop_timer("validation");
        debug!(
            rows = rows.len(),
            columns = entries.len(),
            elapsed = ?elapsed,
            "validation completed"
        );

        let columns = entries
            .iter()
            .map(|entry| ColumnInfo {
                name: entry.assignment.column.clone(),
                valuetype: entry.assignment.valuetype,
            })
            .collect();
        Ok(Some(Artifact::Table(Table::new(columns, rows))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use phloem_core::{
        Block, CollectionLiteral, DiagnosticSink, EvalValue, Expression, LiteralKind,
        PropertyValue, Sheet, Span,
    };

    fn columns_value(definitions: &[(&str, PropertyValuetype)]) -> PropertyValue {
        PropertyValue::Collection(CollectionLiteral::from(
            definitions
                .iter()
                .map(|(name, valuetype)| {
                    PropertyValue::ValuetypeAssignment(ValuetypeAssignment {
                        column: name.to_string(),
                        valuetype: *valuetype,
                        span: Span::default(),
                    })
                })
                .collect::<Vec<_>>(),
        ))
    }

    fn interpreter_block(header: bool, definitions: &[(&str, PropertyValuetype)]) -> Block {
        Block {
            name: "interpreter".into(),
            block_type: "TableInterpreter".into(),
            properties: IndexMap::from([
                (
                    "header".to_string(),
                    PropertyValue::Expression(Expression::literal(
                        LiteralKind::Boolean(header),
                        Span::default(),
                    )),
                ),
                ("columns".to_string(), columns_value(definitions)),
            ]),
            span: Span::default(),
        }
    }

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    fn interpret(
        header: bool,
        definitions: &[(&str, PropertyValuetype)],
        input: Sheet,
    ) -> Result<Table, Diagnostic> {
        let block = interpreter_block(header, definitions);
        let signature = TableInterpreter::signature();
        let parameters: IndexMap<String, EvalValue> = IndexMap::new();
        let mut sink = DiagnosticSink::new();
        let mut context = ExecutionContext::new(&block, &signature, &parameters, &mut sink);

        let artifact = Artifact::Sheet(input);
        let output = TableInterpreter.execute(Some(&artifact), &mut context)?;
        match output {
            Some(Artifact::Table(table)) => Ok(table),
            other => panic!("expected a table artifact, got {other:?}"),
        }
    }

    #[test]
    fn test_header_matching_drops_invalid_rows() {
        let table = interpret(
            true,
            &[("Id", PropertyValuetype::Integer), ("Name", PropertyValuetype::Text)],
            sheet(&[&["Id", "Name"], &["1", "Ann"], &["x", "Bob"]]),
        )
        .unwrap();

        // The "x" cell is not a valid integer, so its whole row is gone.
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.rows(), &[vec!["1".to_string(), "Ann".to_string()]]);
    }

    #[test]
    fn test_header_reorders_columns() {
        let table = interpret(
            true,
            &[("Name", PropertyValuetype::Text), ("Id", PropertyValuetype::Integer)],
            sheet(&[&["Id", "Name"], &["1", "Ann"]]),
        )
        .unwrap();

        assert_eq!(table.columns()[0].name, "Name");
        assert_eq!(table.rows(), &[vec!["Ann".to_string(), "1".to_string()]]);
    }

    #[test]
    fn test_unmatched_declared_column_is_omitted() {
        let table = interpret(
            true,
            &[
                ("Id", PropertyValuetype::Integer),
                ("Missing", PropertyValuetype::Text),
            ],
            sheet(&[&["Id", "Name"], &["1", "Ann"]]),
        )
        .unwrap();

        assert_eq!(table.num_columns(), 1);
        assert_eq!(table.columns()[0].name, "Id");
        assert_eq!(table.rows(), &[vec!["1".to_string()]]);
    }

    #[test]
    fn test_empty_sheet_with_header_is_an_error() {
        let result = interpret(true, &[("Id", PropertyValuetype::Integer)], sheet(&[]));
        let diagnostic = result.unwrap_err();
        assert!(diagnostic.message.contains("no header"));
    }

    #[test]
    fn test_positional_matching_without_header() {
        let table = interpret(
            false,
            &[("Id", PropertyValuetype::Integer), ("Name", PropertyValuetype::Text)],
            sheet(&[&["1", "Ann", "ignored"], &["2", "Bob", "ignored"]]),
        )
        .unwrap();

        // Two declared columns map to sheet columns 0 and 1; the third
        // sheet column is not part of the table.
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.rows()[1], vec!["2".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn test_too_few_sheet_columns_is_an_error() {
        let result = interpret(
            false,
            &[("Id", PropertyValuetype::Integer), ("Name", PropertyValuetype::Text)],
            sheet(&[&["1"]]),
        );
        let diagnostic = result.unwrap_err();
        assert!(diagnostic.message.contains("2 column definitions"));
        assert!(diagnostic.message.contains("1 columns"));
    }

    #[test]
    fn test_boolean_column_validation() {
        let table = interpret(
            false,
            &[("Flag", PropertyValuetype::Boolean)],
            sheet(&[&["true"], &["false"], &["maybe"]]),
        )
        .unwrap();

        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_signature_shape() {
        let signature = TableInterpreter::signature();
        assert_eq!(signature.input, IOType::Sheet);
        assert_eq!(signature.output, IOType::Table);
        assert!(signature.property_spec("header").is_some());
        assert!(signature.property_spec("columns").is_some());
    }

    #[test]
    fn test_registration() {
        let mut signatures = SignatureRegistry::new();
        register_signatures(&mut signatures);
        assert!(signatures.get("TableInterpreter").is_some());

        let mut executors = ExecutorRegistry::new();
        register_all(&mut executors);
        assert!(executors.get("TableInterpreter").is_some());
    }
}
