//! Artifact types flowing along pipes.
//!
//! Every block executor declares which [`IOType`] it consumes and which it
//! produces; a pipe is well-typed only if the producer's output type
//! equals the consumer's input type. Artifacts are immutable once handed
//! to the engine and may be shared by any number of consumers.

use crate::valuetype::PropertyValuetype;

/// The category of artifact flowing along a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IOType {
    None,
    File,
    TextFile,
    FileSystem,
    Sheet,
    Table,
}

impl std::fmt::Display for IOType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IOType::None => "None",
            IOType::File => "File",
            IOType::TextFile => "TextFile",
            IOType::FileSystem => "FileSystem",
            IOType::Sheet => "Sheet",
            IOType::Table => "Table",
        };
        write!(f, "{name}")
    }
}

/// A raw binary file.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// A decoded text file, split into lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFile {
    pub name: String,
    pub lines: Vec<String>,
}

/// A node in an extracted file system tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSystemNode {
    Directory {
        name: String,
        children: Vec<FileSystemNode>,
    },
    File(BinaryFile),
}

/// A rectangular grid of raw string cells, prior to typed validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the sheet. Sheets are rectangular; the first row is
    /// authoritative.
    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn header_row(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

/// A named, typed table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub valuetype: PropertyValuetype,
}

/// A validated table: typed columns and rows whose cells have been proven
/// valid against their column's valuetype. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// # Panics
    ///
    /// Panics if any row's width differs from the number of columns.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<String>>) -> Self {
        for row in &rows {
            assert_eq!(
                row.len(),
                columns.len(),
                "every table row must have exactly one cell per column"
            );
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// An artifact routed between blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    File(BinaryFile),
    TextFile(TextFile),
    FileSystem(FileSystemNode),
    Sheet(Sheet),
    Table(Table),
}

impl Artifact {
    pub fn io_type(&self) -> IOType {
        match self {
            Artifact::File(_) => IOType::File,
            Artifact::TextFile(_) => IOType::TextFile,
            Artifact::FileSystem(_) => IOType::FileSystem,
            Artifact::Sheet(_) => IOType::Sheet,
            Artifact::Table(_) => IOType::Table,
        }
    }
}
