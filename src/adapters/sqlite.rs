use crate::domain::model::{CellValue, TabularFrame};
use crate::domain::ports::TableSource;
use crate::utils::error::Result;
use crate::utils::validation::validate_identifier;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-backed SQLite source. A fresh read-only connection is opened for every table.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_connection(&self) -> Result<Connection> {
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

fn to_cell(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Integer(v),
        ValueRef::Real(v) => CellValue::Real(v),
        ValueRef::Text(v) => CellValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => CellValue::Blob(v.to_vec()),
    }
}

impl TableSource for SqliteSource {
    fn read_table(&self, table: &str) -> Result<TabularFrame> {
        validate_identifier("database.tables", table)?;

        let connection = self.open_connection()?;
        let query = format!("SELECT * FROM \"{}\"", table);
        let mut statement = connection.prepare(&query)?;

        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let column_count = columns.len();
        let mut frame = TabularFrame::new(columns);

        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(to_cell(row.get_ref(index)?));
            }
            frame.push_row(values);
        }

        debug!(table = %table, rows = frame.row_count(), "Read table from {}", self.path.display());
        Ok(frame)
    }
}
