// Copyright (c) 2025 Presto Client Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Result cursor over a running statement.
//!
//! `Rows` buffers the most recent page delivered by the statement driver
//! and refills lazily: each `next().await` pops one row, polling the
//! coordinator only when the buffer runs dry. The cursor is a finite,
//! non-restartable sequence; dropping it before draining cancels the
//! statement best-effort.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{Error, Result};
use crate::statement::StatementDriver;
use crate::types::convert::{CellValue, Converter};
use crate::types::scan::Scanner;
use crate::types::wire::StmtColumn;

/// Metadata and converter for one result column.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    type_name: String,
    converter: Arc<Converter>,
}

impl Column {
    pub(crate) fn from_wire(column: &StmtColumn) -> Result<Column> {
        let converter = if column.type_signature.raw_type.is_empty() {
            Converter::scalar_for(&column.type_name)
        } else {
            Converter::new(&column.type_signature)?
        };
        Ok(Column {
            name: column.name.clone(),
            type_name: column.type_name.clone(),
            converter: Arc::new(converter),
        })
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type text as rendered by the server, e.g. `varchar(1)`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Nominal type name derived from the materialized converter.
    pub fn nominal_type(&self) -> &'static str {
        self.converter.type_name()
    }
}

/// Streaming result set of one statement.
#[derive(Debug)]
pub struct Rows {
    driver: StatementDriver,
    columns: Arc<Vec<Column>>,
    buffer: VecDeque<Vec<JsonValue>>,
}

impl Rows {
    /// Submit `sql` and drive the protocol until column metadata is known
    /// or the statement is terminal, buffering any rows received early.
    pub(crate) async fn start(mut driver: StatementDriver, sql: &str) -> Result<Rows> {
        let mut buffer: VecDeque<Vec<JsonValue>> = driver.submit(sql).await?.into();
        while driver.columns().is_none() && !driver.is_finished() {
            match driver.poll().await? {
                Some(page) => buffer.extend(page),
                None => break,
            }
        }
        let columns = driver.columns().unwrap_or_default();
        Ok(Rows {
            driver,
            columns,
            buffer,
        })
    }

    /// Column metadata, available before the first row.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Server-assigned query identifier.
    pub fn query_id(&self) -> Option<&str> {
        self.driver.query_id()
    }

    /// Link to the coordinator's query page, when the server sent one.
    pub fn info_uri(&self) -> Option<&str> {
        self.driver.info_uri()
    }

    /// Fetch the next row, polling the coordinator when the buffer is
    /// empty. `None` marks the end of the stream.
    pub async fn next(&mut self) -> Option<Result<Row>> {
        loop {
            if let Some(cells) = self.buffer.pop_front() {
                if cells.len() != self.columns.len() {
                    return Some(Err(Error::Conversion(format!(
                        "row has {} cells for {} columns",
                        cells.len(),
                        self.columns.len()
                    ))));
                }
                return Some(Ok(Row {
                    columns: self.columns.clone(),
                    cells,
                }));
            }
            if self.driver.is_finished() {
                return None;
            }
            match self.driver.poll().await {
                Ok(Some(page)) => self.buffer.extend(page),
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Drain and discard the remaining rows, surfacing any protocol error.
    pub async fn drain(&mut self) -> Result<()> {
        while let Some(row) = self.next().await {
            row?;
        }
        Ok(())
    }

    /// Stop the statement: cancel the protocol loop and issue the
    /// best-effort server-side `DELETE`.
    pub async fn close(&mut self) {
        if self.driver.is_finished() {
            return;
        }
        self.driver.cancel_token().cancel();
        self.driver.cancel_remote().await;
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        if self.driver.is_finished() {
            return;
        }
        debug!("rows dropped before drain; cancelling statement");
        self.driver.cancel_token().cancel();
        if let Some(task) = self.driver.cancel_remote_task() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(task);
            }
        }
    }
}

/// One decoded row.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<Column>>,
    cells: Vec<JsonValue>,
}

impl Row {
    /// Number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The raw wire value of a cell, before conversion.
    pub fn raw(&self, index: usize) -> Option<&JsonValue> {
        self.cells.get(index)
    }

    /// Decode one cell through its column converter.
    pub fn get(&self, index: usize) -> Result<CellValue> {
        let column = self
            .columns
            .get(index)
            .ok_or_else(|| Error::Conversion(format!("no column at index {}", index)))?;
        let cell = &self.cells[index];
        column.converter.convert(cell)
    }

    /// Decode one cell by column name.
    pub fn get_by_name(&self, name: &str) -> Result<CellValue> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| Error::Conversion(format!("no column named {:?}", name)))?;
        self.get(index)
    }

    /// Feed the raw cell to a slice scanner (for `array` columns).
    pub fn scan(&self, index: usize, scanner: &mut dyn Scanner) -> Result<()> {
        let cell = self
            .cells
            .get(index)
            .ok_or_else(|| Error::Conversion(format!("no column at index {}", index)))?;
        scanner.scan(cell)
    }
}
