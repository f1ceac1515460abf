use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::create;
use crate::parser::{parse_record, ParsedRow, SqlValue};
use crate::schema::{DependencyResolver, TableSchema};
use crate::ui::{Phase, Ui};

const BATCH_SIZE: usize = 500;

/// Loads a raw JSONL dataset into a fresh database
pub struct DatasetLoader {
    conn: Connection,
}

impl DatasetLoader {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = create(db_path)
            .with_context(|| format!("Failed to create database at {:?}", db_path))?;

        // Raw data may already reference missing rows; reconciliation repairs that
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;

        Ok(Self { conn })
    }

    /// Import data from the JSONL file for a single table
    pub fn import_table(
        &mut self,
        schema: &TableSchema,
        input_dir: &Path,
        ui: &mut impl Ui,
    ) -> Result<u64> {
        let file_path = input_dir.join(schema.source_file);

        if !file_path.exists() {
            tracing::warn!(
                table = schema.name,
                path = ?file_path,
                "source file not found, skipping"
            );
            ui.log(format!("{}: skipped (file not found)", schema.name));
            return Ok(0);
        }

        let file = File::open(&file_path)
            .with_context(|| format!("Failed to open: {:?}", file_path))?;
        let reader = BufReader::new(file);

        let columns = schema.column_names();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.name,
            columns.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        let mut count: u64 = 0;
        let mut batch: Vec<ParsedRow> = Vec::with_capacity(BATCH_SIZE);

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line")?;
            if line.trim().is_empty() {
                continue;
            }

            let row = parse_record(&line, schema).with_context(|| {
                format!("Failed to parse record at {}:{}", schema.source_file, line_no + 1)
            })?;

            batch.push(row);

            if batch.len() >= BATCH_SIZE {
                insert_batch(&tx, &insert_sql, &columns, &batch)?;
                count += batch.len() as u64;
                ui.set_progress(count, 0, schema.name);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            insert_batch(&tx, &insert_sql, &columns, &batch)
                .with_context(|| format!("Failed to insert into {}", schema.name))?;
            count += batch.len() as u64;
        }

        tx.commit()?;
        tracing::info!(table = schema.name, rows = count, "table loaded");
        ui.log(format!("{}: {} records", schema.name, count));

        Ok(count)
    }

    /// Re-enable foreign key enforcement and hand back the connection
    pub fn finish(self) -> Result<Connection> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA optimize;")?;
        Ok(self.conn)
    }
}

/// Insert a batch of rows into the database
fn insert_batch(
    tx: &rusqlite::Transaction,
    sql: &str,
    columns: &[&str],
    batch: &[ParsedRow],
) -> Result<()> {
    let mut stmt = tx.prepare_cached(sql)?;

    for row in batch {
        for (idx, col_name) in columns.iter().enumerate() {
            let value = row.values.get(*col_name).cloned().unwrap_or(SqlValue::Null);
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

/// Load every table's JSONL file from `input_dir` into a fresh database at
/// `output_db`, parents before children. Returns the total record count.
pub fn load_dataset(input_dir: &Path, output_db: &Path, ui: &mut impl Ui) -> Result<u64> {
    let mut loader = DatasetLoader::new(output_db)?;
    let tables = DependencyResolver::new()
        .creation_order()
        .map_err(anyhow::Error::msg)?;

    ui.set_phase(Phase::Loading);
    ui.set_info(format!("{:?} -> {:?}", input_dir, output_db));

    let mut total_records: u64 = 0;
    for schema in tables {
        total_records += loader.import_table(schema, input_dir, ui)?;
    }

    loader.finish()?;
    ui.clear_progress();

    Ok(total_records)
}
