//! Sheet records in TSV form.
//!
//! The first row names the columns; the sheet's Portuguese headers map onto
//! [`Record`] fields. Column order is free and unknown columns are ignored.
//! Rows without an answer are dropped; missing cells read as empty strings.

use crate::types::Record;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read records: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed records file: {0}")]
    Csv(#[from] csv::Error),
    #[error("records file is empty")]
    Empty,
    #[error("records file has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("row {row} has an answer but no intent code")]
    MissingIntent { row: u64 },
}

/// Sheet header, in the order the writer emits it.
pub const COLUMNS: [&str; 9] = [
    "Pergunta",
    "Resposta",
    "Fonte",
    "Intenção",
    "Rótulos",
    "Modificador",
    "Substantivo",
    "Recipiente",
    "Elocuções",
];

/// Columns a sheet cannot do without.
const REQUIRED: [&str; 3] = ["Resposta", "Intenção", "Modificador"];

/// Read every answered record of a TSV sheet.
pub fn read_records(path: &Path) -> Result<Vec<Record>, RecordError> {
    let content = std::fs::read_to_string(path)?;
    let records = parse_records(&content)?;
    debug!(path = %path.display(), records = records.len(), "records read");
    Ok(records)
}

/// Parse a TSV sheet. Quoted cells may hold tabs, line breaks and `""`
/// escapes.
pub fn parse_records(content: &str) -> Result<Vec<Record>, RecordError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());
    let mut rows = reader.records().filter(|row| {
        row.as_ref()
            .map_or(true, |r| r.iter().any(|cell| !cell.is_empty()))
    });

    let header: Vec<String> = rows
        .next()
        .ok_or(RecordError::Empty)??
        .iter()
        .map(str::to_string)
        .collect();
    for column in REQUIRED {
        if !header.iter().any(|h| h == column) {
            return Err(RecordError::MissingColumn(column));
        }
    }

    let mut records = Vec::new();
    let mut dropped = 0;
    for row in rows {
        let row = row?;
        let record = to_record(&header, &row);
        if record.answer.is_empty() {
            dropped += 1;
            continue;
        }
        if record.intent.is_empty() {
            let row = row.position().map_or(0, csv::Position::line);
            return Err(RecordError::MissingIntent { row });
        }
        records.push(record);
    }
    if dropped > 0 {
        debug!(dropped, "unanswered records dropped");
    }
    Ok(records)
}

fn to_record(header: &[String], row: &StringRecord) -> Record {
    let mut record = Record::default();
    for (name, cell) in header.iter().zip(row) {
        let value = cell.to_string();
        match name.as_str() {
            "Pergunta" => record.question = value,
            "Resposta" => record.answer = value,
            "Fonte" => record.source = value,
            "Intenção" => record.intent = value,
            "Rótulos" => record.labels = value,
            "Modificador" => record.modifier = value,
            "Substantivo" => record.noun = value,
            "Recipiente" => record.recipient = value,
            "Elocuções" => record.examples = value,
            _ => {}
        }
    }
    record
}

/// Write records as a TSV sheet with the standard header.
pub fn write_records(path: &Path, records: &[Record]) -> Result<(), RecordError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record([
            &record.question,
            &record.answer,
            &record.source,
            &record.intent,
            &record.labels,
            &record.modifier,
            &record.noun,
            &record.recipient,
            &record.examples,
        ])?;
    }

    writer.flush()?;
    Ok(())
}
