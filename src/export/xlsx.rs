// SPDX-License-Identifier: Apache-2.0

//! Spreadsheet export of a table's rows.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::engine::types::{ColumnInfo, ColumnMetadata, Row, Value};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// Integers beyond this lose precision as spreadsheet numbers.
const MAX_EXACT_INT: u64 = 1 << 53;
const MAX_SHEET_NAME: usize = 31;
const MAX_COLUMN_WIDTH: usize = 60;

/// `<table>_<YYYY-MM-DD>.xlsx`
pub fn export_filename(table: &str, date: NaiveDate) -> String {
    format!("{}_{}.xlsx", table, date.format("%Y-%m-%d"))
}

/// Column comments where present, column names otherwise.
///
/// An empty result set may arrive without field metadata; the table's own
/// column list is used then.
pub fn header_labels(fields: &[ColumnInfo], columns: &[ColumnMetadata]) -> Vec<String> {
    let label = |name: &str| {
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.comment.trim())
            .filter(|comment| !comment.is_empty())
            .unwrap_or(name)
            .to_string()
    };

    if fields.is_empty() {
        return columns.iter().map(|c| label(&c.name)).collect();
    }
    fields.iter().map(|field| label(&field.name)).collect()
}

fn sheet_name(table: &str) -> String {
    let cleaned: String = table
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// Builds a single-sheet workbook in memory.
pub struct XlsxWriter {
    workbook: Workbook,
    header_format: Format,
    current_row: u32,
    widths: Vec<usize>,
}

impl XlsxWriter {
    pub fn new(table: &str) -> Result<Self, String> {
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .set_name(sheet_name(table))
            .map_err(|e| e.to_string())?;

        Ok(Self {
            workbook,
            header_format: Format::new().set_bold(),
            current_row: 0,
            widths: Vec::new(),
        })
    }

    fn worksheet(&mut self) -> Result<&mut Worksheet, String> {
        self.workbook
            .worksheet_from_index(0)
            .map_err(|e| e.to_string())
    }

    fn track_width(&mut self, col: usize, text_len: usize) {
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(text_len.min(MAX_COLUMN_WIDTH));
    }

    pub fn write_header(&mut self, labels: &[String]) -> Result<(), String> {
        let format = self.header_format.clone();
        let worksheet = self.worksheet()?;
        for (col, label) in labels.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, label, &format)
                .map_err(|e| e.to_string())?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(|e| e.to_string())?;

        for (col, label) in labels.iter().enumerate() {
            self.track_width(col, label.chars().count());
        }
        self.current_row = 1;
        Ok(())
    }

    pub fn write_row(&mut self, row: &Row) -> Result<(), String> {
        let row_idx = self.current_row;
        let mut lengths = Vec::with_capacity(row.values.len());
        {
            let worksheet = self.worksheet()?;
            for (col, value) in row.values.iter().enumerate() {
                lengths.push(write_value(worksheet, row_idx, col as u16, value)?);
            }
        }
        for (col, len) in lengths.into_iter().enumerate() {
            self.track_width(col, len);
        }
        self.current_row += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u32 {
        self.current_row.saturating_sub(1)
    }

    pub fn finish(mut self) -> Result<Vec<u8>, String> {
        let widths = std::mem::take(&mut self.widths);
        let worksheet = self.worksheet()?;
        for (col, width) in widths.into_iter().enumerate() {
            worksheet
                .set_column_width(col as u16, (width + 2) as f64)
                .map_err(|e| e.to_string())?;
        }

        self.workbook
            .save_to_buffer()
            .map_err(|e| format!("Failed to generate XLSX: {}", e))
    }
}

// Returns the displayed text length, used for column sizing.
fn write_value(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<usize, String> {
    let text = match value {
        Value::Null => return Ok(0),
        Value::Bool(b) => {
            worksheet
                .write_boolean(row, col, *b)
                .map_err(|e| e.to_string())?;
            return Ok(5);
        }
        Value::Int(i) if i.unsigned_abs() <= MAX_EXACT_INT => {
            worksheet
                .write_number(row, col, *i as f64)
                .map_err(|e| e.to_string())?;
            return Ok(i.to_string().len());
        }
        Value::Float(f) if f.is_finite() => {
            worksheet
                .write_number(row, col, *f)
                .map_err(|e| e.to_string())?;
            return Ok(f.to_string().len());
        }
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => STANDARD.encode(b),
        Value::Json(j) => j.to_string(),
    };

    worksheet
        .write_string(row, col, &text)
        .map_err(|e| e.to_string())?;
    Ok(text.chars().count())
}
