// 📂 Dataset I/O - Fund spreadsheet in, annotated spreadsheet out
//
// Rows are kept as plain text cells so every input column survives the round
// trip untouched. The reconciliation only looks at three of them:
//
//   CNPJ   → FundRecord.primary_id   (required)
//   ID     → FundRecord.secondary_id (optional)
//   STATUS → FundRecord.status       (optional)
//
// Supported formats (by extension): .csv, and .xlsx/.xlsm/.xls/.ods with the
// `xlsx` feature. Spreadsheet output is always written as .xlsx.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use crate::model::{non_blank, FundRecord, ValidationOutcome};

// ============================================================================
// COLUMN NAMES
// ============================================================================

pub const PRIMARY_ID_COLUMN: &str = "CNPJ";
pub const SECONDARY_ID_COLUMN: &str = "ID";
pub const STATUS_COLUMN: &str = "STATUS";

pub const VALIDATED_COLUMN: &str = "validado";
pub const FILING_DATE_COLUMN: &str = "dataUltimoArquivamento";
pub const EXTERNAL_ID_COLUMN: &str = "externalId";
pub const RESOLVED_ID_COLUMN: &str = "idRedis";

// ============================================================================
// FILE FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(FileFormat::Spreadsheet),
            _ => bail!(
                "Unsupported file extension for {} (expected .csv or .xlsx)",
                path.display()
            ),
        }
    }
}

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a rectangular table: every row ends up exactly as wide as the header.
    ///
    /// Rows wider than the header (e.g. a trailing comma) get blank-named
    /// header columns so no input cell is lost or overwritten.
    pub fn new(mut headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        if widest > headers.len() {
            headers.resize(widest, String::new());
        }

        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Dataset { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive header lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Parse every row into a FundRecord, in row order
    pub fn records(&self) -> Result<Vec<FundRecord>> {
        let primary = self.column_index(PRIMARY_ID_COLUMN).ok_or_else(|| {
            anyhow!(
                "Input is missing the {} column (found: {})",
                PRIMARY_ID_COLUMN,
                self.headers.join(", ")
            )
        })?;
        let secondary = self.column_index(SECONDARY_ID_COLUMN);
        let status = self.column_index(STATUS_COLUMN);

        let cell = |row: &[String], idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i)).and_then(|v| non_blank(v))
        };

        Ok(self
            .rows
            .iter()
            .map(|row| FundRecord {
                secondary_id: cell(row, secondary),
                primary_id: cell(row, Some(primary)),
                status: cell(row, status),
            })
            .collect())
    }

    /// Write one outcome per row into the output columns (added if missing)
    pub fn annotate(&mut self, outcomes: &[ValidationOutcome]) -> Result<()> {
        if outcomes.len() != self.rows.len() {
            bail!(
                "Expected {} outcomes, got {}",
                self.rows.len(),
                outcomes.len()
            );
        }

        let validated = self.ensure_column(VALIDATED_COLUMN);
        let filing_date = self.ensure_column(FILING_DATE_COLUMN);
        let external_id = self.ensure_column(EXTERNAL_ID_COLUMN);
        let resolved_id = self.ensure_column(RESOLVED_ID_COLUMN);

        for (row, outcome) in self.rows.iter_mut().zip(outcomes) {
            row[validated] = outcome.validated.to_string();
            row[filing_date] = outcome.filing_date_cell();
            row[external_id] = outcome.external_id.clone().unwrap_or_default();
            row[resolved_id] = outcome.resolved_secondary_id.clone().unwrap_or_default();
        }

        Ok(())
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }
}

// ============================================================================
// LOAD / SAVE
// ============================================================================

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    match FileFormat::from_path(path)? {
        FileFormat::Csv => load_csv(path),
        FileFormat::Spreadsheet => load_spreadsheet(path),
    }
}

pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let format = FileFormat::from_path(path)?;
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if format == FileFormat::Spreadsheet && !is_xlsx {
        bail!(
            "Cannot write {}: spreadsheet output is always .xlsx",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    match format {
        FileFormat::Csv => save_csv(dataset, path),
        FileFormat::Spreadsheet => save_spreadsheet(dataset, path),
    }
}

pub fn load_csv(csv_path: &Path) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", line + 2))?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(Dataset::new(headers, rows))
}

pub fn save_csv(dataset: &Dataset, csv_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create CSV file {}", csv_path.display()))?;

    wtr.write_record(&dataset.headers)?;
    for row in &dataset.rows {
        wtr.write_record(row)?;
    }
    wtr.flush().context("Failed to flush CSV output")?;

    Ok(())
}

#[cfg(feature = "xlsx")]
pub fn load_spreadsheet(path: &Path) -> Result<Dataset> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open spreadsheet {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Spreadsheet {} contains no sheets", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet '{}'", sheet_name))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => return Ok(Dataset::default()),
    };

    let mut rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    // Interior blank rows are fund rows too; only trailing ones are padding
    while rows
        .last()
        .is_some_and(|row| row.iter().all(|c| c.trim().is_empty()))
    {
        rows.pop();
    }

    Ok(Dataset::new(headers, rows))
}

/// Render a spreadsheet cell the way a person would read it
#[cfg(feature = "xlsx")]
fn cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => number_text(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Whole numbers (CNPJs typed as numbers) must not gain a ".0"
#[cfg(feature = "xlsx")]
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A text cell that came from a numeric cell, i.e. one that renders back
/// identically. `"0012"` or `"1e5"` stay text.
#[cfg(feature = "xlsx")]
fn numeric_cell(value: &str) -> Option<f64> {
    let n: f64 = value.parse().ok()?;
    (n.is_finite() && number_text(n) == value).then_some(n)
}

#[cfg(feature = "xlsx")]
pub fn save_spreadsheet(dataset: &Dataset, path: &Path) -> Result<()> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let validated = dataset.column_index(VALIDATED_COLUMN);

    for (col, header) in dataset.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (r, row) in dataset.rows.iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let col16 = col as u16;
            match (Some(col) == validated, value.parse::<bool>()) {
                (true, Ok(flag)) => worksheet.write_boolean(row_idx, col16, flag)?,
                _ => match numeric_cell(value) {
                    Some(n) => worksheet.write_number(row_idx, col16, n)?,
                    None => worksheet.write_string(row_idx, col16, value)?,
                },
            };
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write spreadsheet {}", path.display()))?;

    Ok(())
}

#[cfg(not(feature = "xlsx"))]
pub fn load_spreadsheet(path: &Path) -> Result<Dataset> {
    bail!(
        "Cannot read {}: spreadsheet support not compiled in (rebuild with --features xlsx)",
        path.display()
    )
}

#[cfg(not(feature = "xlsx"))]
pub fn save_spreadsheet(_dataset: &Dataset, path: &Path) -> Result<()> {
    bail!(
        "Cannot write {}: spreadsheet support not compiled in (rebuild with --features xlsx)",
        path.display()
    )
}

// ============================================================================
// TESTS
// ============================================================================
