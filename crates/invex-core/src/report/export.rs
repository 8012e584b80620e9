//! Tabular exports of a batch: spreadsheet and CSV.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::summary::SummaryStatistics;
use crate::error::ExportError;
use crate::models::batch::BatchResult;
use crate::models::config::ExportConfig;
use crate::models::record::{FIELD_NAMES, InvoiceRecord};

/// Columns of the full export.
pub const FULL_COLUMNS: [&str; 13] = [
    "date",
    "invoice_number",
    "party_name",
    "party_address",
    "trn",
    "currency",
    "subtotal",
    "tax_amount",
    "net_total",
    "items_count",
    "source_file",
    "processing_status",
    "error_message",
];

/// Columns of the successful-only export.
pub const SUCCESSFUL_COLUMNS: [&str; 12] = [
    "date",
    "invoice_number",
    "party_name",
    "party_address",
    "trn",
    "currency",
    "subtotal",
    "tax_amount",
    "net_total",
    "items_count",
    "source_file",
    "processing_status",
];

const MONEY_FORMAT: &str = "#,##0.00";
const HEADER_COLOR: u32 = 0x4472C4;

/// Longest string a spreadsheet cell can hold.
const MAX_CELL_CHARS: usize = 32_767;

/// Which rows and columns an export carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportView {
    /// Every record, with the error column.
    Full,
    /// Successful records only, without the error column.
    Successful,
}

impl ExportView {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ExportView::Full => &FULL_COLUMNS,
            ExportView::Successful => &SUCCESSFUL_COLUMNS,
        }
    }

    fn includes(&self, record: &InvoiceRecord) -> bool {
        match self {
            ExportView::Full => true,
            ExportView::Successful => record.is_success(),
        }
    }
}

/// File format of the full export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Where [`write_exports`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub full: PathBuf,
    /// Absent when the batch has no successful records.
    pub successful: Option<PathBuf>,
}

enum Cell<'a> {
    Empty,
    Text(&'a str),
    Amount(Decimal),
    Count(u32),
}

impl Cell<'_> {
    fn to_csv(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.to_string(),
            Cell::Amount(d) => d.normalize().to_string(),
            Cell::Count(n) => n.to_string(),
        }
    }
}

fn text(value: &Option<String>) -> Cell<'_> {
    value.as_deref().map_or(Cell::Empty, Cell::Text)
}

fn row_cells(record: &InvoiceRecord, view: ExportView) -> Vec<Cell<'_>> {
    let mut cells = Vec::with_capacity(view.columns().len());

    match record.fields() {
        Some(f) => {
            cells.extend([
                text(&f.date),
                text(&f.invoice_number),
                text(&f.party_name),
                text(&f.party_address),
                text(&f.trn),
                text(&f.currency),
                f.subtotal.map_or(Cell::Empty, Cell::Amount),
                f.tax_amount.map_or(Cell::Empty, Cell::Amount),
                f.net_total.map_or(Cell::Empty, Cell::Amount),
                f.items_count.map_or(Cell::Empty, Cell::Count),
            ]);
        }
        None => cells.extend(FIELD_NAMES.iter().map(|_| Cell::Empty)),
    }

    cells.push(Cell::Text(record.source_file()));
    cells.push(Cell::Text(record.status().as_str()));
    if view == ExportView::Full {
        cells.push(record.error_message().map_or(Cell::Empty, Cell::Text));
    }
    cells
}

/// Write `batch` as CSV with a header row.
pub fn write_csv<W: Write>(batch: &BatchResult, view: ExportView, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(view.columns())?;

    for record in batch.iter().filter(|r| view.includes(r)) {
        let row: Vec<String> = row_cells(record, view).iter().map(Cell::to_csv).collect();
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Build the spreadsheet: the full view on `sheet_name`, plus a `Summary`
/// sheet when `summary` is given.
pub fn build_workbook(
    batch: &BatchResult,
    sheet_name: &str,
    summary: Option<&SummaryStatistics>,
) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_COLOR))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let money = Format::new().set_num_format(MONEY_FORMAT);

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name)?;
        write_records_sheet(sheet, batch, &header, &money)?;
    }

    if let Some(stats) = summary {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        sheet.write_string_with_format(0, 0, "Metric", &header)?;
        sheet.write_string_with_format(0, 1, "Value", &header)?;
        for (i, (metric, value)) in stats.metric_rows().into_iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, metric)?;
            sheet.write_string(row, 1, cell_text(&value))?;
        }
        sheet.set_column_width(0, 20)?;
        sheet.set_column_width(1, 24)?;
    }

    Ok(workbook)
}

fn write_records_sheet(
    sheet: &mut Worksheet,
    batch: &BatchResult,
    header: &Format,
    money: &Format,
) -> Result<(), ExportError> {
    let view = ExportView::Full;

    for (col, name) in view.columns().iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *name, header)?;
        sheet.set_column_width(col, column_width(name))?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (i, record) in batch.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, cell) in row_cells(record, view).into_iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(row, col, cell_text(s))?;
                }
                Cell::Amount(d) => match d.to_f64() {
                    Some(n) => {
                        sheet.write_number_with_format(row, col, n, money)?;
                    }
                    None => {
                        sheet.write_string(row, col, d.to_string())?;
                    }
                },
                Cell::Count(n) => {
                    sheet.write_number(row, col, n)?;
                }
            }
        }
    }

    Ok(())
}

/// `s` cut down to what a cell can hold. CSV exports keep the full text.
fn cell_text(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => &s[..cut],
        None => s,
    }
}

fn column_width(name: &str) -> f64 {
    match name {
        "party_name" | "party_address" | "error_message" => 40.0,
        "source_file" | "invoice_number" | "trn" => 22.0,
        "subtotal" | "tax_amount" | "net_total" => 14.0,
        _ => 12.0,
    }
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.<extension>`
pub fn export_file_name(prefix: &str, generated_at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        generated_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}

/// Write the full export in `format`, and the successful-only CSV when the
/// batch has at least one success.
pub fn write_exports(
    batch: &BatchResult,
    config: &ExportConfig,
    format: ExportFormat,
    generated_at: NaiveDateTime,
) -> Result<ExportPaths, ExportError> {
    fs::create_dir_all(&config.output_dir)?;

    let full = config.output_dir.join(export_file_name(
        &config.full_prefix,
        generated_at,
        format.extension(),
    ));
    match format {
        ExportFormat::Xlsx => {
            let summary = config
                .summary_sheet
                .then(|| SummaryStatistics::from_batch(batch));
            let mut workbook = build_workbook(batch, &config.sheet_name, summary.as_ref())?;
            workbook.save(&full)?;
        }
        ExportFormat::Csv => write_csv_file(batch, ExportView::Full, &full)?,
    }
    info!("Wrote {} records to {}", batch.len(), full.display());

    let successful = if batch.successful().next().is_some() {
        let path = config.output_dir.join(export_file_name(
            &config.successful_prefix,
            generated_at,
            "csv",
        ));
        write_csv_file(batch, ExportView::Successful, &path)?;
        info!("Wrote successful records to {}", path.display());
        Some(path)
    } else {
        None
    };

    Ok(ExportPaths { full, successful })
}

fn write_csv_file(batch: &BatchResult, view: ExportView, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_csv(batch, view, file)
}
