//! Batch reporting: summary statistics and tabular exports.

pub mod export;
mod summary;

pub use export::{
    ExportFormat, ExportPaths, ExportView, FULL_COLUMNS, SUCCESSFUL_COLUMNS, build_workbook,
    export_file_name, write_csv, write_exports,
};
pub use summary::{SummaryStatistics, format_amount};
