//! Convert command - extract a batch of PDF invoices into a spreadsheet.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Args, ValueEnum};
use console::{style, truncate_str};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::report::format_amount;
use invex_core::{
    BatchResult, ExportFormat, InputDocument, InvoiceRecord, SummaryStatistics, write_exports,
};

use super::{ExtractorArg, build_orchestrator, load_config};

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Input PDF files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory for the export files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// File format of the full export
    #[arg(short, long, value_enum, default_value = "xlsx")]
    format: FormatArg,

    /// Text extraction backend
    #[arg(short, long, value_enum)]
    extractor: Option<ExtractorArg>,

    /// Which records to preview after processing
    #[arg(long, value_enum, default_value = "all")]
    show: ShowFilter,

    /// Leave the summary sheet out of the spreadsheet
    #[arg(long)]
    no_summary_sheet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// Excel workbook
    Xlsx,
    /// Comma-separated values
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShowFilter {
    /// Every record
    All,
    /// Successful records only
    Success,
    /// Failed records only
    Failed,
    /// No preview
    None,
}

impl ShowFilter {
    fn includes(&self, record: &InvoiceRecord) -> bool {
        match self {
            ShowFilter::All => true,
            ShowFilter::Success => record.is_success(),
            ShowFilter::Failed => !record.is_success(),
            ShowFilter::None => false,
        }
    }
}

pub async fn run(args: ConvertArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(extractor) = args.extractor {
        config.parser.backend = extractor.into();
    }
    if let Some(dir) = &args.output_dir {
        config.export.output_dir = dir.clone();
    }
    if args.no_summary_sheet {
        config.export.summary_sheet = false;
    }

    // Secrets are checked before any input is read
    let orchestrator = build_orchestrator(&config)?;

    let files = collect_inputs(&args.inputs)?;
    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let mut inputs = Vec::with_capacity(files.len());
    for path in &files {
        let input = InputDocument::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        inputs.push(input);
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    let observer = |index: usize, total: usize, filename: &str| {
        pb.set_position(index as u64);
        pb.set_message(format!("Processing {}/{}: {}", index, total, filename));
    };

    let batch = orchestrator.process_batch(&inputs, &observer).await;
    pb.finish_and_clear();

    let stats = SummaryStatistics::from_batch(&batch);
    print_summary(&stats, start);
    print_preview(&batch, args.show);
    print_failures(&batch);

    let paths = write_exports(
        &batch,
        &config.export,
        args.format.into(),
        Local::now().naive_local(),
    )?;

    println!();
    println!(
        "{} Results written to {}",
        style("✓").green(),
        paths.full.display()
    );
    match &paths.successful {
        Some(path) => println!(
            "{} Successful records written to {}",
            style("✓").green(),
            path.display()
        ),
        None => println!(
            "{} No successful records, skipped the successful-only export",
            style("ℹ").blue()
        ),
    }

    info!("Convert finished in {:?}", start.elapsed());
    Ok(())
}

/// Expand patterns into PDF paths, keeping argument order.
fn collect_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let literal = Path::new(pattern);
        let matches: Vec<PathBuf> = if literal.is_file() {
            vec![literal.to_path_buf()]
        } else {
            glob(pattern)
                .with_context(|| format!("Invalid pattern: {}", pattern))?
                .filter_map(|r| r.ok())
                .collect()
        };

        for path in matches {
            if is_pdf(&path) {
                files.push(path);
            } else {
                debug!("Skipping non-PDF input {}", path.display());
            }
        }
    }

    if files.is_empty() {
        anyhow::bail!("No PDF files found for: {}", patterns.join(" "));
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn print_summary(stats: &SummaryStatistics, start: Instant) {
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        stats.total_files,
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(stats.successful).green(),
        style(stats.failed).red()
    );

    if stats.successful > 0 {
        let currency = stats.currency.as_deref().unwrap_or("");
        println!(
            "   Total net: {} {}   Average net: {} {}   Total tax: {} {}",
            format_amount(stats.total_net),
            currency,
            format_amount(stats.average_net),
            currency,
            format_amount(stats.total_tax),
            currency
        );
    }
}

fn print_preview(batch: &BatchResult, filter: ShowFilter) {
    let rows: Vec<&InvoiceRecord> = batch.iter().filter(|r| filter.includes(r)).collect();
    if rows.is_empty() {
        return;
    }

    println!();
    println!(
        "{:<24} {:<8} {:<16} {:<28} {:>14} {:<4}",
        style("file").bold(),
        style("status").bold(),
        style("invoice").bold(),
        style("party").bold(),
        style("net total").bold(),
        style("cur").bold()
    );

    for record in rows {
        let status = if record.is_success() {
            style(record.status().as_str()).green()
        } else {
            style(record.status().as_str()).red()
        };
        let fields = record.fields();
        let cell = |value: Option<&str>, width: usize| {
            truncate_str(value.unwrap_or("-"), width, "…").into_owned()
        };

        println!(
            "{:<24} {:<8} {:<16} {:<28} {:>14} {:<4}",
            cell(Some(record.source_file()), 24),
            status,
            cell(fields.and_then(|f| f.invoice_number.as_deref()), 16),
            cell(fields.and_then(|f| f.party_name.as_deref()), 28),
            fields
                .and_then(|f| f.net_total)
                .map(format_amount)
                .unwrap_or_else(|| "-".to_string()),
            cell(fields.and_then(|f| f.currency.as_deref()), 4),
        );
    }
}

fn print_failures(batch: &BatchResult) {
    let failed: Vec<&InvoiceRecord> = batch.failed().collect();
    if failed.is_empty() {
        return;
    }

    println!();
    println!("{}", style("Failed files:").red());
    for record in failed {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            record.source_file(),
            record.error_message().unwrap_or("unknown error")
        );
    }
}
