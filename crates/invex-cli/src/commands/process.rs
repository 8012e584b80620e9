//! Process command - extract fields from a single invoice file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::report::format_amount;
use invex_core::{InputDocument, InvoiceFields, InvoiceRecord};

use super::{ExtractorArg, build_orchestrator, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Text extraction backend
    #[arg(short, long, value_enum)]
    extractor: Option<ExtractorArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(extractor) = args.extractor {
        config.parser.backend = extractor.into();
    }
    let orchestrator = build_orchestrator(&config)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    info!("Processing file: {}", args.input.display());

    let input = InputDocument::from_path(&args.input).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Extracting {}...", input.filename));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let record = orchestrator.process_file(&input).await;
    pb.finish_and_clear();

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&record)?,
        OutputFormat::Text => format_record_text(&record),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if let Some(message) = record.error_message() {
        anyhow::bail!("Failed to process {}: {}", record.source_file(), message);
    }
    Ok(())
}

fn format_record_text(record: &InvoiceRecord) -> String {
    let mut output = format!("File: {}\n", record.source_file());
    output.push_str(&format!("Status: {}\n", record.status()));

    match record.fields() {
        Some(fields) => push_fields(&mut output, fields),
        None => {
            output.push_str(&format!(
                "Error: {}\n",
                record.error_message().unwrap_or("unknown error")
            ));
        }
    }
    output
}

fn push_fields(output: &mut String, fields: &InvoiceFields) {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let currency = fields.currency.as_deref().unwrap_or("");

    output.push('\n');
    output.push_str(&format!("Invoice: {}\n", or_dash(&fields.invoice_number)));
    output.push_str(&format!("Date: {}\n", or_dash(&fields.date)));
    output.push('\n');

    output.push_str("Party:\n");
    output.push_str(&format!("  {}\n", or_dash(&fields.party_name)));
    if let Some(address) = &fields.party_address {
        output.push_str(&format!("  {}\n", address));
    }
    if let Some(trn) = &fields.trn {
        output.push_str(&format!("  TRN: {}\n", trn));
    }
    output.push('\n');

    output.push_str("Summary:\n");
    for (label, amount) in [
        ("Subtotal", fields.subtotal),
        ("Tax", fields.tax_amount),
        ("Net total", fields.net_total),
    ] {
        match amount {
            Some(a) => output.push_str(&format!("  {:<10} {} {}\n", label, format_amount(a), currency)),
            None => output.push_str(&format!("  {:<10} -\n", label)),
        }
    }
    if let Some(count) = fields.items_count {
        output.push_str(&format!("  Items:     {}\n", count));
    }
}
