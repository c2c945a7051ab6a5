use product_image_scraper_lib::{config, delay_manager, input_loader, logger, report_writer};
use product_image_scraper_lib::{
    BatchPipeline, BingImageSearch, ColumnSelection, ImageSearchClient, LogProgressSink, ReportBuilder,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use config::{Cli, OutputFormat};
use delay_manager::DelayManager;

// Rough per-row cost with default pacing.
const ESTIMATED_SECS_PER_ROW: f64 = 3.5;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.log_level);
    info!("Starting Product Image Scraper...");

    if cli.list_sheets {
        let sheets = input_loader::sheet_names(&cli.input)
            .with_context(|| format!("failed to read sheets of {:?}", cli.input))?;
        for (i, name) in sheets.iter().enumerate() {
            info!("Sheet {}: {}", i + 1, name);
        }
        return Ok(());
    }

    // 1. Load the input sheet and resolve the columns to use
    let table = input_loader::load_table(&cli.input, cli.sheet.as_deref())
        .with_context(|| format!("failed to load input {:?}", cli.input))?;

    let selection = ColumnSelection::resolve(
        &table.headers,
        cli.id_column.as_deref(),
        cli.description_column.as_deref(),
        cli.supplier_column.as_deref(),
        cli.brand_column.as_deref(),
    )
    .context("failed to select input columns")?;
    info!(
        "Columns: ID='{}', Description='{}', Supplier={:?}, Brand={:?}",
        selection.id, selection.description, selection.supplier, selection.brand
    );

    let limit = cli.row_limit(table.row_count());
    let records = table
        .select_records(&selection, limit)
        .context("failed to read product rows")?;

    // 2. Filters and estimate
    let policy = cli.domain_policy();
    if policy.is_active() {
        info!(
            "Active filters: {} allowed domains, {} blocked domains",
            policy.whitelist().map_or(0, |l| l.len()),
            policy.blacklist().map_or(0, |l| l.len())
        );
    }
    info!(
        "Processing {} rows | Estimated time: ~{:.1} minutes",
        records.len(),
        records.len() as f64 * ESTIMATED_SECS_PER_ROW / 60.0
    );

    // 3. Search session, reused for every row
    let transport = match &cli.search_url {
        Some(url) => BingImageSearch::with_base_url(url),
        None => BingImageSearch::new(),
    }
    .context("failed to start image search session")?;
    let client = ImageSearchClient::new(
        transport,
        cli.search_settings(),
        DelayManager::new(cli.delay_settings()),
    );

    // 4. Run; Ctrl+C stops after the current row and still writes the report
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    })
    .ok();

    let started = Instant::now();
    let pipeline = BatchPipeline::new(&client, policy, cli.pipeline_settings()).with_stop_signal(stop);
    let output = pipeline.run(&records, &mut LogProgressSink);

    // 5. Report
    let report = ReportBuilder::new(selection.headers()).build(&output.results, &output.stats);
    let target = cli.output_target(records.len());
    let paths = match cli.format {
        OutputFormat::Xlsx => vec![report_writer::write_workbook(&report, &target)
            .with_context(|| format!("failed to write report to {:?}", target))?],
        OutputFormat::Csv => report_writer::write_csv_tables(&report, &target)
            .with_context(|| format!("failed to write report to {:?}", target))?,
    };

    let elapsed_min = started.elapsed().as_secs_f64() / 60.0;
    info!("Processing complete in {:.1} minutes!", elapsed_min);
    for path in &paths {
        info!("  {}", path.display());
    }
    if output.counters.success == 0 && output.counters.processed > 0 {
        warn!("No images were found for any product; check the search endpoint and filters.");
    }

    Ok(())
}
