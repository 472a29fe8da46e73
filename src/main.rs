use analytics::{ChartRenderer, InsightEngine, ReportGenerator};
use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use configuration::{Settings, ThresholdDirection, ThresholdSetting, load_query, load_settings, load_settings_from};
use core_types::{Aggregation, ChartConfiguration, ChartStyle, FieldType};
use database::{DbRepository, NewRecord, connect_from_env, connect_with, run_migrations};
use indicatif::{ProgressBar, ProgressStyle};
use indicators::IndicatorKind;
use query::{CancellationFlag, FieldCatalog, QueryExecutor};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

mod report;

use report::{JsonChartRenderer, TableReport};

/// The main entry point for the CRM analytics tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    }
    .context("Failed to load settings")?;
    // Held for the lifetime of `main` so buffered log lines are flushed.
    let _log_guard = configuration::init_tracing(&settings.logging).context("Failed to initialise logging")?;

    // Initialize the database connection and run migrations
    let pool = match &cli.database_url {
        Some(url) => connect_with(url, &settings.database).await,
        None => connect_from_env(&settings.database).await,
    }
    .context("Failed to connect to the database")?;
    run_migrations(&pool).await.context("Failed to run database migrations")?;
    let repo = DbRepository::new(pool);

    // Execute the appropriate command
    match cli.command {
        Commands::Fields => handle_fields(&repo).await,
        Commands::Import(args) => handle_import(args, &repo).await,
        Commands::Analyze(args) => handle_analyze(args, repo, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Ad-hoc analytics over CRM records: grouped queries, indicators and insights.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file; defaults to an optional `analytics.toml` in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `DATABASE_URL` (e.g. `sqlite://crm.db`).
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fields available to queries.
    Fields,
    /// Load records and custom field definitions from a JSON file.
    Import(ImportArgs),
    /// Run a query, derive indicators and print a report.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct ImportArgs {
    /// Either an array of records, or `{ "fields": [...], "records": [...] }`.
    file: PathBuf,
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// TOML file describing the query.
    #[arg(long)]
    query: PathBuf,

    /// Overrides the query's row limit.
    #[arg(long)]
    limit: Option<usize>,

    /// Add a simple moving average; the period defaults to the configured one.
    #[arg(long)]
    ma: Option<Option<usize>>,

    /// Add an exponential moving average; the period defaults to the configured one.
    #[arg(long)]
    ema: Option<Option<usize>>,

    /// Add a relative strength index; the period defaults to the configured one.
    #[arg(long)]
    rsi: Option<Option<usize>>,

    /// Add a least-squares trend line.
    #[arg(long)]
    trend: bool,

    /// Flag points crossing this value.
    #[arg(long)]
    threshold: Option<f64>,

    /// Which side of `--threshold` counts as a crossing.
    #[arg(long, value_enum, default_value = "above", requires = "threshold")]
    direction: ThresholdDirection,

    /// Chart style (professional, stock-market, scientific, modern, dark).
    #[arg(long, default_value = "professional")]
    style: ChartStyle,

    /// Write the JSON chart document to this path.
    #[arg(long)]
    chart_out: Option<PathBuf>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_fields(repo: &DbRepository) -> anyhow::Result<()> {
    let fields = repo.available_fields().await.context("Failed to read the field catalog")?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Display Name", "Type", "Storage"]);
    for field in &fields {
        let storage = field.json_path().unwrap_or_else(|| "column".to_string());
        table.add_row(vec![
            field.name.clone(),
            field.label().to_string(),
            field.field_type.to_string(),
            storage,
        ]);
    }
    println!("{table}");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct FieldDefinition {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    field_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Records(Vec<NewRecord>),
    Full {
        #[serde(default)]
        fields: Vec<FieldDefinition>,
        #[serde(default)]
        records: Vec<NewRecord>,
    },
}

async fn handle_import(args: ImportArgs, repo: &DbRepository) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let parsed: ImportFile = serde_json::from_str(&raw).context("Import file is not valid JSON")?;

    let (fields, records) = match parsed {
        ImportFile::Records(records) => (Vec::new(), records),
        ImportFile::Full { fields, records } => (fields, records),
    };

    for field in &fields {
        let field_type = match field.field_type.as_deref() {
            Some(raw) => FieldType::from_str(raw).with_context(|| format!("Field '{}'", field.name))?,
            None => FieldType::Text,
        };
        let display_name = field.display_name.as_deref().unwrap_or(&field.name);
        repo.define_custom_field(&field.name, display_name, field_type).await?;
    }

    let inserted = repo.insert_records(&records).await.context("Failed to import records")?;
    let total = repo.record_count().await?;
    println!(
        "Imported {} records and {} custom fields ({} records in store).",
        inserted,
        fields.len(),
        total
    );
    Ok(())
}

async fn handle_analyze(args: AnalyzeArgs, repo: DbRepository, settings: &Settings) -> anyhow::Result<()> {
    let mut query = load_query(&args.query).context("Failed to load the query file")?;
    if let Some(limit) = args.limit {
        query.limit = Some(limit);
    }
    let query = repo
        .resolve_query(&query)
        .await
        .context("Failed to resolve the query's fields")?;

    let executor = QueryExecutor::new(repo, settings.query.clone());
    let cancel = CancellationFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!("Running: {}", query.describe()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let outcome = executor.execute_with_cancel(&query, &cancel).await;
    spinner.finish_and_clear();
    let mut result = outcome.context("Query failed")?;

    // Insights are drawn from the queried series only; derived series follow.
    let mut insight_settings = settings.insights.clone();
    if let Some(value) = args.threshold {
        insight_settings.thresholds.push(ThresholdSetting::new(value, args.direction));
    }
    InsightEngine::from_settings(&insight_settings).enrich(&mut result);

    let indicators = &settings.indicators;
    let mut kinds = Vec::new();
    if let Some(period) = args.ma {
        kinds.push(IndicatorKind::MovingAverage(period.unwrap_or(indicators.moving_average_period)));
    }
    if let Some(period) = args.ema {
        kinds.push(IndicatorKind::Ema(period.unwrap_or(indicators.ema_period)));
    }
    if let Some(period) = args.rsi {
        kinds.push(IndicatorKind::Rsi(period.unwrap_or(indicators.rsi_period)));
    }
    if args.trend {
        kinds.push(IndicatorKind::TrendLine);
    }
    let derived = IndicatorKind::derive_all(&kinds, &result.series);
    tracing::debug!(derived = derived.len(), "Derived indicator series");
    result.series.extend(derived);

    let mut chart_config = ChartConfiguration::new(result.query_description.clone());
    chart_config.style = args.style;
    chart_config.x_axis_label = query
        .group_by_field
        .as_ref()
        .or(query.order_by.as_ref())
        .or(query.date_range_field.as_ref())
        .map(|f| f.label().to_string())
        .unwrap_or_else(|| "Record".to_string());
    chart_config.y_axis_label = match (&query.group_by_field, query.aggregation) {
        (Some(_), Aggregation::None) | (None, _) => "Value".to_string(),
        (Some(_), aggregation) => aggregation.to_string(),
    };

    let chart = match &args.chart_out {
        Some(path) => {
            let chart = JsonChartRenderer.render(&chart_config, &result)?;
            tokio::fs::write(path, &chart.bytes)
                .await
                .with_context(|| format!("Failed to write chart to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Chart written");
            Some(chart)
        }
        None => None,
    };

    let report = TableReport::default().generate(&result, chart.as_ref())?;
    println!("{report}");
    Ok(())
}
