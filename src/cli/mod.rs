//! CLI command handling

use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::client::{ApiClient, HttpTransport};
use crate::config::Settings;
use crate::services::{
    Aggregator, CacheGateway, FallbackLimits, FileStore, ReportQuery, ReportService,
};
use crate::types::{Report, ReportSource, VxfError};

/// Daily financial summaries from the VisioFex payment API
#[derive(Parser)]
#[command(name = "vxf-reports")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: ~/.vxf-reports/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key (overrides VXF_API_KEY and the settings file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a date-bucketed report (default)
    Report {
        /// First day, YYYY-MM-DD (default: 7 days ago)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Yesterday and today only
        #[arg(long, conflicts_with_all = ["start", "end"])]
        recent: bool,

        /// Bypass cached responses
        #[arg(long)]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear cached API responses
    Purge {
        /// Only clear keys starting with this prefix (e.g. "daily_")
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Show effective configuration
    Status,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(key) = self.api_key {
            settings.api_key = Some(key);
        }

        match self.command {
            None => run_report(&settings, default_query(today(), None, None, false)?, false, false),
            Some(Commands::Report {
                start,
                end,
                recent,
                force,
                json,
            }) => run_report(&settings, default_query(today(), start, end, recent)?, force, json),
            Some(Commands::Purge { prefix }) => run_purge(&settings, &prefix),
            Some(Commands::Status) => run_status(&settings),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve report flags into a query; an unset range is the last 7 days
fn default_query(
    today: NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    recent: bool,
) -> Result<ReportQuery, VxfError> {
    if recent {
        return Ok(ReportQuery::Recent);
    }
    let start = start.unwrap_or(today - Duration::days(7));
    let end = end.unwrap_or(today);
    if start > end {
        return Err(VxfError::Config(format!(
            "--start {} is after --end {}",
            start, end
        )));
    }
    Ok(ReportQuery::Range { start, end })
}

fn open_cache(settings: &Settings) -> anyhow::Result<CacheGateway> {
    let store = match &settings.cache_dir {
        Some(dir) => FileStore::with_cache_dir(dir.clone())?,
        None => FileStore::new()?,
    };
    Ok(CacheGateway::new(Box::new(store)))
}

fn build_service(settings: &Settings) -> anyhow::Result<ReportService> {
    let transport = HttpTransport::new(settings.timeout())?;
    let client = ApiClient::new(
        Box::new(transport),
        settings.api_base.clone(),
        settings.api_key.clone(),
    );
    Ok(ReportService::new(
        client,
        open_cache(settings)?,
        settings.cache_ttl(),
        FallbackLimits {
            page_size: settings.page_size,
            max_pages: settings.max_pages,
        },
    ))
}

fn run_report(settings: &Settings, query: ReportQuery, force: bool, json: bool) -> anyhow::Result<()> {
    let service = build_service(settings)?;
    let report = service.get_report(query, force)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&query, &report));
    }
    Ok(())
}

fn run_purge(settings: &Settings, prefix: &str) -> anyhow::Result<()> {
    let cache = open_cache(settings)?;
    let removed = cache.purge(prefix)?;
    println!("Removed {} cached entries", removed);
    Ok(())
}

fn run_status(settings: &Settings) -> anyhow::Result<()> {
    match settings.masked_api_key() {
        Some(masked) => println!("API key:   SET ({})", masked),
        None => println!("API key:   NOT SET"),
    }
    println!("API base:  {}", settings.api_base);
    let cache = match &settings.cache_dir {
        Some(dir) => dir.display().to_string(),
        None => FileStore::new()?.cache_dir().display().to_string(),
    };
    println!("Cache dir: {}", cache);
    Ok(())
}

/// Plain-text table with a heading and, for fallback reports, a
/// pagination notice
fn render_report(query: &ReportQuery, report: &Report) -> String {
    let mut out = String::new();

    match query {
        ReportQuery::Recent => out.push_str("Recent Summary (Yesterday & Today)\n"),
        ReportQuery::Range { start, end } => {
            out.push_str(&format!("Report from {} to {}\n", start, end))
        }
    }

    if let ReportSource::Transactions {
        total_fetched,
        pages_fetched,
        may_have_more,
    } = report.source
    {
        out.push_str(&format!(
            "Fetched {} transactions across {} page(s).",
            total_fetched, pages_fetched
        ));
        if may_have_more {
            out.push_str(" Note: there may be additional transactions not shown (hit pagination limit).");
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&format!(
        "{:<12} {:>12} {:>14} {:>14} {:>14}\n",
        "Date", "Transactions", "Gross", "Platform Fees", "Net Profit"
    ));
    for row in &report.rows {
        out.push_str(&format!(
            "{:<12} {:>12} {:>14.2} {:>14.2} {:>14.2}\n",
            row.date, row.count, row.gross, row.platform_fee, row.net_profit
        ));
    }
    if report.rows.len() > 1 {
        let total = Aggregator::total(&report.rows);
        out.push_str(&format!(
            "{:<12} {:>12} {:>14.2} {:>14.2} {:>14.2}\n",
            total.date, total.count, total.gross, total.platform_fee, total.net_profit
        ));
    }
    if report.is_empty() {
        out.push_str("(no data)\n");
    }
    out
}
