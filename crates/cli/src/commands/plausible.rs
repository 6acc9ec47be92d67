use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Subcommand};
use serde_json::json;
use sitepulse_ops::OpsClient;
use sitepulse_ops::sitepulse_core::{
    Dimension, Filter, METRIC_ALIASES, Metric, Property, TimeRangeSpec,
};
use sitepulse_ops::stats::{PageRequest, StatsReport, StatsRequest};

use crate::OutputFormat;
use crate::render;

const CHART_HEIGHT: usize = 15;
const CHART_WIDTH: usize = 78;

#[derive(Args, Debug)]
pub struct PlausibleArgs {
    #[command(subcommand)]
    pub command: PlausibleCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlausibleCommand {
    /// List sites available to the API key.
    Sites {
        /// Directory to write sites.csv into.
        #[arg(short, long)]
        csv: Option<PathBuf>,
    },
    /// List metrics, metric aliases, and breakdown dimensions.
    Metrics,
    /// Show top entries for one or more dimensions.
    Stats(StatsArgs),
    /// Analyze a single page.
    Page(PageArgs),
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Site domain (defaults to the first site).
    #[arg(short, long)]
    pub site: Option<String>,

    /// Time range: today, 7d, 30d, month, last_month, year, 14d, 2w, 6mo,
    /// or FROM..TO.
    #[arg(short, long, default_value = "30d")]
    pub period: String,

    /// Number of results to show per dimension.
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,

    /// Dimensions to break down by.
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "event:page,visit:referrer,visit:country"
    )]
    pub metrics: Vec<String>,

    /// Filter such as `visit:country==DE` or `event:page~/blog` (repeatable).
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Directory to write one CSV per dimension into.
    #[arg(short, long)]
    pub csv: Option<PathBuf>,

    /// Draw a daily-visitors chart.
    #[arg(short, long)]
    pub visualize: bool,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Page path, e.g. /pricing.
    pub page: String,

    #[arg(short, long)]
    pub site: Option<String>,

    #[arg(short, long, default_value = "30d")]
    pub period: String,

    /// Metric names or aliases (e.g. traffic,engagement).
    #[arg(short, long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Number of referrers and countries to show.
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,
}

pub async fn run(ops: &OpsClient, args: &PlausibleArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        PlausibleCommand::Sites { csv } => sites(ops, csv.as_ref(), format).await,
        PlausibleCommand::Metrics => metrics(format),
        PlausibleCommand::Stats(stats_args) => stats(ops, stats_args, format).await,
        PlausibleCommand::Page(page_args) => page(ops, page_args, format).await,
    }
}

async fn sites(ops: &OpsClient, csv: Option<&PathBuf>, format: &OutputFormat) -> anyhow::Result<()> {
    let sites = ops.sites().await?;
    let rows: Vec<Vec<String>> = sites
        .iter()
        .map(|site| {
            vec![
                site.domain.clone(),
                site.timezone.clone().unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sites)?),
        OutputFormat::Text => {
            println!("{} sites:", sites.len());
            print!("{}", render::table(&["Domain", "Timezone"], &rows));
        }
    }

    if let Some(dir) = csv {
        let path = dir.join("sites.csv");
        render::write_csv(&path, &["domain", "timezone"], &rows)?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn metrics(format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let value = json!({
                "metrics": Metric::ALL.iter().map(|m| json!({
                    "name": m.as_str(),
                    "description": m.description(),
                })).collect::<Vec<_>>(),
                "aliases": METRIC_ALIASES.iter().map(|(alias, metrics)| json!({
                    "alias": alias,
                    "metrics": metrics.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
                "dimensions": Property::ALL.iter().map(|p| json!({
                    "id": p.id(),
                    "label": p.label(),
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Metrics:");
            let rows: Vec<_> = Metric::ALL
                .iter()
                .map(|m| vec![m.as_str().to_string(), m.description().to_string()])
                .collect();
            print!("{}", render::table(&["Name", "Description"], &rows));

            println!("\nAliases:");
            let rows: Vec<_> = METRIC_ALIASES
                .iter()
                .map(|(alias, metrics)| {
                    let names: Vec<_> = metrics.iter().map(|m| m.as_str()).collect();
                    vec![(*alias).to_string(), names.join(", ")]
                })
                .collect();
            print!("{}", render::table(&["Alias", "Metrics"], &rows));

            println!("\nDimensions:");
            let rows: Vec<_> = Property::ALL
                .iter()
                .map(|p| vec![p.id().to_string(), p.label().to_string()])
                .collect();
            print!("{}", render::table(&["Id", "Label"], &rows));
            println!("\nCustom properties: event:props:<name>");
        }
    }
    Ok(())
}

async fn stats(ops: &OpsClient, args: &StatsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let range: TimeRangeSpec = args.period.parse()?;

    let mut dimensions = Vec::new();
    for name in &args.metrics {
        match name.parse::<Dimension>() {
            Ok(dimension) => dimensions.push(dimension),
            Err(e) => eprintln!("Skipping {e}"),
        }
    }
    if dimensions.is_empty() {
        bail!("no valid dimensions given; run `sitepulse plausible metrics` for the list");
    }

    let filters = args
        .filters
        .iter()
        .map(|f| f.parse::<Filter>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut request = StatsRequest::new(range)
        .with_dimensions(dimensions)
        .with_limit(args.limit)
        .with_filters(filters);
    if let Some(site) = &args.site {
        request = request.with_site(site);
    }

    let today = chrono::Local::now().date_naive();
    let report = ops.stats(&request, today).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if let Some(dir) = &args.csv {
        for section in report.sections.iter().filter(|s| s.is_ok()) {
            let name =
                render::csv_file_name(&report.site_id, &section.dimension.identifier(), &args.period);
            let path = dir.join(name);
            render::write_csv(&path, &["property", "visitors"], &section_rows(section, false))?;
            println!("Saved {}", path.display());
        }
    }

    if args.visualize {
        let points = ops.timeseries(&report.site_id, &range, today).await?;
        let points: Vec<(String, u64)> = points
            .into_iter()
            .map(|p| (p.date, p.visitors.unwrap_or_default()))
            .collect();
        println!("\nDaily visitors");
        print!("{}", render::chart(&points, CHART_HEIGHT, CHART_WIDTH));
    }
    Ok(())
}

fn print_report(report: &StatsReport) {
    println!(
        "Stats for {} ({}: {} to {})",
        report.site_id, report.range_label, report.period.start, report.period.end
    );
    for section in &report.sections {
        let label = section.dimension.label();
        println!("\n{label}");
        match &section.error {
            Some(error) => println!("  failed: {error}"),
            None if section.records.is_empty() => println!("  no data"),
            None => print!(
                "{}",
                render::table(&["#", label.as_ref(), "Visitors"], &section_rows(section, true))
            ),
        }
    }
}

fn section_rows(
    section: &sitepulse_ops::stats::StatsSection,
    numbered: bool,
) -> Vec<Vec<String>> {
    let key = section.dimension.result_key();
    section
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut row = Vec::with_capacity(3);
            if numbered {
                row.push((i + 1).to_string());
            }
            row.push(render::cell(record.get(key)));
            row.push(render::cell(record.get("visitors")));
            row
        })
        .collect()
}

async fn page(ops: &OpsClient, args: &PageArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let site_id = match &args.site {
        Some(site) => site.clone(),
        None => ops.default_site().await?,
    };
    let request = PageRequest {
        site_id,
        page: args.page.clone(),
        range: args.period.parse()?,
        include: args.include.clone(),
        limit: args.limit,
    };

    let today = chrono::Local::now().date_naive();
    let analysis = ops.analyze_page(&request, today).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Text => {
            println!(
                "Page {} on {} ({} to {})",
                analysis.page, request.site_id, analysis.period.start, analysis.period.end
            );
            let rows: Vec<_> = analysis
                .metrics
                .iter()
                .map(|(name, value)| vec![name.clone(), render::cell(Some(value))])
                .collect();
            print!("{}", render::table(&["Metric", "Value"], &rows));

            for (title, key, records) in [
                ("Top sources", "source", &analysis.referrers),
                ("Top countries", "country", &analysis.countries),
            ] {
                println!("\n{title}");
                let rows: Vec<_> = records
                    .iter()
                    .map(|r| vec![render::cell(r.get(key)), render::cell(r.get("visitors"))])
                    .collect();
                print!("{}", render::table(&[key, "visitors"], &rows));
            }
        }
    }
    Ok(())
}
