// meeting-list-pdf: Generate printable, folded NA meeting lists from a BMLT root server

mod canvas;
mod compose;
mod config;
mod error;
mod geometry;
mod http;
mod layout;
mod metrics;
mod panels;
mod qr;
mod record;
mod render;
mod scrape;
mod sort;
mod source;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use compose::Session;
use config::{Profile, RequestParams, SourceFormat, BUILTIN_PROFILES, DEFAULT_TIMEOUT_SECS};
use error::AppError;
use http::HttpClient;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Output path that streams the PDF to stdout.
const STDOUT_PATH: &str = "-";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate printable meeting-list PDFs from a BMLT root server")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// HTTP timeout in seconds for every outbound request
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a meeting-list PDF
    Generate(GenerateArgs),
    /// List known root servers from the aggregator
    Servers {
        /// Server list URL
        #[arg(long, default_value = source::AGGREGATOR_SERVER_LIST)]
        url: String,
    },
    /// List the service bodies of a root server
    ServiceBodies {
        /// Root server URL
        server_url: String,
    },
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// Built-in profile (generic, flex, nsli, gnyr)
    #[arg(short, long, default_value = "generic")]
    profile: String,

    /// JSON profile file, replaces the built-in profile
    #[arg(long)]
    profile_file: Option<PathBuf>,

    /// Root server URL
    #[arg(long)]
    server_url: Option<String>,

    /// Service body ids (repeatable, or comma-separated)
    #[arg(short, long = "service-body")]
    service_bodies: Vec<String>,

    /// Include child service bodies
    #[arg(long)]
    recursive: bool,

    /// Group headers by "weekday" or "city"
    #[arg(long)]
    group_by: Option<String>,

    /// First day of the week (1 = Sunday .. 7 = Saturday)
    #[arg(long)]
    week_starts: Option<i64>,

    /// Fold layout (usletter, uslegal, tabloid, booklet, chapbook,
    /// two-fold-tabloid, two-fold-us-letter, two-fold-us-legal, trifold)
    #[arg(short, long)]
    layout: Option<String>,

    /// "landscape" / "l" to turn unlocked layouts sideways
    #[arg(long)]
    orientation: Option<String>,

    /// Page budget hint
    #[arg(long)]
    pages: Option<i64>,

    /// Column count hint
    #[arg(long)]
    columns: Option<i64>,

    /// Cover banner; "-" leaves the line out
    #[arg(long)]
    banner_1: Option<String>,

    #[arg(long)]
    banner_2: Option<String>,

    #[arg(long)]
    banner_3: Option<String>,

    #[arg(long)]
    credits: Option<String>,

    #[arg(long)]
    helpline: Option<String>,

    #[arg(long)]
    web_url: Option<String>,

    /// Note printed along the bottom of the cover
    #[arg(long)]
    footer: Option<String>,

    /// strftime pattern for the date line
    #[arg(long)]
    date_format: Option<String>,

    /// Logo image (file path or URL)
    #[arg(long)]
    logo: Option<String>,

    /// Document filename when writing to the working directory
    #[arg(long)]
    filename: Option<String>,

    /// Print QR codes for virtual meeting links
    #[arg(long)]
    qr: bool,

    /// QR image service URL (QR codes are generated locally otherwise)
    #[arg(long)]
    qr_service: Option<String>,

    /// Red header bars and the color logo
    #[arg(long)]
    color: bool,

    /// Draw light guide lines at the folds
    #[arg(long)]
    fold_guides: bool,

    /// Format language
    #[arg(long)]
    language: Option<String>,

    /// Date used for the date line and filename (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    date: Option<String>,

    /// Read meetings from a saved search response instead of the server
    #[arg(long)]
    records_file: Option<PathBuf>,

    /// Server response format (json or csv)
    #[arg(long, default_value = "json")]
    source_format: String,

    /// Output path ("-" writes the PDF to stdout)
    #[arg(short, long)]
    output: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let streaming = matches!(
        &cli.command,
        Command::Generate(args) if args.output.as_deref() == Some(STDOUT_PATH)
    );

    if let Err(e) = run(cli) {
        if streaming {
            if let Ok(json) = serde_json::to_string(&e.payload()) {
                println!("{}", json);
            }
        }
        eprintln!("Error: {}", e);
        std::process::exit(if e.is_client_error() { 2 } else { 1 });
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    let timeout = Duration::from_secs(cli.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    match cli.command {
        Command::Generate(args) => generate(args, cli.timeout_secs),
        Command::Servers { url } => {
            let servers = source::fetch_server_list(&HttpClient::new(timeout), &url)?;
            print_json(&servers)
        }
        Command::ServiceBodies { server_url } => {
            let root = config::normalize_root(&server_url);
            let bodies = source::fetch_service_bodies(&HttpClient::new(timeout), &root)?;
            print_json(&bodies)
        }
    }
}

fn generate(args: GenerateArgs, timeout_secs: Option<u64>) -> Result<(), AppError> {
    let span = info_span!("document", session = %generate_short_id());
    let _guard = span.enter();

    let profile = match &args.profile_file {
        Some(path) => Profile::load(path)?,
        None => Profile::builtin(&args.profile)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Unknown profile: {} (expected one of {})",
                    args.profile,
                    BUILTIN_PROFILES.join(", ")
                ))
            })?,
    };
    let today = parse_date(&args.date)?;
    let output = args.output.clone();
    let params = request_params(args, timeout_secs)?;

    let settings = config::resolve(&profile, &params, today)?;
    let http = HttpClient::new(settings.timeout);
    let mut session = Session::open(settings, &http)?;
    let assembly = session.assemble()?;
    info!(
        profile = %session.settings.profile,
        headers = assembly.trace.headers.len(),
        continued = assembly.trace.headers.iter().filter(|h| h.continued).count(),
        "Laid out meeting list"
    );

    let title = session
        .settings
        .content
        .banner_1
        .clone()
        .unwrap_or_else(|| "Meeting List".to_string());
    let bytes = render::render_pdf(&title, assembly.width, assembly.height, &assembly.pages)?;

    let target = output.unwrap_or_else(|| session.settings.filename.clone());
    if target == STDOUT_PATH {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    } else {
        std::fs::write(&target, &bytes)?;
    }
    info!(output = %target, bytes = bytes.len(), "Wrote document");

    let summary = format!(
        "✓ Generated: {}\n  Layout: {} ({} columns)\n  Meetings: {}\n  Pages: {}\n  Font size: {}pt",
        if target == STDOUT_PATH { "<stdout>" } else { target.as_str() },
        session.settings.preset,
        session.settings.geometry.columns,
        assembly.report.records,
        assembly.report.pages,
        assembly.report.font_size,
    );
    if target == STDOUT_PATH {
        eprintln!("{}", summary);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn request_params(args: GenerateArgs, timeout_secs: Option<u64>) -> Result<RequestParams, AppError> {
    Ok(RequestParams {
        server_url: args.server_url,
        service_bodies: args.service_bodies,
        recursive: args.recursive.then_some(true),
        group_by: args.group_by,
        week_starts: args.week_starts,
        layout: args.layout,
        orientation: args.orientation,
        pages: args.pages,
        columns: args.columns,
        banner_1: args.banner_1,
        banner_2: args.banner_2,
        banner_3: args.banner_3,
        credits: args.credits,
        helpline: args.helpline,
        web_url: args.web_url,
        footer: args.footer,
        date_format: args.date_format,
        logo_path: args.logo,
        filename: args.filename,
        qr: args.qr,
        qr_service: args.qr_service,
        color: args.color,
        fold_guides: args.fold_guides,
        language: args.language,
        records_file: args.records_file,
        source_format: SourceFormat::parse(&args.source_format)?,
        timeout_secs,
    })
}

fn parse_date(date_str: &Option<String>) -> Result<NaiveDate, AppError> {
    match date_str {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::Config(format!("Invalid date: {}", s))),
        None => Ok(Local::now().date_naive()),
    }
}

fn generate_short_id() -> String {
    let uuid = Uuid::new_v4();
    let hex = format!("{:x}", uuid);
    hex[..8].to_uppercase()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{}", json);
    Ok(())
}
