use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use migtrail::cache::DEFAULT_CACHE_SIZE;
use migtrail::config::{self, MigtrailConfig, FORMATS};
use migtrail::filters::PathMatcher;
use migtrail::reporters::{self, build_report};
use migtrail::types::ReportMeta;
use migtrail::{parse_git_date, ChangeTracker, HistoryError, HistoryQuery, RepositoryScanner, Result, Timestamp};

#[derive(Parser, Debug)]
#[command(
    name = "migtrail",
    about = "Audit the git history of database migration scripts",
    version,
    long_about = "Walks the git history of every migration script in a repository and\n\
                  reports how often each one changed, which changes were reverted,\n\
                  which tables keep being altered and how migration activity trends.\n\n\
                  Alembic (alembic/versions/*.py) and Django (*/migrations/*.py)\n\
                  layouts are recognized out of the box; use --pattern for others."
)]
struct Args {
    /// Path to the git repository (defaults to the current directory).
    #[arg(value_name = "REPO")]
    repo_path: Option<PathBuf>,

    /// Analyze only these files instead of discovering migrations. Repeatable.
    #[arg(long = "migration", value_name = "PATH")]
    migrations: Vec<String>,

    /// Glob selecting migration files; `*` also matches `/`. Repeatable.
    #[arg(long = "pattern", value_name = "GLOB")]
    patterns: Vec<String>,

    /// Only count commits on or after this date, e.g. "2024-01-01"
    #[arg(long)]
    since: Option<String>,

    /// Only count commits on or before this date
    #[arg(long)]
    until: Option<String>,

    /// Only count commits whose author name contains this text (case-insensitive)
    #[arg(long)]
    author: Option<String>,

    /// Most recent commits to read per migration file
    #[arg(long, allow_negative_numbers = true)]
    max_commits: Option<i64>,

    /// Output format: terminal, json
    #[arg(long)]
    format: Option<String>,

    /// Write the report (or the generated config) to this file
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_color: bool,

    /// Entries kept in each scanner cache
    #[arg(long)]
    cache_size: Option<usize>,

    /// Config file (defaults to <REPO>/.migtrail.yml, then the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print an annotated config template and exit
    #[arg(long)]
    generate_config: bool,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// CLI flags merged over config file values.
struct Settings {
    patterns: Option<Vec<String>>,
    query: HistoryQuery,
    cache_size: usize,
    format: String,
    output: Option<PathBuf>,
    no_color: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.generate_config {
        if let Err(e) = config::print_template(args.output.as_deref()) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "migtrail=debug" } else { "migtrail=warn" };
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new(default_filter)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

// ── Analysis pipeline ──────────────────────────────────────────────────────────

fn run(args: &Args) -> Result<()> {
    let repo_path = args.repo_path.clone().unwrap_or_else(|| PathBuf::from("."));

    let cfg = match config::discover_config(args.config.as_deref(), &repo_path) {
        Some(path) => {
            debug!("Using config file {}", path.display());
            config::load_config(&path)?
        }
        None => MigtrailConfig::default(),
    };
    let settings = resolve_settings(args, cfg)?;

    if settings.no_color {
        colored::control::set_override(false);
    }

    let mut scanner = RepositoryScanner::open_with_cache_size(&repo_path, settings.cache_size)?;
    if let Some(patterns) = &settings.patterns {
        scanner = scanner.with_matcher(PathMatcher::new(patterns)?);
    }
    let repo_display = scanner.repo_path().display().to_string();

    let files = if args.migrations.is_empty() {
        scanner.find_migration_files(None)?
    } else {
        args.migrations.clone()
    };
    debug!("Tracking {} migration file(s) in {repo_display}", files.len());

    let started = Instant::now();
    let mut tracker = ChangeTracker::new(scanner);
    let pb = progress_bar(files.len() as u64);
    for file in &files {
        pb.set_message(file.clone());
        if let Err(e) = tracker.track_changes(file, &settings.query) {
            warn!("Failed to track {file}: {e}");
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let stats = tracker.scanner().cache_stats();
    debug!("Cache stats: {stats:?}");
    let store = tracker.into_store();
    eprintln!(
        "✔ {} migration file(s), {} change(s) in {:.1}s",
        store.len(),
        store.records().iter().map(|r| r.change_count).sum::<usize>(),
        started.elapsed().as_secs_f64(),
    );

    let meta = ReportMeta {
        repo_path: repo_display,
        analyzed_at: chrono::Utc::now().to_rfc3339(),
        file_count: store.len(),
        filters: filter_labels(&settings),
    };
    let report = build_report(&store, meta);

    match settings.format.as_str() {
        "json" => reporters::json::report_json(&report, settings.output.as_deref()),
        _ => reporters::terminal::report_terminal(&report, settings.output.as_deref()),
    }
}

fn resolve_settings(args: &Args, cfg: MigtrailConfig) -> Result<Settings> {
    let since = pick_date("since", args.since.as_deref(), cfg.since.as_deref())?;
    let until = pick_date("until", args.until.as_deref(), cfg.until.as_deref())?;

    let query = HistoryQuery {
        since,
        until,
        author: args.author.clone().or(cfg.author).filter(|a| !a.trim().is_empty()),
        max_results: args.max_commits.or(cfg.max_commits),
    };
    query.validate_filters()?;

    let format = args.format.clone().or(cfg.format).unwrap_or_else(|| "terminal".to_string());
    if !FORMATS.contains(&format.as_str()) {
        return Err(HistoryError::invalid(format!(
            "Invalid format \"{format}\". Expected one of: terminal, json"
        )));
    }

    let cache_size = args.cache_size.or(cfg.max_cache_size).unwrap_or(DEFAULT_CACHE_SIZE);
    if cache_size == 0 {
        return Err(HistoryError::invalid("cache size must be 1 or greater"));
    }

    let patterns = if args.patterns.is_empty() { cfg.patterns } else { Some(args.patterns.clone()) };

    Ok(Settings {
        patterns,
        query,
        cache_size,
        format,
        output: args.output.clone().or_else(|| cfg.output.map(PathBuf::from)),
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
    })
}

fn pick_date(name: &str, cli: Option<&str>, cfg: Option<&str>) -> Result<Option<Timestamp>> {
    match cli.or(cfg).map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_git_date(raw)
            .map(Some)
            .map_err(|_| HistoryError::invalid(format!("Cannot parse --{name} date \"{raw}\""))),
    }
}

fn filter_labels(settings: &Settings) -> Vec<String> {
    let q = &settings.query;
    let mut labels = Vec::new();
    if let Some(since) = &q.since {
        labels.push(format!("since={since}"));
    }
    if let Some(until) = &q.until {
        labels.push(format!("until={until}"));
    }
    if let Some(author) = &q.author {
        labels.push(format!("author={author}"));
    }
    if let Some(n) = q.max_results {
        labels.push(format!("max_commits={n}"));
    }
    if let Some(patterns) = &settings.patterns {
        labels.push(format!("patterns={}", patterns.join(" ")));
    }
    labels
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}") {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb
}
