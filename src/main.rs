//! catalog-walker - Repository catalog scanner
//!
//! Entry point for the CLI application: loads a repository image and runs
//! a traversal over it, printing visited catalogs and a summary.

use anyhow::{bail, Context, Result};
use catalog_walker::{
    CatalogVisit, CatalogWalker, ObjectId, ParallelWalker, RepositoryImage, TraversalOrder,
    TraversalParams, WalkStats, FULL_HISTORY,
};
use chrono::DateTime;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Traversal engine for content-addressed repository catalogs
#[derive(Parser, Debug)]
#[command(
    name = "catalog-walker",
    version,
    about = "Scan the catalog graph of a repository image",
    long_about = "Walks every catalog reachable from the chosen entry points of a \
                  repository image (JSON), honouring history-depth and timestamp \
                  cutoffs.\n\n\
                  The emission order is deterministic with one thread; more threads \
                  select the parallel driver, which preserves the per-subtree \
                  ordering guarantees.",
    after_help = "EXAMPLES:\n    \
        catalog-walker repo.json --list\n    \
        catalog-walker repo.json --history full --no-repeat -t 8\n    \
        catalog-walker repo.json --snapshots --order depth\n    \
        catalog-walker repo.json --root ffee2bf068f3c793efa6ca0fa3bddb066541903b-C"
)]
struct CliArgs {
    /// Repository image to scan (JSON)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Emission order
    #[arg(long, value_enum, default_value_t = OrderArg::Breadth)]
    order: OrderArg,

    /// Previous revisions to follow: a number, or "full" for unbounded
    #[arg(long, default_value = "0", value_name = "N|full")]
    history: String,

    /// Stop the history chain below this RFC 3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    timestamp_floor: Option<String>,

    /// Emit every catalog hash at most once
    #[arg(long)]
    no_repeat: bool,

    /// Prune catalogs that fail to load instead of aborting
    #[arg(long)]
    ignore_load_failure: bool,

    /// Worker threads; more than 1 selects the parallel driver
    #[arg(short = 't', long, default_value = "1", value_name = "NUM")]
    threads: usize,

    /// Traverse all named snapshots instead of HEAD
    #[arg(long)]
    snapshots: bool,

    /// Start from this root catalog hash instead of HEAD
    #[arg(long, value_name = "HASH", conflicts_with = "snapshots")]
    root: Option<String>,

    /// Print each visited catalog
    #[arg(short = 'l', long)]
    list: bool,

    /// Quiet mode - suppress diagnostics
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose output (debug-level diagnostics)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    /// Pre-order: parents before descendants
    Breadth,
    /// Post-order: parents after descendants
    Depth,
}

impl From<OrderArg> for TraversalOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Breadth => TraversalOrder::BreadthFirst,
            OrderArg::Depth => TraversalOrder::DepthFirst,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let params = build_params(&args)?;
    let order = TraversalOrder::from(args.order);

    let image = RepositoryImage::load(&args.image)
        .with_context(|| format!("cannot load image '{}'", args.image.display()))?;
    image.verify().context("image is inconsistent")?;
    let fetcher = image.into_fetcher().context("image tag list is invalid")?;

    let root = args
        .root
        .as_deref()
        .map(|raw| raw.parse::<ObjectId>())
        .transpose()
        .context("invalid --root hash")?;

    let start = Instant::now();
    let stats = if params.num_threads > 1 {
        let mut walker = ParallelWalker::new(fetcher, params)?;
        if args.list {
            walker.register_listener(print_visit);
        }
        let result = if args.snapshots {
            walker.traverse_named_snapshots(order)
        } else if let Some(root) = root {
            walker.traverse_root(root, order)
        } else {
            walker.traverse(order)
        };
        result.context("traversal failed")?;
        walker.stats()
    } else {
        let mut walker = CatalogWalker::new(fetcher, params);
        if args.list {
            walker.register_listener(print_visit);
        }
        let result = if args.snapshots {
            walker.traverse_named_snapshots(order)
        } else if let Some(root) = root {
            walker.traverse_root(root, order)
        } else {
            walker.traverse(order)
        };
        result.context("traversal failed")?;
        walker.stats()
    };

    print_summary(&stats, start.elapsed().as_secs_f64());
    Ok(())
}

fn print_visit(visit: &CatalogVisit) {
    println!(
        "{:>4}  {:>2}  {}  {}",
        visit.catalog.revision,
        visit.history_depth,
        visit.catalog.hash,
        if visit.catalog.mount_path.is_empty() {
            "/"
        } else {
            visit.catalog.mount_path.as_str()
        },
    );
}

fn print_summary(stats: &WalkStats, elapsed_secs: f64) {
    eprintln!(
        "Visited: {} catalogs in {} revisions | Pruned: {} | Skipped failures: {} | {:.2}s",
        stats.visited, stats.revision_roots, stats.pruned, stats.load_failures_ignored, elapsed_secs,
    );
}

fn build_params(args: &CliArgs) -> Result<TraversalParams> {
    let history_depth = if args.history.eq_ignore_ascii_case("full") {
        FULL_HISTORY
    } else {
        args.history
            .parse::<u32>()
            .context("invalid --history (expected a number or \"full\")")?
    };

    let timestamp_floor = match &args.timestamp_floor {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .context("invalid --timestamp-floor (expected RFC 3339)")?;
            parsed.timestamp()
        }
        None => 0,
    };

    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }

    Ok(TraversalParams {
        history_depth,
        timestamp_floor,
        no_repeat_history: args.no_repeat,
        ignore_load_failure: args.ignore_load_failure,
        no_close: false,
        quiet: args.quiet,
        num_threads: args.threads,
        ..Default::default()
    })
}

fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
    Ok(())
}
