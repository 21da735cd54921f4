use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

use reshelf::config::ConfigStore;
use reshelf::library::scan;
use reshelf::logging::init_logging;
use reshelf::pipeline::{LogProgress, Pipeline};

mod output;
mod settings;

const USAGE: &str = "usage: reshelf [--apply] <root>...";

struct Args {
    apply: bool,
    roots: Vec<PathBuf>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        apply: false,
        roots: Vec::new(),
    };
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--apply" => args.apply = true,
            "-h" | "--help" => return Ok(None),
            flag if flag.starts_with('-') => return Err(format!("unknown option {flag}\n{USAGE}")),
            root => args.roots.push(PathBuf::from(root)),
        }
    }
    if args.roots.is_empty() {
        args.roots.push(env::current_dir().map_err(|e| e.to_string())?);
    }
    Ok(Some(args))
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args()? else {
        println!("{USAGE}");
        return Ok(());
    };

    let (settings, fallback) = settings::load_settings();
    if let Err(e) = init_logging(&settings.logging) {
        eprintln!("reshelf: logging unavailable: {e}");
    }
    if let Some(reason) = fallback {
        warn!(reason = %reason, "using default settings");
    }

    let store = settings.strategy_store().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable strategy store");
        ConfigStore::new()
    });

    let files = scan(&args.roots, &settings.scan);
    info!(roots = args.roots.len(), items = files.len(), "scanned");

    let mut pipeline = Pipeline::from_settings(&settings.pipeline);
    pipeline.load_config(&store);

    let progress = LogProgress::default();
    let mut plan = pipeline.analyze(&files, &args.roots, &progress);
    output::print_plan(&plan);

    if !args.apply {
        return Ok(());
    }
    let report = pipeline.execute_with_progress(&mut plan, &progress);
    output::print_report(&report);
    if report.failed > 0 {
        return Err(format!("{} operation(s) failed", report.failed).into());
    }
    Ok(())
}
