//! Score an SVMlight/LETOR file with an XGBoost model.
//!
//! Usage:
//!   cargo run --release --features native --bin xgb-score -- \
//!     --model 0004.model --input mq2008.test
//!
//! Prints one line per record: label, query id and the model outputs.

// Use mimalloc as the global allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use xgb_bridge::{MaskPolicy, ScorerConfig};

/// Batch scorer for XGBoost ranking models
#[derive(Parser, Debug)]
#[command(author, version = xgb_bridge::version::VERSION, about, long_about = None)]
struct Args {
    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the XGBoost model file
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Input records, one per line
    #[arg(short, long, default_value = "mq2008.test")]
    input: PathBuf,

    /// Dense feature width
    #[arg(long)]
    features: Option<usize>,

    /// Values produced per record
    #[arg(long)]
    outputs: Option<usize>,

    /// Value written to unset features
    #[arg(long)]
    missing: Option<f32>,

    /// 0 score, 1 margin, 2 leaf index, 4 contributions
    #[arg(long)]
    option_mask: Option<i32>,

    /// Trees per prediction, 0 for all
    #[arg(long)]
    tree_limit: Option<u32>,

    /// Forward option_mask to XGBoost without checking it
    #[arg(long)]
    pass_through: bool,

    /// Worker threads sharing one booster
    #[arg(short, long, default_value_t = 1)]
    workers: usize,
}

fn build_config(args: &Args) -> Result<ScorerConfig, xgb_bridge::ConfigError> {
    let mut config = match &args.config {
        Some(path) => ScorerConfig::from_toml_file(path)?,
        None => ScorerConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(features) = args.features {
        config.num_features = features;
    }
    if let Some(outputs) = args.outputs {
        config.num_outputs = outputs;
    }
    if let Some(missing) = args.missing {
        config.missing = missing;
    }
    if let Some(option_mask) = args.option_mask {
        config.option_mask = option_mask;
    }
    if let Some(tree_limit) = args.tree_limit {
        config.tree_limit = tree_limit;
    }
    if args.pass_through {
        config.mask_policy = MaskPolicy::PassThrough;
    }
    config.pool_capacity = config.pool_capacity.max(1);
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "native")]
fn format_scores(scores: &[f32]) -> String {
    scores
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "native")]
fn run(args: &Args, config: ScorerConfig) -> Result<usize, xgb_bridge::ScoreError> {
    use std::fs::File;
    use std::io::{BufRead, BufReader, Write};
    use std::sync::Arc;

    use xgb_bridge::inference::NativeXgb;
    use xgb_bridge::{parse_line, score_parallel, Booster, Scorer, SharedBooster, XgbApi};

    let api: Arc<dyn XgbApi> = Arc::new(NativeXgb);
    let reader = BufReader::new(File::open(&args.input)?);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.workers <= 1 {
        let mut scorer = Scorer::new(api, config)?;
        let mut write_err = None;
        let scored = scorer.score_lines(reader, |record, scores| {
            if write_err.is_some() {
                return;
            }
            let qid = record.query_id.as_deref().unwrap_or("-");
            if let Err(e) = writeln!(out, "{}\t{}\t{}", record.label, qid, format_scores(scores)) {
                write_err = Some(e);
            }
        })?;
        if let Some(e) = write_err {
            return Err(e.into());
        }
        scorer.free()?;
        return Ok(scored);
    }

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        if let Some(record) = parse_line(&line?, i + 1)? {
            records.push(record);
        }
    }

    let booster = Booster::from_file(api, &config.model_path)?.with_mask_policy(config.mask_policy);
    let shared = SharedBooster::new(booster);
    let results = score_parallel(&shared, &config, &records, args.workers)?;
    for (record, result) in records.iter().zip(results) {
        let scores = result?;
        let qid = record.query_id.as_deref().unwrap_or("-");
        writeln!(out, "{}\t{}\t{}", record.label, qid, format_scores(&scores))?;
    }
    shared.free()?;
    Ok(records.len())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("{}", xgb_bridge::version::build_info());

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    info!("Model: {}", config.model_path.display());
    info!("Input: {}", args.input.display());
    info!(
        "Features: {}, outputs: {}, option_mask: {}, tree_limit: {}",
        config.num_features, config.num_outputs, config.option_mask, config.tree_limit
    );

    #[cfg(feature = "native")]
    {
        let start = std::time::Instant::now();
        match run(&args, config) {
            Ok(scored) => {
                let elapsed = start.elapsed();
                info!(
                    "Scored {} records in {:.2}ms ({:.1} records/s)",
                    scored,
                    elapsed.as_secs_f64() * 1000.0,
                    scored as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    #[cfg(not(feature = "native"))]
    {
        let _ = config;
        error!("Native inference not enabled. Rebuild with: cargo build --release --features native");
        std::process::exit(1);
    }
}
