//! Reference CLI: run one batch and print the resulting children as JSON.

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use serde_json::{json, Map};

use mutengine_core::mutator::MutatorConfig;
use mutengine_core::novelty::NoveltyTracker;
use mutengine_core::registry::OperatorRegistry;
use mutengine_core::selector::{MetaWeightedSelector, Selector, UniformSelector};
use mutengine_core::stats::StatsByBucket;
use mutengine_core::{diagnostics, generate_children, operator::Status};
use mutengine_core::operators;

#[derive(Parser, Debug)]
#[command(name = "mutengine", about = "Deterministic mutation engine for LLM prompt robustness fuzzing")]
struct Args {
    /// Seed prompt text, or `@path` to read it from a file.
    #[arg(long)]
    seed: String,

    #[arg(long, default_value = "LLM01_PROMPT_INJECTION")]
    bucket: String,

    #[arg(long, default_value = "PROMPT_TEXT")]
    surface: String,

    #[arg(long, default_value_t = 10)]
    n: usize,

    #[arg(long, default_value_t = 1)]
    k: usize,

    #[arg(long, default_value_t = 2)]
    strength: u8,

    #[arg(long = "seed_base", default_value_t = 1337)]
    seed_base: u64,

    #[arg(long = "risk_max")]
    risk_max: Option<String>,

    #[arg(long = "max_chars", default_value_t = 8000)]
    max_chars: usize,

    #[arg(long = "schema_mode", default_value_t = false)]
    schema_mode: bool,

    #[arg(long, default_value = "N/A")]
    placeholder: String,

    /// Identifies this seed in the per-child `testcase_id` (`{seed_id}:{i}`).
    #[arg(long = "seed_id", default_value = "seed")]
    seed_id: String,

    /// Use the novelty/oracle-aware selector instead of uniform random.
    #[arg(long, default_value_t = false)]
    weighted: bool,

    #[arg(long)]
    out: Option<String>,
}

fn read_seed(spec: &str) -> io::Result<String> {
    match spec.strip_prefix('@') {
        Some(path) => fs::read_to_string(path),
        None => Ok(spec.to_string()),
    }
}

fn run() -> io::Result<()> {
    let args = Args::parse();
    let seed_text = read_seed(&args.seed)?;

    eprintln!(
        "{}",
        diagnostics::colorize(
            &format!("mutengine: bucket={} surface={} n={} k={}", args.bucket, args.surface, args.n, args.k),
            diagnostics::DIM
        )
    );

    let registry = match OperatorRegistry::load(operators::all(), true) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", diagnostics::colorize(&format!("registry load failed: {e}"), diagnostics::RED));
            return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
        }
    };

    let mut cfg = MutatorConfig::new(args.bucket.clone(), args.surface.clone());
    cfg.seed_base = args.seed_base;
    cfg.n = args.n;
    cfg.k = args.k;
    cfg.strength = args.strength;
    cfg.risk_max = args.risk_max.clone();
    cfg.max_chars = Some(args.max_chars);
    cfg.schema_mode = args.schema_mode;
    cfg.placeholder = args.placeholder.clone();
    cfg.metadata.insert("seed_id".to_string(), json!(args.seed_id));

    let mut stats = StatsByBucket::new();
    let mut novelty = NoveltyTracker::new();

    let children = if args.weighted {
        let mut selector = MetaWeightedSelector::new();
        generate_children(&cfg, &seed_text, &registry, &mut selector, &mut stats, &mut novelty)
    } else {
        let mut selector = UniformSelector;
        generate_children(&cfg, &seed_text, &registry, &mut selector, &mut stats, &mut novelty)
    };

    let n_ok = children.iter().filter(|c| c.last_status == Status::Ok).count();
    eprintln!(
        "{}",
        diagnostics::colorize(&format!("done: {n_ok}/{} children ended OK", children.len()), diagnostics::GREEN)
    );

    let mut constraints = Map::new();
    constraints.insert("max_chars".to_string(), json!(args.max_chars));
    constraints.insert("schema_mode".to_string(), json!(args.schema_mode));
    constraints.insert("placeholder".to_string(), json!(args.placeholder));

    let payload = json!({
        "bucket_id": args.bucket,
        "surface": args.surface,
        "n": args.n,
        "k": args.k,
        "strength": args.strength,
        "constraints": constraints,
        "recent_ops": stats.recent_ops(&args.bucket),
        "novelty": {
            "current_bucket": novelty.snapshot_one(&args.bucket).map(|s| json!({
                "total": s.total(),
                "unique": s.unique(),
                "seen_hits": s.seen_hits(),
                "unique_ratio": s.unique_ratio(),
            })),
        },
        "children": children.iter().map(|c| json!({
            "child_text": c.child_text,
            "last_status": c.last_status.as_str(),
            "mutation_trace": c.mutation_trace,
        })).collect::<Vec<_>>(),
    });

    let rendered = serde_json::to_string_pretty(&payload).expect("payload is always serializable");
    match &args.out {
        Some(path) => fs::write(path, rendered)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{rendered}")?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", diagnostics::colorize(&format!("mutengine: {e}"), diagnostics::RED));
            ExitCode::FAILURE
        }
    }
}
