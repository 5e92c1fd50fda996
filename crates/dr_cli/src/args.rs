// crates/dr_cli/src/args.rs
//
// Offline CLI argument surface and pre-flight checks.
// - No networked paths (any scheme:// is rejected)
// - Exactly one of: --manifest  XOR  (--matrix + --weights [+ --params])
// - At most one mode flag: --validate-only | --diagnose
// - Output: --out dir, --render [json|html]*

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use dr_core::directive::TopsisDirective;
use dr_core::Strategy;

/// Parsed CLI arguments.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "dre",
    version,
    disable_help_subcommand = true,
    about = "Offline, deterministic disaster-reduction capability evaluation (TOPSIS + grading)"
)]
pub struct Args {
    // --- Mode selection ---
    /// Manifest JSON naming the inputs (mutually exclusive with explicit file flags).
    #[arg(long, conflicts_with_all = ["matrix", "weights", "params"])]
    pub manifest: Option<PathBuf>,

    // --- Explicit inputs ---
    /// Indicator matrix JSON path.
    #[arg(long)]
    pub matrix: Option<PathBuf>,
    /// Weight configuration JSON path.
    #[arg(long)]
    pub weights: Option<PathBuf>,
    /// Evaluation parameters JSON path (defaults apply when omitted).
    #[arg(long)]
    pub params: Option<PathBuf>,

    // --- Parameter overrides ---
    /// Calculator strategy: legacy | unified.
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<Strategy>,
    /// Score for regions whose distances are both zero, in [0, 1].
    #[arg(long, value_parser = parse_unit_interval)]
    pub default_score: Option<f64>,
    /// Step directive, e.g. `@TOPSIS_POSITIVE:a,b,c`.
    #[arg(long, value_parser = parse_directive)]
    pub directive: Option<TopsisDirective>,
    /// Winsorize IQR outliers during repair.
    #[arg(long)]
    pub clamp_outliers: bool,

    // --- Run mode ---
    /// Validate inputs and write validation.json; no evaluation.
    #[arg(long, conflicts_with_all = ["diagnose", "repair"])]
    pub validate_only: bool,
    /// Diagnose inputs with a trial run and write diagnosis.json; no evaluation.
    #[arg(long, conflicts_with = "repair")]
    pub diagnose: bool,
    /// Apply deterministic repairs before evaluating.
    #[arg(long)]
    pub repair: bool,

    // --- Output & rendering ---
    /// Output directory (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
    /// Renderer(s) to emit (json, html). Omit to skip rendering.
    #[arg(long, value_parser = ["json", "html"], num_args = 0..=2)]
    pub render: Vec<String>,
    /// Report language for static text (zh, en).
    #[arg(long, default_value = "zh")]
    pub lang: String,

    /// Only log warnings and errors.
    #[arg(long)]
    pub quiet: bool,
}

/// Errors surfaced by argument validation. Messages are short and stable.
#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

pub fn parse_strategy(s: &str) -> Result<Strategy, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("unknown strategy {s:?} (expected legacy | unified)"))
}

pub fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let v: f64 = s.trim().parse().map_err(|_| format!("not a number: {s:?}"))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is outside [0, 1]"))
    }
}

pub fn parse_directive(s: &str) -> Result<TopsisDirective, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Entry point used by main.rs.
pub fn parse_and_validate() -> Result<Args, CliError> {
    check(Args::parse())
}

/// Path and mode checks on already-parsed arguments.
pub fn check(mut args: Args) -> Result<Args, CliError> {
    for p in iter_all_paths(&args) {
        ensure_local_path(p)?;
    }

    if let Some(manifest) = &args.manifest {
        ensure_local_exists(manifest, "--manifest")?;
        args.manifest = args.manifest.take().map(|p| normalize_path(&p));
    } else {
        let matrix = args.matrix.as_ref().ok_or(CliError::Missing("--matrix or --manifest"))?;
        let weights = args.weights.as_ref().ok_or(CliError::Missing("--weights"))?;
        ensure_local_exists(matrix, "--matrix")?;
        ensure_local_exists(weights, "--weights")?;
        if let Some(p) = &args.params {
            ensure_local_exists(p, "--params")?;
        }
        args.matrix = args.matrix.take().map(|p| normalize_path(&p));
        args.weights = args.weights.take().map(|p| normalize_path(&p));
        args.params = args.params.take().map(|p| normalize_path(&p));
    }

    args.out = normalize_path(&args.out);
    Ok(args)
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

fn iter_all_paths(args: &Args) -> impl Iterator<Item = &Path> {
    [
        args.manifest.as_deref(),
        args.matrix.as_deref(),
        args.weights.as_deref(),
        args.params.as_deref(),
        Some(args.out.as_path()),
    ]
    .into_iter()
    .flatten()
}

fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Absolute path; falls back to joining the CWD when the path does not exist yet.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}
