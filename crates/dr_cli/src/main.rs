// crates/dr_cli/src/main.rs
//
// load → validate → (diagnose | repair) → evaluate → write artifacts → render,
// with a fixed exit-code table.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    /// Validation rejected the input, or bad arguments.
    pub const VALIDATION: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const IO: i32 = 4;
    /// Data-quality issues left after repair.
    pub const UNRESOLVED: i32 = 5;
}

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use args::{parse_and_validate as parse_cli, Args};

use dr_core::directive::{DistanceOutput, TopsisDirective};
use dr_core::IndicatorMatrix;
use dr_io::canonical_json;
use dr_io::loader::{self, LoadedInputs};
use dr_io::IoError;
use dr_pipeline::{
    build_evaluation_doc, diagnose, evaluate, evaluate_with_repair, validate_weights,
    validate_with, Evaluation, EvaluationDoc, PipelineError,
};

/// Central error type for exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Schema / JSON shape / manifest failures and validation rejections.
    Validation(String),
    /// Parameter domain, unknown indicator or missing weight.
    Config(String),
    Io(String),
    Unresolved(String),
    Render(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation: {m}"),
            MainError::Config(m) => write!(f, "configuration: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
            MainError::Unresolved(m) => write!(f, "unresolved: {m}"),
            MainError::Render(m) => write!(f, "render: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("dre: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };
    init_tracing(args.quiet);

    let result = if args.validate_only {
        validate_only(&args)
    } else if args.diagnose {
        diagnose_only(&args)
    } else {
        run_once(&args)
    };

    let rc = match result {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            error!("{e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

/// `RUST_LOG` wins when set; otherwise `info`, or `warn` under `--quiet`.
fn init_tracing(quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if quiet { "warn" } else { "info" }));
    let _ =tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::Config(_) => CONFIG,
        MainError::Io(_) | MainError::Render(_) => IO,
        MainError::Unresolved(_) => UNRESOLVED,
    }
}

fn map_io_err(e: IoError) -> MainError {
    use IoError::*;
    match e {
        Schema(m) => MainError::Validation(format!("schema: {m}")),
        Json { pointer, msg } => MainError::Validation(format!("json {pointer}: {msg}")),
        Manifest(m) => MainError::Validation(format!("manifest: {m}")),
        Invalid(m) => MainError::Config(m),
        Path(m) => MainError::Io(format!("path: {m}")),
        Limit(m) => MainError::Io(format!("limit: {m}")),
        Hash(m) => MainError::Io(format!("hash: {m}")),
    }
}

// ---------- loading ----------

fn load(args: &Args) -> Result<LoadedInputs, MainError> {
    let mut loaded = match (&args.manifest, &args.matrix, &args.weights) {
        (Some(manifest), _, _) => loader::load_inputs_from_manifest(manifest),
        (None, Some(matrix), Some(weights)) => {
            loader::load_inputs(matrix, weights, args.params.as_deref())
        }
        _ => return Err(MainError::Validation("no inputs given".into())),
    }
    .map_err(map_io_err)?;

    if let Some(s) = args.strategy {
        loaded.params.strategy = s;
    }
    if let Some(d) = args.default_score {
        loaded.params.default_score = d;
    }
    if args.clamp_outliers {
        loaded.params.clamp_outliers = true;
    }
    if let Some(d) = &args.directive {
        loaded.params.indicators = Some(d.indicators.clone());
    }
    loaded
        .params
        .validate_domains()
        .map_err(|e| MainError::Config(e.to_string()))?;

    if loaded.null_cells > 0 {
        warn!(cells = loaded.null_cells, "matrix carries null cells; treated as missing");
    }
    info!(
        regions = loaded.matrix.region_count(),
        indicators = loaded.matrix.indicators().len(),
        strategy = %loaded.params.strategy,
        "inputs loaded"
    );
    Ok(loaded)
}

/// The step directive in effect: the CLI flag wins over the manifest's.
fn effective_directive(args: &Args) -> Result<Option<TopsisDirective>, MainError> {
    if let Some(d) = &args.directive {
        return Ok(Some(d.clone()));
    }
    match &args.manifest {
        Some(path) => {
            let man = dr_io::manifest::load_manifest(path).map_err(map_io_err)?;
            man.directive
                .map(|text| text.parse().map_err(|e| MainError::Config(format!("{e}"))))
                .transpose()
        }
        None => Ok(None),
    }
}

fn selected_matrix(loaded: &LoadedInputs) -> IndicatorMatrix {
    match &loaded.params.indicators {
        Some(codes) => loaded.matrix.select(codes),
        None => loaded.matrix.clone(),
    }
}

// ---------- modes ----------

fn validate_only(args: &Args) -> Result<(), MainError> {
    let loaded = load(args)?;
    let matrix = selected_matrix(&loaded);
    let report = validate_with(&matrix, &loaded.params).merge(validate_weights(&matrix, &loaded.weights));
    write_json(&args.out, "validation.json", &report)?;

    let errors = report.errors().count();
    if errors > 0 {
        return Err(MainError::Validation(format!("{errors} error(s); see validation.json")));
    }
    info!(warnings = report.warnings().count(), "validate-only: inputs OK");
    Ok(())
}

fn diagnose_only(args: &Args) -> Result<(), MainError> {
    let loaded = load(args)?;
    let report = diagnose(&selected_matrix(&loaded), &loaded.weights, &loaded.params);
    write_json(&args.out, "diagnosis.json", &report)?;

    if report.healthy {
        info!(issues = report.issues.len(), "diagnosis: healthy");
        Ok(())
    } else {
        Err(MainError::Validation(format!(
            "{} error(s); see diagnosis.json",
            report.errors().count()
        )))
    }
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let loaded = load(args)?;
    let directive = effective_directive(args)?;

    let outcome = if args.repair {
        evaluate_with_repair(&loaded.matrix, &loaded.weights, &loaded.params)
    } else {
        evaluate(&loaded.matrix, &loaded.weights, &loaded.params)
    };
    let eval = outcome.map_err(|e| surface_pipeline_error(e, &args.out))?;

    let doc = build_evaluation_doc(&eval, Some(&loaded.digests))
        .map_err(|e| MainError::Io(e.to_string()))?;
    write_json(&args.out, "evaluation.json", &doc)?;
    if let Some(d) = &directive {
        write_json(&args.out, "step_output.json", &step_output(&eval, d))?;
    }

    maybe_render_reports(args, &doc)?;
    info!(id = %doc.id, out = %args.out.display(), "artifacts written");
    Ok(())
}

/// Write the issue list a failed run carries, then classify the failure.
fn surface_pipeline_error(e: PipelineError, out: &Path) -> MainError {
    match e {
        PipelineError::Rejected(report) => {
            let n = report.errors().count();
            match write_json(out, "validation.json", &report) {
                Ok(()) => MainError::Validation(format!("{n} error(s); see validation.json")),
                Err(io) => io,
            }
        }
        PipelineError::Unresolved(issues) => {
            let n = issues.len();
            match write_json(out, "unresolved.json", &issues) {
                Ok(()) => MainError::Unresolved(format!("{n} issue(s); see unresolved.json")),
                Err(io) => io,
            }
        }
        PipelineError::Configuration(m) => MainError::Config(m),
        PipelineError::Io(m) | PipelineError::Build(m) => MainError::Io(m),
    }
}

/// The distance a TOPSIS step publishes, per region.
fn step_output(eval: &Evaluation, directive: &TopsisDirective) -> serde_json::Value {
    let values: serde_json::Map<String, serde_json::Value> = eval
        .regions
        .iter()
        .map(|(region, r)| {
            let d = match directive.output {
                DistanceOutput::Positive => r.distance.positive_distance,
                DistanceOutput::Negative => r.distance.negative_distance,
            };
            (region.to_string(), json!(d))
        })
        .collect();
    json!({
        "directive": directive.to_string(),
        "output": directive.output.as_str(),
        "values": values,
    })
}

// ---------- artifacts ----------

fn write_json<T: Serialize>(out_dir: &Path, name: &str, value: &T) -> Result<(), MainError> {
    fs::create_dir_all(out_dir)
        .map_err(|e| MainError::Io(format!("mkdir {}: {e}", out_dir.display())))?;
    canonical_json::write_canonical_file(&out_dir.join(name), value)
        .map_err(|e| MainError::Io(format!("write {name}: {e}")))
}

fn maybe_render_reports(args: &Args, doc: &EvaluationDoc) -> Result<(), MainError> {
    if args.render.is_empty() {
        return Ok(());
    }
    let model = dr_report::build_model(doc).map_err(|e| MainError::Render(e.to_string()))?;
    for fmt in &args.render {
        let (name, text) = match fmt.as_str() {
            "json" => (
                "report.json",
                dr_report::render_json_string(&model).map_err(|e| MainError::Render(e.to_string()))?,
            ),
            "html" => ("report.html", dr_report::render_html(&model, &args.lang)),
            other => return Err(MainError::Render(format!("unknown renderer: {other}"))),
        };
        canonical_json::write_atomic(&args.out.join(name), text.as_bytes())
            .map_err(|e| MainError::Io(format!("write {name}: {e}")))?;
    }
    Ok(())
}
