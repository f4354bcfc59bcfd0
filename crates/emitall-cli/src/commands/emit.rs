//! `emitall emit` command implementation.
//!
//! Loads a build manifest, applies config file and flag options, and runs the
//! emission pipeline against the disk (or memory for `--dry-run`).

use emitall_core::{
    load_config, DiskFileSystem, EmitAllOptions, EmitAllPlugin, EmitSummary, ManifestHost,
    MemoryFileSystem, OutputFileSystem, PathMapping,
};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Emit command action.
#[derive(Debug, Clone)]
pub struct EmitAction {
    /// Manifest path, relative to `cwd` unless absolute.
    pub manifest: PathBuf,
    /// Working directory; config discovery and relative flags start here.
    pub cwd: PathBuf,
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// Overrides the config's ignore pattern.
    pub ignore_pattern: Option<String>,
    /// Forces external modules to be skipped.
    pub ignore_externals: bool,
    /// Overrides the config's output path.
    pub out_dir: Option<PathBuf>,
    /// Write to memory instead of disk.
    pub dry_run: bool,
}

/// JSON output for the emit command.
#[derive(Serialize)]
struct EmitResultJson {
    ok: bool,
    manifest: String,
    dry_run: bool,
    written: Vec<PathMapping>,
    skipped: usize,
    assets: Vec<String>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<EmitErrorJson>,
}

#[derive(Serialize)]
struct EmitErrorJson {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

/// Run the emit command.
pub fn run(action: EmitAction, json: bool) -> Result<()> {
    let start = Instant::now();
    let manifest = resolve_manifest(&action);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = runtime.block_on(emit(&action, &manifest));
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(summary) => {
            if json {
                let out = EmitResultJson {
                    ok: true,
                    manifest: manifest.display().to_string(),
                    dry_run: action.dry_run,
                    written: summary.written,
                    skipped: summary.skipped,
                    assets: display_paths(&summary.assets),
                    duration_ms,
                    error: None,
                };
                println!("{}", serde_json::to_string(&out).into_diagnostic()?);
            } else {
                print_summary(&summary, action.dry_run, duration_ms);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let out = EmitResultJson {
                    ok: false,
                    manifest: manifest.display().to_string(),
                    dry_run: action.dry_run,
                    written: Vec::new(),
                    skipped: 0,
                    assets: Vec::new(),
                    duration_ms,
                    error: Some(EmitErrorJson {
                        code: e.code().to_string(),
                        message: e.to_string(),
                        path: e.path().map(|p| p.display().to_string()),
                    }),
                };
                println!("{}", serde_json::to_string(&out).into_diagnostic()?);
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}

async fn emit(action: &EmitAction, manifest: &std::path::Path) -> emitall_core::Result<EmitSummary> {
    let host = ManifestHost::load(manifest)?;
    let plugin = EmitAllPlugin::new(options(action)?);

    let fs: Arc<dyn OutputFileSystem> = if action.dry_run {
        Arc::new(MemoryFileSystem::new())
    } else {
        Arc::new(DiskFileSystem)
    };

    emitall_core::run(&plugin, &host, fs).await
}

/// Config file options with command-line overrides applied.
fn options(action: &EmitAction) -> emitall_core::Result<EmitAllOptions> {
    let mut options = load_config(&action.cwd, action.config.as_deref())?;

    if let Some(pattern) = &action.ignore_pattern {
        options = options.with_ignore_pattern(pattern)?;
    }
    if action.ignore_externals {
        options = options.with_ignore_externals(true);
    }
    if let Some(out_dir) = &action.out_dir {
        options = options.with_path(action.cwd.join(out_dir));
    }

    tracing::debug!(
        ignore_pattern = options.ignore_pattern.as_str(),
        ignore_externals = options.ignore_externals,
        path = ?options.path,
        "options"
    );
    Ok(options)
}

fn resolve_manifest(action: &EmitAction) -> PathBuf {
    let path = action.cwd.join(&action.manifest);
    dunce::canonicalize(&path).unwrap_or(path)
}

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

fn print_summary(summary: &EmitSummary, dry_run: bool, duration_ms: u64) {
    let verb = if dry_run { "would write" } else { "wrote" };
    for mapping in &summary.written {
        println!("  {verb} {}", mapping.absolute_output_path);
    }
    for asset in &summary.assets {
        println!("  {verb} {}", asset.display());
    }
    println!(
        "{} modules, {} skipped, {} stubs ({duration_ms}ms)",
        summary.written.len(),
        summary.skipped,
        summary.assets.len()
    );
}
