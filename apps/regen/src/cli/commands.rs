//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::PlanFormat;
use crate::config::RegenConfig;
use regen_core::primitives::MAX_PLAN_PAYLOAD_SIZE;
use regen_core::{
    Diagnostic, PlanHeader, RawRegistry, RegenError, Session, plan_checksum, plan_digest,
    plan_from_bytes, plan_to_bytes,
};
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum registry file size (256 MB).
const MAX_REGISTRY_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Configuration file looked up when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "regen.toml";

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), RegenError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RegenError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(RegenError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, RegenError> {
    let canonical = path.canonicalize().map_err(|e| {
        RegenError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(RegenError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, RegenError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        RegenError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(RegenError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| RegenError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RegenError> {
    serde_json::to_string_pretty(value).map_err(|e| RegenError::SerializationError(e.to_string()))
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Configuration and registry location of one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: RegenConfig,
    pub registry: PathBuf,
}

impl Settings {
    /// Combine the config file (explicit, or `regen.toml` if present) with
    /// the `--registry` override.
    pub fn resolve(config: Option<&Path>, registry: Option<&Path>) -> Result<Self, RegenError> {
        let config = match config {
            Some(path) => RegenConfig::load(&validate_file_path(path)?)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                RegenConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => RegenConfig::default(),
        };
        let registry = registry
            .map(Path::to_path_buf)
            .or_else(|| config.registry.clone())
            .ok_or_else(|| {
                RegenError::IoError(
                    "No registry given: pass --registry or set `registry` in regen.toml"
                        .to_string(),
                )
            })?;
        Ok(Self { config, registry })
    }

    /// Load the registry and apply the configured selection.
    pub fn session(&self) -> Result<Session, RegenError> {
        let path = validate_file_path(&self.registry)?;
        validate_file_size(&path, MAX_REGISTRY_FILE_SIZE)?;
        let data = std::fs::read(&path)
            .map_err(|e| RegenError::IoError(format!("Read registry: {}", e)))?;
        let raw: RawRegistry = serde_json::from_slice(&data)
            .map_err(|e| RegenError::DeserializationError(format!("Registry JSON: {}", e)))?;

        let mut session = Session::load(&raw, self.config.naming.clone())?;
        if self.config.selection.include.is_empty() && self.config.selection.exclude.is_empty() {
            tracing::warn!("empty selection: only the forced roots are enabled");
        }
        session.select(&self.config.selection)?;
        Ok(session)
    }
}

// =============================================================================
// PLAN COMMAND
// =============================================================================

/// Run the pipeline and write the plan.
pub fn cmd_plan(
    settings: &Settings,
    output: Option<&Path>,
    format: PlanFormat,
) -> Result<(), RegenError> {
    if output.is_none() && format == PlanFormat::Binary {
        return Err(RegenError::IoError(
            "Binary plans need an output file (-o)".to_string(),
        ));
    }
    let validated_output = output.map(validate_output_path).transpose()?;

    let mut session = settings.session()?;
    let plan = session.plan(&settings.config.contexts())?;

    let data = match format {
        PlanFormat::Json => to_json(&plan)?.into_bytes(),
        PlanFormat::Binary => plan_to_bytes(&plan)?,
    };

    match validated_output {
        Some(path) => {
            std::fs::write(&path, &data)
                .map_err(|e| RegenError::IoError(format!("Write file: {}", e)))?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
            println!("Checksum: {:016x}", plan_checksum(&data));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&data)
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|e| RegenError::IoError(format!("Write stdout: {}", e)))?;
        }
    }

    tracing::info!(
        operations = plan.operations().count(),
        variants = plan.variant_count(),
        diagnostics = plan.diagnostics.len(),
        "plan written"
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show per-category enablement counts.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), RegenError> {
    let session = settings.session()?;
    let metrics = session.metrics();

    if json_mode {
        let output = serde_json::json!({
            "registry": settings.registry.to_string_lossy(),
            "api": session.naming().api,
            "metrics": metrics,
            "diagnostics": session.diagnostics().len(),
        });
        println!("{}", to_json(&output)?);
        return Ok(());
    }

    println!("Regen Registry Status");
    println!("=====================");
    println!("Registry: {:?}", settings.registry);
    println!("API:      {}", session.naming().api);
    println!();
    println!("{metrics}");
    println!();
    println!("Diagnostics: {}", session.diagnostics().len());

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Run the pipeline and list its diagnostics.
///
/// Returns `false` if a dependency cycle was found.
pub fn cmd_check(settings: &Settings, json_mode: bool) -> Result<bool, RegenError> {
    let mut session = settings.session()?;
    let plan = session.plan(&settings.config.contexts())?;
    let passed = !plan.diagnostics.has_cycles();

    if json_mode {
        let output = serde_json::json!({
            "passed": passed,
            "diagnostics": plan.diagnostics,
        });
        println!("{}", to_json(&output)?);
        return Ok(passed);
    }

    for diagnostic in plan.diagnostics.iter() {
        let marker = match diagnostic {
            Diagnostic::CycleDetected { .. } => "error",
            _ => "warning",
        };
        println!("{marker}: {diagnostic}");
    }
    println!();
    println!(
        "{} operations, {} variants, {} diagnostics: {}",
        plan.operations().count(),
        plan.variant_count(),
        plan.diagnostics.len(),
        if passed { "ok" } else { "FAILED" }
    );
    Ok(passed)
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Print the variants of one operation in one context.
///
/// Returns `false` if the operation cannot be resolved.
pub fn cmd_inspect(settings: &Settings, operation: &str, context: &str) -> Result<bool, RegenError> {
    let context = settings.config.context(context)?;
    let mut session = settings.session()?;
    session.bind_required()?;

    match session.resolve(operation, &context) {
        Ok(resolution) => {
            let output = serde_json::json!({
                "operation": operation,
                "context": context.name,
                "namespace": context.namespace(session.naming()),
                "variants": resolution.variants,
                "degraded": resolution.degraded,
            });
            println!("{}", to_json(&output)?);
            Ok(true)
        }
        Err(e) => {
            tracing::error!(operation, context = %context.name, "{}", e);
            Ok(false)
        }
    }
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Decode a binary plan and print its checksums.
pub fn cmd_verify(file: &Path, json_mode: bool) -> Result<(), RegenError> {
    let path = validate_file_path(file)?;
    validate_file_size(&path, MAX_PLAN_PAYLOAD_SIZE as u64)?;
    let data =
        std::fs::read(&path).map_err(|e| RegenError::IoError(format!("Read file: {}", e)))?;

    let header = PlanHeader::from_bytes(&data)?;
    let plan = plan_from_bytes(&data)?;
    let checksum = plan_checksum(&data);
    let digest = plan_digest(&data);

    if json_mode {
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "version": header.version,
            "api": plan.api,
            "contexts": plan.contexts,
            "operations": plan.operations().count(),
            "variants": plan.variant_count(),
            "checksum": format!("{checksum:016x}"),
            "blake3": digest,
        });
        println!("{}", to_json(&output)?);
        return Ok(());
    }

    println!("Plan OK: {:?}", path);
    println!("Format version: {}", header.version);
    println!("API:            {}", plan.api);
    println!("Contexts:       {}", plan.contexts.join(", "));
    println!("Operations:     {}", plan.operations().count());
    println!("Variants:       {}", plan.variant_count());
    println!("Checksum:       {:016x}", checksum);
    println!("BLAKE3:         {}", digest);

    Ok(())
}
