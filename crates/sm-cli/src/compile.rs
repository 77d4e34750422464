use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{log_enabled, trace, Level};

use sm_compiler::{build_signature_set, optimize_signatures, parse_signature_list, CompileOptions, SignatureSet};

#[derive(Debug, Clone)]
pub struct CompileStats {
    pub lines: usize,
    pub signatures_before: usize,
    pub signatures_after: usize,
    pub deduped: usize,
    pub parse_ms: f64,
    pub build_ms: f64,
    pub total_ms: f64,
}

/// Parse every list, de-duplicate and build one signature set.
pub fn compile_set(
    inputs: &[String],
    options: &CompileOptions,
    verbose: bool,
) -> Result<(SignatureSet, CompileStats), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let start = Instant::now();
    let mut all_signatures = Vec::new();
    let mut lines = 0usize;

    for (list_id, path) in inputs.iter().enumerate() {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        let line_count = content.lines().count();
        lines += line_count;

        let signatures = parse_signature_list(&content);
        if verbose {
            println!(
                "  [{}] {} - {} lines, {} signatures",
                list_id,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                line_count,
                signatures.len()
            );
        }
        all_signatures.extend(signatures);
    }

    let optimize_stats = optimize_signatures(&mut all_signatures);
    let parse_time = start.elapsed();

    let build_start = Instant::now();
    let set = build_signature_set(&all_signatures, options)
        .map_err(|e| format!("Failed to build signature set: {}", e))?;
    let build_time = build_start.elapsed();

    if log_enabled!(Level::Trace) {
        trace!("Network tree:\n{}", set.networks().dump());
    }

    let stats = CompileStats {
        lines,
        signatures_before: optimize_stats.before,
        signatures_after: optimize_stats.after,
        deduped: optimize_stats.deduped,
        parse_ms: parse_time.as_secs_f64() * 1000.0,
        build_ms: build_time.as_secs_f64() * 1000.0,
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    Ok((set, stats))
}

pub fn read_data(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}
