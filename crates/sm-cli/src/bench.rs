use std::cmp::Ordering;
use std::time::Instant;

use sm_compiler::SignatureSet;

pub struct BenchOptions {
    pub iterations: usize,
    pub chunk_size: usize,
}

struct BenchResult {
    iterations: usize,
    bytes: usize,
    hits: u64,
    total_ms: f64,
    avg_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    mb_per_sec: f64,
}

/// Stream `data` through the set `iterations` times and print latency stats.
pub fn run(set: &SignatureSet, data: &[u8], opts: &BenchOptions) -> Result<(), String> {
    if opts.chunk_size == 0 {
        return Err("chunk size must be greater than zero".to_string());
    }

    warmup(set, data, opts.chunk_size)?;
    let result = run_benchmark(set, data, opts)?;
    println!("{}", format_result(&result));
    Ok(())
}

fn scan_once(set: &SignatureSet, data: &[u8], chunk_size: usize) -> Result<u64, String> {
    let flags = set.consume_flags();
    let mut ctx = set.scanner();
    for chunk in data.chunks(chunk_size) {
        ctx.consume(chunk, flags)
            .map_err(|e| format!("Scan failed: {}", e))?;
        ctx.drain_matches().for_each(drop);
    }
    Ok(ctx.match_count())
}

fn warmup(set: &SignatureSet, data: &[u8], chunk_size: usize) -> Result<(), String> {
    for _ in 0..3 {
        scan_once(set, data, chunk_size)?;
    }
    Ok(())
}

fn run_benchmark(set: &SignatureSet, data: &[u8], opts: &BenchOptions) -> Result<BenchResult, String> {
    let iterations = opts.iterations.max(1);
    let mut latencies = Vec::with_capacity(iterations);
    let mut hits = 0u64;

    for _ in 0..iterations {
        let start = Instant::now();
        hits = scan_once(set, data, opts.chunk_size)?;
        latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let total_us = latencies.iter().sum::<f64>();
    let total_ms = total_us / 1000.0;
    let total_bytes = data.len() * iterations;

    Ok(BenchResult {
        iterations,
        bytes: data.len(),
        hits,
        total_ms,
        avg_us: total_us / iterations as f64,
        p50_us: percentile(&latencies, 0.50),
        p95_us: percentile(&latencies, 0.95),
        p99_us: percentile(&latencies, 0.99),
        mb_per_sec: if total_us > 0.0 {
            total_bytes as f64 / total_us
        } else {
            0.0
        },
    })
}

fn format_result(result: &BenchResult) -> String {
    format!(
        "Scan:\n  Iterations: {}\n  Input:      {} bytes\n  Hits/scan:  {}\n  Total time: {:.2}ms\n  Avg scan:   {:.2}μs\n  P50 scan:   {:.2}μs\n  P95 scan:   {:.2}μs\n  P99 scan:   {:.2}μs\n  Throughput: {:.1} MB/s",
        result.iterations,
        result.bytes,
        result.hits,
        result.total_ms,
        result.avg_us,
        result.p50_us,
        result.p95_us,
        result.p99_us,
        result.mb_per_sec,
    )
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}
