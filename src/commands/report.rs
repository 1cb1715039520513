//! Report command implementation.
//!
//! The report command:
//! 1. Opens the sample source and symbol backend
//! 2. Starts a reader thread that filters samples into a bounded queue
//! 3. Starts producer threads that drain the queue into the aggregation table
//! 4. On every tick, prints the top stacks (or folded stacks) and resets
//! 5. Writes the last report as JSON and SVG when requested

use crate::aggregator::{AggregationTable, ProcessStack};
use crate::capture::{ProcessFilter, ReplaySource, Sample, SampleFilter, SampleSource};
use crate::output::{
    build_dump, render_flamegraph, render_folded, render_ranked, write_dump, write_svg,
    FlamegraphConfig,
};
use crate::symbols::{HexResolver, SymbolMap, SymbolResolver};
use crate::utils::config::{
    CLEAR_SCREEN, DEFAULT_PRODUCER_THREADS, DEFAULT_TOP_STACKS, MAX_REPORT_INTERVAL,
    MAX_TOP_STACKS, SAMPLE_QUEUE_CAPACITY,
};
use crate::utils::error::SampleError;
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, never, select, tick, Sender};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Arguments for the report command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReportArgs {
    /// Recorded sample stream, `-` for stdin
    pub input: PathBuf,

    /// Emit folded stacks instead of the ranked report
    pub folded: bool,

    /// Stacks per ranked report
    pub top: usize,

    /// Minimum count for a stack to be reported
    pub min_samples: u64,

    /// Seconds between reports, 0 for a single report when input ends
    pub interval_secs: f64,

    /// Reports before quitting, 0 for no limit
    pub count: usize,

    /// Clear the screen before each ranked report
    pub clear: bool,

    /// Keep kernel frames in stacks
    pub include_kernel: bool,

    /// Which processes to record
    pub process: ProcessFilter,

    /// JSON symbol map (optional)
    pub symbols: Option<PathBuf>,

    /// Producer threads feeding the table
    pub threads: usize,

    /// Output path for the last report's JSON dump (optional)
    pub output_json: Option<PathBuf>,

    /// Output path for the last report's SVG flame graph (optional)
    pub output_svg: Option<PathBuf>,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("-"),
            folded: false,
            top: DEFAULT_TOP_STACKS,
            min_samples: 0,
            interval_secs: 0.0,
            count: 0,
            clear: false,
            include_kernel: false,
            process: ProcessFilter::All,
            symbols: None,
            threads: DEFAULT_PRODUCER_THREADS,
            output_json: None,
            output_svg: None,
        }
    }
}

impl ReportArgs {
    /// Report cadence; zero means "once, when input ends"
    fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

/// What a report run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Reports printed
    pub reports: usize,

    /// Samples read from the source
    pub samples_read: u64,

    /// Samples dropped by the process or kernel filter
    pub samples_filtered: u64,

    /// Lines that could not be parsed
    pub samples_malformed: u64,

    /// False when the run stopped on `count` before the source ended
    pub input_exhausted: bool,
}

/// Reader counters, shared so they can be read however the run ends
#[derive(Debug, Default)]
struct ReaderStats {
    read: AtomicU64,
    filtered: AtomicU64,
    malformed: AtomicU64,
}

/// Validate report arguments
///
/// **Public** - can be called before execute_report for early validation
pub fn validate_args(args: &ReportArgs) -> Result<()> {
    if args.top == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.top > MAX_TOP_STACKS {
        anyhow::bail!("top is too large (max {})", MAX_TOP_STACKS);
    }

    if !args.interval_secs.is_finite() || args.interval_secs < 0.0 {
        anyhow::bail!("interval must be a non-negative number of seconds");
    }

    if args.interval_secs > MAX_REPORT_INTERVAL.as_secs_f64() {
        anyhow::bail!(
            "interval is too large (max {}s)",
            MAX_REPORT_INTERVAL.as_secs()
        );
    }

    if args.threads == 0 {
        anyhow::bail!("threads must be greater than 0");
    }

    if args.input.as_os_str().is_empty() {
        anyhow::bail!("input path cannot be empty");
    }

    if let ProcessFilter::Name(name) = &args.process {
        if name.is_empty() {
            anyhow::bail!("process name cannot be empty");
        }
    }

    Ok(())
}

/// Execute the report command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Invalid arguments
/// * Symbol map or input cannot be opened
/// * Output files cannot be written
pub fn execute_report(args: ReportArgs) -> Result<ReportSummary> {
    validate_args(&args)?;

    let resolver: Arc<dyn SymbolResolver> = match &args.symbols {
        Some(path) => Arc::new(
            SymbolMap::load(path)
                .with_context(|| format!("Failed to load symbol map {}", path.display()))?,
        ),
        None => Arc::new(HexResolver),
    };

    let source = ReplaySource::open(&args.input)
        .with_context(|| format!("Failed to open sample input {}", args.input.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    run_report(&args, Box::new(source), resolver, &mut out)
}

/// Run the sampling and reporting loop against any source and writer
///
/// **Public** - used by execute_report and integration tests
pub fn run_report<W: Write>(
    args: &ReportArgs,
    mut source: Box<dyn SampleSource>,
    resolver: Arc<dyn SymbolResolver>,
    out: &mut W,
) -> Result<ReportSummary> {
    validate_args(args)?;

    let start_time = Instant::now();
    let table = Arc::new(AggregationTable::new());
    let stop = Arc::new(AtomicBool::new(false));

    let (sample_tx, sample_rx) = bounded::<Sample>(SAMPLE_QUEUE_CAPACITY);
    // Never sent on; disconnects once every producer has exited.
    let (finished_tx, finished_rx) = bounded::<()>(0);

    let mut filter = SampleFilter::new(
        args.process.clone(),
        args.include_kernel,
        Arc::clone(&resolver),
    );
    let stats = Arc::new(ReaderStats::default());
    let reader_stop = Arc::clone(&stop);
    let reader_stats = Arc::clone(&stats);
    let reader = thread::Builder::new()
        .name("sample-reader".to_string())
        .spawn(move || {
            read_samples(
                &mut *source,
                &mut filter,
                &sample_tx,
                &reader_stop,
                &reader_stats,
            )
        })
        .context("Failed to start sample reader")?;

    let mut producers = Vec::with_capacity(args.threads);
    for index in 0..args.threads {
        let table = Arc::clone(&table);
        let samples = sample_rx.clone();
        let finished = finished_tx.clone();

        let handle = thread::Builder::new()
            .name(format!("producer-{}", index))
            .spawn(move || {
                for sample in samples.iter() {
                    table.record(sample.process_id, &sample.addresses);
                }
                drop(finished);
            })
            .context("Failed to start producer thread")?;
        producers.push(handle);
    }
    drop(sample_rx);
    drop(finished_tx);

    info!(
        "Sampling with {} producer threads, interval {:.2}s",
        args.threads, args.interval_secs
    );

    let interval = args.interval();
    let ticker = if interval.is_zero() {
        never()
    } else {
        tick(interval)
    };

    let wants_snapshot = args.output_json.is_some() || args.output_svg.is_some();
    let mut last_snapshot: Option<HashMap<i32, Vec<ProcessStack>>> = None;
    let mut reports = 0usize;

    let input_exhausted = loop {
        select! {
            recv(ticker) -> _ => {
                let snapshot = emit_report(args, &table, resolver.as_ref(), out, wants_snapshot)?;
                last_snapshot = snapshot.or(last_snapshot);
                reports += 1;

                if args.count > 0 && reports >= args.count {
                    debug!("Reached report count {}, stopping", args.count);
                    stop.store(true, Ordering::Relaxed);
                    break false;
                }
            }
            recv(finished_rx) -> _ => {
                if reports == 0 || !table.is_empty() {
                    let snapshot = emit_report(args, &table, resolver.as_ref(), out, wants_snapshot)?;
                    last_snapshot = snapshot.or(last_snapshot);
                    reports += 1;
                }
                break true;
            }
        }
    };

    // After a count stop the reader may be parked on a blocking read; it sees
    // the stop flag on its next sample and the producers follow once it exits.
    if input_exhausted {
        for producer in producers {
            if producer.join().is_err() {
                warn!("Producer thread panicked");
            }
        }
        if reader.join().is_err() {
            warn!("Sample reader panicked");
        }
    }

    if let Some(snapshot) = last_snapshot {
        write_outputs(args, snapshot, resolver.as_ref())?;
    }

    let summary = ReportSummary {
        reports,
        samples_read: stats.read.load(Ordering::Relaxed),
        samples_filtered: stats.filtered.load(Ordering::Relaxed),
        samples_malformed: stats.malformed.load(Ordering::Relaxed),
        input_exhausted,
    };

    info!(
        "Report run finished in {:.2}s: {} reports, {} samples read, {} filtered, {} malformed",
        start_time.elapsed().as_secs_f64(),
        summary.reports,
        summary.samples_read,
        summary.samples_filtered,
        summary.samples_malformed
    );

    Ok(summary)
}

/// Pull samples from the source, filter them, and queue them for producers
///
/// **Private** - body of the reader thread
fn read_samples(
    source: &mut dyn SampleSource,
    filter: &mut SampleFilter,
    samples: &Sender<Sample>,
    stop: &AtomicBool,
    stats: &ReaderStats,
) {
    while !stop.load(Ordering::Relaxed) {
        match source.next_sample() {
            Ok(Some(sample)) => {
                stats.read.fetch_add(1, Ordering::Relaxed);
                match filter.apply(sample) {
                    Some(sample) => {
                        if samples.send(sample).is_err() {
                            break;
                        }
                    }
                    None => {
                        stats.filtered.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            Ok(None) => break,
            Err(SampleError::IoError(err)) => {
                warn!("Sample input failed: {}", err);
                break;
            }
            Err(err) => {
                stats.malformed.fetch_add(1, Ordering::Relaxed);
                warn!("Skipping sample: {}", err);
            }
        }
    }

    debug!(
        "Sample reader done: {} read, {} filtered, {} malformed",
        stats.read.load(Ordering::Relaxed),
        stats.filtered.load(Ordering::Relaxed),
        stats.malformed.load(Ordering::Relaxed)
    );
}

/// Print one report and reset the table
///
/// **Private** - called on every tick and once when input ends
///
/// Ranked reports get a timestamp header and a timing footer. Folded reports
/// are only stack lines; their timing goes to the debug log.
///
/// # Returns
/// The full per-process view taken before the reset, when outputs need it
fn emit_report<W: Write>(
    args: &ReportArgs,
    table: &AggregationTable,
    resolver: &dyn SymbolResolver,
    out: &mut W,
    wants_snapshot: bool,
) -> Result<Option<HashMap<i32, Vec<ProcessStack>>>> {
    let started = Instant::now();

    let snapshot = if args.folded || wants_snapshot {
        Some(table.all_by_process())
    } else {
        None
    };

    match &snapshot {
        // Folded output feeds flame graph tools, so it carries stack lines only
        Some(by_process) if args.folded => {
            let lines = render_folded(by_process, resolver, args.min_samples);
            for line in &lines {
                writeln!(out, "{}", line)?;
            }
            table.reset();
            debug!(
                "Folded report: {} stacks in {}ms",
                lines.len(),
                started.elapsed().as_millis()
            );
        }
        _ => {
            if args.clear {
                write!(out, "{}", CLEAR_SCREEN)?;
            }
            writeln!(out, "{}", chrono::Local::now().format("%H:%M:%S"))?;

            let stacks = table.top_stacks(args.top, args.min_samples);
            write!(out, "{}", render_ranked(&stacks, resolver))?;
            table.reset();

            writeln!(
                out,
                "  Time aggregating/resolving: {}ms",
                started.elapsed().as_millis()
            )?;
        }
    }
    out.flush()?;

    Ok(snapshot.filter(|_| wants_snapshot))
}

/// Write the JSON dump and flame graph of the last report
fn write_outputs(
    args: &ReportArgs,
    snapshot: HashMap<i32, Vec<ProcessStack>>,
    resolver: &dyn SymbolResolver,
) -> Result<()> {
    if let Some(svg_path) = &args.output_svg {
        let folded = render_folded(&snapshot, resolver, args.min_samples);
        if folded.is_empty() {
            warn!("No stacks to draw, skipping flamegraph");
        } else {
            let svg = render_flamegraph(&folded, &FlamegraphConfig::new())
                .context("Failed to generate flamegraph")?;
            write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
            info!("✓ Flamegraph written to: {}", svg_path.display());
        }
    }

    if let Some(json_path) = &args.output_json {
        let dump = build_dump(snapshot, resolver);
        write_dump(&dump, json_path).context("Failed to write stack dump JSON")?;
        info!("✓ Stack dump written to: {}", json_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_default() {
        assert!(validate_args(&ReportArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_top_zero() {
        let args = ReportArgs {
            top: 0,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_too_large() {
        let args = ReportArgs {
            top: MAX_TOP_STACKS + 1,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_negative_interval() {
        let args = ReportArgs {
            interval_secs: -1.0,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_nan_interval() {
        let args = ReportArgs {
            interval_secs: f64::NAN,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_zero_threads() {
        let args = ReportArgs {
            threads: 0,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_empty_process_name() {
        let args = ReportArgs {
            process: ProcessFilter::Name(String::new()),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_interval_conversion() {
        let args = ReportArgs {
            interval_secs: 1.5,
            ..Default::default()
        };
        assert_eq!(args.interval(), Duration::from_millis(1500));
    }
}
