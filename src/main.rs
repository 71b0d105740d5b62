//! CLI entry point for peakanno.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::info;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use peakanno::annotator::{annotate_peak, PeakAnnotation};
use peakanno::config::AnnotationConfig;
use peakanno::index::GtfIndex;
use peakanno::output::{format_record, write_header};
use peakanno::parser::PeakReader;
use peakanno::types::Peak;

/// Genomic peak annotation tool.
///
/// Annotates peaks from a BED file with nearby features from a GTF file,
/// according to an ordered set of matching queries.
#[derive(Parser, Debug)]
#[command(name = "peakanno")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// GTF annotation file (required)
    #[arg(short = 'g', long = "gtf")]
    gtf: PathBuf,

    /// Peak BED file (required)
    #[arg(short = 'b', long = "bed")]
    bed: PathBuf,

    /// Query configuration JSON file (required)
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Output prefix; writes <prefix>_allhits.txt and <prefix>_finalhits.txt
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Number of worker threads (0 = auto-detect, 1 = sequential)
    #[arg(long = "threads", short = 'j', default_value = "8")]
    threads: usize,

    /// Batch size for streaming BED peaks
    #[arg(long = "batch-size", default_value = "5000")]
    batch_size: usize,
}

impl Args {
    fn allhits_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_allhits.txt", self.output.display()))
    }

    fn finalhits_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_finalhits.txt", self.output.display()))
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    // Validate inputs
    if !args.gtf.exists() {
        bail!("GTF file not found: {}", args.gtf.display());
    }
    if !args.bed.exists() {
        bail!("BED file not found: {}", args.bed.display());
    }
    if !args.config.exists() {
        bail!("Config file not found: {}", args.config.display());
    }
    if args.batch_size == 0 {
        bail!("Batch size must be greater than 0");
    }

    // Load and validate queries before touching any peak
    let config = AnnotationConfig::from_file(&args.config)?;
    info!(
        "Loaded {} quer{} (priority={})",
        config.queries.len(),
        if config.queries.len() == 1 { "y" } else { "ies" },
        config.priority
    );

    // Build the feature index
    info!("Parsing GTF file: {}", args.gtf.display());
    let index = GtfIndex::from_gtf(&args.gtf)?;
    info!(
        "Indexed {} features on {} chromosomes",
        index.num_features(),
        index.num_chromosomes()
    );

    // Determine thread count
    let num_threads = if args.threads == 0 {
        num_cpus::get()
    } else {
        args.threads
    };

    if num_threads == 1 {
        run_sequential(&args, &index, &config)?;
    } else {
        run_parallel(&args, index, &config, num_threads)?;
    }

    info!("Done!");
    Ok(())
}

/// Write one peak's records to both output streams.
fn write_annotation<W: Write>(
    all_writer: &mut W,
    final_writer: &mut W,
    annotation: &PeakAnnotation,
    show_attributes: &[String],
) -> Result<()> {
    for record in &annotation.records {
        let line = format_record(record, show_attributes);
        writeln!(all_writer, "{}", line)?;
        if record.best_hit {
            writeln!(final_writer, "{}", line)?;
        }
    }
    Ok(())
}

/// Sequential implementation with streaming.
fn run_sequential(args: &Args, index: &GtfIndex, config: &AnnotationConfig) -> Result<()> {
    info!("Processing BED file: {}", args.bed.display());
    let mut reader = PeakReader::new(&args.bed)?;

    let all_file =
        File::create(args.allhits_path()).context("Failed to create allhits output file")?;
    let final_file =
        File::create(args.finalhits_path()).context("Failed to create finalhits output file")?;
    let mut all_writer = BufWriter::new(all_file);
    let mut final_writer = BufWriter::new(final_file);

    write_header(&mut all_writer, &config.show_attributes)?;
    write_header(&mut final_writer, &config.show_attributes)?;

    while let Some(chunk) = reader.read_chunk(args.batch_size)? {
        for peak in &chunk {
            let annotation = annotate_peak(peak, config, index);
            write_annotation(
                &mut all_writer,
                &mut final_writer,
                &annotation,
                &config.show_attributes,
            )?;
        }
    }

    all_writer.flush()?;
    final_writer.flush()?;
    Ok(())
}

/// Work item for the parallel pipeline.
struct WorkItem {
    /// Sequence number for ordering (file order).
    seq_id: u64,
    /// Peaks to annotate, in file order.
    peaks: Vec<Peak>,
}

/// Result from processing a work item.
struct WorkResult {
    /// Sequence number matching the input WorkItem.
    seq_id: u64,
    /// One annotation per input peak, in the same order.
    annotations: Vec<PeakAnnotation>,
}

/// Parallel implementation with streaming.
///
/// Peaks are independent units of work: chunks flow through a bounded
/// channel to a rayon worker pool, and a dedicated writer thread restores
/// original file order before emitting any line.
fn run_parallel(
    args: &Args,
    index: GtfIndex,
    config: &AnnotationConfig,
    num_threads: usize,
) -> Result<()> {
    info!("Using parallel mode with {} threads", num_threads);

    let (work_tx, work_rx): (Sender<WorkItem>, Receiver<WorkItem>) = bounded(100);
    let (result_tx, result_rx): (Sender<WorkResult>, Receiver<WorkResult>) = bounded(2000);

    // Shared read-only state for workers
    let index_arc = Arc::new(index);
    let config_arc = Arc::new(config.clone());

    // Spawn writer thread
    let all_path = args.allhits_path();
    let final_path = args.finalhits_path();
    let writer_handle = thread::spawn({
        let config = Arc::clone(&config_arc);
        move || -> Result<usize> {
            write_results_ordered(&all_path, &final_path, result_rx, &config)
        }
    });

    // Spawn worker threads using rayon's thread pool
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to create thread pool")?;

    let index_for_workers = Arc::clone(&index_arc);
    let config_for_workers = Arc::clone(&config_arc);
    let work_rx_for_workers = work_rx.clone();
    let result_tx_for_workers = result_tx.clone();

    let workers_handle = thread::spawn(move || {
        pool.scope(|s| {
            for _ in 0..num_threads {
                let work_rx = work_rx_for_workers.clone();
                let result_tx = result_tx_for_workers.clone();
                let index = Arc::clone(&index_for_workers);
                let config = Arc::clone(&config_for_workers);

                s.spawn(move |_| {
                    worker_loop(work_rx, result_tx, index, config);
                });
            }
        });
    });

    // Producer: read BED in chunks
    info!("Processing BED file: {}", args.bed.display());
    let mut reader = PeakReader::new(&args.bed)?;

    let mut seq_id = 0;
    while let Some(chunk) = reader.read_chunk(args.batch_size)? {
        let work_item = WorkItem {
            seq_id,
            peaks: chunk,
        };
        if work_tx.send(work_item).is_err() {
            break;
        }
        seq_id += 1;
    }

    // Close work channel to signal workers to exit
    drop(work_tx);

    workers_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Worker thread panicked"))?;

    // Close result channel to signal writer to finish
    drop(result_tx);

    let peaks_written = writer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Writer thread panicked"))??;

    info!("Annotated {} peaks", peaks_written);
    Ok(())
}

/// Worker loop: receives work items and sends results.
fn worker_loop(
    work_rx: Receiver<WorkItem>,
    result_tx: Sender<WorkResult>,
    index: Arc<GtfIndex>,
    config: Arc<AnnotationConfig>,
) {
    while let Ok(work_item) = work_rx.recv() {
        let annotations = work_item
            .peaks
            .iter()
            .map(|peak| annotate_peak(peak, &config, index.as_ref()))
            .collect();

        let result = WorkResult {
            seq_id: work_item.seq_id,
            annotations,
        };
        if result_tx.send(result).is_err() {
            break;
        }
    }
}

/// Write results in order, buffering out-of-order results.
fn write_results_ordered(
    all_path: &PathBuf,
    final_path: &PathBuf,
    result_rx: Receiver<WorkResult>,
    config: &AnnotationConfig,
) -> Result<usize> {
    let all_file = File::create(all_path).context("Failed to create allhits output file")?;
    let final_file = File::create(final_path).context("Failed to create finalhits output file")?;
    let mut all_writer = BufWriter::new(all_file);
    let mut final_writer = BufWriter::new(final_file);

    write_header(&mut all_writer, &config.show_attributes)?;
    write_header(&mut final_writer, &config.show_attributes)?;

    let mut pending: BTreeMap<u64, WorkResult> = BTreeMap::new();
    let mut next_expected: u64 = 0;
    let mut peaks_written: usize = 0;

    for result in result_rx {
        pending.insert(result.seq_id, result);

        // Write all ready consecutive results
        while let Some(r) = pending.remove(&next_expected) {
            for annotation in &r.annotations {
                write_annotation(
                    &mut all_writer,
                    &mut final_writer,
                    annotation,
                    &config.show_attributes,
                )?;
                peaks_written += 1;
            }
            next_expected += 1;
        }
    }

    all_writer.flush()?;
    final_writer.flush()?;
    Ok(peaks_written)
}
