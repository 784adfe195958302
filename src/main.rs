use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use moving_object_detector::config::{ConfigHandle, ConfigWatcher, DetectorConfig};
use moving_object_detector::detection::MovingObjectDetector;
use moving_object_detector::io::{ResultExporter, Sequence};
use moving_object_detector::system::{DEFAULT_PREFETCH_CAPACITY, FramePrefetcher};
#[cfg(feature = "viz")]
use moving_object_detector::viz::RerunVisualizer;

#[derive(Parser)]
#[command(name = "moving-object-detector")]
#[command(about = "Detect moving objects from stereo disparity, optical flow and ego-motion")]
#[command(version)]
struct Args {
    /// Sequence directory with calibration.yaml and frames.csv
    sequence: PathBuf,

    /// Detector parameters (YAML). Reloaded when the file changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for per-frame CSV output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stream results to a Rerun viewer
    #[arg(long)]
    viz: bool,

    /// Frames decoded ahead of the detector
    #[arg(long, default_value_t = DEFAULT_PREFETCH_CAPACITY)]
    prefetch: usize,
}

fn main() -> Result<()> {
    // RUST_LOG overrides, e.g. RUST_LOG=moving_object_detector=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };
    info!("Detector config: {:?}", config);
    let handle = ConfigHandle::new(config);
    let mut watcher = args
        .config
        .clone()
        .map(|path| ConfigWatcher::new(path, handle.clone()));

    let sequence = Arc::new(Sequence::new(&args.sequence)?);
    let mut exporter = args.output.as_ref().map(ResultExporter::new).transpose()?;

    #[cfg(feature = "viz")]
    let mut viz = if args.viz {
        Some(RerunVisualizer::new("moving-object-detector")?)
    } else {
        None
    };
    if args.viz && !cfg!(feature = "viz") {
        warn!("Built without the `viz` feature, ignoring --viz");
    }

    let mut detector = MovingObjectDetector::new(handle);
    let prefetcher = FramePrefetcher::for_sequence(sequence.clone(), args.prefetch);

    let mut n_processed = 0usize;
    let mut n_failed = 0usize;
    for frame in prefetcher {
        if let Some(watcher) = watcher.as_mut() {
            if let Err(e) = watcher.poll() {
                warn!("Config reload failed, keeping previous parameters: {:#}", e);
            }
        }

        let inputs = match frame.inputs {
            Ok(inputs) => inputs,
            Err(e) => {
                // Ego-motion rows are relative to the previous row, so the
                // next good frame must start over
                error!("Failed to load frame {}: {:#}", frame.index, e);
                detector.reset();
                n_failed += 1;
                continue;
            }
        };

        let result = detector.process_frame(inputs);
        n_processed += 1;

        if let Some(exporter) = exporter.as_mut() {
            exporter.write(&result)?;
        }

        #[cfg(feature = "viz")]
        if let Some(viz) = viz.as_mut() {
            viz.log_result(&result);
        }

        if frame.index % 100 == 0 {
            info!(
                "Frame {}/{}: {} flows, {} clusters",
                frame.index,
                sequence.len(),
                result.metrics.n_flows,
                result.metrics.n_clusters
            );
        }
    }

    info!(
        "Done! Processed {} of {} frames ({} failed to load)",
        n_processed,
        sequence.len(),
        n_failed
    );
    Ok(())
}
