//! Firesift process entry point.
//!
//! Wires configuration, logging, the metrics exporter, and the worker
//! threads together, then feeds frames from a capture file when one is
//! given. The live websocket reader is an external collaborator; it calls
//! [`PostProcessor::enqueue`] exactly like the replay loop here does.
//!
//! Usage: `firesift [config.yaml] [capture.frames]`

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use firesift::config::FiresiftConfig;
use firesift::{
    mask_password, AccountTimelines, EventRecorder, LabeledAccounts, Matcher, PipelineConfig,
    PostProcessor, RuleSet,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal initialization failure");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "firesift.yaml".to_string());
    let replay_path = args.next();

    let config = FiresiftConfig::from_file(&config_path)?;
    if let Some(name) = &config.name {
        info!(name, config = %config_path, "starting firesift");
    }

    let rules = RuleSet::from_file(&config.rules.path)?;
    let matcher = Arc::new(Matcher::new(&rules)?);
    info!(patterns = matcher.pattern_count(), "compiled match rules");

    pipeline::telemetry::install(config.metrics.listen_addr()?)?;
    info!(listen = %config.metrics.listen, "metrics exporter listening");

    let labeled = Arc::new(LabeledAccounts::default());
    if let Some(connection) = &config.moderation.connection_string {
        // The store adapter is wired by the deployment; until one is
        // attached the cache stays empty and no alerts are suppressed.
        info!(store = %mask_password(connection), "moderation store configured");
    }

    let recorder = EventRecorder::spawn(AccountTimelines::default(), config.queues.events);
    let processor = PostProcessor::spawn(
        matcher,
        recorder.handle(),
        Arc::clone(&labeled),
        PipelineConfig {
            queue_bound: config.queues.frames,
            thresholds: config.thresholds.to_thresholds(),
        },
    );

    if let Some(path) = replay_path {
        let frames = replay_frames(&path, &processor)?;
        info!(frames, path, "replay complete");
    }

    processor.shutdown();
    let timelines = recorder.shutdown();
    info!(
        accounts = timelines.account_count(),
        events = timelines.event_count(),
        "clean shutdown"
    );
    Ok(())
}

/// Feed length-prefixed frames from a capture file into the pipeline: each
/// frame is a big-endian u32 length followed by that many raw bytes.
fn replay_frames(path: &str, processor: &PostProcessor) -> Result<usize, Box<dyn Error>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut count = 0usize;
    loop {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame)?;
        processor.enqueue(frame);
        count += 1;
    }
    Ok(count)
}
