use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use slog::{info, warn, Logger};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::db;
use crate::dsp::{Pipeline, PipelineConfig, Snapshot};
use crate::models::ControlCommand;
use crate::socket_handlers;
use crate::store::SeriesCatalog;
use crate::stream::IngestLoop;
use crate::utils;

/// How often the snapshot reporter wakes up.
const REPORT_EVERY: Duration = Duration::from_millis(500);

pub struct ConnectOptions {
    pub addr: String,
    pub series: usize,
    pub interval_ms: u64,
    pub pipeline: PipelineConfig,
    pub log_type: String,
    pub log_file: PathBuf,
}

/// Streams series from `folder` to the first client that connects on `addr`.
pub async fn serve(addr: &str, folder: &Path, logger: &Logger) -> Result<()> {
    utils::create_folder(folder)
        .with_context(|| format!("failed to create series folder {}", folder.display()))?;
    let catalog = SeriesCatalog::new(folder);
    let entries = catalog.entries().context("failed to list series")?;
    if entries.is_empty() {
        warn!(logger, "no series files found"; "folder" => catalog.folder().display().to_string());
    }
    for (index, path) in entries.iter().enumerate() {
        info!(logger, "series available"; "index" => index, "path" => path.display().to_string());
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(logger, "server listening"; "addr" => listener.local_addr()?.to_string());
    println!("Server listening on {}", addr);

    let stats = socket_handlers::serve_one(listener, catalog, logger)
        .await
        .context("connection failed")?;
    info!(logger, "server shut down";
        "emitted" => stats.emitted,
        "sessions" => stats.sessions,
        "rejected" => stats.rejected,
        "malformed" => stats.malformed);
    println!(
        "{}",
        format!("Server shut down after {} samples in {} sessions.", stats.emitted, stats.sessions).green()
    );
    Ok(())
}

/// Connects to the server, selects the initial series and filters the stream
/// until the server closes the connection. Further selections are read from stdin.
pub async fn connect(opts: ConnectOptions, logger: &Logger) -> Result<()> {
    let initial = ControlCommand::select(opts.series, opts.interval_ms as f64)
        .with_context(|| format!("invalid interval {}ms", opts.interval_ms))?;
    let sample_log = db::new_sample_log(&opts.log_type, &opts.log_file).context("failed to open sample log")?;

    let stream = TcpStream::connect(&opts.addr)
        .await
        .with_context(|| format!("failed to connect to {}", opts.addr))?;
    stream.set_nodelay(true)?;
    info!(logger, "connected"; "addr" => opts.addr.clone());
    let (reader, mut writer) = stream.into_split();

    let mut pipeline = Pipeline::new(opts.pipeline);
    pipeline.set_interval(initial.interval());
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
    let mut ingest = IngestLoop::new(pipeline, sample_log, snapshot_tx, logger.clone());

    socket_handlers::send_select(&mut writer, initial)
        .await
        .context("failed to send initial select")?;
    info!(logger, "select sent"; "index" => initial.series_index(), "interval_ms" => initial.interval_ms());
    println!("Type `<series-index> <interval-ms>` to switch streams.");

    let (interval_tx, mut interval_rx) = mpsc::unbounded_channel();
    let control = tokio::spawn(socket_handlers::forward_selections(
        BufReader::new(tokio::io::stdin()),
        writer,
        interval_tx,
        logger.clone(),
    ));
    let reporter = tokio::spawn(socket_handlers::report_snapshots(snapshot_rx, REPORT_EVERY, logger.clone()));

    let result = socket_handlers::ingest_stream(reader, &mut ingest, &mut interval_rx, logger).await;
    control.abort();
    let (pipeline, stats) = ingest.finish();
    if let Err(e) = reporter.await {
        utils::error_context(logger, "snapshot reporter failed", e);
    }
    result.context("connection failed")?;

    info!(logger, "client shut down";
        "accepted" => stats.accepted,
        "skipped" => stats.skipped,
        "log_failures" => stats.log_failures,
        "fir_redesigns" => pipeline.redesigns());
    let spec = pipeline
        .spec()
        .map(|s| format!("order {}, cutoff {:.3}", s.order, s.cutoff))
        .unwrap_or_else(|| "none".to_string());
    println!(
        "{}",
        format!(
            "Received {} samples ({} skipped). Last filter: {}, dominant ≈ {:.2} Hz.",
            stats.accepted,
            stats.skipped,
            spec,
            pipeline.dominant_hz()
        )
        .green()
    );
    Ok(())
}
