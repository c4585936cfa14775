use std::io;
use std::time::Duration;

use slog::{debug, info, warn, Logger};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant, MissedTickBehavior};

use crate::dsp::Snapshot;
use crate::models::{ControlCommand, SUPPORTED_INTERVALS_MS};
use crate::store::SeriesCatalog;
use crate::stream::{encode_command, CommandChannel, IngestLoop, Scheduler, SchedulerState};
use crate::utils;

/// Bytes requested per socket read.
pub const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub emitted: u64,
    pub sessions: u64,
    pub rejected: u64,
    pub malformed: u64,
}

/// Accepts exactly one client on `listener` and serves it until it disconnects.
/// The listener is closed as soon as the client is accepted.
pub async fn serve_one(listener: TcpListener, catalog: SeriesCatalog, logger: &Logger) -> io::Result<ServeStats> {
    let (stream, peer) = listener.accept().await?;
    drop(listener);
    info!(logger, "client connected"; "peer" => peer.to_string());
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();
    serve_connection(reader, writer, &catalog, logger).await
}

/// Runs the streaming scheduler for one connection.
///
/// A single task alternates between the control direction and the emission
/// timer: buffered commands are applied first, then any due sample is sent,
/// then the task waits for whichever comes first, more control bytes or the
/// next deadline. Nothing here blocks on the peer except the write of a sample.
pub async fn serve_connection<R, W>(
    mut reader: R,
    mut writer: W,
    catalog: &SeriesCatalog,
    logger: &Logger,
) -> io::Result<ServeStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut channel = CommandChannel::new(logger.clone());
    let mut scheduler = Scheduler::new();
    let mut stats = ServeStats::default();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        while let Some(cmd) = channel.try_decode_command() {
            apply_command(&mut scheduler, catalog, cmd, &mut stats, logger);
        }

        let was_streaming = scheduler.state() == SchedulerState::Streaming;
        if let Some(value) = scheduler.poll(Instant::now()) {
            match write_record(&mut writer, &format!("{}\n", value)).await {
                Ok(()) => stats.emitted += 1,
                Err(e) if utils::is_disconnect(&e) => {
                    info!(logger, "client disconnected"; "error" => e.to_string());
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if was_streaming && scheduler.state() == SchedulerState::Idle {
            info!(logger, "series finished"; "emitted" => stats.emitted);
        }

        let deadline = scheduler.next_deadline();
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    let session = scheduler.session();
                    info!(logger, "client closed the connection";
                        "series" => session.map(|s| s.series().name().to_string()).unwrap_or_default(),
                        "position" => session.map(|s| s.cursor()).unwrap_or_default());
                    break;
                }
                Ok(n) => channel.feed(&buf[..n]),
                Err(e) if utils::is_disconnect(&e) => {
                    info!(logger, "client disconnected"; "error" => e.to_string());
                    break;
                }
                Err(e) => return Err(e),
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {}
        }
    }

    stats.malformed = channel.dropped();
    Ok(stats)
}

fn apply_command(
    scheduler: &mut Scheduler,
    catalog: &SeriesCatalog,
    cmd: ControlCommand,
    stats: &mut ServeStats,
    logger: &Logger,
) {
    match catalog.load(cmd.series_index()) {
        Ok(series) => {
            if series.is_empty() {
                warn!(logger, "selected series has no parsable samples"; "series" => series.name());
            }
            info!(logger, "now streaming";
                "series" => series.name(),
                "index" => cmd.series_index(),
                "interval_ms" => cmd.interval_ms(),
                "samples" => series.len());
            scheduler.select(series, cmd.interval(), Instant::now());
            stats.sessions += 1;
        }
        Err(e) => {
            stats.rejected += 1;
            warn!(logger, "rejected select command";
                "index" => cmd.series_index(),
                "error" => e.to_string());
        }
    }
}

async fn write_record<W: AsyncWrite + Unpin>(writer: &mut W, record: &str) -> io::Result<()> {
    writer.write_all(record.as_bytes()).await?;
    writer.flush().await
}

/// Sends one `select` record on the control direction.
pub async fn send_select<W: AsyncWrite + Unpin>(writer: &mut W, cmd: ControlCommand) -> io::Result<()> {
    let line = encode_command(cmd).map_err(io::Error::other)?;
    write_record(writer, &line).await
}

/// Reads the sample direction until the server goes away, feeding every chunk
/// to the ingest loop. Interval changes made by the operator arrive on
/// `intervals` and take priority over pending bytes.
pub async fn ingest_stream<R: AsyncRead + Unpin>(
    mut reader: R,
    ingest: &mut IngestLoop,
    intervals: &mut mpsc::UnboundedReceiver<Duration>,
    logger: &Logger,
) -> io::Result<()> {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        tokio::select! {
            biased;
            Some(interval) = intervals.recv() => {
                ingest.set_interval(interval);
                info!(logger, "sampling interval updated";
                    "interval_ms" => interval.as_secs_f64() * 1000.0,
                    "samples" => ingest.pipeline().samples_seen());
            }
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    info!(logger, "server closed the connection"; "accepted" => ingest.stats().accepted);
                    return Ok(());
                }
                Ok(n) => {
                    ingest.feed(&buf[..n]);
                }
                Err(e) if utils::is_disconnect(&e) => {
                    info!(logger, "server disconnected"; "error" => e.to_string());
                    return Ok(());
                }
                Err(e) => return Err(e),
            },
        }
    }
}

/// Parses an operator line of the form `<series-index> <interval-ms>`.
/// Only the supported intervals are accepted.
pub fn parse_selection(line: &str) -> Option<ControlCommand> {
    let mut parts = line.split_whitespace();
    let index = parts.next()?.parse::<usize>().ok()?;
    let interval_ms = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() || !SUPPORTED_INTERVALS_MS.contains(&interval_ms) {
        return None;
    }
    ControlCommand::select(index, interval_ms as f64)
}

/// Turns operator input into `select` commands. The new interval is handed to
/// the ingest loop before the command goes out.
///
/// The writer is returned once input ends so the control direction stays open.
pub async fn forward_selections<I, W>(
    input: I,
    mut writer: W,
    intervals: mpsc::UnboundedSender<Duration>,
    logger: Logger,
) -> io::Result<W>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_selection(&line) {
            Some(cmd) => {
                let _ = intervals.send(cmd.interval());
                send_select(&mut writer, cmd).await?;
                info!(logger, "select sent"; "index" => cmd.series_index(), "interval_ms" => cmd.interval_ms());
            }
            None => {
                warn!(logger, "expected `<series-index> <interval-ms>`";
                    "input" => line,
                    "intervals_ms" => format!("{:?}", SUPPORTED_INTERVALS_MS));
            }
        }
    }
    Ok(writer)
}

/// Stand-in for a rendering consumer: logs the latest snapshot at a fixed
/// cadence, skipping ticks where nothing changed. Ends when the ingest loop
/// drops its sender.
pub async fn report_snapshots(mut snapshots: watch::Receiver<Snapshot>, every: Duration, logger: Logger) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        match snapshots.has_changed() {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => break,
        }
        let snap = snapshots.borrow_and_update().clone();
        info!(logger, "pipeline snapshot";
            "samples" => snap.samples_seen,
            "raw" => snap.raw.last().copied().unwrap_or_default(),
            "fir" => snap.filtered.last().copied().unwrap_or_default(),
            "ema" => snap.ema.last().copied().unwrap_or_default(),
            "dominant_hz" => snap.dominant_hz,
            "order" => snap.spec.map(|s| s.order).unwrap_or_default(),
            "cutoff" => snap.spec.map(|s| s.cutoff).unwrap_or_default());
        match snap.to_json() {
            Ok(json) => debug!(logger, "pipeline snapshot detail"; "snapshot" => json),
            Err(e) => warn!(logger, "failed to serialize snapshot"; "error" => e.to_string()),
        }
    }
}
