use std::time::Duration;

use chrono::Local;
use slog::{debug, warn, Logger};
use tokio::sync::watch;

use crate::db::SampleLog;
use crate::dsp::{Pipeline, Snapshot, Step, SNAPSHOT_TAIL};
use crate::stream::RecordFramer;

/// Decodes one sample record. Non-numeric and non-finite records are `None`.
pub fn decode_sample(record: &str) -> Option<f64> {
    record.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Counters kept by the ingest loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub skipped: u64,
    pub log_failures: u64,
}

/// Client side of the sample direction: frames the byte stream, decodes
/// samples, logs them and drives the filter pipeline. It is the single writer
/// of the pipeline; readers only ever see published snapshots.
pub struct IngestLoop {
    framer: RecordFramer,
    pipeline: Pipeline,
    sample_log: Box<dyn SampleLog>,
    snapshots: watch::Sender<Snapshot>,
    stats: IngestStats,
    logger: Logger,
}

impl IngestLoop {
    pub fn new(
        pipeline: Pipeline,
        sample_log: Box<dyn SampleLog>,
        snapshots: watch::Sender<Snapshot>,
        logger: Logger,
    ) -> Self {
        IngestLoop {
            framer: RecordFramer::new(),
            pipeline,
            sample_log,
            snapshots,
            stats: IngestStats::default(),
            logger,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.pipeline.set_interval(interval);
    }

    /// Handles a chunk of received bytes and returns how many samples it completed.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        self.framer.push(bytes);
        let mut accepted = 0;
        while let Some(record) = self.framer.next_record() {
            if self.handle_record(&record).is_some() {
                accepted += 1;
            }
        }
        if accepted > 0 {
            self.snapshots.send_replace(self.pipeline.snapshot(SNAPSHOT_TAIL));
        }
        accepted
    }

    /// Processes one complete record. A record that does not decode leaves all state untouched.
    pub fn handle_record(&mut self, record: &str) -> Option<Step> {
        let Some(value) = decode_sample(record) else {
            self.stats.skipped += 1;
            debug!(self.logger, "skipping undecodable sample record"; "record" => record);
            return None;
        };
        if let Err(e) = self.sample_log.append(Local::now(), value) {
            self.stats.log_failures += 1;
            warn!(self.logger, "failed to log sample"; "error" => e.to_string());
        }
        self.stats.accepted += 1;
        let step = self.pipeline.push(value);
        match step.fir {
            Some(fir) => debug!(self.logger, "sample";
                "value" => value,
                "ema" => step.ema,
                "fir" => fir.output,
                "dominant_hz" => fir.dominant_hz,
                "order" => fir.spec.order,
                "cutoff" => fir.spec.cutoff),
            None => debug!(self.logger, "sample"; "value" => value, "ema" => step.ema),
        }
        Some(step)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Flushes the sample log and hands back the final pipeline state.
    pub fn finish(mut self) -> (Pipeline, IngestStats) {
        if let Err(e) = self.sample_log.flush() {
            warn!(self.logger, "failed to flush sample log"; "error" => e.to_string());
        }
        (self.pipeline, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::DateTime;
    use slog::{o, Discard};

    use crate::db::SampleLogError;
    use crate::dsp::PipelineConfig;

    #[derive(Clone, Default)]
    struct MemoryLog(Arc<Mutex<Vec<f64>>>);

    impl SampleLog for MemoryLog {
        fn append(&mut self, _at: DateTime<Local>, value: f64) -> Result<(), SampleLogError> {
            self.0.lock().unwrap().push(value);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), SampleLogError> {
            Ok(())
        }
    }

    fn ingest(interval: Option<Duration>) -> (IngestLoop, MemoryLog, watch::Receiver<Snapshot>) {
        let log = MemoryLog::default();
        let (tx, rx) = watch::channel(Snapshot::default());
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        if let Some(interval) = interval {
            pipeline.set_interval(interval);
        }
        let ingest = IngestLoop::new(pipeline, Box::new(log.clone()), tx, Logger::root(Discard, o!()));
        (ingest, log, rx)
    }

    #[test]
    fn test_decode_sample() {
        assert_eq!(decode_sample("0.5"), Some(0.5));
        assert_eq!(decode_sample(" 1e-3 "), Some(0.001));
        assert_eq!(decode_sample("nan"), None);
        assert_eq!(decode_sample("inf"), None);
        assert_eq!(decode_sample("0.5.1"), None);
        assert_eq!(decode_sample(""), None);
    }

    #[test]
    fn test_chunked_stream() {
        let (mut ingest, log, rx) = ingest(Some(Duration::from_millis(20)));
        assert_eq!(ingest.feed(b"0.1\n0."), 1);
        assert_eq!(ingest.feed(b"2\nbogus\n0.3\n"), 2);
        assert_eq!(*log.0.lock().unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(ingest.stats(), IngestStats { accepted: 3, skipped: 1, log_failures: 0 });

        let snap = rx.borrow().clone();
        assert_eq!(snap.raw, vec![0.1, 0.2, 0.3]);
        assert_eq!(snap.filtered.len(), 3);
        assert_eq!(snap.ema.len(), 3);
        assert_eq!(snap.samples_seen, 3);
    }

    #[test]
    fn test_bad_record_leaves_state_untouched() {
        let (mut ingest, log, rx) = ingest(Some(Duration::from_millis(20)));
        ingest.feed(b"0.5\n");
        let before = rx.borrow().clone();
        assert_eq!(ingest.feed(b"abc\nNaN\n"), 0);
        assert_eq!(*rx.borrow(), before);
        assert_eq!(ingest.pipeline().raw().len(), 1);
        assert_eq!(log.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_without_interval_only_ema_and_raw() {
        let (mut ingest, _log, _rx) = ingest(None);
        ingest.feed(b"1\n1\n1\n1\n");
        assert_eq!(ingest.pipeline().ema(), &[1.0, 1.0, 1.0, 1.0]);
        assert!(ingest.pipeline().filtered().is_empty());

        ingest.set_interval(Duration::from_millis(10));
        ingest.feed(b"1\n");
        let (pipeline, stats) = ingest.finish();
        assert_eq!(pipeline.filtered().len(), 5);
        assert_eq!(stats.accepted, 5);
    }
}
