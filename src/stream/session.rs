use tokio::time::{Duration, Instant};

use crate::store::SampleSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Streaming,
}

/// What is being streamed right now and where the next sample is due.
#[derive(Debug)]
pub struct StreamSession {
    series: SampleSeries,
    interval: Duration,
    cursor: usize,
    next_deadline: Instant,
}

impl StreamSession {
    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn exhausted(&self) -> bool {
        self.cursor >= self.series.len()
    }
}

/// Paces samples of the active session against wall-clock deadlines.
///
/// Time is always passed in, so the scheduler is a plain state machine: the
/// serving loop decides when to call [`Scheduler::poll`], tests drive it with
/// synthetic instants.
#[derive(Debug, Default)]
pub struct Scheduler {
    session: Option<StreamSession>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn state(&self) -> SchedulerState {
        match self.session {
            Some(_) => SchedulerState::Streaming,
            None => SchedulerState::Idle,
        }
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    /// Replaces the whole session. The first sample is due immediately.
    pub fn select(&mut self, series: SampleSeries, interval: Duration, now: Instant) {
        self.session = Some(StreamSession {
            series,
            interval,
            cursor: 0,
            next_deadline: now,
        });
    }

    /// When the loop should next call [`Scheduler::poll`]; `None` while idle.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.next_deadline)
    }

    /// Emits at most one sample if its deadline has passed.
    ///
    /// The deadline advances by exactly one interval per emission rather than
    /// being re-based on `now`, so late polls never accumulate into drift.
    pub fn poll(&mut self, now: Instant) -> Option<f64> {
        let session = self.session.as_mut()?;
        if session.exhausted() {
            self.session = None;
            return None;
        }
        if now < session.next_deadline {
            return None;
        }
        let value = session.series.get(session.cursor)?;
        session.cursor += 1;
        session.next_deadline += session.interval;
        if session.exhausted() {
            self.session = None;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(1);

    fn ramp(name: &str, len: usize, offset: f64) -> SampleSeries {
        SampleSeries::new(name, (0..len).map(|i| offset + i as f64).collect())
    }

    #[test]
    fn test_idle_until_selected() {
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.poll(Instant::now()), None);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_streams_then_reverts_to_idle() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.select(ramp("a", 3, 0.0), Duration::from_millis(10), t0);
        assert_eq!(scheduler.state(), SchedulerState::Streaming);

        assert_eq!(scheduler.poll(t0), Some(0.0));
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(9)), None);
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(10)), Some(1.0));
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(20)), Some(2.0));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(30)), None);
    }

    #[test]
    fn test_empty_series_goes_idle_on_next_tick() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.select(SampleSeries::default(), Duration::from_millis(10), t0);
        assert_eq!(scheduler.state(), SchedulerState::Streaming);
        assert_eq!(scheduler.poll(t0), None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_select_replaces_session_mid_stream() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.select(ramp("slow", 100, 0.0), Duration::from_millis(1000), t0);
        assert_eq!(scheduler.poll(t0), Some(0.0));

        let t1 = t0 + Duration::from_millis(5);
        scheduler.select(ramp("fast", 100, 1000.0), Duration::from_millis(10), t1);
        let session = scheduler.session().unwrap();
        assert_eq!(session.cursor(), 0);
        assert_eq!(scheduler.next_deadline(), Some(t1));

        // The very next sample follows the new cadence and never comes from the old series.
        let mut emitted = Vec::new();
        let mut now = t1;
        while now < t0 + Duration::from_millis(2000) {
            if let Some(v) = scheduler.poll(now) {
                emitted.push((now - t1, v));
            }
            now += TICK;
        }
        assert_eq!(emitted[0], (Duration::ZERO, 1000.0));
        assert_eq!(emitted[1], (Duration::from_millis(10), 1001.0));
        assert_eq!(emitted.len(), 100);
        assert!(emitted.iter().all(|&(_, v)| v >= 1000.0));
    }

    #[test]
    fn test_no_drift_over_long_runs() {
        let phase = Duration::from_micros(370);
        for interval_ms in [10u64, 20, 50, 100, 200, 500, 1000] {
            let interval = Duration::from_millis(interval_ms);
            let t0 = Instant::now();
            let mut scheduler = Scheduler::new();
            scheduler.select(ramp("long", 1001, 0.0), interval, t0);

            let mut now = t0;
            let mut n = 0u32;
            while n <= 1000 {
                if let Some(v) = scheduler.poll(now) {
                    assert_eq!(v, n as f64);
                    let deviation = now - (t0 + interval * n);
                    assert!(deviation < TICK, "{interval_ms}ms: sample {n} late by {deviation:?}");
                    n += 1;
                }
                now = if now == t0 { t0 + phase } else { now + TICK };
            }
        }
    }

    #[test]
    fn test_late_poll_catches_up_without_shifting_schedule() {
        let interval = Duration::from_millis(10);
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.select(ramp("a", 10, 0.0), interval, t0);

        let stalled = t0 + Duration::from_millis(25);
        assert_eq!(scheduler.poll(stalled), Some(0.0));
        assert_eq!(scheduler.poll(stalled), Some(1.0));
        assert_eq!(scheduler.poll(stalled), Some(2.0));
        assert_eq!(scheduler.poll(stalled), None);
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_millis(30)));
        assert_eq!(scheduler.poll(t0 + Duration::from_millis(30)), Some(3.0));
    }
}
