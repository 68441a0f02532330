#![forbid(unsafe_code)]

use crate::clock::Clock;
use crate::domain::{Inspection, ProcessEvent, Snapshot};
use crate::error::Error;
use crate::observation::{Enumerator, ProcessReader};
use crate::sinks::EventSink;
use config::Poll;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// The only mutable state of the poll loop: the snapshot the next cycle is
/// compared against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    previous: Snapshot,
}

impl LoopState {
    pub fn new(previous: Snapshot) -> Self {
        Self { previous }
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }
}

/// Outcome of one comparison cycle, before any sink has seen it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cycle {
    /// Every `Started` event, followed by every `Ended` event.
    pub events: Vec<ProcessEvent>,
    pub spawned: usize,
    pub tombstones: usize,
    pub read_failures: usize,
}

/// Advance the loop by one cycle against an already enumerated snapshot.
///
/// Spawned pids are resolved through `reader`; tombstones and read failures
/// produce no event. The returned state always holds `current`, whatever
/// happens to the events afterwards.
pub fn step(
    state: LoopState,
    current: Snapshot,
    reader: &dyn ProcessReader,
    now: SystemTime,
) -> (LoopState, Cycle) {
    let diff = Snapshot::diff(&state.previous, &current);
    let mut cycle = Cycle {
        events: Vec::with_capacity(diff.spawned.len() + diff.killed.len()),
        spawned: diff.spawned.len(),
        ..Default::default()
    };

    for pid in diff.spawned {
        match reader.inspect(pid) {
            Ok(Inspection::Record(record)) => cycle.events.push(ProcessEvent::Started(record)),
            Ok(Inspection::Tombstone(tombstone)) => {
                trace!(%pid, reason = ?tombstone.reason, "process vanished before it could be read");
                cycle.tombstones += 1;
            }
            Err(err) => {
                warn!(%pid, %err, "failed to read spawned process");
                cycle.read_failures += 1;
            }
        }
    }

    for pid in diff.killed {
        cycle.events.push(ProcessEvent::Ended { pid, ended_at: now });
    }

    (LoopState::new(current), cycle)
}

pub struct Services {
    pub enumerator: Box<dyn Enumerator + Send + Sync>,
    pub reader: Box<dyn ProcessReader + Send + Sync>,
    pub sinks: Vec<Box<dyn EventSink + Send + Sync>>,
    pub clock: Box<dyn Clock + Send + Sync>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub cycle: u64,
    pub spawned: usize,
    pub started: usize,
    pub ended: usize,
    pub tombstones: usize,
    pub read_failures: usize,
    pub sink_failures: usize,
}

pub struct SpyEngine {
    poll: Poll,
    services: Services,
    state: LoopState,
    cycle: u64,
}

impl SpyEngine {
    /// Create an engine with an empty previous snapshot. Call [`prime`] (or
    /// [`run_until`], which does) before ticking, otherwise every running
    /// process is reported as spawned on the first cycle.
    ///
    /// [`prime`]: SpyEngine::prime
    /// [`run_until`]: SpyEngine::run_until
    pub fn new(poll: Poll, services: Services) -> Self {
        Self {
            poll,
            services,
            state: LoopState::default(),
            cycle: 0,
        }
    }

    /// Capture the baseline snapshot.
    pub fn prime(&mut self) -> Result<(), Error> {
        let baseline = self.services.enumerator.snapshot()?;
        info!(processes = baseline.len(), "baseline snapshot captured");
        self.state = LoopState::new(baseline);
        Ok(())
    }

    /// Execute a single enumerate/diff/notify cycle without sleeping.
    pub async fn tick(&mut self) -> Result<TickReport, Error> {
        let current = self.services.enumerator.snapshot()?;
        self.cycle = self.cycle.saturating_add(1);

        let state = std::mem::take(&mut self.state);
        let now = self.services.clock.wall();
        let (state, cycle) = step(state, current, self.services.reader.as_ref(), now);

        let mut report = TickReport {
            cycle: self.cycle,
            spawned: cycle.spawned,
            tombstones: cycle.tombstones,
            read_failures: cycle.read_failures,
            ..Default::default()
        };
        for event in &cycle.events {
            match event {
                ProcessEvent::Started(_) => report.started += 1,
                ProcessEvent::Ended { .. } => report.ended += 1,
            }
            report.sink_failures += self.dispatch(event).await;
        }

        self.state = state;
        Ok(report)
    }

    /// Run cycles until the cancellation token is triggered. A cycle that
    /// has started always completes; cancellation is observed between
    /// cycles and while waiting.
    pub async fn run_until(&mut self, cancel: CancellationToken) -> Result<(), Error> {
        self.prime()?;

        info!(warmup = ?self.poll.warmup, "warming up");
        if !self.wait(self.poll.warmup, &cancel).await {
            info!("shutdown requested");
            return Ok(());
        }

        info!(interval = ?self.poll.interval, "watching process table");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let cycle_start = self.services.clock.now();
            let report = self.tick().await?;
            let elapsed = self.services.clock.now().duration_since(cycle_start);
            if report.started + report.ended > 0 || report.sink_failures > 0 {
                debug!(?report, ?elapsed, "cycle complete");
            } else {
                trace!(cycle = report.cycle, ?elapsed, "cycle complete");
            }

            if !self.wait(self.poll.interval, &cancel).await {
                break;
            }
        }

        info!("shutdown requested");
        Ok(())
    }

    /// Read-only access to the loop state (useful for tests).
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Deliver one event to every sink. Returns the number of sinks that
    /// failed.
    async fn dispatch(&self, event: &ProcessEvent) -> usize {
        let mut failures = 0;
        for sink in &self.services.sinks {
            let result = match event {
                ProcessEvent::Started(record) => sink.started(record).await,
                ProcessEvent::Ended { pid, ended_at } => sink.ended(*pid, *ended_at).await,
            };
            if let Err(err) = result {
                warn!(sink = sink.name(), pid = %event.pid(), %err, "sink rejected event");
                failures += 1;
            }
        }
        failures
    }

    /// Sleep for `duration`; `false` if cancelled first.
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.services.clock.sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::domain::{Pid, ProcessRecord, Tombstone, Vanished};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn snapshot(raw: &[u32]) -> Snapshot {
        raw.iter().copied().map(Pid::new).collect()
    }

    fn record(pid: u32) -> ProcessRecord {
        ProcessRecord {
            pid: Pid::new(pid),
            parent_pid: Pid::new(1),
            owner_id: 1000,
            owner_name: "alice".into(),
            command_line: format!("worker --id {pid}"),
            observed_at: SystemTime::UNIX_EPOCH,
        }
    }

    /// Returns the queued snapshots in order, then repeats the last one.
    #[derive(Debug, Default)]
    struct ScriptedEnumerator {
        script: Mutex<VecDeque<Snapshot>>,
        last: Mutex<Snapshot>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedEnumerator {
        fn new(script: &[&[u32]]) -> Self {
            Self {
                script: Mutex::new(script.iter().map(|raw| snapshot(raw)).collect()),
                ..Default::default()
            }
        }
    }

    impl Enumerator for ScriptedEnumerator {
        fn snapshot(&self) -> Result<Snapshot, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                *last = next;
            }
            Ok(last.clone())
        }
    }

    #[derive(Debug)]
    struct BrokenEnumerator;

    impl Enumerator for BrokenEnumerator {
        fn snapshot(&self) -> Result<Snapshot, Error> {
            Err(Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)))
        }
    }

    /// Known pids read as records; pids listed as vanished read as
    /// tombstones; anything else fails.
    #[derive(Debug, Default)]
    struct TableReader {
        live: HashMap<Pid, ProcessRecord>,
        vanished: Vec<Pid>,
    }

    impl TableReader {
        fn live(pids: &[u32]) -> Self {
            Self {
                live: pids.iter().map(|&p| (Pid::new(p), record(p))).collect(),
                vanished: Vec::new(),
            }
        }

        fn with_vanished(mut self, pids: &[u32]) -> Self {
            self.vanished.extend(pids.iter().copied().map(Pid::new));
            self
        }
    }

    impl ProcessReader for TableReader {
        fn inspect(&self, pid: Pid) -> Result<Inspection, Error> {
            if let Some(record) = self.live.get(&pid) {
                return Ok(Inspection::Record(record.clone()));
            }
            if self.vanished.contains(&pid) {
                return Ok(Inspection::Tombstone(Tombstone {
                    pid,
                    reason: Vanished::Directory,
                }));
            }
            Err(Error::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )))
        }
    }

    #[derive(Debug, Default, Clone)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<ProcessEvent>>>,
    }

    impl RecordingSink {
        fn take(&self) -> Vec<ProcessEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn started(&self, record: &ProcessRecord) -> Result<(), Error> {
            self.events
                .lock()
                .unwrap()
                .push(ProcessEvent::Started(record.clone()));
            Ok(())
        }

        async fn ended(&self, pid: Pid, ended_at: SystemTime) -> Result<(), Error> {
            self.events
                .lock()
                .unwrap()
                .push(ProcessEvent::Ended { pid, ended_at });
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn started(&self, _record: &ProcessRecord) -> Result<(), Error> {
            Err(Error::Io(std::io::Error::other("disk full")))
        }

        async fn ended(&self, _pid: Pid, _ended_at: SystemTime) -> Result<(), Error> {
            Err(Error::Io(std::io::Error::other("disk full")))
        }
    }

    fn engine(
        enumerator: impl Enumerator + 'static,
        reader: TableReader,
        sinks: Vec<Box<dyn EventSink + Send + Sync>>,
    ) -> SpyEngine {
        let services = Services {
            enumerator: Box::new(enumerator),
            reader: Box::new(reader),
            sinks,
            clock: Box::new(SystemClock),
        };
        SpyEngine::new(
            Poll {
                interval: Duration::from_millis(500),
                warmup: Duration::from_secs(3),
            },
            services,
        )
    }

    fn kinds(events: &[ProcessEvent]) -> Vec<(char, u32)> {
        events
            .iter()
            .map(|event| match event {
                ProcessEvent::Started(r) => ('+', r.pid.as_u32()),
                ProcessEvent::Ended { pid, .. } => ('-', pid.as_u32()),
            })
            .collect()
    }

    #[test]
    fn step_reports_spawn_and_kill() {
        let now = SystemTime::now();
        let reader = TableReader::live(&[300]);
        let (state, cycle) = step(
            LoopState::new(snapshot(&[100, 200])),
            snapshot(&[200, 300]),
            &reader,
            now,
        );

        assert_eq!(
            cycle.events,
            vec![
                ProcessEvent::Started(record(300)),
                ProcessEvent::Ended {
                    pid: Pid::new(100),
                    ended_at: now,
                },
            ]
        );
        assert_eq!(state.previous(), &snapshot(&[200, 300]));
    }

    #[test]
    fn step_emits_all_starts_before_ends() {
        let reader = TableReader::live(&[5, 6, 7]);
        let (_, cycle) = step(
            LoopState::new(snapshot(&[1, 2])),
            snapshot(&[5, 6, 7]),
            &reader,
            SystemTime::now(),
        );

        let kinds = kinds(&cycle.events);
        assert_eq!(kinds.len(), 5);
        assert!(kinds[..3].iter().all(|(k, _)| *k == '+'));
        assert!(kinds[3..].iter().all(|(k, _)| *k == '-'));
    }

    #[test]
    fn tombstoned_spawn_is_silent_and_not_retried() {
        let reader = TableReader::default().with_vanished(&[300]);
        let (state, cycle) = step(
            LoopState::new(snapshot(&[200])),
            snapshot(&[200, 300]),
            &reader,
            SystemTime::now(),
        );
        assert!(cycle.events.is_empty());
        assert_eq!(cycle.spawned, 1);
        assert_eq!(cycle.tombstones, 1);

        let (_, cycle) = step(state, snapshot(&[200, 300]), &reader, SystemTime::now());
        assert!(cycle.events.is_empty());
        assert_eq!(cycle.spawned, 0);
    }

    #[test]
    fn read_failure_is_counted_not_emitted() {
        let reader = TableReader::default();
        let (state, cycle) = step(
            LoopState::default(),
            snapshot(&[9]),
            &reader,
            SystemTime::now(),
        );
        assert!(cycle.events.is_empty());
        assert_eq!(cycle.read_failures, 1);
        assert!(state.previous().contains(Pid::new(9)));
    }

    #[tokio::test]
    async fn tick_delivers_events_to_every_sink() {
        let sink = RecordingSink::default();
        let mut engine = engine(
            ScriptedEnumerator::new(&[&[100, 200], &[200, 300]]),
            TableReader::live(&[300]),
            vec![Box::new(sink.clone())],
        );

        engine.prime().unwrap();
        let report = engine.tick().await.unwrap();

        assert_eq!(report.cycle, 1);
        assert_eq!(report.started, 1);
        assert_eq!(report.ended, 1);
        assert_eq!(report.sink_failures, 0);
        assert_eq!(kinds(&sink.take()), vec![('+', 300), ('-', 100)]);
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_others_or_bookkeeping() {
        let sink = RecordingSink::default();
        let mut engine = engine(
            ScriptedEnumerator::new(&[&[100, 200], &[200, 300], &[200, 300]]),
            TableReader::live(&[300]),
            vec![Box::new(FailingSink), Box::new(sink.clone())],
        );

        engine.prime().unwrap();
        let report = engine.tick().await.unwrap();
        assert_eq!(report.sink_failures, 2);
        assert_eq!(kinds(&sink.take()), vec![('+', 300), ('-', 100)]);
        assert_eq!(engine.state().previous(), &snapshot(&[200, 300]));

        let report = engine.tick().await.unwrap();
        assert_eq!(report.spawned, 0);
        assert_eq!(report.ended, 0);
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn enumeration_failure_is_fatal() {
        let mut engine = engine(BrokenEnumerator, TableReader::default(), Vec::new());
        assert!(engine.prime().is_err());
        assert!(engine.tick().await.is_err());
        assert_eq!(engine.state(), &LoopState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_waits_for_warmup_then_polls() {
        let sink = RecordingSink::default();
        let enumerator = ScriptedEnumerator::new(&[&[1], &[1, 2], &[2]]);
        let calls = enumerator.calls.clone();
        let mut engine = engine(enumerator, TableReader::live(&[2]), vec![Box::new(sink.clone())]);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { engine.run_until(cancel).await }
        });

        // Still warming up: only the baseline has been taken.
        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sink.take().is_empty());

        // Cycles at 3.0s and 3.5s.
        tokio::time::sleep(Duration::from_millis(800)).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(kinds(&sink.take()), vec![('+', 2), ('-', 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_warmup_skips_cycles() {
        let enumerator = ScriptedEnumerator::new(&[&[1], &[2]]);
        let calls = enumerator.calls.clone();
        let mut engine = engine(enumerator, TableReader::default(), Vec::new());

        let cancel = CancellationToken::new();
        cancel.cancel();
        engine.run_until(cancel).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
