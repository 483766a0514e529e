//! Rebuild task manager
//!
//! Single-flight background rebuild of the catalog. The task state lives
//! behind its own lock, never nested with the manifest lock. A run is
//! supervised in three parts:
//!
//! 1. the worker runs the [`CatalogBuilder`] and reports through a bounded
//!    channel ([`RebuildSink`]);
//! 2. a drain task appends every message to the task state in arrival order;
//! 3. the supervisor awaits the worker (catching panics), then awaits the
//!    drain, and only then records the terminal state.
//!
//! Step 3 guarantees no log line lands after a poller has observed
//! `completed` or `failed`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photomgr_common::{Error, Result};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Buffer of the worker → drain channel
pub const LOG_CHANNEL_CAPACITY: usize = 100;
/// Buffer of the event broadcast (lagging SSE clients skip ahead)
const EVENT_CHANNEL_CAPACITY: usize = 256;

const STARTING_MESSAGE: &str = "Starting rebuild...";
const PROCESSING_MESSAGE: &str = "Processing photos...";
const COMPLETED_MESSAGE: &str = "Rebuild completed successfully";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RebuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot of the rebuild task
///
/// Replaced wholesale when a run starts; the running worker only mutates the
/// current instance, so a snapshot handed out earlier never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebuildTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    pub status: RebuildStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub logs: Vec<String>,
}

impl RebuildTask {
    fn started(run_id: Uuid, start_time: DateTime<Utc>) -> Self {
        Self {
            run_id: Some(run_id),
            status: RebuildStatus::Running,
            progress: 0,
            message: STARTING_MESSAGE.to_string(),
            start_time: Some(start_time),
            end_time: None,
            logs: vec![format!("Rebuild started at {}", start_time.to_rfc3339())],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Accepted { run_id: Uuid },
    AlreadyRunning,
}

/// Message from a running builder to the task state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildMessage {
    Log(String),
    Progress { percent: u8, message: String },
}

/// Write end of the rebuild log channel
///
/// Deliberately not `Clone`: the channel closes as soon as the builder
/// returns or its future is dropped.
pub struct RebuildSink {
    tx: mpsc::Sender<RebuildMessage>,
}

impl RebuildSink {
    pub fn new(tx: mpsc::Sender<RebuildMessage>) -> Self {
        Self { tx }
    }

    /// Append a human-readable line to the run's log
    pub async fn log(&self, line: impl Into<String>) {
        self.send(RebuildMessage::Log(line.into())).await;
    }

    /// Update the coarse progress counter and status message
    pub async fn progress(&self, percent: u8, message: impl Into<String>) {
        self.send(RebuildMessage::Progress {
            percent: percent.min(100),
            message: message.into(),
        })
        .await;
    }

    async fn send(&self, message: RebuildMessage) {
        if self.tx.send(message).await.is_err() {
            debug!("Rebuild log receiver closed, dropping message");
        }
    }
}

/// Routine that re-derives the catalog from source media
#[async_trait]
pub trait CatalogBuilder: Send + Sync {
    async fn rebuild(&self, sink: RebuildSink) -> Result<()>;
}

/// Live rebuild event, broadcast to SSE subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum RebuildEvent {
    RebuildStarted {
        run_id: Uuid,
        start_time: DateTime<Utc>,
    },
    RebuildLog {
        run_id: Uuid,
        line: String,
    },
    RebuildProgress {
        run_id: Uuid,
        progress: u8,
        message: String,
    },
    RebuildFinished {
        run_id: Uuid,
        status: RebuildStatus,
        message: String,
        end_time: DateTime<Utc>,
    },
}

impl RebuildEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RebuildStarted { .. } => "RebuildStarted",
            Self::RebuildLog { .. } => "RebuildLog",
            Self::RebuildProgress { .. } => "RebuildProgress",
            Self::RebuildFinished { .. } => "RebuildFinished",
        }
    }
}

pub struct RebuildManager {
    task: Arc<Mutex<RebuildTask>>,
    builder: Arc<dyn CatalogBuilder>,
    events: broadcast::Sender<RebuildEvent>,
}

impl RebuildManager {
    pub fn new(builder: Arc<dyn CatalogBuilder>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            task: Arc::new(Mutex::new(RebuildTask::default())),
            builder,
            events,
        }
    }

    /// Start a run unless one is already in flight
    ///
    /// Returns as soon as the run is installed; the rebuild itself runs in
    /// the background.
    pub async fn start(&self) -> StartOutcome {
        let mut task = self.task.lock().await;
        if task.status == RebuildStatus::Running {
            warn!(run_id = ?task.run_id, "Rebuild already running, rejecting start");
            return StartOutcome::AlreadyRunning;
        }

        let run_id = Uuid::new_v4();
        let start_time = Utc::now();
        *task = RebuildTask::started(run_id, start_time);
        drop(task);

        info!(run_id = %run_id, "Rebuild started");
        let _ = self.events.send(RebuildEvent::RebuildStarted { run_id, start_time });

        tokio::spawn(supervise(
            run_id,
            Arc::clone(&self.task),
            Arc::clone(&self.builder),
            self.events.clone(),
        ));

        StartOutcome::Accepted { run_id }
    }

    /// Point-in-time copy of the task
    pub async fn status(&self) -> RebuildTask {
        self.task.lock().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RebuildEvent> {
        self.events.subscribe()
    }
}

async fn supervise(
    run_id: Uuid,
    task: Arc<Mutex<RebuildTask>>,
    builder: Arc<dyn CatalogBuilder>,
    events: broadcast::Sender<RebuildEvent>,
) {
    let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
    let drain = tokio::spawn(drain_messages(run_id, rx, Arc::clone(&task), events.clone()));

    let worker = tokio::spawn(async move {
        let sink = RebuildSink::new(tx);
        sink.progress(10, PROCESSING_MESSAGE).await;
        builder.rebuild(sink).await
    });

    let outcome = match worker.await {
        Ok(result) => result,
        Err(join_error) => Err(Error::WorkerFault(fault_description(join_error))),
    }
    .map_err(|e| failure_message(&e));

    // Barrier: every message sent before the worker ended is in the log
    if let Err(e) = drain.await {
        error!(run_id = %run_id, error = %e, "Rebuild log drain aborted");
    }

    let finished = {
        let mut task = task.lock().await;
        let end_time = Utc::now();
        task.end_time = Some(end_time);

        match &outcome {
            Ok(()) => {
                task.status = RebuildStatus::Completed;
                task.progress = 100;
                task.message = COMPLETED_MESSAGE.to_string();
                task.logs.push("✓ Rebuild completed".to_string());
            }
            Err(description) => {
                task.status = RebuildStatus::Failed;
                task.message = description.clone();
                task.logs.push(format!("✗ {}", description));
            }
        }

        RebuildEvent::RebuildFinished {
            run_id,
            status: task.status,
            message: task.message.clone(),
            end_time,
        }
    };

    match outcome {
        Ok(()) => info!(run_id = %run_id, "✓ Rebuild completed"),
        Err(description) => error!(run_id = %run_id, error = %description, "Rebuild failed"),
    }
    let _ = events.send(finished);
}

async fn drain_messages(
    run_id: Uuid,
    mut rx: mpsc::Receiver<RebuildMessage>,
    task: Arc<Mutex<RebuildTask>>,
    events: broadcast::Sender<RebuildEvent>,
) {
    while let Some(message) = rx.recv().await {
        let event = {
            let mut task = task.lock().await;
            match message {
                RebuildMessage::Log(line) => {
                    debug!(run_id = %run_id, "{}", line);
                    task.logs.push(line.clone());
                    RebuildEvent::RebuildLog { run_id, line }
                }
                RebuildMessage::Progress { percent, message } => {
                    task.progress = percent;
                    task.message = message.clone();
                    RebuildEvent::RebuildProgress {
                        run_id,
                        progress: percent,
                        message,
                    }
                }
            }
        };
        let _ = events.send(event);
    }
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::WorkerFault(description) => description.clone(),
        other => format!("Rebuild failed: {}", other),
    }
}

fn fault_description(join_error: JoinError) -> String {
    if join_error.is_panic() {
        format!("Rebuild panicked: {}", panic_message(join_error.into_panic()))
    } else {
        format!("Rebuild worker aborted: {}", join_error)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Emits `lines` log lines then returns
    struct ScriptedBuilder {
        lines: usize,
    }

    #[async_trait]
    impl CatalogBuilder for ScriptedBuilder {
        async fn rebuild(&self, sink: RebuildSink) -> Result<()> {
            for i in 0..self.lines {
                sink.log(format!("line {}", i)).await;
            }
            Ok(())
        }
    }

    /// Blocks until released
    struct GatedBuilder {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl CatalogBuilder for GatedBuilder {
        async fn rebuild(&self, sink: RebuildSink) -> Result<()> {
            self.gate.notified().await;
            sink.log("released").await;
            Ok(())
        }
    }

    struct FailingBuilder;

    #[async_trait]
    impl CatalogBuilder for FailingBuilder {
        async fn rebuild(&self, sink: RebuildSink) -> Result<()> {
            sink.log("about to fail").await;
            Err(Error::Internal("scan exploded".to_string()))
        }
    }

    struct PanickingBuilder;

    #[async_trait]
    impl CatalogBuilder for PanickingBuilder {
        async fn rebuild(&self, sink: RebuildSink) -> Result<()> {
            sink.log("about to panic").await;
            panic!("boom");
        }
    }

    async fn wait_terminal(manager: &RebuildManager) -> RebuildTask {
        for _ in 0..500 {
            let snapshot = manager.status().await;
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("rebuild did not reach a terminal state");
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let manager = RebuildManager::new(Arc::new(ScriptedBuilder { lines: 0 }));
        let snapshot = manager.status().await;

        assert_eq!(snapshot.status, RebuildStatus::Idle);
        assert!(snapshot.start_time.is_none());
        assert!(snapshot.logs.is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_drains_all_lines_before_completion() {
        // More lines than the channel holds, so the worker hits backpressure
        let manager = RebuildManager::new(Arc::new(ScriptedBuilder { lines: 500 }));
        assert!(matches!(manager.start().await, StartOutcome::Accepted { .. }));

        let snapshot = wait_terminal(&manager).await;
        assert_eq!(snapshot.status, RebuildStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.message, COMPLETED_MESSAGE);
        assert!(snapshot.end_time.is_some());

        // seed line, 500 builder lines in order, terminal line
        assert_eq!(snapshot.logs.len(), 502);
        assert!(snapshot.logs[0].starts_with("Rebuild started at"));
        for (i, line) in snapshot.logs[1..501].iter().enumerate() {
            assert_eq!(line, &format!("line {}", i));
        }
        assert_eq!(snapshot.logs.last().unwrap(), "✓ Rebuild completed");

        // Terminal state is stable
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.status().await, snapshot);
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected_without_side_effects() {
        let gate = Arc::new(Notify::new());
        let manager = RebuildManager::new(Arc::new(GatedBuilder { gate: gate.clone() }));

        let first = manager.start().await;
        let before = manager.status().await;
        assert_eq!(before.status, RebuildStatus::Running);

        assert_eq!(manager.start().await, StartOutcome::AlreadyRunning);
        let after = manager.status().await;
        assert_eq!(after.run_id, before.run_id);
        assert_eq!(after.start_time, before.start_time);
        assert_eq!(after.logs, before.logs);

        gate.notify_one();
        let done = wait_terminal(&manager).await;
        assert_eq!(done.status, RebuildStatus::Completed);
        assert_eq!(StartOutcome::Accepted { run_id: done.run_id.unwrap() }, first);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_accept_exactly_one() {
        let gate = Arc::new(Notify::new());
        let manager = Arc::new(RebuildManager::new(Arc::new(GatedBuilder {
            gate: gate.clone(),
        })));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.start().await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if let StartOutcome::Accepted { .. } = handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);

        gate.notify_one();
        let done = wait_terminal(&manager).await;
        let seeds = done
            .logs
            .iter()
            .filter(|l| l.starts_with("Rebuild started at"))
            .count();
        assert_eq!(seeds, 1);
        assert_eq!(done.logs.iter().filter(|l| *l == "released").count(), 1);
    }

    #[tokio::test]
    async fn test_builder_error_marks_task_failed() {
        let manager = RebuildManager::new(Arc::new(FailingBuilder));
        manager.start().await;

        let snapshot = wait_terminal(&manager).await;
        assert_eq!(snapshot.status, RebuildStatus::Failed);
        assert!(snapshot.message.starts_with("Rebuild failed:"));
        assert!(snapshot.message.contains("scan exploded"));
        assert!(snapshot.logs.contains(&"about to fail".to_string()));
        assert!(snapshot.logs.last().unwrap().contains("scan exploded"));
        assert!(snapshot.end_time.is_some());
    }

    #[tokio::test]
    async fn test_builder_panic_is_contained() {
        let manager = RebuildManager::new(Arc::new(PanickingBuilder));
        manager.start().await;

        let snapshot = wait_terminal(&manager).await;
        assert_eq!(snapshot.status, RebuildStatus::Failed);
        assert_eq!(snapshot.message, "Rebuild panicked: boom");
        assert!(snapshot.logs.contains(&"about to panic".to_string()));

        // The manager still accepts a new run
        assert!(matches!(manager.start().await, StartOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn test_new_run_replaces_previous_task() {
        let manager = RebuildManager::new(Arc::new(ScriptedBuilder { lines: 3 }));
        manager.start().await;
        let first = wait_terminal(&manager).await;

        manager.start().await;
        let second = wait_terminal(&manager).await;

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.logs.len(), 5);
        // The earlier snapshot is untouched
        assert_eq!(first.logs.len(), 5);
        assert_eq!(first.status, RebuildStatus::Completed);
    }

    #[tokio::test]
    async fn test_events_are_broadcast_in_order() {
        let manager = RebuildManager::new(Arc::new(ScriptedBuilder { lines: 2 }));
        let mut rx = manager.subscribe();
        manager.start().await;

        let mut types = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            types.push(event.event_type());
            if let RebuildEvent::RebuildFinished { status, .. } = event {
                assert_eq!(status, RebuildStatus::Completed);
                break;
            }
        }

        assert_eq!(
            types,
            vec![
                "RebuildStarted",
                "RebuildProgress",
                "RebuildLog",
                "RebuildLog",
                "RebuildFinished"
            ]
        );
    }

    #[test]
    fn test_snapshot_serializes_lowercase_status_and_skips_absent_times() {
        let json = serde_json::to_value(RebuildTask::default()).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json.get("start_time").is_none());
        assert!(json.get("end_time").is_none());
        assert_eq!(json["logs"], serde_json::json!([]));
    }
}
