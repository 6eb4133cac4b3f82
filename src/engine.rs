//! Partition Engine: the two-pass split run.
//!
//! ```text
//! Idle → Analyzing → Splitting → Completed
//!           │            │
//!           └────────────┴──────→ Cancelled | Failed
//! ```
//!
//! Pass 1 (*Analyzing*) counts the data rows so progress has a denominator and a
//! part-count request can be turned into a row limit. Pass 2 (*Splitting*) reopens
//! the input and streams every row through the [`Projection`], the
//! [`PartitionPolicy`] and the current part's writer. Cancellation is observed
//! between rows only: the part open at that moment is closed with the rows it
//! already holds, and earlier parts are never touched again.

use crate::cancel::CancelToken;
use crate::error::SplitError;
use crate::io::reader::{Header, InputSource, Row};
use crate::io::writer::{open_part, PartSummary, PartWriter};
use crate::policy::{Limit, PartitionPolicy, ResolvedLimit};
use crate::project::Projection;
use crate::report;
use crate::request::SplitRequest;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::fs::create_dir_all;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Analyzing,
    Splitting,
    Completed,
    Cancelled,
    Failed,
}

/// Where a cancelled run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPhase {
    Analysis,
    Splitting,
}

impl CancelPhase {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CancelPhase::Analysis => "during analysis",
            CancelPhase::Splitting => "during file splitting",
        }
    }
}

/// Terminal status of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled(CancelPhase),
}

/// Progress snapshot. During analysis `rows_total` is still unknown (0) and no
/// part is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub state: RunState,
    pub rows_processed: u64,
    pub rows_total: u64,
    pub part_index: usize,
    pub part_path: Option<PathBuf>,
}

/// Column selection as applied, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub included: Vec<String>,
    pub excluded: Vec<String>,
    /// `(original, output)` for every included column whose name changed.
    pub renamed: Vec<(String, String)>,
}

impl ColumnSummary {
    fn from_projection(header: &[String], projection: &Projection) -> Self {
        Self {
            included: projection.source_columns().to_vec(),
            excluded: projection
                .excluded(header)
                .into_iter()
                .map(str::to_string)
                .collect(),
            renamed: projection
                .source_columns()
                .iter()
                .zip(projection.output_header())
                .filter(|(from, to)| from != to)
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect(),
        }
    }
}

/// Outcome of a completed or cancelled run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub input_path: PathBuf,
    pub input_bytes: u64,
    pub output_dir: PathBuf,
    pub status: RunStatus,
    pub total_input_rows: u64,
    pub total_output_rows: u64,
    pub parts: Vec<PartSummary>,
    pub columns: ColumnSummary,
    /// Limit in force during splitting; `None` if the run never got there.
    pub effective_limit: Option<Limit>,
    /// Achievable part count when a part-count request asked for too many.
    pub reduced_parts: Option<u64>,
    pub elapsed: Duration,
}

impl RunResult {
    #[must_use]
    pub fn part_row_counts(&self) -> Vec<u64> {
        self.parts.iter().map(|p| p.rows).collect()
    }

    #[must_use]
    pub fn validation(&self) -> report::Validation {
        report::Validation::of(self)
    }
}

/// Receiver of engine notifications. Every method defaults to a no-op.
pub trait EventSink {
    fn on_state(&mut self, _state: RunState) {}
    fn on_progress(&mut self, _event: &ProgressEvent) {}
    fn on_part_closed(&mut self, _part: &PartSummary) {}
    fn on_part_count_reduced(&mut self, _requested: u64, _effective: u64) {}
}

impl EventSink for () {}

/// The open part during pass 2.
struct PartState {
    index: usize,
    path: PathBuf,
    writer: Box<dyn PartWriter>,
}

impl PartState {
    fn open(index: usize, request: &SplitRequest, header: &[String]) -> Result<Self> {
        let path = request.part_path(index);
        let writer = open_part(
            index,
            &path,
            request.format,
            header,
            request.include_header,
        )
        .with_context(|| SplitError::WriteFailed {
            path: path.display().to_string(),
        })?;
        tracing::debug!(part = index, path = %path.display(), "opened part");
        Ok(Self {
            index,
            path,
            writer,
        })
    }

    fn write(&mut self, values: &[String]) -> Result<()> {
        self.writer
            .write_row(values)
            .with_context(|| SplitError::WriteFailed {
                path: self.path.display().to_string(),
            })
    }

    fn close(self) -> Result<PartSummary> {
        let path = self.path.display().to_string();
        let summary = self
            .writer
            .close()
            .with_context(|| SplitError::WriteFailed { path })?;
        tracing::info!(
            part = summary.index,
            rows = summary.rows,
            bytes = summary.bytes,
            "closed part"
        );
        Ok(summary)
    }
}

/// Runs split requests. Event cadences are configurable mainly for tests.
#[derive(Debug, Clone, Copy)]
pub struct SplitEngine {
    /// Emit a progress event every this many rows during splitting.
    pub progress_interval: u64,
    /// Emit a progress event every this many rows while counting.
    pub analysis_interval: u64,
}

impl Default for SplitEngine {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            analysis_interval: 1000,
        }
    }
}

impl SplitEngine {
    /// Run `request` to completion on the calling thread.
    ///
    /// Returns `Ok` for completed and cancelled runs alike; the log record is
    /// appended for both when the request enables logging.
    ///
    /// # Errors
    /// Fails on invalid requests, unreadable input and write failures. Parts closed
    /// before a failure stay on disk.
    pub fn run(
        &self,
        request: &SplitRequest,
        cancel: &CancelToken,
        sink: &mut dyn EventSink,
    ) -> Result<RunResult> {
        match self.execute(request, cancel, sink) {
            Ok(result) => {
                sink.on_state(match result.status {
                    RunStatus::Completed => RunState::Completed,
                    RunStatus::Cancelled(_) => RunState::Cancelled,
                });
                if request.log_enabled
                    && let Err(e) = report::append_run_log(request, &result)
                {
                    tracing::warn!(error = %e, "could not append run log");
                }
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "split failed");
                sink.on_state(RunState::Failed);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        request: &SplitRequest,
        cancel: &CancelToken,
        sink: &mut dyn EventSink,
    ) -> Result<RunResult> {
        let started = Instant::now();
        let read_failed = || SplitError::ReadFailed {
            path: request.input_path.display().to_string(),
        };

        sink.on_state(RunState::Analyzing);
        let input_bytes = std::fs::metadata(&request.input_path)
            .with_context(read_failed)?
            .len();
        let source = InputSource::detect(&request.input_path, request.input_delimiter)?;
        let (header, mut rows) = source.open()?;
        request.validate(&header)?;
        tracing::info!(
            input = %request.input_path.display(),
            bytes = input_bytes,
            columns = header.len(),
            "analyzing input"
        );

        create_dir_all(&request.output_dir)
            .with_context(|| format!("mkdir -p {}", request.output_dir.display()))
            .with_context(|| SplitError::WriteFailed {
                path: request.output_dir.display().to_string(),
            })?;

        let mut result = RunResult {
            input_path: request.input_path.clone(),
            input_bytes,
            output_dir: request.output_dir.clone(),
            status: RunStatus::Completed,
            total_input_rows: 0,
            total_output_rows: 0,
            parts: Vec::new(),
            columns: ColumnSummary::default(),
            effective_limit: None,
            reduced_parts: None,
            elapsed: Duration::ZERO,
        };

        // Pass 1: count data rows.
        let mut total = 0u64;
        loop {
            if cancel.is_cancelled() {
                tracing::info!(rows_counted = total, "cancelled during analysis");
                result.status = RunStatus::Cancelled(CancelPhase::Analysis);
                result.total_input_rows = total;
                result.columns = ColumnSummary::from_projection(
                    &header,
                    &projection_for(request, &header),
                );
                result.elapsed = started.elapsed();
                return Ok(result);
            }
            if !rows.advance().with_context(read_failed)? {
                break;
            }
            total += 1;
            if total % self.analysis_interval.max(1) == 0 {
                sink.on_progress(&ProgressEvent {
                    state: RunState::Analyzing,
                    rows_processed: total,
                    rows_total: 0,
                    part_index: 0,
                    part_path: None,
                });
            }
        }
        drop(rows);
        result.total_input_rows = total;

        let resolved = ResolvedLimit::resolve(request.mode, request.limit, total);
        if let Some(effective) = resolved.reduced_parts {
            tracing::warn!(
                requested = request.limit,
                effective,
                "requested part count is not achievable"
            );
            sink.on_part_count_reduced(request.limit, effective);
        }
        result.effective_limit = Some(resolved.limit);
        result.reduced_parts = resolved.reduced_parts;

        // Pass 2: split.
        sink.on_state(RunState::Splitting);
        let (header, rows) = source.open()?;
        let projection = projection_for(request, &header);
        result.columns = ColumnSummary::from_projection(&header, &projection);
        let policy = PartitionPolicy::new(resolved.limit);
        tracing::info!(rows = total, limit = ?resolved.limit, "splitting");

        let mut current: Option<PartState> = None;
        let mut processed = 0u64;
        for row in rows {
            if cancel.is_cancelled() {
                tracing::info!(rows_written = processed, "cancelled during file splitting");
                result.status = RunStatus::Cancelled(CancelPhase::Splitting);
                break;
            }
            let row: Row = row.with_context(read_failed)?;

            if let Some(part) = current.take_if(|p| {
                policy.should_rollover(p.writer.rows(), p.writer.bytes())
            }) {
                let summary = part.close()?;
                sink.on_part_closed(&summary);
                result.parts.push(summary);
            }
            if current.is_none() {
                current = Some(PartState::open(
                    result.parts.len() + 1,
                    request,
                    projection.output_header(),
                )?);
            }
            let Some(part) = current.as_mut() else {
                continue;
            };
            part.write(&projection.apply(&row))?;
            processed += 1;

            if processed % self.progress_interval.max(1) == 0 {
                sink.on_progress(&ProgressEvent {
                    state: RunState::Splitting,
                    rows_processed: processed,
                    rows_total: total,
                    part_index: part.index,
                    part_path: Some(part.path.clone()),
                });
            }
        }
        if let Some(part) = current.take() {
            let summary = part.close()?;
            sink.on_part_closed(&summary);
            result.parts.push(summary);
        }

        result.total_output_rows = result.parts.iter().map(|p| p.rows).sum();
        result.elapsed = started.elapsed();
        tracing::info!(
            parts = result.parts.len(),
            input_rows = result.total_input_rows,
            output_rows = result.total_output_rows,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "split finished"
        );
        Ok(result)
    }
}

fn projection_for(request: &SplitRequest, header: &Header) -> Projection {
    Projection::new(header, &request.resolved_columns(header), &request.renames)
}

/// Run `request` on the calling thread with the default event cadence.
///
/// # Errors
/// See [`SplitEngine::run`].
pub fn run_split(
    request: &SplitRequest,
    cancel: &CancelToken,
    sink: &mut dyn EventSink,
) -> Result<RunResult> {
    SplitEngine::default().run(request, cancel, sink)
}

struct CallbackSink<P> {
    on_progress: P,
}

impl<P: FnMut(ProgressEvent)> EventSink for CallbackSink<P> {
    fn on_progress(&mut self, event: &ProgressEvent) {
        (self.on_progress)(event.clone());
    }
}

/// Run `f`, turning a panic into an error so background callers always get an outcome.
fn run_catching_panics(f: impl FnOnce() -> Result<RunResult>) -> Result<RunResult> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(%message, "split worker panicked");
        Err(anyhow::anyhow!("split worker panicked: {message}"))
    })
}

/// Start `request` on a background worker and return immediately.
///
/// `on_progress` is called from the worker for every progress event and `on_done`
/// exactly once with the run's outcome. A panic during the run, including one
/// raised by `on_progress`, is reported to `on_done` as an error.
///
/// # Errors
/// Returns an error only if the worker thread cannot be spawned.
pub fn spawn_split<P, D>(
    request: SplitRequest,
    cancel: CancelToken,
    on_progress: P,
    on_done: D,
) -> std::io::Result<JoinHandle<()>>
where
    P: FnMut(ProgressEvent) + Send + 'static,
    D: FnOnce(Result<RunResult>) + Send + 'static,
{
    std::thread::Builder::new()
        .name("ironsplit-worker".into())
        .spawn(move || {
            let mut sink = CallbackSink { on_progress };
            on_done(run_catching_panics(|| run_split(&request, &cancel, &mut sink)));
        })
}

/// Notification delivered through a [`SplitHandle`].
#[derive(Debug)]
pub enum SplitEvent {
    State(RunState),
    Progress(ProgressEvent),
    PartClosed(PartSummary),
    PartCountReduced { requested: u64, effective: u64 },
    Finished(Result<RunResult>),
}

struct ChannelSink {
    tx: Sender<SplitEvent>,
}

impl ChannelSink {
    // A caller that dropped its receiver no longer wants events.
    fn send(&self, event: SplitEvent) {
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn on_state(&mut self, state: RunState) {
        self.send(SplitEvent::State(state));
    }

    fn on_progress(&mut self, event: &ProgressEvent) {
        self.send(SplitEvent::Progress(event.clone()));
    }

    fn on_part_closed(&mut self, part: &PartSummary) {
        self.send(SplitEvent::PartClosed(part.clone()));
    }

    fn on_part_count_reduced(&mut self, requested: u64, effective: u64) {
        self.send(SplitEvent::PartCountReduced {
            requested,
            effective,
        });
    }
}

/// A split running on a background worker, observed through an event queue.
pub struct SplitHandle {
    events: Receiver<SplitEvent>,
    cancel: CancelToken,
    worker: JoinHandle<()>,
}

impl SplitHandle {
    /// Start `request` with the default engine settings.
    ///
    /// # Errors
    /// Returns an error only if the worker thread cannot be spawned.
    pub fn start(request: SplitRequest) -> Result<Self> {
        Self::start_with(SplitEngine::default(), request)
    }

    /// Start `request` on `engine`.
    ///
    /// # Errors
    /// Returns an error only if the worker thread cannot be spawned.
    pub fn start_with(engine: SplitEngine, request: SplitRequest) -> Result<Self> {
        let (tx, events) = crossbeam_channel::unbounded();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("ironsplit-worker".into())
            .spawn(move || {
                let mut sink = ChannelSink { tx };
                let outcome =
                    run_catching_panics(|| engine.run(&request, &worker_cancel, &mut sink));
                sink.send(SplitEvent::Finished(outcome));
            })
            .context("spawn split worker")?;
        Ok(Self {
            events,
            cancel,
            worker,
        })
    }

    /// Ask the worker to stop at the next row boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Event queue; ends with exactly one [`SplitEvent::Finished`].
    #[must_use]
    pub fn events(&self) -> &Receiver<SplitEvent> {
        &self.events
    }

    /// Block until the run finishes, discarding intermediate events.
    ///
    /// # Errors
    /// Returns the run's error, or an error if the worker exited without reporting.
    pub fn wait(self) -> Result<RunResult> {
        let mut outcome = None;
        for event in &self.events {
            if let SplitEvent::Finished(result) = event {
                outcome = Some(result);
                break;
            }
        }
        if self.worker.join().is_err() {
            anyhow::bail!("split worker panicked");
        }
        outcome.unwrap_or_else(|| Err(anyhow::anyhow!("split worker exited without a result")))
    }
}
