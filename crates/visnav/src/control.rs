//! The perception → planning → dispatch loop.
//!
//! One frame, one detection pass and at most one command per iteration. The
//! loop owns its frame source and command sink exclusively; a final `Stop` is
//! issued on every exit path, including early returns and unwinding, before
//! the frame source is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use visnav_core::{
    estimate_from_pair, BoundingBox, LatestSlot, MarkerPair, MotionCommand, MotionPlanner,
    PoseOffset,
};
use visnav_dispatch::{CommandSink, DispatchOutcome, DispatchStats};
use visnav_fiducial::{FiducialDetector, PayloadDecoder};
use visnav_grid::{find_path, GridCell, OccupancyGrid};

use crate::config::ControllerConfig;
use crate::error::{CaptureError, ControlError};
use crate::frame::FrameSource;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    #[default]
    Idle,
    /// Fewer than two markers in the last frame.
    Acquiring,
    /// Both markers in the last frame.
    Tracking,
    Stopped,
}

/// What to do while a marker is missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPolicy {
    /// Send `Stop`.
    #[default]
    Stop,
    /// Send nothing; the robot keeps its last command.
    Hold,
}

/// Which motion law turns the pose into a command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerMode {
    /// Steer by horizontal offset.
    #[default]
    Simple,
    /// Follow an A* path over the static grid.
    Path,
    /// Drive straight at the target, slowing as it gets close.
    Approach,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Operator,
    EndOfStream,
    FrameLimit,
    CaptureError,
}

/// Cooperative stop request, shareable across threads.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened in one iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopReport {
    /// 1-based frame number.
    pub frame: u64,
    pub state: LoopState,
    pub robot: Option<BoundingBox>,
    pub target: Option<BoundingBox>,
    pub pose: Option<PoseOffset>,
    /// Planned path in [`PlannerMode::Path`]; empty when no path exists.
    pub path: Option<Vec<GridCell>>,
    /// Command issued this iteration, `None` when withheld.
    pub command: Option<MotionCommand>,
    /// Known only for synchronous sinks.
    pub outcome: Option<DispatchOutcome>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub frames: u64,
    pub acquiring_frames: u64,
    pub tracking_frames: u64,
    /// Commands handed to the sink, including the final stop.
    pub commands: u64,
    pub sent: u64,
    pub suppressed: u64,
    pub failed: u64,
    /// Commands queued to an asynchronous sink.
    pub queued: u64,
    pub final_state: LoopState,
    pub ended_by: Option<StopReason>,
}

impl RunSummary {
    fn record(&mut self, outcome: Option<DispatchOutcome>) {
        self.commands += 1;
        match outcome {
            Some(DispatchOutcome::Sent) => self.sent += 1,
            Some(DispatchOutcome::Suppressed) => self.suppressed += 1,
            Some(DispatchOutcome::Failed) => self.failed += 1,
            None => self.queued += 1,
        }
    }

    /// Fold in the delivery counts of an asynchronous sink once it has
    /// drained, e.g. from `DispatchWorker::shutdown`.
    pub fn merge_dispatch(&mut self, stats: DispatchStats) {
        self.sent += stats.sent;
        self.suppressed += stats.suppressed;
        self.failed += stats.failed;
    }
}

struct GridContext {
    grid: OccupancyGrid,
    cell_px: f32,
}

/// Runs the navigation loop over a frame source.
pub struct ControlLoop<S, D, K>
where
    S: FrameSource,
    D: PayloadDecoder,
    K: CommandSink,
{
    source: S,
    detector: FiducialDetector<D>,
    planner: MotionPlanner,
    sink: K,
    mode: PlannerMode,
    loss: LossPolicy,
    grid: Option<GridContext>,
    max_frames: Option<u64>,
    stop: StopHandle,
    state: LoopState,
    frame: u64,
    summary: RunSummary,
    finalized: bool,
}

impl<S, D, K> ControlLoop<S, D, K>
where
    S: FrameSource,
    D: PayloadDecoder,
    K: CommandSink,
{
    pub fn new(source: S, detector: FiducialDetector<D>, planner: MotionPlanner, sink: K) -> Self {
        Self {
            source,
            detector,
            planner,
            sink,
            mode: PlannerMode::Simple,
            loss: LossPolicy::Stop,
            grid: None,
            max_frames: None,
            stop: StopHandle::default(),
            state: LoopState::Idle,
            frame: 0,
            summary: RunSummary::default(),
            finalized: false,
        }
    }

    /// Build from a validated config, loading the grid map when one is set.
    pub fn from_config(
        config: &ControllerConfig,
        source: S,
        detector: FiducialDetector<D>,
        sink: K,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        let grid = match &config.grid {
            Some(g) => Some((OccupancyGrid::load(&g.map)?, g.cell_px)),
            None => None,
        };

        let mut control = Self::new(source, detector, config.planner(), sink)
            .with_mode(config.mode)
            .with_loss_policy(config.loss_policy());
        if let Some((grid, cell_px)) = grid {
            control = control.with_grid(grid, cell_px);
        }
        Ok(control)
    }

    pub fn with_mode(mut self, mode: PlannerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_loss_policy(mut self, loss: LossPolicy) -> Self {
        self.loss = loss;
        self
    }

    /// Static map for [`PlannerMode::Path`]; `cell_px` image pixels per cell.
    pub fn with_grid(mut self, grid: OccupancyGrid, cell_px: f32) -> Self {
        self.grid = Some(GridContext { grid, cell_px });
        self
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run until stopped, the stream ends or a capture error occurs.
    pub fn run(&mut self) -> Result<RunSummary, ControlError> {
        self.run_with(|_, _| {})
    }

    /// [`run`](Self::run), calling `observe` after every processed frame.
    pub fn run_with<F>(&mut self, mut observe: F) -> Result<RunSummary, ControlError>
    where
        F: FnMut(&GrayImage, &LoopReport),
    {
        if self.finalized {
            return Ok(self.summary.clone());
        }

        let reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Operator;
            }
            if self.max_frames.is_some_and(|max| self.frame >= max) {
                break StopReason::FrameLimit;
            }
            match self.source.next_frame() {
                Ok(Some(frame)) => {
                    let report = self.process_frame(&frame);
                    observe(&frame, &report);
                }
                Ok(None) => break StopReason::EndOfStream,
                Err(err) => {
                    log::error!("frame capture failed: {err}");
                    self.finish(StopReason::CaptureError);
                    return Err(ControlError::Capture(err));
                }
            }
        };

        self.finish(reason);
        Ok(self.summary.clone())
    }

    /// Fetch and process a single frame. `Ok(None)` at end of stream.
    pub fn step(&mut self) -> Result<Option<LoopReport>, CaptureError> {
        match self.source.next_frame()? {
            Some(frame) => Ok(Some(self.process_frame(&frame))),
            None => Ok(None),
        }
    }

    /// Detection, planning and dispatch for one frame.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn process_frame(&mut self, frame: &GrayImage) -> LoopReport {
        self.frame += 1;
        self.summary.frames += 1;

        let pair = self.detector.detect(frame);
        let mut report = LoopReport {
            frame: self.frame,
            state: self.state,
            robot: pair.robot.as_ref().map(|d| d.bbox),
            target: pair.target.as_ref().map(|d| d.bbox),
            pose: None,
            path: None,
            command: None,
            outcome: None,
        };

        let Some(pose) = estimate_from_pair(&pair) else {
            self.enter(LoopState::Acquiring);
            self.summary.acquiring_frames += 1;
            report.state = self.state;
            if self.loss == LossPolicy::Stop {
                report.command = Some(MotionCommand::STOP);
                report.outcome = self.issue(MotionCommand::STOP);
            }
            return report;
        };

        self.enter(LoopState::Tracking);
        self.summary.tracking_frames += 1;
        report.state = self.state;
        report.pose = Some(pose);

        let command = match self.mode {
            PlannerMode::Simple => self.planner.plan_simple(&pose),
            PlannerMode::Approach => self.planner.plan_approach(&pose),
            PlannerMode::Path => {
                let (command, path) = self.plan_on_grid(&pair, &pose);
                report.path = path;
                command
            }
        };
        log::debug!(
            "frame {}: distance {:.1}, bearing {:.1} -> {command}",
            self.frame,
            pose.distance,
            pose.bearing_offset
        );
        report.command = Some(command);
        report.outcome = self.issue(command);
        report
    }

    fn plan_on_grid(
        &self,
        pair: &MarkerPair,
        pose: &PoseOffset,
    ) -> (MotionCommand, Option<Vec<GridCell>>) {
        let (Some(ctx), Some((robot, target))) = (&self.grid, pair.both()) else {
            log::warn!("path mode without a grid; stopping");
            return (MotionCommand::STOP, None);
        };
        let start = GridCell::from_pixel(robot.bbox.left, robot.bbox.top, ctx.cell_px);
        let goal = GridCell::from_pixel(target.bbox.left, target.bbox.top, ctx.cell_px);
        match find_path(&ctx.grid, start, goal) {
            Ok(path) => {
                if path.is_empty() {
                    log::warn!("no path from {start} to {goal}");
                }
                let command = self.planner.plan_along_path(pose, &path);
                (command, Some(path))
            }
            Err(err) => {
                log::warn!("cannot plan from {start} to {goal}: {err}");
                (MotionCommand::STOP, None)
            }
        }
    }

    fn enter(&mut self, next: LoopState) {
        if self.state != next {
            log::info!("{:?} -> {:?} at frame {}", self.state, next, self.frame);
            self.state = next;
        }
    }

    fn issue(&mut self, command: MotionCommand) -> Option<DispatchOutcome> {
        let outcome = self.sink.issue(command);
        self.summary.record(outcome);
        outcome
    }

    fn finish(&mut self, reason: StopReason) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.enter(LoopState::Stopped);
        self.issue(MotionCommand::STOP);
        self.summary.final_state = self.state;
        self.summary.ended_by = Some(reason);
        log::info!(
            "stopped ({reason:?}) after {} frames, {} commands",
            self.summary.frames,
            self.summary.commands
        );
    }
}

impl<S, D, K> Drop for ControlLoop<S, D, K>
where
    S: FrameSource,
    D: PayloadDecoder,
    K: CommandSink,
{
    fn drop(&mut self) {
        if !self.finalized {
            self.finalized = true;
            self.state = LoopState::Stopped;
            self.sink.issue(MotionCommand::STOP);
        }
    }
}

/// Latest processed frame and its report, for previews.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub frame: GrayImage,
    pub report: LoopReport,
}

/// A control loop running on its own thread.
pub struct BackgroundLoop {
    snapshots: Arc<LatestSlot<Snapshot>>,
    stop: StopHandle,
    handle: JoinHandle<Result<RunSummary, ControlError>>,
}

impl BackgroundLoop {
    /// Most recent snapshot not yet taken. Older ones are dropped.
    pub fn latest(&self) -> Option<Snapshot> {
        self.snapshots.take()
    }

    /// Wait up to `timeout` for a snapshot.
    pub fn wait_snapshot(&self, timeout: Duration) -> Option<Snapshot> {
        self.snapshots.wait_take_timeout(timeout)
    }

    /// Snapshots overwritten before the foreground took them.
    pub fn dropped_snapshots(&self) -> u64 {
        self.snapshots.dropped()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request a stop and wait for the loop to finish.
    pub fn stop(self) -> Result<RunSummary, ControlError> {
        self.stop.stop();
        self.join()
    }

    pub fn join(self) -> Result<RunSummary, ControlError> {
        self.handle.join().map_err(|_| ControlError::Panicked)?
    }
}

/// Move `control` to a dedicated thread. Each processed frame is published as
/// a [`Snapshot`] through a single-slot hand-off.
pub fn spawn_background<S, D, K>(
    mut control: ControlLoop<S, D, K>,
) -> Result<BackgroundLoop, ControlError>
where
    S: FrameSource + Send + 'static,
    D: PayloadDecoder + Send + 'static,
    K: CommandSink + Send + 'static,
{
    let snapshots = Arc::new(LatestSlot::new());
    let stop = control.stop_handle();
    let tx = Arc::clone(&snapshots);
    let handle = thread::Builder::new()
        .name("visnav-control".into())
        .spawn(move || {
            let result = control.run_with(|frame, report| {
                tx.put(Snapshot {
                    frame: frame.clone(),
                    report: report.clone(),
                });
            });
            tx.close();
            result
        })
        .map_err(ControlError::Spawn)?;
    Ok(BackgroundLoop {
        snapshots,
        stop,
        handle,
    })
}
