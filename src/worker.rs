use crate::capture::{CaptureSource, Captured};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{FrameResult, GesturePipeline, StageTimings};
use crate::tracking::GestureEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STATS_INTERVAL: u64 = 30;

/// Messages from the worker that must not be dropped.
#[derive(Debug)]
pub enum WorkerEvent {
    Gesture(GestureEvent),
    /// Fatal acquisition error. Sent at most once, right before `Finished`.
    Failed(PipelineError),
    Finished { frames: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// Upper bound on the processing rate; `None` runs as fast as frames arrive.
    pub target_fps: Option<u32>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            target_fps: Some(30),
        }
    }
}

/// Dedicated thread running capture and the gesture pipeline in frame order.
pub struct PipelineWorker;

impl PipelineWorker {
    /// Start the worker. `open_source` runs on the worker thread, so the
    /// capture handle is created, used and released there.
    pub fn spawn<S, F>(open_source: F, pipeline: GesturePipeline, options: WorkerOptions) -> PipelineResult<WorkerHandle>
    where
        S: CaptureSource + 'static,
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::sync_channel(1);

        let thread = thread::Builder::new()
            .name("gesture-pipeline".into())
            .spawn({
                let stop = Arc::clone(&stop);
                move || {
                    let frames = match open_source() {
                        Ok(source) => run_loop(source, pipeline, options, &stop, &event_tx, &frame_tx),
                        Err(err) => {
                            let err = PipelineError::acquisition(&err);
                            tracing::error!("{}", err);
                            let _ = event_tx.send(WorkerEvent::Failed(err));
                            0
                        }
                    };
                    let _ = event_tx.send(WorkerEvent::Finished { frames });
                }
            })
            .map_err(PipelineError::WorkerSpawn)?;

        Ok(WorkerHandle {
            stop,
            thread: Some(thread),
            events: event_rx,
            frames: frame_rx,
        })
    }
}

fn run_loop<S: CaptureSource>(
    mut source: S,
    mut pipeline: GesturePipeline,
    options: WorkerOptions,
    stop: &AtomicBool,
    events: &Sender<WorkerEvent>,
    reports: &SyncSender<FrameResult>,
) -> u64 {
    let frame_duration = options
        .target_fps
        .filter(|fps| *fps > 0)
        .map(|fps| Duration::from_secs_f32(1.0 / fps as f32));
    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut totals = StageTimings::default();

    let (width, height) = source.resolution();
    tracing::info!("Pipeline worker started, source {}x{}", width, height);

    loop {
        if stop.load(Ordering::Acquire) {
            tracing::info!("Stop requested");
            break;
        }
        let loop_start = Instant::now();

        let capture_start = Instant::now();
        let captured = match source.next_frame() {
            Ok(captured) => captured,
            Err(err) => {
                let err = PipelineError::acquisition(&err);
                tracing::error!("{}", err);
                let _ = events.send(WorkerEvent::Failed(err));
                break;
            }
        };
        total_capture_time += capture_start.elapsed();

        let frame = match captured {
            Captured::Frame(frame) => frame,
            Captured::Skip => {
                tracing::trace!("Empty frame skipped");
                pace(loop_start, frame_duration);
                continue;
            }
            Captured::EndOfStream => {
                tracing::info!("Capture source reached end of stream");
                break;
            }
        };

        // A stop that arrived while waiting for the camera wins over this frame.
        if stop.load(Ordering::Acquire) {
            tracing::info!("Stop requested");
            break;
        }

        let result = pipeline.process_frame(&frame);
        totals.accumulate(&result.timings);
        frame_count += 1;

        if let Some(event) = result.gesture {
            tracing::info!("Gesture: fingers={}, direction={}", event.fingers, event.direction);
            let _ = events.send(WorkerEvent::Gesture(event));
        }

        if let Err(TrySendError::Disconnected(_)) = reports.try_send(result) {
            tracing::trace!("Frame report receiver gone");
        }

        if frame_count % STATS_INTERVAL == 0 {
            log_stats(frame_count, total_capture_time, &totals);
        }

        pace(loop_start, frame_duration);
    }

    drop(source);
    tracing::info!("Capture source released after {} frames", frame_count);
    frame_count
}

fn log_stats(frame_count: u64, capture: Duration, totals: &StageTimings) {
    let avg_ms = |d: Duration| d.as_secs_f64() * 1000.0 / frame_count as f64;
    let avg_capture_ms = avg_ms(capture);
    let total_ms = avg_capture_ms + avg_ms(totals.total());
    let actual_fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

    tracing::info!(
        "Frame {}: capture={:.1}ms, preprocess={:.1}ms, segment={:.1}ms, contour={:.1}ms, fingers={:.1}ms, total={:.1}ms, fps={:.1}",
        frame_count,
        avg_capture_ms,
        avg_ms(totals.preprocess),
        avg_ms(totals.segment),
        avg_ms(totals.contour),
        avg_ms(totals.fingers),
        total_ms,
        actual_fps
    );
}

fn pace(loop_start: Instant, frame_duration: Option<Duration>) {
    if let Some(frame_duration) = frame_duration {
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
    }
}

/// Control-side handle to a running worker. Dropping it stops and joins the
/// thread.
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    events: Receiver<WorkerEvent>,
    frames: Receiver<FrameResult>,
}

impl WorkerHandle {
    /// Gestures, the fatal error if any, and the final `Finished` marker.
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Latest per-frame results. Reports are dropped while this is not drained.
    pub fn frames(&self) -> &Receiver<FrameResult> {
        &self.frames
    }

    /// Ask the worker to stop after the frame in flight, without waiting.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stop the worker and wait for it to release the capture source.
    pub fn stop(mut self) -> PipelineResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> PipelineResult<()> {
        self.request_stop();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| PipelineError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!("{}", err);
        }
    }
}
