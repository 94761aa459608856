use handcount::capture::{CaptureSource, Captured, FrameQueue};
use handcount::dispatch::{Command, CommandDispatcher};
use handcount::{
    Direction, GestureConfig, GesturePipeline, PipelineError, PipelineWorker, WorkerEvent,
    WorkerOptions,
};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SKIN: Rgb<u8> = Rgb([224, 172, 105]);
const WALL: Rgb<u8> = Rgb([30, 90, 200]);

const FINGER_LEFT: [u32; 5] = [110, 150, 190, 230, 270];
const FINGER_TOP: [u32; 5] = [70, 30, 20, 30, 70];

fn config() -> GestureConfig {
    let mut config = GestureConfig::default();
    config.preprocess.blur_sigma = 0.0;
    config
}

/// Palm with five raised fingers of staggered length.
fn open_hand() -> RgbImage {
    RgbImage::from_fn(400, 300, |x, y| {
        let palm = (100..300).contains(&x) && (170..280).contains(&y);
        let finger = FINGER_LEFT
            .iter()
            .zip(FINGER_TOP)
            .any(|(&left, top)| (left..left + 20).contains(&x) && (top..170).contains(&y));
        if palm || finger {
            SKIN
        } else {
            WALL
        }
    })
}

/// Narrow palm with one finger tapering to a point.
fn pointing_hand() -> RgbImage {
    RgbImage::from_fn(400, 300, |x, y| {
        let palm = (150..250).contains(&x) && (200..290).contains(&y);
        let finger = (10..200).contains(&y) && {
            let half_width = 16.0 * f64::from(y - 10) / 190.0;
            (f64::from(x) - 199.5).abs() <= half_width + 0.5
        };
        if palm || finger {
            SKIN
        } else {
            WALL
        }
    })
}

fn fist() -> RgbImage {
    RgbImage::from_fn(400, 300, |x, y| {
        if (100..300).contains(&x) && (170..280).contains(&y) {
            SKIN
        } else {
            WALL
        }
    })
}

fn collect_events(handle: &handcount::WorkerHandle) -> Vec<WorkerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = handle.events().recv_timeout(Duration::from_secs(10)) {
        let finished = matches!(event, WorkerEvent::Finished { .. });
        events.push(event);
        if finished {
            break;
        }
    }
    events
}

#[test]
fn open_hand_counts_five_and_quits() {
    let mut pipeline = GesturePipeline::new(&config()).unwrap();
    let result = pipeline.process_frame_at(&open_hand(), Duration::ZERO);

    let hand = result.hand.expect("hand detected");
    assert_eq!(hand.finger_count, 5);
    assert!(hand.fingertips.len() >= 5);
    assert!(hand.fingertips.iter().all(|tip| tip.y < 170));

    let event = result.gesture.expect("first reading is emitted");
    assert_eq!(event.fingers, 5);
    assert_eq!(event.direction, Direction::None);
    assert_eq!(CommandDispatcher::default().dispatch(&event), Some(Command::Quit));
}

#[test]
fn fist_is_present_with_zero_fingers() {
    let mut pipeline = GesturePipeline::new(&config()).unwrap();
    let hand = pipeline
        .process_frame_at(&fist(), Duration::ZERO)
        .hand
        .expect("fist detected");
    assert_eq!(hand.finger_count, 0);
}

#[test]
fn angle_method_counts_a_pointing_finger() {
    let mut config = config();
    config.fingers.method = "angles".parse().unwrap();
    config.fingers.min_contour_points = 5;
    config.contour.approx_fraction = 0.02;
    let mut pipeline = GesturePipeline::new(&config).unwrap();

    let result = pipeline.process_frame_at(&pointing_hand(), Duration::ZERO);
    let hand = result.hand.expect("hand detected");
    assert_eq!(hand.finger_count, 1);
    assert_eq!(hand.fingertips.len(), 1);
    let tip = hand.fingertips[0];
    assert!((185..215).contains(&tip.x), "tip at {tip:?}");
    assert!(tip.y < 100, "tip at {tip:?}");

    let event = result.gesture.expect("first reading is emitted");
    assert_eq!(CommandDispatcher::default().dispatch(&event), Some(Command::ToggleCapture));
}

#[test]
fn angle_method_sees_no_tip_on_a_fist() {
    let mut config = config();
    config.fingers.method = "angles".parse().unwrap();
    config.fingers.min_contour_points = 5;
    config.contour.approx_fraction = 0.02;
    let mut pipeline = GesturePipeline::new(&config).unwrap();

    let hand = pipeline
        .process_frame_at(&fist(), Duration::ZERO)
        .hand
        .expect("fist detected");
    assert_eq!(hand.finger_count, 0);
}

#[test]
fn worker_emits_debounced_gestures_and_finishes() {
    let frames: Vec<RgbImage> = (0..5).map(|_| open_hand()).collect();
    let mut config = config();
    config.gesture.debounce_secs = 60.0;
    let pipeline = GesturePipeline::new(&config).unwrap();
    let handle = PipelineWorker::spawn(
        move || Ok(FrameQueue::new(frames)),
        pipeline,
        WorkerOptions { target_fps: None },
    )
    .unwrap();

    let events = collect_events(&handle);
    let gestures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Gesture(g) => Some(*g),
            _ => None,
        })
        .collect();
    assert_eq!(gestures.len(), 1);
    assert_eq!(gestures[0].fingers, 5);
    assert!(matches!(events.last(), Some(WorkerEvent::Finished { frames: 5 })));

    assert!(handle.frames().try_recv().is_ok());
    handle.stop().unwrap();
}

#[test]
fn skipped_ticks_are_not_errors() {
    let mut queue = FrameQueue::default();
    queue.push_skip();
    queue.push(fist());
    queue.push_skip();

    let pipeline = GesturePipeline::new(&config()).unwrap();
    let handle = PipelineWorker::spawn(move || Ok(queue), pipeline, WorkerOptions { target_fps: None }).unwrap();

    let events = collect_events(&handle);
    assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Failed(_))));
    assert!(matches!(events.last(), Some(WorkerEvent::Finished { frames: 1 })));
}

#[test]
fn lost_device_is_reported_once() {
    let queue = FrameQueue::new([fist(), fist()]).fail_when_drained("camera unplugged");
    let pipeline = GesturePipeline::new(&config()).unwrap();
    let handle = PipelineWorker::spawn(move || Ok(queue), pipeline, WorkerOptions { target_fps: None }).unwrap();

    let events = collect_events(&handle);
    let failures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Failed(err) => Some(err),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], PipelineError::Acquisition { context } if context.contains("camera unplugged")));
    assert!(matches!(events.last(), Some(WorkerEvent::Finished { frames: 2 })));

    handle.stop().unwrap();
}

#[test]
fn device_that_cannot_open_fails_the_run() {
    let pipeline = GesturePipeline::new(&config()).unwrap();
    let handle = PipelineWorker::spawn(
        || -> anyhow::Result<FrameQueue> { Err(anyhow::anyhow!("no such camera")) },
        pipeline,
        WorkerOptions::default(),
    )
    .unwrap();

    let events = collect_events(&handle);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], WorkerEvent::Failed(PipelineError::Acquisition { .. })));
    assert!(matches!(events[1], WorkerEvent::Finished { frames: 0 }));
}

/// Endless source that counts how often it is dropped.
struct EndlessCamera {
    frame: RgbImage,
    drops: Arc<AtomicUsize>,
}

impl CaptureSource for EndlessCamera {
    fn next_frame(&mut self) -> anyhow::Result<Captured> {
        Ok(Captured::Frame(self.frame.clone()))
    }

    fn resolution(&self) -> (u32, u32) {
        self.frame.dimensions()
    }
}

impl Drop for EndlessCamera {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn stop_releases_the_source_exactly_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    let camera_drops = Arc::clone(&drops);
    let pipeline = GesturePipeline::new(&config()).unwrap();
    let handle = PipelineWorker::spawn(
        move || {
            Ok(EndlessCamera {
                frame: fist(),
                drops: camera_drops,
            })
        },
        pipeline,
        WorkerOptions { target_fps: Some(100) },
    )
    .unwrap();

    std::thread::sleep(Duration::from_millis(100));
    handle.stop().unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_handle_stops_the_worker() {
    let drops = Arc::new(AtomicUsize::new(0));
    let camera_drops = Arc::clone(&drops);
    let pipeline = GesturePipeline::new(&config()).unwrap();
    let handle = PipelineWorker::spawn(
        move || {
            Ok(EndlessCamera {
                frame: fist(),
                drops: camera_drops,
            })
        },
        pipeline,
        WorkerOptions { target_fps: Some(100) },
    )
    .unwrap();

    drop(handle);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}
