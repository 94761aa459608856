use anyhow::{Context, Result};
use clap::Parser;
use handcount::capture::{CaptureSource, DirectorySource, WebcamCapture};
use handcount::config::CountingMethod;
use handcount::dispatch::{Command, CommandDispatcher};
use handcount::output::{annotate, OutputSink, V4L2Output};
use handcount::segmentation::Preprocessor;
use handcount::{FrameResult, GestureConfig, GesturePipeline, PipelineWorker, WorkerEvent, WorkerOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Replay image files from this directory instead of using the webcam
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output v4l2loopback device path for the annotated video
    #[arg(short, long)]
    output_device: Option<String>,

    /// Output resolution width
    #[arg(long, default_value_t = 640)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 480)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Publish the skin mask instead of the annotated frame
    #[arg(long)]
    show_mask: bool,

    /// Publish only the skin-colored pixels of the frame
    #[arg(long, conflicts_with = "show_mask")]
    show_skin: bool,

    /// Minimum hand contour area in px² (overrides the config file)
    #[arg(long)]
    min_area: Option<f64>,

    /// Finger counting method: defects or angles (overrides the config file)
    #[arg(long)]
    method: Option<CountingMethod>,

    /// Seconds between gesture events (overrides the config file)
    #[arg(long)]
    debounce: Option<f64>,

    /// Downscale frames to this width before processing
    #[arg(long)]
    working_width: Option<u32>,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Args {
    fn gesture_config(&self) -> Result<GestureConfig> {
        let mut config = match &self.config {
            Some(path) => GestureConfig::load(path)?,
            None => GestureConfig::default(),
        };

        if let Some(min_area) = self.min_area {
            config.contour.min_area = min_area;
        }
        if let Some(method) = self.method {
            config.fingers.method = method;
        }
        if let Some(debounce) = self.debounce {
            config.gesture.debounce_secs = debounce;
        }
        if let Some(width) = self.working_width {
            config.preprocess.resize_width = Some(width);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.gesture_config().context("Invalid configuration")?;

    if let Some(path) = &args.save_config {
        config.save(path)?;
        tracing::info!("Configuration written to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    tracing::info!("handcount starting");
    tracing::info!("Target FPS: {}", args.fps);

    let mut output = match &args.output_device {
        Some(device) => Some(
            V4L2Output::new(device, args.output_width, args.output_height)
                .context("Failed to initialize v4l2loopback output")?,
        ),
        None => {
            tracing::info!("No output device, gestures only");
            None
        }
    };

    let pipeline = GesturePipeline::new(&config)?;

    let input_dir = args.input_dir.clone();
    let input_device = args.input_device;
    let open_source = move || -> Result<Box<dyn CaptureSource>> {
        let source: Box<dyn CaptureSource> = match input_dir {
            Some(dir) => Box::new(DirectorySource::new(dir)?),
            None => Box::new(
                WebcamCapture::new(input_device).context("Failed to initialize webcam capture")?,
            ),
        };
        Ok(source)
    };

    let handle = PipelineWorker::spawn(
        open_source,
        pipeline,
        WorkerOptions {
            target_fps: Some(args.fps),
        },
    )?;

    let dispatcher = CommandDispatcher::default();
    tracing::info!("Show {} fingers to stop", dispatcher.quit_fingers());

    let mut publishing = true;
    let mut failed = false;

    loop {
        match handle.events().recv_timeout(Duration::from_millis(10)) {
            Ok(WorkerEvent::Gesture(event)) => match dispatcher.dispatch(&event) {
                Some(Command::ToggleCapture) => {
                    publishing = !publishing;
                    tracing::info!("Publishing {}", if publishing { "resumed" } else { "paused" });
                }
                Some(Command::Quit) => {
                    tracing::info!("Quit gesture received");
                    break;
                }
                Some(Command::Steer(direction)) => tracing::info!("Steer {}", direction),
                None => {}
            },
            // Already logged by the worker.
            Ok(WorkerEvent::Failed(_)) => failed = true,
            Ok(WorkerEvent::Finished { frames }) => {
                tracing::info!("Pipeline finished after {} frames", frames);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(output) = output.as_mut() {
            if let Some(result) = handle.frames().try_iter().last() {
                if publishing {
                    output
                        .write_frame(&render(&result, &args))
                        .context("Failed to write frame")?;
                }
            }
        }
    }

    handle.stop()?;

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn render(result: &FrameResult, args: &Args) -> image::RgbImage {
    if args.show_mask {
        Preprocessor::mask_to_rgb(&result.mask)
    } else if args.show_skin {
        Preprocessor::apply_mask(&result.frame, &result.mask)
    } else {
        annotate(result)
    }
}
