mod directory;
mod memory;
mod webcam;

pub use directory::DirectorySource;
pub use memory::FrameQueue;
pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Outcome of asking a source for its next frame.
#[derive(Debug)]
pub enum Captured {
    Frame(RgbImage),
    /// Nothing usable this tick (e.g. an empty buffer); try again.
    Skip,
    /// The source is exhausted; the run ends normally.
    EndOfStream,
}

/// Trait for frame sources
///
/// An `Err` is an acquisition failure (device gone, undecodable data) and
/// ends the run.
pub trait CaptureSource {
    /// Wait for and return the next frame
    fn next_frame(&mut self) -> Result<Captured>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}

impl<T: CaptureSource + ?Sized> CaptureSource for Box<T> {
    fn next_frame(&mut self) -> Result<Captured> {
        (**self).next_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}
