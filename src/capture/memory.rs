use super::{CaptureSource, Captured};
use anyhow::{anyhow, Result};
use image::RgbImage;
use std::collections::VecDeque;

/// In-memory frame source, for tests and for feeding frames from code.
#[derive(Debug, Default)]
pub struct FrameQueue {
    items: VecDeque<Captured>,
    failure: Option<String>,
}

impl FrameQueue {
    pub fn new<I: IntoIterator<Item = RgbImage>>(frames: I) -> Self {
        Self {
            items: frames.into_iter().map(Captured::Frame).collect(),
            failure: None,
        }
    }

    pub fn push(&mut self, frame: RgbImage) {
        self.items.push_back(Captured::Frame(frame));
    }

    pub fn push_skip(&mut self) {
        self.items.push_back(Captured::Skip);
    }

    /// Once drained, fail with `message` instead of ending the stream.
    pub fn fail_when_drained(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl CaptureSource for FrameQueue {
    fn next_frame(&mut self) -> Result<Captured> {
        if let Some(item) = self.items.pop_front() {
            return Ok(item);
        }
        match &self.failure {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(Captured::EndOfStream),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.items
            .iter()
            .find_map(|item| match item {
                Captured::Frame(frame) => Some(frame.dimensions()),
                _ => None,
            })
            .unwrap_or((0, 0))
    }
}
