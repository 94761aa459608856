use super::{CaptureSource, Captured};
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays still images from a directory in file-name order, then reports
/// end-of-stream. Useful for tuning thresholds on recorded footage.
pub struct DirectorySource {
    pending: VecDeque<PathBuf>,
    resolution: (u32, u32),
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        files.sort();

        tracing::info!("Replaying {} frames from {}", files.len(), dir.display());

        let resolution = match files.first() {
            Some(first) => image::image_dimensions(first)
                .with_context(|| format!("Failed to read {}", first.display()))?,
            None => (0, 0),
        };

        Ok(Self {
            pending: files.into(),
            resolution,
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl CaptureSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Captured> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(Captured::EndOfStream);
        };
        let frame = image::open(&path)
            .with_context(|| format!("Failed to decode {}", path.display()))?
            .to_rgb8();
        Ok(Captured::Frame(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_images_in_order() {
        let dir = std::env::temp_dir().join(format!("handcount-frames-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])).save(dir.join("b.png")).unwrap();
        RgbImage::from_pixel(8, 6, Rgb([9, 9, 9])).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectorySource::new(&dir).unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.resolution(), (8, 6));

        let Captured::Frame(first) = source.next_frame().unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(first.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert!(matches!(source.next_frame().unwrap(), Captured::Frame(_)));
        assert!(matches!(source.next_frame().unwrap(), Captured::EndOfStream));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(DirectorySource::new("/nonexistent/handcount").is_err());
    }
}
