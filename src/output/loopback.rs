use super::OutputSink;
use anyhow::{Context, Result};
use image::{imageops, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Publishes frames to a v4l2loopback device as raw YUYV.
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        Ok(Self {
            file,
            width,
            height,
            buffer: Vec::with_capacity((width * height * 2) as usize),
        })
    }
}

/// Pack an RGB frame as YUYV 4:2:2, sharing chroma between horizontal pixel
/// pairs. An odd last column is paired with itself.
pub fn rgb_to_yuyv(frame: &RgbImage, out: &mut Vec<u8>) {
    let (width, height) = frame.dimensions();
    out.clear();
    out.reserve((width.div_ceil(2) * 4 * height) as usize);

    if width == 0 {
        return;
    }

    let stride = width as usize * 3;
    for row in frame.as_raw().chunks_exact(stride) {
        for pair in row.chunks(6) {
            let first = [pair[0], pair[1], pair[2]];
            let second = match pair {
                [_, _, _, r, g, b] => [*r, *g, *b],
                _ => first,
            };
            let (y0, u0, v0) = rgb_to_yuv(first);
            let (y1, u1, v1) = rgb_to_yuv(second);
            out.extend_from_slice(&[
                y0,
                ((u0 as u16 + u1 as u16) / 2) as u8,
                y1,
                ((v0 as u16 + v1 as u16) / 2) as u8,
            ]);
        }
    }
}

fn rgb_to_yuv([r, g, b]: [u8; 3]) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = -0.147 * r - 0.289 * g + 0.436 * b + 128.0;
    let v = 0.615 * r - 0.515 * g - 0.100 * b + 128.0;
    (
        y.round().clamp(0.0, 255.0) as u8,
        u.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let resized;
        let frame = if frame.dimensions() != (self.width, self.height) {
            resized = imageops::resize(frame, self.width, self.height, imageops::FilterType::Triangle);
            &resized
        } else {
            frame
        };

        rgb_to_yuyv(frame, &mut self.buffer);
        self.file
            .write_all(&self.buffer)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn packs_two_pixels_into_four_bytes() {
        let frame = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let mut out = Vec::new();
        rgb_to_yuyv(&frame, &mut out);

        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 255);
        assert_eq!(out[1], 128);
        assert_eq!(out[3], 128);
    }

    #[test]
    fn odd_width_repeats_last_pixel() {
        let frame = RgbImage::from_pixel(3, 2, Rgb([255, 0, 0]));
        let mut out = Vec::new();
        rgb_to_yuyv(&frame, &mut out);

        assert_eq!(out.len(), 2 * 2 * 4);
        assert_eq!(out[4], out[6]);
    }

    #[test]
    fn rows_stay_aligned_in_a_reused_buffer() {
        let frame = RgbImage::from_fn(3, 2, |_, y| if y == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let mut out = vec![7; 64];
        rgb_to_yuyv(&frame, &mut out);

        assert_eq!(out.len(), 16);
        let lumas: Vec<u8> = out.iter().step_by(2).copied().collect();
        assert_eq!(lumas, [0, 0, 0, 0, 255, 255, 255, 255]);

        rgb_to_yuyv(&RgbImage::new(0, 4), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn writes_resized_frames_to_the_device_file() {
        let path = std::env::temp_dir().join(format!("handcount-loopback-{}", std::process::id()));
        File::create(&path).unwrap();

        let mut output = V4L2Output::new(&path, 4, 2).unwrap();
        output.write_frame(&RgbImage::new(8, 4)).unwrap();
        drop(output);

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4 * 2 * 2);
        std::fs::remove_file(&path).ok();
    }
}
