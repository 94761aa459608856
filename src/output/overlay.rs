use crate::pipeline::FrameResult;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::point::Point;

const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const HULL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const CENTROID_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const FINGERTIP_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const CENTROID_RADIUS: i32 = 5;
const FINGERTIP_RADIUS: i32 = 6;

/// Draw the detected hand geometry on top of the working frame.
pub fn annotate(result: &FrameResult) -> RgbImage {
    let _span = tracing::debug_span!("annotate").entered();

    let mut canvas = result.frame.clone();
    let Some(hand) = &result.hand else {
        return canvas;
    };

    draw_closed_path(&mut canvas, hand.contour.points(), CONTOUR_COLOR);
    draw_closed_path(&mut canvas, &hand.hull, HULL_COLOR);

    for tip in &hand.fingertips {
        draw_hollow_circle_mut(&mut canvas, (tip.x, tip.y), FINGERTIP_RADIUS, FINGERTIP_COLOR);
    }

    let center = (hand.centroid.x.round() as i32, hand.centroid.y.round() as i32);
    draw_filled_circle_mut(&mut canvas, center, CENTROID_RADIUS, CENTROID_COLOR);

    canvas
}

fn draw_closed_path(canvas: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
    if points.len() < 2 {
        return;
    }
    let closing = points.last().zip(points.first());
    for (a, b) in points.windows(2).map(|w| (&w[0], &w[1])).chain(closing) {
        draw_line_segment_mut(canvas, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
    }
}
