//! 8-bit color space conversions using OpenCV's conventions, so that skin
//! bounds published for OpenCV pipelines can be used unchanged.

/// RGB to HSV with H in [0, 180) and S, V in [0, 255].
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max > 0.0 { diff * 255.0 / max } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = (h / 2.0).round() as u16 % 180;
    [h as u8, s.round() as u8, max as u8]
}

pub fn rgb_to_ycrcb([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    let cr = (rf - y) * 0.713 + 128.0;
    let cb = (bf - y) * 0.564 + 128.0;
    [saturate(y), saturate(cr), saturate(cb)]
}

pub fn ycrcb_to_rgb([y, cr, cb]: [u8; 3]) -> [u8; 3] {
    let y = y as f32;
    let cr = cr as f32 - 128.0;
    let cb = cb as f32 - 128.0;
    [
        saturate(y + 1.403 * cr),
        saturate(y - 0.714 * cr - 0.344 * cb),
        saturate(y + 1.773 * cb),
    ]
}

fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_in_hsv() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn skin_tone_lands_in_default_bounds() {
        let hsv = rgb_to_hsv([224, 172, 105]);
        assert_eq!(hsv, [17, 135, 224]);
        let ycc = rgb_to_ycrcb([224, 172, 105]);
        assert_eq!(ycc[0], 180);
        assert!((133..=173).contains(&ycc[1]));
        assert!((77..=127).contains(&ycc[2]));
    }

    #[test]
    fn ycrcb_inverse_is_close() {
        for rgb in [[224, 172, 105], [10, 200, 30], [255, 255, 255], [0, 0, 0]] {
            let back = ycrcb_to_rgb(rgb_to_ycrcb(rgb));
            for c in 0..3 {
                assert!((back[c] as i16 - rgb[c] as i16).abs() <= 2, "{rgb:?} -> {back:?}");
            }
        }
    }
}
