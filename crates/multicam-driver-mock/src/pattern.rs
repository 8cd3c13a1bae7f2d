//! Deterministic frame synthesis for the mock driver.
//!
//! Every frame is a pure function of `(width, height, frame_num)`, so tests
//! can assert exact pixel values. The underlying scene is a two-axis gradient
//! whose blue component advances with the frame number; mosaic formats sample
//! that scene through their CFA tile.

use multicam_core::data::PixelFormat;

/// RGB value of the synthetic scene at `(x, y)` for a given frame.
pub fn scene_rgb(width: u32, height: u32, x: u32, y: u32, frame_num: u64) -> [u8; 3] {
    let r = (x as u64 * 255 / width.saturating_sub(1).max(1) as u64) as u8;
    let g = (y as u64 * 255 / height.saturating_sub(1).max(1) as u64) as u8;
    let b = (frame_num.wrapping_mul(15) % 255) as u8;
    [r, g, b]
}

/// Render one frame of the scene in the requested pixel encoding.
///
/// `Unknown` formats produce a single luminance byte per pixel, which is what
/// a driver reporting an exotic tag would plausibly deliver.
pub fn render(width: u32, height: u32, frame_num: u64, format: PixelFormat) -> Vec<u8> {
    let pixels = width as usize * height as usize;
    match format {
        PixelFormat::Rgb8 => {
            let mut out = Vec::with_capacity(pixels * 3);
            for y in 0..height {
                for x in 0..width {
                    out.extend_from_slice(&scene_rgb(width, height, x, y, frame_num));
                }
            }
            out
        }
        format if format.is_bayer() => {
            let mut out = Vec::with_capacity(pixels);
            for y in 0..height {
                for x in 0..width {
                    let rgb = scene_rgb(width, height, x, y, frame_num);
                    // cfa_channel is Some for every Bayer tag.
                    let channel = format.cfa_channel(x, y).unwrap_or(1);
                    out.push(rgb[channel]);
                }
            }
            out
        }
        _ => {
            let mut out = Vec::with_capacity(pixels);
            for y in 0..height {
                for x in 0..width {
                    let [r, g, b] = scene_rgb(width, height, x, y, frame_num);
                    out.push(((r as u32 + g as u32 + b as u32) / 3) as u8);
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_sizes_match_format() {
        assert_eq!(render(16, 8, 0, PixelFormat::Mono8).len(), 16 * 8);
        assert_eq!(render(16, 8, 0, PixelFormat::Rgb8).len(), 16 * 8 * 3);
        assert_eq!(render(16, 8, 0, PixelFormat::BayerRg8).len(), 16 * 8);
    }

    #[test]
    fn render_is_deterministic_and_frame_dependent() {
        let a = render(32, 32, 3, PixelFormat::Rgb8);
        let b = render(32, 32, 3, PixelFormat::Rgb8);
        let c = render(32, 32, 4, PixelFormat::Rgb8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn bayer_render_samples_scene_through_tile() {
        let frame = render(8, 8, 0, PixelFormat::BayerRg8);
        // (0, 0) is an R site in RGGB: value is the scene's red gradient.
        assert_eq!(frame[0], scene_rgb(8, 8, 0, 0, 0)[0]);
        // (1, 0) is a G site.
        assert_eq!(frame[1], scene_rgb(8, 8, 1, 0, 0)[1]);
    }
}
