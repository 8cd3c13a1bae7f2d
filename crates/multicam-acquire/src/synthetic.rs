//! Synthetic frame generation for fallback mode.
//!
//! When no camera can be opened, the worker keeps emitting frames with the
//! exact consumer contract of live capture. The image is a deterministic
//! gradient (red from x, green from y, blue advancing with the frame
//! counter) with the camera id and the low bits of the frame counter encoded
//! as marker dots, so a consumer (human or test) can identify the feed and
//! verify it is advancing.

use multicam_core::data::CanonicalImage;

use crate::sink::CameraId;

const DOT: u32 = 4;
const DOT_PITCH: u32 = 6;
const DOT_MARGIN: u32 = 2;

/// Render the synthetic frame for `sequence` (1-based).
pub fn gradient_frame(width: u32, height: u32, camera: CameraId, sequence: u64) -> CanonicalImage {
    let mut image = CanonicalImage::filled(width, height);
    let blue = ((sequence.wrapping_mul(15)) % 255) as u8;
    let x_div = width.saturating_sub(1).max(1) as u64;
    let y_div = height.saturating_sub(1).max(1) as u64;

    for y in 0..height {
        for x in 0..width {
            let r = (x as u64 * 255 / x_div) as u8;
            let g = (y as u64 * 255 / y_div) as u8;
            image.set_pixel(x, y, [r, g, blue]);
        }
    }

    // Row of dots for the camera id, second row for the frame counter's low
    // eight bits, LSB first. Skipped entirely on images too small to hold it.
    draw_bits(&mut image, DOT_MARGIN, camera.0 as u8);
    draw_bits(&mut image, DOT_MARGIN + DOT_PITCH, (sequence & 0xff) as u8);

    image
}

fn draw_bits(image: &mut CanonicalImage, y0: u32, bits: u8) {
    let strip_width = DOT_MARGIN + 8 * DOT_PITCH;
    if image.width() < strip_width || image.height() < y0 + DOT {
        return;
    }
    for bit in 0..8u32 {
        let color = if (bits >> bit) & 1 == 1 {
            [255, 255, 255]
        } else {
            [0, 0, 0]
        };
        let x0 = DOT_MARGIN + bit * DOT_PITCH;
        for dy in 0..DOT {
            for dx in 0..DOT {
                image.set_pixel(x0 + dx, y0 + dy, color);
            }
        }
    }
}

/// Read back a bit row written by [`gradient_frame`], for tests and
/// diagnostics.
pub fn read_bits(image: &CanonicalImage, row: usize) -> Option<u8> {
    let y0 = DOT_MARGIN + row as u32 * DOT_PITCH;
    let strip_width = DOT_MARGIN + 8 * DOT_PITCH;
    if image.width() < strip_width || image.height() < y0 + DOT {
        return None;
    }
    let mut bits = 0u8;
    for bit in 0..8u32 {
        let x0 = DOT_MARGIN + bit * DOT_PITCH;
        let [r, _, _] = image.pixel(x0, y0)?;
        if r > 128 {
            bits |= 1 << bit;
        }
    }
    Some(bits)
}
