//! Conversion of raw sensor frames into canonical 3-channel images.
//!
//! [`convert`] is a pure function: every path deep-copies, so the caller may
//! reuse or free the source buffer the moment it returns. Rules, in priority
//! order:
//!
//! 1. `Mono8` becomes a pseudo-color heat map so monochrome sensor output is
//!    visually distinguishable on the operator display.
//! 2. `RGB8` packed data is copied as-is, no channel reordering.
//! 3. The four 8-bit Bayer mosaics are demosaiced with bilinear
//!    interpolation, selected by the pattern tag.
//! 4. Unrecognized formats are handled heuristically from the buffer length:
//!    enough bytes for RGB means "treat as RGB", enough for one byte per
//!    pixel means "treat as Mono8", anything less is unsupported.

use crate::data::{CanonicalImage, PixelFormat, RawFrame};
use crate::error::ConvertError;

/// Convert one raw frame into an owned RGB image.
pub fn convert(frame: &RawFrame<'_>) -> Result<CanonicalImage, ConvertError> {
    let (w, h) = (frame.width, frame.height);
    if w == 0 || h == 0 {
        return Err(ConvertError::UnsupportedFormat {
            format: frame.format,
            len: frame.len(),
            width: w,
            height: h,
        });
    }

    match frame.format {
        PixelFormat::Mono8 => mono8_to_pseudo_color(frame.data, w, h),
        PixelFormat::Rgb8 => rgb8_copy(frame.data, w, h),
        format if format.is_bayer() => demosaic_bilinear(frame.data, w, h, format),
        PixelFormat::Unknown(tag) => {
            let pixels = w as usize * h as usize;
            if frame.len() >= pixels * 3 {
                tracing::debug!(tag, "unrecognized pixel format, treating as packed RGB");
                rgb8_copy(frame.data, w, h)
            } else if frame.len() >= pixels {
                tracing::debug!(tag, "unrecognized pixel format, treating as Mono8");
                mono8_to_pseudo_color(frame.data, w, h)
            } else {
                Err(ConvertError::UnsupportedFormat {
                    format: frame.format,
                    len: frame.len(),
                    width: w,
                    height: h,
                })
            }
        }
        // is_bayer() and the explicit arms cover every remaining tag.
        format => Err(ConvertError::UnsupportedFormat {
            format,
            len: frame.len(),
            width: w,
            height: h,
        }),
    }
}

/// Heat-map color for one gray level.
///
/// Four linear bands: blue to cyan, cyan to green, green to yellow, yellow to
/// red. Adjacent band edges differ by at most 4 per channel, so the mapping
/// is visually continuous.
pub fn pseudo_color(gray: u8) -> [u8; 3] {
    let g = gray as u32;
    match g {
        0..=63 => [0, (4 * g) as u8, 255],
        64..=127 => [0, 255, (255 - 4 * (g - 64)) as u8],
        128..=191 => [(4 * (g - 128)) as u8, 255, 0],
        _ => [255, (255 - 4 * (g - 192)) as u8, 0],
    }
}

fn mono8_to_pseudo_color(data: &[u8], width: u32, height: u32) -> Result<CanonicalImage, ConvertError> {
    let pixels = PixelFormat::Mono8.min_frame_len(width, height);
    if data.len() < pixels {
        return Err(ConvertError::TruncatedFrame {
            expected: pixels,
            actual: data.len(),
        });
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for &gray in &data[..pixels] {
        rgb.extend_from_slice(&pseudo_color(gray));
    }
    Ok(CanonicalImage::from_rgb(width, height, rgb))
}

fn rgb8_copy(data: &[u8], width: u32, height: u32) -> Result<CanonicalImage, ConvertError> {
    let needed = PixelFormat::Rgb8.min_frame_len(width, height);
    if data.len() < needed {
        return Err(ConvertError::TruncatedFrame {
            expected: needed,
            actual: data.len(),
        });
    }
    Ok(CanonicalImage::from_rgb(width, height, data[..needed].to_vec()))
}

/// Bilinear Bayer-to-RGB demosaic.
///
/// For each output pixel and channel: if the mosaic sampled that channel at
/// this site, the raw value is used; otherwise the channel is the average of
/// the in-bounds neighbors in the surrounding 3x3 window that did sample it.
/// With any image of at least 2x2, every window contains all four tile
/// phases, so each channel always has at least one contributor.
fn demosaic_bilinear(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<CanonicalImage, ConvertError> {
    let pixels = format.min_frame_len(width, height);
    if data.len() < pixels {
        return Err(ConvertError::TruncatedFrame {
            expected: pixels,
            actual: data.len(),
        });
    }

    let w = width as i64;
    let h = height as i64;
    let raw = &data[..pixels];
    let mut rgb = vec![0u8; pixels * 3];

    for y in 0..h {
        for x in 0..w {
            let mut sums = [0u32; 3];
            let mut counts = [0u32; 3];
            for ny in (y - 1)..=(y + 1) {
                for nx in (x - 1)..=(x + 1) {
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    // cfa_channel is Some for every Bayer tag this fn accepts.
                    if let Some(channel) = format.cfa_channel(nx as u32, ny as u32) {
                        sums[channel] += raw[(ny * w + nx) as usize] as u32;
                        counts[channel] += 1;
                    }
                }
            }

            let site = format.cfa_channel(x as u32, y as u32);
            let out = ((y * w + x) as usize) * 3;
            for channel in 0..3 {
                rgb[out + channel] = if site == Some(channel) {
                    raw[(y * w + x) as usize]
                } else if counts[channel] > 0 {
                    (sums[channel] / counts[channel]) as u8
                } else {
                    0
                };
            }
        }
    }

    Ok(CanonicalImage::from_rgb(width, height, rgb))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame<'a>(data: &'a [u8], w: u32, h: u32, format: PixelFormat) -> RawFrame<'a> {
        RawFrame::new(data, w, h, format)
    }

    #[test]
    fn pseudo_color_is_continuous_at_band_edges() {
        for (lo, hi) in [(63u8, 64u8), (127, 128), (191, 192)] {
            let a = pseudo_color(lo);
            let b = pseudo_color(hi);
            for c in 0..3 {
                let diff = (a[c] as i16 - b[c] as i16).abs();
                assert!(diff <= 4, "channel {} jumps by {} at {}/{}", c, diff, lo, hi);
            }
        }
    }

    #[test]
    fn mono8_uniform_200_maps_into_yellow_red_band() {
        let data = vec![200u8; 128 * 128];
        let image = convert(&frame(&data, 128, 128, PixelFormat::Mono8)).unwrap();
        assert_eq!(image.width(), 128);
        assert_eq!(image.height(), 128);
        for y in 0..128 {
            for x in 0..128 {
                assert_eq!(image.pixel(x, y), Some([255, 223, 0]));
            }
        }
    }

    #[test]
    fn rgb8_is_deep_copied_without_reordering() {
        let data: Vec<u8> = (0..64u32 * 64 * 3).map(|i| (i % 251) as u8).collect();
        let original = data.clone();
        let image = convert(&frame(&data, 64, 64, PixelFormat::Rgb8)).unwrap();
        assert_eq!(image.as_bytes(), &original[..]);

        // Mutating the output must leave the input untouched.
        let mut bytes = image.into_bytes();
        bytes[0] ^= 0xff;
        assert_eq!(data, original);
    }

    #[test]
    fn every_supported_format_yields_three_channel_output_of_input_size() {
        let cases = [
            (PixelFormat::Mono8, 1usize),
            (PixelFormat::Rgb8, 3),
            (PixelFormat::BayerRg8, 1),
            (PixelFormat::BayerGr8, 1),
            (PixelFormat::BayerGb8, 1),
            (PixelFormat::BayerBg8, 1),
        ];
        for (format, bpp) in cases {
            for (w, h) in [(2u32, 2u32), (5, 4), (33, 17)] {
                let data = vec![128u8; w as usize * h as usize * bpp];
                let image = convert(&frame(&data, w, h, format)).unwrap();
                assert_eq!(image.width(), w, "{:?} {}x{}", format, w, h);
                assert_eq!(image.height(), h);
                assert_eq!(image.as_bytes().len(), w as usize * h as usize * 3);
            }
        }
    }

    #[test]
    fn demosaic_reconstructs_per_channel_uniform_mosaic() {
        // R sites 100, G sites 50, B sites 200: every interpolation averages
        // equal values, so the full output must be exactly (100, 50, 200).
        for format in [
            PixelFormat::BayerRg8,
            PixelFormat::BayerGr8,
            PixelFormat::BayerGb8,
            PixelFormat::BayerBg8,
        ] {
            let (w, h) = (8u32, 6u32);
            let mut data = vec![0u8; (w * h) as usize];
            for y in 0..h {
                for x in 0..w {
                    let value = match format.cfa_channel(x, y).unwrap() {
                        0 => 100,
                        1 => 50,
                        _ => 200,
                    };
                    data[(y * w + x) as usize] = value;
                }
            }
            let image = convert(&frame(&data, w, h, format)).unwrap();
            for y in 0..h {
                for x in 0..w {
                    assert_eq!(
                        image.pixel(x, y),
                        Some([100, 50, 200]),
                        "{:?} at ({}, {})",
                        format,
                        x,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn unknown_format_heuristics() {
        let (w, h) = (10u32, 10u32);

        // Enough for RGB: treated as packed RGB.
        let rgb = vec![7u8; (w * h * 3) as usize];
        let image = convert(&frame(&rgb, w, h, PixelFormat::Unknown(0x0105_0003))).unwrap();
        assert_eq!(image.as_bytes(), &rgb[..]);

        // Enough for one byte per pixel: treated as Mono8 (pseudo-colored).
        let mono = vec![0u8; (w * h) as usize];
        let image = convert(&frame(&mono, w, h, PixelFormat::Unknown(42))).unwrap();
        assert_eq!(image.pixel(0, 0), Some([0, 0, 255]));

        // Shorter than one byte per pixel: unsupported, no frame.
        let short = vec![0u8; (w * h - 1) as usize];
        let err = convert(&frame(&short, w, h, PixelFormat::Unknown(42))).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[test]
    fn truncated_recognized_formats_are_rejected() {
        let data = vec![0u8; 10];
        let err = convert(&frame(&data, 8, 8, PixelFormat::Mono8)).unwrap_err();
        assert_eq!(
            err,
            ConvertError::TruncatedFrame {
                expected: 64,
                actual: 10
            }
        );

        let err = convert(&frame(&data, 4, 4, PixelFormat::Rgb8)).unwrap_err();
        assert!(matches!(err, ConvertError::TruncatedFrame { .. }));

        let err = convert(&frame(&data, 8, 8, PixelFormat::BayerRg8)).unwrap_err();
        assert!(matches!(err, ConvertError::TruncatedFrame { .. }));
    }

    #[test]
    fn zero_sized_frames_are_unsupported() {
        let err = convert(&frame(&[], 0, 4, PixelFormat::Mono8)).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }
}
