//! Frame data types shared across the acquisition pipeline.

use serde::{Deserialize, Serialize};

/// Sensor pixel encoding as reported by the driver for one frame.
///
/// `Unknown` carries the raw vendor tag so that diagnostics can name the
/// format even when the converter has to fall back to heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Mono8,
    Rgb8,
    BayerRg8,
    BayerGr8,
    BayerGb8,
    BayerBg8,
    Unknown(u32),
}

impl PixelFormat {
    /// Bytes occupied by one pixel in this encoding. `Unknown` is assumed
    /// single-byte; the converter re-checks actual buffer lengths anyway.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            _ => 1,
        }
    }

    /// Minimum buffer length a `width x height` frame needs in this encoding.
    pub fn min_frame_len(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// True for the four 8-bit Bayer mosaics.
    pub fn is_bayer(&self) -> bool {
        matches!(
            self,
            PixelFormat::BayerRg8
                | PixelFormat::BayerGr8
                | PixelFormat::BayerGb8
                | PixelFormat::BayerBg8
        )
    }

    /// RGB channel index (0 = R, 1 = G, 2 = B) sampled by the sensor at
    /// position `(x, y)` for a Bayer mosaic; `None` for non-Bayer formats.
    ///
    /// The format name gives the first two samples of the even row, so
    /// `BayerRg8` is the RGGB tile, `BayerGr8` GRBG, `BayerGb8` GBRG and
    /// `BayerBg8` BGGR.
    pub fn cfa_channel(&self, x: u32, y: u32) -> Option<usize> {
        let tile: [[usize; 2]; 2] = match self {
            PixelFormat::BayerRg8 => [[0, 1], [1, 2]],
            PixelFormat::BayerGr8 => [[1, 0], [2, 1]],
            PixelFormat::BayerGb8 => [[1, 2], [0, 1]],
            PixelFormat::BayerBg8 => [[2, 1], [1, 0]],
            _ => return None,
        };
        Some(tile[(y & 1) as usize][(x & 1) as usize])
    }

    /// Vendor parameter string for this format ("PixelFormat" enum entry).
    pub fn vendor_name(&self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "Mono8",
            PixelFormat::Rgb8 => "RGB8",
            PixelFormat::BayerRg8 => "BayerRG8",
            PixelFormat::BayerGr8 => "BayerGR8",
            PixelFormat::BayerGb8 => "BayerGB8",
            PixelFormat::BayerBg8 => "BayerBG8",
            PixelFormat::Unknown(_) => "Unknown",
        }
    }

    /// Parse a vendor parameter string back into a format tag.
    pub fn from_vendor_name(name: &str) -> Option<PixelFormat> {
        match name {
            "Mono8" => Some(PixelFormat::Mono8),
            "RGB8" => Some(PixelFormat::Rgb8),
            "BayerRG8" => Some(PixelFormat::BayerRg8),
            "BayerGR8" => Some(PixelFormat::BayerGr8),
            "BayerGB8" => Some(PixelFormat::BayerGb8),
            "BayerBG8" => Some(PixelFormat::BayerBg8),
            _ => None,
        }
    }
}

/// Borrowed view of one raw frame as filled by a driver grab call.
///
/// The view borrows the session's grab buffer, so it is valid only until the
/// next call into the session; anything that needs the pixels longer must go
/// through [`crate::convert::convert`] and keep the resulting owned image.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl<'a> RawFrame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Format-independent, copy-owned `width x height x 3` RGB image.
///
/// This is the only image type the rest of the application sees. It never
/// aliases driver memory: every construction copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CanonicalImage {
    /// Wrap an RGB byte buffer.
    ///
    /// Panics if `data.len() != width * height * 3`; a wrong-length buffer
    /// would otherwise surface later as an index panic in pixel access.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "rgb buffer length does not match {}x{}",
            width,
            height
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Allocate a zero-filled (black) image.
    pub fn filled(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGB bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGB triple at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Write the RGB triple at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfa_tiles_match_format_names() {
        // First row of RGGB is R G, second row G B.
        assert_eq!(PixelFormat::BayerRg8.cfa_channel(0, 0), Some(0));
        assert_eq!(PixelFormat::BayerRg8.cfa_channel(1, 0), Some(1));
        assert_eq!(PixelFormat::BayerRg8.cfa_channel(0, 1), Some(1));
        assert_eq!(PixelFormat::BayerRg8.cfa_channel(1, 1), Some(2));
        // BGGR is the mirrored tile.
        assert_eq!(PixelFormat::BayerBg8.cfa_channel(0, 0), Some(2));
        assert_eq!(PixelFormat::BayerBg8.cfa_channel(1, 1), Some(0));
        assert_eq!(PixelFormat::Mono8.cfa_channel(0, 0), None);
    }

    #[test]
    fn vendor_names_round_trip() {
        for format in [
            PixelFormat::Mono8,
            PixelFormat::Rgb8,
            PixelFormat::BayerRg8,
            PixelFormat::BayerGr8,
            PixelFormat::BayerGb8,
            PixelFormat::BayerBg8,
        ] {
            assert_eq!(PixelFormat::from_vendor_name(format.vendor_name()), Some(format));
        }
        assert_eq!(PixelFormat::from_vendor_name("Mono12"), None);
    }

    #[test]
    fn frame_length_follows_bytes_per_pixel() {
        assert_eq!(PixelFormat::Mono8.min_frame_len(4, 3), 12);
        assert_eq!(PixelFormat::Rgb8.min_frame_len(4, 3), 36);
        assert_eq!(PixelFormat::BayerRg8.min_frame_len(4, 3), 12);
        assert_eq!(PixelFormat::Unknown(7).min_frame_len(4, 3), 12);
    }

    #[test]
    #[should_panic(expected = "rgb buffer length")]
    fn from_rgb_rejects_wrong_length() {
        let _ = CanonicalImage::from_rgb(2, 2, vec![0u8; 5]);
    }

    #[test]
    fn canonical_image_pixel_access() {
        let mut image = CanonicalImage::filled(4, 2);
        image.set_pixel(3, 1, [1, 2, 3]);
        assert_eq!(image.pixel(3, 1), Some([1, 2, 3]));
        assert_eq!(image.pixel(4, 1), None);
        assert_eq!(image.as_bytes().len(), 4 * 2 * 3);
    }
}
