use image::GrayImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Side length of the grayscale reduction every fingerprint is derived from.
pub const REDUCED_SIZE: u32 = 8;

/// Number of hex digits in the stored form of a fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintParseError {
    #[error("Fingerprint must be 16 hex digits, got {length}")]
    InvalidLength { length: usize },

    #[error("Fingerprint contains a non-hex character: {value}")]
    InvalidDigit { value: String },
}

/// 64-bit average hash of an image.
///
/// Bit 63 is the top-left cell of the 8x8 reduction, bit 0 the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFingerprint(pub u64);

impl ImageFingerprint {
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Number of differing bits, always in `0..=64`.
    pub fn hamming_distance(&self, other: &ImageFingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for ImageFingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != FINGERPRINT_HEX_LEN {
            return Err(FingerprintParseError::InvalidLength { length: s.len() });
        }
        // from_str_radix would accept a leading '+'
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FingerprintParseError::InvalidDigit {
                value: s.to_string(),
            });
        }
        u64::from_str_radix(s, 16)
            .map(ImageFingerprint)
            .map_err(|_| FingerprintParseError::InvalidDigit {
                value: s.to_string(),
            })
    }
}

impl Serialize for ImageFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImageFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Hamming distance between two stored fingerprints.
///
/// Returns `None` when either value is not a 16-digit fingerprint, which
/// callers must treat as an infinite distance.
pub fn hamming_distance_hex(a: &str, b: &str) -> Option<u32> {
    let a: ImageFingerprint = a.parse().ok()?;
    let b: ImageFingerprint = b.parse().ok()?;
    Some(a.hamming_distance(&b))
}

/// Compute the average hash of encoded image bytes.
pub fn compute_fingerprint(image_bytes: &[u8]) -> Result<ImageFingerprint, DecodeError> {
    let image = image::load_from_memory(image_bytes)?;
    let luma = image.to_luma8();
    if luma.width() == 0 || luma.height() == 0 {
        return Err(DecodeError::EmptyImage);
    }

    let cells = reduce_box(&luma);
    Ok(average_hash(&cells))
}

/// Area-average the image down to 8x8, discarding aspect ratio.
///
/// Each output cell covers at least one source pixel, so images narrower or
/// shorter than eight pixels repeat source pixels instead of failing.
fn reduce_box(luma: &GrayImage) -> [u8; 64] {
    let (width, height) = luma.dimensions();
    let mut cells = [0u8; 64];

    for cy in 0..REDUCED_SIZE {
        let (y0, y1) = cell_span(cy, height);
        for cx in 0..REDUCED_SIZE {
            let (x0, x1) = cell_span(cx, width);

            let mut sum: u64 = 0;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += u64::from(luma.get_pixel(x, y)[0]);
                }
            }
            let count = u64::from((x1 - x0) * (y1 - y0));
            cells[(cy * REDUCED_SIZE + cx) as usize] = ((sum + count / 2) / count) as u8;
        }
    }

    cells
}

fn cell_span(cell: u32, extent: u32) -> (u32, u32) {
    let start = (u64::from(cell) * u64::from(extent) / u64::from(REDUCED_SIZE)) as u32;
    let end = (u64::from(cell + 1) * u64::from(extent) / u64::from(REDUCED_SIZE)) as u32;
    (start, end.max(start + 1))
}

fn average_hash(cells: &[u8; 64]) -> ImageFingerprint {
    let sum: u32 = cells.iter().map(|&v| u32::from(v)).sum();
    let mean = f64::from(sum) / cells.len() as f64;

    let bits = cells
        .iter()
        .fold(0u64, |acc, &v| (acc << 1) | u64::from(f64::from(v) > mean));
    ImageFingerprint(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn gray_png(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)]));
        encode_png(DynamicImage::ImageLuma8(img))
    }

    #[test]
    fn test_left_dark_right_light() {
        let bytes = gray_png(8, 8, |x, _| if x < 4 { 0 } else { 255 });
        let fp = compute_fingerprint(&bytes).unwrap();
        assert_eq!(fp.to_string(), "0f0f0f0f0f0f0f0f");
    }

    #[test]
    fn test_top_half_light_is_msb_first() {
        let bytes = gray_png(16, 16, |_, y| if y < 8 { 255 } else { 0 });
        let fp = compute_fingerprint(&bytes).unwrap();
        assert_eq!(fp.to_string(), "ffffffff00000000");
    }

    #[test]
    fn test_uniform_image_has_no_bits_set() {
        // No pixel is strictly brighter than the mean
        let bytes = gray_png(32, 20, |_, _| 128);
        let fp = compute_fingerprint(&bytes).unwrap();
        assert_eq!(fp.to_string(), "0000000000000000");
    }

    #[test]
    fn test_single_bright_corner() {
        let bytes = gray_png(8, 8, |x, y| if x == 0 && y == 0 { 200 } else { 10 });
        let fp = compute_fingerprint(&bytes).unwrap();
        assert_eq!(fp.bits(), 1u64 << 63);
        assert_eq!(fp.to_string(), "8000000000000000");
    }

    #[test]
    fn test_aspect_ratio_is_discarded() {
        let wide = gray_png(64, 8, |x, _| if x < 32 { 0 } else { 255 });
        let square = gray_png(8, 8, |x, _| if x < 4 { 0 } else { 255 });
        assert_eq!(
            compute_fingerprint(&wide).unwrap(),
            compute_fingerprint(&square).unwrap()
        );
    }

    #[test]
    fn test_image_smaller_than_reduction() {
        let bytes = gray_png(2, 2, |x, _| if x == 0 { 0 } else { 255 });
        let fp = compute_fingerprint(&bytes).unwrap();
        assert_eq!(fp.to_string(), "0f0f0f0f0f0f0f0f");
    }

    #[test]
    fn test_color_image_uses_luminance() {
        let img = RgbImage::from_fn(8, 8, |_, y| {
            if y < 4 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 40]) }
        });
        let bytes = encode_png(DynamicImage::ImageRgb8(img));
        let fp = compute_fingerprint(&bytes).unwrap();
        assert_eq!(fp.to_string(), "ffffffff00000000");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let bytes = gray_png(37, 23, |x, y| ((x * 7 + y * 13) % 256) as u8);
        let first = compute_fingerprint(&bytes).unwrap();
        let second = compute_fingerprint(&bytes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string().len(), FINGERPRINT_HEX_LEN);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let result = compute_fingerprint(b"definitely not an image");
        assert!(matches!(result, Err(DecodeError::Image(_))));
    }

    #[test]
    fn test_hex_round_trip_keeps_leading_zeros() {
        let fp: ImageFingerprint = "000000000000abcd".parse().unwrap();
        assert_eq!(fp.bits(), 0xabcd);
        assert_eq!(fp.to_string(), "000000000000abcd");
    }

    #[test]
    fn test_parse_rejects_wrong_width() {
        assert_eq!(
            "00ff".parse::<ImageFingerprint>(),
            Err(FingerprintParseError::InvalidLength { length: 4 })
        );
        assert!("00ff00ff00ff00ff00".parse::<ImageFingerprint>().is_err());
        assert!("+0ff00ff00ff00ff".parse::<ImageFingerprint>().is_err());
        assert!("zzff00ff00ff00ff".parse::<ImageFingerprint>().is_err());
    }

    #[test]
    fn test_hamming_distance_properties() {
        let samples = [0u64, u64::MAX, 0x00ff00ff00ff00ff, 0x8000000000000001, 0x123456789abcdef0];
        for &a in &samples {
            let a = ImageFingerprint(a);
            assert_eq!(a.hamming_distance(&a), 0);
            for &b in &samples {
                let b = ImageFingerprint(b);
                let d = a.hamming_distance(&b);
                assert_eq!(d, b.hamming_distance(&a));
                assert!(d <= 64);
            }
        }
        assert_eq!(ImageFingerprint(0).hamming_distance(&ImageFingerprint(u64::MAX)), 64);
    }

    #[test]
    fn test_hamming_distance_hex() {
        assert_eq!(hamming_distance_hex("00ff00ff00ff00ff", "00ff00ff00ff00fe"), Some(1));
        assert_eq!(hamming_distance_hex("00ff00ff00ff00ff", "00ff00ff"), None);
        assert_eq!(hamming_distance_hex("not-a-hash", "00ff00ff00ff00ff"), None);
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let fp = ImageFingerprint(0x00ff00ff00ff00ff);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"00ff00ff00ff00ff\"");
        let back: ImageFingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}
