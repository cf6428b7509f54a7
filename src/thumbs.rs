//! Level thumbnails and the shared JPEG prefix.
//!
//! Every thumbnail is rendered with identical encoder settings, so the
//! JPEG header and quantization tables come out byte-identical across
//! levels. The longest common prefix is factored out of the bundle once
//! (`thumbnailHeader`) and each level secret only carries the tail.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::error::BuildError;

/// Thumbnail edge length in pixels.
const THUMB_SIZE: u32 = 64;

/// JPEG output quality (0–100).
const JPEG_QUALITY: u8 = 50;

/// Desaturation strength: each channel keeps 3/4 of itself, 1/4 luma.
const DESAT_KEEP: u32 = 3;

/// Prefix search stops here; headers never get near this.
const PREFIX_CAP: usize = 1000;

/// Render a thumbnail source into its bundled JPEG form:
/// 64×64 bilinear resize, 25% desaturation, quality 50.
pub fn render_thumbnail(source: &DynamicImage) -> Result<Vec<u8>, BuildError> {
    let mut rgb = image::imageops::resize(
        &source.to_rgb8(),
        THUMB_SIZE,
        THUMB_SIZE,
        FilterType::Triangle,
    );
    for p in rgb.pixels_mut() {
        let [r, g, b] = p.0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        p.0 = [desat(r, luma), desat(g, luma), desat(b, luma)];
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .write_image(rgb.as_raw(), THUMB_SIZE, THUMB_SIZE, ExtendedColorType::Rgb8)
        .map_err(|e| BuildError::Image(format!("JPEG encode: {e}")))?;
    Ok(out)
}

fn desat(c: u8, luma: u32) -> u8 {
    ((DESAT_KEEP * c as u32 + luma) / 4) as u8
}

/// Length of the longest byte prefix shared by all thumbnails, capped at
/// [`PREFIX_CAP`]. Thumbnails disagreeing in byte 0 yield 0 — an empty
/// header, with every tail carrying the full JPEG.
pub fn common_prefix_len(thumbs: &[Vec<u8>]) -> usize {
    let Some(first) = thumbs.first() else {
        return 0;
    };
    let mut cap = first.len().min(PREFIX_CAP);
    for t in thumbs {
        cap = cap.min(t.len());
    }
    for i in 0..cap {
        if thumbs.iter().any(|t| t[i] != first[i]) {
            return i;
        }
    }
    cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn source(seed: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(128, 96, |x, y| {
            image::Rgba([
                (x as u8).wrapping_mul(seed),
                (y as u8).wrapping_add(seed),
                seed,
                255,
            ])
        }))
    }

    #[test]
    fn render_is_deterministic() {
        let img = source(3);
        assert_eq!(render_thumbnail(&img).unwrap(), render_thumbnail(&img).unwrap());
    }

    #[test]
    fn renders_valid_jpeg() {
        let jpeg = render_thumbnail(&source(5)).unwrap();
        assert_eq!(&jpeg[..2], &[0xff, 0xd8]); // SOI
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), THUMB_SIZE);
        assert_eq!(decoded.height(), THUMB_SIZE);
    }

    #[test]
    fn distinct_sources_share_a_header() {
        let a = render_thumbnail(&source(3)).unwrap();
        let b = render_thumbnail(&source(200)).unwrap();
        let n = common_prefix_len(&[a.clone(), b.clone()]);
        // Same dimensions and quality: at least SOI + quant tables match.
        assert!(n > 2, "prefix only {n} bytes");
        assert_eq!(a[..n], b[..n]);
    }

    #[test]
    fn prefix_reassembly_is_exact() {
        let thumbs: Vec<Vec<u8>> = [3u8, 90, 200]
            .iter()
            .map(|&s| render_thumbnail(&source(s)).unwrap())
            .collect();
        let n = common_prefix_len(&thumbs);
        let header = &thumbs[0][..n];
        for t in &thumbs {
            let mut rebuilt = header.to_vec();
            rebuilt.extend_from_slice(&t[n..]);
            assert_eq!(&rebuilt, t);
        }
    }

    #[test]
    fn prefix_respects_cap_and_divergence() {
        assert_eq!(common_prefix_len(&[]), 0);
        assert_eq!(common_prefix_len(&[vec![1, 2, 3]]), 3);
        assert_eq!(common_prefix_len(&[vec![1, 2], vec![2, 2]]), 0);
        assert_eq!(common_prefix_len(&[vec![1, 2, 3], vec![1, 2]]), 2);
        let long = vec![0u8; 4000];
        assert_eq!(common_prefix_len(&[long.clone(), long]), PREFIX_CAP);
    }
}
