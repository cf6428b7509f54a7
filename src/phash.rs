//! Perceptual image hash used as password material for level keys.
//!
//! The signature is gradient-based: a 16:9 window centered on the image is
//! cut into a 6×6 grid of overlapping sample patches, each patch reduced
//! to a weighted luminance mean, and adjacent means compared horizontally
//! and vertically. 50 comparison bits, zero-padded to 18 bytes.
//!
//! The top-right grid cell (x=5, y=0) is skipped. The comparison passes
//! read rows 1..=5 horizontally and columns 0..=4 vertically, so that cell
//! is the one patch neither pass touches; skipping it keeps the sampled
//! region a clean 5×5 gradient grid.

use image::RgbaImage;

use crate::error::BuildError;

/// Digest length: 50 gradient bits zero-padded to 144 bits.
pub const HASH_LEN: usize = 18;

/// Grid resolution across the 16:9 window.
const GRID: u32 = 6;

/// Patch overlap: each cell is expanded by this fraction of a cell on
/// every side before sampling.
const OVERLAP: f64 = 0.25;

/// Hash a decoded RGBA image into an 18-byte digest.
pub fn hash_image(img: &RgbaImage) -> Result<[u8; HASH_LEN], BuildError> {
    let (w, h) = img.dimensions();

    // Largest 16:9 window that fits, centered.
    let (win_w, win_h) = if 9 * w as u64 > 16 * h as u64 {
        (h * 16 / 9, h)
    } else {
        (w, w * 9 / 16)
    };
    if win_w == 0 || win_h == 0 {
        return Err(BuildError::Image(format!(
            "degenerate dimensions {w}x{h}: 16:9 window is empty"
        )));
    }
    let x0 = (w - win_w) / 2;
    let y0 = (h - win_h) / 2;

    let gray = sample_grid(img, x0, y0, win_w, win_h);

    // Horizontal pass: rows 1..=5, comparing each patch to its right
    // neighbor. Vertical pass: columns 0..=4, comparing each patch to the
    // one below. 25 bits each, packed MSB-first.
    let mut out = [0u8; HASH_LEN];
    let mut bit = 0usize;
    let mut push = |cond: bool| {
        if cond {
            out[bit / 8] |= 0x80 >> (bit % 8);
        }
        bit += 1;
    };
    for y in 0..5 {
        for x in 0..5 {
            push(gray[x][y + 1] < gray[x + 1][y + 1]);
        }
    }
    for x in 0..5 {
        for y in 0..5 {
            push(gray[x][y] < gray[x][y + 1]);
        }
    }

    Ok(out)
}

/// Mean weighted luminance (3R + 5G + 1B) per grid patch, indexed [x][y].
/// The skipped cell stays at 0 and is never read by the comparison passes.
fn sample_grid(img: &RgbaImage, x0: u32, y0: u32, win_w: u32, win_h: u32) -> [[f64; 6]; 6] {
    let cell_w = win_w as f64 / GRID as f64;
    let cell_h = win_h as f64 / GRID as f64;
    let mut gray = [[0f64; 6]; 6];

    for cy in 0..GRID {
        for cx in 0..GRID {
            if cx == 5 && cy == 0 {
                continue;
            }
            let min_x = clamp(x0 as f64 + (cx as f64 - OVERLAP) * cell_w, x0, x0 + win_w);
            let max_x = clamp(x0 as f64 + (cx as f64 + 1.0 + OVERLAP) * cell_w, x0, x0 + win_w);
            let min_y = clamp(y0 as f64 + (cy as f64 - OVERLAP) * cell_h, y0, y0 + win_h);
            let max_y = clamp(y0 as f64 + (cy as f64 + 1.0 + OVERLAP) * cell_h, y0, y0 + win_h);

            // Checkerboard sampling: every row, every second column, the
            // column phase alternating with row parity.
            let mut sum = 0u64;
            let mut count = 0u64;
            for y2 in min_y..max_y {
                let mut x2 = min_x + (y2 % 2);
                while x2 < max_x {
                    let p = img.get_pixel(x2, y2);
                    sum += 3 * p[0] as u64 + 5 * p[1] as u64 + p[2] as u64;
                    count += 1;
                    x2 += 2;
                }
            }
            if count > 0 {
                gray[cx as usize][cy as usize] = sum as f64 / count as f64;
            }
        }
    }

    gray
}

fn clamp(v: f64, lo: u32, hi: u32) -> u32 {
    (v.max(lo as f64).min(hi as f64)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Diagonal RGB gradient, distinct in both axes.
    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let r = (x * 255 / w.max(1)) as u8;
            let g = (y * 255 / h.max(1)) as u8;
            let b = ((x + y) * 255 / (w + h)) as u8;
            image::Rgba([r, g, b, 255])
        })
    }

    #[test]
    fn digest_is_deterministic() {
        let img = gradient(640, 360);
        let a = hash_image(&img).unwrap();
        let b = hash_image(&img).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_tail_is_zero_padding() {
        // 50 signal bits: bytes 7..18 carry at most the top 2 bits of byte 6.
        let digest = hash_image(&gradient(640, 360)).unwrap();
        for &b in &digest[7..] {
            assert_eq!(b, 0);
        }
        assert_eq!(digest[6] & 0x3f, 0);
    }

    #[test]
    fn gradient_direction_flips_bits() {
        let img = gradient(640, 360);
        let flipped = RgbaImage::from_fn(640, 360, |x, y| *img.get_pixel(639 - x, y));
        assert_ne!(hash_image(&img).unwrap(), hash_image(&flipped).unwrap());
    }

    #[test]
    fn cropping_to_window_is_invariant() {
        // 640×480 centers a 640×360 window at y0=60; even offsets keep the
        // checkerboard phase aligned with the standalone crop.
        let full = gradient(640, 480);
        let cropped = RgbaImage::from_fn(640, 360, |x, y| *full.get_pixel(x, y + 60));
        assert_eq!(hash_image(&full).unwrap(), hash_image(&cropped).unwrap());
    }

    #[test]
    fn wide_image_uses_pillarboxed_window() {
        // 1000×360: window is 640×360 centered at x0=180.
        let wide = gradient(1000, 360);
        let digest = hash_image(&wide).unwrap();
        assert_eq!(digest.len(), HASH_LEN);
    }

    #[test]
    fn degenerate_image_rejected() {
        // 1 pixel wide: the 16:9 window collapses to zero height.
        let tiny = RgbaImage::from_pixel(1, 4, image::Rgba([0, 0, 0, 255]));
        assert!(hash_image(&tiny).is_err());
    }
}
