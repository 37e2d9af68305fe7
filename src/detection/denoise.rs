//! Non-local means denoising for grayscale images.
//!
//! Every pixel becomes a weighted mean of the pixels in its search window,
//! weighted by how similar the patch around each candidate is to the patch
//! around the pixel itself. Patch distances are taken from one integral image
//! per search offset, so the cost does not grow with the patch size.

use image::{GrayImage, Luma};

/// Weights below this contribute nothing
const MIN_WEIGHT: f32 = 0.001;

/// Denoise `image` with filter strength `strength`; `patch_size` and
/// `search_size` are window sides and are rounded down to odd values.
pub fn nl_means(image: &GrayImage, strength: f32, patch_size: u32, search_size: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || strength <= 0.0 {
        return image.clone();
    }

    let pr = (patch_size / 2) as usize;
    let sr = (search_size / 2) as usize;
    let patch_area = ((2 * pr + 1) * (2 * pr + 1)) as f32;
    let h2 = strength * strength;

    let w = width as usize;
    let h = height as usize;
    let pad = pr + sr;
    let pw = w + 2 * pad;
    let ph = h + 2 * pad;

    let mut padded = vec![0i32; pw * ph];
    for py in 0..ph {
        let sy = reflect(py as i64 - pad as i64, h);
        for px in 0..pw {
            let sx = reflect(px as i64 - pad as i64, w);
            padded[py * pw + px] = image.get_pixel(sx as u32, sy as u32)[0] as i32;
        }
    }

    // Squared differences live on the pixel grid grown by the patch radius
    let dw = w + 2 * pr;
    let dh = h + 2 * pr;
    let mut integral = vec![0u64; (dw + 1) * (dh + 1)];
    let mut sums = vec![0f32; w * h];
    let mut weights = vec![0f32; w * h];

    let span = 2 * sr as i64 + 1;
    for oy in 0..span {
        for ox in 0..span {
            let dy = oy - sr as i64;
            let dx = ox - sr as i64;

            for v in 0..dh {
                let mut row = 0u64;
                let base = (v + sr) * pw + sr;
                let shifted = ((v + sr) as i64 + dy) as usize * pw;
                for u in 0..dw {
                    let a = padded[base + u];
                    let b = padded[shifted + ((u + sr) as i64 + dx) as usize];
                    let diff = (a - b) as i64;
                    row += (diff * diff) as u64;
                    integral[(v + 1) * (dw + 1) + u + 1] = integral[v * (dw + 1) + u + 1] + row;
                }
            }

            let side = 2 * pr + 1;
            for y in 0..h {
                for x in 0..w {
                    let top = y * (dw + 1);
                    let bottom = (y + side) * (dw + 1);
                    let distance = integral[bottom + x + side] + integral[top + x]
                        - integral[top + x + side]
                        - integral[bottom + x];

                    let weight = (-(distance as f32 / patch_area) / h2).exp();
                    if weight < MIN_WEIGHT {
                        continue;
                    }

                    let ny = ((y + pad) as i64 + dy) as usize;
                    let nx = ((x + pad) as i64 + dx) as usize;
                    sums[y * w + x] += weight * padded[ny * pw + nx] as f32;
                    weights[y * w + x] += weight;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let idx = y as usize * w + x as usize;
        Luma([(sums[idx] / weights[idx]).round().clamp(0.0, 255.0) as u8])
    })
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge
fn reflect(index: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let folded = index.rem_euclid(period);
    if folded >= len as i64 {
        (period - folded) as usize
    } else {
        folded as usize
    }
}
