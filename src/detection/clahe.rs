//! Contrast-limited adaptive histogram equalization.
//!
//! The image is split into a `grid x grid` set of tiles. Each tile gets its own
//! equalization table built from a clipped histogram, and every output pixel is
//! bilinearly blended from the tables of the four nearest tile centres.

use image::{GrayImage, Luma};

type Lut = [u8; 256];

/// Equalize `image` tile by tile. `clip_limit` is relative to a flat histogram
/// (1.0 means no bin may exceed the uniform count); values <= 0 disable clipping.
pub fn equalize_adaptive(image: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts: Vec<Lut> = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    let columns: Vec<(usize, usize, f32)> =
        (0..width).map(|x| neighbours(x, tile_w, tiles_x)).collect();
    let rows: Vec<(usize, usize, f32)> =
        (0..height).map(|y| neighbours(y, tile_h, tiles_y)).collect();
    let stride = tiles_x as usize;

    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = pixel[0] as usize;
        let (left, right, wx) = columns[x as usize];
        let (top, bottom, wy) = rows[y as usize];

        let tl = luts[top * stride + left][value] as f32;
        let tr = luts[top * stride + right][value] as f32;
        let bl = luts[bottom * stride + left][value] as f32;
        let br = luts[bottom * stride + right][value] as f32;

        let upper = tl * (1.0 - wx) + tr * wx;
        let lower = bl * (1.0 - wx) + br * wx;
        let blended = upper * (1.0 - wy) + lower * wy;

        output.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }

    output
}

/// Tile indices on either side of `pos` and the weight of the second one
fn neighbours(pos: u32, tile: u32, tiles: u32) -> (usize, usize, f32) {
    let centre = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if centre <= 0.0 {
        return (0, 0, 0.0);
    }

    let low = centre.floor() as u32;
    if low >= tiles - 1 {
        let last = (tiles - 1) as usize;
        return (last, last, 0.0);
    }

    (low as usize, low as usize + 1, centre - low as f32)
}

fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> Lut {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let bonus = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += bonus;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (value, bin) in hist.iter().enumerate() {
        cumulative += bin;
        lut[value] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}
