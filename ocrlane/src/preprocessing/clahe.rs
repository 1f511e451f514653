//! Contrast-limited adaptive histogram equalization on a single 8-bit plane.
//!
//! The plane is split into a `rows x cols` grid. Each tile gets its own
//! equalization lookup table built from a clipped histogram; every pixel is
//! then mapped by bilinear interpolation between the four nearest tile tables
//! so tile seams do not show.

use image::{GrayImage, Luma};

use crate::error::{PipelineError, Result};

const BINS: usize = 256;

/// Equalize `plane` with the given clip limit and `(rows, cols)` tile grid.
///
/// A clip limit of `0.0` or less disables clipping (plain adaptive
/// equalization). The grid is shrunk to the plane size when the plane has
/// fewer pixels than tiles along an axis.
pub fn equalize(plane: &GrayImage, clip_limit: f32, tile_grid: (u32, u32)) -> Result<GrayImage> {
    let (rows, cols) = tile_grid;
    if rows == 0 || cols == 0 {
        return Err(PipelineError::InvalidParameter(format!(
            "CLAHE tile grid must be non-empty, got {rows}x{cols}"
        )));
    }
    if !clip_limit.is_finite() {
        return Err(PipelineError::InvalidParameter(format!(
            "CLAHE clip limit must be finite, got {clip_limit}"
        )));
    }

    let (w, h) = plane.dimensions();
    if w == 0 || h == 0 {
        return Ok(plane.clone());
    }

    let grid = TileGrid::new(w, h, rows.min(h), cols.min(w));
    let luts = build_luts(plane, &grid, clip_limit);

    Ok(interpolate(plane, &grid, &luts))
}

struct TileGrid {
    rows: u32,
    cols: u32,
    tile_w: f32,
    tile_h: f32,
    w: u32,
    h: u32,
}

impl TileGrid {
    fn new(w: u32, h: u32, rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            tile_w: w as f32 / cols as f32,
            tile_h: h as f32 / rows as f32,
            w,
            h,
        }
    }

    /// `[start, end)` of tile `index` along an axis of `len` split `count` ways.
    fn bounds(len: u32, count: u32, index: u32) -> (u32, u32) {
        let len = u64::from(len);
        let count = u64::from(count);
        let index = u64::from(index);
        ((index * len / count) as u32, ((index + 1) * len / count) as u32)
    }

    fn x_bounds(&self, col: u32) -> (u32, u32) {
        Self::bounds(self.w, self.cols, col)
    }

    fn y_bounds(&self, row: u32) -> (u32, u32) {
        Self::bounds(self.h, self.rows, row)
    }
}

fn build_luts(plane: &GrayImage, grid: &TileGrid, clip_limit: f32) -> Vec<[u8; BINS]> {
    let mut luts = Vec::with_capacity((grid.rows * grid.cols) as usize);

    for row in 0..grid.rows {
        let (y0, y1) = grid.y_bounds(row);
        for col in 0..grid.cols {
            let (x0, x1) = grid.x_bounds(col);

            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[plane.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let area = (x1 - x0) * (y1 - y0);
            if clip_limit > 0.0 {
                let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
                clip_histogram(&mut hist, limit);
            }

            luts.push(cumulative_lut(&hist, area));
        }
    }

    luts
}

/// Cap every bin at `limit` and spread the excess evenly, with any remainder
/// handed out at a fixed stride from the first bin.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / BINS as u32;
    let mut residual = excess - batch * BINS as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (BINS as u32 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

fn cumulative_lut(hist: &[u32; BINS], area: u32) -> [u8; BINS] {
    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Neighbouring tile indices and the weight of the second one for position
/// `pos` on an axis with tiles of `size` pixels.
fn neighbours(pos: u32, size: f32, count: u32) -> (usize, usize, f32) {
    let t = (pos as f32 + 0.5) / size - 0.5;
    let first = t.floor();
    let weight = t - first;
    let last = count as i64 - 1;
    let a = (first as i64).clamp(0, last) as usize;
    let b = (first as i64 + 1).clamp(0, last) as usize;
    (a, b, weight)
}

fn interpolate(plane: &GrayImage, grid: &TileGrid, luts: &[[u8; BINS]]) -> GrayImage {
    let cols = grid.cols as usize;
    let x_neighbours: Vec<_> = (0..grid.w)
        .map(|x| neighbours(x, grid.tile_w, grid.cols))
        .collect();

    let mut out = GrayImage::new(grid.w, grid.h);
    for y in 0..grid.h {
        let (r1, r2, wy) = neighbours(y, grid.tile_h, grid.rows);
        for x in 0..grid.w {
            let (c1, c2, wx) = x_neighbours[x as usize];
            let v = plane.get_pixel(x, y)[0] as usize;

            let top_left = f32::from(luts[r1 * cols + c1][v]);
            let top_right = f32::from(luts[r1 * cols + c2][v]);
            let bottom_left = f32::from(luts[r2 * cols + c1][v]);
            let bottom_right = f32::from(luts[r2 * cols + c2][v]);

            let top = top_left * (1.0 - wx) + top_right * wx;
            let bottom = bottom_left * (1.0 - wx) + bottom_right * wx;
            let value = top * (1.0 - wy) + bottom * wy;

            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}
