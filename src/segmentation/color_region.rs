use image::{GrayImage, Luma, RgbImage};
use log::debug;

use super::{ImageRegion, Prompt, SegmentationAdapter};
use crate::error::{EngineError, EngineResult};
use crate::geometry::raster::{MASK_THRESHOLD, mask_to_polygons};
use crate::geometry::{Point, Polygon};

/// Segments by colour similarity: a region is every 4-connected pixel whose
/// channels all lie within `tolerance` of the seed colour.
///
/// Useful on flat-background scans and as a stand-in model in tests.
#[derive(Debug, Clone)]
pub struct ColorRegionAdapter {
    pub tolerance: u8,
    /// Regions smaller than this are ignored by `segment_all`
    pub min_pixels: usize,
}

impl Default for ColorRegionAdapter {
    fn default() -> Self {
        Self {
            tolerance: 24,
            min_pixels: 100,
        }
    }
}

impl ColorRegionAdapter {
    pub fn new(tolerance: u8, min_pixels: usize) -> Self {
        Self {
            tolerance,
            min_pixels,
        }
    }

    fn regions_to_polygons(&self, region: &ImageRegion, pixels: &[u32]) -> Vec<Polygon> {
        let width = region.width();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
        for &idx in pixels {
            let (x, y) = (idx % width, idx / width);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if pixels.is_empty() {
            return Vec::new();
        }
        let mut mask = GrayImage::new(max_x - min_x + 1, max_y - min_y + 1);
        for &idx in pixels {
            mask.put_pixel(idx % width - min_x, idx / width - min_y, Luma([255]));
        }
        let origin = region.origin + Point::new(min_x as f64, min_y as f64);
        mask_to_polygons(&mask, origin)
    }
}

impl SegmentationAdapter for ColorRegionAdapter {
    fn segment(
        &self,
        region: &ImageRegion,
        prompt: &Prompt,
        progress: &dyn Fn(u8),
    ) -> EngineResult<Vec<Polygon>> {
        progress(10);
        let image = region.pixels.as_ref();
        let mut visited = vec![false; image.len() / 3];
        let pixels = match prompt {
            Prompt::Point(point) => {
                let Some((x, y)) = region.pixel_at(*point) else {
                    return Ok(Vec::new());
                };
                let target = image.get_pixel(x, y).0;
                flood(image, [y * image.width() + x], target, self.tolerance, &mut visited)
            }
            Prompt::Mask(mask) => {
                if mask.dimensions() != image.dimensions() {
                    return Err(EngineError::Segmentation(format!(
                        "mask is {:?} but region is {:?}",
                        mask.dimensions(),
                        image.dimensions()
                    )));
                }
                let Some(target) = mean_color(image, mask) else {
                    return Ok(Vec::new());
                };
                let seeds: Vec<u32> = mask
                    .enumerate_pixels()
                    .filter(|(x, y, m)| {
                        m[0] >= MASK_THRESHOLD && within(image.get_pixel(*x, *y).0, target, self.tolerance)
                    })
                    .map(|(x, y, _)| y * image.width() + x)
                    .collect();
                flood(image, seeds, target, self.tolerance, &mut visited)
            }
        };
        progress(80);

        let mut candidates = self.regions_to_polygons(region, &pixels);
        candidates.sort_by(|a, b| b.area().total_cmp(&a.area()));
        progress(100);
        Ok(candidates)
    }

    fn segment_all(&self, region: &ImageRegion, progress: &dyn Fn(u8)) -> EngineResult<Vec<Polygon>> {
        progress(10);
        let image = region.pixels.as_ref();
        let (width, height) = image.dimensions();
        let mut visited = vec![false; image.len() / 3];
        let mut candidates = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let idx = y * width + x;
                if visited[idx as usize] {
                    continue;
                }
                let target = image.get_pixel(x, y).0;
                let pixels = flood(image, [idx], target, self.tolerance, &mut visited);
                // Regions touching every edge are background
                if pixels.len() >= self.min_pixels && !touches_every_edge(&pixels, width, height) {
                    candidates.extend(self.regions_to_polygons(region, &pixels));
                }
            }
            if height > 0 {
                progress((10 + 70 * (y + 1) / height) as u8);
            }
        }

        candidates.sort_by(|a, b| b.area().total_cmp(&a.area()));
        debug!("colour segmentation found {} region(s)", candidates.len());
        progress(100);
        Ok(candidates)
    }
}

fn touches_every_edge(pixels: &[u32], width: u32, height: u32) -> bool {
    let (mut left, mut top, mut right, mut bottom) = (false, false, false, false);
    for &idx in pixels {
        let (x, y) = (idx % width, idx / width);
        left |= x == 0;
        top |= y == 0;
        right |= x + 1 == width;
        bottom |= y + 1 == height;
    }
    left && top && right && bottom
}

fn within(pixel: [u8; 3], target: [u8; 3], tolerance: u8) -> bool {
    pixel
        .iter()
        .zip(target.iter())
        .all(|(p, t)| p.abs_diff(*t) <= tolerance)
}

fn mean_color(image: &RgbImage, mask: &GrayImage) -> Option<[u8; 3]> {
    let (mut sum, mut count) = ([0u64; 3], 0u64);
    for (x, y, m) in mask.enumerate_pixels() {
        if m[0] >= MASK_THRESHOLD {
            let p = image.get_pixel(x, y).0;
            for c in 0..3 {
                sum[c] += p[c] as u64;
            }
            count += 1;
        }
    }
    (count > 0).then(|| sum.map(|s| (s / count) as u8))
}

/// Depth-first fill over flat pixel indices. `visited` doubles as the
/// claimed set, so pixels are never handed to two regions.
fn flood(
    image: &RgbImage,
    seeds: impl IntoIterator<Item = u32>,
    target: [u8; 3],
    tolerance: u8,
    visited: &mut [bool],
) -> Vec<u32> {
    let (width, height) = image.dimensions();
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    for seed in seeds {
        if !visited[seed as usize] {
            visited[seed as usize] = true;
            stack.push(seed);
        }
    }

    let mut filled = Vec::new();
    while let Some(idx) = stack.pop() {
        filled.push(idx);
        let (x, y) = (idx % width, idx / width);
        let mut visit = |nx: u32, ny: u32| {
            let ni = ny * width + nx;
            if !visited[ni as usize] && within(image.get_pixel(nx, ny).0, target, tolerance) {
                visited[ni as usize] = true;
                stack.push(ni);
            }
        };
        if x > 0 {
            visit(x - 1, y);
        }
        if x + 1 < width {
            visit(x + 1, y);
        }
        if y > 0 {
            visit(x, y - 1);
        }
        if y + 1 < height {
            visit(x, y + 1);
        }
    }
    filled
}
