//! Conversions between polygons and binary masks, for segmentation adapters
//! that consume coarse mask prompts or produce per-pixel masks.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use log::debug;

use super::{MultiPolygon, Point, Polygon, Ring};

/// Mask values at or above this count as foreground.
pub const MASK_THRESHOLD: u8 = 128;

/// Traced vertices lie on a pixel grid, so only exact collinear runs merge.
const PIXEL_TOLERANCE: f64 = 1e-6;

/// Rasterizes `polygon` into a `width` x `height` mask whose top-left pixel
/// sits at `origin` in image space. A pixel is set when its centre is inside.
pub fn polygon_to_mask(polygon: &Polygon, origin: Point, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let mut crossings: Vec<f64> = Vec::new();
    for row in 0..height {
        let y = origin.y + row as f64 + 0.5;
        crossings.clear();
        for ring in polygon.rings() {
            for (a, b) in ring.edges() {
                if (a.y <= y) != (b.y <= y) {
                    let t = (y - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);
        for span in crossings.chunks_exact(2) {
            // Pixel centres x + 0.5 inside [span[0], span[1])
            let first = (span[0] - origin.x - 0.5).ceil().max(0.0);
            let last = (span[1] - origin.x - 0.5).ceil().min(width as f64);
            let (first, last) = (first as u32, last as u32);
            for col in first..last {
                mask.put_pixel(col, row, Luma([255]));
            }
        }
    }
    mask
}

/// Traces every 8-connected foreground region of `mask` with Suzuki-Abe
/// border following, offset by `origin`.
///
/// Outlines run through the centres of the region's border pixels, so a
/// filled `w` x `h` block becomes a `(w - 1)` x `(h - 1)` rectangle and
/// regions one pixel thin have no area and are skipped. Enclosed background
/// becomes holes. Regions come back in row-major discovery order.
pub fn mask_to_polygons(mask: &GrayImage, origin: Point) -> MultiPolygon {
    let binary = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] >= MASK_THRESHOLD {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let contours: Vec<Contour<u32>> = find_contours(&binary);
    let to_ring = |contour: &Contour<u32>| {
        let points = contour
            .points
            .iter()
            .map(|p| origin + Point::new(p.x as f64 + 0.5, p.y as f64 + 0.5))
            .collect();
        Ring::new(points).cleaned(PIXEL_TOLERANCE)
    };

    // Contour index of each outer border -> position in `polygons`
    let mut outers: HashMap<usize, usize> = HashMap::new();
    let mut polygons: Vec<(Ring, Vec<Ring>)> = Vec::new();
    for (index, contour) in contours.iter().enumerate() {
        match contour.border_type {
            BorderType::Outer => {
                let ring = to_ring(contour);
                if ring.len() >= 3 && ring.area() > 0.0 {
                    outers.insert(index, polygons.len());
                    polygons.push((ring, Vec::new()));
                }
            }
            BorderType::Hole => {
                let Some(&slot) = contour.parent.and_then(|parent| outers.get(&parent)) else {
                    continue;
                };
                let ring = to_ring(contour);
                if ring.len() >= 3 && ring.area() > 0.0 {
                    polygons[slot].1.push(ring);
                }
            }
        }
    }
    debug!("traced {} region(s) from {} contour(s)", polygons.len(), contours.len());
    polygons
        .into_iter()
        .map(|(outer, holes)| Polygon::new(outer, holes))
        .collect()
}
