//! Valid-data footprint polygons.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::EPSILON;
use crate::geo::CrsDefinition;
use crate::raster::RasterBuffer;

/// Closed, counter-clockwise ring of `[lon, lat]` vertices plus its centroid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub ring: Vec<[f64; 2]>,
    pub centroid: Option<[f64; 2]>,
}

impl Footprint {
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        if self.ring.is_empty() {
            return None;
        }
        Some(self.ring.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |[x0, y0, x1, y1], [x, y]| [x0.min(*x), y0.min(*y), x1.max(*x), y1.max(*y)],
        ))
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let ring = &self.ring;
        let mut inside = false;
        for i in 1..ring.len() {
            let ([x0, y0], [x1, y1]) = (ring[i - 1], ring[i]);
            if (y0 > lat) != (y1 > lat) && lon < x0 + (lat - y0) / (y1 - y0) * (x1 - x0) {
                inside = !inside;
            }
        }
        inside
    }
}

/// Footprint of the valid pixels of `buffer` in geodetic degrees.
///
/// The hull is built from the outer corners of the first and last valid
/// pixel of every row, so nodata corners of the grid are cut away.
pub fn valid_data_footprint(buffer: &RasterBuffer) -> Footprint {
    let mask = buffer.valid_mask();
    let mut corners = Vec::new();
    for (row, line) in mask.rows().into_iter().enumerate() {
        let first = line.iter().position(|&v| v);
        let last = line.iter().rposition(|&v| v);
        if let (Some(c0), Some(c1)) = (first, last) {
            let (r0, r1) = (row as f64, row as f64 + 1.0);
            let (x0, x1) = (c0 as f64, c1 as f64 + 1.0);
            corners.extend([(x0, r0), (x0, r1), (x1, r0), (x1, r1)]);
        }
    }
    let hull = convex_hull(corners);
    if hull.len() < 3 {
        return Footprint::default();
    }

    let transformer = buffer
        .crs
        .as_deref()
        .and_then(|id| CrsDefinition::resolve(id).and_then(|d| d.transformer()).ok());
    let Some(transformer) = transformer else {
        warn!(crs = ?buffer.crs, "Footprint CRS cannot be resolved, leaving footprint empty");
        return Footprint::default();
    };

    let mut ring: Vec<[f64; 2]> = hull
        .iter()
        .filter_map(|&(col, row)| {
            let (x, y) = buffer.geotransform.apply(col, row);
            transformer.to_lon_lat(x, y).map(|(lon, lat)| [lon, lat])
        })
        .collect();
    if ring.len() < 3 {
        return Footprint::default();
    }
    if signed_area(&ring) < 0.0 {
        ring.reverse();
    }
    let centroid = polygon_centroid(&ring);
    ring.push(ring[0]);
    Footprint { ring, centroid }
}

/// Andrew's monotone chain; counter-clockwise in a y-up frame, no repeat of
/// the first vertex.
pub fn convex_hull(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }
    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace area of an open ring, positive when counter-clockwise.
fn signed_area(ring: &[[f64; 2]]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let ([x0, y0], [x1, y1]) = (ring[i], ring[(i + 1) % n]);
            x0 * y1 - x1 * y0
        })
        .sum::<f64>()
        / 2.0
}

fn polygon_centroid(ring: &[[f64; 2]]) -> Option<[f64; 2]> {
    let n = ring.len();
    if n == 0 {
        return None;
    }
    let area = signed_area(ring);
    if area.abs() < EPSILON {
        let [sx, sy] = ring.iter().fold([0.0, 0.0], |[sx, sy], [x, y]| [sx + x, sy + y]);
        return Some([sx / n as f64, sy / n as f64]);
    }
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let ([x0, y0], [x1, y1]) = (ring[i], ring[(i + 1) % n]);
        let f = x0 * y1 - x1 * y0;
        cx += (x0 + x1) * f;
        cy += (y0 + y1) * f;
    }
    Some([cx / (6.0 * area), cy / (6.0 * area)])
}
