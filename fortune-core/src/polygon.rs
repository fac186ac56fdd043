//! Polygon views of a computed diagram.

use crate::diagram::Diagram;
use crate::site::{Position, Site};

impl Diagram {
    /// Closed boundary of every cell.
    ///
    /// Without `order`, one polygon per cell in cell id order. With `order`,
    /// one polygon per given site, looked up through its `voronoi_id`; sites
    /// skipped as duplicates get an empty polygon.
    pub fn polygons(&self, order: Option<&[Site]>) -> Vec<Vec<Position>> {
        match order {
            Some(sites) => sites
                .iter()
                .map(|site| match site.voronoi_id {
                    Some(id) if id < self.cells.len() => self.cell_polygon(id),
                    _ => Vec::new(),
                })
                .collect(),
            None => (0..self.cells.len()).map(|id| self.cell_polygon(id)).collect(),
        }
    }
}

/// Drop points closer than `threshold` on both axes to the previously kept
/// point, then drop the last point if it is that close to the first.
pub fn filter_similar_points(polygon: &[Position], threshold: f64) -> Vec<Position> {
    let similar =
        |a: &Position, b: &Position| (a.x - b.x).abs() < threshold && (a.y - b.y).abs() < threshold;

    let mut filtered: Vec<Position> = Vec::with_capacity(polygon.len());
    for p in polygon {
        if filtered.last().map_or(true, |last| !similar(last, p)) {
            filtered.push(*p);
        }
    }
    if filtered.len() > 1 && similar(&filtered[0], &filtered[filtered.len() - 1]) {
        filtered.pop();
    }
    filtered
}
