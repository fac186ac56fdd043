//! WASM bindings for fortune-core.
//!
//! Exposes a stateful `VoronoiEngine` that holds the bounding box and sites,
//! returning flat typed arrays for efficient JS interop.

use fortune_core::{BBox, Diagram, Position, Site, SiteCollection, Voronoi};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn positions_from_flat(flat: &[f64]) -> Vec<Position> {
    flat.chunks_exact(2)
        .map(|xy| Position::new(xy[0], xy[1]))
        .collect()
}

/// Result of a single Voronoi computation frame, one entry per site in
/// input order. All data is exposed as flat typed arrays.
#[wasm_bindgen]
pub struct VoronoiFrame {
    polygon_coords: Vec<f64>,
    polygon_offsets: Vec<u32>,
    neighbors: Vec<u32>,
    neighbor_offsets: Vec<u32>,
    cell_ids: Vec<i32>,
}

#[wasm_bindgen]
impl VoronoiFrame {
    /// Flat [x0,y0, x1,y1, ...] polygon vertices of every site, concatenated
    #[wasm_bindgen(getter)]
    pub fn polygon_coords(&self) -> Vec<f64> {
        self.polygon_coords.clone()
    }

    /// Site `i`'s polygon spans `polygon_coords[2*offsets[i] .. 2*offsets[i+1]]`
    /// (length = sites + 1)
    #[wasm_bindgen(getter)]
    pub fn polygon_offsets(&self) -> Vec<u32> {
        self.polygon_offsets.clone()
    }

    /// Neighbor site indices of every site, concatenated
    #[wasm_bindgen(getter)]
    pub fn neighbors(&self) -> Vec<u32> {
        self.neighbors.clone()
    }

    /// Site `i`'s neighbors span `neighbors[offsets[i] .. offsets[i+1]]`
    #[wasm_bindgen(getter)]
    pub fn neighbor_offsets(&self) -> Vec<u32> {
        self.neighbor_offsets.clone()
    }

    /// Cell id per site, -1 for sites dropped as duplicates
    #[wasm_bindgen(getter)]
    pub fn cell_ids(&self) -> Vec<i32> {
        self.cell_ids.clone()
    }

    /// One `Float64Array` of [x0,y0, ...] per site
    pub fn polygons(&self) -> js_sys::Array {
        let polygons = js_sys::Array::new();
        for w in self.polygon_offsets.windows(2) {
            let (start, end) = (2 * w[0] as usize, 2 * w[1] as usize);
            polygons.push(&js_sys::Float64Array::from(&self.polygon_coords[start..end]));
        }
        polygons
    }

    #[wasm_bindgen(getter)]
    pub fn site_count(&self) -> usize {
        self.cell_ids.len()
    }
}

impl VoronoiFrame {
    fn from_diagram(diagram: &Diagram, sites: &[Site]) -> Self {
        let mut polygon_coords = Vec::new();
        let mut polygon_offsets = Vec::with_capacity(sites.len() + 1);
        let mut neighbors = Vec::new();
        let mut neighbor_offsets = Vec::with_capacity(sites.len() + 1);
        polygon_offsets.push(0);
        neighbor_offsets.push(0);

        for (site, polygon) in sites.iter().zip(diagram.polygons(Some(sites))) {
            polygon_coords.extend(polygon.iter().flat_map(|p| [p.x, p.y]));
            polygon_offsets.push((polygon_coords.len() / 2) as u32);
            if let Some(id) = site.voronoi_id {
                neighbors.extend(
                    diagram
                        .neighbor_ids(id)
                        .into_iter()
                        .map(|n| diagram.cells[n].site_index as u32),
                );
            }
            neighbor_offsets.push(neighbors.len() as u32);
        }

        Self {
            polygon_coords,
            polygon_offsets,
            neighbors,
            neighbor_offsets,
            cell_ids: sites
                .iter()
                .map(|s| s.voronoi_id.map_or(-1, |id| id as i32))
                .collect(),
        }
    }
}

/// Stateful Voronoi computation engine.
/// Holds the bounding box and site collection, reusing diagram storage
/// between frames.
#[wasm_bindgen]
pub struct VoronoiEngine {
    voronoi: Voronoi,
    bbox: BBox,
    sites: SiteCollection,
}

#[wasm_bindgen]
impl VoronoiEngine {
    /// Create an engine for a `width` x `height` canvas.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, seed: u32) -> Self {
        Self {
            voronoi: Voronoi::new(),
            bbox: BBox::from_size(width, height),
            sites: SiteCollection::new(vec![], seed as u64),
        }
    }

    /// Replace the bounding box (e.g. on resize).
    pub fn set_bounds(&mut self, width: f64, height: f64) {
        self.bbox = BBox::from_size(width, height);
    }

    /// Initialize sites from flat [x0,y0, x1,y1, ...] positions.
    /// Velocities come from the seeded RNG.
    pub fn set_sites(&mut self, positions: &[f64], seed: u32) {
        let sites = positions_from_flat(positions)
            .into_iter()
            .map(Site::from)
            .collect();
        self.sites = SiteCollection::new(sites, seed as u64);
    }

    /// Replace the sites with `count` random ones.
    pub fn randomize(&mut self, count: usize, seed: u32) {
        self.sites = SiteCollection::random(count, &self.bbox, seed as u64);
    }

    pub fn add_site(&mut self, x: f64, y: f64) {
        self.sites.push(Site::new(x, y));
    }

    /// Compute the diagram of the current sites.
    pub fn compute(&mut self) -> VoronoiFrame {
        let diagram = self
            .voronoi
            .compute(&mut self.sites.sites, &self.bbox)
            .expect("Voronoi computation failed");
        let frame = VoronoiFrame::from_diagram(&diagram, &self.sites.sites);
        self.voronoi.recycle(diagram);
        frame
    }

    /// Advance sites along their velocities, bouncing off the box.
    pub fn step(&mut self, speed: f64, dt: f64) {
        self.sites.step(speed, dt, &self.bbox);
    }

    /// Get current site positions as flat [x0,y0, x1,y1, ...].
    pub fn get_positions(&self) -> Vec<f64> {
        self.sites.positions().iter()
            .flat_map(|p| [p.x, p.y])
            .collect()
    }

    /// Get current site velocities as flat [vx0,vy0, vx1,vy1, ...].
    pub fn get_velocities(&self) -> Vec<f64> {
        self.sites.velocities.iter()
            .flat_map(|v| [v.x, v.y])
            .collect()
    }

    /// Get current site count.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }
}

/// Simplify a flat [x0,y0, ...] polygon, merging points closer than
/// `threshold` on both axes.
#[wasm_bindgen]
pub fn filter_similar_points(polygon: &[f64], threshold: f64) -> Vec<f64> {
    fortune_core::filter_similar_points(&positions_from_flat(polygon), threshold)
        .iter()
        .flat_map(|p| [p.x, p.y])
        .collect()
}
