//! Core Voronoi diagram computation library.
//!
//! Builds the Voronoi diagram of a set of sites with Fortune's sweepline
//! algorithm, clips it to a rectangle and closes every cell into a convex
//! polygon.
//!
//! ```
//! use fortune_core::{BBox, Site, Voronoi};
//!
//! let mut sites = vec![Site::new(0.25, 0.5), Site::new(0.75, 0.5)];
//! let mut voronoi = Voronoi::new();
//! let diagram = voronoi.compute(&mut sites, &BBox::from_size(1.0, 1.0)).unwrap();
//! assert_eq!(diagram.cells.len(), 2);
//! let polygons = diagram.polygons(Some(&sites));
//! assert_eq!(polygons[0].len(), 4);
//! ```

mod beachline;
mod builder;
mod circle;
mod clip;
mod diagram;
mod geom;
mod polygon;
mod rbtree;
mod site;

pub use builder::Voronoi;
pub use diagram::{Cell, CellBounds, Diagram, Edge, EdgeId, Halfedge, PointLocation, VertexId};
pub use geom::{BBox, CIRCLE_EPSILON, EPSILON};
pub use polygon::filter_similar_points;
pub use site::{dedup_sites, quantize_sites, Position, Site, SiteCollection, Velocity};

/// Error type for Voronoi operations
#[derive(Debug, thiserror::Error)]
pub enum VoronoiError {
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Site {index} has a non-finite coordinate")]
    NonFiniteSite { index: usize },

    #[error("Cell {cell} cannot be closed against the bounding box")]
    UnclosableCell { cell: usize },
}

pub type Result<T> = std::result::Result<T, VoronoiError>;
