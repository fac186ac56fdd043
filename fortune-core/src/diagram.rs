//! Diagram storage: vertices, edges, halfedges and cells.

use crate::site::Position;

/// Index into [`Diagram::edges`]
pub type EdgeId = usize;
/// Index into [`Diagram::vertices`]
pub type VertexId = usize;

/// Bisector segment between two cells, or a border segment of one cell.
///
/// Walking from `va` to `vb` keeps the `l_site` cell on the left. Border
/// edges, synthesized when closing cells against the clip rectangle, have no
/// `r_site`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub l_site: usize,
    pub r_site: Option<usize>,
    pub va: Option<VertexId>,
    pub vb: Option<VertexId>,
}

impl Edge {
    pub(crate) fn new(l_site: usize, r_site: Option<usize>) -> Self {
        Self {
            l_site,
            r_site,
            va: None,
            vb: None,
        }
    }

    pub fn is_border(&self) -> bool {
        self.r_site.is_none()
    }

    /// Both endpoints, once the edge is fully determined
    pub fn endpoints(&self) -> Option<(VertexId, VertexId)> {
        Some((self.va?, self.vb?))
    }
}

/// An edge as seen from one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halfedge {
    /// Owning cell
    pub site: usize,
    pub edge: EdgeId,
    /// Sort key giving the cell's boundary its winding
    pub angle: f64,
}

impl Halfedge {
    /// Halfedge of `site` on the bisector shared with `other`; the angle is
    /// the direction from one site to the other.
    pub(crate) fn between(edge: EdgeId, site: usize, from: Position, to: Position) -> Self {
        Self {
            site,
            edge,
            angle: (to.y - from.y).atan2(to.x - from.x),
        }
    }

    /// Halfedge of a border edge running `va -> vb` with the cell on its left.
    pub(crate) fn border(edge: EdgeId, site: usize, va: Position, vb: Position) -> Self {
        Self {
            site,
            edge,
            angle: (vb.x - va.x).atan2(va.y - vb.y),
        }
    }

    /// Vertex where this halfedge starts when walking the cell boundary
    pub fn start(&self, edges: &[Edge]) -> Option<VertexId> {
        let edge = &edges[self.edge];
        if edge.l_site == self.site {
            edge.va
        } else {
            edge.vb
        }
    }

    /// Vertex where this halfedge ends when walking the cell boundary
    pub fn end(&self, edges: &[Edge]) -> Option<VertexId> {
        let edge = &edges[self.edge];
        if edge.l_site == self.site {
            edge.vb
        } else {
            edge.va
        }
    }
}

/// The Voronoi region of one site.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub site: Position,
    /// Index of the owning site in the slice given to `compute`
    pub site_index: usize,
    /// Boundary in walking order (descending angle) once computed
    pub halfedges: Vec<Halfedge>,
    /// Set while the cell still needs border edges from the clip rectangle
    pub close_me: bool,
}

impl Cell {
    pub(crate) fn new(site_index: usize, site: Position) -> Self {
        Self {
            site,
            site_index,
            halfedges: Vec::new(),
            close_me: false,
        }
    }

    /// Drop halfedges whose edge lost an endpoint, then sort the rest by
    /// descending angle. Returns the number of halfedges left.
    pub(crate) fn prepare_halfedges(&mut self, edges: &[Edge]) -> usize {
        self.halfedges
            .retain(|h| edges[h.edge].endpoints().is_some());
        self.halfedges
            .sort_by(|a, b| b.angle.partial_cmp(&a.angle).unwrap_or(std::cmp::Ordering::Equal));
        self.halfedges.len()
    }
}

/// Axis-aligned bounds of a cell polygon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Where a point lies relative to a cell polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    OnBoundary,
    Outside,
}

/// Result of a Voronoi computation.
///
/// `cells[i]` belongs to the site whose `voronoi_id` is `Some(i)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub cells: Vec<Cell>,
    pub edges: Vec<Edge>,
    pub vertices: Vec<Position>,
}

impl Diagram {
    pub fn halfedge_start(&self, halfedge: &Halfedge) -> Option<Position> {
        halfedge.start(&self.edges).map(|v| self.vertices[v])
    }

    pub fn halfedge_end(&self, halfedge: &Halfedge) -> Option<Position> {
        halfedge.end(&self.edges).map(|v| self.vertices[v])
    }

    /// Closed boundary of a cell: the start point of every halfedge in order.
    pub fn cell_polygon(&self, cell: usize) -> Vec<Position> {
        self.cells[cell]
            .halfedges
            .iter()
            .filter_map(|h| self.halfedge_start(h))
            .collect()
    }

    /// Ids of the cells sharing an edge with `cell`
    pub fn neighbor_ids(&self, cell: usize) -> Vec<usize> {
        self.cells[cell]
            .halfedges
            .iter()
            .filter_map(|h| {
                let edge = &self.edges[h.edge];
                if edge.l_site != cell {
                    Some(edge.l_site)
                } else {
                    edge.r_site.filter(|&r| r != cell)
                }
            })
            .collect()
    }

    /// Bounding box of a cell polygon
    pub fn cell_bbox(&self, cell: usize) -> CellBounds {
        let (mut xmin, mut ymin) = (f64::INFINITY, f64::INFINITY);
        let (mut xmax, mut ymax) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in self.cell_polygon(cell) {
            xmin = xmin.min(p.x);
            ymin = ymin.min(p.y);
            xmax = xmax.max(p.x);
            ymax = ymax.max(p.y);
        }
        CellBounds {
            x: xmin,
            y: ymin,
            width: xmax - xmin,
            height: ymax - ymin,
        }
    }

    /// Locate `(x, y)` against a cell polygon.
    ///
    /// Relies on the cell being convex and wound by its halfedges, so one
    /// side test per boundary segment suffices.
    pub fn point_intersection(&self, cell: usize, x: f64, y: f64) -> PointLocation {
        for h in self.cells[cell].halfedges.iter().rev() {
            let (Some(p0), Some(p1)) = (self.halfedge_start(h), self.halfedge_end(h)) else {
                continue;
            };
            let r = (y - p0.y) * (p1.x - p0.x) - (x - p0.x) * (p1.y - p0.y);
            if r == 0.0 {
                return PointLocation::OnBoundary;
            }
            if r > 0.0 {
                return PointLocation::Outside;
            }
        }
        PointLocation::Inside
    }
}
