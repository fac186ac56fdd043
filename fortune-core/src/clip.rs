//! Clipping the swept edge graph to the bounding box and closing every cell
//! into a polygon along the box border.

use log::trace;

use crate::builder::Voronoi;
use crate::diagram::{EdgeId, Halfedge, VertexId};
use crate::geom::{eq_eps, gt_eps, lt_eps, BBox, EPSILON};
use crate::site::Position;
use crate::{Result, VoronoiError};

/// Box sides in the order the closer walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Bottom,
    Right,
    Top,
}

impl Side {
    const WALK: [Side; 4] = [Side::Left, Side::Bottom, Side::Right, Side::Top];

    /// Side an open boundary point sits on, scanning in walk order.
    fn of(p: Position, bbox: &BBox) -> Option<Side> {
        if eq_eps(p.x, bbox.xl) && lt_eps(p.y, bbox.yb) {
            Some(Side::Left)
        } else if eq_eps(p.y, bbox.yb) && lt_eps(p.x, bbox.xr) {
            Some(Side::Bottom)
        } else if eq_eps(p.x, bbox.xr) && gt_eps(p.y, bbox.yt) {
            Some(Side::Right)
        } else if eq_eps(p.y, bbox.yt) && gt_eps(p.x, bbox.xl) {
            Some(Side::Top)
        } else {
            None
        }
    }

    /// Whether `target` lies on this side, ending the walk here
    fn reaches(self, target: Position, bbox: &BBox) -> bool {
        match self {
            Side::Left => eq_eps(target.x, bbox.xl),
            Side::Bottom => eq_eps(target.y, bbox.yb),
            Side::Right => eq_eps(target.x, bbox.xr),
            Side::Top => eq_eps(target.y, bbox.yt),
        }
    }

    /// Where the border segment along this side stops: at `target` when the
    /// walk ends here, else at the corner leading to the next side.
    fn segment_end(self, target: Position, last: bool, bbox: &BBox) -> (f64, f64) {
        match self {
            Side::Left => (bbox.xl, if last { target.y } else { bbox.yb }),
            Side::Bottom => (if last { target.x } else { bbox.xr }, bbox.yb),
            Side::Right => (bbox.xr, if last { target.y } else { bbox.yt }),
            Side::Top => (if last { target.x } else { bbox.xl }, bbox.yt),
        }
    }
}

impl Voronoi {
    /// Give a dangling edge a second endpoint on the box border, extending
    /// its bisector as a ray. Returns `false` if the ray misses the box.
    pub(crate) fn connect_edge(&mut self, edge_id: EdgeId, bbox: &BBox) -> bool {
        let edge = &self.edges[edge_id];
        if edge.vb.is_some() {
            return true;
        }
        let Some(r_site) = edge.r_site else {
            return true;
        };
        let l_site = edge.l_site;
        let mut va = edge.va;
        self.cells[l_site].close_me = true;
        self.cells[r_site].close_me = true;

        let BBox { xl, xr, yt, yb } = *bbox;
        let (l, r) = (self.sites[l_site], self.sites[r_site]);
        let (fx, fy) = ((l.x + r.x) / 2.0, (l.y + r.y) / 2.0);
        let start = |this: &Self, va: Option<VertexId>| va.map(|v| this.vertices[v]);

        let vb;
        if r.y == l.y {
            // Vertical bisector.
            if fx < xl || fx >= xr {
                return false;
            }
            if l.x > r.x {
                match start(self, va) {
                    Some(p) if p.y >= yt => {
                        if p.y >= yb {
                            return false;
                        }
                    }
                    _ => va = Some(self.create_vertex(fx, yt)),
                }
                vb = self.create_vertex(fx, yb);
            } else {
                match start(self, va) {
                    Some(p) if p.y <= yb => {
                        if p.y < yt {
                            return false;
                        }
                    }
                    _ => va = Some(self.create_vertex(fx, yb)),
                }
                vb = self.create_vertex(fx, yt);
            }
        } else {
            let fm = (l.x - r.x) / (r.y - l.y);
            let fb = fy - fm * fx;
            if !(-1.0..=1.0).contains(&fm) {
                // Closer to vertical: intersect with the top and bottom sides.
                if l.x > r.x {
                    match start(self, va) {
                        Some(p) if p.y >= yt => {
                            if p.y >= yb {
                                return false;
                            }
                        }
                        _ => va = Some(self.create_vertex((yt - fb) / fm, yt)),
                    }
                    vb = self.create_vertex((yb - fb) / fm, yb);
                } else {
                    match start(self, va) {
                        Some(p) if p.y <= yb => {
                            if p.y < yt {
                                return false;
                            }
                        }
                        _ => va = Some(self.create_vertex((yb - fb) / fm, yb)),
                    }
                    vb = self.create_vertex((yt - fb) / fm, yt);
                }
            } else if l.y < r.y {
                // Closer to horizontal: intersect with the left and right sides.
                match start(self, va) {
                    Some(p) if p.x >= xl => {
                        if p.x >= xr {
                            return false;
                        }
                    }
                    _ => va = Some(self.create_vertex(xl, fm * xl + fb)),
                }
                vb = self.create_vertex(xr, fm * xr + fb);
            } else {
                match start(self, va) {
                    Some(p) if p.x <= xr => {
                        if p.x < xl {
                            return false;
                        }
                    }
                    _ => va = Some(self.create_vertex(xr, fm * xr + fb)),
                }
                vb = self.create_vertex(xl, fm * xl + fb);
            }
        }

        let edge = &mut self.edges[edge_id];
        edge.va = va;
        edge.vb = Some(vb);
        true
    }

    /// Liang–Barsky clip of a connected edge against the box. Moved endpoints
    /// become new vertices. Returns `false` if the edge lies outside.
    pub(crate) fn clip_edge(&mut self, edge_id: EdgeId, bbox: &BBox) -> bool {
        let edge = &self.edges[edge_id];
        let (Some((va, vb)), Some(r_site)) = (edge.endpoints(), edge.r_site) else {
            return false;
        };
        let l_site = edge.l_site;
        let (a, b) = (self.vertices[va], self.vertices[vb]);
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

        // Each side as (p, q): the edge stays inside while p * t <= q.
        let sides = [
            (-dx, a.x - bbox.xl),
            (dx, bbox.xr - a.x),
            (-dy, a.y - bbox.yt),
            (dy, bbox.yb - a.y),
        ];
        for (p, q) in sides {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                // Entering.
                if r > t1 {
                    return false;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                // Leaving.
                if r < t0 {
                    return false;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }

        if t0 > 0.0 {
            let v = self.create_vertex(a.x + t0 * dx, a.y + t0 * dy);
            self.edges[edge_id].va = Some(v);
        }
        if t1 < 1.0 {
            let v = self.create_vertex(a.x + t1 * dx, a.y + t1 * dy);
            self.edges[edge_id].vb = Some(v);
        }
        if t0 > 0.0 || t1 < 1.0 {
            self.cells[l_site].close_me = true;
            self.cells[r_site].close_me = true;
        }
        true
    }

    /// Connect and clip every swept edge, dropping those that end up outside
    /// the box or shorter than `EPSILON`. Dropped edges lose both endpoints
    /// and are compacted away after the cells are closed.
    pub(crate) fn clip_edges(&mut self, bbox: &BBox) {
        for edge_id in (0..self.edges.len()).rev() {
            let keep = self.connect_edge(edge_id, bbox)
                && self.clip_edge(edge_id, bbox)
                && !self.is_degenerate(edge_id);
            if !keep {
                trace!("dropping edge {} outside the bounding box", edge_id);
                let edge = &mut self.edges[edge_id];
                edge.va = None;
                edge.vb = None;
            }
        }
    }

    fn is_degenerate(&self, edge_id: EdgeId) -> bool {
        match self.edges[edge_id].endpoints() {
            Some((va, vb)) => {
                let (a, b) = (self.vertices[va], self.vertices[vb]);
                (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
            }
            None => true,
        }
    }

    /// Close every open cell by walking the box border between consecutive
    /// halfedges whose endpoints do not meet.
    pub(crate) fn close_cells(&mut self, bbox: &BBox) -> Result<()> {
        for cell_id in (0..self.cells.len()).rev() {
            if self.cells[cell_id].prepare_halfedges(&self.edges) == 0 {
                let site = self.cells[cell_id].site;
                if bbox.contains(site.x, site.y) {
                    self.fill_rectangle(cell_id, bbox);
                }
                continue;
            }
            if !self.cells[cell_id].close_me {
                continue;
            }

            let mut n = self.cells[cell_id].halfedges.len();
            let mut i_left = 0;
            while i_left < n {
                let halfedges = &self.cells[cell_id].halfedges;
                let (Some(end), Some(next_start)) = (
                    halfedges[i_left].end(&self.edges),
                    halfedges[(i_left + 1) % n].start(&self.edges),
                ) else {
                    return Err(VoronoiError::UnclosableCell { cell: cell_id });
                };
                let mut va = end;
                let (start, target) = (self.vertices[va], self.vertices[next_start]);
                if (start.x - target.x).abs() >= EPSILON || (start.y - target.y).abs() >= EPSILON {
                    let first = Side::of(start, bbox)
                        .ok_or(VoronoiError::UnclosableCell { cell: cell_id })?;
                    let first = Side::WALK.iter().position(|&s| s == first).unwrap_or(0);
                    let mut closed = false;
                    // Any point on the border is reached within one lap.
                    for step in first..first + Side::WALK.len() {
                        let side = Side::WALK[step % 4];
                        let last = side.reaches(target, bbox);
                        let (x, y) = side.segment_end(target, last, bbox);
                        let vb = self.create_vertex(x, y);
                        self.insert_border_halfedge(cell_id, i_left + 1, va, vb);
                        i_left += 1;
                        n += 1;
                        if last {
                            closed = true;
                            break;
                        }
                        va = vb;
                    }
                    if !closed {
                        return Err(VoronoiError::UnclosableCell { cell: cell_id });
                    }
                }
                i_left += 1;
            }
            self.cells[cell_id].close_me = false;
        }
        Ok(())
    }

    /// Border the whole box around a cell that no bisector reaches.
    fn fill_rectangle(&mut self, cell_id: usize, bbox: &BBox) {
        let corners = [
            self.create_vertex(bbox.xl, bbox.yt),
            self.create_vertex(bbox.xl, bbox.yb),
            self.create_vertex(bbox.xr, bbox.yb),
            self.create_vertex(bbox.xr, bbox.yt),
        ];
        for i in 0..corners.len() {
            let len = self.cells[cell_id].halfedges.len();
            self.insert_border_halfedge(cell_id, len, corners[i], corners[(i + 1) % 4]);
        }
        self.cells[cell_id].close_me = false;
    }

    fn insert_border_halfedge(&mut self, cell_id: usize, at: usize, va: VertexId, vb: VertexId) {
        let edge = self.create_border_edge(cell_id, va, vb);
        let halfedge = Halfedge::border(edge, cell_id, self.vertices[va], self.vertices[vb]);
        self.cells[cell_id].halfedges.insert(at, halfedge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::Cell;
    use crate::site::Site;

    fn engine(sites: &[(f64, f64)]) -> Voronoi {
        let mut voronoi = Voronoi::new();
        for (i, &(x, y)) in sites.iter().enumerate() {
            let pos = Position::new(x, y);
            voronoi.sites.push(pos);
            voronoi.cells.push(Cell::new(i, pos));
        }
        voronoi
    }

    fn assert_near(p: Position, x: f64, y: f64) {
        assert!(
            (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9,
            "{:?} != ({}, {})",
            p,
            x,
            y
        );
    }

    fn endpoints(voronoi: &Voronoi, edge: EdgeId) -> (Position, Position) {
        let (va, vb) = voronoi.edges[edge].endpoints().expect("connected");
        (voronoi.vertices[va], voronoi.vertices[vb])
    }

    #[test]
    fn test_side_of_walks_corners_into_next_side() {
        let bbox = BBox::from_size(1.0, 1.0);
        assert_eq!(Side::of(Position::new(0.0, 0.5), &bbox), Some(Side::Left));
        assert_eq!(Side::of(Position::new(0.0, 0.0), &bbox), Some(Side::Left));
        assert_eq!(Side::of(Position::new(0.0, 1.0), &bbox), Some(Side::Bottom));
        assert_eq!(Side::of(Position::new(1.0, 1.0), &bbox), Some(Side::Right));
        assert_eq!(Side::of(Position::new(1.0, 0.0), &bbox), Some(Side::Top));
        assert_eq!(Side::of(Position::new(0.5, 0.5), &bbox), None);
    }

    #[test]
    fn test_connect_vertical_bisector() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.25, 0.5), (0.75, 0.5)]);
        let edge = voronoi.create_edge(0, 1, None, None);
        assert!(voronoi.connect_edge(edge, &bbox));
        let (a, b) = endpoints(&voronoi, edge);
        assert_near(a, 0.5, 1.0);
        assert_near(b, 0.5, 0.0);
        assert!(voronoi.cells[0].close_me && voronoi.cells[1].close_me);
    }

    #[test]
    fn test_connect_vertical_bisector_outside_box() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(1.5, 0.5), (2.5, 0.5)]);
        let edge = voronoi.create_edge(0, 1, None, None);
        assert!(!voronoi.connect_edge(edge, &bbox));
    }

    #[test]
    fn test_connect_steep_bisector() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.2, 0.2), (0.8, 0.4)]);
        let edge = voronoi.create_edge(0, 1, None, None);
        assert!(voronoi.connect_edge(edge, &bbox));
        let (a, b) = endpoints(&voronoi, edge);
        assert_near(a, 0.8 / 3.0, 1.0);
        assert_near(b, 0.6, 0.0);
        // Both ends are equidistant from the two sites.
        for p in [a, b] {
            let d0 = p.dist(&voronoi.sites[0]);
            let d1 = p.dist(&voronoi.sites[1]);
            assert!((d0 - d1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_connect_shallow_bisector_keeps_existing_start() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.5, 0.2), (0.5, 0.8)]);
        let start = voronoi.create_vertex(0.3, 0.5);
        let edge = voronoi.create_edge(0, 1, Some(start), None);
        assert!(voronoi.connect_edge(edge, &bbox));
        let (va, vb) = voronoi.edges[edge].endpoints().unwrap();
        assert_eq!(va, start);
        assert_near(voronoi.vertices[vb], 1.0, 0.5);
    }

    #[test]
    fn test_clip_edge_moves_both_endpoints() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.5, 0.2), (0.5, 0.8)]);
        let a = voronoi.create_vertex(-1.0, 0.5);
        let b = voronoi.create_vertex(2.0, 0.5);
        let edge = voronoi.create_edge(0, 1, Some(a), Some(b));
        assert!(voronoi.clip_edge(edge, &bbox));
        let (a, b) = endpoints(&voronoi, edge);
        assert_near(a, 0.0, 0.5);
        assert_near(b, 1.0, 0.5);
        assert!(voronoi.cells[0].close_me && voronoi.cells[1].close_me);
    }

    #[test]
    fn test_clip_edge_inside_is_untouched() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.5, 0.2), (0.5, 0.8)]);
        let a = voronoi.create_vertex(0.2, 0.5);
        let b = voronoi.create_vertex(0.8, 0.5);
        let edge = voronoi.create_edge(0, 1, Some(a), Some(b));
        let vertices = voronoi.vertices.len();
        assert!(voronoi.clip_edge(edge, &bbox));
        assert_eq!(voronoi.vertices.len(), vertices);
        assert!(!voronoi.cells[0].close_me);
    }

    #[test]
    fn test_clip_edge_outside_is_rejected() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.5, 0.2), (0.5, 0.8)]);
        let a = voronoi.create_vertex(1.5, -1.0);
        let b = voronoi.create_vertex(3.0, 2.0);
        let edge = voronoi.create_edge(0, 1, Some(a), Some(b));
        assert!(!voronoi.clip_edge(edge, &bbox));
    }

    #[test]
    fn test_clip_edges_drops_edges_outside() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(1.5, 0.5), (2.5, 0.5), (0.25, 0.5), (0.75, 0.5)]);
        let outside = voronoi.create_edge(0, 1, None, None);
        let inside = voronoi.create_edge(2, 3, None, None);
        voronoi.clip_edges(&bbox);
        assert!(voronoi.edges[outside].endpoints().is_none());
        assert!(voronoi.edges[inside].endpoints().is_some());
    }

    #[test]
    fn test_close_cells_walks_corners() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(0.25, 0.5), (0.75, 0.5)]);
        voronoi.create_edge(0, 1, None, None);
        voronoi.clip_edges(&bbox);
        voronoi.close_cells(&bbox).unwrap();

        // Left cell: bisector plus three border segments through two corners.
        for cell in &voronoi.cells {
            assert_eq!(cell.halfedges.len(), 4);
            assert!(!cell.close_me);
        }
        let polygon: Vec<Position> = voronoi.cells[0]
            .halfedges
            .iter()
            .filter_map(|h| h.start(&voronoi.edges).map(|v| voronoi.vertices[v]))
            .collect();
        let mut xs: Vec<f64> = polygon.iter().map(|p| p.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_close_cells_walks_three_corners_from_each_side() {
        let bbox = BBox::from_size(1.0, 1.0);
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let shoelace = |polygon: &[Position]| {
            let n = polygon.len();
            (0..n)
                .map(|i| {
                    let (a, b) = (polygon[i], polygon[(i + 1) % n]);
                    a.x * b.y - b.x * a.y
                })
                .sum::<f64>()
                .abs()
                / 2.0
        };

        for (i, &(cx, cy)) in corners.iter().enumerate() {
            let near = (0.1 + 0.8 * cx, 0.1 + 0.8 * cy);
            let mut sites = vec![Site::new(near.0, near.1), Site::new(0.5, 0.5)];
            let diagram = Voronoi::new().compute(&mut sites, &bbox).unwrap();
            let polygons = diagram.polygons(Some(&sites));

            let sizes: Vec<usize> = polygons.iter().map(Vec::len).collect();
            assert_eq!(sizes, vec![3, 5], "corner {:?}", (cx, cy));
            assert!((shoelace(&polygons[0]) - 0.18).abs() < 1e-9);
            assert!((shoelace(&polygons[1]) - 0.82).abs() < 1e-9);
            // The big cell wraps every corner but the one cut off.
            for (j, &(x, y)) in corners.iter().enumerate() {
                let has = polygons[1].iter().any(|p| p.x == x && p.y == y);
                assert_eq!(has, j != i, "corner {:?}", (x, y));
            }
        }
    }

    #[test]
    fn test_empty_cell_inside_box_fills_rectangle() {
        let bbox = BBox::new(1.0, 3.0, 2.0, 5.0);
        let mut voronoi = engine(&[(2.0, 3.0)]);
        voronoi.close_cells(&bbox).unwrap();
        let cell = &voronoi.cells[0];
        let polygon: Vec<Position> = cell
            .halfedges
            .iter()
            .filter_map(|h| h.start(&voronoi.edges).map(|v| voronoi.vertices[v]))
            .collect();
        assert_eq!(
            polygon,
            vec![
                Position::new(1.0, 2.0),
                Position::new(1.0, 5.0),
                Position::new(3.0, 5.0),
                Position::new(3.0, 2.0),
            ]
        );
        // Stored order already matches the descending-angle walk.
        let angles: Vec<f64> = cell.halfedges.iter().map(|h| h.angle).collect();
        assert!(angles.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_empty_cell_outside_box_stays_empty() {
        let bbox = BBox::from_size(1.0, 1.0);
        let mut voronoi = engine(&[(2.0, 3.0)]);
        voronoi.close_cells(&bbox).unwrap();
        assert!(voronoi.cells[0].halfedges.is_empty());
    }
}
