//! Fortune's sweep: turns sites into a raw edge graph, then hands it to the
//! clipper and the cell closer.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::beachline::{ArcId, Beachline};
use crate::circle::CircleEventQueue;
use crate::diagram::{Cell, Diagram, Edge, EdgeId, Halfedge, VertexId};
use crate::geom::{BBox, EPSILON};
use crate::site::{Position, Site};
use crate::{Result, VoronoiError};

/// Voronoi diagram builder.
///
/// Holds the sweep state and the diagram under construction. One builder
/// computes one diagram at a time; reuse it across calls so its arenas and
/// any recycled diagram storage are reused too.
#[derive(Debug, Default)]
pub struct Voronoi {
    pub(crate) beachline: Beachline,
    pub(crate) circle_events: CircleEventQueue,
    /// Site position per cell id
    pub(crate) sites: Vec<Position>,
    pub(crate) cells: Vec<Cell>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) vertices: Vec<Position>,
    recycled: Option<Diagram>,
}

impl Voronoi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a diagram back so the next `compute` reuses its storage.
    ///
    /// The diagram must not be used afterwards; taking it by value
    /// guarantees that.
    pub fn recycle(&mut self, diagram: Diagram) {
        self.recycled = Some(diagram);
    }

    /// Compute the Voronoi diagram of `sites` clipped to `bbox`.
    ///
    /// Writes each site's `voronoi_id`. Sites exactly equal to the site swept
    /// just before them are skipped and keep `voronoi_id == None`.
    pub fn compute(&mut self, sites: &mut [Site], bbox: &BBox) -> Result<Diagram> {
        bbox.validate()?;
        if let Some(index) = sites
            .iter()
            .position(|s| !s.x.is_finite() || !s.y.is_finite())
        {
            return Err(VoronoiError::NonFiniteSite { index });
        }

        self.reset();
        if let Some(diagram) = self.recycled.take() {
            self.cells = diagram.cells;
            self.edges = diagram.edges;
            self.vertices = diagram.vertices;
            self.cells.clear();
            self.edges.clear();
            self.vertices.clear();
        }

        for site in sites.iter_mut() {
            site.voronoi_id = None;
        }

        // Descending by (y, x) so popping from the back yields sweep order.
        let mut site_events: Vec<usize> = (0..sites.len()).collect();
        site_events.sort_by(|&a, &b| {
            let (a, b) = (&sites[a], &sites[b]);
            b.y.partial_cmp(&a.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.x.partial_cmp(&a.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut next_site = site_events.pop();
        let mut last_swept: Option<(f64, f64)> = None;
        let mut circle_count = 0usize;
        loop {
            let circle = self.circle_events.first().map(|e| (e.x, e.y, e.arc));
            match next_site {
                Some(index)
                    if circle.map_or(true, |(cx, cy, _)| {
                        let s = &sites[index];
                        s.y < cy || (s.y == cy && s.x < cx)
                    }) =>
                {
                    let site = &mut sites[index];
                    if last_swept != Some((site.x, site.y)) {
                        let id = self.cells.len();
                        let pos = site.pos();
                        self.cells.push(Cell::new(index, pos));
                        self.sites.push(pos);
                        site.voronoi_id = Some(id);
                        self.add_beachsection(id);
                        last_swept = Some((site.x, site.y));
                    } else {
                        trace!("skipping duplicate site {} at ({}, {})", index, site.x, site.y);
                    }
                    next_site = site_events.pop();
                }
                _ => match circle {
                    Some((_, _, arc)) => {
                        self.remove_beachsection(arc);
                        circle_count += 1;
                    }
                    None => break,
                },
            }
        }

        let swept_edges = self.edges.len();
        self.clip_edges(bbox);
        self.close_cells(bbox)?;
        self.compact_edges();

        debug!(
            "voronoi: {} sites -> {} cells, {} circle events, {} swept edges, {} final edges, {} vertices",
            sites.len(),
            self.cells.len(),
            circle_count,
            swept_edges,
            self.edges.len(),
            self.vertices.len(),
        );

        let diagram = Diagram {
            cells: std::mem::take(&mut self.cells),
            edges: std::mem::take(&mut self.edges),
            vertices: std::mem::take(&mut self.vertices),
        };
        self.reset();
        Ok(diagram)
    }

    /// Clear the sweep scratch state, keeping allocations.
    fn reset(&mut self) {
        self.beachline.clear();
        self.circle_events.clear();
        self.sites.clear();
        self.cells.clear();
        self.edges.clear();
        self.vertices.clear();
    }

    pub(crate) fn create_vertex(&mut self, x: f64, y: f64) -> VertexId {
        self.vertices.push(Position::new(x, y));
        self.vertices.len() - 1
    }

    /// New bisector between two cells, registered with both cells.
    pub(crate) fn create_edge(
        &mut self,
        l_site: usize,
        r_site: usize,
        va: Option<VertexId>,
        vb: Option<VertexId>,
    ) -> EdgeId {
        let edge = self.edges.len();
        self.edges.push(Edge::new(l_site, Some(r_site)));
        if let Some(va) = va {
            self.set_edge_start(edge, l_site, r_site, va);
        }
        if let Some(vb) = vb {
            self.set_edge_end(edge, l_site, r_site, vb);
        }
        let (l, r) = (self.sites[l_site], self.sites[r_site]);
        self.cells[l_site]
            .halfedges
            .push(Halfedge::between(edge, l_site, l, r));
        self.cells[r_site]
            .halfedges
            .push(Halfedge::between(edge, r_site, r, l));
        edge
    }

    /// New border edge of `site` running `va -> vb`. The caller places the
    /// halfedge in the cell's boundary.
    pub(crate) fn create_border_edge(&mut self, site: usize, va: VertexId, vb: VertexId) -> EdgeId {
        self.edges.push(Edge {
            l_site: site,
            r_site: None,
            va: Some(va),
            vb: Some(vb),
        });
        self.edges.len() - 1
    }

    /// Set the endpoint at which the edge starts when seen with `l_site` on
    /// the left.
    fn set_edge_start(&mut self, edge: EdgeId, l_site: usize, r_site: usize, vertex: VertexId) {
        let edge = &mut self.edges[edge];
        if edge.va.is_none() && edge.vb.is_none() {
            edge.va = Some(vertex);
            edge.l_site = l_site;
            edge.r_site = Some(r_site);
        } else if edge.l_site == r_site {
            edge.vb = Some(vertex);
        } else {
            edge.va = Some(vertex);
        }
    }

    fn set_edge_end(&mut self, edge: EdgeId, l_site: usize, r_site: usize, vertex: VertexId) {
        self.set_edge_start(edge, r_site, l_site, vertex);
    }

    /// Detach an arc and its pending circle event from the sweep.
    fn detach_beachsection(&mut self, arc: ArcId) {
        self.circle_events.detach(&mut self.beachline, arc);
        self.beachline.remove(arc);
    }

    /// Circle event: `arc` (and every neighbor collapsing at the same point)
    /// leaves the beachline, and their edges meet at a new vertex.
    fn remove_beachsection(&mut self, arc: ArcId) {
        let Some(event_id) = self.beachline.get(arc).circle_event else {
            return;
        };
        let event = *self.circle_events.get(event_id);
        let (x, y) = (event.x, event.ycenter);
        trace!("arc of cell {} collapses at ({}, {})", event.site, x, y);
        let vertex = self.create_vertex(x, y);

        let collapses_here = |this: &Self, arc: ArcId| {
            this.beachline.get(arc).circle_event.map_or(false, |e| {
                let e = this.circle_events.get(e);
                (x - e.x).abs() < EPSILON && (y - e.ycenter).abs() < EPSILON
            })
        };

        let mut previous = self.beachline.prev(arc);
        let mut next = self.beachline.next(arc);
        let section = self.beachline.get(arc);
        // (site, edge) of every arc in the run, read before it is unlinked
        let mut disappearing = VecDeque::from([(section.site, section.edge)]);
        self.detach_beachsection(arc);

        while let Some(l_arc) = previous {
            if !collapses_here(&*self, l_arc) {
                break;
            }
            previous = self.beachline.prev(l_arc);
            let section = self.beachline.get(l_arc);
            disappearing.push_front((section.site, section.edge));
            self.detach_beachsection(l_arc);
        }
        let Some(l_arc) = previous else {
            return;
        };
        disappearing.push_front((self.beachline.get(l_arc).site, None));
        self.circle_events.detach(&mut self.beachline, l_arc);

        while let Some(r_arc) = next {
            if !collapses_here(&*self, r_arc) {
                break;
            }
            next = self.beachline.next(r_arc);
            let section = self.beachline.get(r_arc);
            disappearing.push_back((section.site, section.edge));
            self.detach_beachsection(r_arc);
        }
        let Some(r_arc) = next else {
            return;
        };
        let r_section = self.beachline.get(r_arc);
        disappearing.push_back((r_section.site, r_section.edge));
        self.circle_events.detach(&mut self.beachline, r_arc);

        // Every transition inside the collapsing run ends at the new vertex.
        for i in 1..disappearing.len() {
            let (l_site, _) = disappearing[i - 1];
            let (r_site, edge) = disappearing[i];
            if let Some(edge) = edge {
                self.set_edge_start(edge, l_site, r_site, vertex);
            }
        }

        let (l_site, _) = disappearing[0];
        let (r_site, _) = disappearing[disappearing.len() - 1];
        let edge = self.create_edge(l_site, r_site, None, Some(vertex));
        self.beachline.get_mut(r_arc).edge = Some(edge);
        self.circle_events.attach(&mut self.beachline, l_arc, &self.sites);
        self.circle_events.attach(&mut self.beachline, r_arc, &self.sites);
    }

    /// Site event: insert an arc for cell `site` into the beachline.
    fn add_beachsection(&mut self, site: usize) {
        let pos = self.sites[site];
        let (l_arc, r_arc) = self.beachline.locate(pos.x, pos.y, &self.sites);
        // Left of a zero-width first arc only when the row is collinear;
        // keep the new arc on the right so beachline order follows x.
        let after = match (l_arc, r_arc) {
            (None, Some(r)) => Some(r),
            _ => l_arc,
        };
        let new_arc = self.beachline.insert_after(after, site);

        match (l_arc, r_arc) {
            // First arc of the beachline.
            (None, None) => {}
            // The new site splits one arc in two.
            (Some(l_arc), Some(r)) if l_arc == r => {
                self.circle_events.detach(&mut self.beachline, l_arc);
                let l_site = self.beachline.get(l_arc).site;
                let r_arc = self.beachline.insert_after(Some(new_arc), l_site);
                let edge = self.create_edge(l_site, site, None, None);
                self.beachline.get_mut(new_arc).edge = Some(edge);
                self.beachline.get_mut(r_arc).edge = Some(edge);
                self.circle_events.attach(&mut self.beachline, l_arc, &self.sites);
                self.circle_events.attach(&mut self.beachline, r_arc, &self.sites);
            }
            // Right of the last arc with no breakpoint yet: collinear sites on
            // the first sweep row.
            (Some(l_arc), None) => {
                let l_site = self.beachline.get(l_arc).site;
                let edge = self.create_edge(l_site, site, None, None);
                self.beachline.get_mut(new_arc).edge = Some(edge);
            }
            // Exactly on the breakpoint between two arcs: the transition edge
            // ends here and two new edges start.
            (Some(l_arc), Some(r_arc)) => {
                self.circle_events.detach(&mut self.beachline, l_arc);
                self.circle_events.detach(&mut self.beachline, r_arc);
                let l_site = self.beachline.get(l_arc).site;
                let r_site = self.beachline.get(r_arc).site;
                let (l, r) = (self.sites[l_site], self.sites[r_site]);
                let (cx, cy) = circumcenter(l, pos, r);
                let vertex = self.create_vertex(cx, cy);
                if let Some(edge) = self.beachline.get(r_arc).edge {
                    self.set_edge_start(edge, l_site, r_site, vertex);
                }
                let l_edge = self.create_edge(l_site, site, None, Some(vertex));
                let r_edge = self.create_edge(site, r_site, None, Some(vertex));
                self.beachline.get_mut(new_arc).edge = Some(l_edge);
                self.beachline.get_mut(r_arc).edge = Some(r_edge);
                self.circle_events.attach(&mut self.beachline, l_arc, &self.sites);
                self.circle_events.attach(&mut self.beachline, r_arc, &self.sites);
            }
            (None, Some(r_arc)) => {
                let r_site = self.beachline.get(r_arc).site;
                let edge = self.create_edge(r_site, site, None, None);
                self.beachline.get_mut(new_arc).edge = Some(edge);
            }
        }
    }

    /// Drop edges discarded by the clipper and renumber the rest, keeping
    /// their relative order.
    fn compact_edges(&mut self) {
        let mut remap = vec![None; self.edges.len()];
        let mut kept = 0;
        for (old, edge) in self.edges.iter().enumerate() {
            if edge.endpoints().is_some() {
                remap[old] = Some(kept);
                kept += 1;
            }
        }
        if kept == self.edges.len() {
            return;
        }
        self.edges.retain(|e| e.endpoints().is_some());
        for cell in &mut self.cells {
            cell.halfedges.retain_mut(|h| match remap[h.edge] {
                Some(new) => {
                    h.edge = new;
                    true
                }
                None => false,
            });
        }
    }
}

/// Circumcenter of three sites, with `b` as the new site between `a` and `c`.
fn circumcenter(a: Position, b: Position, c: Position) -> (f64, f64) {
    let (bx, by) = (b.x - a.x, b.y - a.y);
    let (cx, cy) = (c.x - a.x, c.y - a.y);
    let d = 2.0 * (bx * cy - by * cx);
    let hb = bx * bx + by * by;
    let hc = cx * cx + cy * cy;
    ((cy * hb - by * hc) / d + a.x, (bx * hc - cx * hb) / d + a.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::circumcircle;

    fn sites_of(points: &[(f64, f64)]) -> Vec<Site> {
        points.iter().map(|&(x, y)| Site::new(x, y)).collect()
    }

    #[test]
    fn test_circumcenter_matches_circle_event() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(1.0, -1.0);
        let c = Position::new(2.0, 0.0);
        let (x, y) = circumcenter(a, b, c);
        let (ex, _, ey) = circumcircle(a, b, c).expect("converges");
        assert!((x - ex).abs() < 1e-12);
        assert!((y - ey).abs() < 1e-12);
    }

    #[test]
    fn test_ids_follow_sweep_order() {
        let mut voronoi = Voronoi::new();
        let mut sites = sites_of(&[(0.5, 0.9), (0.2, 0.1), (0.8, 0.1), (0.5, 0.5)]);
        let diagram = voronoi
            .compute(&mut sites, &BBox::from_size(1.0, 1.0))
            .unwrap();

        let ids: Vec<_> = sites.iter().map(|s| s.voronoi_id).collect();
        assert_eq!(ids, vec![Some(3), Some(0), Some(1), Some(2)]);
        for (index, site) in sites.iter().enumerate() {
            let cell = &diagram.cells[site.voronoi_id.unwrap()];
            assert_eq!(cell.site_index, index);
            assert_eq!(cell.site, site.pos());
        }
    }

    #[test]
    fn test_sweep_state_is_discarded() {
        let mut voronoi = Voronoi::new();
        let mut sites = sites_of(&[(0.3, 0.3), (0.7, 0.4), (0.5, 0.8), (0.1, 0.9)]);
        voronoi
            .compute(&mut sites, &BBox::from_size(1.0, 1.0))
            .unwrap();
        assert!(voronoi.beachline.is_empty());
        assert_eq!(voronoi.beachline.len(), 0);
        assert!(voronoi.circle_events.is_empty());
        assert!(voronoi.cells.is_empty());
        assert!(voronoi.edges.is_empty());
        assert!(voronoi.vertices.is_empty());
    }

    #[test]
    fn test_three_sites_meet_at_circumcenter() {
        let mut voronoi = Voronoi::new();
        let mut sites = sites_of(&[(0.5, 0.2), (0.2, 0.7), (0.8, 0.7)]);
        let diagram = voronoi
            .compute(&mut sites, &BBox::from_size(1.0, 1.0))
            .unwrap();

        let (cx, cy) = circumcenter(sites[0].pos(), sites[1].pos(), sites[2].pos());
        let center = Position::new(cx, cy);
        let shared = diagram
            .vertices
            .iter()
            .filter(|v| v.dist(&center) < 1e-9)
            .count();
        assert!(shared >= 1, "no vertex at circumcenter {:?}", center);

        // Each pair of cells is adjacent.
        for cell in 0..3 {
            let mut neighbors = diagram.neighbor_ids(cell);
            neighbors.sort();
            let expected: Vec<usize> = (0..3).filter(|&c| c != cell).collect();
            assert_eq!(neighbors, expected);
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut voronoi = Voronoi::new();
        let mut sites = sites_of(&[(0.5, 0.5), (f64::NAN, 0.2)]);
        let err = voronoi
            .compute(&mut sites, &BBox::from_size(1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, VoronoiError::NonFiniteSite { index: 1 }));

        let mut sites = sites_of(&[(0.5, 0.5)]);
        let err = voronoi
            .compute(&mut sites, &BBox::new(0.0, 1.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, VoronoiError::InvalidBoundingBox(_)));
    }

    #[test]
    fn test_recycled_diagram_is_reused() {
        let mut voronoi = Voronoi::new();
        let bbox = BBox::from_size(10.0, 10.0);
        let mut sites = sites_of(&[(1.0, 1.0), (9.0, 2.0), (5.0, 8.0), (2.0, 6.0)]);
        let first = voronoi.compute(&mut sites, &bbox).unwrap();
        let expected = first.clone();
        voronoi.recycle(first);
        let second = voronoi.compute(&mut sites, &bbox).unwrap();
        assert_eq!(second, expected);
    }
}
