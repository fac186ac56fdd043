//! The beachline: parabolic arcs ordered along the sweep line.
//!
//! Arcs carry no stored key. Their order is implied by the breakpoints
//! between neighboring parabolas, which are recomputed for the current
//! directrix whenever the tree is searched.

use crate::diagram::EdgeId;
use crate::geom::EPSILON;
use crate::rbtree::{NodeId, RbTree};
use crate::site::Position;

/// Id of an arc in the beachline
pub(crate) type ArcId = NodeId;

/// One parabolic arc of the beachline.
#[derive(Debug, Clone)]
pub(crate) struct Beachsection {
    /// Cell id of the focus site
    pub site: usize,
    /// Edge traced by the breakpoint between this arc and its predecessor
    pub edge: Option<EdgeId>,
    /// Live circle event predicting this arc's collapse
    pub circle_event: Option<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct Beachline {
    tree: RbTree<Beachsection>,
}

impl Beachline {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn get(&self, arc: ArcId) -> &Beachsection {
        self.tree.get(arc)
    }

    pub fn get_mut(&mut self, arc: ArcId) -> &mut Beachsection {
        self.tree.get_mut(arc)
    }

    pub fn prev(&self, arc: ArcId) -> Option<ArcId> {
        self.tree.prev(arc)
    }

    pub fn next(&self, arc: ArcId) -> Option<ArcId> {
        self.tree.next(arc)
    }

    /// Site ids of the arcs from left to right
    #[cfg(test)]
    pub fn sites(&self) -> impl Iterator<Item = usize> + '_ {
        self.tree.iter().map(|arc| arc.site)
    }

    /// Insert a fresh arc for `site` right after `after` (or first).
    pub fn insert_after(&mut self, after: Option<ArcId>, site: usize) -> ArcId {
        self.tree.insert_successor(
            after,
            Beachsection {
                site,
                edge: None,
                circle_event: None,
            },
        )
    }

    /// Unlink an arc. Its circle event must already be detached.
    pub fn remove(&mut self, arc: ArcId) {
        debug_assert!(self.tree.get(arc).circle_event.is_none());
        self.tree.remove(arc);
    }

    /// X of the intersection between `arc`'s parabola and its left
    /// neighbor's, for a sweep line at `directrix`.
    pub fn left_break_point(&self, arc: ArcId, directrix: f64, sites: &[Position]) -> f64 {
        let site = sites[self.tree.get(arc).site];
        let (rfocx, rfocy) = (site.x, site.y);
        let pby2 = rfocy - directrix;
        // Parabola with its focus on the directrix is a vertical ray.
        if pby2 == 0.0 {
            return rfocx;
        }
        let Some(l_arc) = self.tree.prev(arc) else {
            return f64::NEG_INFINITY;
        };
        let site = sites[self.tree.get(l_arc).site];
        let (lfocx, lfocy) = (site.x, site.y);
        let plby2 = lfocy - directrix;
        if plby2 == 0.0 {
            return lfocx;
        }
        let hl = lfocx - rfocx;
        let aby2 = 1.0 / pby2 - 1.0 / plby2;
        let b = hl / plby2;
        if aby2 != 0.0 {
            let c = hl * hl / (-2.0 * plby2) - lfocy + plby2 / 2.0 + rfocy - pby2 / 2.0;
            return (-b + (b * b - 2.0 * aby2 * c).sqrt()) / aby2 + rfocx;
        }
        // Both foci at the same height: the bisector is vertical.
        (rfocx + lfocx) / 2.0
    }

    /// X of the intersection between `arc`'s parabola and its right neighbor's.
    pub fn right_break_point(&self, arc: ArcId, directrix: f64, sites: &[Position]) -> f64 {
        if let Some(r_arc) = self.tree.next(arc) {
            return self.left_break_point(r_arc, directrix, sites);
        }
        let site = sites[self.tree.get(arc).site];
        if site.y == directrix {
            site.x
        } else {
            f64::INFINITY
        }
    }

    /// Find the arcs a new site at `x` falls between.
    ///
    /// Returns `(l_arc, r_arc)`:
    /// - both `None` on an empty beachline,
    /// - the same arc twice when `x` falls strictly inside one arc,
    /// - two neighbors when `x` lands on a breakpoint,
    /// - `(Some(last), None)` when `x` lies right of a degenerate last arc.
    pub fn locate(
        &self,
        x: f64,
        directrix: f64,
        sites: &[Position],
    ) -> (Option<ArcId>, Option<ArcId>) {
        let mut node = self.tree.root();
        while let Some(n) = node {
            let dxl = self.left_break_point(n, directrix, sites) - x;
            if dxl > EPSILON {
                node = self.tree.left(n);
                continue;
            }
            let dxr = x - self.right_break_point(n, directrix, sites);
            if dxr > EPSILON {
                match self.tree.right(n) {
                    Some(r) => node = Some(r),
                    None => return (Some(n), None),
                }
                continue;
            }
            if dxl > -EPSILON {
                // A focus on the directrix gives a zero-width arc: both
                // breakpoints match, so split on which side of the focus x is.
                let focus = sites[self.tree.get(n).site];
                if dxr > -EPSILON && focus.y == directrix && x > focus.x {
                    return (Some(n), self.tree.next(n));
                }
                return (self.tree.prev(n), Some(n));
            }
            if dxr > -EPSILON {
                return (Some(n), self.tree.next(n));
            }
            return (Some(n), Some(n));
        }
        (None, None)
    }
}
