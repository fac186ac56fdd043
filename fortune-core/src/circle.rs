//! Circle events: predicted collapses of beachline arcs.

use crate::beachline::{ArcId, Beachline};
use crate::geom::CIRCLE_EPSILON;
use crate::rbtree::{NodeId, RbTree};
use crate::site::Position;

/// Predicted collapse of `arc` at the bottom of the circumcircle through
/// the arc's site and its two neighbors' sites.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CircleEvent {
    pub arc: ArcId,
    pub site: usize,
    /// Circumcenter x
    pub x: f64,
    /// Sweep position at which the event fires (circumcircle bottom)
    pub y: f64,
    /// Circumcenter y
    pub ycenter: f64,
}

/// Circumcircle through `l`, `c`, `r` if the triple converges.
///
/// Returns `(center_x, bottom_y, center_y)`. Triples that are collinear or
/// clockwise (in screen orientation) never collapse `c` and yield `None`.
pub(crate) fn circumcircle(l: Position, c: Position, r: Position) -> Option<(f64, f64, f64)> {
    let (bx, by) = (c.x, c.y);
    let (ax, ay) = (l.x - bx, l.y - by);
    let (cx, cy) = (r.x - bx, r.y - by);
    let d = 2.0 * (ax * cy - ay * cx);
    if d >= -CIRCLE_EPSILON {
        return None;
    }
    let ha = ax * ax + ay * ay;
    let hc = cx * cx + cy * cy;
    let x = (cy * ha - ay * hc) / d;
    let y = (ax * hc - cx * ha) / d;
    let ycenter = y + by;
    Some((x + bx, ycenter + (x * x + y * y).sqrt(), ycenter))
}

/// Events ordered by `(y, x)`, smallest first.
#[derive(Debug, Default)]
pub(crate) struct CircleEventQueue {
    tree: RbTree<CircleEvent>,
    first: Option<NodeId>,
}

impl CircleEventQueue {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.first = None;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// The event that fires next
    pub fn first(&self) -> Option<&CircleEvent> {
        self.first.map(|id| self.tree.get(id))
    }

    pub fn get(&self, id: NodeId) -> &CircleEvent {
        self.tree.get(id)
    }

    /// Predict a collapse for `arc` from its current neighbors and queue it.
    ///
    /// The arc must not hold a live event.
    pub fn attach(&mut self, beachline: &mut Beachline, arc: ArcId, sites: &[Position]) {
        debug_assert!(beachline.get(arc).circle_event.is_none());
        let (Some(l_arc), Some(r_arc)) = (beachline.prev(arc), beachline.next(arc)) else {
            return;
        };
        let l_site = beachline.get(l_arc).site;
        let c_site = beachline.get(arc).site;
        let r_site = beachline.get(r_arc).site;
        // The same site on both sides means the arc is being split, not squeezed.
        if l_site == r_site {
            return;
        }
        let Some((x, y, ycenter)) = circumcircle(sites[l_site], sites[c_site], sites[r_site])
        else {
            return;
        };
        let event = CircleEvent {
            arc,
            site: c_site,
            x,
            y,
            ycenter,
        };

        let mut predecessor = None;
        let mut node = self.tree.root();
        while let Some(n) = node {
            let other = self.tree.get(n);
            if event.y < other.y || (event.y == other.y && event.x <= other.x) {
                match self.tree.left(n) {
                    Some(l) => node = Some(l),
                    None => {
                        predecessor = self.tree.prev(n);
                        break;
                    }
                }
            } else {
                match self.tree.right(n) {
                    Some(r) => node = Some(r),
                    None => {
                        predecessor = Some(n);
                        break;
                    }
                }
            }
        }
        let id = self.tree.insert_successor(predecessor, event);
        if predecessor.is_none() {
            self.first = Some(id);
        }
        beachline.get_mut(arc).circle_event = Some(id);
    }

    /// Invalidate the arc's pending event, if any.
    pub fn detach(&mut self, beachline: &mut Beachline, arc: ArcId) {
        if let Some(id) = beachline.get_mut(arc).circle_event.take() {
            if self.tree.prev(id).is_none() {
                self.first = self.tree.next(id);
            }
            self.tree.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beachline_of(sites: &[usize]) -> (Beachline, Vec<ArcId>) {
        let mut beachline = Beachline::new();
        let mut arcs = Vec::new();
        let mut last = None;
        for &site in sites {
            let arc = beachline.insert_after(last, site);
            arcs.push(arc);
            last = Some(arc);
        }
        (beachline, arcs)
    }

    #[test]
    fn test_circumcircle_converging_triple() {
        // The middle site sits above its neighbors, so its arc is squeezed
        // out when the sweep reaches the bottom of the circle.
        let l = Position::new(0.0, 0.0);
        let c = Position::new(1.0, -1.0);
        let r = Position::new(2.0, 0.0);
        let (x, y, ycenter) = circumcircle(l, c, r).expect("converges");
        assert!((x - 1.0).abs() < 1e-12);
        assert!(ycenter.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_circumcircle_rejects_diverging_and_collinear() {
        let l = Position::new(0.0, 0.0);
        let c = Position::new(1.0, -1.0);
        let r = Position::new(2.0, 0.0);
        assert!(circumcircle(r, c, l).is_none());
        // A newly inserted lower site grows rather than collapses.
        assert!(circumcircle(l, Position::new(1.0, 1.0), r).is_none());
        assert!(circumcircle(l, Position::new(1.0, 0.0), r).is_none());
    }

    #[test]
    fn test_queue_orders_by_y_then_x() {
        let sites = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, -1.0),
            Position::new(2.0, 0.0),
            Position::new(3.0, -3.0),
            Position::new(4.0, 0.0),
        ];
        let (mut beachline, arcs) = beachline_of(&[0, 1, 2, 3, 4]);
        let mut queue = CircleEventQueue::new();

        queue.attach(&mut beachline, arcs[1], &sites);
        queue.attach(&mut beachline, arcs[3], &sites);
        assert_eq!(queue.len(), 2);
        // Arc 3 collapses at y = 1/3, arc 1 at y = 1.
        let event = *queue.first().expect("event");
        assert_eq!(event.arc, arcs[3]);
        assert!((event.y - 1.0 / 3.0).abs() < 1e-12);
        assert!((event.x - 3.0).abs() < 1e-12);
        assert_eq!(event.site, 3);

        queue.detach(&mut beachline, arcs[3]);
        assert!(beachline.get(arcs[3]).circle_event.is_none());
        let event = *queue.first().expect("event");
        assert_eq!(event.arc, arcs[1]);
        assert!((event.y - 1.0).abs() < 1e-12);

        queue.detach(&mut beachline, arcs[1]);
        assert!(queue.is_empty());
        // Detaching twice is a no-op.
        queue.detach(&mut beachline, arcs[1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_y_breaks_ties_on_x() {
        let sites = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, -1.0),
            Position::new(2.0, 0.0),
            Position::new(-4.0, 0.0),
            Position::new(-3.0, -1.0),
            Position::new(-2.0, 0.0),
        ];
        let (mut beachline, arcs) = beachline_of(&[0, 1, 2]);
        let (mut other, other_arcs) = beachline_of(&[3, 4, 5]);
        let mut queue = CircleEventQueue::new();
        queue.attach(&mut beachline, arcs[1], &sites);
        queue.attach(&mut other, other_arcs[1], &sites);
        let event = *queue.first().expect("event");
        assert_eq!(event.site, 4);
        assert!((event.x + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_event_without_two_neighbors_or_for_split_arc() {
        let sites = vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)];
        let (mut beachline, arcs) = beachline_of(&[0, 1, 0]);
        let mut queue = CircleEventQueue::new();
        queue.attach(&mut beachline, arcs[0], &sites);
        queue.attach(&mut beachline, arcs[1], &sites);
        queue.attach(&mut beachline, arcs[2], &sites);
        assert!(queue.is_empty());
    }
}
