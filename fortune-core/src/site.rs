//! Site and position types for Voronoi computation.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geom::{BBox, EPSILON};

/// 2D position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another position
    pub fn dist_sq(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another position
    pub fn dist(&self, other: &Position) -> f64 {
        self.dist_sq(other).sqrt()
    }
}

/// An input point of the diagram.
///
/// `voronoi_id` is written by [`crate::Voronoi::compute`]: it is the index of
/// the site's cell in [`crate::Diagram::cells`], or `None` when the site was
/// skipped as an exact duplicate of the previously swept site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub x: f64,
    pub y: f64,
    pub voronoi_id: Option<usize>,
}

impl Site {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, voronoi_id: None }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

impl From<Position> for Site {
    fn from(pos: Position) -> Self {
        Self::new(pos.x, pos.y)
    }
}

/// Snap every site onto the `EPSILON` grid.
///
/// Trades precision for robustness against near-degenerate inputs. Not
/// applied by `compute`; callers opt in.
pub fn quantize_sites(sites: &mut [Site]) {
    for site in sites.iter_mut() {
        site.x = (site.x / EPSILON).floor() * EPSILON;
        site.y = (site.y / EPSILON).floor() * EPSILON;
    }
}

/// Drop sites whose floor-quantized position was already seen (first wins).
///
/// Keys on the bits of the floored coordinates, so sites beyond `i64`
/// range stay distinct.
pub fn dedup_sites(sites: &[Site]) -> Vec<Site> {
    // `+ 0.0` folds -0.0 into 0.0.
    let key = |v: f64| (v.floor() + 0.0).to_bits();
    let mut seen = HashSet::with_capacity(sites.len());
    sites
        .iter()
        .filter(|s| seen.insert((key(s.x), key(s.y))))
        .map(|s| Site::new(s.x, s.y))
        .collect()
}

/// Unit velocity vector (magnitude 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create from angle in radians
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    /// Random unit velocity drawn from `rng`
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        use std::f64::consts::TAU;
        Self::from_angle(rng.gen::<f64>() * TAU)
    }

    /// Reflect off a vertical boundary
    pub fn reflect_x(&mut self) {
        self.x = -self.x;
    }

    /// Reflect off a horizontal boundary
    pub fn reflect_y(&mut self) {
        self.y = -self.y;
    }
}

/// Sites with per-site velocities, driven by a seeded RNG so that runs with
/// the same seed are reproducible.
#[derive(Debug, Clone)]
pub struct SiteCollection {
    pub sites: Vec<Site>,
    pub velocities: Vec<Velocity>,
    rng: ChaCha8Rng,
}

impl SiteCollection {
    /// Wrap existing sites, giving each a random velocity.
    pub fn new(sites: Vec<Site>, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let velocities = sites.iter().map(|_| Velocity::random(&mut rng)).collect();
        Self {
            sites,
            velocities,
            rng,
        }
    }

    /// Create `count` sites uniformly inside `bbox`
    pub fn random(count: usize, bbox: &BBox, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut sites = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        for _ in 0..count {
            let x = bbox.xl + rng.gen::<f64>() * bbox.width();
            let y = bbox.yt + rng.gen::<f64>() * bbox.height();
            sites.push(Site::new(x, y));
            velocities.push(Velocity::random(&mut rng));
        }
        Self {
            sites,
            velocities,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Add a site with a random velocity
    pub fn push(&mut self, site: Site) {
        let vel = Velocity::random(&mut self.rng);
        self.sites.push(site);
        self.velocities.push(vel);
    }

    /// Move every site by velocity * speed * dt, bouncing off `bbox`
    pub fn step(&mut self, speed: f64, dt: f64, bbox: &BBox) {
        let movement = speed * dt;
        for (site, vel) in self.sites.iter_mut().zip(self.velocities.iter_mut()) {
            site.x += vel.x * movement;
            site.y += vel.y * movement;

            if site.x < bbox.xl || site.x > bbox.xr {
                vel.reflect_x();
                site.x = site.x.clamp(bbox.xl, bbox.xr);
            }
            if site.y < bbox.yt || site.y > bbox.yb {
                vel.reflect_y();
                site.y = site.y.clamp(bbox.yt, bbox.yb);
            }
        }
    }

    /// Current positions
    pub fn positions(&self) -> Vec<Position> {
        self.sites.iter().map(Site::pos).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_snaps_to_grid() {
        let mut sites = vec![Site::new(0.123_456_789_012_3, -0.5), Site::new(3.0, 4.0)];
        quantize_sites(&mut sites);
        assert!((sites[0].x - 0.123_456_789).abs() < 2.0 * EPSILON);
        assert!((sites[0].y + 0.5).abs() < 2.0 * EPSILON);
        assert!((sites[1].x - 3.0).abs() < 2.0 * EPSILON);
        // Snapping is idempotent up to the grid resolution.
        let once = sites.clone();
        quantize_sites(&mut sites);
        for (a, b) in once.iter().zip(sites.iter()) {
            assert!((a.x - b.x).abs() < 2.0 * EPSILON);
            assert!((a.y - b.y).abs() < 2.0 * EPSILON);
        }
    }

    #[test]
    fn test_dedup_first_wins() {
        let sites = vec![
            Site::new(1.2, 1.7),
            Site::new(5.0, 5.0),
            Site::new(1.9, 1.1),
            Site::new(5.5, 4.0),
        ];
        let unique = dedup_sites(&sites);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].pos(), Position::new(1.2, 1.7));
        assert_eq!(unique[1].pos(), Position::new(5.0, 5.0));
        assert_eq!(unique[2].pos(), Position::new(5.5, 4.0));
        assert!(unique.iter().all(|s| s.voronoi_id.is_none()));
    }

    #[test]
    fn test_dedup_keeps_far_apart_huge_sites() {
        let sites = vec![
            Site::new(1e19, 0.0),
            Site::new(2e19, 0.0),
            Site::new(1e19, -0.0),
            Site::new(-0.0, 0.5),
            Site::new(0.0, 0.25),
        ];
        let unique = dedup_sites(&sites);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[1].pos(), Position::new(2e19, 0.0));
        assert_eq!(unique[2].pos(), Position::new(-0.0, 0.5));
    }

    #[test]
    fn test_random_is_seeded() {
        let bbox = BBox::from_size(100.0, 50.0);
        let a = SiteCollection::random(32, &bbox, 7);
        let b = SiteCollection::random(32, &bbox, 7);
        let c = SiteCollection::random(32, &bbox, 8);
        assert_eq!(a.positions(), b.positions());
        assert_ne!(a.positions(), c.positions());
        assert!(a.sites.iter().all(|s| bbox.contains(s.x, s.y)));
    }

    #[test]
    fn test_step_stays_inside() {
        let bbox = BBox::from_size(10.0, 10.0);
        let mut sites = SiteCollection::random(16, &bbox, 3);
        for _ in 0..200 {
            sites.step(25.0, 1.0 / 30.0, &bbox);
        }
        assert!(sites.sites.iter().all(|s| bbox.contains(s.x, s.y)));
        for vel in &sites.velocities {
            assert!(((vel.x * vel.x + vel.y * vel.y) - 1.0).abs() < 1e-12);
        }
    }
}
