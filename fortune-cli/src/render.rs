//! Rasterizing diagrams into RGB frames.

use fortune_core::{Diagram, PointLocation, Position};
use image::{Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One color per input site, reproducible from `seed`.
///
/// Channels stay above 40 so cells never blend into the black site markers.
pub fn palette(count: usize, seed: u64) -> Vec<Rgb<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Rgb([
                rng.gen_range(40..=255),
                rng.gen_range(40..=255),
                rng.gen_range(40..=255),
            ])
        })
        .collect()
}

/// Fill every cell with its site's color.
///
/// The diagram must have been computed over `BBox::from_size(width, height)`;
/// pixel `(px, py)` is sampled at its center.
pub fn render_diagram(diagram: &Diagram, width: u32, height: u32, colors: &[Rgb<u8>]) -> RgbImage {
    let mut image = RgbImage::new(width, height);
    for (cell_id, cell) in diagram.cells.iter().enumerate() {
        if cell.halfedges.is_empty() {
            continue;
        }
        let color = colors
            .get(cell.site_index)
            .copied()
            .unwrap_or(Rgb([255, 255, 255]));
        let bounds = diagram.cell_bbox(cell_id);
        let x0 = bounds.x.floor().max(0.0) as u32;
        let y0 = bounds.y.floor().max(0.0) as u32;
        let x1 = ((bounds.x + bounds.width).ceil().max(0.0) as u32).min(width);
        let y1 = ((bounds.y + bounds.height).ceil().max(0.0) as u32).min(height);
        for py in y0..y1 {
            for px in x0..x1 {
                let (x, y) = (px as f64 + 0.5, py as f64 + 0.5);
                if diagram.point_intersection(cell_id, x, y) != PointLocation::Outside {
                    image.put_pixel(px, py, color);
                }
            }
        }
    }
    image
}

/// Draw 3x3 black dots at each site position
pub fn draw_sites(image: &mut RgbImage, sites: &[Position]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for site in sites {
        let cx = site.x as i32;
        let cy = site.y as i32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let px = cx + dx;
                let py = cy + dy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    image.put_pixel(px as u32, py as u32, Rgb([0, 0, 0]));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortune_core::{BBox, Site, Voronoi};

    #[test]
    fn test_palette_is_seeded() {
        assert_eq!(palette(16, 3), palette(16, 3));
        assert_ne!(palette(16, 3), palette(16, 4));
        assert!(palette(64, 0).iter().all(|c| c.0.iter().all(|&v| v >= 40)));
    }

    #[test]
    fn test_render_two_cells() {
        let (width, height) = (8, 4);
        let mut sites = vec![Site::new(2.0, 2.0), Site::new(6.0, 2.0)];
        let diagram = Voronoi::new()
            .compute(&mut sites, &BBox::from_size(width as f64, height as f64))
            .unwrap();
        let colors = vec![Rgb([200, 50, 50]), Rgb([50, 50, 200])];
        let image = render_diagram(&diagram, width, height, &colors);

        for py in 0..height {
            for px in 0..width {
                let expected = if px < 4 { colors[0] } else { colors[1] };
                assert_eq!(*image.get_pixel(px, py), expected, "pixel ({}, {})", px, py);
            }
        }
    }

    #[test]
    fn test_draw_sites_clips_to_image() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        draw_sites(&mut image, &[Position::new(0.0, 0.0)]);
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(1, 1), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(2, 2), Rgb([255, 255, 255]));
    }
}
