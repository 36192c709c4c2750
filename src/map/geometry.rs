use crate::braille::BrailleCanvas;

/// A ring in projected pixel space
pub type PixelRing = Vec<(i32, i32)>;

/// Walk a line using Bresenham's algorithm, visiting every pixel on it
fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Knock a line out of whatever was painted underneath
pub fn erase_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    bresenham(x0, y0, x1, y1, |x, y| canvas.clear_pixel_signed(x, y));
}

/// Erase every edge of a closed ring
pub fn erase_ring(canvas: &mut BrailleCanvas, ring: &[(i32, i32)]) {
    if ring.len() < 2 {
        return;
    }
    for pair in ring.windows(2) {
        erase_line(canvas, pair[0].0, pair[0].1, pair[1].0, pair[1].1);
    }
    let (first, last) = (ring[0], ring[ring.len() - 1]);
    if first != last {
        erase_line(canvas, last.0, last.1, first.0, first.1);
    }
}

/// Scanline fill of a polygon given as rings (exterior first, then holes).
/// Uses the even-odd rule, so holes come out unfilled. A pixel is filled
/// when its centre lies inside. Returns the number of pixels lit.
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[PixelRing], paint: u32) -> usize {
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((i32::MAX, i32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if min_y > max_y {
        return 0;
    }

    let width = canvas.pixel_width() as i32;
    let height = canvas.pixel_height() as i32;
    let y_start = min_y.max(0);
    let y_end = max_y.min(height - 1);

    let mut lit = 0;
    let mut crossings: Vec<f64> = Vec::new();
    for y in y_start..=y_end {
        let scan = y as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                let (ax, ay) = ring[i];
                let (bx, by) = ring[(i + 1) % n];
                let (ay, by) = (ay as f64, by as f64);
                if (ay <= scan) != (by <= scan) {
                    let t = (scan - ay) / (by - ay);
                    crossings.push(ax as f64 + t * (bx - ax) as f64);
                }
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let x_from = ((span[0] - 0.5).ceil() as i32).max(0);
            let x_to = ((span[1] - 0.5).ceil() as i32 - 1).min(width - 1);
            for x in x_from..=x_to {
                canvas.set_pixel(x as usize, y as usize, paint);
                lit += 1;
            }
        }
    }

    lit
}

/// Even-odd point in polygon test in geographic space
pub fn point_in_rings(lon: f64, lat: f64, rings: &[Vec<(f64, f64)>]) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

/// Pixel bounding box size (width, height) of a ring set
pub fn pixel_extent(rings: &[PixelRing]) -> (i32, i32) {
    let mut min = (i32::MAX, i32::MAX);
    let mut max = (i32::MIN, i32::MIN);
    for &(x, y) in rings.iter().flatten() {
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }
    if min.0 > max.0 {
        return (0, 0);
    }
    (max.0 - min.0, max.1 - min.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        bresenham(0, 0, 9, 0, |x, y| canvas.set_pixel_signed(x, y, 0));
        // Top dot row of every cell: 0x01 | 0x08
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_erase_line_clears_pixels() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y, 3);
            }
        }
        erase_line(&mut canvas, 0, 0, 1, 0);
        assert_eq!(canvas.to_string(), "⣶"); // 0xFF minus 0x09
        assert_eq!(canvas.cell(0, 0).unwrap().paint, Some(3));
    }

    #[test]
    fn test_fill_square() {
        let mut canvas = BrailleCanvas::new(3, 2);
        let square = vec![(0, 0), (4, 0), (4, 4), (0, 4)];
        let lit = fill_polygon(&mut canvas, &[square], 1);
        assert_eq!(lit, 16);
        assert_eq!(canvas.to_string(), "⣿⣿⠀\n⠀⠀⠀");
    }

    #[test]
    fn test_fill_respects_holes() {
        let mut canvas = BrailleCanvas::new(4, 2);
        let outer = vec![(0, 0), (8, 0), (8, 8), (0, 8)];
        let hole = vec![(2, 2), (6, 2), (6, 6), (2, 6)];
        let lit = fill_polygon(&mut canvas, &[outer, hole], 1);
        assert_eq!(lit, 64 - 16);
    }

    #[test]
    fn test_fill_clips_to_canvas() {
        let mut canvas = BrailleCanvas::new(1, 1);
        let big = vec![(-10, -10), (10, -10), (10, 10), (-10, 10)];
        assert_eq!(fill_polygon(&mut canvas, &[big], 0), 8);
    }

    #[test]
    fn test_point_in_rings() {
        let outer = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let hole = vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)];
        let rings = vec![outer, hole];
        assert!(point_in_rings(1.0, 1.0, &rings));
        assert!(!point_in_rings(5.0, 5.0, &rings));
        assert!(!point_in_rings(11.0, 5.0, &rings));
    }
}
