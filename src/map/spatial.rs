use std::collections::HashMap;

/// Geographic bounding box: (min_lon, min_lat, max_lon, max_lat)
pub type Bbox = (f64, f64, f64, f64);

/// Spatial index over country bounding boxes using conservative approximation.
/// Each country's bbox is indexed into every cell it overlaps, so a query
/// never misses a country that might be in view; false positives are
/// dropped later by the renderer's pixel-space culling.
#[derive(Debug)]
pub struct BboxGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Records with no geometry are never indexed
    len: usize,
    cell_size: f64,
}

impl BboxGrid {
    pub const DEFAULT_CELL_SIZE: f64 = 10.0;

    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            len: 0,
            cell_size,
        }
    }

    /// Cell of a position, clamped to the world so stray coordinates
    /// cannot blow up the number of cells walked
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        (
            (lon.clamp(-180.0, 180.0) / self.cell_size).floor() as i32,
            (lat.clamp(-90.0, 90.0) / self.cell_size).floor() as i32,
        )
    }

    /// Grid cells overlapped by a bounding box, row by row
    fn cells_covering(&self, bbox: Bbox) -> impl Iterator<Item = (i32, i32)> {
        let (x0, y0) = self.to_cell(bbox.0, bbox.1);
        let (x1, y1) = self.to_cell(bbox.2, bbox.3);
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
    }

    /// Build from per-record bounding boxes; `None` entries are skipped but
    /// still consume an index so results line up with the record list.
    pub fn build<'a>(bboxes: impl Iterator<Item = Option<&'a Bbox>>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, bbox) in bboxes.enumerate() {
            let Some(&bbox) = bbox else {
                continue;
            };
            let covered: Vec<_> = grid.cells_covering(bbox).collect();
            for cell in covered {
                grid.cells.entry(cell).or_default().push(idx);
            }
            grid.len += 1;
        }
        grid
    }

    /// Record indices whose bbox may intersect the given bounds, sorted and unique
    pub fn query(&self, bounds: Bbox) -> Vec<usize> {
        let mut results: Vec<usize> = self
            .cells_covering(bounds)
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .copied()
            .collect();
        results.sort_unstable();
        results.dedup();
        results
    }

    /// Candidates containing a single point
    pub fn query_point(&self, lon: f64, lat: f64) -> Vec<usize> {
        self.query((lon, lat, lon, lat))
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_finds_overlapping_boxes() {
        let boxes = [
            Some((-74.0, -34.0, -34.0, 6.0)), // Brazil-ish
            None,
            Some((2.0, 49.0, 7.0, 52.0)), // Benelux-ish
        ];
        let grid = BboxGrid::build(boxes.iter().map(|b| b.as_ref()), BboxGrid::DEFAULT_CELL_SIZE);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.query_point(-50.0, -10.0), vec![0]);
        assert_eq!(grid.query_point(4.0, 50.0), vec![2]);
        assert!(grid.query_point(100.0, 0.0).is_empty());
        assert_eq!(grid.query((-180.0, -90.0, 180.0, 90.0)), vec![0, 2]);
    }

    #[test]
    fn test_out_of_world_bbox_stays_bounded() {
        let boxes = [Some((0.0, 0.0, 50_000.0, 50_000.0))];
        let grid = BboxGrid::build(boxes.iter().map(|b| b.as_ref()), BboxGrid::DEFAULT_CELL_SIZE);
        // 0..=18 columns by 0..=9 rows once clamped to the world
        assert_eq!(grid.cells.len(), 19 * 10);
        assert_eq!(grid.query_point(170.0, 80.0), vec![0]);
    }
}
