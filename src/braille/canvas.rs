/// Braille glyph bits indexed by `[row][column]` within a 2x4 cell
/// (U+2800 plus the OR of the lit dots).
const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// Dot canvas where every character cell carries one paint id, resolved to a
/// colour by the map widget.
pub struct BrailleCanvas {
    /// Size in character cells
    width: usize,
    height: usize,
    dots: Vec<u8>,
    paint: Vec<Option<u32>>,
}

/// One rendered character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub paint: Option<u32>,
}

impl BrailleCanvas {
    /// Blank canvas of `width` x `height` cells, i.e. twice as many dots
    /// across and four times as many down.
    pub fn new(width: usize, height: usize) -> Self {
        let cells = width * height;
        Self {
            width,
            height,
            dots: vec![0; cells],
            paint: vec![None; cells],
        }
    }

    pub fn pixel_width(&self) -> usize {
        self.width * 2
    }

    pub fn pixel_height(&self) -> usize {
        self.height * 4
    }

    #[inline(always)]
    fn dot_bit(x: usize, y: usize) -> u8 {
        DOT_BITS[y % 4][x % 2]
    }

    #[inline(always)]
    fn cell_index(&self, x: usize, y: usize) -> Option<usize> {
        let (col, row) = (x / 2, y / 4);
        (col < self.width && row < self.height).then(|| row * self.width + col)
    }

    /// Light a pixel and hand its cell to `paint`. The last painter of a cell wins.
    pub fn set_pixel(&mut self, x: usize, y: usize, paint: u32) {
        if let Some(idx) = self.cell_index(x, y) {
            self.dots[idx] |= Self::dot_bit(x, y);
            self.paint[idx] = Some(paint);
        }
    }

    /// `set_pixel` for projected coordinates, which may fall off the canvas
    pub fn set_pixel_signed(&mut self, x: i32, y: i32, paint: u32) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            self.set_pixel(x, y, paint);
        }
    }

    /// Turn a pixel off, keeping the cell's paint
    pub fn clear_pixel(&mut self, x: usize, y: usize) {
        if let Some(idx) = self.cell_index(x, y) {
            self.dots[idx] &= !Self::dot_bit(x, y);
        }
    }

    pub fn clear_pixel_signed(&mut self, x: i32, y: i32) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            self.clear_pixel(x, y);
        }
    }

    /// Character cell at (column, row); `None` outside the canvas
    pub fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row * self.width + col;
        Some(Cell {
            glyph: char::from_u32(0x2800 + self.dots[idx] as u32).unwrap_or(' '),
            paint: self.paint[idx],
        })
    }

    /// Iterate over lit cells as (column, row, cell)
    pub fn lit_cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.dots
            .iter()
            .enumerate()
            .filter(|(_, bits)| **bits != 0)
            .filter_map(move |(idx, _)| {
                let col = idx % self.width;
                let row = idx / self.width;
                self.cell(col, row).map(|cell| (col, row, cell))
            })
    }

    /// Glyph rows joined by newlines
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        let rows: Vec<String> = (0..self.height)
            .map(|row| {
                (0..self.width)
                    .filter_map(|col| self.cell(col, row))
                    .map(|cell| cell.glyph)
                    .collect()
            })
            .collect();
        rows.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_dot_carries_paint() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, 7);
        assert_eq!(canvas.to_string(), "\u{2801}");
        assert_eq!(canvas.cell(0, 0).and_then(|c| c.paint), Some(7));
    }

    #[test]
    fn test_full_cell() {
        let mut canvas = BrailleCanvas::new(2, 1);
        for (x, y) in (0..2).flat_map(|x| (0..4).map(move |y| (x, y))) {
            canvas.set_pixel(x, y, 0);
        }
        assert_eq!(canvas.to_string(), "\u{28FF}\u{2800}");
    }

    #[test]
    fn test_last_painter_wins() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, 1);
        canvas.set_pixel(1, 3, 2);
        let cell = canvas.cell(0, 0).unwrap();
        assert_eq!(cell.paint, Some(2));
        assert_eq!(cell.glyph, '⢁'); // 0x01 | 0x80
    }

    #[test]
    fn test_clear_pixel_keeps_other_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, 0);
        canvas.set_pixel(1, 1, 0);
        canvas.clear_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠐"); // 0x10
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(2, 0, 0);
        canvas.set_pixel_signed(-1, 0, 0);
        assert_eq!(canvas.lit_cells().count(), 0);
        assert!(canvas.cell(1, 0).is_none());
    }
}
