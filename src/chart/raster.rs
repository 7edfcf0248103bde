//! Dense braille raster: every character cell packs a 2×4 dot matrix.

/// Dot bits of a braille cell, indexed `[sub_row][sub_col]`.
const DOTS: [[u8; 2]; 4] = [
    [0b0000_0001, 0b0000_1000],
    [0b0000_0010, 0b0001_0000],
    [0b0000_0100, 0b0010_0000],
    [0b0100_0000, 0b1000_0000],
];

const BRAILLE_BASE: u32 = 0x2800;

/// One character cell: lit dots plus the color of the last writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub dots: u8,
    pub color: Option<&'static str>,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        self.dots == 0
    }

    pub fn glyph(&self) -> char {
        char::from_u32(BRAILLE_BASE + self.dots as u32).unwrap_or(' ')
    }
}

/// Flat row-major grid of [`Cell`]s addressed in dot coordinates.
#[derive(Debug, Clone)]
pub struct Raster {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Raster {
    /// A raster of `cols × rows` character cells.
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols * rows],
        }
    }

    /// Addressable dot columns.
    pub fn dot_width(&self) -> usize {
        self.cols * 2
    }

    /// Addressable dot rows.
    pub fn dot_height(&self) -> usize {
        self.rows * 4
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell(&self, col: usize, row: usize) -> Cell {
        self.cells[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Light one dot; out-of-range coordinates are ignored.
    pub fn set(&mut self, x: i64, y: i64, color: &'static str) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.dot_width() || y >= self.dot_height() {
            return;
        }
        let cell = &mut self.cells[(y / 4) * self.cols + x / 2];
        cell.dots |= DOTS[y % 4][x % 2];
        cell.color = Some(color);
    }

    /// Integer Bresenham from `(x0, y0)` to `(x1, y1)`, both ends inclusive.
    pub fn line(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: &'static str) {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.set(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}
