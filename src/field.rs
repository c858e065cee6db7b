//! Playfield: static blocks, settle animation, explosions, bomb target.

use thiserror::Error;

/// Columns.
pub const WIDTH: usize = 6;
/// Visible rows. Rows above 0 exist only as spawn headroom.
pub const HEIGHT: usize = 13;

/// Settle acceleration in rows/ms².
const ACCELERATION: f64 = 0.000_02;
/// Explosion fade-out in ms.
const EXPLOSION_DURATION_MS: f64 = 300.0;

/// The four block colours. Index order matches the a/s/d/w bomb keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockColor {
    Blue,
    Green,
    Red,
    Yellow,
}

impl BlockColor {
    pub const ALL: [Self; 4] = [Self::Blue, Self::Green, Self::Red, Self::Yellow];

    pub fn index(self) -> u8 {
        match self {
            Self::Blue => 0,
            Self::Green => 1,
            Self::Red => 2,
            Self::Yellow => 3,
        }
    }

    /// `None` for anything outside 0..=3.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Next colour, wrapping after the last.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() as usize + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }
}

/// Single cell: either empty or a block of a given colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(BlockColor),
}

impl Cell {
    pub fn color(self) -> Option<BlockColor> {
        match self {
            Self::Empty => None,
            Self::Block(c) => Some(c),
        }
    }
}

/// A block was written above the ceiling: the stack overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("block placed above the ceiling at row {row}, column {col}")]
pub struct Overflow {
    pub row: i32,
    pub col: i32,
}

/// Playfield. `cells[0]` is the top row.
#[derive(Debug, Clone)]
pub struct Field {
    cells: [[Cell; WIDTH]; HEIGHT],
    /// Rows of visual drop left after a compaction; 0 = settled.
    fall_offset: [[f64; WIDTH]; HEIGHT],
    fall_speed: [[f64; WIDTH]; HEIGHT],
    /// 1.0 right after a cell blew up, fading to 0.0.
    explosion: [[f64; WIDTH]; HEIGHT],
    /// Colour the armed bomb will remove.
    pub target: Option<BlockColor>,
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}

impl Field {
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; WIDTH]; HEIGHT],
            fall_offset: [[0.0; WIDTH]; HEIGHT],
            fall_speed: [[0.0; WIDTH]; HEIGHT],
            explosion: [[0.0; WIDTH]; HEIGHT],
            target: None,
        }
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    #[inline]
    pub fn fall_offset(&self, row: usize, col: usize) -> f64 {
        self.fall_offset[row][col]
    }

    #[inline]
    pub fn explosion(&self, row: usize, col: usize) -> f64 {
        self.explosion[row][col]
    }

    /// Walls and floor block; rows above the ceiling never do.
    pub fn is_blocked(&self, row: i32, col: i32) -> bool {
        if col < 0 || col >= WIDTH as i32 {
            return true;
        }
        if row >= HEIGHT as i32 {
            return true;
        }
        if row < 0 {
            return false;
        }
        self.cells[row as usize][col as usize] != Cell::Empty
    }

    /// Write a settled block. Rows above the ceiling are an overflow and write nothing.
    pub fn place(&mut self, row: i32, col: i32, color: BlockColor) -> Result<(), Overflow> {
        if row < 0 {
            return Err(Overflow { row, col });
        }
        let (r, c) = (row as usize, col as usize);
        self.cells[r][c] = Cell::Block(color);
        self.fall_offset[r][c] = 0.0;
        self.fall_speed[r][c] = 0.0;
        Ok(())
    }

    /// Move a cell down from `from` to `to` in one column; the drop keeps animating from the old slot.
    fn drop_cell(&mut self, from: usize, to: usize, col: usize) {
        let cell = self.cells[from][col];
        self.cells[to][col] = cell;
        if cell == Cell::Empty {
            self.fall_offset[to][col] = 0.0;
            self.fall_speed[to][col] = 0.0;
        } else {
            self.fall_offset[to][col] = self.fall_offset[from][col] + (to - from) as f64;
            self.fall_speed[to][col] = self.fall_speed[from][col];
        }
    }

    fn clear_cell(&mut self, row: usize, col: usize) {
        self.cells[row][col] = Cell::Empty;
        self.fall_offset[row][col] = 0.0;
        self.fall_speed[row][col] = 0.0;
    }

    /// Blow up every block of the target colour, compacting each column.
    /// Returns whether anything matched.
    pub fn clear_target(&mut self) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let target = Cell::Block(target);
        let mut detonated_any = false;

        for col in 0..WIDTH {
            let Some(first) = (0..HEIGHT).rev().find(|&row| self.cells[row][col] == target) else {
                continue;
            };
            detonated_any = true;
            self.clear_cell(first, col);
            self.explosion[first][col] = 1.0;

            // `write` is the lowest slot still waiting for a surviving cell.
            let mut write = first;
            for seek in (0..first).rev() {
                if self.cells[seek][col] == target {
                    self.explosion[seek][col] = 1.0;
                } else {
                    self.drop_cell(seek, write, col);
                    write -= 1;
                }
            }
            for row in 0..=write {
                self.clear_cell(row, col);
            }
        }
        detonated_any
    }

    /// Full and at rest: no empty cell and nothing still sliding into place.
    fn is_line_complete(&self, row: usize) -> bool {
        (0..WIDTH).all(|col| self.cells[row][col] != Cell::Empty && self.fall_offset[row][col] == 0.0)
    }

    fn explode_row(&mut self, row: usize) {
        for col in 0..WIDTH {
            self.explosion[row][col] = 1.0;
        }
    }

    /// Remove every complete row in one bottom-up pass, dropping the rest.
    /// Returns how many rows went.
    pub fn clear_completed_lines(&mut self) -> u32 {
        let Some(first) = (0..HEIGHT).rev().find(|&row| self.is_line_complete(row)) else {
            return 0;
        };
        self.explode_row(first);
        let mut cleared = 1;

        let mut write = first;
        for seek in (0..first).rev() {
            if self.is_line_complete(seek) {
                self.explode_row(seek);
                cleared += 1;
            } else {
                for col in 0..WIDTH {
                    self.drop_cell(seek, write, col);
                }
                write -= 1;
            }
        }
        for row in 0..=write {
            for col in 0..WIDTH {
                self.clear_cell(row, col);
            }
        }
        cleared
    }

    /// Step the settle and explosion animations by `delta` ms.
    /// Returns true when some cell came to rest this step.
    pub fn advance_animations(&mut self, delta: f64) -> bool {
        let mut settled = false;
        for row in 0..HEIGHT {
            for col in 0..WIDTH {
                if self.fall_offset[row][col] > 0.0 {
                    self.fall_speed[row][col] += delta * ACCELERATION;
                    self.fall_offset[row][col] -= delta * self.fall_speed[row][col];
                    if self.fall_offset[row][col] <= 0.0 {
                        self.fall_offset[row][col] = 0.0;
                        self.fall_speed[row][col] = 0.0;
                        settled = true;
                    }
                }
                if self.explosion[row][col] > 0.0 {
                    self.explosion[row][col] =
                        (self.explosion[row][col] - delta / EXPLOSION_DURATION_MS).max(0.0);
                }
            }
        }
        settled
    }

    /// True while any cell is still sliding.
    pub fn is_settling(&self) -> bool {
        self.fall_offset.iter().flatten().any(|&o| o > 0.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a field from rows of text: `.` empty, `b g r y` colours. Bottom-aligned.
    pub(crate) fn field_from(rows: &[&str]) -> Field {
        let mut field = Field::new();
        let top = HEIGHT - rows.len();
        for (i, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let color = match ch {
                    'b' => BlockColor::Blue,
                    'g' => BlockColor::Green,
                    'r' => BlockColor::Red,
                    'y' => BlockColor::Yellow,
                    _ => continue,
                };
                field.place((top + i) as i32, col as i32, color).unwrap();
            }
        }
        field
    }

    fn column(field: &Field, col: usize) -> Vec<Cell> {
        (0..HEIGHT).map(|row| field.cell(row, col)).collect()
    }

    fn settle(field: &mut Field) {
        for _ in 0..10_000 {
            if !field.is_settling() {
                return;
            }
            field.advance_animations(16.0);
        }
        panic!("field never settled");
    }

    #[test]
    fn walls_floor_and_headroom() {
        let field = field_from(&["rrrrrr"]);
        for row in -5..HEIGHT as i32 + 3 {
            assert!(field.is_blocked(row, -1));
            assert!(field.is_blocked(row, WIDTH as i32));
        }
        for col in 0..WIDTH as i32 {
            assert!(field.is_blocked(HEIGHT as i32, col));
            assert!(field.is_blocked(HEIGHT as i32 + 4, col));
            assert!(!field.is_blocked(-1, col));
            assert!(!field.is_blocked(-3, col));
            assert!(!field.is_blocked(0, col));
            assert!(field.is_blocked(HEIGHT as i32 - 1, col));
        }
    }

    #[test]
    fn place_above_ceiling_is_overflow() {
        let mut field = Field::new();
        assert_eq!(
            field.place(-1, 2, BlockColor::Red),
            Err(Overflow { row: -1, col: 2 })
        );
        assert!((0..HEIGHT).all(|row| (0..WIDTH).all(|col| field.cell(row, col) == Cell::Empty)));
    }

    #[test]
    fn from_index_rejects_out_of_range() {
        assert_eq!(BlockColor::from_index(0), Some(BlockColor::Blue));
        assert_eq!(BlockColor::from_index(3), Some(BlockColor::Yellow));
        assert_eq!(BlockColor::from_index(4), None);
        assert_eq!(BlockColor::from_index(255), None);
        assert_eq!(BlockColor::Yellow.next(), BlockColor::Blue);
    }

    #[test]
    fn clear_target_without_match_changes_nothing() {
        let mut field = field_from(&["..g...", "bgb.yy"]);
        field.target = Some(BlockColor::Red);
        let before: Vec<Vec<Cell>> = (0..WIDTH).map(|c| column(&field, c)).collect();
        assert!(!field.clear_target());
        let after: Vec<Vec<Cell>> = (0..WIDTH).map(|c| column(&field, c)).collect();
        assert_eq!(before, after);
        assert!(!field.is_settling());
    }

    #[test]
    fn clear_target_without_target_is_noop() {
        let mut field = field_from(&["rrr..."]);
        assert!(!field.clear_target());
        assert_eq!(field.cell(HEIGHT - 1, 0), Cell::Block(BlockColor::Red));
    }

    #[test]
    fn clear_target_compacts_column() {
        // Column 0 bottom-up: r, g, r, b, r, y
        let mut field = field_from(&["y", "r", "b", "r", "g", "r"]);
        field.target = Some(BlockColor::Red);
        assert!(field.clear_target());

        let h = HEIGHT;
        assert_eq!(field.cell(h - 1, 0), Cell::Block(BlockColor::Green));
        assert_eq!(field.cell(h - 2, 0), Cell::Block(BlockColor::Blue));
        assert_eq!(field.cell(h - 3, 0), Cell::Block(BlockColor::Yellow));
        assert!((0..h - 3).all(|row| field.cell(row, 0) == Cell::Empty));

        // Each survivor drops by the number of reds below it.
        assert_eq!(field.fall_offset(h - 1, 0), 1.0);
        assert_eq!(field.fall_offset(h - 2, 0), 2.0);
        assert_eq!(field.fall_offset(h - 3, 0), 3.0);

        // Every red exploded where it stood.
        for row in [h - 1, h - 3, h - 5] {
            assert_eq!(field.explosion(row, 0), 1.0);
        }
        assert_eq!(field.explosion(h - 2, 0), 0.0);
    }

    #[test]
    fn clear_target_touches_every_column() {
        let mut field = field_from(&["g.r...", "r.g..r"]);
        field.target = Some(BlockColor::Red);
        assert!(field.clear_target());
        for col in 0..WIDTH {
            assert!(column(&field, col).iter().all(|&c| c != Cell::Block(BlockColor::Red)));
        }
        assert_eq!(field.cell(HEIGHT - 1, 0), Cell::Block(BlockColor::Green));
        assert_eq!(field.cell(HEIGHT - 1, 2), Cell::Block(BlockColor::Green));
        assert_eq!(field.cell(HEIGHT - 2, 2), Cell::Empty);
    }

    #[test]
    fn completed_line_clears_and_drops_above() {
        let mut field = field_from(&["..g...", "bgrybg"]);
        assert_eq!(field.clear_completed_lines(), 1);
        assert_eq!(field.cell(HEIGHT - 1, 2), Cell::Block(BlockColor::Green));
        assert_eq!(field.fall_offset(HEIGHT - 1, 2), 1.0);
        assert_eq!(field.cell(HEIGHT - 2, 2), Cell::Empty);
        assert!((0..WIDTH).all(|col| field.explosion(HEIGHT - 1, col) == 1.0));
    }

    #[test]
    fn non_contiguous_lines_clear_in_one_pass() {
        let mut field = field_from(&["y.....", "rrrrrr", "g.....", "bbbbbb"]);
        assert_eq!(field.clear_completed_lines(), 2);
        // g dropped past one cleared row, y past two.
        assert_eq!(field.cell(HEIGHT - 1, 0), Cell::Block(BlockColor::Green));
        assert_eq!(field.fall_offset(HEIGHT - 1, 0), 1.0);
        assert_eq!(field.cell(HEIGHT - 2, 0), Cell::Block(BlockColor::Yellow));
        assert_eq!(field.fall_offset(HEIGHT - 2, 0), 2.0);
        assert_eq!(field.cell(HEIGHT - 3, 0), Cell::Empty);
    }

    #[test]
    fn falling_cells_block_line_until_settled() {
        // Bottom row complete except column 5, which has a block resting above it.
        let mut field = field_from(&[".....r", "bgrby.", "yyyyyy"]);
        assert_eq!(field.clear_completed_lines(), 1);
        // The old middle row is now at the bottom with offset 1, the red above it too.
        assert_eq!(field.cell(HEIGHT - 1, 0), Cell::Block(BlockColor::Blue));
        assert!(field.fall_offset(HEIGHT - 1, 0) > 0.0);

        // Fill the hole while the row is still sliding.
        field.cells[HEIGHT - 1][5] = Cell::Block(BlockColor::Green);
        field.fall_offset[HEIGHT - 1][5] = 1.0;
        field.cells[HEIGHT - 2][5] = Cell::Empty;
        field.fall_offset[HEIGHT - 2][5] = 0.0;
        assert_eq!(field.clear_completed_lines(), 0, "sliding row must not clear");

        let mut ticks = 0;
        loop {
            ticks += 1;
            let settled = field.advance_animations(16.0);
            if settled && !field.is_settling() {
                break;
            }
            assert_eq!(field.clear_completed_lines(), 0);
            assert!(ticks < 1000);
        }
        assert_eq!(field.clear_completed_lines(), 1);
    }

    #[test]
    fn settle_accelerates_and_reports_once() {
        let mut field = field_from(&["r.....", "gggggg"]);
        field.clear_completed_lines();
        assert_eq!(field.fall_offset(HEIGHT - 1, 0), 1.0);

        let mut reports = 0;
        let mut last = 1.0;
        let mut last_step = 0.0;
        while field.is_settling() {
            if field.advance_animations(16.0) {
                reports += 1;
            }
            let now = field.fall_offset(HEIGHT - 1, 0);
            if now > 0.0 {
                let step = last - now;
                assert!(step > last_step);
                last_step = step;
            }
            last = now;
        }
        assert_eq!(reports, 1);
        assert_eq!(field.fall_offset(HEIGHT - 1, 0), 0.0);
        assert!(!field.advance_animations(16.0));
    }

    #[test]
    fn explosions_fade_and_clamp() {
        let mut field = field_from(&["bbbbbb"]);
        field.clear_completed_lines();
        field.advance_animations(150.0);
        assert!((field.explosion(HEIGHT - 1, 0) - 0.5).abs() < 1e-9);
        field.advance_animations(400.0);
        assert_eq!(field.explosion(HEIGHT - 1, 0), 0.0);
    }

    #[test]
    fn settle_helper_reaches_rest() {
        let mut field = field_from(&["y.....", "rrrrrr", "rrrrrr"]);
        assert_eq!(field.clear_completed_lines(), 2);
        settle(&mut field);
        assert_eq!(field.cell(HEIGHT - 1, 0), Cell::Block(BlockColor::Yellow));
        assert_eq!(field.fall_offset(HEIGHT - 1, 0), 0.0);
    }
}
