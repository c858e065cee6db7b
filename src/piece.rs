//! The falling piece: shapes, rotation with side nudge, sub-row descent, lock.

use crate::field::{BlockColor, Field, Overflow, WIDTH};
use crate::game::GameEvent;
use crate::rng::{pick, rand_int};
use rand::Rng;

/// Fall speed with no key held, rows/ms.
pub const SPEED_SLOW: f64 = 0.001;
/// Fall speed while Down is held, rows/ms.
pub const SPEED_FAST: f64 = 0.01;

/// Render easing: linear share and the progress at which the curve switches segments.
const EASE_BASE: f64 = 0.3;
const EASE_PIVOT: f64 = 0.2;

/// Largest shape side.
pub const MAX_SIZE: usize = 3;

/// Square occupancy matrix of side 2 or 3, stored in a 3×3 array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    size: usize,
    cells: [[bool; MAX_SIZE]; MAX_SIZE],
}

impl Shape {
    pub fn new(size: usize, cells: [[bool; MAX_SIZE]; MAX_SIZE]) -> Self {
        debug_assert!(size == 2 || size == 3);
        Self { size, cells }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_filled(&self, i: usize, j: usize) -> bool {
        i < self.size && j < self.size && self.cells[i][j]
    }

    /// Occupied sub-cells as (row, col) offsets.
    pub fn filled(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.size)
            .flat_map(move |i| (0..self.size).map(move |j| (i, j)))
            .filter(|&(i, j)| self.is_filled(i, j))
    }

    /// Quarter turn clockwise.
    pub fn rotated(&self) -> Self {
        let n = self.size;
        let mut cells = [[false; MAX_SIZE]; MAX_SIZE];
        for (i, row) in cells.iter_mut().enumerate().take(n) {
            for (j, cell) in row.iter_mut().enumerate().take(n) {
                *cell = self.cells[n - 1 - j][i];
            }
        }
        Self { size: n, cells }
    }

    fn bottom_row_empty(&self) -> bool {
        (0..self.size).all(|j| !self.cells[self.size - 1][j])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    L,
    Plus,
    U,
}

impl PieceKind {
    pub const ALL: [Self; 3] = [Self::L, Self::Plus, Self::U];

    /// Shape in its unrotated orientation.
    pub fn shape(self) -> Shape {
        const X: bool = true;
        const O: bool = false;
        match self {
            Self::L => Shape::new(2, [[X, X, O], [X, O, O], [O, O, O]]),
            Self::Plus => Shape::new(3, [[O, X, O], [X, X, X], [O, X, O]]),
            Self::U => Shape::new(3, [[X, O, X], [X, X, X], [O, O, O]]),
        }
    }
}

/// Outcome of one descent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Falling,
    /// Merged into the field.
    Locked,
    /// Would have landed partly above the ceiling; nothing was written.
    Overflow(Overflow),
}

/// Current piece with position, sub-row progress, and speed.
#[derive(Debug, Clone)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub color: BlockColor,
    /// Left edge.
    pub col: i32,
    /// Top edge; negative while entering from above.
    pub row: i32,
    /// Fraction of a row travelled since `row`.
    pub progress: f64,
    pub speed: f64,
}

impl Piece {
    /// Unrotated piece at a fixed spot, slow speed.
    pub fn new(kind: PieceKind, color: BlockColor, row: i32, col: i32) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            color,
            col,
            row,
            progress: 0.0,
            speed: SPEED_SLOW,
        }
    }

    /// Random piece entering above the ceiling.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, field: &Field, events: &mut Vec<GameEvent>) -> Self {
        let color = *pick(rng, &BlockColor::ALL);
        events.push(GameEvent::PieceSpawned(color));

        let kind = *pick(rng, &PieceKind::ALL);
        let size = kind.shape().size();
        let col = rand_int(rng, WIDTH - size) as i32;
        let mut piece = Self::new(kind, color, -(size as i32), col);

        for _ in 0..rand_int(rng, 4) {
            piece.rotate(field, events);
        }
        // Keep the lowest filled row just above the ceiling.
        if piece.shape.bottom_row_empty() {
            piece.row += 1;
        }
        log::debug!("spawned {:?} {} at column {}", piece.kind, color.name(), piece.col);
        piece
    }

    /// True if `shape` at (`row`, `col`) could still drop one more row.
    /// Every collision question (move, rotate, fall) goes through this one-row-below test.
    pub fn try_move(field: &Field, row: i32, col: i32, shape: &Shape) -> bool {
        shape
            .filled()
            .all(|(i, j)| !field.is_blocked(row + i as i32 + 1, col + j as i32))
    }

    /// Rotate clockwise, nudging 3-wide shapes one column left or right if needed.
    /// Returns whether the rotation happened.
    pub fn rotate(&mut self, field: &Field, events: &mut Vec<GameEvent>) -> bool {
        events.push(GameEvent::RotateAttempted);
        let turned = self.shape.rotated();

        let nudges: &[i32] = if self.shape.size() == 3 { &[0, -1, 1] } else { &[0] };
        for &dx in nudges {
            if Self::try_move(field, self.row, self.col + dx, &turned) {
                self.col += dx;
                self.shape = turned;
                return true;
            }
        }
        false
    }

    pub fn move_left(&mut self, field: &Field) -> bool {
        self.shift(field, -1)
    }

    pub fn move_right(&mut self, field: &Field) -> bool {
        self.shift(field, 1)
    }

    fn shift(&mut self, field: &Field, dx: i32) -> bool {
        if Self::try_move(field, self.row, self.col + dx, &self.shape) {
            self.col += dx;
            true
        } else {
            false
        }
    }

    pub fn set_fast_fall(&mut self) {
        self.speed = SPEED_FAST;
    }

    pub fn set_normal_fall(&mut self) {
        self.speed = SPEED_SLOW;
    }

    /// Descend by `delta` ms worth of progress; lock into `field` once it can't go further.
    pub fn advance(&mut self, delta: f64, field: &mut Field) -> Landing {
        self.progress += delta * self.speed;
        // Row by row, so a long frame can't carry the piece through the stack.
        while self.progress >= 1.0 && Self::try_move(field, self.row, self.col, &self.shape) {
            self.progress -= 1.0;
            self.row += 1;
        }
        if Self::try_move(field, self.row, self.col, &self.shape) {
            return Landing::Falling;
        }
        match self.lock(field) {
            Ok(()) => Landing::Locked,
            Err(overflow) => Landing::Overflow(overflow),
        }
    }

    /// Absolute (row, col) of every filled cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .filled()
            .map(|(i, j)| (self.row + i as i32, self.col + j as i32))
    }

    /// Write into the field. Checks every cell first so an overflow never leaves half a piece behind.
    fn lock(&self, field: &mut Field) -> Result<(), Overflow> {
        if let Some((row, col)) = self.cells().find(|&(row, _)| row < 0) {
            return Err(Overflow { row, col });
        }
        for (row, col) in self.cells() {
            field.place(row, col, self.color)?;
        }
        Ok(())
    }

    /// Row to draw at: eased between `row` and `row + 1`, quick start then a soft arrival.
    pub fn display_row(&self) -> f64 {
        let x = self.progress;
        let eased = if x <= EASE_PIVOT {
            x * EASE_BASE + (1.0 - EASE_BASE) * x * x / EASE_PIVOT
        } else {
            let inv = 1.0 - x;
            x * EASE_BASE + (1.0 - EASE_BASE) * (1.0 - inv * inv / (1.0 - EASE_PIVOT))
        };
        self.row as f64 + eased
    }
}
