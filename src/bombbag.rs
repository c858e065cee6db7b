//! Bomb charges: earned per cleared line, spent to wipe one colour off the board.

use crate::field::{BlockColor, Field};

/// Most charges the bag holds.
pub const MAX_CHARGES: u8 = 3;
/// Fuse length once a colour is targeted.
pub const DETONATE_MS: f64 = 1000.0;

/// Icon bob: angular speed and per-icon phase lag.
const BOB_SPEED: f64 = 0.0008;
const BOB_SHIFT_MS: f64 = 150.0;

/// What a fuse did when it ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detonation {
    pub color: BlockColor,
    /// Something of that colour was on the board; a charge was spent.
    pub hit: bool,
    /// Lines the blast completed and cleared.
    pub lines: u32,
}

#[derive(Debug, Clone, Default)]
pub struct BombBag {
    charges: u8,
    /// Remaining fuse in ms; 0 = nothing armed.
    timer: f64,
    /// Monotonic clock for the icon bob.
    animation: f64,
}

impl BombBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charges(&self) -> u8 {
        self.charges
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    pub fn is_armed(&self) -> bool {
        self.timer > 0.0
    }

    /// Remaining fuse as a fraction of the full length.
    pub fn fuse(&self) -> f64 {
        (self.timer / DETONATE_MS).clamp(0.0, 1.0)
    }

    pub fn add_charge(&mut self) {
        if self.charges < MAX_CHARGES {
            self.charges += 1;
        }
    }

    /// Aim at `color` and (re)light the fuse. Needs a charge; returns whether it took.
    pub fn set_target(&mut self, color: BlockColor, field: &mut Field) -> bool {
        if self.charges == 0 {
            return false;
        }
        field.target = Some(color);
        self.timer = DETONATE_MS;
        true
    }

    /// Aim at the colour after the current target (the first colour if none).
    pub fn cycle_target(&mut self, field: &mut Field) -> bool {
        let next = field.target.map_or(BlockColor::ALL[0], BlockColor::next);
        self.set_target(next, field)
    }

    /// Run the clock. When the fuse burns out, blow up the target colour and re-check lines.
    pub fn tick(&mut self, delta: f64, field: &mut Field) -> Option<Detonation> {
        self.animation += delta;

        if self.timer <= 0.0 {
            return None;
        }
        self.timer -= delta;
        if self.timer > 0.0 {
            return None;
        }

        let detonation = field.target.map(|color| {
            let hit = field.clear_target();
            let mut lines = 0;
            if hit {
                lines = field.clear_completed_lines();
                for _ in 0..lines {
                    self.add_charge();
                }
                self.charges = self.charges.saturating_sub(1);
            }
            Detonation { color, hit, lines }
        });
        field.target = None;
        self.timer = 0.0;
        detonation
    }

    /// Height in [0, 1] of the `index`-th charge icon.
    pub fn bob(&self, index: u8) -> f64 {
        let phase = (self.animation - f64::from(index) * BOB_SHIFT_MS) * BOB_SPEED;
        let cycle = (2.0 * std::f64::consts::PI * phase).sin();
        (0.5 * (cycle + 1.0)).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tests::field_from;
    use crate::field::{Cell, HEIGHT};

    fn charged(n: u8) -> BombBag {
        let mut bag = BombBag::new();
        for _ in 0..n {
            bag.add_charge();
        }
        bag
    }

    #[test]
    fn charges_cap_at_three() {
        let mut bag = BombBag::new();
        for i in 0..10 {
            bag.add_charge();
            assert_eq!(bag.charges(), (i + 1).min(MAX_CHARGES));
        }
    }

    #[test]
    fn targeting_needs_a_charge() {
        let mut bag = BombBag::new();
        let mut field = Field::new();
        assert!(!bag.set_target(BlockColor::Red, &mut field));
        assert!(!bag.cycle_target(&mut field));
        assert_eq!(field.target, None);
        assert!(!bag.is_armed());
    }

    #[test]
    fn cycle_starts_at_first_colour_and_wraps() {
        let mut bag = charged(1);
        let mut field = Field::new();
        assert!(bag.cycle_target(&mut field));
        assert_eq!(field.target, Some(BlockColor::Blue));
        assert!(bag.cycle_target(&mut field));
        assert_eq!(field.target, Some(BlockColor::Green));
        field.target = Some(BlockColor::Yellow);
        assert!(bag.cycle_target(&mut field));
        assert_eq!(field.target, Some(BlockColor::Blue));
    }

    #[test]
    fn retarget_restarts_the_fuse() {
        let mut bag = charged(1);
        let mut field = Field::new();
        bag.set_target(BlockColor::Red, &mut field);
        assert_eq!(bag.tick(600.0, &mut field), None);
        assert!((bag.fuse() - 0.4).abs() < 1e-9);
        bag.set_target(BlockColor::Green, &mut field);
        assert_eq!(bag.fuse(), 1.0);
        assert_eq!(bag.tick(600.0, &mut field), None);
        assert_eq!(field.target, Some(BlockColor::Green));
    }

    #[test]
    fn missing_colour_wastes_fuse_not_charge() {
        let mut bag = charged(3);
        let mut field = field_from(&["bbgg.."]);
        assert!(bag.set_target(BlockColor::Red, &mut field));
        assert_eq!(bag.tick(999.0, &mut field), None);
        let det = bag.tick(1.0, &mut field);
        assert_eq!(
            det,
            Some(Detonation { color: BlockColor::Red, hit: false, lines: 0 })
        );
        assert_eq!(bag.charges(), 3);
        assert_eq!(field.target, None);
        assert_eq!(bag.timer(), 0.0);
        assert_eq!(field.cell(HEIGHT - 1, 0), Cell::Block(BlockColor::Blue));
    }

    #[test]
    fn hit_spends_one_charge() {
        let mut bag = charged(2);
        let mut field = field_from(&["r.....", "bbgg.r"]);
        bag.set_target(BlockColor::Red, &mut field);
        let det = bag.tick(1000.0, &mut field).expect("fuse should burn out");
        assert!(det.hit);
        assert_eq!(det.lines, 0);
        assert_eq!(bag.charges(), 1);
        assert_eq!(field.cell(HEIGHT - 1, 5), Cell::Empty);
        assert_eq!(field.cell(HEIGHT - 2, 0), Cell::Empty);
        assert_eq!(field.target, None);
    }

    #[test]
    fn blast_can_complete_a_line() {
        // Removing the red at the bottom of column 5 lets the yellow above drop in.
        let mut bag = charged(1);
        let mut field = field_from(&[".....y", "bbggyr"]);
        bag.set_target(BlockColor::Red, &mut field);
        let det = bag.tick(1000.0, &mut field).unwrap();
        assert!(det.hit);
        // The yellow is still sliding, so the line waits for it.
        assert_eq!(det.lines, 0);
        assert!(field.fall_offset(HEIGHT - 1, 5) > 0.0);
        assert_eq!(bag.charges(), 0);
    }

    #[test]
    fn blast_lines_refill_before_spending() {
        // Red on top of a full row that is already at rest: the row clears as part of the blast.
        let mut bag = charged(3);
        let mut field = field_from(&["r.....", "bbggyy"]);
        bag.set_target(BlockColor::Red, &mut field);
        let det = bag.tick(1000.0, &mut field).unwrap();
        assert_eq!(det.lines, 1);
        // Capped at three before the charge is spent.
        assert_eq!(bag.charges(), 2);
        assert!((0..HEIGHT).all(|r| (0..6).all(|c| field.cell(r, c) == Cell::Empty)));
    }

    #[test]
    fn idle_tick_only_moves_the_clock() {
        let mut bag = charged(1);
        let mut field = Field::new();
        assert_eq!(bag.tick(16.0, &mut field), None);
        assert_eq!(bag.tick(16.0, &mut field), None);
        assert_eq!(bag.animation, 32.0);
        assert_eq!(bag.charges(), 1);
    }

    #[test]
    fn bob_stays_in_unit_range() {
        let mut bag = charged(3);
        let mut field = Field::new();
        for _ in 0..500 {
            bag.tick(7.0, &mut field);
            for i in 0..MAX_CHARGES {
                let h = bag.bob(i);
                assert!((0.0..=1.0).contains(&h));
            }
        }
    }
}
