//! Game session: phases, commands, per-frame stepping, and the event queue.

use crate::bombbag::BombBag;
use crate::commentary::{Clip, Commentary, Cue};
use crate::field::{BlockColor, Field};
use crate::piece::{Landing, Piece};
use crate::rng::make_rng;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Welcome screen; nothing moves until the first start.
    Intro,
    Playing,
    Paused,
    Failed,
    Won,
}

/// Player intent, already decoded from keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    Rotate,
    FastFall,
    NormalFall,
    /// Arm the bomb on the colour with this index.
    BombTarget(u8),
    CycleBombTarget,
    TogglePause,
    StartOrRetry,
}

/// Something the commentary (and the host log) may react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted,
    Retried,
    PieceSpawned(BlockColor),
    RotateAttempted,
    LineCleared,
    Detonated { color: BlockColor, hit: bool },
    GameOver,
    Won,
}

/// Everything one play session owns.
#[derive(Debug)]
pub struct GameSession {
    phase: Phase,
    field: Field,
    bombs: BombBag,
    piece: Option<Piece>,
    commentary: Commentary,
    rng: StdRng,
    /// Raised since the last flush, not yet seen by the commentary.
    pending: Vec<GameEvent>,
    /// Flushed events waiting for the host.
    log: Vec<GameEvent>,
    lines_cleared: u32,
}

impl GameSession {
    pub fn new(config: &crate::GameConfig) -> Self {
        Self::with_rng(make_rng(config.seed), config.clip_ms)
    }

    pub fn with_rng(mut rng: StdRng, clip_ms: f64) -> Self {
        let commentary = Commentary::new(StdRng::seed_from_u64(rng.next_u64()), clip_ms);
        Self {
            phase: Phase::Intro,
            field: Field::new(),
            bombs: BombBag::new(),
            piece: None,
            commentary,
            rng,
            pending: Vec::new(),
            log: Vec::new(),
            lines_cleared: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn bombs(&self) -> &BombBag {
        &self.bombs
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn on_air(&self) -> Option<Clip> {
        self.commentary.on_air()
    }

    /// Events flushed since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.log)
    }

    /// Audio cues queued since the last call.
    pub fn drain_cues(&mut self) -> Vec<Cue> {
        self.commentary.drain_cues()
    }

    /// Apply a command if the current phase accepts it. Returns whether it had any effect.
    pub fn apply(&mut self, command: Command) -> bool {
        let applied = match (self.phase, command) {
            (Phase::Intro, Command::StartOrRetry) => {
                self.start();
                true
            }
            (Phase::Failed | Phase::Won, Command::StartOrRetry) => {
                self.retry();
                true
            }
            (Phase::Playing, Command::TogglePause) => {
                log::info!("paused");
                self.phase = Phase::Paused;
                true
            }
            (Phase::Paused, Command::TogglePause) => {
                log::info!("resumed");
                self.phase = Phase::Playing;
                true
            }
            (Phase::Playing | Phase::Paused, Command::NormalFall) => match self.piece.as_mut() {
                Some(piece) => {
                    piece.set_normal_fall();
                    true
                }
                None => false,
            },
            (Phase::Playing, command) => self.steer(command),
            _ => false,
        };
        if !applied {
            log::trace!("ignored {command:?} in {:?}", self.phase);
        }
        self.flush();
        applied
    }

    fn steer(&mut self, command: Command) -> bool {
        match command {
            Command::BombTarget(index) => match BlockColor::from_index(index) {
                Some(color) => self.bombs.set_target(color, &mut self.field),
                None => false,
            },
            Command::CycleBombTarget => self.bombs.cycle_target(&mut self.field),
            _ => {
                let Some(piece) = self.piece.as_mut() else {
                    return false;
                };
                match command {
                    Command::MoveLeft => piece.move_left(&self.field),
                    Command::MoveRight => piece.move_right(&self.field),
                    Command::Rotate => piece.rotate(&self.field, &mut self.pending),
                    Command::FastFall => {
                        piece.set_fast_fall();
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    /// Advance the session by `delta` ms.
    pub fn tick(&mut self, delta: f64) {
        match self.phase {
            Phase::Intro | Phase::Paused => return,
            Phase::Playing => self.step(delta),
            Phase::Failed | Phase::Won => {
                // Rows completed by the last blocks settling are removed without events.
                if self.field.advance_animations(delta) {
                    self.field.clear_completed_lines();
                }
            }
        }
        self.commentary.tick(delta);
        self.flush();
    }

    fn step(&mut self, delta: f64) {
        if self.field.advance_animations(delta) {
            self.clear_lines();
        }

        if let Some(blast) = self.bombs.tick(delta, &mut self.field) {
            log::debug!(
                "detonated {} ({}), {} line(s)",
                blast.color.name(),
                if blast.hit { "hit" } else { "miss" },
                blast.lines
            );
            self.pending.push(GameEvent::Detonated { color: blast.color, hit: blast.hit });
            for _ in 0..blast.lines {
                self.pending.push(GameEvent::LineCleared);
            }
            self.lines_cleared += blast.lines;
        }

        let Some(piece) = self.piece.as_mut() else {
            return;
        };
        match piece.advance(delta, &mut self.field) {
            Landing::Falling => {}
            Landing::Locked => {
                self.spawn();
                self.clear_lines();
            }
            Landing::Overflow(overflow) => {
                log::info!("game over: {overflow}");
                self.piece = None;
                self.phase = Phase::Failed;
                self.pending.push(GameEvent::GameOver);
            }
        }
    }

    fn clear_lines(&mut self) {
        let lines = self.field.clear_completed_lines();
        for _ in 0..lines {
            self.bombs.add_charge();
            self.pending.push(GameEvent::LineCleared);
        }
        if lines > 0 {
            self.lines_cleared += lines;
            log::debug!("cleared {lines} line(s), {} total", self.lines_cleared);
        }
    }

    fn spawn(&mut self) {
        self.piece = Some(Piece::spawn(&mut self.rng, &self.field, &mut self.pending));
    }

    fn start(&mut self) {
        log::info!("game started");
        self.spawn();
        self.pending.push(GameEvent::GameStarted);
        self.phase = Phase::Playing;
    }

    fn retry(&mut self) {
        log::info!("retry after {} line(s)", self.lines_cleared);
        self.field = Field::new();
        self.bombs = BombBag::new();
        self.lines_cleared = 0;
        self.spawn();
        self.pending.push(GameEvent::Retried);
        self.phase = Phase::Playing;
    }

    /// Hand pending events to the commentary (which may raise more), then move them to the log.
    fn flush(&mut self) {
        self.check_victory();
        let mut next = 0;
        while let Some(&event) = self.pending.get(next) {
            self.commentary.handle(event);
            self.check_victory();
            next += 1;
        }
        self.log.append(&mut self.pending);
    }

    fn check_victory(&mut self) {
        if self.commentary.take_victory() && self.phase == Phase::Playing {
            log::info!("won after {} line(s)", self.lines_cleared);
            self.phase = Phase::Won;
            self.pending.push(GameEvent::Won);
        }
    }
}
