//! Running commentary: reacts to game events, sequences voice clips over the music,
//! and calls the win once the last suggestion has been heard.
//!
//! Nothing here plays sound. The sequencer keeps its own clock (advanced by the
//! session's ticks) and queues [`Cue`]s for whatever audio backend is attached.

use crate::field::BlockColor;
use crate::game::GameEvent;
use crate::rng::{rand_int, unlikely, very_unlikely};
use rand::rngs::StdRng;

/// Parts in each suggestion set.
pub const SUGGESTION_SETS: &[u32] = &[13];
/// Looping music tracks to pick from.
pub const MUSIC_TRACKS: usize = 4;

const NUM_EXTRA: usize = 1;
const NUM_ROTATE: usize = 1;
const NUM_IDLE_RANDOM: usize = 4;
const NUM_GAME_OVER: usize = 1;
const NUM_VICTORY: usize = 3;

const VOLUME_INTRO: f32 = 0.4;
const VOLUME_NORMAL: f32 = 0.5;
const VOLUME_QUIET: f32 = 0.2;

/// A voice clip. Numbered variants are 1-based, as on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    Extra(u8),
    Rotate(u8),
    IdleColor(u8),
    IdleRandom(u8),
    Suggestion { set: u8, part: u32 },
    GameOver(u8),
    Victory(u8),
    Retry,
}

impl Clip {
    /// Asset path relative to the data directory.
    pub fn path(&self) -> String {
        match self {
            Self::Extra(n) => format!("audio/extra_{n}.mp3"),
            Self::Rotate(n) => format!("audio/rotate_{n}.mp3"),
            Self::IdleColor(n) => format!("audio/idlecolor_{n}.mp3"),
            Self::IdleRandom(n) => format!("audio/idlerandom_{n}.mp3"),
            Self::Suggestion { set, part } => format!("audio/suggestion_{set}/{part}.mp3"),
            Self::GameOver(n) => format!("audio/gameover_{n}.mp3"),
            Self::Victory(n) => format!("audio/victory_{n}.mp3"),
            Self::Retry => "audio/retry_1.mp3".to_string(),
        }
    }

    /// Short label for the sidebar.
    pub fn label(&self) -> String {
        match self {
            Self::Extra(_) => "a word from the host".to_string(),
            Self::Rotate(_) => "rotation quip".to_string(),
            Self::IdleColor(_) | Self::IdleRandom(_) => "banter".to_string(),
            Self::Suggestion { set, part } => {
                let total = SUGGESTION_SETS.get(usize::from(*set).saturating_sub(1)).copied().unwrap_or(0);
                format!("suggestion {part}/{total}")
            }
            Self::GameOver(_) => "game over".to_string(),
            Self::Victory(_) => "victory".to_string(),
            Self::Retry => "ride again".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    Intro,
    Loop(usize),
}

impl Track {
    pub fn path(&self) -> String {
        match self {
            Self::Intro => "audio/intro.mp3".to_string(),
            Self::Loop(n) => format!("music/track_{}.mp3", n + 1),
        }
    }
}

/// Instruction for the audio backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    PlayClip(Clip),
    StopClip,
    /// Replace the music with this track (loops until stopped).
    StartMusic(Track),
    StopMusic,
    MusicVolume(f32),
}

#[derive(Debug)]
pub struct Commentary {
    rng: StdRng,
    /// Nominal length of every clip, ms.
    clip_ms: f64,
    /// Lines banked toward the next suggestion part.
    fuel: u32,
    /// (set index, part) of the suggestion in progress.
    suggestion: Option<(usize, u32)>,
    suggestion_playing: bool,
    /// Clip on air and its remaining time.
    clip: Option<(Clip, f64)>,
    victory: bool,
    cues: Vec<Cue>,
}

impl Commentary {
    pub fn new(rng: StdRng, clip_ms: f64) -> Self {
        Self {
            rng,
            clip_ms,
            fuel: 0,
            suggestion: None,
            suggestion_playing: false,
            clip: None,
            victory: false,
            cues: vec![Cue::StartMusic(Track::Intro), Cue::MusicVolume(VOLUME_INTRO)],
        }
    }

    /// Clip currently on air.
    pub fn on_air(&self) -> Option<Clip> {
        self.clip.map(|(clip, _)| clip)
    }

    /// Cues queued since the last call.
    pub fn drain_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    /// True once, right after the final suggestion ran out.
    pub fn take_victory(&mut self) -> bool {
        std::mem::take(&mut self.victory)
    }

    fn busy(&self) -> bool {
        self.suggestion_playing || self.clip.is_some()
    }

    pub fn handle(&mut self, event: GameEvent) {
        match event {
            GameEvent::LineCleared => {
                // Lines scored over a running suggestion are not banked.
                if !self.suggestion_playing {
                    self.fuel += 1;
                }
                self.check_fuel();
            }
            GameEvent::GameStarted => {
                self.start_music();
                if unlikely(&mut self.rng) {
                    let n = self.variant(NUM_EXTRA);
                    self.play(Clip::Extra(n));
                }
            }
            GameEvent::RotateAttempted => {
                if !self.busy() && very_unlikely(&mut self.rng) {
                    let n = self.variant(NUM_ROTATE);
                    self.play(Clip::Rotate(n));
                }
            }
            GameEvent::PieceSpawned(color) => self.banter(color),
            GameEvent::GameOver => {
                let n = self.variant(NUM_GAME_OVER);
                self.play(Clip::GameOver(n));
                self.cues.push(Cue::StopMusic);
            }
            GameEvent::Won => {
                let n = self.variant(NUM_VICTORY);
                self.play(Clip::Victory(n));
                self.cues.push(Cue::StopMusic);
            }
            GameEvent::Retried => {
                self.fuel = 0;
                self.suggestion = None;
                self.suggestion_playing = false;
                self.victory = false;
                if self.clip.take().is_some() {
                    self.cues.push(Cue::StopClip);
                }
                if unlikely(&mut self.rng) {
                    let n = self.variant(NUM_EXTRA);
                    self.play(Clip::Extra(n));
                } else {
                    self.play(Clip::Retry);
                }
                self.start_music();
            }
            GameEvent::Detonated { .. } => {}
        }
    }

    /// Advance the clip clock by `delta` ms.
    pub fn tick(&mut self, delta: f64) {
        let Some((_, remaining)) = self.clip.as_mut() else {
            return;
        };
        *remaining -= delta;
        if *remaining > 0.0 {
            return;
        }
        self.clip = None;
        self.suggestion_playing = false;
        self.check_fuel();
        if self.clip.is_none() {
            self.cues.push(Cue::MusicVolume(VOLUME_NORMAL));
        }
    }

    fn banter(&mut self, color: BlockColor) {
        if self.busy() || !unlikely(&mut self.rng) {
            return;
        }
        let coin = rand_int(&mut self.rng, 2) == 0;
        let clip = match color {
            BlockColor::Yellow if coin => Clip::IdleColor(1),
            BlockColor::Red if coin => Clip::IdleColor(2),
            _ => {
                let n = self.variant(NUM_IDLE_RANDOM);
                Clip::IdleRandom(n)
            }
        };
        self.play(clip);
    }

    /// Spend one banked line on the next suggestion part, or declare the win past the last one.
    fn check_fuel(&mut self) {
        if self.suggestion_playing || self.fuel == 0 {
            return;
        }
        self.fuel -= 1;
        let (set, part) = match self.suggestion {
            None => (rand_int(&mut self.rng, SUGGESTION_SETS.len()), 1),
            Some((set, part)) => (set, part + 1),
        };
        self.suggestion = Some((set, part));

        if part > SUGGESTION_SETS[set] {
            log::info!("suggestion set {} finished", set + 1);
            self.victory = true;
        } else {
            self.suggestion_playing = true;
            self.play(Clip::Suggestion { set: (set + 1) as u8, part });
        }
    }

    fn play(&mut self, clip: Clip) {
        log::debug!("on air: {}", clip.path());
        if self.clip.replace((clip, self.clip_ms)).is_some() {
            self.cues.push(Cue::StopClip);
        }
        self.cues.push(Cue::PlayClip(clip));
        self.cues.push(Cue::MusicVolume(VOLUME_QUIET));
    }

    fn start_music(&mut self) {
        let track = Track::Loop(rand_int(&mut self.rng, MUSIC_TRACKS));
        self.cues.push(Cue::StartMusic(track));
    }

    fn variant(&mut self, count: usize) -> u8 {
        (rand_int(&mut self.rng, count) + 1) as u8
    }
}
