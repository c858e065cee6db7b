//! App: terminal init, frame loop with a delta clock, key handling.

use crate::GameConfig;
use crate::commentary::Cue;
use crate::game::{Command, GameEvent, GameSession};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Without release events, fast fall ends this long after the last Down press/repeat.
/// Long enough to bridge the OS auto-repeat delay.
const FAST_FALL_HOLD_MS: u64 = 550;

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: GameSession,
    /// End-of-game fade, kept across frames.
    end_fx: Option<Effect>,
    last_frame: Instant,
    /// Terminal reports key releases.
    release_events: bool,
    /// Last Down press while releases aren't reported.
    fast_fall_seen: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let mut session = GameSession::new(&config);
        if config.no_intro {
            session.apply(Command::StartOrRetry);
        }
        Self {
            config,
            theme,
            session,
            end_fx: None,
            last_frame: Instant::now(),
            release_events: false,
            fast_fall_seen: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let Down work as a held key.
        self.release_events = supports_keyboard_enhancement().unwrap_or(false);
        if self.release_events {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }
        log::info!("key release events: {}", self.release_events);

        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);

        if self.release_events {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        let _ = terminal.show_cursor();

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            // A long stall (suspend, resize) must not turn into one giant step.
            let delta = (now.duration_since(self.last_frame).as_secs_f64() * 1000.0)
                .min(self.config.max_frame_delta_ms);
            self.last_frame = now;

            self.lapse_fast_fall(now);
            self.session.tick(delta);
            self.drain();

            terminal.draw(|f| {
                crate::ui::draw(f, &self.session, &self.theme, &mut self.end_fx, delta as u32);
            })?;

            let timeout = frame.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Returns true when the player asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key_to_action(key, self.session.phase()) {
            Action::Quit => {
                log::info!("quit after {} line(s)", self.session.lines_cleared());
                return true;
            }
            Action::Game(command) => {
                match command {
                    Command::FastFall if !self.release_events => {
                        self.fast_fall_seen = Some(Instant::now());
                    }
                    Command::NormalFall => self.fast_fall_seen = None,
                    _ => {}
                }
                self.session.apply(command);
                self.drain();
            }
            Action::None => {}
        }
        false
    }

    fn lapse_fast_fall(&mut self, now: Instant) {
        let Some(seen) = self.fast_fall_seen else {
            return;
        };
        if now.duration_since(seen) >= Duration::from_millis(FAST_FALL_HOLD_MS) {
            self.fast_fall_seen = None;
            self.session.apply(Command::NormalFall);
        }
    }

    /// Log what the session produced. Cues would go to an audio backend; here they are only recorded.
    fn drain(&mut self) {
        for event in self.session.take_events() {
            match event {
                GameEvent::GameOver | GameEvent::Won => log::info!("{event:?}"),
                _ => log::debug!("event {event:?}"),
            }
        }
        for cue in self.session.drain_cues() {
            match cue {
                Cue::PlayClip(clip) => log::info!("play {}", clip.path()),
                Cue::StartMusic(track) => log::info!("music {}", track.path()),
                other => log::debug!("cue {other:?}"),
            }
        }
    }
}
