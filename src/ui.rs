//! Layout and drawing: board, sidebar, intro / pause / game over / victory overlays.

use crate::bombbag::MAX_CHARGES;
use crate::field::{BlockColor, Cell, HEIGHT, WIDTH};
use crate::game::{GameSession, Phase};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use tachyonfx::{CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count};

const SIDEBAR_WIDTH: u16 = 26;
const SIDEBAR_HEIGHT: u16 = 24;

/// How long the stack takes to fade into its end-of-game tint.
const END_FADE_MS: u32 = 700;

/// Share of the target colour laid over blocks the armed bomb will remove.
const TARGET_TINT: f64 = 0.4;
/// Darkening of each block's bottom pixel row.
const BEVEL: f64 = 0.35;

/// Size of one board cell: terminal columns wide, half-block pixels tall.
#[derive(Debug, Clone, Copy)]
struct Scale {
    cols: u16,
    px: u16,
}

const LARGE: Scale = Scale { cols: 4, px: 4 };
const SMALL: Scale = Scale { cols: 2, px: 2 };

impl Scale {
    fn for_area(area: Rect) -> Self {
        let (w, h) = board_outer_size(LARGE);
        if area.width >= w + SIDEBAR_WIDTH && area.height >= h {
            LARGE
        } else {
            SMALL
        }
    }
}

/// Board size in terminal cells, border included.
fn board_outer_size(scale: Scale) -> (u16, u16) {
    (WIDTH as u16 * scale.cols + 2, HEIGHT as u16 * scale.px / 2 + 2)
}

/// Linear blend from `a` to `b`. Non-RGB colours snap at the midpoint.
fn mix(a: Color, b: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    match (a, b) {
        (Color::Rgb(ar, ag, ab), Color::Rgb(br, bg, bb)) => {
            let lerp = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
            Color::Rgb(lerp(ar, br), lerp(ag, bg), lerp(ab, bb))
        }
        _ if t >= 0.5 => b,
        _ => a,
    }
}

/// Explosion burst: grows past the cell while it fades out. `e` runs from 1 down to 0.
fn explosion_size(e: f64) -> f64 {
    1.3 * (1.0 - e.powi(3))
}

fn explosion_alpha(e: f64) -> f64 {
    1.0 - (1.0 - e).powi(3)
}

/// Board in half-block pixels: one terminal column by half a terminal row.
struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Canvas {
    fn new(width: usize, height: usize, bg: Color) -> Self {
        Self { width, height, pixels: vec![bg; width * height] }
    }

    /// Blend `color` over the pixels covered by the rectangle, clipped to the canvas.
    fn fill(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color, alpha: f64) {
        let span = |lo: f64, len: f64, max: usize| {
            let start = lo.round().max(0.0) as usize;
            let end = ((lo + len).round().max(0.0) as usize).min(max);
            start..end
        };
        for py in span(y, h, self.height) {
            for px in span(x, w, self.width) {
                let pixel = &mut self.pixels[py * self.width + px];
                *pixel = mix(*pixel, color, alpha);
            }
        }
    }

    /// One block at (row, col) in board units; `row` may be fractional.
    fn block(&mut self, row: f64, col: f64, scale: Scale, color: Color) {
        let (cw, ch) = (f64::from(scale.cols), f64::from(scale.px));
        let (x, y) = (col * cw, row * ch);
        self.fill(x, y, cw, ch, color, 1.0);
        self.fill(x, y + ch - 1.0, cw, 1.0, Color::Rgb(0, 0, 0), BEVEL);
    }

    fn render(&self, frame: &mut Frame, rect: Rect) {
        let buf = frame.buffer_mut();
        let rows = (self.height / 2).min(rect.height as usize);
        let cols = self.width.min(rect.width as usize);
        for ty in 0..rows {
            for tx in 0..cols {
                let top = self.pixels[2 * ty * self.width + tx];
                let bottom = self.pixels[(2 * ty + 1) * self.width + tx];
                buf[(rect.x + tx as u16, rect.y + ty as u16)]
                    .set_symbol("▀")
                    .set_style(Style::default().fg(top).bg(bottom));
            }
        }
    }
}

/// Draw one frame. `end_fx` holds the end-of-game fade across frames; `delta_ms` drives it.
pub fn draw(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    end_fx: &mut Option<Effect>,
    delta_ms: u32,
) {
    let area = frame.area();
    let scale = Scale::for_area(area);
    let (pw, ph) = board_outer_size(scale);
    let total_w = pw + SIDEBAR_WIDTH;
    let total_h = ph.max(SIDEBAR_HEIGHT);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(total_w), Constraint::Fill(1)])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(total_h), Constraint::Fill(1)])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board_outer = Rect { height: ph.min(inner[0].height), ..inner[0] };

    let ended = matches!(session.phase(), Phase::Failed | Phase::Won);
    if !ended {
        *end_fx = None;
    }
    let tinted = ended && end_fx.as_ref().is_some_and(Effect::done);

    let board = draw_board(frame, session, theme, board_outer, scale, tinted);
    if ended {
        apply_end_fade(frame, session, theme, board, scale, end_fx, delta_ms);
    }
    draw_sidebar(frame, session, theme, inner[1]);

    match session.phase() {
        Phase::Intro => draw_intro(frame, theme, area),
        Phase::Paused => draw_popup(
            frame,
            theme,
            area,
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
            vec![" P - Resume    Q - Quit ".to_string()],
        ),
        Phase::Failed => draw_popup(
            frame,
            theme,
            area,
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
            vec![
                format!(" Lines: {} ", session.lines_cleared()),
                String::new(),
                " Space - Ride again    Q - Quit ".to_string(),
            ],
        ),
        Phase::Won => draw_popup(
            frame,
            theme,
            area,
            " You Won! ",
            Style::default().fg(Color::Black).bg(theme.title),
            vec![
                " Johnny has said his piece. ".to_string(),
                format!(" Lines: {} ", session.lines_cleared()),
                String::new(),
                " Space - Ride again    Q - Quit ".to_string(),
            ],
        ),
        Phase::Playing => {}
    }
}

/// Board with its border. Returns the inner rect the pixels went into.
fn draw_board(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    area: Rect,
    scale: Scale,
    tinted: bool,
) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Johnnymino ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let field = session.field();
    let end_tint = end_tint(session, theme);
    let mut canvas = Canvas::new(
        WIDTH * usize::from(scale.cols),
        HEIGHT * usize::from(scale.px),
        theme.bg,
    );

    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let Some(color) = field.cell(row, col).color() else {
                continue;
            };
            let mut fill = theme.block(color);
            if field.target == Some(color) {
                fill = mix(fill, theme.target, TARGET_TINT);
            }
            if tinted {
                fill = end_tint;
            }
            let y = row as f64 - field.fall_offset(row, col);
            canvas.block(y, col as f64, scale, fill);
        }
    }

    if let Some(piece) = session.piece() {
        let top = piece.display_row();
        let fill = if tinted { end_tint } else { theme.block(piece.color) };
        for (i, j) in piece.shape.filled() {
            canvas.block(top + i as f64, f64::from(piece.col) + j as f64, scale, fill);
        }
    }

    let (cw, ch) = (f64::from(scale.cols), f64::from(scale.px));
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let e = field.explosion(row, col);
            if e <= 0.0 {
                continue;
            }
            let size = explosion_size(e);
            let (cx, cy) = ((col as f64 + 0.5) * cw, (row as f64 + 0.5) * ch);
            let (w, h) = (size * cw, size * ch);
            canvas.fill(cx - w / 2.0, cy - h / 2.0, w, h, theme.explosion, explosion_alpha(e));
        }
    }

    canvas.render(frame, inner);
    inner
}

fn end_tint(session: &GameSession, theme: &Theme) -> Color {
    if session.phase() == Phase::Won { theme.title } else { theme.inactive_fg }
}

/// Fade the settled stack into grey (game over) or gold (victory).
fn apply_end_fade(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    board: Rect,
    scale: Scale,
    end_fx: &mut Option<Effect>,
    delta_ms: u32,
) {
    if end_fx.is_none() {
        // Positions are captured once, so wait for the stack to stop moving.
        if session.field().is_settling() {
            return;
        }
        let stack = stack_positions(session, board, scale);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| stack.contains(&(pos.x, pos.y))));
        let tint = end_tint(session, theme);
        let effect = fx::fade_to(tint, theme.bg, (END_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *end_fx = Some(effect);
    }
    if let Some(effect) = end_fx {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

/// Buffer positions covered by occupied cells.
fn stack_positions(session: &GameSession, board: Rect, scale: Scale) -> HashSet<(u16, u16)> {
    let field = session.field();
    let mut set = HashSet::new();
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            if field.cell(row, col) == Cell::Empty {
                continue;
            }
            let x0 = board.x + col as u16 * scale.cols;
            let top_px = row as u16 * scale.px;
            let y0 = board.y + top_px / 2;
            let y1 = board.y + (top_px + scale.px - 1) / 2;
            for x in x0..x0 + scale.cols {
                for y in y0..=y1 {
                    if x < board.right() && y < board.bottom() {
                        set.insert((x, y));
                    }
                }
            }
        }
    }
    set
}

fn section(frame: &mut Frame, theme: &Theme, area: Rect, title: &str) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    inner
}

fn draw_sidebar(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Bombs: icons (2 rows for the bob) + fuse
            Constraint::Length(1),
            Constraint::Length(6), // Colours with their keys
            Constraint::Length(1),
            Constraint::Length(4), // Stats
            Constraint::Length(1),
            Constraint::Length(3), // On air
        ])
        .split(area);

    draw_bombs(frame, session, theme, chunks[0]);
    draw_colours(frame, session, theme, chunks[2]);

    let fg = Style::default().fg(theme.main_fg);
    let label = Style::default().fg(theme.title);
    let stats = section(frame, theme, chunks[4], "Stats");
    Paragraph::new(Text::from(vec![
        Line::from(vec![
            Span::styled("Lines: ", label),
            Span::styled(session.lines_cleared().to_string(), fg),
        ]),
        Line::from(vec![
            Span::styled("State: ", label),
            Span::styled(format!("{:?}", session.phase()), fg),
        ]),
    ]))
    .render(stats, frame.buffer_mut());

    let on_air = section(frame, theme, chunks[6], "On air");
    let text = session.on_air().map_or_else(
        || Span::styled("(quiet)", Style::default().fg(theme.inactive_fg)),
        |clip| Span::styled(clip.label(), fg),
    );
    Paragraph::new(Line::from(text)).render(on_air, frame.buffer_mut());
}

fn draw_bombs(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let inner = section(frame, theme, area, "Bombs");
    if inner.height < 3 {
        return;
    }
    let bombs = session.bombs();
    let buf = frame.buffer_mut();
    for i in 0..MAX_CHARGES {
        let x = inner.x + 1 + u16::from(i) * 4;
        if x >= inner.right() {
            break;
        }
        let (symbol, style) = if i < bombs.charges() {
            ("●", Style::default().fg(theme.bomb).bold())
        } else {
            ("○", Style::default().fg(theme.inactive_fg))
        };
        // High half of the bob sits on the upper row.
        let y = inner.y + u16::from(bombs.bob(i) <= 0.5);
        buf[(x, y)].set_symbol(symbol).set_style(style);
    }

    let fuse_area = Rect { y: inner.y + 2, height: 1, ..inner };
    match session.field().target {
        Some(color) if bombs.is_armed() => {
            Gauge::default()
                .ratio(bombs.fuse())
                .label(format!("{} {:.1}s", color.name(), bombs.timer() / 1000.0))
                .gauge_style(Style::default().fg(theme.block(color)).bg(theme.bg))
                .render(fuse_area, frame.buffer_mut());
        }
        _ => {
            Paragraph::new(Span::styled("space: cycle", Style::default().fg(theme.inactive_fg)))
                .render(fuse_area, frame.buffer_mut());
        }
    }
}

fn draw_colours(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let inner = section(frame, theme, area, "Colours");
    let keys = ['a', 's', 'd', 'w'];
    let target = session.field().target;
    let lines: Vec<Line> = BlockColor::ALL
        .iter()
        .zip(keys)
        .map(|(&color, key)| {
            let marker = if target == Some(color) { " ◀" } else { "" };
            Line::from(vec![
                Span::styled(format!("[{key}] "), Style::default().fg(theme.main_fg)),
                Span::styled("██", Style::default().fg(theme.block(color))),
                Span::styled(format!(" {}{marker}", color.name()), Style::default().fg(theme.main_fg)),
            ])
        })
        .collect();
    Paragraph::new(Text::from(lines)).render(inner, frame.buffer_mut());
}

fn draw_intro(frame: &mut Frame, theme: &Theme, area: Rect) {
    draw_popup(
        frame,
        theme,
        area,
        " Johnnymino ",
        Style::default().fg(Color::Black).bg(theme.title),
        vec![
            " Clear lines and Johnny talks. ".to_string(),
            " Hear him out to win. ".to_string(),
            String::new(),
            " ←/→ move   ↑ rotate   ↓ drop ".to_string(),
            " a s d w  bomb a colour ".to_string(),
            String::new(),
            " Space - Start    Q - Quit ".to_string(),
        ],
    );
}

/// Centered box: a highlighted heading over plain lines.
fn draw_popup(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    heading: &str,
    heading_style: Style,
    body: Vec<String>,
) {
    let width = body
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(heading.chars().count()) as u16
        + 4;
    let height = body.len() as u16 + 5;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    };

    let buf = frame.buffer_mut();
    for y in popup.top()..popup.bottom() {
        for x in popup.left()..popup.right() {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(theme.bg));
        }
    }

    let mut lines = vec![Line::from(""), Line::from(Span::styled(heading.to_string(), heading_style)), Line::from("")];
    lines.extend(
        body.into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(theme.main_fg)))),
    );
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Command;
    use crate::rng::make_rng;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(session: &GameSession, width: u16, height: u16, end_fx: &mut Option<Effect>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|f| draw(f, session, &theme, end_fx, 16))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn explosion_easing_endpoints() {
        assert_eq!(explosion_size(1.0), 0.0);
        assert!((explosion_size(0.0) - 1.3).abs() < 1e-12);
        assert_eq!(explosion_alpha(1.0), 1.0);
        assert_eq!(explosion_alpha(0.0), 0.0);
    }

    #[test]
    fn mix_blends_rgb() {
        let black = Color::Rgb(0, 0, 0);
        let white = Color::Rgb(255, 255, 255);
        assert_eq!(mix(black, white, 0.0), black);
        assert_eq!(mix(black, white, 1.0), white);
        assert_eq!(mix(black, white, 0.5), Color::Rgb(128, 128, 128));
        assert_eq!(mix(Color::Red, Color::Blue, 0.7), Color::Blue);
    }

    #[test]
    fn canvas_fill_clips() {
        let mut c = Canvas::new(4, 4, Color::Rgb(0, 0, 0));
        c.fill(-2.0, -2.0, 10.0, 3.0, Color::Rgb(9, 9, 9), 1.0);
        assert_eq!(c.pixels[0], Color::Rgb(9, 9, 9));
        assert_eq!(c.pixels[4 + 3], Color::Rgb(0, 0, 0));
    }

    #[test]
    fn draws_every_phase_without_panicking() {
        let mut session = GameSession::with_rng(make_rng(Some(1)), 100.0);
        let mut fx = None;
        for (w, h) in [(80, 30), (120, 40), (30, 12), (5, 3)] {
            render(&session, w, h, &mut fx);
        }
        let intro = render(&session, 80, 30, &mut fx);
        assert!(intro.contains("Johnnymino"));

        session.apply(Command::StartOrRetry);
        session.tick(16.0);
        render(&session, 80, 30, &mut fx);
        session.apply(Command::TogglePause);
        assert!(render(&session, 80, 30, &mut fx).contains("Paused"));
        assert!(fx.is_none());
    }

    #[test]
    fn end_fade_starts_when_the_game_ends() {
        let mut session = GameSession::with_rng(make_rng(Some(2)), 100.0);
        session.apply(Command::StartOrRetry);
        for _ in 0..20_000 {
            if session.phase() != Phase::Playing {
                break;
            }
            session.apply(Command::FastFall);
            session.tick(16.0);
        }
        // Let the last clear settle.
        for _ in 0..200 {
            session.tick(16.0);
        }
        let mut fx = None;
        let screen = render(&session, 80, 30, &mut fx);
        match session.phase() {
            Phase::Failed => assert!(screen.contains("Game Over")),
            Phase::Won => assert!(screen.contains("You Won")),
            other => panic!("game still running: {other:?}"),
        }
        assert!(fx.is_some());
    }
}
