use std::{
    io::stdout,
    time::{Duration, Instant},
};

use crate::error::TrackerError;
use crate::gui::error::TrackerGuiError;
use crate::session::{SessionController, TickReport};
use crate::telemetry::{DeviceMode, TelemetryFrame};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::{error, info};
use rand::Rng;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        block::{Position, Title},
        canvas::{Canvas, Context, Line as CanvasLine},
        *,
    },
    Terminal,
};

const COLOR_BACKGROUND: Color = Color::Rgb(20, 20, 40);
const COLOR_GOAL_IDLE: Color = Color::Rgb(255, 0, 0);
const COLOR_GOAL_RUNNING: Color = Color::Rgb(0, 255, 0);
const COLOR_USER: Color = Color::Rgb(255, 240, 200);

// The goal line is dashed: out of every stripe cycle, the span between
// these two fractions is left blank.
const STRIPE_CYCLES: usize = 16;
const STRIPE_GAP_START: f64 = 15.0 / 40.0;
const STRIPE_GAP_END: f64 = 25.0 / 40.0;

/// Everything the operator can do from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Start a test, or stop the running one.
    ToggleTest,
    /// Switch the device mode.
    SetMode(DeviceMode),
    /// Bring the device back to its initial state.
    ResetDevice,
    /// Jump the goal to a random position.
    RandomGoal,
    /// Move the user position by this many nudge steps.
    Nudge(f64),
    /// Leave the display.
    Quit,
}

/// Maps a key to what it does. Up moves the user line up the screen, which
/// is towards `0.0`.
pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('t') => Some(Action::ToggleTest),
        KeyCode::Char('f') => Some(Action::SetMode(DeviceMode::Frequency)),
        KeyCode::Char('i') => Some(Action::SetMode(DeviceMode::Intensity)),
        KeyCode::Char('q') => Some(Action::ResetDevice),
        KeyCode::Char('g') => Some(Action::RandomGoal),
        KeyCode::Up => Some(Action::Nudge(-1.0)),
        KeyCode::Down => Some(Action::Nudge(1.0)),
        _ => None,
    }
}

struct App<'a, R: Rng> {
    controller: &'a mut SessionController<R>,
    user_value: f64,
    status: Option<String>,
    quit: bool,
}

impl<'a, R: Rng> App<'a, R> {
    fn new(controller: &'a mut SessionController<R>) -> Self {
        Self {
            controller,
            user_value: 0.5,
            status: None,
            quit: false,
        }
    }

    fn apply(&mut self, action: Action, now_millis: u64) {
        match action {
            Action::ToggleTest => {
                let res = self.controller.toggle(now_millis);
                self.report(res.map(|_| ()));
            }
            Action::SetMode(mode) => self.controller.set_mode(mode),
            Action::ResetDevice => self.controller.reset_device(),
            Action::RandomGoal => self.controller.request_random_goal(now_millis),
            Action::Nudge(steps) => {
                let step = self.controller.config().nudge_step;
                self.user_value = (self.user_value + steps * step).clamp(0.0, 1.0);
            }
            Action::Quit => self.quit = true,
        }
    }

    fn tick(&mut self, now_millis: u64) -> TickReport {
        match self.controller.tick(now_millis, self.user_value) {
            Ok(report) => report,
            Err(e) => {
                self.report(Err(e));
                TickReport {
                    goal: self.controller.current_goal(),
                    target: self.controller.target_goal(),
                    active: self.controller.is_active(),
                    frame: TelemetryFrame::from_user_value(self.user_value),
                }
            }
        }
    }

    fn report(&mut self, res: Result<(), TrackerError>) {
        match res {
            Ok(()) => self.status = None,
            Err(e) => {
                error!("{}", e);
                self.status = Some(e.to_string());
            }
        }
    }
}

/// Runs the tracking display until the operator presses Esc. A test that
/// is still running at that point is stopped and its log written.
pub fn run_tracker<R: Rng>(controller: &mut SessionController<R>) -> Result<(), TrackerGuiError> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let frame_period = Duration::from_secs_f64(1.0 / controller.config().frame_rate as f64);
    let clock = Instant::now();
    let mut app = App::new(controller);

    let res = run_loop(&mut terminal, &mut app, clock, frame_period);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    // The test is ended and its log written even if the loop failed.
    let ended = app.controller.deactivate(millis_since(clock));
    res?;
    if let Some(path) = ended? {
        info!("Trial log written to {}", path.display());
    }
    Ok(())
}

fn millis_since(clock: Instant) -> u64 {
    clock.elapsed().as_millis() as u64
}

fn run_loop<B: Backend, R: Rng>(
    terminal: &mut Terminal<B>,
    app: &mut App<R>,
    clock: Instant,
    frame_period: Duration,
) -> Result<(), TrackerGuiError> {
    while !app.quit {
        let frame_start = Instant::now();
        let now = millis_since(clock);

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                let Some(action) = action_for(key.code) else {
                    continue;
                };
                let accepted = match action {
                    Action::Nudge(_) => key.kind != KeyEventKind::Release,
                    _ => key.kind == KeyEventKind::Press,
                };
                if accepted {
                    app.apply(action, now);
                }
            }
        }

        let report = app.tick(now);
        terminal.draw(|f| ui(f, &*app, &report))?;

        if let Some(rest) = frame_period.checked_sub(frame_start.elapsed()) {
            spin_sleep::sleep(rest);
        }
    }
    Ok(())
}

fn ui<R: Rng>(f: &mut Frame, app: &App<R>, report: &TickReport) {
    let ctl = &app.controller;
    let state = if report.active {
        format!(
            " Test {} running, {} goals left ",
            ctl.sequence_index(),
            ctl.goals_remaining()
        )
        .green()
        .bold()
    } else {
        " Idle ".red().bold()
    };
    let device = match (ctl.has_device(), ctl.mode()) {
        (false, _) => " no device ".dark_gray(),
        (true, DeviceMode::Intensity) => format!(" intensity {} ", report.frame).white(),
        (true, DeviceMode::Frequency) => format!(" frequency {} ", report.frame).white(),
    };
    let mut title = vec![state, device];
    if let Some(status) = &app.status {
        title.push(format!(" {} ", status).on_red());
    }

    let instructions = Title::from(Line::from(vec![
        " Test ".into(),
        "<T>".magenta().bold(),
        " Move ".into(),
        "<Up>/<Down>".magenta().bold(),
        " Random goal ".into(),
        "<G>".magenta().bold(),
        " Mode ".into(),
        "<F>/<I>".magenta().bold(),
        " Reset ".into(),
        "<Q>".magenta().bold(),
        " Quit ".into(),
        "<Esc> ".magenta().bold(),
    ]));
    let block = Block::default()
        .title(Title::from(Line::from(title)).alignment(Alignment::Center))
        .title(
            instructions
                .alignment(Alignment::Center)
                .position(Position::Bottom),
        )
        .borders(Borders::ALL);

    let goal = report.goal;
    let goal_color = if report.active {
        COLOR_GOAL_RUNNING
    } else {
        COLOR_GOAL_IDLE
    };
    let user = app.user_value;

    let canvas = Canvas::default()
        .block(block)
        .background_color(COLOR_BACKGROUND)
        .marker(Marker::Braille)
        .x_bounds([0.0, 1.0])
        .y_bounds([0.0, 1.0])
        .paint(move |ctx| {
            draw_striped_line(ctx, to_screen(goal), goal_color);
            ctx.layer();
            ctx.draw(&CanvasLine {
                x1: 0.0,
                y1: to_screen(user),
                x2: 1.0,
                y2: to_screen(user),
                color: COLOR_USER,
            });
        });

    f.render_widget(canvas, f.size());
}

// Positions grow downwards on screen, the canvas y axis grows upwards.
fn to_screen(value: f64) -> f64 {
    1.0 - value
}

fn draw_striped_line(ctx: &mut Context, y: f64, color: Color) {
    let cycle = 1.0 / STRIPE_CYCLES as f64;
    for i in 0..STRIPE_CYCLES {
        let x = i as f64 * cycle;
        for (from, to) in [(0.0, STRIPE_GAP_START), (STRIPE_GAP_END, 1.0)] {
            ctx.draw(&CanvasLine {
                x1: x + from * cycle,
                y1: y,
                x2: x + to * cycle,
                y2: y,
                color,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use tempfile::TempDir;

    fn idle_controller() -> (TempDir, SessionController) {
        let dir = tempfile::tempdir().unwrap();
        let config = ExperimentConfig {
            log_prefix: dir.path().join("gui").to_string_lossy().into_owned(),
            ..ExperimentConfig::default()
        };
        (dir, SessionController::new(config, None))
    }

    #[test]
    fn key_bindings() {
        assert_eq!(action_for(KeyCode::Char('t')), Some(Action::ToggleTest));
        assert_eq!(
            action_for(KeyCode::Char('f')),
            Some(Action::SetMode(DeviceMode::Frequency))
        );
        assert_eq!(action_for(KeyCode::Char('q')), Some(Action::ResetDevice));
        assert_eq!(action_for(KeyCode::Esc), Some(Action::Quit));
        assert_eq!(action_for(KeyCode::Char('x')), None);
    }

    #[test]
    fn nudges_are_clamped() {
        let (_dir, mut controller) = idle_controller();
        let mut app = App::new(&mut controller);

        app.apply(Action::Nudge(1.0), 0);
        assert!((app.user_value - 0.51).abs() < 1e-9);

        for _ in 0..200 {
            app.apply(Action::Nudge(-1.0), 0);
        }
        assert_eq!(app.user_value, 0.0);
    }

    #[test]
    fn quit_and_random_goal() {
        let (_dir, mut controller) = idle_controller();
        let mut app = App::new(&mut controller);

        app.apply(Action::RandomGoal, 0);
        assert!(app.controller.is_tweening());
        assert!(!app.quit);
        app.apply(Action::Quit, 0);
        assert!(app.quit);
    }

    #[test]
    fn toggle_runs_a_test() {
        let (dir, mut controller) = idle_controller();
        let mut app = App::new(&mut controller);

        app.apply(Action::ToggleTest, 0);
        assert!(app.tick(16).active);
        app.apply(Action::ToggleTest, 32);
        assert!(!app.tick(48).active);
        assert!(app.status.is_none());
        assert!(dir.path().join("gui_1.csv").exists());
    }
}
