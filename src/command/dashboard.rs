//! `dashboard` subcommand: an interactive ratatui front-end over the
//! cooperative scheduler, polling for key events between ticks so the
//! scheduler's detached capture threads always get a chance to drain.

use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::dashboard::{Scheduler, tui};

const TICK_RATE: Duration = Duration::from_millis(250);

pub fn run(session: &str) -> Result<()> {
    let mux = super::default_backend();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, Scheduler::new(mux.clone(), session), mux.as_ref());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut scheduler: Scheduler,
    mux: &dyn crate::multiplexer::Multiplexer,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        scheduler.tick()?;

        let preview = scheduler
            .selected_pane_id()
            .map(|id| mux.capture_pane_output(id, 200).unwrap_or_default());

        terminal.draw(|f| tui::render(f, &scheduler, preview.as_deref()))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => select_relative(&mut scheduler, 1),
                    KeyCode::Up | KeyCode::Char('k') => select_relative(&mut scheduler, -1),
                    KeyCode::Char('z') => scheduler.toggle_zoom(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    }
}

fn select_relative(scheduler: &mut Scheduler, delta: i32) {
    let panes = scheduler.panes();
    if panes.is_empty() {
        return;
    }
    let current = scheduler
        .selected_pane_id()
        .and_then(|id| panes.iter().position(|p| p.id == id));
    let next = match current {
        Some(idx) => (idx as i32 + delta).rem_euclid(panes.len() as i32) as usize,
        None => 0,
    };
    scheduler.select(panes[next].id.clone());
}
