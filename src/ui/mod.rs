use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Row, Sparkline, Table},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use crate::dashboard::{Chart, ChartData};
use crate::histogram::BinClass;
use crate::hittest::{hit_test, HitTestParams};
use crate::model::Diet;
use crate::poll::{PollUpdate, Pollers};
use crate::terrain::{tile_color, Rgb, BACKGROUND};
use crate::viewer::ViewerState;
use crate::viewport::SurfaceTransform;

/// Host-side knobs for the render loop.
#[derive(Debug, Clone, Copy)]
pub struct UiOptions {
    pub smoothing: f64,
    pub frame: Duration,
    pub hit_params: HitTestParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    World,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    fn prefix(self) -> &'static str {
        match self {
            Species::Herbivore => "herbivore",
            Species::Carnivore => "carnivore",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Species::Herbivore => Species::Carnivore,
            Species::Carnivore => Species::Herbivore,
        }
    }
}

struct ViewControls {
    tab: Tab,
    species: Species,
}

/// Runs the interactive viewer until the user quits, then stops the poll
/// tasks. The terminal loop itself is blocking, so it runs on a blocking
/// thread while the pollers stay on the async runtime.
pub async fn run(
    state: ViewerState,
    pollers: Pollers,
    updates: mpsc::Receiver<PollUpdate>,
    options: UiOptions,
) -> Result<()> {
    let pollers = tokio::task::spawn_blocking(move || -> Result<Pollers> {
        ui_loop(state, &pollers, updates, options)?;
        Ok(pollers)
    })
    .await
    .context("viewer UI thread panicked")??;

    pollers.shutdown().await;
    Ok(())
}

struct TerminalCleanup;

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, DisableMouseCapture);
    }
}

fn ui_loop(
    mut state: ViewerState,
    pollers: &Pollers,
    mut updates: mpsc::Receiver<PollUpdate>,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
    let _cleanup = TerminalCleanup;

    let mut controls = ViewControls {
        tab: Tab::World,
        species: Species::Herbivore,
    };
    let mut map_area = Rect::default();

    loop {
        // Apply whatever the pollers delivered since the last frame. Each
        // message lands as one atomic step before anything is drawn.
        while let Ok(update) = updates.try_recv() {
            state.apply_update(update);
        }

        state.frame(options.smoothing);

        terminal
            .draw(|frame| {
                map_area = draw(frame, &state, &controls);
            })
            .context("failed to draw frame")?;

        if !event::poll(options.frame).context("failed to poll terminal events")? {
            continue;
        }
        match event::read().context("failed to read terminal event")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                // Raw mode swallows the interrupt signal.
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Tab => {
                    controls.tab = match controls.tab {
                        Tab::World => Tab::Stats,
                        Tab::Stats => Tab::World,
                    };
                }
                KeyCode::Char('s') => controls.species = controls.species.toggled(),
                KeyCode::Char('r') => {
                    // Re-applying the current viewport forces a refetch.
                    pollers.set_viewport(state.viewport());
                }
                KeyCode::Left | KeyCode::Char('h') => pan(&mut state, pollers, -1, 0),
                KeyCode::Right | KeyCode::Char('l') => pan(&mut state, pollers, 1, 0),
                KeyCode::Up | KeyCode::Char('k') => pan(&mut state, pollers, 0, -1),
                KeyCode::Down | KeyCode::Char('j') => pan(&mut state, pollers, 0, 1),
                _ => {}
            },
            Event::Mouse(mouse) => {
                if controls.tab == Tab::World {
                    handle_click(&mut state, pollers, mouse, map_area, options.hit_params);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn pan(state: &mut ViewerState, pollers: &Pollers, dx: i64, dy: i64) {
    let next = state.viewport().pan(dx, dy);
    state.set_viewport(next);
    pollers.set_viewport(next);
}

fn handle_click(
    state: &mut ViewerState,
    pollers: &Pollers,
    mouse: MouseEvent,
    map_area: Rect,
    params: HitTestParams,
) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    let inside = mouse.column >= map_area.x
        && mouse.column < map_area.x + map_area.width
        && mouse.row >= map_area.y
        && mouse.row < map_area.y + map_area.height;
    if !inside {
        return;
    }

    let surface_x = (mouse.column - map_area.x) as f64 + 0.5;
    let surface_y = (mouse.row - map_area.y) as f64 + 0.5;
    let transform = SurfaceTransform::new(
        state.viewport(),
        map_area.width as f64,
        map_area.height as f64,
    );
    match hit_test(surface_x, surface_y, &transform, &state.critters, params) {
        Some(id) => {
            state.selection.select(id);
            state.selection.sync(&state.critters);
            pollers.request_detail(id);
        }
        None => state.selection.clear(),
    }
}

/// Draws one frame and returns the map widget's inner area, which the input
/// handler needs for pointer hit-testing.
fn draw(frame: &mut Frame, state: &ViewerState, controls: &ViewControls) -> Rect {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_header(frame, layout[0], state);
    draw_footer(frame, layout[2], controls.tab);

    match controls.tab {
        Tab::World => draw_world(frame, layout[1], state),
        Tab::Stats => {
            draw_stats(frame, layout[1], state, controls.species);
            Rect::default()
        }
    }
}

fn draw_header(frame: &mut Frame, area: Rect, state: &ViewerState) {
    let mut status = vec![
        Span::styled(
            "critterscope ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("view {} ", state.viewport().to_query())),
        Span::raw(format!("critters {} ", state.critters.len())),
    ];
    if let Some(season) = &state.season {
        status.push(Span::styled(
            format!("season {season} "),
            Style::default().fg(Color::Green),
        ));
    }
    if let Some(at) = state.last_live_at {
        status.push(Span::styled(
            format!("polled {} ", at.format("%H:%M:%S")),
            Style::default().fg(Color::Gray),
        ));
    }

    let mut lines = vec![Line::from(status)];
    if let Some(error) = &state.last_error {
        lines.push(Line::from(Span::styled(
            format!("last error: {error}"),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "connected",
            Style::default().fg(Color::Gray),
        )));
    }

    let header = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, tab: Tab) {
    let hints = match tab {
        Tab::World => "arrows/hjkl pan · click select · r refresh · Tab stats · q quit",
        Tab::Stats => "s species · Tab world · q quit",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        area,
    );
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn diet_color(diet: Diet) -> Color {
    match diet {
        Diet::Herbivore => Color::Rgb(250, 250, 120),
        Diet::Carnivore => Color::Rgb(240, 80, 80),
        Diet::Unknown => Color::Rgb(200, 200, 200),
    }
}

fn draw_world(frame: &mut Frame, area: Rect, state: &ViewerState) -> Rect {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(36)])
        .split(area);

    let map_block = Block::default().borders(Borders::ALL).title("world");
    let map_area = map_block.inner(columns[0]);
    frame.render_widget(map_block, columns[0]);
    draw_map(frame, map_area, state);

    draw_detail(frame, columns[1], state);
    map_area
}

fn draw_map(frame: &mut Frame, area: Rect, state: &ViewerState) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let viewport = state.viewport();
    let transform = SurfaceTransform::new(viewport, area.width as f64, area.height as f64);

    // Terrain first: every surface cell maps back to a world cell, misses
    // render as background.
    let mut cells: Vec<Vec<(char, Color, Color)>> = (0..area.height)
        .map(|row| {
            (0..area.width)
                .map(|col| {
                    let (wx, wy) =
                        transform.surface_to_world(col as f64 + 0.5, row as f64 + 0.5);
                    let bg = viewport
                        .cell_of(wx.floor() as i64, wy.floor() as i64)
                        .and_then(|(c, r)| state.terrain.tile_at_cell(c, r))
                        .map(tile_color)
                        .unwrap_or(BACKGROUND);
                    (' ', to_color(bg), to_color(bg))
                })
                .collect()
        })
        .collect();

    // Entity markers over the terrain. A record that transforms to nonsense
    // is skipped; it must not take the rest of the frame down with it.
    let selected = state.selection.selected();
    for record in state.critters.iter() {
        let (sx, sy) = transform.world_to_surface(record.current_x, record.current_y);
        if !sx.is_finite() || !sy.is_finite() || sx < 0.0 || sy < 0.0 {
            continue;
        }
        let (col, row) = (sx.floor() as usize, sy.floor() as usize);
        if col >= area.width as usize || row >= area.height as usize {
            continue;
        }
        let marker = if selected == Some(record.id()) { '◉' } else { '●' };
        let cell = &mut cells[row][col];
        *cell = (marker, diet_color(record.snapshot.diet), cell.2);
    }

    let lines: Vec<Line> = cells
        .into_iter()
        .map(|row| {
            Line::from(
                row.into_iter()
                    .map(|(ch, fg, bg)| {
                        Span::styled(ch.to_string(), Style::default().fg(fg).bg(bg))
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_detail(frame: &mut Frame, area: Rect, state: &ViewerState) {
    let block = Block::default().borders(Borders::ALL).title("critter");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(detail) = state.selection.detail() else {
        frame.render_widget(
            Paragraph::new("click a critter to inspect it"),
            inner,
        );
        return;
    };

    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("id ", label),
            Span::raw(detail.id.to_string()),
            Span::styled("  diet ", label),
            Span::styled(format!("{:?}", detail.diet), Style::default().fg(diet_color(detail.diet))),
        ]),
        Line::from(vec![
            Span::styled("pos ", label),
            Span::raw(format!("({:.0}, {:.0})", detail.x, detail.y)),
            Span::styled("  age ", label),
            Span::raw(detail.age.to_string()),
        ]),
        Line::from(vec![
            Span::styled("health ", label),
            Span::raw(format!("{:.0}/{:.0}", detail.health, detail.max_health)),
            Span::styled("  energy ", label),
            Span::raw(format!("{:.0}", detail.energy)),
        ]),
        Line::from(vec![
            Span::styled("hunger ", label),
            Span::raw(format!("{:.0}", detail.hunger)),
            Span::styled("  thirst ", label),
            Span::raw(format!("{:.0}", detail.thirst)),
        ]),
        Line::from(vec![
            Span::styled("speed ", label),
            Span::raw(format!("{:.1}", detail.speed)),
            Span::styled("  size ", label),
            Span::raw(format!("{:.1}", detail.size)),
        ]),
        Line::from(vec![
            Span::styled("goal ", label),
            Span::raw(detail.goal.clone()),
        ]),
        Line::from(vec![
            Span::styled("last action ", label),
            Span::raw(detail.last_action.clone()),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "events",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];

    let remaining = (inner.height as usize).saturating_sub(lines.len());
    if state.selection.events().is_empty() {
        lines.push(Line::from(Span::styled("(loading...)", label)));
    }
    for event in state.selection.events().iter().take(remaining) {
        lines.push(Line::from(vec![
            Span::styled(format!("{:>6} ", event.tick), label),
            Span::raw(format!("{} {}", event.event, event.description)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_stats(frame: &mut Frame, area: Rect, state: &ViewerState, species: Species) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(8),
            Constraint::Length(9),
        ])
        .split(area);

    draw_population(frame, rows[0], state);

    let histograms = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
        ])
        .split(rows[1]);
    for (slot, family) in ["energy", "hunger", "thirst", "age"].iter().enumerate() {
        let id = format!("{}_{}", species.prefix(), family);
        draw_histogram(frame, histograms[slot], state.dashboard.chart(&id), family);
    }

    let breakdowns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(rows[2]);
    let health_id = format!("{}_health", species.prefix());
    draw_breakdown(frame, breakdowns[0], state.dashboard.chart(&health_id), "health");
    draw_breakdown(frame, breakdowns[1], state.dashboard.chart("goals"), "goals");
    draw_breakdown(frame, breakdowns[2], state.dashboard.chart("deaths"), "deaths");
}

fn draw_population(frame: &mut Frame, area: Rect, state: &ViewerState) {
    let block = Block::default().borders(Borders::ALL).title("population");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(Chart {
        data: ChartData::Series { series, .. },
        ..
    }) = state.dashboard.chart("population")
    else {
        frame.render_widget(Paragraph::new("no history yet"), inner);
        return;
    };
    let Some((_, totals)) = series.first() else {
        return;
    };

    let latest = totals.last().copied().unwrap_or(0);
    let sparkline = Sparkline::default()
        .data(totals)
        .style(Style::default().fg(Color::Cyan));
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    frame.render_widget(
        Paragraph::new(format!("current {latest}")),
        parts[0],
    );
    frame.render_widget(sparkline, parts[1]);
}

fn class_color(class: BinClass) -> Color {
    match class {
        BinClass::Good => Color::Green,
        BinClass::Warning => Color::Yellow,
        BinClass::Critical => Color::Red,
    }
}

fn draw_histogram(frame: &mut Frame, area: Rect, chart: Option<&Chart>, title: &str) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(Chart {
        data: ChartData::Bins(bins),
        ..
    }) = chart
    else {
        frame.render_widget(Paragraph::new("no data"), inner);
        return;
    };
    if bins.is_empty() {
        frame.render_widget(Paragraph::new("no data"), inner);
        return;
    }

    let bars: Vec<Bar> = bins
        .iter()
        .map(|bin| {
            Bar::default()
                .value(bin.count)
                .label(Line::from(bin.lower.to_string()))
                .style(Style::default().fg(class_color(bin.class)))
        })
        .collect();
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(3)
        .bar_gap(1);
    frame.render_widget(chart, inner);
}

fn draw_breakdown(frame: &mut Frame, area: Rect, chart: Option<&Chart>, title: &str) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(Chart {
        data: ChartData::Breakdown(rows),
        ..
    }) = chart
    else {
        frame.render_widget(Paragraph::new("no data"), inner);
        return;
    };

    let table_rows: Vec<Row> = rows
        .iter()
        .take(inner.height as usize)
        .map(|(label, count)| Row::new(vec![label.clone(), count.to_string()]))
        .collect();
    let table = Table::new(
        table_rows,
        [Constraint::Percentage(70), Constraint::Percentage(30)],
    );
    frame.render_widget(table, inner);
}
