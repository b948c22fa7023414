use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, ProgressEvent, ProgressSink, RESTART_NOTICE, describe_report};
use crate::community::{GamesSource, fetch_games};
use crate::domain::GameRecord;
use crate::error::AppManifestError;
use crate::library::GameLibrary;

const LOGS_MAX: usize = 200;
const PAGE: usize = 10;
const MANUAL: &[&str] = &[
    "1. Enter the profile name from https://steamcommunity.com/id/<name>",
    "   and press Enter (or F5) to load its games. The profile must be public.",
    "2. Check the Steam library path (the steamapps directory).",
    "3. Type in the search box to filter, move with Up/Down,",
    "   and toggle games with Space.",
    "4. Press F2 to write appmanifest files for the checked games.",
    "",
    "Tab/Shift-Tab switch fields   F4 message log   Esc/F10 quit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Profile,
    Library,
    Search,
    List,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Profile => Focus::Library,
            Focus::Library => Focus::Search,
            Focus::Search => Focus::List,
            Focus::List => Focus::Profile,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Profile => Focus::List,
            Focus::Library => Focus::Profile,
            Focus::Search => Focus::Library,
            Focus::List => Focus::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Main,
    Logs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Refresh,
    Write,
    Quit,
}

#[derive(Debug, Clone)]
struct Popup {
    title: &'static str,
    lines: Vec<String>,
    is_error: bool,
}

#[derive(Debug)]
struct UiState {
    focus: Focus,
    view: View,
    profile_input: String,
    library_input: String,
    search_input: String,
    cursor: usize,
    popup: Option<Popup>,
    status: String,
    logs: VecDeque<String>,
    log_scroll: u16,
    busy: bool,
}

struct FetchJob {
    profile: String,
    started: Instant,
    rx: Receiver<Result<Vec<GameRecord>, AppManifestError>>,
    handle: JoinHandle<()>,
}

/// Collects progress messages so they can be moved into the log after the
/// call that produced them returns.
#[derive(Default)]
struct TuiProgress {
    events: std::cell::RefCell<Vec<String>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        let message = match event.elapsed {
            Some(elapsed) => format!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => event.message,
        };
        self.events.borrow_mut().push(message);
    }
}

pub struct Tui<S: GamesSource + 'static> {
    app: App<S>,
    state: UiState,
}

impl<S: GamesSource + 'static> Tui<S> {
    pub fn new(app: App<S>, profile: Option<String>) -> Self {
        let library_input = app.library_path().to_string();
        Self {
            app,
            state: UiState::new(profile.unwrap_or_default(), library_input),
        }
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        let mut pending: Option<FetchJob> = None;
        let mut tick = 0usize;
        loop {
            let library = self.app.library();
            terminal
                .draw(|frame| draw_ui(frame, &self.state, library, tick))
                .into_diagnostic()?;

            if let Some(job) = pending.take() {
                match job.rx.try_recv() {
                    Ok(result) => {
                        job.handle.join().ok();
                        self.finish_fetch(&job.profile, job.started, result);
                    }
                    Err(TryRecvError::Empty) => pending = Some(job),
                    Err(TryRecvError::Disconnected) => {
                        job.handle.join().ok();
                        self.state.busy = false;
                        self.state
                            .show_error("Refresh failed", "the fetch worker stopped unexpectedly");
                    }
                }
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    match self.state.handle_key(key, self.app.library_mut()) {
                        Action::Quit => break,
                        Action::Refresh if pending.is_none() => {
                            pending = Some(self.start_fetch());
                        }
                        Action::Write if pending.is_none() => self.write_manifests(),
                        _ => {}
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        if let Some(job) = pending {
            // The worker finishes on its own once the request times out.
            drop(job.rx);
        }
        Ok(())
    }

    fn start_fetch(&mut self) -> FetchJob {
        let profile = self.state.profile_input.clone();
        self.state.busy = true;
        self.state.status = format!("Fetching games for {}...", profile.trim());
        self.state.log(format!("fetching games for {}", profile.trim()));

        let (tx, rx) = mpsc::channel();
        let source = self.app.source();
        let worker_profile = profile.clone();
        let handle = thread::spawn(move || {
            tx.send(fetch_games(source.as_ref(), &worker_profile)).ok();
        });

        FetchJob {
            profile,
            started: Instant::now(),
            rx,
            handle,
        }
    }

    fn finish_fetch(
        &mut self,
        profile: &str,
        started: Instant,
        result: Result<Vec<GameRecord>, AppManifestError>,
    ) {
        self.state.busy = false;
        match result {
            Ok(games) => {
                let count = self.app.install_batch(games);
                self.state.cursor = 0;
                self.state.status = format!("Loaded {count} games for {}", profile.trim());
                self.state.log(format!(
                    "loaded {count} games ({} ms)",
                    started.elapsed().as_millis()
                ));
            }
            Err(err) => {
                tracing::warn!("refresh failed: {err}");
                self.state.status = "Refresh failed".to_string();
                self.state.show_error("Refresh failed", &err.to_string());
            }
        }
    }

    fn write_manifests(&mut self) {
        self.app.set_library_path(self.state.library_input.trim());
        let progress = TuiProgress::default();
        let result = self.app.write_selected(&progress);
        for message in progress.events.take() {
            self.state.log(message);
        }
        match result {
            Ok(report) => {
                let message = describe_report(&report);
                self.state.status = format!("Wrote {} manifest file(s)", report.written);
                self.state.popup = Some(Popup {
                    title: "Manifests",
                    lines: message.lines().map(str::to_string).collect(),
                    is_error: !report.is_complete(),
                });
            }
            Err(err) => self.state.show_error("Write failed", &err.to_string()),
        }
    }
}

impl UiState {
    fn new(profile_input: String, library_input: String) -> Self {
        let focus = if profile_input.is_empty() {
            Focus::Profile
        } else {
            Focus::Search
        };
        Self {
            focus,
            view: View::Main,
            profile_input,
            library_input,
            search_input: String::new(),
            cursor: 0,
            popup: None,
            status: "ready".to_string(),
            logs: VecDeque::new(),
            log_scroll: 0,
            busy: false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, library: &mut GameLibrary) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if matches!(key.code, KeyCode::F(10)) || (ctrl && key.code == KeyCode::Char('c')) {
            return Action::Quit;
        }

        if self.popup.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.popup = None;
            }
            return Action::None;
        }

        match key.code {
            KeyCode::Esc => {
                if self.view == View::Logs {
                    self.view = View::Main;
                    return Action::None;
                }
                return Action::Quit;
            }
            KeyCode::F(1) => {
                self.popup = Some(Popup {
                    title: "Manual",
                    lines: MANUAL
                        .iter()
                        .map(|line| line.to_string())
                        .chain([String::new(), RESTART_NOTICE.to_string()])
                        .collect(),
                    is_error: false,
                });
                return Action::None;
            }
            KeyCode::F(2) => return self.busy_guard(Action::Write),
            KeyCode::F(4) => {
                self.view = match self.view {
                    View::Main => View::Logs,
                    View::Logs => View::Main,
                };
                return Action::None;
            }
            KeyCode::F(5) => return self.busy_guard(Action::Refresh),
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return Action::None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return Action::None;
            }
            _ => {}
        }

        if self.view == View::Logs {
            match key.code {
                KeyCode::PageUp | KeyCode::Up => self.scroll_logs(-5),
                KeyCode::PageDown | KeyCode::Down => self.scroll_logs(5),
                _ => {}
            }
            return Action::None;
        }

        match self.focus {
            Focus::Profile => match key.code {
                KeyCode::Enter => return self.busy_guard(Action::Refresh),
                KeyCode::Backspace => {
                    self.profile_input.pop();
                }
                KeyCode::Char(ch) if !ctrl => self.profile_input.push(ch),
                _ => {}
            },
            Focus::Library => match key.code {
                KeyCode::Enter => self.focus = Focus::Search,
                KeyCode::Backspace => {
                    self.library_input.pop();
                }
                KeyCode::Char(ch) if !ctrl => self.library_input.push(ch),
                _ => {}
            },
            Focus::Search => match key.code {
                KeyCode::Enter | KeyCode::Down => self.focus = Focus::List,
                KeyCode::Backspace => {
                    self.search_input.pop();
                    self.apply_filter(library);
                }
                KeyCode::Char(ch) if !ctrl => {
                    self.search_input.push(ch);
                    self.apply_filter(library);
                }
                _ => {}
            },
            Focus::List => {
                let visible = library.visible_records().len();
                match key.code {
                    KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
                    KeyCode::Down => self.move_cursor(1, visible),
                    KeyCode::PageUp => self.cursor = self.cursor.saturating_sub(PAGE),
                    KeyCode::PageDown => self.move_cursor(PAGE, visible),
                    KeyCode::Home => self.cursor = 0,
                    KeyCode::End => self.cursor = visible.saturating_sub(1),
                    KeyCode::Char(' ') | KeyCode::Enter => self.toggle_current(library),
                    KeyCode::Char('/') => self.focus = Focus::Search,
                    _ => {}
                }
            }
        }
        Action::None
    }

    fn busy_guard(&mut self, action: Action) -> Action {
        if self.busy {
            self.status = "Still fetching, please wait".to_string();
            return Action::None;
        }
        action
    }

    fn apply_filter(&mut self, library: &mut GameLibrary) {
        library.set_filter(&self.search_input);
        let visible = library.visible_records().len();
        self.cursor = self.cursor.min(visible.saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: usize, visible: usize) {
        self.cursor = (self.cursor + delta).min(visible.saturating_sub(1));
    }

    fn toggle_current(&mut self, library: &mut GameLibrary) {
        let handle = library
            .visible_records()
            .get(self.cursor)
            .map(|entry| entry.handle);
        if let Some(handle) = handle {
            library.toggle(handle);
        }
    }

    fn show_error(&mut self, title: &'static str, message: &str) {
        self.log(format!("{title}: {message}"));
        self.popup = Some(Popup {
            title,
            lines: vec![message.to_string()],
            is_error: true,
        });
    }

    fn log(&mut self, message: String) {
        self.logs.push_back(format!("[{}] {message}", timestamp()));
        while self.logs.len() > LOGS_MAX {
            self.logs.pop_front();
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max_scroll = self.logs.len().saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll.max(0));
        self.log_scroll = next as u16;
    }
}

fn draw_ui(frame: &mut ratatui::Frame, state: &UiState, library: &GameLibrary, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(state, library, tick), chunks[0]);
    draw_input(
        frame,
        state,
        chunks[1],
        Focus::Profile,
        "Profile  https://steamcommunity.com/id/",
        &state.profile_input,
    );
    draw_input(
        frame,
        state,
        chunks[2],
        Focus::Library,
        "Steam Library Path",
        &state.library_input,
    );
    draw_input(
        frame,
        state,
        chunks[3],
        Focus::Search,
        "Search games",
        &state.search_input,
    );

    match state.view {
        View::Main => draw_games(frame, state, library, chunks[4]),
        View::Logs => frame.render_widget(draw_logs_view(state), chunks[4]),
    }

    frame.render_widget(draw_footer(state), chunks[5]);

    if let Some(popup) = &state.popup {
        draw_popup(frame, popup);
    }
}

fn draw_header(state: &UiState, library: &GameLibrary, tick: usize) -> Paragraph<'static> {
    let activity = if state.busy {
        const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
        SPINNER[tick % SPINNER.len()]
    } else {
        " "
    };
    let title = Line::from(vec![
        Span::styled(
            "STEAM-APPMANIFEST",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw(format!(
            "   Games: {}   Visible: {}   Selected: {}   ",
            library.len(),
            library.visible_records().len(),
            library.selected_count()
        )),
        Span::styled(activity, Style::default().fg(Color::Green)),
    ]);
    let notice = Line::from(Span::styled(
        RESTART_NOTICE,
        Style::default().fg(Color::Yellow),
    ));
    Paragraph::new(vec![title, notice])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_input(
    frame: &mut ratatui::Frame,
    state: &UiState,
    area: Rect,
    field: Focus,
    title: &'static str,
    value: &str,
) {
    let focused = state.focus == field && state.popup.is_none();
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title);
    let para = Paragraph::new(Line::from(value.to_string())).block(block);
    frame.render_widget(para, area);

    if focused {
        let max_x = area.x.saturating_add(area.width.saturating_sub(2));
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(value.chars().count() as u16)
            .min(max_x);
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn draw_games(frame: &mut ratatui::Frame, state: &UiState, library: &GameLibrary, area: Rect) {
    let visible = library.visible_records();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|entry| {
            let mark = if entry.record.selected { "[x] " } else { "[ ] " };
            let mark_style = if entry.record.selected {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, mark_style),
                Span::raw(entry.record.name.clone()),
                Span::styled(
                    format!("  {}", entry.record.app_id),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let border = if state.focus == Focus::List {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = if library.is_empty() {
        "Games (enter a profile and press Enter to load)".to_string()
    } else {
        format!("Games ({}/{})", visible.len(), library.len())
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if !visible.is_empty() {
        list_state.select(Some(state.cursor.min(visible.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_logs_view(state: &UiState) -> Paragraph<'static> {
    let total = state.logs.len();
    let visible = 12usize;
    let start = total.saturating_sub(state.log_scroll as usize + visible);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(start)
        .take(visible)
        .map(|line| Line::from(line.clone()))
        .collect();
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Messages (PgUp/PgDn to scroll, F4 to close)"),
        )
        .wrap(Wrap { trim: true })
}

fn draw_footer(state: &UiState) -> Paragraph<'static> {
    let keys = Line::from(vec![
        Span::styled("F1", Style::default().fg(Color::Cyan)),
        Span::raw(" Manual  "),
        Span::styled("F2", Style::default().fg(Color::Cyan)),
        Span::raw(" Write manifests  "),
        Span::styled("F4", Style::default().fg(Color::Cyan)),
        Span::raw(" Messages  "),
        Span::styled("F5", Style::default().fg(Color::Cyan)),
        Span::raw(" Refresh  "),
        Span::styled("Space", Style::default().fg(Color::Cyan)),
        Span::raw(" Toggle  "),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::raw(" Quit"),
    ]);
    let status = Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::Gray)),
        Span::raw(state.status.clone()),
    ]);
    Paragraph::new(vec![keys, status])
}

fn draw_popup(frame: &mut ratatui::Frame, popup: &Popup) {
    let area = centered_rect(70, popup.lines.len() as u16 + 4, frame.area());
    let color = if popup.is_error {
        Color::Red
    } else {
        Color::Cyan
    };
    let mut lines: Vec<Line> = popup
        .lines
        .iter()
        .map(|line| Line::from(line.clone()))
        .collect();
    lines.push(Line::from(Span::styled(
        "Press Enter to close",
        Style::default().fg(Color::DarkGray),
    )));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(popup.title);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width.saturating_mul(percent_x) / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
