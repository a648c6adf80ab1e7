//! Interactive TUI and the controller that owns all mutable state
//!
//! The controller loop is the single consumer of every engine event (scan,
//! delete, recalc) and the only code that touches the row set, so row
//! mutation needs no locking. Background work communicates exclusively by
//! sending [`AppEvent`]s into the bounded inbox.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::deleter;
use crate::events::{AppEvent, DeleteResult, RecalcResult, ScanEvent, TargetHit};
use crate::scanner::{self, ScanOptions};

/// One discovered target directory, as displayed and mutated by the
/// controller. Deleted entries are retained so history and errors stay
/// visible; a deleted entry is never marked.
#[derive(Debug, Clone)]
pub struct Entry {
    pub rel_path: String,
    pub target: String,
    pub category: String,
    pub size_bytes: u64,
    pub marked: bool,
    pub deleted: bool,
    pub delete_err: Option<String>,
}

impl Entry {
    fn from_hit(hit: TargetHit) -> Self {
        Self {
            rel_path: hit.rel_path,
            target: hit.target,
            category: hit.category,
            size_bytes: hit.size_bytes,
            marked: false,
            deleted: false,
            delete_err: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    SizeDesc,
    SizeAsc,
    NameAsc,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::SizeDesc => SortMode::SizeAsc,
            SortMode::SizeAsc => SortMode::NameAsc,
            SortMode::NameAsc => SortMode::SizeDesc,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortMode::SizeDesc => "size desc",
            SortMode::SizeAsc => "size asc",
            SortMode::NameAsc => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmAction {
    DeleteOne,
    DeleteMarked,
}

/// Pending yes/no question with the frozen list of paths it covers.
#[derive(Debug)]
struct ConfirmRequest {
    action: ConfirmAction,
    paths: Vec<String>,
}

/// The active delete batch: the frozen queue plus how far it has advanced.
/// At most one batch exists at a time.
#[derive(Debug)]
struct DeleteBatch {
    queue: Vec<String>,
    done: usize,
    failed: usize,
}

pub struct App {
    opts: ScanOptions,
    rows: Vec<Entry>,
    sort_mode: SortMode,
    table_state: TableState,

    scanning: bool,
    scan_id: u64,
    scan_cancel: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    scan_visited: u64,
    scan_found: u64,
    scan_elapsed: Duration,
    scan_started: Instant,
    scan_pulse: f64,
    pulse_dir: f64,
    warnings: Vec<String>,
    scan_error: Option<String>,

    last_event: String,
    confirm: Option<ConfirmRequest>,
    confirm_deletes: bool,
    batch: Option<DeleteBatch>,
    show_help: bool,
    should_quit: bool,

    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
}

impl App {
    pub fn new(opts: ScanOptions, confirm_deletes: bool) -> Self {
        // Capacity 1: the scan producer hands events over one at a time and
        // blocks until the controller has taken the previous one.
        let (events_tx, events_rx) = mpsc::channel(1);

        Self {
            opts,
            rows: Vec::new(),
            sort_mode: SortMode::SizeDesc,
            table_state: TableState::default(),
            scanning: false,
            scan_id: 0,
            scan_cancel: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            scan_visited: 0,
            scan_found: 0,
            scan_elapsed: Duration::ZERO,
            scan_started: Instant::now(),
            scan_pulse: 0.0,
            pulse_dir: 1.0,
            warnings: Vec::new(),
            scan_error: None,
            last_event: String::new(),
            confirm: None,
            confirm_deletes,
            batch: None,
            show_help: false,
            should_quit: false,
            events_tx,
            events_rx,
        }
    }

    pub fn rows(&self) -> &[Entry] {
        &self.rows
    }

    /// Total bytes across non-deleted rows, queued count, deleted count.
    pub fn stats(&self) -> (u64, usize, usize) {
        let mut total = 0u64;
        let mut queued = 0;
        let mut deleted = 0;
        for row in &self.rows {
            if !row.deleted {
                total += row.size_bytes;
            }
            if row.marked {
                queued += 1;
            }
            if row.deleted {
                deleted += 1;
            }
        }
        (total, queued, deleted)
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.start_scan();
        let result = self.run_event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.scanning {
                self.advance_pulse();
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            // Apply whatever the engine produced, one event at a time.
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event);
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    // ---- event handling -------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Scan(scan_event) => {
                // Events from a superseded scan must never resurrect rows.
                if scan_event.scan_id() != self.scan_id {
                    return;
                }
                self.handle_scan_event(scan_event);
            }
            AppEvent::Delete(result) => self.apply_delete_result(result),
            AppEvent::Recalc(result) => self.apply_recalc_result(result),
        }
    }

    fn handle_scan_event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Hit { hit, .. } => {
                self.last_event = format!("Found: {}", hit.rel_path);
                self.rows.push(Entry::from_hit(hit));
                self.scan_found += 1;
            }
            ScanEvent::Progress { visited, found, .. } => {
                self.scan_visited = visited;
                self.scan_found = found;
            }
            ScanEvent::Finished(summary) => {
                self.scanning = false;
                self.warnings = summary.warnings;
                self.scan_error = summary.error;
                self.scan_elapsed = summary.elapsed;
                self.scan_visited = summary.visited;
                self.scan_found = summary.found;
                self.sort_rows();
                if !self.rows.is_empty() && self.table_state.selected().is_none() {
                    self.table_state.select(Some(0));
                }
                self.last_event = match &self.scan_error {
                    None => format!("Scan complete: {} items", self.rows.len()),
                    Some(err) => format!("Scan failed: {}", err),
                };
            }
        }
    }

    fn apply_delete_result(&mut self, result: DeleteResult) {
        if let Some(row) = self
            .rows
            .iter_mut()
            .find(|r| r.rel_path == result.rel_path)
        {
            match &result.error {
                Some(err) => row.delete_err = Some(err.clone()),
                None => {
                    row.deleted = true;
                    row.marked = false;
                    row.delete_err = None;
                }
            }
        }

        let Some(batch) = self.batch.as_mut() else {
            return;
        };
        batch.done += 1;
        if result.error.is_some() {
            batch.failed += 1;
        }

        if batch.done >= batch.queue.len() {
            let total = batch.queue.len();
            let failed = batch.failed;
            self.batch = None;
            self.last_event = if failed > 0 {
                format!("Deleted {} item(s), {} failed", total - failed, failed)
            } else {
                format!("Deleted {} item(s)", total)
            };
        } else {
            // Dispatch-next-on-result: the queue advances only here.
            let next = batch.queue[batch.done].clone();
            deleter::spawn_delete(self.opts.root.clone(), next, self.events_tx.clone());
        }
    }

    fn apply_recalc_result(&mut self, result: RecalcResult) {
        match result.size {
            Err(err) => self.last_event = format!("Recalc failed: {}", err),
            Ok(size) => {
                if let Some(row) = self
                    .rows
                    .iter_mut()
                    .find(|r| r.rel_path == result.rel_path)
                {
                    row.size_bytes = size;
                    self.last_event = "Size recalculated".to_string();
                }
            }
        }
    }

    // ---- user intents ---------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Ctrl-c quits from any state, including an open prompt.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return;
        }

        if self.confirm.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_confirm(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.answer_confirm(false)
                }
                _ => {}
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('?') | KeyCode::Char('h') => self.show_help = true,
            KeyCode::Char('r') => self.start_scan(),
            KeyCode::Char('s') => {
                self.sort_mode = self.sort_mode.next();
                self.sort_rows();
                self.last_event = format!("Sorted by {}", self.sort_mode.display_name());
            }
            KeyCode::Char(' ') => self.toggle_mark(),
            KeyCode::Char('a') => self.mark_all(),
            KeyCode::Char('A') => self.clear_marks(),
            KeyCode::Char('D') => self.request_delete_marked(),
            KeyCode::Enter | KeyCode::Char('d') => self.request_delete_selected(),
            KeyCode::Char('u') => self.request_recalc_selected(),
            KeyCode::Char('c') => {
                self.confirm_deletes = !self.confirm_deletes;
                self.last_event = if self.confirm_deletes {
                    "Confirm prompts enabled".to_string()
                } else {
                    "Confirm prompts disabled".to_string()
                };
            }
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            _ => {}
        }
    }

    fn quit(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.scan_cancel.store(true, Ordering::Relaxed);
        self.should_quit = true;
    }

    /// Cancel any in-flight scan and start a new generation with cleared
    /// state. Stale events are fenced off by the generation id even if they
    /// are already in the channel.
    fn start_scan(&mut self) {
        self.scan_cancel.store(true, Ordering::Relaxed);
        self.scan_cancel = Arc::new(AtomicBool::new(false));
        self.scan_id += 1;
        self.scanning = true;
        self.rows.clear();
        self.warnings.clear();
        self.scan_error = None;
        self.scan_visited = 0;
        self.scan_found = 0;
        self.scan_elapsed = Duration::ZERO;
        self.scan_started = Instant::now();
        self.scan_pulse = 0.0;
        self.pulse_dir = 1.0;
        self.last_event = "Scanning...".to_string();
        self.table_state.select(None);

        let opts = self.opts.clone();
        let scan_id = self.scan_id;
        let cancel = self.scan_cancel.clone();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || scanner::run_scan(opts, scan_id, &cancel, &tx));
    }

    fn selected_row(&self) -> Option<&Entry> {
        self.table_state
            .selected()
            .and_then(|idx| self.rows.get(idx))
    }

    fn select_next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let next = match self.table_state.selected() {
            Some(idx) if idx + 1 < self.rows.len() => idx + 1,
            Some(idx) => idx,
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    fn select_previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let prev = match self.table_state.selected() {
            Some(idx) => idx.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(prev));
    }

    fn toggle_mark(&mut self) {
        let Some(idx) = self.table_state.selected() else {
            return;
        };
        let Some(row) = self.rows.get_mut(idx) else {
            return;
        };
        if row.deleted {
            return;
        }
        row.marked = !row.marked;
        self.last_event = if row.marked {
            "Added to queue".to_string()
        } else {
            "Removed from queue".to_string()
        };
    }

    fn mark_all(&mut self) {
        let mut count = 0;
        for row in &mut self.rows {
            if !row.deleted && !row.marked {
                row.marked = true;
                count += 1;
            }
        }
        self.last_event = if count > 0 {
            format!("Queued {} item(s)", count)
        } else {
            "Queue already full".to_string()
        };
    }

    fn clear_marks(&mut self) {
        let mut count = 0;
        for row in &mut self.rows {
            if row.marked {
                row.marked = false;
                count += 1;
            }
        }
        self.last_event = if count > 0 {
            "Cleared queue".to_string()
        } else {
            "Queue already empty".to_string()
        };
    }

    fn request_delete_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if row.deleted {
            self.last_event = "Already deleted".to_string();
            return;
        }
        let paths = vec![row.rel_path.clone()];
        if self.confirm_deletes {
            self.confirm = Some(ConfirmRequest {
                action: ConfirmAction::DeleteOne,
                paths,
            });
        } else {
            self.start_delete(paths);
        }
    }

    fn request_delete_marked(&mut self) {
        let paths: Vec<String> = self
            .rows
            .iter()
            .filter(|row| row.marked && !row.deleted)
            .map(|row| row.rel_path.clone())
            .collect();
        if paths.is_empty() {
            self.last_event = "Queue is empty".to_string();
            return;
        }
        if self.confirm_deletes {
            self.confirm = Some(ConfirmRequest {
                action: ConfirmAction::DeleteMarked,
                paths,
            });
        } else {
            self.start_delete(paths);
        }
    }

    fn answer_confirm(&mut self, yes: bool) {
        let Some(request) = self.confirm.take() else {
            return;
        };
        if yes {
            self.start_delete(request.paths);
        } else {
            self.last_event = "Deletion cancelled".to_string();
        }
    }

    fn start_delete(&mut self, paths: Vec<String>) {
        if paths.is_empty() || self.batch.is_some() {
            return;
        }
        self.last_event = format!("Deleting {} item(s)...", paths.len());
        let first = paths[0].clone();
        self.batch = Some(DeleteBatch {
            queue: paths,
            done: 0,
            failed: 0,
        });
        deleter::spawn_delete(self.opts.root.clone(), first, self.events_tx.clone());
    }

    /// Out-of-band size refresh for one row; no interaction with the scan
    /// generation or the delete queue.
    fn request_recalc_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if row.deleted {
            return;
        }
        let rel_path = row.rel_path.clone();
        let abs = match self.opts.root.resolve(&rel_path) {
            Ok(path) => path,
            Err(err) => {
                self.last_event = format!("Recalc failed: {}", err);
                return;
            }
        };
        self.last_event = "Recalculating size...".to_string();
        let cancel = self.shutdown.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let size = tokio::task::spawn_blocking(move || scanner::dir_size(&abs, &cancel))
                .await
                .map_err(|err| err.to_string())
                .and_then(|res| res.map_err(|err| err.to_string()));
            let _ = tx
                .send(AppEvent::Recalc(RecalcResult { rel_path, size }))
                .await;
        });
    }

    /// Stable sort; deleted rows always after live ones, ties broken by
    /// case-insensitive path.
    fn sort_rows(&mut self) {
        let mode = self.sort_mode;
        self.rows.sort_by(|a, b| {
            a.deleted.cmp(&b.deleted).then_with(|| {
                let by_path = a.rel_path.to_lowercase().cmp(&b.rel_path.to_lowercase());
                match mode {
                    SortMode::SizeDesc => b.size_bytes.cmp(&a.size_bytes).then(by_path),
                    SortMode::SizeAsc => a.size_bytes.cmp(&b.size_bytes).then(by_path),
                    SortMode::NameAsc => by_path,
                }
            })
        });
    }

    fn advance_pulse(&mut self) {
        self.scan_pulse += 0.06 * self.pulse_dir;
        if self.scan_pulse >= 1.0 {
            self.scan_pulse = 1.0;
            self.pulse_dir = -1.0;
        } else if self.scan_pulse <= 0.0 {
            self.scan_pulse = 0.0;
            self.pulse_dir = 1.0;
        }
    }

    // ---- rendering ------------------------------------------------------

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(4),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        if self.show_help {
            self.render_help(f, chunks[1]);
        } else {
            self.render_table(f, chunks[1]);
        }
        self.render_status(f, chunks[2]);
        self.render_footer(f, chunks[3]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(
                "devsweep",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("root: {}", self.opts.root.path().display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  "),
            Span::styled(
                format!("targets: {}", self.opts.targets.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let paragraph =
            Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect) {
        let header = Row::new(vec!["Path", "Size", "Target", "Category", "Status"]).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|entry| {
                let (status, style) = if entry.delete_err.is_some() {
                    ("error", Style::default().fg(Color::Red))
                } else if entry.deleted {
                    ("deleted", Style::default().fg(Color::Red))
                } else if entry.marked {
                    ("queued", Style::default().fg(Color::Cyan))
                } else {
                    ("ready", Style::default().fg(Color::DarkGray))
                };
                Row::new(vec![
                    Cell::from(entry.rel_path.clone()),
                    Cell::from(format_size(entry.size_bytes)),
                    Cell::from(entry.target.clone()),
                    Cell::from(entry.category.clone()),
                    Cell::from(status).style(style),
                ])
            })
            .collect();

        let widths = [
            Constraint::Min(30),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Targets"))
            .row_highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        if self.scanning {
            let elapsed = self.scan_started.elapsed().as_secs();
            let (total, _, _) = self.stats();
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Scanning"))
                .gauge_style(Style::default().fg(Color::Cyan))
                .ratio(self.scan_pulse)
                .label(format!(
                    "visited {} | found {} | total {} | {}s",
                    self.scan_visited,
                    self.scan_found,
                    format_size(total),
                    elapsed
                ));
            f.render_widget(gauge, area);
            return;
        }

        if let Some(batch) = &self.batch {
            let total = batch.queue.len();
            let ratio = if total > 0 {
                batch.done as f64 / total as f64
            } else {
                1.0
            };
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Deleting"))
                .gauge_style(Style::default().fg(Color::Red))
                .ratio(ratio)
                .label(format!("{}/{}", batch.done, total));
            f.render_widget(gauge, area);
            return;
        }

        let (total, queued, deleted) = self.stats();
        let mut parts = vec![
            format!("Items: {}", self.rows.len()),
            format!("Total: {}", format_size(total)),
            format!("Queued: {}", queued),
            format!("Deleted: {}", deleted),
            format!("Sort: {}", self.sort_mode.display_name()),
            format!(
                "Confirm: {}",
                if self.confirm_deletes { "on" } else { "off" }
            ),
        ];
        if self.scan_elapsed > Duration::ZERO {
            parts.push(format!("Scan: {}ms", self.scan_elapsed.as_millis()));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("Warnings: {}", self.warnings.len()));
        }
        let line = if let Some(err) = &self.scan_error {
            Line::from(Span::styled(
                format!("Error: {}", err),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
        } else {
            Line::from(parts.join(" | "))
        };
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(paragraph, area);
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        if let Some(request) = &self.confirm {
            let label = match request.action {
                ConfirmAction::DeleteMarked => {
                    format!("Delete {} marked item(s)? (y/n)", request.paths.len())
                }
                ConfirmAction::DeleteOne => {
                    format!("Delete {}? (y/n)", request.paths[0])
                }
            };
            let paragraph = Paragraph::new(Line::from(Span::styled(
                label,
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            )))
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(paragraph, area);
            return;
        }

        let text = vec![
            Line::from(Span::styled(
                &self.last_event,
                Style::default().fg(Color::Yellow),
            )),
            Line::from(
                "space: queue | a: queue all | d: delete | D: delete marked | s: sort | r: rescan | ?: help | q: quit",
            ),
        ];
        let paragraph =
            Paragraph::new(text).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from(vec![Span::styled(
                "devsweep - Keyboard Shortcuts",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Queue:",
                Style::default().fg(Color::Yellow),
            )]),
            Line::from("  space       Queue/unqueue selected row"),
            Line::from("  a           Queue all rows"),
            Line::from("  A           Clear the queue"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Actions:",
                Style::default().fg(Color::Yellow),
            )]),
            Line::from("  enter/d     Delete selected row"),
            Line::from("  D           Delete all queued rows"),
            Line::from("  u           Recalculate size of selected row"),
            Line::from("  r           Rescan from the root"),
            Line::from("  s           Cycle sort mode"),
            Line::from("  c           Toggle confirmation prompts"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "General:",
                Style::default().fg(Color::Yellow),
            )]),
            Line::from("  j/k or arrows   Navigate"),
            Line::from("  y/n/esc         Answer a confirmation prompt"),
            Line::from("  ?               Show this help"),
            Line::from("  q / ctrl-c      Quit"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Press any key to close",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )]),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help (?)"))
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ScanSummary;
    use crate::paths::ConfinedRoot;
    use crate::scanner::default_skip_dirs;
    use crate::targets::build_catalog;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_app(root: &Path, confirm_deletes: bool) -> App {
        let opts = ScanOptions {
            root: Arc::new(ConfinedRoot::open(root).unwrap()),
            targets: build_catalog(&[], &[]),
            skip_dirs: default_skip_dirs(),
            max_depth: 0,
        };
        App::new(opts, confirm_deletes)
    }

    fn entry(rel_path: &str, size: u64) -> Entry {
        Entry {
            rel_path: rel_path.to_string(),
            target: "node_modules".to_string(),
            category: "node".to_string(),
            size_bytes: size,
            marked: false,
            deleted: false,
            delete_err: None,
        }
    }

    fn hit_event(scan_id: u64, rel_path: &str, size: u64) -> AppEvent {
        AppEvent::Scan(ScanEvent::Hit {
            scan_id,
            hit: TargetHit {
                rel_path: rel_path.to_string(),
                target: "node_modules".to_string(),
                category: "node".to_string(),
                size_bytes: size,
            },
        })
    }

    fn finished_event(scan_id: u64) -> AppEvent {
        AppEvent::Scan(ScanEvent::Finished(ScanSummary {
            scan_id,
            warnings: Vec::new(),
            error: None,
            elapsed: Duration::from_millis(1),
            visited: 1,
            found: 0,
        }))
    }

    /// Pump the inbox until the delete batch drains, returning result paths
    /// in arrival order.
    async fn drain_batch(app: &mut App) -> Vec<String> {
        let mut order = Vec::new();
        while app.batch.is_some() {
            let event = app.events_rx.recv().await.expect("channel closed");
            if let AppEvent::Delete(result) = &event {
                order.push(result.rel_path.clone());
            }
            app.handle_event(event);
        }
        order
    }

    #[test]
    fn test_stale_generation_events_are_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.scan_id = 2;
        app.scanning = true;

        app.handle_event(hit_event(1, "old/node_modules", 10));
        assert!(app.rows.is_empty());

        app.handle_event(finished_event(1));
        assert!(app.scanning);

        app.handle_event(hit_event(2, "new/node_modules", 10));
        assert_eq!(app.rows.len(), 1);

        app.handle_event(finished_event(2));
        assert!(!app.scanning);
    }

    #[tokio::test]
    async fn test_rescan_clears_rows_and_bumps_generation() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);

        app.start_scan();
        assert_eq!(app.scan_id, 1);
        app.handle_event(hit_event(1, "proj/node_modules", 128));
        assert_eq!(app.rows.len(), 1);

        app.start_scan();
        assert_eq!(app.scan_id, 2);
        assert!(app.rows.is_empty());

        // A straggler from the cancelled generation changes nothing.
        app.handle_event(hit_event(1, "proj/node_modules", 128));
        assert!(app.rows.is_empty());
    }

    #[test]
    fn test_sort_modes_and_deleted_last() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.rows = vec![entry("b", 10), entry("a", 30), entry("C", 20)];
        app.rows[1].deleted = true;

        app.sort_mode = SortMode::SizeDesc;
        app.sort_rows();
        let order: Vec<&str> = app.rows.iter().map(|r| r.rel_path.as_str()).collect();
        assert_eq!(order, vec!["C", "b", "a"]);

        app.sort_mode = SortMode::SizeAsc;
        app.sort_rows();
        let order: Vec<&str> = app.rows.iter().map(|r| r.rel_path.as_str()).collect();
        assert_eq!(order, vec!["b", "C", "a"]);

        app.sort_mode = SortMode::NameAsc;
        app.sort_rows();
        let order: Vec<&str> = app.rows.iter().map(|r| r.rel_path.as_str()).collect();
        assert_eq!(order, vec!["b", "C", "a"]);

        // Re-applying the same mode is a no-op.
        app.sort_rows();
        let again: Vec<&str> = app.rows.iter().map(|r| r.rel_path.as_str()).collect();
        assert_eq!(again, vec!["b", "C", "a"]);
    }

    #[test]
    fn test_size_ties_break_by_case_insensitive_path() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.rows = vec![entry("Zeta", 10), entry("alpha", 10)];
        app.sort_mode = SortMode::SizeDesc;
        app.sort_rows();
        assert_eq!(app.rows[0].rel_path, "alpha");
    }

    #[test]
    fn test_mark_operations_respect_deleted_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.rows = vec![entry("a", 1), entry("b", 2)];
        app.rows[1].deleted = true;

        app.table_state.select(Some(0));
        app.toggle_mark();
        assert!(app.rows[0].marked);
        app.toggle_mark();
        assert!(!app.rows[0].marked);

        app.table_state.select(Some(1));
        app.toggle_mark();
        assert!(!app.rows[1].marked);

        app.mark_all();
        assert!(app.rows[0].marked);
        assert!(!app.rows[1].marked);

        app.clear_marks();
        assert!(!app.rows[0].marked);
    }

    #[test]
    fn test_confirm_decline_leaves_everything_untouched() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("x")).unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.rows = vec![entry("a", 1), entry("b", 2)];
        app.rows[0].marked = true;
        app.rows[1].marked = true;

        app.request_delete_marked();
        assert!(app.confirm.is_some());
        assert!(app.batch.is_none());

        app.answer_confirm(false);
        assert!(app.confirm.is_none());
        assert!(app.batch.is_none());
        assert!(app.rows.iter().all(|r| r.marked && !r.deleted));
        assert!(temp_dir.path().join("x").exists());
    }

    #[test]
    fn test_delete_request_rejected_for_empty_queue_or_deleted_row() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.rows = vec![entry("a", 1)];
        app.rows[0].deleted = true;

        app.request_delete_marked();
        assert!(app.confirm.is_none());
        assert_eq!(app.last_event, "Queue is empty");

        app.table_state.select(Some(0));
        app.request_delete_selected();
        assert!(app.confirm.is_none());
        assert_eq!(app.last_event, "Already deleted");
    }

    #[tokio::test]
    async fn test_marked_batch_deletes_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("one/node_modules")).unwrap();
        fs::create_dir_all(root.join("two/node_modules")).unwrap();

        let mut app = test_app(root, true);
        app.rows = vec![entry("one/node_modules", 1), entry("two/node_modules", 2)];
        app.rows[0].marked = true;
        app.rows[1].marked = true;

        app.request_delete_marked();
        app.answer_confirm(true);
        assert!(app.batch.is_some());

        let order = drain_batch(&mut app).await;
        assert_eq!(order, vec!["one/node_modules", "two/node_modules"]);
        assert!(app.rows.iter().all(|r| r.deleted && !r.marked));
        assert!(!root.join("one/node_modules").exists());
        assert!(!root.join("two/node_modules").exists());
        assert_eq!(app.last_event, "Deleted 2 item(s)");
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_row_and_continues_queue() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("real/node_modules")).unwrap();

        let mut app = test_app(root, false);
        app.rows = vec![entry("ghost/node_modules", 1), entry("real/node_modules", 2)];
        app.rows[0].marked = true;
        app.rows[1].marked = true;

        app.request_delete_marked();
        let order = drain_batch(&mut app).await;
        assert_eq!(order.len(), 2);

        assert!(!app.rows[0].deleted);
        assert!(app.rows[0].delete_err.is_some());
        assert!(app.rows[1].deleted);
        assert!(!root.join("real/node_modules").exists());
        assert_eq!(app.last_event, "Deleted 1 item(s), 1 failed");
    }

    #[tokio::test]
    async fn test_invalid_path_delete_fails_without_filesystem_change() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), false);
        app.rows = vec![entry("/etc", 1)];
        app.table_state.select(Some(0));

        app.request_delete_selected();
        let order = drain_batch(&mut app).await;
        assert_eq!(order, vec!["/etc"]);
        assert!(!app.rows[0].deleted);
        assert!(app.rows[0].delete_err.is_some());
    }

    #[tokio::test]
    async fn test_only_one_batch_at_a_time() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();

        let mut app = test_app(root, false);
        app.rows = vec![entry("a", 1), entry("b", 2)];

        app.start_delete(vec!["a".to_string()]);
        assert!(app.batch.is_some());
        // A second request while one is active is a no-op.
        app.start_delete(vec!["b".to_string()]);
        assert_eq!(app.batch.as_ref().unwrap().queue, vec!["a".to_string()]);

        drain_batch(&mut app).await;
        assert!(root.join("b").exists());
    }

    #[tokio::test]
    async fn test_recalc_overwrites_size_and_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("proj/node_modules")).unwrap();
        fs::write(root.join("proj/node_modules/a.js"), vec![0u8; 64]).unwrap();

        let mut app = test_app(root, false);
        app.rows = vec![entry("proj/node_modules", 1)];
        app.table_state.select(Some(0));

        for _ in 0..2 {
            app.request_recalc_selected();
            let event = app.events_rx.recv().await.unwrap();
            app.handle_event(event);
            assert_eq!(app.rows[0].size_bytes, 64);
        }
    }

    #[tokio::test]
    async fn test_recalc_failure_leaves_row_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), false);
        app.rows = vec![entry("missing/node_modules", 42)];
        app.table_state.select(Some(0));

        app.request_recalc_selected();
        let event = app.events_rx.recv().await.unwrap();
        app.handle_event(event);

        assert_eq!(app.rows[0].size_bytes, 42);
        assert!(app.last_event.starts_with("Recalc failed"));
    }

    #[test]
    fn test_stats_exclude_deleted_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = test_app(temp_dir.path(), true);
        app.rows = vec![entry("a", 100), entry("b", 200), entry("c", 300)];
        app.rows[0].marked = true;
        app.rows[2].deleted = true;

        let (total, queued, deleted) = app.stats();
        assert_eq!(total, 300);
        assert_eq!(queued, 1);
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_sort_mode_cycle() {
        assert_eq!(SortMode::SizeDesc.next(), SortMode::SizeAsc);
        assert_eq!(SortMode::SizeAsc.next(), SortMode::NameAsc);
        assert_eq!(SortMode::NameAsc.next(), SortMode::SizeDesc);
    }
}
