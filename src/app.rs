use std::sync::{Arc, mpsc};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::i18n::Language;
use crate::maintenance::{Action, Maintenance, MaintenanceError, Outcome, Progress};
use crate::model::config::AppConfig;
use crate::model::file_browser::{FileBrowser, FileFilter};
use crate::model::form::{Field, Form, FormError};
use crate::model::input::TextInput;
use crate::model::mode::Mode;
use crate::msg::Msg;
use crate::remote::{Connector, SshConnector};
use crate::worker::{Worker, WorkerError};

const LABEL_WIDTH: usize = 16;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Dialog {
    kind: DialogKind,
    title: String,
    message: String,
    /// Reports the end of an action; closing it returns the status to ready.
    ends_action: bool,
}

#[derive(Debug, Clone)]
enum Status {
    Ready,
    Progress(Progress),
    Done(Outcome),
    Failed(String),
}

pub struct App {
    pub mode: Mode,
    pub form: Form,
    browser: Option<FileBrowser>,
    dialog: Option<Dialog>,
    status: Status,
    lang: Language,
    config: AppConfig,
    worker: Worker,
    connector: Arc<dyn Connector>,
    maintenance: Arc<Maintenance>,
    pub should_quit: bool,
    event_tx: mpsc::Sender<Msg>,
    tick: usize,
}

impl App {
    pub fn new(config: AppConfig, event_tx: mpsc::Sender<Msg>) -> Self {
        let connector = Arc::new(SshConnector::new(config.shell_timing()));
        Self::with_connector(config, event_tx, connector)
    }

    pub fn with_connector(
        config: AppConfig,
        event_tx: mpsc::Sender<Msg>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            mode: Mode::Form,
            form: Form::from_config(&config),
            browser: None,
            dialog: None,
            status: Status::Ready,
            lang: config.language(),
            maintenance: Arc::new(Maintenance::from_config(&config)),
            config,
            worker: Worker::default(),
            connector,
            should_quit: false,
            event_tx,
            tick: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key)?,
            Msg::JobProgress(progress) => {
                tracing::debug!("progress: {progress:?}");
                self.status = Status::Progress(progress);
            }
            Msg::JobFinished(result) => self.handle_job_finished(result),
            Msg::Tick => self.tick = self.tick.wrapping_add(1),
            Msg::Resize(_, _) => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match self.mode {
            Mode::Form => self.handle_key_form(key),
            Mode::Browse => self.handle_key_browse(key),
            Mode::Dialog => self.handle_key_dialog(key),
        }
    }

    fn handle_key_form(&mut self, key: KeyEvent) -> Result<()> {
        let focus = self.form.focus();

        match key.code {
            KeyCode::Esc => self.request_quit(),
            KeyCode::F(2) => {
                self.lang = self.lang.toggled();
                tracing::info!("language switched to {}", self.lang.code());
            }
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_prev(),
            KeyCode::Enter if focus.is_button() => self.activate(focus)?,
            KeyCode::Char(' ') if focus.is_button() => self.activate(focus)?,
            KeyCode::Enter => self.form.focus_next(),
            _ => {
                if let Some(input) = self.form.focused_input_mut() {
                    edit_input(input, key);
                }
            }
        }

        Ok(())
    }

    fn handle_key_browse(&mut self, key: KeyEvent) -> Result<()> {
        let Some(browser) = self.browser.as_mut() else {
            self.mode = Mode::Form;
            return Ok(());
        };

        let result = match key.code {
            KeyCode::Esc => {
                self.close_browser();
                return Ok(());
            }
            KeyCode::Up | KeyCode::Char('k') => {
                browser.move_selection(-1);
                Ok(None)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                browser.move_selection(1);
                Ok(None)
            }
            KeyCode::PageUp => {
                browser.move_selection(-10);
                Ok(None)
            }
            KeyCode::PageDown => {
                browser.move_selection(10);
                Ok(None)
            }
            KeyCode::Tab => browser.toggle_filter().map(|()| None),
            KeyCode::Backspace | KeyCode::Left => browser.go_parent().map(|()| None),
            KeyCode::Enter | KeyCode::Right => browser.activate(),
            _ => Ok(None),
        };

        match result {
            Ok(Some(path)) => {
                tracing::info!("mask file selected: {}", path.display());
                self.form.mask_file = Some(path);
                self.close_browser();
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("file browser: {err}");
                self.close_browser();
                let title = self.lang.texts().error_title;
                self.show_dialog(DialogKind::Error, title, err.to_string(), false);
            }
        }

        Ok(())
    }

    fn handle_key_dialog(&mut self, key: KeyEvent) -> Result<()> {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            if let Some(dialog) = self.dialog.take() {
                if dialog.ends_action && !self.is_busy() {
                    self.status = Status::Ready;
                }
            }
            self.mode = Mode::Form;
        }
        Ok(())
    }

    fn request_quit(&mut self) {
        if self.is_busy() {
            self.warn_busy();
        } else {
            self.should_quit = true;
        }
    }

    fn activate(&mut self, field: Field) -> Result<()> {
        if self.is_busy() {
            self.warn_busy();
            return Ok(());
        }

        match field {
            Field::Browse => self.open_browser(),
            Field::UpdatePixelSizes => match self.form.pixel_sizes() {
                Ok((x, y)) => self.start_action(Action::UpdatePixelSizes { x, y }),
                Err(err) => self.show_form_error(&err),
            },
            Field::UploadMask => match self.form.mask_file.clone() {
                Some(local) => self.start_action(Action::UploadMask { local }),
                None => {
                    let t = self.lang.texts();
                    self.show_dialog(
                        DialogKind::Error,
                        t.error_title,
                        t.select_mask_first.to_string(),
                        false,
                    );
                }
            },
            Field::UpdatePowerSettings => match self.form.power_value() {
                Ok(value) => self.start_action(Action::UpdatePowerSettings { value }),
                Err(err) => self.show_form_error(&err),
            },
            _ => {}
        }

        Ok(())
    }

    fn start_action(&mut self, action: Action) {
        let params = self.form.connect_params(&self.config);
        let connector = Arc::clone(&self.connector);
        let maintenance = Arc::clone(&self.maintenance);
        let reporter = self.event_tx.clone();
        let done_tx = self.event_tx.clone();

        tracing::info!("starting {}", action.name());
        let spawned = self.worker.try_spawn(
            move || maintenance.run(connector.as_ref(), &params, &action, &reporter),
            move |result| {
                let _ = done_tx.send(Msg::JobFinished(result));
            },
        );

        match spawned {
            Ok(_) => {}
            Err(WorkerError::Busy) => self.warn_busy(),
            Err(err) => {
                tracing::error!("{err}");
                let title = self.lang.texts().error_title;
                self.show_dialog(DialogKind::Error, title, err.to_string(), false);
            }
        }
    }

    fn handle_job_finished(&mut self, result: Result<Outcome, MaintenanceError>) {
        let t = self.lang.texts();
        match result {
            Ok(outcome) => {
                let message = self.lang.outcome_message(&outcome);
                self.status = Status::Done(outcome);
                self.show_dialog(DialogKind::Info, t.success_title, message, true);
            }
            Err(err) => {
                tracing::error!("action failed: {err}");
                self.status = Status::Failed(self.lang.error_status(&err));
                let message = self.lang.error_message(&err);
                self.show_dialog(DialogKind::Error, t.error_title, message, true);
            }
        }
    }

    fn open_browser(&mut self) {
        let start = self
            .form
            .mask_file
            .as_ref()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(AppConfig::browse_start_dir);

        match FileBrowser::new(start) {
            Ok(browser) => {
                self.browser = Some(browser);
                self.mode = Mode::Browse;
            }
            Err(err) => {
                tracing::warn!("cannot open file browser: {err}");
                let title = self.lang.texts().error_title;
                self.show_dialog(DialogKind::Error, title, err.to_string(), false);
            }
        }
    }

    fn close_browser(&mut self) {
        self.browser = None;
        self.mode = Mode::Form;
    }

    fn warn_busy(&mut self) {
        let t = self.lang.texts();
        self.show_dialog(
            DialogKind::Warning,
            t.warning_title,
            t.another_in_progress.to_string(),
            false,
        );
    }

    fn show_form_error(&mut self, err: &FormError) {
        let t = self.lang.texts();
        let FormError::InvalidNumber { field, value } = err;
        let message = format!("{} ({field}): {value:?}", t.invalid_number);
        self.show_dialog(DialogKind::Error, t.error_title, message, false);
    }

    fn show_dialog(&mut self, kind: DialogKind, title: &str, message: String, ends_action: bool) {
        self.dialog = Some(Dialog {
            kind,
            title: title.to_string(),
            message,
            ends_action,
        });
        self.mode = Mode::Dialog;
    }

    fn status_text(&self) -> String {
        match &self.status {
            Status::Ready => self.lang.texts().ready.to_string(),
            Status::Progress(progress) => self.lang.progress(progress),
            Status::Done(outcome) => self.lang.outcome_status(outcome).to_string(),
            Status::Failed(text) => text.clone(),
        }
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // title bar
                Constraint::Length(1), // progress
                Constraint::Length(5), // connection
                Constraint::Length(5), // pixel sizes
                Constraint::Length(4), // mask
                Constraint::Length(4), // power
                Constraint::Min(0),
                Constraint::Length(1), // key hints
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        self.render_title_bar(frame, chunks[0]);
        self.render_progress(frame, chunks[1]);
        self.render_connection(frame, chunks[2]);
        self.render_pixel_sizes(frame, chunks[3]);
        self.render_mask(frame, chunks[4]);
        self.render_power(frame, chunks[5]);
        self.render_hints(frame, chunks[7]);
        self.render_status_bar(frame, chunks[8]);

        if self.mode == Mode::Form {
            let anchor = match self.form.focus() {
                Field::Host => Some((chunks[2], 0)),
                Field::Username => Some((chunks[2], 1)),
                Field::Password => Some((chunks[2], 2)),
                Field::PixelX => Some((chunks[3], 0)),
                Field::PixelY => Some((chunks[3], 1)),
                Field::Power => Some((chunks[5], 0)),
                _ => None,
            };
            if let Some((area, row)) = anchor {
                self.place_cursor(frame, area, row);
            }
        }

        match self.mode {
            Mode::Browse => self.render_browser_overlay(frame),
            Mode::Dialog => self.render_dialog_overlay(frame),
            Mode::Form => {}
        }
    }

    fn place_cursor(&self, frame: &mut Frame, area: Rect, row: u16) {
        let focus = self.form.focus();
        let Some(input) = self.form.input(focus) else {
            return;
        };

        let before = input.display_before_cursor(focus == Field::Password);
        let offset = LABEL_WIDTH + Span::raw(before).width();
        let x = area.x + 1 + offset as u16;
        let y = area.y + 1 + row;
        if x < area.x + area.width.saturating_sub(1) && y < area.y + area.height {
            frame.set_cursor_position((x, y));
        }
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let t = self.lang.texts();
        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", t.title),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} ", self.lang.display_name()),
                Style::default().fg(Color::Gray),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect) {
        if !self.is_busy() {
            return;
        }

        let spinner = SPINNER[(self.tick / 4) % SPINNER.len()];
        let text = format!(" {spinner} {}", self.lang.texts().in_progress);
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
            area,
        );
    }

    fn render_connection(&self, frame: &mut Frame, area: Rect) {
        let t = self.lang.texts();
        let lines = vec![
            self.field_line(t.host, Field::Host),
            self.field_line(t.username, Field::Username),
            self.field_line(t.password, Field::Password),
        ];
        render_section(frame, area, t.connection_section, lines);
    }

    fn render_pixel_sizes(&self, frame: &mut Frame, area: Rect) {
        let t = self.lang.texts();
        let lines = vec![
            self.field_line(t.pixel_x, Field::PixelX),
            self.field_line(t.pixel_y, Field::PixelY),
            Line::from(self.button(t.update_pixel_sizes, Field::UpdatePixelSizes))
                .alignment(Alignment::Right),
        ];
        render_section(frame, area, t.pixel_section, lines);
    }

    fn render_mask(&self, frame: &mut Frame, area: Rect) {
        let t = self.lang.texts();
        let selected = self
            .form
            .mask_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let lines = vec![
            Line::from(vec![
                Span::styled(pad_label(t.selected_file), Style::default().fg(Color::Gray)),
                Span::styled(selected, Style::default().fg(Color::Cyan)),
            ]),
            Line::from(vec![
                self.button(t.browse, Field::Browse),
                Span::raw("  "),
                self.button(t.upload_mask, Field::UploadMask),
            ]),
        ];
        render_section(frame, area, t.mask_section, lines);
    }

    fn render_power(&self, frame: &mut Frame, area: Rect) {
        let t = self.lang.texts();
        let lines = vec![
            self.field_line(t.power_value, Field::Power),
            Line::from(self.button(t.update_power_settings, Field::UpdatePowerSettings))
                .alignment(Alignment::Right),
        ];
        render_section(frame, area, t.power_section, lines);
    }

    fn field_line(&self, label: &str, field: Field) -> Line<'static> {
        let focused = self.mode == Mode::Form && self.form.focus() == field;
        let value = self
            .form
            .input(field)
            .map(|input: &TextInput| input.display(field == Field::Password))
            .unwrap_or_default();

        let value_style = if focused {
            Style::default().fg(Color::White).bg(Color::Rgb(40, 40, 60))
        } else {
            Style::default().fg(Color::Cyan)
        };

        Line::from(vec![
            Span::styled(pad_label(label), Style::default().fg(Color::Gray)),
            Span::styled(value, value_style),
        ])
    }

    fn button(&self, label: &str, field: Field) -> Span<'static> {
        let focused = self.mode == Mode::Form && self.form.focus() == field;
        let style = match (self.is_busy(), focused) {
            (true, true) => Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::REVERSED),
            (true, false) => Style::default().fg(Color::DarkGray),
            (false, true) => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            (false, false) => Style::default().fg(Color::Magenta),
        };
        Span::styled(format!("[ {label} ]"), style)
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let t = self.lang.texts();
        let hints = match self.mode {
            Mode::Form => t.form_hints,
            Mode::Browse => t.browser_hints,
            Mode::Dialog => t.dialog_hints,
        };
        frame.render_widget(
            Paragraph::new(format!(" {hints}")).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode_style = match self.mode {
            Mode::Form => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::Browse => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            Mode::Dialog => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };

        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);
        let status_style = match self.status {
            Status::Failed(_) => Style::default().fg(Color::LightRed).bg(Color::DarkGray),
            _ => Style::default().fg(Color::Gray).bg(Color::DarkGray),
        };
        let info = Span::styled(format!(" {} ", self.status_text()), status_style);

        let bar = Line::from(vec![mode_span, info]);
        let status = Paragraph::new(bar).style(Style::default().bg(Color::DarkGray));
        frame.render_widget(status, area);
    }

    fn render_browser_overlay(&self, frame: &mut Frame) {
        let Some(browser) = &self.browser else {
            return;
        };
        let t = self.lang.texts();

        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);

        let filter_label = match browser.filter() {
            FileFilter::Png => t.png_files,
            FileFilter::All => t.all_files,
        };
        let block = Block::default()
            .title(format!(" {} ({filter_label}) ", t.select_mask_title))
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Rgb(15, 15, 24)));

        let visible = area.height.saturating_sub(3) as usize;
        let start = if visible == 0 {
            0
        } else {
            browser.selected.saturating_sub(visible - 1)
        };

        let mut lines = vec![Line::from(Span::styled(
            browser.dir().display().to_string(),
            Style::default().fg(Color::DarkGray),
        ))];

        for (idx, entry) in browser.entries.iter().enumerate().skip(start).take(visible) {
            let name = if entry.is_dir {
                format!("▸ {}/", entry.name)
            } else {
                format!("  {}", entry.name)
            };
            let style = if idx == browser.selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if entry.is_dir {
                Style::default().fg(Color::Blue)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(Span::styled(name, style)));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_dialog_overlay(&self, frame: &mut Frame) {
        let Some(dialog) = &self.dialog else {
            return;
        };

        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);

        let accent = match dialog.kind {
            DialogKind::Info => Color::Green,
            DialogKind::Warning => Color::Yellow,
            DialogKind::Error => Color::Red,
        };
        let block = Block::default()
            .title(format!(" {} ", dialog.title))
            .title_style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(Color::Rgb(15, 15, 24)));

        let lines = vec![
            Line::from(dialog.message.clone()),
            Line::default(),
            Line::from(Span::styled(
                "[ OK ]",
                Style::default()
                    .fg(Color::Black)
                    .bg(accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
        ];

        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn edit_input(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Char(ch) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            input.insert_char(ch);
        }
        KeyCode::Backspace => input.delete_before(),
        KeyCode::Delete => input.delete_at(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        _ => {}
    }
}

fn pad_label(label: &str) -> String {
    let width = Span::raw(label).width();
    format!("{label}{}", " ".repeat(LABEL_WIDTH.saturating_sub(width)))
}

fn render_section(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maintenance::testing::FakeConnector;
    use std::time::Duration;

    const POWER_JSON: &str = "/root/Dentware/databases/projectorAdaptivePower.json";

    fn app() -> (App, mpsc::Receiver<Msg>, FakeConnector) {
        let mut config = AppConfig::defaults().unwrap();
        config.timing.service_settle_ms = 0;
        let (tx, rx) = mpsc::channel();
        let connector = FakeConnector::default();
        let app = App::with_connector(config, tx, Arc::new(connector.clone()));
        (app, rx, connector)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.update(Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    /// Feeds worker messages back into the app until the action completes.
    fn pump_until_finished(app: &mut App, rx: &mpsc::Receiver<Msg>) {
        loop {
            let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            let finished = matches!(msg, Msg::JobFinished(_));
            app.update(msg).unwrap();
            if finished {
                return;
            }
        }
    }

    fn dialog(app: &App) -> &Dialog {
        app.dialog.as_ref().expect("dialog open")
    }

    #[test]
    fn typing_edits_the_focused_field() {
        let (mut app, _rx, _) = app();
        press(&mut app, KeyCode::End);
        for _ in 0..3 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "222");
        assert_eq!(app.form.host.value(), "192.168.1.222");

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "pw");
        assert_eq!(app.form.password.value(), "pw");
    }

    #[test]
    fn upload_without_mask_is_refused() {
        let (mut app, _rx, connector) = app();
        app.form.set_focus(Field::UploadMask);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Dialog);
        assert_eq!(dialog(&app).kind, DialogKind::Error);
        assert_eq!(dialog(&app).message, "Please select a mask file first");
        assert!(!app.is_busy());
        assert_eq!(connector.connects(), 0);
    }

    #[test]
    fn busy_worker_blocks_a_second_action() {
        let (mut app, _rx, connector) = app();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let handle = app
            .worker
            .try_spawn(move || release_rx.recv().ok(), |_| ())
            .unwrap();

        app.form.set_focus(Field::UpdatePowerSettings);
        press(&mut app, KeyCode::Enter);

        assert_eq!(dialog(&app).kind, DialogKind::Warning);
        assert_eq!(dialog(&app).message, "Another operation is in progress");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Form);
        press(&mut app, KeyCode::Esc);
        assert!(!app.should_quit);

        release_tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(!app.is_busy());
        assert_eq!(connector.connects(), 0);
    }

    #[test]
    fn power_update_runs_in_background_and_reports_success() {
        let (mut app, rx, connector) = app();
        connector.put_file(POWER_JSON, br#"{"smallArea": 1, "other": true}"#);
        app.form.power = TextInput::new("7");
        app.form.set_focus(Field::UpdatePowerSettings);

        press(&mut app, KeyCode::Enter);
        pump_until_finished(&mut app, &rx);

        assert_eq!(dialog(&app).kind, DialogKind::Info);
        assert_eq!(dialog(&app).message, "All power values set to 7");
        assert_eq!(app.status_text(), "Power settings updated successfully!");

        let written: serde_json::Value =
            serde_json::from_slice(&connector.file(POWER_JSON).unwrap()).unwrap();
        assert_eq!(written["normalAreaOffset"], 7);
        assert_eq!(written["other"], true);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::Form);
        assert_eq!(app.status_text(), "Ready");
    }

    #[test]
    fn blank_host_is_reported_without_connecting() {
        let (mut app, rx, connector) = app();
        app.form.host = TextInput::new("");
        app.form.set_focus(Field::UpdatePixelSizes);

        press(&mut app, KeyCode::Enter);
        pump_until_finished(&mut app, &rx);

        assert_eq!(dialog(&app).kind, DialogKind::Error);
        assert_eq!(dialog(&app).message, "Please fill in all connection fields");
        assert_eq!(connector.connects(), 0);
    }

    #[test]
    fn invalid_json_sets_error_status() {
        let (mut app, rx, connector) = app();
        connector.put_file(POWER_JSON, b"{broken");
        app.form.set_focus(Field::UpdatePowerSettings);

        press(&mut app, KeyCode::Enter);
        pump_until_finished(&mut app, &rx);

        assert_eq!(app.status_text(), "Error: Invalid JSON format");
        assert!(dialog(&app).message.starts_with("Invalid JSON format: "));
    }

    #[test]
    fn bad_number_never_starts_the_worker() {
        let (mut app, _rx, connector) = app();
        app.form.pixel_x = TextInput::new("sixty");
        app.form.set_focus(Field::UpdatePixelSizes);
        press(&mut app, KeyCode::Enter);

        assert_eq!(dialog(&app).kind, DialogKind::Error);
        assert!(dialog(&app).message.contains("sixty"));
        assert!(!app.is_busy());
        assert_eq!(connector.connects(), 0);
    }

    #[test]
    fn f2_switches_language() {
        let (mut app, _rx, _) = app();
        assert_eq!(app.status_text(), "Ready");
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.status_text(), "就绪");
    }

    #[test]
    fn browser_picks_a_mask_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mask.png"), b"png").unwrap();
        let (mut app, _rx, _) = app();
        app.form.mask_file = Some(dir.path().join("previous.png"));

        app.form.set_focus(Field::Browse);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::Browse);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::Form);
        assert_eq!(app.form.mask_file, Some(dir.path().join("mask.png")));
    }

    #[test]
    fn esc_quits_when_idle() {
        let (mut app, _rx, _) = app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }
}
