use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use portal_core::{
    api::{ApiClient, ResetPasswordRequest, SearchHit},
    config::AppConfig,
    error::PortalError,
    forms::{ForgotPasswordForm, LoginForm, ResetPasswordForm, Validate},
    nav::{self, NavLink},
    router::{self, Layout as PageLayout, Page, Router},
    search::{self, SearchBox, SearchOutcome},
    session::{SessionState, UserProfile},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info};

use crate::widgets::{FormState, TextField};

const TICK_RATE: Duration = Duration::from_millis(250);
const SIDEBAR_WIDTH: u16 = 30;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Blue,
            muted: Color::DarkGray,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            success: Color::Green,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Sidebar,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    kind: ToastKind,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SidebarEntry {
    Link(&'static NavLink),
    Logout,
}

#[derive(Debug)]
enum ActionOutcome {
    ForgotPassword(Result<(), PortalError>),
    ResetPassword(Result<(), PortalError>),
}

enum AppEvent {
    Input(Event),
    Tick,
    Action(ActionOutcome),
}

/// Top-level state of the terminal client.
pub struct PortalApp {
    config: AppConfig,
    session: SessionState,
    router: Router,
    api: ApiClient,
    theme: Theme,
    focus: Focus,
    sidebar_cursor: usize,
    search: Option<SearchBox>,
    search_worker: Option<JoinHandle<()>>,
    search_tx: mpsc::Sender<SearchOutcome>,
    search_rx: Option<mpsc::Receiver<SearchOutcome>>,
    search_results: Vec<SearchHit>,
    search_query: Option<String>,
    search_cursor: usize,
    login_form: FormState,
    forgot_form: FormState,
    reset_form: FormState,
    toast: Option<Toast>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    should_quit: bool,
}

impl PortalApp {
    pub fn new(config: AppConfig, session: SessionState, api: ApiClient, initial_route: &str) -> Self {
        let router = Router::new(initial_route, session.read());
        let (search_tx, search_rx) = mpsc::channel(16);
        Self {
            config,
            session,
            router,
            api,
            theme: Theme::default(),
            focus: Focus::Sidebar,
            sidebar_cursor: 0,
            search: None,
            search_worker: None,
            search_tx,
            search_rx: Some(search_rx),
            search_results: Vec::new(),
            search_query: None,
            search_cursor: 0,
            login_form: FormState::new(vec![
                TextField::new("token", "Access token").masked(),
                TextField::new("name", "Display name (optional)"),
                TextField::new("email", "Email (optional)"),
            ]),
            forgot_form: FormState::new(vec![TextField::new("email", "Email")]),
            reset_form: FormState::new(vec![
                TextField::new("password", "New password").masked(),
                TextField::new("confirm_password", "Confirm password").masked(),
            ]),
            toast: None,
            event_tx: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.after_route_change();
        let greeting = if self.session.read() {
            "Signed in"
        } else {
            "Browsing as guest"
        };
        self.notify(ToastKind::Info, greeting);

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let mut search_rx = self
            .search_rx
            .take()
            .context("search channel already taken")?;
        let mut session_rx = self.session.subscribe();

        let result = loop {
            if let Err(err) = terminal.draw(|frame| self.draw(frame)) {
                break Err(err).context("failed to draw frame");
            }
            if self.should_quit {
                break Ok(());
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break Ok(());
                    }
                }
                Some(outcome) = search_rx.recv() => self.handle_search_outcome(outcome),
                changed = session_rx.changed() => {
                    if changed.is_ok() {
                        self.handle_session_change();
                    }
                }
            }
        };

        self.unmount_search();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        result
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind == KeyEventKind::Press {
                    if let Err(err) = self.handle_key(key) {
                        error!(?err, "Key handling failed");
                        self.notify(ToastKind::Error, format!("Error: {err}"));
                    }
                }
                true
            }
            Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => true,
            Some(AppEvent::Action(outcome)) => {
                self.handle_action_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn notify(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast {
            kind,
            message: message.into(),
        });
    }

    fn handle_session_change(&mut self) {
        let authenticated = self.session.read();
        info!(authenticated, "Session change observed");
        self.router.refresh(authenticated);
        self.after_route_change();
    }

    fn navigate(&mut self, target: &str) {
        let authenticated = self.session.read();
        let title = self.router.navigate(target, authenticated).title();
        info!(path = %self.router.path(), page = title, "Navigated");
        self.after_route_change();
    }

    fn go_back(&mut self) {
        if self.router.back(self.session.read()) {
            self.after_route_change();
        } else {
            self.notify(ToastKind::Info, "No previous page");
        }
    }

    /// Mount or unmount layout-owned state after the page changed.
    fn after_route_change(&mut self) {
        match self.router.page().layout() {
            PageLayout::Main => {
                if let Err(err) = self.mount_search() {
                    error!(?err, "Search box unavailable");
                    self.notify(ToastKind::Error, format!("Search unavailable: {err}"));
                }
            }
            PageLayout::Standalone => {
                self.unmount_search();
                self.focus = Focus::Sidebar;
            }
        }
        let entries = self.sidebar_entries();
        self.sidebar_cursor = entries
            .iter()
            .position(|entry| match entry {
                SidebarEntry::Link(link) => nav::is_active(link, self.router.path()),
                SidebarEntry::Logout => false,
            })
            .unwrap_or(0);
    }

    fn mount_search(&mut self) -> Result<()> {
        if self.search.is_some() {
            return Ok(());
        }
        let search_box = SearchBox::new(self.config.search_delay())?;
        let worker = search::spawn_search_worker(
            Arc::new(self.api.clone()),
            search_box.settle_events(),
            self.search_tx.clone(),
        );
        debug!("Search box mounted");
        self.search = Some(search_box);
        self.search_worker = Some(worker);
        Ok(())
    }

    fn unmount_search(&mut self) {
        if let Some(search_box) = self.search.take() {
            search_box.dispose();
            debug!("Search box unmounted");
        }
        if let Some(worker) = self.search_worker.take() {
            worker.abort();
        }
        self.search_results.clear();
        self.search_query = None;
        self.search_cursor = 0;
    }

    fn handle_search_outcome(&mut self, outcome: SearchOutcome) {
        let current = match self.search.as_ref() {
            Some(search_box) => search_box.debounced(),
            None => return,
        };
        if search::query_for(&current) != Some(outcome.query.as_str()) {
            debug!(query = %outcome.query, "Dropping stale search outcome");
            return;
        }
        match outcome.result {
            Ok(hits) => {
                self.search_results = hits;
                self.search_cursor = 0;
            }
            Err(err) => {
                self.search_results.clear();
                self.notify(ToastKind::Error, user_message(&err));
            }
        }
        self.search_query = Some(outcome.query);
    }

    fn handle_action_outcome(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::ForgotPassword(result) => {
                self.forgot_form.pending = false;
                match result {
                    Ok(()) => {
                        self.forgot_form.clear();
                        self.notify(ToastKind::Success, "Check your email for a reset link");
                        self.navigate(router::LOGIN_ROUTE);
                    }
                    Err(err) => self.notify(ToastKind::Error, user_message(&err)),
                }
            }
            ActionOutcome::ResetPassword(result) => {
                self.reset_form.pending = false;
                match result {
                    Ok(()) => {
                        self.reset_form.clear();
                        self.notify(ToastKind::Success, "Password reset successfully");
                        self.navigate(router::LOGIN_ROUTE);
                    }
                    Err(err) => self.notify(ToastKind::Error, user_message(&err)),
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }
        match self.router.page().layout() {
            PageLayout::Standalone => self.handle_form_key(key),
            PageLayout::Main => match self.focus {
                Focus::Search => self.handle_search_key(key),
                Focus::Sidebar => self.handle_sidebar_key(key),
            },
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> Result<()> {
        let entries = self.sidebar_entries();
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                if !entries.is_empty() {
                    self.sidebar_cursor = (self.sidebar_cursor + 1).min(entries.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.sidebar_cursor = self.sidebar_cursor.saturating_sub(1);
            }
            KeyCode::Char('/') | KeyCode::Tab => self.focus = Focus::Search,
            KeyCode::Char('b') | KeyCode::Backspace => self.go_back(),
            KeyCode::Char('L') if self.session.read() => self.logout(),
            KeyCode::Enter => match entries.get(self.sidebar_cursor).copied() {
                Some(SidebarEntry::Link(link)) => self.navigate(link.href),
                Some(SidebarEntry::Logout) => self.logout(),
                None => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(search_box) = self.search.as_mut() else {
            self.focus = Focus::Sidebar;
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                if search_box.is_modal_open() {
                    search_box.close();
                } else {
                    self.focus = Focus::Sidebar;
                }
            }
            KeyCode::Tab => self.focus = Focus::Sidebar,
            KeyCode::Backspace => search_box.pop_char(),
            KeyCode::Down => {
                if !self.search_results.is_empty() {
                    self.search_cursor = (self.search_cursor + 1).min(self.search_results.len() - 1);
                }
            }
            KeyCode::Up => self.search_cursor = self.search_cursor.saturating_sub(1),
            KeyCode::Enter => {
                let modal_open = search_box.is_modal_open();
                let target = self
                    .search_results
                    .get(self.search_cursor)
                    .and_then(|hit| hit.url.clone());
                match target {
                    Some(url) if modal_open && url.starts_with('/') => {
                        if let Some(search_box) = self.search.as_mut() {
                            search_box.close();
                        }
                        self.focus = Focus::Sidebar;
                        self.navigate(&url);
                    }
                    Some(url) if modal_open => {
                        self.notify(ToastKind::Info, format!("External result: {url}"));
                    }
                    _ => {}
                }
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                search_box.push_char(ch);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let page = self.router.page().clone();
        if key.modifiers == KeyModifiers::CONTROL {
            match (key.code, &page) {
                (KeyCode::Char('f'), Page::Login) => self.navigate("/forgot-password"),
                (KeyCode::Char('l'), Page::ForgotPassword | Page::ResetPassword { .. }) => {
                    self.navigate(router::LOGIN_ROUTE)
                }
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => {
                self.navigate(router::HOME_ROUTE);
                return Ok(());
            }
            KeyCode::Enter => return self.submit(&page),
            _ => {}
        }

        let Some(form) = self.form_for_mut(&page) else {
            return Ok(());
        };
        if form.pending {
            return Ok(());
        }
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            _ => {
                if let Some(field) = form.focused_mut() {
                    match key.code {
                        KeyCode::Left => field.move_cursor(-1),
                        KeyCode::Right => field.move_cursor(1),
                        KeyCode::Home => field.move_home(),
                        KeyCode::End => field.move_end(),
                        KeyCode::Backspace => field.backspace(),
                        KeyCode::Delete => field.delete(),
                        KeyCode::Char(ch) => field.insert(ch),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn form_for_mut(&mut self, page: &Page) -> Option<&mut FormState> {
        match page {
            Page::Login => Some(&mut self.login_form),
            Page::ForgotPassword => Some(&mut self.forgot_form),
            Page::ResetPassword { .. } => Some(&mut self.reset_form),
            _ => None,
        }
    }

    fn form_for(&self, page: &Page) -> Option<&FormState> {
        match page {
            Page::Login => Some(&self.login_form),
            Page::ForgotPassword => Some(&self.forgot_form),
            Page::ResetPassword { .. } => Some(&self.reset_form),
            _ => None,
        }
    }

    fn submit(&mut self, page: &Page) -> Result<()> {
        match page {
            Page::Login => self.submit_login(),
            Page::ForgotPassword => {
                if self.forgot_form.pending {
                    return Ok(());
                }
                let form = ForgotPasswordForm {
                    email: self.forgot_form.value("email"),
                };
                if let Err(errors) = form.validate() {
                    self.forgot_form.errors = Some(errors);
                    return Ok(());
                }
                self.forgot_form.errors = None;
                self.forgot_form.pending = true;
                let api = self.api.clone();
                self.spawn_action(async move {
                    ActionOutcome::ForgotPassword(api.forgot_password(&form).await)
                });
                Ok(())
            }
            Page::ResetPassword { uid, token } => {
                if self.reset_form.pending {
                    return Ok(());
                }
                let form = ResetPasswordForm {
                    password: self.reset_form.value("password"),
                    confirm_password: self.reset_form.value("confirm_password"),
                };
                if let Err(errors) = form.validate() {
                    self.reset_form.errors = Some(errors);
                    return Ok(());
                }
                self.reset_form.errors = None;
                if uid.is_empty() || token.is_empty() {
                    self.notify(ToastKind::Error, "Reset link is missing its uid or token");
                    return Ok(());
                }
                self.reset_form.pending = true;
                let request = ResetPasswordRequest::new(uid, token, &form);
                let api = self.api.clone();
                self.spawn_action(async move {
                    ActionOutcome::ResetPassword(api.reset_password(&request).await)
                });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn submit_login(&mut self) -> Result<()> {
        let form = LoginForm {
            token: self.login_form.value("token"),
            name: self.login_form.value("name"),
            email: self.login_form.value("email"),
        };
        if let Err(errors) = form.validate() {
            self.login_form.errors = Some(errors);
            return Ok(());
        }
        let profile = if form.name.trim().is_empty() && form.email.trim().is_empty() {
            None
        } else {
            Some(UserProfile::new(form.name.trim(), form.email.trim()))
        };
        self.session.login(&form.token, profile)?;
        self.login_form.clear();
        self.notify(ToastKind::Success, "Signed in");
        self.navigate(router::HOME_ROUTE);
        Ok(())
    }

    fn logout(&mut self) {
        match self.session.logout() {
            Ok(landing) => {
                self.notify(ToastKind::Info, "Logged out");
                self.navigate(&landing);
            }
            Err(err) => {
                error!(?err, "Logout failed to clear credentials");
                self.notify(ToastKind::Error, format!("Logged out, but {err}"));
                let landing = self.config.landing_route.clone();
                self.navigate(&landing);
            }
        }
    }

    fn spawn_action<F>(&self, action: F)
    where
        F: std::future::Future<Output = ActionOutcome> + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            return;
        };
        tokio::spawn(async move {
            let outcome = action.await;
            if sender.send(AppEvent::Action(outcome)).await.is_err() {
                debug!("Action finished after shutdown");
            }
        });
    }

    fn sidebar_entries(&self) -> Vec<SidebarEntry> {
        let authenticated = self.session.read();
        let mut entries = nav::select(authenticated)
            .iter()
            .map(SidebarEntry::Link)
            .collect::<Vec<_>>();
        if authenticated {
            entries.push(SidebarEntry::Logout);
        }
        entries
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.router.page().layout() {
            PageLayout::Standalone => self.draw_standalone(frame),
            PageLayout::Main => self.draw_main(frame),
        }
    }

    fn draw_main(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .split(area);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(chunks[1]);

        self.render_search_input(frame, chunks[0]);
        self.render_sidebar(frame, body[0]);
        self.render_content(frame, body[1]);
        self.render_status(frame, chunks[2]);

        if self
            .search
            .as_ref()
            .map(SearchBox::is_modal_open)
            .unwrap_or(false)
        {
            self.render_search_modal(frame, body[1]);
        }
    }

    fn render_search_input(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Search;
        let border = if focused {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let value = self.search.as_ref().map(SearchBox::value).unwrap_or("");
        let line = if value.is_empty() {
            Line::from(Span::styled(
                "Search (press /)",
                Style::default().fg(self.theme.muted),
            ))
        } else {
            Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(self.theme.primary_fg),
            ))
        };
        let paragraph = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title("Search"),
        );
        frame.render_widget(paragraph, area);
        if focused {
            let x = area.x + 1 + cursor_offset(value, area.width);
            frame.set_cursor(x, area.y + 1);
        }
    }

    fn render_sidebar(&self, frame: &mut Frame, area: Rect) {
        let authenticated = self.session.read();
        let mut lines = Vec::new();
        if authenticated {
            match self.session.profile() {
                Some(profile) => {
                    lines.push(Line::from(Span::styled(
                        profile.display_name().to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )));
                    if !profile.email.trim().is_empty() {
                        lines.push(Line::from(Span::styled(
                            profile.email.clone(),
                            Style::default().fg(self.theme.muted),
                        )));
                    }
                }
                None => lines.push(Line::from(Span::styled(
                    "Signed in",
                    Style::default().add_modifier(Modifier::BOLD),
                ))),
            }
        } else {
            lines.push(Line::from(Span::styled(
                "Guest",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                "Select Login to sign in as admin",
                Style::default().fg(self.theme.muted),
            )));
        }
        lines.push(Line::from(""));

        let focused = self.focus == Focus::Sidebar;
        for (idx, entry) in self.sidebar_entries().iter().enumerate() {
            let selected = focused && idx == self.sidebar_cursor;
            let (text, mut style) = match entry {
                SidebarEntry::Link(link) => {
                    let style = if nav::is_active(link, self.router.path()) {
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(self.theme.primary_fg)
                    };
                    (format!("{} {}", link.icon.glyph(), link.name), style)
                }
                SidebarEntry::Logout => (
                    "⏻ Logout".to_string(),
                    Style::default().fg(self.theme.danger),
                ),
            };
            if selected {
                style = style.bg(self.theme.selection_bg).fg(self.theme.selection_fg);
            }
            let marker = if selected { "▶ " } else { "  " };
            lines.push(Line::from(Span::styled(format!("{marker}{text}"), style)));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_content(&self, frame: &mut Frame, area: Rect) {
        let page = self.router.page();
        let mut lines = vec![
            Line::from(Span::styled(
                page.title(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        match page {
            Page::Home => {
                let state = if self.session.read() {
                    "You are signed in."
                } else {
                    "You are browsing as a guest."
                };
                lines.push(Line::from("Welcome to Portal."));
                lines.push(Line::from(state));
            }
            Page::Explore => {
                lines.push(Line::from("Press / to search. Results appear as you type."));
            }
            Page::Settings => match self.session.profile() {
                Some(profile) => {
                    lines.push(Line::from(format!("Name:  {}", profile.name)));
                    lines.push(Line::from(format!("Email: {}", profile.email)));
                }
                None => lines.push(Line::from("No profile details stored for this session.")),
            },
            Page::NotFound { path } => {
                lines.push(Line::from(format!("Nothing lives at {path}.")));
                lines.push(Line::from("Press b to go back."));
            }
            Page::Login | Page::ForgotPassword | Page::ResetPassword { .. } => {}
        }
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(self.router.path().to_string()))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_search_modal(&self, frame: &mut Frame, area: Rect) {
        let Some(search_box) = self.search.as_ref() else {
            return;
        };
        let debounced = search_box.debounced();
        let modal = centered_rect(
            area.width.saturating_sub(4),
            area.height.saturating_sub(2),
            area,
        );
        frame.render_widget(Clear, modal);

        let mut lines = Vec::new();
        match search::query_for(&debounced) {
            None => lines.push(Line::from(Span::styled(
                "Keep typing…",
                Style::default().fg(self.theme.muted),
            ))),
            Some(query) if self.search_query.as_deref() != Some(query) => {
                lines.push(Line::from(Span::styled(
                    "Searching…",
                    Style::default().fg(self.theme.muted),
                )))
            }
            Some(_) if self.search_results.is_empty() => {
                lines.push(Line::from("No results."));
            }
            Some(_) => {
                for (idx, hit) in self.search_results.iter().enumerate() {
                    let style = if idx == self.search_cursor {
                        Style::default()
                            .bg(self.theme.selection_bg)
                            .fg(self.theme.selection_fg)
                    } else {
                        Style::default().fg(self.theme.primary_fg)
                    };
                    lines.push(Line::from(Span::styled(hit.title.clone(), style)));
                    if let Some(description) = hit.description.as_deref() {
                        lines.push(Line::from(Span::styled(
                            format!("  {description}"),
                            Style::default().fg(self.theme.muted),
                        )));
                    }
                }
            }
        }

        let title = format!("Results for \"{}\"", debounced.trim());
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.accent))
                    .title(title),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, modal);
    }

    fn draw_standalone(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(3)])
            .split(area);
        let page = self.router.page().clone();
        if let Some(form) = self.form_for(&page) {
            self.render_form(frame, chunks[0], &page, form);
        }
        self.render_status(frame, chunks[1]);
    }

    fn render_form(&self, frame: &mut Frame, area: Rect, page: &Page, form: &FormState) {
        let height = (form.fields.len() as u16 * 3 + 5).min(area.height);
        let width = 60.min(area.width);
        let rect = centered_rect(width, height, area);

        let mut lines = Vec::new();
        let mut cursor = None;
        for (idx, field) in form.fields.iter().enumerate() {
            let focused = idx == form.focus;
            let label_style = if focused {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            lines.push(Line::from(Span::styled(field.label, label_style)));
            if focused {
                let prefix = field.input[..field.cursor].chars().count() as u16;
                cursor = Some((rect.x + 3 + prefix, rect.y + 1 + lines.len() as u16));
            }
            lines.push(Line::from(format!("> {}", field.display())));
            match form.error_for(field.name) {
                Some(message) => lines.push(Line::from(Span::styled(
                    message.to_string(),
                    Style::default().fg(self.theme.danger),
                ))),
                None => lines.push(Line::from("")),
            }
        }

        let action = match page {
            Page::Login => "Sign in",
            _ => "Reset Password",
        };
        let footer = if form.pending {
            Span::styled("Submitting…", Style::default().fg(self.theme.muted))
        } else {
            Span::styled(
                format!("[Enter] {action}"),
                Style::default().fg(self.theme.success),
            )
        };
        lines.push(Line::from(footer));
        let hint = match page {
            Page::Login => "Ctrl+F forgot password · Esc home",
            _ => "Ctrl+L login · Esc home",
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(self.theme.muted),
        )));

        frame.render_widget(Clear, rect);
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(page.title()))
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, rect);
        if let Some((x, y)) = cursor {
            if !form.pending && x < rect.right() && y < rect.bottom() {
                frame.set_cursor(x, y);
            }
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let line = match &self.toast {
            Some(toast) => {
                let color = match toast.kind {
                    ToastKind::Info => self.theme.primary_fg,
                    ToastKind::Success => self.theme.success,
                    ToastKind::Error => self.theme.danger,
                };
                Line::from(Span::styled(toast.message.clone(), Style::default().fg(color)))
            }
            None => Line::from(Span::styled(
                "Ready",
                Style::default().fg(self.theme.muted),
            )),
        };
        let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

/// Column of the cursor after `value` inside a bordered box of `width`.
fn cursor_offset(value: &str, width: u16) -> u16 {
    value.chars().count().min(width.saturating_sub(3) as usize) as u16
}

fn user_message(err: &PortalError) -> String {
    match err {
        PortalError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(2, 3, 40, 10);
        let rect = centered_rect(20, 4, area);
        assert_eq!(rect, Rect::new(12, 6, 20, 4));
        let clamped = centered_rect(100, 100, area);
        assert_eq!(clamped, area);
    }

    #[test]
    fn search_cursor_counts_characters() {
        assert_eq!(cursor_offset("café", 40), 4);
        assert_eq!(cursor_offset("日本", 40), 2);
        assert_eq!(cursor_offset("long query", 8), 5);
    }

    #[test]
    fn api_errors_show_server_message() {
        let err = PortalError::Api {
            status: 400,
            message: "Invalid token for given user.".to_string(),
        };
        assert_eq!(user_message(&err), "Invalid token for given user.");
        assert_eq!(
            user_message(&PortalError::ZeroDelay),
            "debounce delay must be greater than zero"
        );
    }
}
