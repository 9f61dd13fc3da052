//! TUI application state and main loop

use std::io;
use std::time::{Duration, Instant};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    Terminal,
};
use anyhow::Result;

use crate::context::Context;
use crate::error::ClientError;
use crate::models::{GenerateOptions, HealthStatus};
use crate::pipeline::{artifact, Stage, Workflow};
use super::ui;
use super::events::{InputMode, Speaker};

/// Sent messages kept for recall
const MAX_HISTORY_SIZE: usize = 200;

/// Transcript entries per page
pub const PAGE_SIZE: usize = 10;

/// How long a status message stays visible
const STATUS_TTL: Duration = Duration::from_secs(5);

/// One line of the conversation pane
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub is_error: bool,
    pub timestamp: Instant,
}

/// What the main loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Submit,
}

pub struct App {
    pub input: String,
    /// Cursor position in characters
    pub cursor_position: usize,
    pub input_mode: InputMode,
    pub history: Vec<String>,
    pub history_index: Option<usize>,
    pub entries: Vec<TranscriptEntry>,
    /// Selected transcript entry
    pub entries_scroll: usize,
    pub current_page: usize,
    pub backend_url: String,
    pub show_help: bool,
    pub show_plan: bool,
    pub status_message: Option<(String, Instant)>,
    pub start_time: Instant,
    pub should_quit: bool,
    pub workflow: Workflow,
    /// Options used by :generate
    options: GenerateOptions,
}

impl App {
    pub fn new(workflow: Workflow, backend_url: String, options: GenerateOptions) -> Self {
        Self {
            input: String::new(),
            cursor_position: 0,
            input_mode: InputMode::Insert,
            history: Vec::new(),
            history_index: None,
            entries: Vec::new(),
            entries_scroll: 0,
            current_page: 0,
            backend_url,
            show_help: false,
            show_plan: false,
            status_message: None,
            start_time: Instant::now(),
            should_quit: false,
            workflow,
            options,
        }
    }

    fn push(&mut self, speaker: Speaker, text: impl Into<String>, is_error: bool) {
        self.entries.push(TranscriptEntry {
            speaker,
            text: text.into(),
            is_error,
            timestamp: Instant::now(),
        });
        self.select(usize::MAX);
    }

    fn push_error(&mut self, err: &ClientError) {
        self.push(Speaker::System, format!("Error [{}]: {}", err.kind(), err), true);
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some((msg.to_string(), Instant::now()));
    }

    pub fn stage(&self) -> Stage {
        self.workflow.stage()
    }

    // Input editing. `cursor_position` counts chars, edits go through byte offsets.

    fn byte_at(&self, chars: usize) -> usize {
        self.input
            .char_indices()
            .nth(chars)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn input_chars(&self) -> usize {
        self.input.chars().count()
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let target = self.cursor_position.saturating_add_signed(delta);
        self.cursor_position = target.min(self.input_chars());
    }

    pub fn enter_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor_position);
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        let at = self.byte_at(self.cursor_position);
        self.input.remove(at);
    }

    /// Delete
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.input_chars() {
            let at = self.byte_at(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Ctrl+W
    pub fn delete_word(&mut self) {
        let end = self.byte_at(self.cursor_position);
        let start = self.input[..end]
            .trim_end()
            .rfind(' ')
            .map_or(0, |i| i + 1);
        self.input.replace_range(start..end, "");
        self.cursor_position = self.input[..start].chars().count();
    }

    /// Ctrl+U
    pub fn delete_to_start(&mut self) {
        let end = self.byte_at(self.cursor_position);
        self.input.replace_range(..end, "");
        self.cursor_position = 0;
    }

    /// Ctrl+K
    pub fn delete_to_end(&mut self) {
        let start = self.byte_at(self.cursor_position);
        self.input.truncate(start);
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
        self.history_index = None;
    }

    /// Step through sent messages; `-1` is older, `1` is newer
    pub fn recall(&mut self, step: isize) {
        if self.history.is_empty() {
            return;
        }
        let last = self.history.len() - 1;
        self.history_index = match (self.history_index, step < 0) {
            (None, true) => Some(last),
            (None, false) => return,
            (Some(i), true) => Some(i.saturating_sub(1)),
            (Some(i), false) if i < last => Some(i + 1),
            (Some(_), false) => None,
        };
        self.input = self
            .history_index
            .map(|i| self.history[i].clone())
            .unwrap_or_default();
        self.cursor_position = self.input_chars();
    }

    /// Route a key press; returns [`KeyOutcome::Submit`] when the input should be sent
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::F(1)) {
                self.show_help = false;
            }
            return KeyOutcome::Handled;
        }

        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('i') | KeyCode::Enter => self.input_mode = InputMode::Insert,
                KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
                KeyCode::Char('p') => self.show_plan = !self.show_plan,
                KeyCode::Char('k') | KeyCode::Up => self.scroll(-1),
                KeyCode::Char('j') | KeyCode::Down => self.scroll(1),
                KeyCode::PageUp => self.page(-1),
                KeyCode::PageDown => self.page(1),
                KeyCode::Char('g') | KeyCode::Home => self.select(0),
                KeyCode::Char('G') | KeyCode::End => self.select(usize::MAX),
                _ => {}
            },
            InputMode::Insert if key.modifiers.contains(KeyModifiers::CONTROL) => match key.code {
                KeyCode::Char('c') => self.clear_input(),
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('u') => self.delete_to_start(),
                KeyCode::Char('k') => self.delete_to_end(),
                KeyCode::Char('w') => self.delete_word(),
                _ => {}
            },
            InputMode::Insert => match key.code {
                KeyCode::Enter => return KeyOutcome::Submit,
                KeyCode::Esc => self.input_mode = InputMode::Normal,
                KeyCode::Char(c) => self.enter_char(c),
                KeyCode::Backspace => self.delete_char(),
                KeyCode::Delete => self.delete_char_forward(),
                KeyCode::Left => self.move_cursor(-1),
                KeyCode::Right => self.move_cursor(1),
                KeyCode::Home => self.cursor_position = 0,
                KeyCode::End => self.cursor_position = self.input_chars(),
                KeyCode::Up => self.recall(-1),
                KeyCode::Down => self.recall(1),
                KeyCode::PageUp => self.page(-1),
                KeyCode::PageDown => self.page(1),
                _ => {}
            },
        }
        KeyOutcome::Handled
    }

    // Transcript navigation. The page always follows the selected entry.

    /// Select an entry, clamped to the transcript
    pub fn select(&mut self, index: usize) {
        self.entries_scroll = index.min(self.entries.len().saturating_sub(1));
        self.current_page = self.entries_scroll / PAGE_SIZE;
    }

    /// Move the selection by `delta` entries
    pub fn scroll(&mut self, delta: isize) {
        self.select(self.entries_scroll.saturating_add_signed(delta));
    }

    /// Move the selection by `delta` pages
    pub fn page(&mut self, delta: isize) {
        let page = self.current_page.saturating_add_signed(delta);
        self.select(page.saturating_mul(PAGE_SIZE));
    }

    pub fn total_pages(&self) -> usize {
        self.entries.len().div_ceil(PAGE_SIZE).max(1)
    }

    /// Entries on the current page
    pub fn visible_entries(&self) -> &[TranscriptEntry] {
        let start = (self.current_page * PAGE_SIZE).min(self.entries.len());
        let end = (start + PAGE_SIZE).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Submit the current input
    pub async fn submit_input(&mut self) {
        let input = self.input.trim().to_string();
        if input.is_empty() {
            return;
        }

        if self.history.last() != Some(&input) {
            if self.history.len() == MAX_HISTORY_SIZE {
                self.history.remove(0);
            }
            self.history.push(input.clone());
        }
        self.clear_input();

        if input.starts_with(':') {
            self.handle_command(&input).await;
        } else {
            self.send_message(input).await;
        }
    }

    async fn send_message(&mut self, message: String) {
        self.push(Speaker::User, message.clone(), false);
        let ctx = Context::background();
        match self.workflow.send(&ctx, &message).await {
            Ok(turn) => {
                self.push(Speaker::Agent, turn.reply, false);
                if turn.complete {
                    self.set_status("Requirements complete. Type :plan to create the plan");
                }
            }
            Err(e) => self.push_error(&e),
        }
    }

    /// Handle special commands
    async fn handle_command(&mut self, input: &str) {
        let parts: Vec<&str> = input[1..].split_whitespace().collect();
        if parts.is_empty() {
            return;
        }
        let ctx = Context::background();

        match parts[0] {
            "help" | "h" | "?" => {
                self.show_help = true;
            }
            "quit" | "q" | "exit" => {
                self.should_quit = true;
            }
            "clear" | "cls" => {
                self.entries.clear();
                self.entries_scroll = 0;
                self.current_page = 0;
                self.set_status("Transcript cleared");
            }
            "plan" => {
                match self.workflow.create_plan(&ctx).await {
                    Ok(plan) => {
                        self.show_plan = true;
                        self.push(
                            Speaker::System,
                            format!("Plan ready for '{}'. Type :generate to build it", plan.name),
                            false,
                        );
                    }
                    Err(e) => self.push_error(&e),
                }
            }
            "generate" | "gen" => {
                let mut options = self.options;
                if parts.get(1) == Some(&"--no-save") {
                    options.save_to_file = false;
                }
                self.set_status("Generating...");
                match self.workflow.generate(&ctx, options).await {
                    Ok(generated) => {
                        let resp = &generated.response;
                        let location = generated
                            .saved_to
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| resp.filepath.clone());
                        let summary = format!(
                            "Generated {} ({} bytes, ~{} lines)\n{}",
                            location, resp.size_bytes, resp.lines, resp.code
                        );
                        self.push(Speaker::System, summary, false);
                        self.set_status("Agent generated");
                    }
                    Err(e) => self.push_error(&e),
                }
            }
            "session" => {
                let Some(id) = self.workflow.session_id().map(str::to_string) else {
                    self.set_status("No session yet");
                    return;
                };
                let local = self.workflow.transcript().map(|s| s.message_count).unwrap_or(0);
                match self.workflow.client().get_session(&ctx, &id).await {
                    Ok(session) => self.push(
                        Speaker::System,
                        format!(
                            "Session {} | local messages: {} | backend messages: {} | updated {}",
                            id,
                            local,
                            session.message_count,
                            session.updated_at.format("%H:%M:%S")
                        ),
                        false,
                    ),
                    Err(e) => self.push_error(&e),
                }
            }
            "agents" => {
                match self.workflow.client().get_config(&ctx).await {
                    Ok(config) => {
                        let mut text = format!("{} - {}", config.os_id, config.description);
                        for agent in &config.agents {
                            text.push_str(&format!("\n  {} ({}): {}", agent.id, agent.model, agent.description));
                        }
                        self.push(Speaker::System, text, false);
                    }
                    Err(e) => self.push_error(&e),
                }
            }
            "health" => {
                let result = self.workflow.client().health(&ctx).await;
                let health = HealthStatus::probe(&result);
                let message = match result {
                    Ok(()) => format!("{} is {}", self.backend_url, health.status),
                    Err(e) => format!("{} is {}: {}", self.backend_url, health.status, e),
                };
                self.set_status(&message);
            }
            "generated" => {
                let Some(root) = self.workflow.output_root().map(|p| p.to_path_buf()) else {
                    self.set_status("No output directory configured");
                    return;
                };
                match artifact::list(&root) {
                    Ok(agents) if agents.is_empty() => self.set_status("No generated agents yet"),
                    Ok(agents) => {
                        let text = agents
                            .iter()
                            .map(|a| format!("{} - {} ({} lines)", a.filename, a.role, a.lines))
                            .collect::<Vec<_>>()
                            .join("\n");
                        self.push(Speaker::System, text, false);
                    }
                    Err(e) => self.push_error(&e),
                }
            }
            _ => {
                self.push(
                    Speaker::System,
                    format!("Unknown command: {}. Type :help for available commands.", parts[0]),
                    true,
                );
            }
        }
    }

}

/// Run the TUI until the user quits
pub async fn run(workflow: Workflow, backend_url: String, options: GenerateOptions) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(workflow, backend_url, options);
    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    while !app.should_quit {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key) == KeyOutcome::Submit {
                    // Calls block the loop, so show that one is in flight first.
                    app.set_status("Waiting for the backend...");
                    terminal.draw(|f| ui::draw(f, app))?;
                    app.submit_input().await;
                }
            }
        }

        if app
            .status_message
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() > STATUS_TTL)
        {
            app.status_message = None;
        }
    }
    Ok(())
}
