use std::io::{self, Write};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use mdsync_core::{Outbound, PagePort, Session};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Something the user asked the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Key(char),
    FollowLink(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Input(Input),
    Quit,
    Ignored,
}

pub fn map_key_event(key: KeyEvent) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Ignored;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyOutcome::Quit,
        KeyCode::Esc => KeyOutcome::Quit,
        KeyCode::Char(ch) => KeyOutcome::Input(Input::Key(ch)),
        _ => KeyOutcome::Ignored,
    }
}

pub const LINK_PROMPT_KEY: char = 'o';

/// Turns terminal key events into inputs.
///
/// `o` opens a prompt for a markdown path; Enter follows it as a link and
/// Esc abandons it. Outside the prompt keys go through [`map_key_event`].
#[derive(Debug, Default)]
pub struct KeyReader {
    prompt: Option<String>,
}

impl KeyReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.kind != KeyEventKind::Press {
            return KeyOutcome::Ignored;
        }
        let Some(buffer) = self.prompt.as_mut() else {
            return match map_key_event(key) {
                KeyOutcome::Input(Input::Key(LINK_PROMPT_KEY)) => {
                    self.prompt = Some(String::new());
                    KeyOutcome::Ignored
                }
                outcome => outcome,
            };
        };
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyOutcome::Quit,
            KeyCode::Char(ch) => {
                buffer.push(ch);
                KeyOutcome::Ignored
            }
            KeyCode::Backspace => {
                buffer.pop();
                KeyOutcome::Ignored
            }
            KeyCode::Esc => {
                self.prompt = None;
                KeyOutcome::Ignored
            }
            KeyCode::Enter => {
                let href = self.prompt.take().unwrap_or_default();
                let href = href.trim();
                if href.is_empty() {
                    KeyOutcome::Ignored
                } else {
                    KeyOutcome::Input(Input::FollowLink(href.to_string()))
                }
            }
            _ => KeyOutcome::Ignored,
        }
    }
}

pub fn apply_input<P: PagePort>(session: &mut Session<P>, input: Input) -> Vec<Outbound> {
    match input {
        Input::Key(key) => session.handle_key(key),
        Input::FollowLink(href) => session.follow_link(&href),
    }
}

/// Forward terminal key presses until the user quits or the receiver goes away.
pub async fn read_terminal_keys(tx: mpsc::Sender<Input>) {
    let mut events = EventStream::new();
    let mut reader = KeyReader::new();
    while let Some(event) = events.next().await {
        let key = match event {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(err) => {
                warn!("terminal_event_error: {err}");
                break;
            }
        };
        let was_prompting = reader.prompt().is_some();
        let outcome = reader.on_key(key);
        if was_prompting || reader.prompt().is_some() {
            render_prompt(reader.prompt());
        }
        match outcome {
            KeyOutcome::Input(input) => {
                if tx.send(input).await.is_err() {
                    break;
                }
            }
            KeyOutcome::Quit => {
                debug!("quit requested");
                break;
            }
            KeyOutcome::Ignored => {}
        }
    }
}

fn render_prompt(prompt: Option<&str>) {
    let mut stderr = io::stderr();
    let _ = match prompt {
        Some(buffer) => write!(stderr, "\r\x1b[2Kopen: {buffer}"),
        None => write!(stderr, "\r\x1b[2K"),
    };
    let _ = stderr.flush();
}
