//! Input event sources for the annotation loop
//!
//! The runner polls a source with a bounded timeout, so it stays responsive
//! to cancellation even when no input arrives. Two sources share one token
//! syntax:
//!
//! - `press X Y`, `move X Y`, `release X Y`: left-button activity at display
//!   coordinates
//! - a single command token per binding (`s`, `r`, `q` by default)
//!
//! `ScriptSource` replays a YAML/JSON list of tokens; `StdinSource` reads them
//! line by line from standard input.

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::controller::{Command, InputEvent};
use crate::error::{Error, Result};

const POINTER_VERBS: [&str; 3] = ["press", "move", "release"];

/// Tokens bound to the discrete commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_save_key")]
    pub save: String,
    #[serde(default = "default_reset_key")]
    pub reset: String,
    #[serde(default = "default_quit_key")]
    pub quit: String,
}

fn default_save_key() -> String {
    "s".to_string()
}

fn default_reset_key() -> String {
    "r".to_string()
}

fn default_quit_key() -> String {
    "q".to_string()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            save: default_save_key(),
            reset: default_reset_key(),
            quit: default_quit_key(),
        }
    }
}

impl KeyBindings {
    /// Bindings must be single non-empty words, distinct from each other and
    /// from the pointer verbs
    pub fn validate(&self) -> Result<()> {
        let keys = [&self.save, &self.reset, &self.quit];
        for key in keys {
            if key.is_empty() || key.split_whitespace().count() != 1 {
                return Err(Error::Config(format!("invalid key binding {:?}", key)));
            }
            if POINTER_VERBS.contains(&key.as_str()) {
                return Err(Error::Config(format!("key binding {:?} clashes with a pointer event", key)));
            }
        }
        if self.save == self.reset || self.save == self.quit || self.reset == self.quit {
            return Err(Error::Config("key bindings must be distinct".to_string()));
        }
        Ok(())
    }

    fn command_for(&self, token: &str) -> Option<Command> {
        if token == self.save {
            Some(Command::Save)
        } else if token == self.reset {
            Some(Command::Reset)
        } else if token == self.quit {
            Some(Command::Quit)
        } else {
            None
        }
    }
}

/// Parses one input line; blank lines and `#` comments yield `None`
pub fn parse_token(line: &str, keys: &KeyBindings) -> Result<Option<InputEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let invalid = |reason: &str| Error::Input { token: line.to_string(), reason: reason.to_string() };

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [key] => keys
            .command_for(key)
            .map(|command| Some(InputEvent::Command(command)))
            .ok_or_else(|| invalid("not a bound command")),
        [verb, x, y] if POINTER_VERBS.contains(verb) => {
            let x: f64 = x.parse().map_err(|_| invalid("x is not a number"))?;
            let y: f64 = y.parse().map_err(|_| invalid("y is not a number"))?;
            if !x.is_finite() || !y.is_finite() {
                return Err(invalid("coordinates must be finite"));
            }
            Ok(Some(match *verb {
                "press" => InputEvent::press(x, y),
                "move" => InputEvent::moved(x, y),
                _ => InputEvent::release(x, y),
            }))
        }
        _ => Err(invalid("expected `press|move|release X Y` or a command key")),
    }
}

/// Outcome of a single bounded wait
#[derive(Debug, Clone, PartialEq)]
pub enum Polled {
    Event(InputEvent),
    /// Nothing arrived within the timeout
    Idle,
    /// The source is exhausted; no further events will come
    Closed,
}

pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Polled;
}

#[derive(Debug, Deserialize)]
struct ReplayScript {
    events: Vec<String>,
}

/// Replays a fixed list of events, then reports `Closed`
pub struct ScriptSource {
    events: VecDeque<InputEvent>,
}

impl ScriptSource {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], keys: &KeyBindings) -> Result<Self> {
        let mut events = VecDeque::with_capacity(tokens.len());
        for token in tokens {
            if let Some(event) = parse_token(token.as_ref(), keys)? {
                events.push_back(event);
            }
        }
        Ok(Self { events })
    }

    /// Loads `events: [...]` from a `.json` file or, otherwise, YAML
    pub fn from_file(path: &Path, keys: &KeyBindings) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let script: ReplayScript = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| Error::Settings(format!("invalid replay script {}: {}", path.display(), e)))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::Settings(format!("invalid replay script {}: {}", path.display(), e)))?
        };

        let source = Self::from_tokens(&script.events, keys)?;
        info!("Loaded {} replay event(s) from {}", source.remaining(), path.display());
        Ok(source)
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ScriptSource {
    fn poll(&mut self, _timeout: Duration) -> Polled {
        match self.events.pop_front() {
            Some(event) => Polled::Event(event),
            None => Polled::Closed,
        }
    }
}

/// Reads tokens from standard input on a background thread
pub struct StdinSource {
    lines: Receiver<String>,
    keys: KeyBindings,
}

impl StdinSource {
    pub fn spawn(keys: KeyBindings) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-events".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if sender.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to read from stdin: {}", e);
                            break;
                        }
                    }
                }
                debug!("stdin closed");
            })?;
        Ok(Self::from_receiver(receiver, keys))
    }

    fn from_receiver(lines: Receiver<String>, keys: KeyBindings) -> Self {
        Self { lines, keys }
    }
}

impl EventSource for StdinSource {
    fn poll(&mut self, timeout: Duration) -> Polled {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => match parse_token(&line, &self.keys) {
                Ok(Some(event)) => Polled::Event(event),
                Ok(None) => Polled::Idle,
                Err(e) => {
                    warn!("{}", e);
                    Polled::Idle
                }
            },
            Err(RecvTimeoutError::Timeout) => Polled::Idle,
            Err(RecvTimeoutError::Disconnected) => Polled::Closed,
        }
    }
}
