use std::collections::VecDeque;
use std::sync::Arc;

pub const CONSOLE_CAPACITY: usize = 512;
pub const HISTORY_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKind {
    Input,
    Output,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub kind: ConsoleKind,
    pub text: String,
}

/// Output log and command history of the studio console.
#[derive(Debug, Default)]
pub struct ConsoleLog {
    entries: VecDeque<ConsoleEntry>,
    history: VecDeque<String>,
    snapshot: Option<Arc<[ConsoleEntry]>>,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ConsoleKind, text: impl Into<String>) {
        self.entries.push_back(ConsoleEntry { kind, text: text.into() });
        while self.entries.len() > CONSOLE_CAPACITY {
            self.entries.pop_front();
        }
        self.snapshot = None;
    }

    pub fn entries(&mut self) -> Arc<[ConsoleEntry]> {
        if let Some(cache) = &self.snapshot {
            return Arc::clone(cache);
        }
        let data = self.entries.iter().cloned().collect::<Vec<_>>();
        let arc: Arc<[ConsoleEntry]> = Arc::from(data.into_boxed_slice());
        self.snapshot = Some(Arc::clone(&arc));
        arc
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry of the given kind.
    pub fn last_of(&self, kind: ConsoleKind) -> Option<&str> {
        self.entries.iter().rev().find(|entry| entry.kind == kind).map(|entry| entry.text.as_str())
    }

    pub fn count_of(&self, kind: ConsoleKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }

    pub fn record_history(&mut self, command: &str) {
        if command.is_empty() {
            return;
        }
        if self.history.back().is_some_and(|last| last == command) {
            return;
        }
        self.history.push_back(command.to_string());
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }
}
