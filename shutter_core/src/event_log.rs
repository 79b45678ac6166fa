//! Bounded operator-facing event log.
//!
//! Holds the most recent state-machine narrative within a byte budget,
//! evicting whole lines oldest-first. Every append bumps `version`, so a
//! poller can tell cheaply whether anything changed.

use std::collections::VecDeque;

pub const DEFAULT_EVENT_LOG_BYTES: usize = 2000;

#[derive(Debug, Clone)]
pub struct EventLog {
    lines: VecDeque<String>,
    /// Bytes held, counting one newline per line.
    bytes: usize,
    capacity: usize,
    version: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_BYTES)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            capacity: capacity.max(1),
            version: 0,
        }
    }

    /// Append one line. A line longer than the whole budget keeps its tail.
    pub fn push(&mut self, line: impl Into<String>) {
        let mut line = line.into();
        if line.len() + 1 > self.capacity {
            let mut cut = line.len() + 1 - self.capacity;
            while !line.is_char_boundary(cut) {
                cut += 1;
            }
            line = line.split_off(cut);
        }
        self.bytes += line.len() + 1;
        self.lines.push_back(line);
        while self.bytes > self.capacity {
            match self.lines.pop_front() {
                Some(old) => self.bytes -= old.len() + 1,
                None => break,
            }
        }
        self.version = self.version.wrapping_add(1);
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// All lines joined with `\n`, each terminated.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.bytes);
        for l in &self.lines {
            out.push_str(l);
            out.push('\n');
        }
        out
    }
}
