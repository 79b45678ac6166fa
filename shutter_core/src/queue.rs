//! Commands and the fixed-depth FIFO that buffers them.

use std::fmt;

/// Operator or remote request handled by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Open,
    Close,
    Stop,
    Home,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Stop => "stop",
            Self::Home => "home",
        };
        f.write_str(s)
    }
}

pub const QUEUE_CAPACITY: usize = 4;

/// Rejected push; carries the command that did not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("command queue full, dropped {0}")]
pub struct QueueFull(pub Command);

/// Ring buffer of at most [`QUEUE_CAPACITY`] commands.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    slots: [Option<Command>; QUEUE_CAPACITY],
    head: usize,
    len: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: Command) -> Result<(), QueueFull> {
        if self.len == QUEUE_CAPACITY {
            return Err(QueueFull(cmd));
        }
        let tail = (self.head + self.len) % QUEUE_CAPACITY;
        self.slots[tail] = Some(cmd);
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Command> {
        if self.len == 0 {
            return None;
        }
        let cmd = self.slots[self.head].take();
        self.head = (self.head + 1) % QUEUE_CAPACITY;
        self.len -= 1;
        cmd
    }

    pub fn clear(&mut self) {
        self.slots = [None; QUEUE_CAPACITY];
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == QUEUE_CAPACITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_across_wraparound() {
        let mut q = CommandQueue::new();
        q.push(Command::Open).unwrap();
        q.push(Command::Close).unwrap();
        assert_eq!(q.pop(), Some(Command::Open));
        q.push(Command::Home).unwrap();
        q.push(Command::Open).unwrap();
        q.push(Command::Close).unwrap();
        assert!(q.is_full());
        assert_eq!(q.pop(), Some(Command::Close));
        assert_eq!(q.pop(), Some(Command::Home));
        assert_eq!(q.pop(), Some(Command::Open));
        assert_eq!(q.pop(), Some(Command::Close));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn fifth_push_is_rejected_with_the_command() {
        let mut q = CommandQueue::new();
        for _ in 0..QUEUE_CAPACITY {
            q.push(Command::Open).unwrap();
        }
        assert_eq!(q.push(Command::Home), Err(QueueFull(Command::Home)));
        assert_eq!(q.len(), QUEUE_CAPACITY);
    }

    #[test]
    fn clear_empties() {
        let mut q = CommandQueue::new();
        q.push(Command::Close).unwrap();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
    }
}
