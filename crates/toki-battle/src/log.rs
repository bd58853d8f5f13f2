//! The user-facing battle log.

/// Receives the whole log every time a line is added.
///
/// Implementations should replace whatever they displayed before with
/// `lines`; the slice is always the full log, not a delta.
pub trait BattleLogObserver {
    fn on_log_updated(&mut self, lines: &[String]);
}

impl<F: FnMut(&[String])> BattleLogObserver for F {
    fn on_log_updated(&mut self, lines: &[String]) {
        self(lines)
    }
}

/// Ordered log lines plus their observers.
#[derive(Default)]
pub struct BattleLog {
    lines: Vec<String>,
    observers: Vec<Box<dyn BattleLogObserver>>,
}

impl std::fmt::Debug for BattleLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleLog")
            .field("lines", &self.lines)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl BattleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: impl BattleLogObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Append a line and notify every observer.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
        for observer in &mut self.observers {
            observer.on_log_updated(&self.lines);
        }
    }

    /// Drop every line. Observers are told about the empty log.
    pub fn clear(&mut self) {
        self.lines.clear();
        for observer in &mut self.observers {
            observer.on_log_updated(&self.lines);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }
}
