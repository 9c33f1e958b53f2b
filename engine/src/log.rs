use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Which sink a log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Full calculation trace.
    Detail,
    /// One summary line per action.
    Info,
    /// Player-facing narrative.
    Battle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub turn: u32,
    pub level: LogLevel,
    pub line: String,
}

/// Leveled battle log. Lines are kept in order of emission and mirrored to
/// `tracing`; consumers read whichever sink they care about.
#[derive(Debug, Default, Clone)]
pub struct BattleLog {
    turn: u32,
    entries: Vec<LogEntry>,
}

impl BattleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    fn push(&mut self, level: LogLevel, line: String) {
        let line = if self.turn > 0 {
            format!("[T{}] {}", self.turn, line)
        } else {
            line
        };
        self.entries.push(LogEntry { turn: self.turn, level, line });
    }

    pub fn detail(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(turn = self.turn, "{}", line);
        self.push(LogLevel::Detail, line);
    }

    pub fn info(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(turn = self.turn, "{}", line);
        self.push(LogLevel::Info, line);
    }

    pub fn battle(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(turn = self.turn, narrative = true, "{}", line);
        self.push(LogLevel::Battle, line);
    }

    /// Recoverable data problem. Lands in the info sink.
    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        warn!(turn = self.turn, "{}", line);
        self.push(LogLevel::Info, format!("[WARN] {}", line));
    }

    pub fn error(&mut self, line: impl Into<String>) {
        let line = line.into();
        error!(turn = self.turn, "{}", line);
        self.push(LogLevel::Info, format!("[ERROR] {}", line));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn lines(&self, level: LogLevel) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |e| e.level == level)
            .map(|e| e.line.as_str())
    }

    pub fn battle_lines(&self) -> Vec<String> {
        self.lines(LogLevel::Battle).map(str::to_string).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.line.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinks_are_independent() {
        let mut log = BattleLog::new();
        log.set_turn(2);
        log.detail("[CALC] 100 x 1.5");
        log.battle("[ATTACK][Alice] hits");
        assert_eq!(log.lines(LogLevel::Detail).count(), 1);
        assert_eq!(log.battle_lines(), vec!["[T2] [ATTACK][Alice] hits".to_string()]);
    }
}
