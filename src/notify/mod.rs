use std::sync::Mutex;

use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Transient user notifications (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

// prints `[OK ] message` / `[ERR] message` to stderr
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Success => "OK ".bold().green(),
            NoticeLevel::Error => "ERR".bold().red(),
        };
        eprintln!(
            "{}{}{} {}",
            "[".bold().white(),
            tag,
            "]".bold().white(),
            notice.message.bold().white()
        );
    }
}

/// Keeps every notice, for callers that render them later.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
