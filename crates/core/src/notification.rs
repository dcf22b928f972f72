//! Structured outcomes for the presentation layer.
//!
//! The core decides *what* happened; a UI decides how to show it (toasts, banners, CLI output).

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
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

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
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

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{level}] {}", self.message)
    }
}

/// Receiver of lifecycle outcomes.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing subscriber. Used when no UI sink is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
}

/// Buffers notices so a request handler can return them with its response.
#[derive(Debug, Default)]
pub struct CollectingSink {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn take(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
