use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a notice stays visible unless told otherwise.
/// 通知預設顯示的時間。
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(4);

const MAX_NOTICES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        }
    }
}

/// A transient, user-visible message.
/// 短暫顯示給使用者的訊息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub created: Instant,
    pub ttl: Duration,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= self.ttl
    }
}

/// Bounded queue of notices; the oldest are dropped first.
/// 有上限的通知佇列，最舊的會先被移除。
#[derive(Debug, Clone)]
pub struct NoticeQueue {
    items: VecDeque<Notice>,
    ttl: Duration,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl NoticeQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.push_at(level, message, Instant::now());
    }

    pub fn push_at(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        if self.items.len() == MAX_NOTICES {
            self.items.pop_front();
        }
        self.items.push_back(Notice {
            level,
            message: message.into(),
            created: now,
            ttl: self.ttl,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Drops expired notices and returns the ones still visible.
    pub fn active(&mut self, now: Instant) -> impl Iterator<Item = &Notice> {
        self.items.retain(|notice| !notice.is_expired(now));
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
