use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One operator-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Session activity, newest first.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    notices: Vec<Notice>,
}

impl ActivityLog {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!(%message),
            NoticeLevel::Warning => tracing::warn!(%message),
            NoticeLevel::Error => tracing::error!(%message),
        }
        self.notices.insert(
            0,
            Notice {
                level,
                message,
                at: Utc::now(),
            },
        );
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.notices.first()
    }
}
