// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// How long the newest message stays in the status bubble
const BUBBLE_SECONDS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Status message with timestamp
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub timestamp: DateTime<Utc>,
    pub level: StatusLevel,
    pub message: String,
}

/// Recent load results and user-facing notices
#[derive(Debug)]
pub struct StatusLog {
    messages: VecDeque<StatusMessage>,
    max_messages: usize,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLog {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::with_capacity(20),
            max_messages: 20,
        }
    }

    /// Add a message, dropping the oldest past the limit
    pub fn push(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.push_at(Utc::now(), level, message.into());
    }

    fn push_at(&mut self, timestamp: DateTime<Utc>, level: StatusLevel, message: String) {
        self.messages.push_back(StatusMessage {
            timestamp,
            level,
            message,
        });

        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(StatusLevel::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(StatusLevel::Error, message);
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &StatusMessage> {
        self.messages.iter().rev()
    }

    /// The newest message while it is still fresh enough for the bubble
    pub fn bubble(&self, now: DateTime<Utc>) -> Option<&StatusMessage> {
        self.messages
            .back()
            .filter(|m| (now - m.timestamp).num_seconds() < BUBBLE_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_log_is_bounded() {
        let mut log = StatusLog::new();
        for i in 0..30 {
            log.info(format!("message {i}"));
        }
        assert_eq!(log.iter().count(), 20);
        assert_eq!(log.iter().next().map(|m| m.message.as_str()), Some("message 29"));
    }

    #[test]
    fn test_bubble_expires() {
        let mut log = StatusLog::new();
        let start = Utc::now();
        log.push_at(start, StatusLevel::Error, "Failed to load route".to_string());

        assert!(log.bubble(start + Duration::seconds(1)).is_some());
        assert!(log.bubble(start + Duration::seconds(BUBBLE_SECONDS)).is_none());
    }

    #[test]
    fn test_empty_log_has_no_bubble() {
        assert!(StatusLog::new().bubble(Utc::now()).is_none());
    }
}
