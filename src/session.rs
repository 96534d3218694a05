// src/session.rs
use chrono::Local;

use crate::mode::Transition;

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub t_ms: u64,
    pub from: String,
    pub to: String,
    pub cause: String,
    pub photo_count: usize,
}

/// In-memory journal of every accepted mode change in this session.
#[derive(Debug)]
pub struct SessionLog {
    session_name: String,
    records: Vec<TransitionRecord>,
}

impl SessionLog {
    pub fn new(session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });
        Self {
            session_name,
            records: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn record(&mut self, transition: &Transition, photo_count: usize) {
        self.records.push(TransitionRecord {
            t_ms: transition.at.as_millis() as u64,
            from: transition.from.to_string(),
            to: transition.to.to_string(),
            cause: transition.cause.to_string(),
            photo_count,
        });
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }
}
