// Recording test doubles - no side effects

use async_trait::async_trait;
use std::sync::Mutex;

use crate::workflows::traits::*;
use crate::workflows::types::*;

/// A signal as the UI would have received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Alert(String),
    Refresh,
}

/// Signal sink that records everything it is sent
#[derive(Debug, Default)]
pub struct RecordingSignals {
    pub received: Mutex<Vec<Signal>>,
}

impl RecordingSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.received.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.signals()
            .into_iter()
            .filter_map(|signal| match signal {
                Signal::Alert(message) => Some(message),
                Signal::Refresh => None,
            })
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.signals()
            .iter()
            .filter(|signal| matches!(signal, Signal::Refresh))
            .count()
    }
}

impl UiSignals for RecordingSignals {
    fn alert(&self, message: &str) {
        self.received
            .lock()
            .unwrap()
            .push(Signal::Alert(message.to_string()));
    }

    fn request_refresh(&self) {
        self.received.lock().unwrap().push(Signal::Refresh);
    }
}

/// Comment prompt that always answers the same way and remembers what it was asked
#[derive(Debug)]
pub struct ScriptedComment {
    pub answer: CommentOutcome,
    pub asked: Mutex<Vec<CommentRequest>>,
}

impl ScriptedComment {
    pub fn new(answer: CommentOutcome) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.lock().unwrap().len()
    }
}

#[async_trait]
impl CommentPrompt for ScriptedComment {
    async fn collect(&self, request: &CommentRequest) -> CommentOutcome {
        self.asked.lock().unwrap().push(request.clone());
        self.answer.clone()
    }
}
