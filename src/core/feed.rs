//! In-memory ordered message list, the default [`FeedSource`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::collaborators::FeedSource;
use crate::core::message::{Message, MessageId};

#[derive(Debug, Default)]
pub struct Feed {
    messages: Vec<Arc<Message>>,
    index: HashMap<MessageId, usize>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut feed = Self::new();
        feed.push_back(messages);
        feed
    }

    /// Add newer messages at the end. Returns them as shared records, ready
    /// to hand to a view.
    pub fn push_back(&mut self, batch: Vec<Message>) -> Vec<Arc<Message>> {
        let batch: Vec<Arc<Message>> = batch.into_iter().map(Arc::new).collect();
        for message in &batch {
            self.index.insert(message.id, self.messages.len());
            self.messages.push(Arc::clone(message));
        }
        batch
    }

    /// Add older messages at the front.
    pub fn push_front(&mut self, batch: Vec<Message>) -> Vec<Arc<Message>> {
        let batch: Vec<Arc<Message>> = batch.into_iter().map(Arc::new).collect();
        let older = std::mem::take(&mut self.messages);
        self.messages = batch.iter().cloned().chain(older).collect();
        self.reindex();
        batch
    }

    /// Replace the stored message with the same id, e.g. after an edit.
    pub fn update(&mut self, message: Message) -> Option<Arc<Message>> {
        let idx = *self.index.get(&message.id)?;
        let message = Arc::new(message);
        self.messages[idx] = Arc::clone(&message);
        Some(message)
    }

    /// A locally echoed message got its durable id.
    pub fn rekey(&mut self, old: MessageId, new: MessageId) -> bool {
        let Some(idx) = self.index.remove(&old) else {
            return false;
        };
        let mut message = Message::clone(&self.messages[idx]);
        message.id = new;
        message.local = false;
        self.messages[idx] = Arc::new(message);
        self.index.insert(new, idx);
        true
    }

    fn reindex(&mut self) {
        self.index = self
            .messages
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();
    }
}

impl FeedSource for Feed {
    fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    fn index_of(&self, id: MessageId) -> Option<usize> {
        self.index.get(&id).copied()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedFile {
    Bare(Vec<Message>),
    Wrapped { messages: Vec<Message> },
}

/// Read messages from a JSON file: either an array of messages or an
/// object with a `messages` array. Messages are returned sorted by id.
pub fn load_messages(path: &Path) -> io::Result<Vec<Message>> {
    let json = fs::read_to_string(path)?;
    parse_messages(&json)
}

pub fn parse_messages(json: &str) -> io::Result<Vec<Message>> {
    let file: FeedFile =
        serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut messages = match file {
        FeedFile::Bare(messages) | FeedFile::Wrapped { messages } => messages,
    };
    messages.sort_by_key(|m| m.id);
    Ok(messages)
}
