//! Ordered, append-only log of chat entries and audio clips.
//!
//! One log per session, shared by the chat relay, the audio exchange and the
//! inbound handlers. Entries are ordered by the moment they were appended;
//! there is no API to remove or reorder them.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the append notification channel. Slow observers lag and
/// should fall back to [`EntryLog::snapshot`].
const NOTIFY_CAPACITY: usize = 64;

/// Who produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// This device.
    Local,
    /// The other member of the room.
    Remote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: Uuid,
    pub origin: Origin,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(origin: Origin, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

/// An immutable voice clip. Payload and encoding are shared, so clones are
/// cheap even for large clips.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub id: Uuid,
    pub origin: Origin,
    pub payload: Arc<[u8]>,
    pub encoded: Arc<str>,
    pub created_at: DateTime<Utc>,
}

impl AudioClip {
    pub fn new(origin: Origin, payload: Vec<u8>, encoded: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            payload: payload.into(),
            encoded: encoded.into(),
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Chat(ChatEntry),
    Audio(AudioClip),
}

impl LogEntry {
    pub fn origin(&self) -> Origin {
        match self {
            LogEntry::Chat(entry) => entry.origin,
            LogEntry::Audio(clip) => clip.origin,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Chat(entry) => entry.created_at,
            LogEntry::Audio(clip) => clip.created_at,
        }
    }
}

/// Shared handle to the session log.
#[derive(Clone)]
pub struct EntryLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    notify: broadcast::Sender<LogEntry>,
}

impl Default for EntryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryLog {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            notify,
        }
    }

    pub(crate) fn push_chat(&self, entry: ChatEntry) -> ChatEntry {
        self.append(LogEntry::Chat(entry.clone()));
        entry
    }

    pub(crate) fn push_audio(&self, clip: AudioClip) -> AudioClip {
        self.append(LogEntry::Audio(clip.clone()));
        clip
    }

    fn append(&self, entry: LogEntry) {
        // Notify under the lock so observers see entries in log order.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry.clone());
        let _ = self.notify.send(entry);
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chats(&self) -> Vec<ChatEntry> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Chat(entry) => Some(entry),
                LogEntry::Audio(_) => None,
            })
            .collect()
    }

    pub fn clips(&self) -> Vec<AudioClip> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Audio(clip) => Some(clip),
                LogEntry::Chat(_) => None,
            })
            .collect()
    }

    /// Receive every entry appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.notify.subscribe()
    }
}
