//! Chunk Accumulation & Session State
//!
//! A [`Chunk`] is one upload unit: the LOM entries, exploration events and
//! action events recorded since the last flush. The [`ChunkBuffer`] owns
//! the active chunk exclusively; [`ChunkBuffer::drain_and_reset`] hands the
//! filled chunk to the flusher and installs a fresh empty one in the same
//! step, so no event is ever lost or duplicated across a flush boundary.
//!
//! [`SessionState`] pairs the buffer with the session identifier: one
//! opaque uuid minted per process lifetime (or per explicit
//! reinitialization) and never mutated afterwards.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::capture::lom::LomEntry;
use crate::event::{ActionEvent, ExplorationEvent};
use crate::{Error, Result};

/// Library version tag reported in every chunk.
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library type tag reported in every chunk.
pub const LIB_TYPE: &str = "rust";

/// One batched unit of events and captures pending upload.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub lib_version: String,
    pub lib_type: String,
    /// Wall-clock creation time, ms since the Unix epoch.
    pub created_at: i64,
    pub session_id: String,
    pub loms: Vec<LomEntry>,
    /// Serialized exploration events, in append order.
    pub exploration: Vec<String>,
    /// Serialized action events, in append order.
    pub actions: Vec<String>,
}

impl Chunk {
    fn new(session_id: &str) -> Self {
        Self {
            lib_version: LIB_VERSION.to_string(),
            lib_type: LIB_TYPE.to_string(),
            created_at: Utc::now().timestamp_millis(),
            session_id: session_id.to_string(),
            loms: Vec::new(),
            exploration: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// A chunk is empty iff all three lists are empty.
    pub fn is_empty(&self) -> bool {
        self.loms.is_empty() && self.exploration.is_empty() && self.actions.is_empty()
    }

    /// Assemble the wire JSON body for one flush.
    pub fn to_wire(&self) -> serde_json::Value {
        json!({
            "lib_v": self.lib_version,
            "lib_t": self.lib_type,
            "ts": self.created_at,
            "sid": self.session_id,
            "loms": self.loms,
            "pnt": [],
            "ee": self.exploration,
            "ae": self.actions,
        })
    }
}

/// Exclusive owner of the active chunk.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunk: Option<Chunk>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh empty chunk for the given session.
    pub fn init(&mut self, session_id: &str) {
        self.chunk = Some(Chunk::new(session_id));
    }

    pub fn add_lom(&mut self, entry: LomEntry) -> Result<()> {
        self.active()?.loms.push(entry);
        Ok(())
    }

    pub fn add_exploration_events(&mut self, events: &[ExplorationEvent]) -> Result<()> {
        let chunk = self.active()?;
        chunk
            .exploration
            .extend(events.iter().map(ExplorationEvent::encode));
        Ok(())
    }

    pub fn add_action_event(&mut self, event: &ActionEvent) -> Result<()> {
        self.active()?.actions.push(event.encode());
        Ok(())
    }

    /// True when there is nothing to flush. An uninitialized buffer counts
    /// as empty so flush paths can race initialization harmlessly.
    pub fn is_empty(&self) -> bool {
        self.chunk.as_ref().map(Chunk::is_empty).unwrap_or(true)
    }

    /// Take the filled chunk for serialization and install a fresh empty
    /// one in the same step.
    pub fn drain_and_reset(&mut self, session_id: &str) -> Result<Chunk> {
        let drained = self.chunk.take().ok_or(Error::NotInitialized)?;
        self.chunk = Some(Chunk::new(session_id));
        Ok(drained)
    }

    fn active(&mut self) -> Result<&mut Chunk> {
        self.chunk.as_mut().ok_or(Error::NotInitialized)
    }
}

/// Session identity plus the chunk accumulator.
#[derive(Debug, Default)]
pub struct SessionState {
    session_id: Option<String>,
    buffer: ChunkBuffer,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a session id and open the first chunk. Calling again
    /// reinitializes: a new id, a fresh chunk.
    pub fn init_session(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.buffer.init(&id);
        self.session_id = Some(id.clone());
        id
    }

    pub fn session_id(&self) -> Result<&str> {
        self.session_id.as_deref().ok_or(Error::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn add_lom(&mut self, entry: LomEntry) -> Result<()> {
        self.ensure_initialized()?;
        self.buffer.add_lom(entry)
    }

    pub fn add_exploration_events(&mut self, events: &[ExplorationEvent]) -> Result<()> {
        self.ensure_initialized()?;
        self.buffer.add_exploration_events(events)
    }

    pub fn add_action_event(&mut self, event: &ActionEvent) -> Result<()> {
        self.ensure_initialized()?;
        self.buffer.add_action_event(event)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drain the active chunk for flushing; the replacement chunk belongs
    /// to the same session.
    pub fn drain_and_reset(&mut self) -> Result<Chunk> {
        let session_id = self
            .session_id
            .clone()
            .ok_or(Error::NotInitialized)?;
        self.buffer.drain_and_reset(&session_id)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.session_id.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }
}
