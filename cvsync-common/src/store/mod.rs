//! Record store
//!
//! In-memory view of all sessions and speakers, loaded in bulk from a
//! [`RecordBackend`] and written back selectively. Only entities whose
//! `updated` flag is set are written on save, so unchanged records never touch
//! storage.
//!
//! The store also keeps a derived index from speaker stub to categories,
//! computed from the role labels of every live session. The index is rebuilt
//! whenever the set of sessions changes.

mod backend;
mod entity;

pub use backend::{Collection, FsBackend, MemoryBackend, RecordBackend};
pub use entity::{Session, Speaker};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::category::{classify, SpeakerCategory};
use crate::records::{SessionData, SpeakerData};
use crate::{Error, Result};

/// Marker key added to persisted tombstones
const DELETED_KEY: &str = "deleted";

/// Sessions, speakers and the derived speaker category index
#[derive(Debug, Default)]
pub struct RecordStore {
    sessions: BTreeMap<String, Session>,
    speakers: BTreeMap<String, Speaker>,
    speaker_categories: BTreeMap<String, Vec<SpeakerCategory>>,
}

impl RecordStore {
    /// Empty store, nothing loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every session and speaker from `backend`
    ///
    /// A missing collection is logged and treated as empty. When two records
    /// share a stub the later one (in name order) wins.
    pub fn load(backend: &dyn RecordBackend) -> Result<Self> {
        let mut store = Self::new();

        for (location, payload) in read_collection(backend, Collection::Sessions)? {
            let data = SessionData::parse(&payload).map_err(|e| corrupt(&location, e))?;
            let session = Session::loaded(data, is_tombstone(&payload));
            if let Some(previous) = store.sessions.get(session.stub()) {
                warn!(
                    "Duplicate session stub: {} ({}), replacing with {}",
                    session.stub(),
                    previous.slugified_name(),
                    location
                );
            }
            store.sessions.insert(session.stub().to_owned(), session);
        }

        store.rebuild_category_index(true);

        for (location, payload) in read_collection(backend, Collection::Speakers)? {
            let data = SpeakerData::parse(&payload).map_err(|e| corrupt(&location, e))?;
            let categories = store.categories_for(data.stub()).to_vec();
            let speaker = Speaker::loaded(data, categories, is_tombstone(&payload));
            if let Some(previous) = store.speakers.get(speaker.stub()) {
                warn!(
                    "Duplicate speaker stub: {} ({}), replacing with {}",
                    speaker.stub(),
                    previous.slugified_name(),
                    location
                );
            }
            store.speakers.insert(speaker.stub().to_owned(), speaker);
        }

        debug!(
            "Loaded {} sessions and {} speakers",
            store.sessions.len(),
            store.speakers.len()
        );
        Ok(store)
    }

    /// Load from a data directory laid out as `sessions/` and `speakers/`
    pub fn load_dir(data_dir: &Path) -> Result<Self> {
        Self::load(&FsBackend::new(data_dir))
    }

    /// Write every updated entity; returns how many records were written
    ///
    /// Tombstoned entities are written with a `"deleted": true` marker.
    /// Records are never removed from the backend.
    pub fn save(&self, backend: &dyn RecordBackend) -> Result<usize> {
        let mut written = 0;

        backend.ensure(Collection::Sessions)?;
        for session in self.sessions.values().filter(|s| s.updated) {
            let contents = encode(&session.data, session.deleted)?;
            backend.write(Collection::Sessions, &session.filename(), &contents)?;
            info!("Wrote {}", backend.locate(Collection::Sessions, &session.filename()));
            written += 1;
        }

        backend.ensure(Collection::Speakers)?;
        for speaker in self.speakers.values().filter(|s| s.updated) {
            let contents = encode(&speaker.data, speaker.deleted)?;
            backend.write(Collection::Speakers, &speaker.filename(), &contents)?;
            info!("Wrote {}", backend.locate(Collection::Speakers, &speaker.filename()));
            written += 1;
        }

        Ok(written)
    }

    /// Save into a data directory, creating it if needed
    pub fn save_dir(&self, data_dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(data_dir)?;
        self.save(&FsBackend::new(data_dir))
    }

    /// Create or replace a session; returns whether anything changed
    ///
    /// A value-equal record is a no-op. Upserting a tombstoned session brings
    /// it back.
    pub fn upsert_session(&mut self, data: SessionData) -> bool {
        if let Some(existing) = self.sessions.get(data.stub()) {
            if existing.data == data && !existing.deleted {
                return false;
            }
        }

        for (speaker, role) in data.speaker_role_pairs() {
            if classify(role).is_none() {
                warn!(
                    "Unknown speaker category {:?} for {} in session {}",
                    role,
                    speaker,
                    data.stub()
                );
            }
        }

        match self.sessions.get_mut(data.stub()) {
            Some(existing) => {
                existing.data = data;
                existing.updated = true;
                existing.deleted = false;
            }
            None => {
                let session = Session::new(data);
                self.sessions.insert(session.stub().to_owned(), session);
            }
        }

        self.rebuild_category_index(false);
        true
    }

    /// Create or replace a speaker; returns whether anything changed
    pub fn upsert_speaker(&mut self, data: SpeakerData) -> bool {
        match self.speakers.get_mut(data.stub()) {
            Some(existing) if existing.data == data && !existing.deleted => false,
            Some(existing) => {
                existing.data = data;
                existing.updated = true;
                existing.deleted = false;
                true
            }
            None => {
                let categories = self.categories_for(data.stub()).to_vec();
                let speaker = Speaker::new(data, categories);
                self.speakers.insert(speaker.stub().to_owned(), speaker);
                true
            }
        }
    }

    /// Tombstone a session; returns whether the stub was found
    pub fn delete_session(&mut self, stub: &str) -> bool {
        let Some(existing) = self.sessions.get_mut(stub) else {
            return false;
        };
        if !existing.deleted {
            existing.deleted = true;
            existing.updated = true;
            self.rebuild_category_index(false);
        }
        true
    }

    /// Tombstone a speaker; returns whether the stub was found
    ///
    /// The category index keeps the speaker's entries, since they come from
    /// sessions rather than from the speaker record.
    pub fn delete_speaker(&mut self, stub: &str) -> bool {
        let Some(existing) = self.speakers.get_mut(stub) else {
            return false;
        };
        if !existing.deleted {
            existing.deleted = true;
            existing.updated = true;
        }
        true
    }

    pub fn session(&self, stub: &str) -> Option<&Session> {
        self.sessions.get(stub)
    }

    pub fn speaker(&self, stub: &str) -> Option<&Speaker> {
        self.speakers.get(stub)
    }

    /// All sessions in stub order, tombstones included
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// All speakers in stub order, tombstones included
    pub fn speakers(&self) -> impl Iterator<Item = &Speaker> {
        self.speakers.values()
    }

    /// Derived categories for a speaker stub, empty if it appears in no session
    pub fn categories_for(&self, speaker_stub: &str) -> &[SpeakerCategory] {
        self.speaker_categories
            .get(speaker_stub)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True if any entity is waiting to be saved
    pub fn is_dirty(&self) -> bool {
        self.sessions.values().any(|s| s.updated) || self.speakers.values().any(|s| s.updated)
    }

    /// Recompute speaker categories from all live sessions
    ///
    /// Repeated mentions are kept, so a speaker at three performer sessions
    /// gets three `Performer` entries.
    fn rebuild_category_index(&mut self, report_unknown: bool) {
        let mut index: BTreeMap<String, Vec<SpeakerCategory>> = BTreeMap::new();
        for session in self.sessions.values().filter(|s| !s.deleted) {
            for (speaker, role) in session.data.speaker_role_pairs() {
                match classify(role) {
                    Some(category) => index.entry(speaker.to_owned()).or_default().push(category),
                    None if report_unknown => warn!(
                        "Unknown speaker category {:?} in {}",
                        role,
                        session.slugified_name()
                    ),
                    None => {}
                }
            }
        }

        for speaker in self.speakers.values_mut() {
            speaker.categories = index.get(speaker.stub()).cloned().unwrap_or_default();
        }
        self.speaker_categories = index;
    }
}

/// Decode every record of a collection into a JSON object, tagged with its location
fn read_collection(
    backend: &dyn RecordBackend,
    collection: Collection,
) -> Result<Vec<(String, Map<String, Value>)>> {
    let Some(names) = backend.list(collection)? else {
        warn!(
            "Collection {} not found at {}, treating as empty",
            collection,
            backend.locate(collection, "")
        );
        return Ok(Vec::new());
    };

    names
        .iter()
        .map(|name| -> Result<(String, Map<String, Value>)> {
            let location = backend.locate(collection, name);
            let bytes = backend.read(collection, name)?;
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(payload)) => Ok((location, payload)),
                Ok(_) => Err(Error::CorruptRecord {
                    location,
                    reason: "expected a JSON object".to_string(),
                }),
                Err(e) => Err(Error::CorruptRecord {
                    location,
                    reason: e.to_string(),
                }),
            }
        })
        .collect()
}

fn is_tombstone(payload: &Map<String, Value>) -> bool {
    payload.get(DELETED_KEY).and_then(Value::as_bool).unwrap_or(false)
}

fn encode<T: Serialize>(data: &T, deleted: bool) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(data)?;
    if deleted {
        if let Value::Object(map) = &mut value {
            map.insert(DELETED_KEY.to_string(), Value::Bool(true));
        }
    }
    Ok(serde_json::to_vec_pretty(&value)?)
}

fn corrupt(location: &str, err: Error) -> Error {
    Error::CorruptRecord {
        location: location.to_string(),
        reason: err.to_string(),
    }
}
