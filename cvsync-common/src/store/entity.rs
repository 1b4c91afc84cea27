//! Wrapper entities pairing an immutable record with its status flags

use crate::category::SpeakerCategory;
use crate::pages::slugify;
use crate::records::{SessionData, SpeakerData};

/// A session held by the [`RecordStore`](super::RecordStore)
///
/// `updated` marks the entity as dirty since the last load; `deleted` is a
/// tombstone. Only the store flips either flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub(crate) data: SessionData,
    pub(crate) updated: bool,
    pub(crate) deleted: bool,
}

impl Session {
    /// Freshly created entity, dirty until saved
    pub(crate) fn new(data: SessionData) -> Self {
        Self {
            data,
            updated: true,
            deleted: false,
        }
    }

    /// Entity read back from persistent storage
    pub(crate) fn loaded(data: SessionData, deleted: bool) -> Self {
        Self {
            data,
            updated: false,
            deleted,
        }
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn stub(&self) -> &str {
        self.data.stub()
    }

    pub fn filename(&self) -> String {
        format!("{}.json", self.stub())
    }

    pub fn slugified_name(&self) -> String {
        slugify(self.data.name())
    }

    pub fn url_relpath(&self) -> String {
        format!("sessions/{}/", self.slugified_name())
    }

    pub fn link(&self, base_url: &str) -> String {
        format!(
            r#"<a href="{}{}">{}</a>"#,
            base_url,
            self.url_relpath(),
            self.data.name()
        )
    }
}

/// A speaker held by the [`RecordStore`](super::RecordStore), with its derived categories
#[derive(Debug, Clone, PartialEq)]
pub struct Speaker {
    pub(crate) data: SpeakerData,
    pub(crate) categories: Vec<SpeakerCategory>,
    pub(crate) updated: bool,
    pub(crate) deleted: bool,
}

impl Speaker {
    pub(crate) fn new(data: SpeakerData, categories: Vec<SpeakerCategory>) -> Self {
        Self {
            data,
            categories,
            updated: true,
            deleted: false,
        }
    }

    pub(crate) fn loaded(data: SpeakerData, categories: Vec<SpeakerCategory>, deleted: bool) -> Self {
        Self {
            data,
            categories,
            updated: false,
            deleted,
        }
    }

    pub fn data(&self) -> &SpeakerData {
        &self.data
    }

    /// One entry per (session, role) mention; repeats are kept
    pub fn categories(&self) -> &[SpeakerCategory] {
        &self.categories
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn stub(&self) -> &str {
        self.data.stub()
    }

    pub fn filename(&self) -> String {
        format!("{}.json", self.stub())
    }

    pub fn slugified_name(&self) -> String {
        slugify(self.data.display_name())
    }

    /// Composers take precedence over performers; everyone else is a speaker
    pub fn url_relpath(&self) -> String {
        let section = if self.categories.contains(&SpeakerCategory::Composer) {
            "composers"
        } else if self.categories.contains(&SpeakerCategory::Performer) {
            "performers"
        } else {
            "speakers"
        };
        format!("{}/{}/", section, self.slugified_name())
    }

    pub fn link(&self, base_url: &str) -> String {
        format!(
            r#"<a href="{}{}">{}</a>"#,
            base_url,
            self.url_relpath(),
            self.data.display_name()
        )
    }
}
