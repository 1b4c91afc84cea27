//! Session record

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_stub, decode};
use crate::Result;

/// One scheduled session as published by the event platform
///
/// `speakers` and `speaker_category` are index-aligned: the role label at
/// position `i` describes the speaker at position `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    session_description: String,
    #[serde(deserialize_with = "super::date_time")]
    session_end_date_time: DateTime<FixedOffset>,
    session_name: String,
    #[serde(deserialize_with = "super::date_time")]
    session_start_date_time: DateTime<FixedOffset>,
    session_stub: String,
    #[serde(default, deserialize_with = "super::nullable_list")]
    speaker_category: Vec<String>,
    #[serde(default, deserialize_with = "super::nullable_list")]
    speakers: Vec<String>,
    timezone_name: String,
    #[serde(deserialize_with = "super::date")]
    updated_date: NaiveDate,
}

impl SessionData {
    /// Validate a raw payload object into a session record
    pub fn parse(payload: &Map<String, Value>) -> Result<Self> {
        let session: Self = decode(payload)?;
        check_stub("session_stub", &session.session_stub)?;
        Ok(session)
    }

    pub fn description(&self) -> &str {
        &self.session_description
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.session_end_date_time
    }

    pub fn name(&self) -> &str {
        &self.session_name
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.session_start_date_time
    }

    pub fn stub(&self) -> &str {
        &self.session_stub
    }

    /// Raw role labels, aligned with [`speakers`](Self::speakers)
    pub fn speaker_roles(&self) -> &[String] {
        &self.speaker_category
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    /// (speaker stub, role label) pairs; trailing entries without a partner are dropped
    pub fn speaker_role_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.speakers
            .iter()
            .zip(&self.speaker_category)
            .map(|(speaker, role)| (speaker.as_str(), role.as_str()))
    }

    pub fn timezone_name(&self) -> &str {
        &self.timezone_name
    }

    pub fn updated_date(&self) -> NaiveDate {
        self.updated_date
    }
}
