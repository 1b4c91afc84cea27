//! Speaker record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_stub, decode};
use crate::Result;

/// A presenter, performer or composer as published by the event platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerData {
    #[serde(default, deserialize_with = "super::nullable_list")]
    presenter_at: Vec<String>,
    speaker_biography: String,
    speaker_display_name: String,
    speaker_first_name: String,
    speaker_last_name: String,
    speaker_stub: String,
    speaker_title: String,
    #[serde(deserialize_with = "super::date")]
    updated_date: NaiveDate,
}

impl SpeakerData {
    /// Validate a raw payload object into a speaker record
    pub fn parse(payload: &Map<String, Value>) -> Result<Self> {
        let speaker: Self = decode(payload)?;
        check_stub("speaker_stub", &speaker.speaker_stub)?;
        Ok(speaker)
    }

    /// Stubs of the sessions this speaker presents at
    pub fn presenter_at(&self) -> &[String] {
        &self.presenter_at
    }

    pub fn biography(&self) -> &str {
        &self.speaker_biography
    }

    pub fn display_name(&self) -> &str {
        &self.speaker_display_name
    }

    pub fn first_name(&self) -> &str {
        &self.speaker_first_name
    }

    pub fn last_name(&self) -> &str {
        &self.speaker_last_name
    }

    pub fn stub(&self) -> &str {
        &self.speaker_stub
    }

    pub fn title(&self) -> &str {
        &self.speaker_title
    }

    pub fn updated_date(&self) -> NaiveDate {
        self.updated_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "presenterAt": ["sess-001"],
            "speakerBiography": "Organist and teacher.",
            "speakerDisplayName": "Ada Organa",
            "speakerFirstName": "Ada",
            "speakerLastName": "Organa",
            "speakerStub": "spk-1",
            "speakerTitle": "Director of Music",
            "updatedDate": "2024-05-02"
        })
    }

    #[test]
    fn test_parse_valid_payload() {
        let value = payload();
        let speaker = SpeakerData::parse(value.as_object().unwrap()).unwrap();
        assert_eq!(speaker.stub(), "spk-1");
        assert_eq!(speaker.display_name(), "Ada Organa");
        assert_eq!(speaker.presenter_at(), ["sess-001"]);
    }

    #[test]
    fn test_presenter_at_defaults_to_empty() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("presenterAt");
        let speaker = SpeakerData::parse(value.as_object().unwrap()).unwrap();
        assert!(speaker.presenter_at().is_empty());
    }

    #[test]
    fn test_wrong_type_fails() {
        let mut value = payload();
        value["speakerTitle"] = json!(42);
        let err = SpeakerData::parse(value.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("speakerTitle: invalid type"), "{err}");
    }

    #[test]
    fn test_stub_with_separator_fails() {
        let mut value = payload();
        value["speakerStub"] = json!("../spk-1");
        let err = SpeakerData::parse(value.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("speakerStub: "), "{err}");
    }

    #[test]
    fn test_bad_updated_date_fails() {
        let mut value = payload();
        value["updatedDate"] = json!("05/02/2024");
        let err = SpeakerData::parse(value.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("updatedDate: invalid date"));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let mut value = payload();
        value["speakerPhotoUrl"] = json!("https://example.org/ada.jpg");
        assert!(SpeakerData::parse(value.as_object().unwrap()).is_ok());
    }
}
