//! Event reconciliation
//!
//! Applies one webhook event to a [`RecordStore`]. Payloads are validated
//! before the store is touched, so a rejected event leaves it unchanged.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::notify::{CircleRegistration, Notifier};
use crate::records::{camel_case, SessionData, SpeakerData};
use crate::store::RecordStore;
use crate::{Error, Result};

/// Admission item whose registrations trigger a notification
pub const CIRCLE_ADMISSION_ITEM: &str = "Convention Registration – SF Select Circle";

/// Event kinds handled by [`reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SessionCreated,
    SessionUpdated,
    SessionDeleted,
    SpeakerCreated,
    SpeakerUpdated,
    SpeakerDeleted,
    InviteeOrGuestAccepted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionCreated => "SessionCreated",
            EventKind::SessionUpdated => "SessionUpdated",
            EventKind::SessionDeleted => "SessionDeleted",
            EventKind::SpeakerCreated => "SpeakerCreated",
            EventKind::SpeakerUpdated => "SpeakerUpdated",
            EventKind::SpeakerDeleted => "SpeakerDeleted",
            EventKind::InviteeOrGuestAccepted => "InviteeOrGuestAccepted",
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SessionCreated" => Ok(EventKind::SessionCreated),
            "SessionUpdated" => Ok(EventKind::SessionUpdated),
            "SessionDeleted" => Ok(EventKind::SessionDeleted),
            "SpeakerCreated" => Ok(EventKind::SpeakerCreated),
            "SpeakerUpdated" => Ok(EventKind::SpeakerUpdated),
            "SpeakerDeleted" => Ok(EventKind::SpeakerDeleted),
            "InviteeOrGuestAccepted" => Ok(EventKind::InviteeOrGuestAccepted),
            other => Err(Error::UnrecognizedEventKind(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded webhook body: an event tag, the first message object and any
/// further `message` entries, which are never processed
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub event_type: String,
    pub message: Map<String, Value>,
    pub extra: Vec<Value>,
}

impl EventEnvelope {
    /// Check the envelope shape of a raw JSON body
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            return Err(Error::MalformedEvent("event body must be a JSON object".into()));
        };

        let event_type = match body.remove("eventType") {
            Some(Value::String(event_type)) => event_type,
            Some(_) => return Err(Error::MalformedEvent("eventType must be a string".into())),
            None => return Err(Error::MalformedEvent("missing eventType".into())),
        };

        let mut items = match body.remove("message") {
            Some(Value::Array(items)) => items.into_iter(),
            Some(_) => return Err(Error::MalformedEvent("message must be a list".into())),
            None => return Err(Error::MalformedEvent("missing message".into())),
        };

        let message = match items.next() {
            Some(Value::Object(payload)) => payload,
            Some(_) => return Err(Error::MalformedEvent("message[0] must be an object".into())),
            None => return Err(Error::MalformedEvent("message list is empty".into())),
        };

        Ok(Self {
            event_type,
            message,
            extra: items.collect(),
        })
    }

    /// Number of entries in the original `message` list
    pub fn message_count(&self) -> usize {
        1 + self.extra.len()
    }
}

/// Apply one event to the store; returns whether the store changed
///
/// Only the first message is processed. Unknown event kinds are rejected
/// before the payload is inspected.
pub fn reconcile(event: &EventEnvelope, store: &mut RecordStore, notifier: &dyn Notifier) -> Result<bool> {
    let kind: EventKind = event.event_type.parse()?;
    let message = &event.message;

    if !event.extra.is_empty() {
        warn!("Request contained {} additional messages", event.extra.len());
        log_json_lines("others", &event.extra);
    }

    info!("Handling event of type {}", kind);
    let changed = match kind {
        EventKind::SessionCreated | EventKind::SessionUpdated => {
            store.upsert_session(SessionData::parse(message)?)
        }
        EventKind::SessionDeleted => store.delete_session(&required_str(message, "session_stub")?),
        EventKind::SpeakerCreated | EventKind::SpeakerUpdated => {
            store.upsert_speaker(SpeakerData::parse(message)?)
        }
        EventKind::SpeakerDeleted => store.delete_speaker(&required_str(message, "speaker_stub")?),
        EventKind::InviteeOrGuestAccepted => {
            let admission_item = required_str(message, "admission_item")?;
            if admission_item == CIRCLE_ADMISSION_ITEM {
                notifier.notify(CircleRegistration::from_message(message));
            } else {
                warn!("Invitee/Guest accepted with admission item {:?}", admission_item);
                log_json_lines("full message", message);
            }
            false
        }
    };

    debug!("Event {} changed store: {}", kind, changed);
    Ok(changed)
}

/// String field lookup by internal name, without schema validation
fn required_str(message: &Map<String, Value>, name: &str) -> Result<String> {
    let key = camel_case(name);
    match message.get(&key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(Error::validation(key, "expected a string")),
        None => Err(Error::validation(key, "field required")),
    }
}

fn log_json_lines(label: &str, value: &impl serde::Serialize) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        for line in pretty.lines() {
            debug!("{}: {}", label, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<CircleRegistration>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, registration: CircleRegistration) {
            self.sent.lock().unwrap().push(registration);
        }
    }

    fn envelope(value: Value) -> EventEnvelope {
        EventEnvelope::from_value(value).unwrap()
    }

    fn session_event(event_type: &str, stub: &str, name: &str) -> EventEnvelope {
        envelope(json!({
            "eventType": event_type,
            "message": [{
                "sessionDescription": "Organ music",
                "sessionEndDateTime": "2024-07-01T11:00:00-07:00",
                "sessionName": name,
                "sessionStartDateTime": "2024-07-01T10:00:00-07:00",
                "sessionStub": stub,
                "speakerCategory": ["Organist"],
                "speakers": ["p1"],
                "timezoneName": "America/Los_Angeles",
                "updatedDate": "2024-05-01"
            }]
        }))
    }

    #[test]
    fn test_event_kind_round_trip() {
        for kind in [
            EventKind::SessionCreated,
            EventKind::SessionUpdated,
            EventKind::SessionDeleted,
            EventKind::SpeakerCreated,
            EventKind::SpeakerUpdated,
            EventKind::SpeakerDeleted,
            EventKind::InviteeOrGuestAccepted,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_envelope_rejects_bad_shapes() {
        for body in [
            json!([]),
            json!({"message": [{}]}),
            json!({"eventType": 3, "message": [{}]}),
            json!({"eventType": "SessionCreated"}),
            json!({"eventType": "SessionCreated", "message": []}),
            json!({"eventType": "SessionCreated", "message": {"sessionStub": "a"}}),
            json!({"eventType": "SessionCreated", "message": ["a"]}),
            json!({"eventType": "SessionCreated", "message": [null, {"sessionStub": "a"}]}),
        ] {
            let err = EventEnvelope::from_value(body.clone()).unwrap_err();
            assert_eq!(err.kind(), "MalformedEvent", "{body}");
        }
    }

    #[test]
    fn test_session_created_then_updated() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();

        let created = session_event("SessionCreated", "s1", "Recital");
        assert!(reconcile(&created, &mut store, &notifier).unwrap());
        assert!(!reconcile(&created, &mut store, &notifier).unwrap());

        let updated = session_event("SessionUpdated", "s1", "Late Recital");
        assert!(reconcile(&updated, &mut store, &notifier).unwrap());
        assert_eq!(store.session("s1").unwrap().data().name(), "Late Recital");
    }

    #[test]
    fn test_session_deleted_flags_existing() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        reconcile(&session_event("SessionCreated", "abc", "Recital"), &mut store, &notifier).unwrap();

        let deleted = envelope(json!({"eventType": "SessionDeleted", "message": [{"sessionStub": "abc"}]}));
        assert!(reconcile(&deleted, &mut store, &notifier).unwrap());
        assert!(store.session("abc").unwrap().is_deleted());
    }

    #[test]
    fn test_delete_unknown_stub_is_no_change() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let deleted = envelope(json!({"eventType": "SpeakerDeleted", "message": [{"speakerStub": "ghost"}]}));
        assert!(!reconcile(&deleted, &mut store, &notifier).unwrap());
        assert_eq!(store.speakers().count(), 0);
    }

    #[test]
    fn test_delete_without_stub_is_validation_error() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let deleted = envelope(json!({"eventType": "SessionDeleted", "message": [{"stub": "abc"}]}));
        let err = reconcile(&deleted, &mut store, &notifier).unwrap_err();
        assert_eq!(err.to_string(), "sessionStub: field required");
    }

    #[test]
    fn test_unrecognized_kind_leaves_store_unchanged() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let event = session_event("SessionRenamed", "s1", "Recital");
        let err = reconcile(&event, &mut store, &notifier).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedEventKind(ref tag) if tag == "SessionRenamed"));
        assert_eq!(store.sessions().count(), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_invalid_payload_leaves_store_unchanged() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let event = envelope(json!({
            "eventType": "SpeakerCreated",
            "message": [{"speakerStub": "p1", "speakerDisplayName": "Ada"}]
        }));
        let err = reconcile(&event, &mut store, &notifier).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(store.speakers().count(), 0);
    }

    #[test]
    fn test_only_first_message_is_processed() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let first = session_event("SessionCreated", "s1", "One");
        let second = session_event("SessionCreated", "s2", "Two");
        let event = EventEnvelope {
            event_type: "SessionCreated".into(),
            message: first.message,
            extra: vec![Value::Object(second.message)],
        };
        assert!(reconcile(&event, &mut store, &notifier).unwrap());
        assert!(store.session("s1").is_some());
        assert!(store.session("s2").is_none());
    }

    #[test]
    fn test_non_object_extra_messages_are_ignored() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let mut body = json!({
            "eventType": "SessionCreated",
            "message": [session_event("SessionCreated", "s1", "One").message]
        });
        body["message"].as_array_mut().unwrap().extend([json!("stray"), json!(7)]);

        let event = envelope(body);
        assert_eq!(event.message_count(), 3);
        assert!(reconcile(&event, &mut store, &notifier).unwrap());
        assert!(store.session("s1").is_some());
    }

    #[test]
    fn test_circle_registration_notifies() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let event = envelope(json!({
            "eventType": "InviteeOrGuestAccepted",
            "message": [{"admissionItem": CIRCLE_ADMISSION_ITEM, "fullName": "Ada Organa"}]
        }));
        assert!(!reconcile(&event, &mut store, &notifier).unwrap());
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].full_name.as_deref(), Some("Ada Organa"));
    }

    #[test]
    fn test_other_admission_item_does_not_notify() {
        let mut store = RecordStore::new();
        let notifier = RecordingNotifier::default();
        let event = envelope(json!({
            "eventType": "InviteeOrGuestAccepted",
            "message": [{"admissionItem": "Convention Registration – Regular", "fullName": "Bo"}]
        }));
        assert!(!reconcile(&event, &mut store, &notifier).unwrap());
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert!(!store.is_dirty());
    }
}
