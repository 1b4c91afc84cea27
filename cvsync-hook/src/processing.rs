//! One event, start to finish: load the store, reconcile, save, regenerate pages
//!
//! Saving and page generation are best effort. Once an event has been
//! reconciled it counts as accepted; write failures are logged, not returned.

use std::path::Path;

use cvsync_common::notify::Notifier;
use cvsync_common::pages::generate_pages;
use cvsync_common::{reconcile, EventEnvelope, RecordStore, Result};
use tracing::{error, info};

use crate::PageSettings;

/// Apply `event` to the store under `data_dir`; returns whether the store changed
///
/// Performs blocking file I/O. Callers must hold the data directory lock.
pub fn apply_event(
    data_dir: &Path,
    event: &EventEnvelope,
    notifier: &dyn Notifier,
    pages: Option<&PageSettings>,
) -> Result<bool> {
    let mut store = RecordStore::load_dir(data_dir)?;
    let changed = reconcile(event, &mut store, notifier)?;
    if !changed {
        return Ok(false);
    }

    match store.save_dir(data_dir) {
        Ok(written) => info!("Saved {} records to {}", written, data_dir.display()),
        Err(e) => {
            error!("Failed to save database to {}: {}", data_dir.display(), e);
            return Ok(true);
        }
    }

    if let Some(pages) = pages {
        if let Err(e) = generate_pages(&store, &pages.base_url, &pages.output_dir) {
            error!(
                "Failed to generate pages in {}: {}",
                pages.output_dir.display(),
                e
            );
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvsync_common::notify::NoopNotifier;
    use serde_json::json;

    fn speaker_event(name: &str) -> EventEnvelope {
        EventEnvelope::from_value(json!({
            "eventType": "SpeakerCreated",
            "message": [{
                "speakerBiography": "Bio",
                "speakerDisplayName": name,
                "speakerFirstName": name,
                "speakerLastName": "Example",
                "speakerStub": "p1",
                "speakerTitle": "Organist",
                "updatedDate": "2024-05-01"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_changed_event_saves_and_renders() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let pages = PageSettings {
            output_dir: dir.path().join("pages"),
            base_url: "https://example.org/".into(),
        };

        let changed = apply_event(&data_dir, &speaker_event("Ada"), &NoopNotifier, Some(&pages)).unwrap();
        assert!(changed);
        assert!(data_dir.join("speakers").join("p1.json").is_file());
        assert!(pages.output_dir.join("speaker-ada.md").is_file());
    }

    #[test]
    fn test_unchanged_event_skips_pages() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        apply_event(&data_dir, &speaker_event("Ada"), &NoopNotifier, None).unwrap();

        let pages = PageSettings {
            output_dir: dir.path().join("pages"),
            base_url: "/".into(),
        };
        let changed = apply_event(&data_dir, &speaker_event("Ada"), &NoopNotifier, Some(&pages)).unwrap();
        assert!(!changed);
        assert!(!pages.output_dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_failure_still_accepts_event() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        std::fs::create_dir(data_dir.join("speakers")).unwrap();
        std::fs::set_permissions(data_dir.join("speakers"), std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = apply_event(&data_dir, &speaker_event("Ada"), &NoopNotifier, None);

        std::fs::set_permissions(data_dir.join("speakers"), std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(result.unwrap());
    }
}
