//! Speaker category classification
//!
//! Sessions list a free-text role label for each of their speakers. Those labels
//! map onto a small closed set of categories which decide where a speaker's page
//! lives (composers, performers or speakers).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a speaker is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeakerCategory {
    Composer,
    Performer,
    Presenter,
}

impl fmt::Display for SpeakerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpeakerCategory::Composer => "COMPOSER",
            SpeakerCategory::Performer => "PERFORMER",
            SpeakerCategory::Presenter => "PRESENTER",
        };
        f.write_str(name)
    }
}

/// Map a role label to its category
///
/// Matching is exact and case-sensitive. Returns `None` for labels outside the
/// known set; callers report those and carry on.
pub fn classify(role_label: &str) -> Option<SpeakerCategory> {
    match role_label {
        "Organist" | "Performer" => Some(SpeakerCategory::Performer),
        "New Music Composer" => Some(SpeakerCategory::Composer),
        "Speaker" | "Panelist" | "Presenter" | "Workshop Presenter" | "Moderator" => {
            Some(SpeakerCategory::Presenter)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performer_labels() {
        assert_eq!(classify("Organist"), Some(SpeakerCategory::Performer));
        assert_eq!(classify("Performer"), Some(SpeakerCategory::Performer));
    }

    #[test]
    fn test_composer_label() {
        assert_eq!(classify("New Music Composer"), Some(SpeakerCategory::Composer));
    }

    #[test]
    fn test_presenter_labels() {
        for label in ["Speaker", "Panelist", "Presenter", "Workshop Presenter", "Moderator"] {
            assert_eq!(classify(label), Some(SpeakerCategory::Presenter), "{label}");
        }
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(classify("Unknown Role"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(classify("organist"), None);
        assert_eq!(classify("MODERATOR"), None);
        assert_eq!(classify(" Speaker"), None);
    }

    #[test]
    fn test_display_uses_upper_case_names() {
        assert_eq!(SpeakerCategory::Composer.to_string(), "COMPOSER");
        assert_eq!(SpeakerCategory::Presenter.to_string(), "PRESENTER");
    }
}
