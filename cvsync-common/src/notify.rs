//! Registration notifications
//!
//! When someone registers for the Select Circle admission item, the organizers
//! get an email with the registrant's contact details. Delivery goes through
//! a [`Notifier`] so the reconciler never talks to the network itself.

use std::fmt::Write as _;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::MailgunConfig;
use crate::{Error, Result};

const MAILGUN_API_BASE: &str = "https://api.mailgun.net/v3";
const USER_AGENT: &str = concat!("cvsync/", env!("CARGO_PKG_VERSION"));

/// Contact details of a Select Circle registrant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircleRegistration {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub home_phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub work_phone: Option<String>,
}

impl CircleRegistration {
    /// Pick the contact fields out of a raw invitee message
    ///
    /// Missing or non-string fields become `None`.
    pub fn from_message(message: &Map<String, Value>) -> Self {
        let field = |key: &str| message.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            full_name: field("fullName"),
            first_name: field("firstName"),
            last_name: field("lastName"),
            email: field("email"),
            home_phone: field("homePhone"),
            mobile_phone: field("mobilePhone"),
            work_phone: field("workPhone"),
        }
    }

    pub fn subject(&self) -> String {
        format!("SF Select Circle registration: {}", display(&self.full_name))
    }

    pub fn body(&self) -> String {
        let lines = [
            ("Full Name", &self.full_name),
            ("First Name", &self.first_name),
            ("Last Name", &self.last_name),
            ("Email", &self.email),
            ("Home Phone", &self.home_phone),
            ("Mobile Phone", &self.mobile_phone),
            ("Work Phone", &self.work_phone),
        ];
        let mut body = String::new();
        for (label, value) in lines {
            let _ = writeln!(body, "{label}: {}", display(value));
        }
        body
    }
}

fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

/// Outbound notification capability
///
/// Implementations must not block the caller on delivery and must not fail
/// the reconciliation; delivery problems are logged.
pub trait Notifier: Send + Sync {
    fn notify(&self, registration: CircleRegistration);
}

/// Logs registrations without sending anything
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, registration: CircleRegistration) {
        info!(
            "Notification delivery disabled, dropping: {}",
            registration.subject()
        );
    }
}

/// Sends registration emails through the Mailgun HTTP API
#[derive(Debug, Clone)]
pub struct MailgunNotifier {
    http_client: reqwest::Client,
    api_key: String,
    config: MailgunConfig,
    runtime: tokio::runtime::Handle,
}

impl MailgunNotifier {
    /// Must be created inside a tokio runtime; sends are spawned onto it
    pub fn new(api_key: String, config: MailgunConfig) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("Mailgun notifier needs a tokio runtime: {}", e)))?;
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Notify(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            config,
            runtime,
        })
    }

    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", MAILGUN_API_BASE, self.config.domain)
    }

    /// Deliver one registration email and wait for the API response
    pub async fn send(&self, registration: &CircleRegistration) -> Result<()> {
        let subject = registration.subject();
        let body = registration.body();
        let form = [
            ("from", self.config.from.as_str()),
            ("to", self.config.to.as_str()),
            ("subject", subject.as_str()),
            ("text", body.as_str()),
        ];

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Notify(format!("Mailgun request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Notify(format!("Mailgun returned {}: {}", status, body)));
        }

        debug!("Mailgun accepted message {:?}", subject);
        Ok(())
    }
}

impl Notifier for MailgunNotifier {
    fn notify(&self, registration: CircleRegistration) {
        let notifier = self.clone();
        self.runtime.spawn(async move {
            match notifier.send(&registration).await {
                Ok(()) => info!("Sent notification: {}", registration.subject()),
                Err(e) => error!("Failed to send notification {:?}: {}", registration.subject(), e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_message_picks_contact_fields() {
        let message = json!({
            "fullName": "Ada Organa",
            "firstName": "Ada",
            "lastName": "Organa",
            "email": "ada@example.org",
            "mobilePhone": "555-0100",
            "workPhone": 5550101,
            "admissionItem": "Convention Registration – SF Select Circle"
        });
        let registration = CircleRegistration::from_message(message.as_object().unwrap());
        assert_eq!(registration.full_name.as_deref(), Some("Ada Organa"));
        assert_eq!(registration.mobile_phone.as_deref(), Some("555-0100"));
        assert_eq!(registration.home_phone, None);
        assert_eq!(registration.work_phone, None);
    }

    #[test]
    fn test_subject_and_body() {
        let registration = CircleRegistration {
            full_name: Some("Ada Organa".into()),
            email: Some("ada@example.org".into()),
            ..Default::default()
        };
        assert_eq!(registration.subject(), "SF Select Circle registration: Ada Organa");
        let body = registration.body();
        assert!(body.contains("Full Name: Ada Organa\n"));
        assert!(body.contains("Email: ada@example.org\n"));
        assert!(body.contains("Work Phone: None\n"));
        assert_eq!(body.lines().count(), 7);
    }

    #[test]
    fn test_mailgun_requires_runtime() {
        let err = MailgunNotifier::new("key".into(), MailgunConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }

    #[tokio::test]
    async fn test_mailgun_messages_url_uses_domain() {
        let config = MailgunConfig {
            domain: "mg.example.org".into(),
            ..Default::default()
        };
        let notifier = MailgunNotifier::new("key".into(), config).unwrap();
        assert_eq!(
            notifier.messages_url(),
            "https://api.mailgun.net/v3/mg.example.org/messages"
        );
    }
}
