//! # cvsync Common Library
//!
//! Shared code for the cvsync webhook receiver:
//! - Session and speaker record schemas
//! - Speaker category classification
//! - File-backed record store with change detection
//! - Event reconciliation against the store
//! - Registration notifications
//! - Static page generation
//! - Configuration loading

pub mod category;
pub mod config;
pub mod error;
pub mod notify;
pub mod pages;
pub mod reconcile;
pub mod records;
pub mod store;

pub use category::{classify, SpeakerCategory};
pub use error::{Error, Result};
pub use reconcile::{reconcile, EventEnvelope, EventKind};
pub use records::{SessionData, SpeakerData};
pub use store::{RecordStore, Session, Speaker};
