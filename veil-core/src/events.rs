//! Installation events.
//!
//! The engine never prints on its own; it emits [`InstallEvent`]s through an
//! [`EventSink`] chosen by the host.

use std::cell::RefCell;

use serde::Serialize;

use crate::error::{ErrorInfo, VeilError};
use crate::profile::ProfileCorrection;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InstallEvent {
    /// An override is in place.
    Applied { key: String },
    /// The surface is missing or already wrapped; it stays native.
    Skipped { key: String, reason: String },
    /// The override could not be installed; the surface stays native.
    Failed { key: String, error: ErrorInfo },
    /// The context was installed before; nothing was changed.
    AlreadyInstalled,
    /// A profile field was dropped or adjusted before installation.
    ProfileCorrected { field: String, reason: String },
}

impl InstallEvent {
    pub fn applied(key: impl ToString) -> Self {
        InstallEvent::Applied { key: key.to_string() }
    }

    /// Classify an error: benign errors skip, the rest fail.
    pub fn from_error(key: impl ToString, err: &VeilError) -> Self {
        if err.is_benign() {
            InstallEvent::Skipped {
                key: key.to_string(),
                reason: err.to_string(),
            }
        } else {
            InstallEvent::Failed {
                key: key.to_string(),
                error: ErrorInfo::from(err),
            }
        }
    }
}

impl From<&ProfileCorrection> for InstallEvent {
    fn from(correction: &ProfileCorrection) -> Self {
        InstallEvent::ProfileCorrected {
            field: correction.field.to_string(),
            reason: correction.reason.clone(),
        }
    }
}

/// Observability hook.
pub trait EventSink {
    fn emit(&self, event: &InstallEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &InstallEvent) {
        match event {
            InstallEvent::Applied { key } => log::debug!("override applied: {}", key),
            InstallEvent::Skipped { key, reason } => log::info!("override skipped: {} ({})", key, reason),
            InstallEvent::Failed { key, error } => {
                log::warn!("override failed: {} ({})", key, error.message)
            }
            InstallEvent::AlreadyInstalled => log::info!("overrides already installed, nothing to do"),
            InstallEvent::ProfileCorrected { field, reason } => {
                log::warn!("profile field {} corrected: {}", field, reason)
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<InstallEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InstallEvent> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<InstallEvent> {
        self.events.take()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &InstallEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Summary of one installer run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub corrections: Vec<String>,
    pub already_installed: bool,
}

impl InstallReport {
    pub fn record(&mut self, event: &InstallEvent) {
        match event {
            InstallEvent::Applied { key } => self.applied.push(key.clone()),
            InstallEvent::Skipped { key, .. } => self.skipped.push(key.clone()),
            InstallEvent::Failed { key, .. } => self.failed.push(key.clone()),
            InstallEvent::AlreadyInstalled => self.already_installed = true,
            InstallEvent::ProfileCorrected { field, .. } => self.corrections.push(field.clone()),
        }
    }

    pub fn is_applied(&self, key: &str) -> bool {
        self.applied.iter().any(|k| k == key)
    }
}

/// Sends every event to a sink and folds it into a report.
pub struct EventLog<'a> {
    sink: &'a dyn EventSink,
    report: InstallReport,
}

impl<'a> EventLog<'a> {
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self {
            sink,
            report: InstallReport::default(),
        }
    }

    pub fn emit(&mut self, event: InstallEvent) {
        self.sink.emit(&event);
        self.report.record(&event);
    }

    pub fn applied(&mut self, key: impl ToString) {
        self.emit(InstallEvent::applied(key));
    }

    pub fn error(&mut self, key: impl ToString, err: &VeilError) {
        self.emit(InstallEvent::from_error(key, err));
    }

    pub fn finish(self) -> InstallReport {
        self.report
    }
}
