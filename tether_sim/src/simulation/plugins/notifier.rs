// tether_sim/src/simulation/plugins/notifier.rs

//! User-facing messaging for the headless run: every message, alert and
//! control change is logged and kept in a history for the final report.

use std::collections::HashMap;

use tether_core::scheduling::{DeferredHandle, DeferredQueue};

use crate::prelude::*;

/// What kind of thing the user saw.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    Message,
    Debug,
    /// A scheduled message that came due.
    Scheduled(MessageType),
    Tracking(TrackingQuality),
    Alert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub at: f64,
    pub kind: NotificationKind,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct SimNotifier {
    clock: f64,
    scheduled: DeferredQueue<(MessageType, String)>,
    handles: HashMap<MessageType, DeferredHandle>,
    history: Vec<NotificationRecord>,
    alert: Option<Alert>,
    blurred: bool,
    controls: Option<ControlAvailability>,
    debug_visible: bool,
}

impl SimNotifier {
    pub fn new(debug_visible: bool) -> Self {
        Self {
            debug_visible,
            ..Self::default()
        }
    }

    /// Moves the clock scheduled messages are measured against.
    pub fn set_clock(&mut self, now: f64) {
        self.clock = now;
    }

    pub fn set_debug_visible(&mut self, visible: bool) {
        self.debug_visible = visible;
    }

    /// Shows every scheduled message that is due. Returns how many fired.
    pub fn fire_due(&mut self, now: f64) -> usize {
        self.clock = now;
        let due = self.scheduled.drain_due(now);
        let fired = due.len();
        for (kind, text) in due {
            self.handles.remove(&kind);
            info!("[t={:.2}] {}", now, text.replace('\n', " | "));
            self.record(NotificationKind::Scheduled(kind), text);
        }
        fired
    }

    pub fn history(&self) -> &[NotificationRecord] {
        &self.history
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn is_blurred(&self) -> bool {
        self.blurred
    }

    pub fn controls(&self) -> Option<ControlAvailability> {
        self.controls
    }

    pub fn pending_count(&self) -> usize {
        self.scheduled.len()
    }

    /// Whether a message is currently scheduled under `kind`.
    pub fn is_scheduled(&self, kind: MessageType) -> bool {
        self.handles
            .get(&kind)
            .is_some_and(|handle| self.scheduled.is_pending(*handle))
    }

    fn record(&mut self, kind: NotificationKind, text: impl Into<String>) {
        self.history.push(NotificationRecord {
            at: self.clock,
            kind,
            text: text.into(),
        });
    }
}

impl Notifier for SimNotifier {
    fn show_message(&mut self, text: &str) {
        info!("[t={:.2}] {}", self.clock, text.replace('\n', " | "));
        self.record(NotificationKind::Message, text);
    }

    fn show_debug_message(&mut self, text: &str) {
        if !self.debug_visible {
            return;
        }
        debug!("[t={:.2}] {}", self.clock, text.replace('\n', " | "));
        self.record(NotificationKind::Debug, text);
    }

    fn schedule_message(&mut self, text: &str, delay_secs: f64, kind: MessageType) {
        self.cancel_scheduled_message(kind);
        let handle = self
            .scheduled
            .schedule(self.clock, delay_secs, (kind, text.to_string()));
        self.handles.insert(kind, handle);
    }

    fn cancel_scheduled_message(&mut self, kind: MessageType) {
        if let Some(handle) = self.handles.remove(&kind) {
            self.scheduled.cancel(handle);
        }
    }

    fn cancel_all_scheduled_messages(&mut self) {
        self.scheduled.clear();
        self.handles.clear();
    }

    fn show_tracking_quality(&mut self, quality: TrackingQuality, auto_hide: bool) {
        info!(
            "[t={:.2}] {}{}",
            self.clock,
            quality.presentation_text().replace('\n', " | "),
            if auto_hide { "" } else { " (pinned)" }
        );
        self.record(NotificationKind::Tracking(quality), quality.presentation_text());
    }

    fn show_alert(&mut self, alert: Alert) {
        warn!("[t={:.2}] ALERT '{}': {}", self.clock, alert.title, alert.message);
        self.record(NotificationKind::Alert, alert.title.clone());
        self.alert = Some(alert);
    }

    fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn blur_background(&mut self) {
        self.blurred = true;
    }

    fn unblur_background(&mut self) {
        self.blurred = false;
    }

    fn update_controls(&mut self, controls: ControlAvailability) {
        if self.controls != Some(controls) {
            debug!("Controls: {:?}", controls);
        }
        self.controls = Some(controls);
    }
}
