// tether_core/src/tracking.rs

//! Reacts to tracking-quality changes and session lifecycle events.
//!
//! The state machine never talks to the session directly. Anything that needs the
//! session reconfigured or the experience restarted comes back as a
//! [`TrackingAction`] for the engine to carry out, so every effect happens on the
//! same per-frame context.

use tracing::{debug, info, warn};

use crate::abstractions::Notifier;
use crate::config::{
    LIMITED_ESCALATION_SECS, NOT_AVAILABLE_ESCALATION_SECS, RESTART_GRACE_SECS,
    TRACKING_FALLBACK_SECS,
};
use crate::error::SessionError;
use crate::messages::{Alert, AlertAction, MessageType, RunOptions};
use crate::scheduling::{DeferredHandle, DeferredQueue};
use crate::types::{TrackingMode, TrackingQuality};

/// Deferred actions owned by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackingTimer {
    Fallback,
    RestartCooldown,
}

/// Work the state machine hands back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingAction {
    /// Reconfigure and re-run the session in `mode`.
    SwitchMode(TrackingMode),
    /// Re-run the session with its current configuration.
    RestartSession(RunOptions),
    /// Run the full experience restart.
    RestartExperience,
    /// The restart grace period is over.
    RestartAvailable,
}

#[derive(Debug)]
pub struct TrackingStateMachine {
    quality: Option<TrackingQuality>,
    fallback_enabled: bool,
    interrupted: bool,
    restart_enabled: bool,
    timers: DeferredQueue<TrackingTimer>,
    fallback_timer: Option<DeferredHandle>,
    cooldown_timer: Option<DeferredHandle>,
}

impl Default for TrackingStateMachine {
    fn default() -> Self {
        Self {
            quality: None,
            fallback_enabled: false,
            interrupted: false,
            restart_enabled: true,
            timers: DeferredQueue::new(),
            fallback_timer: None,
            cooldown_timer: None,
        }
    }
}

impl TrackingStateMachine {
    pub fn new(fallback_enabled: bool) -> Self {
        Self {
            fallback_enabled,
            ..Self::default()
        }
    }

    pub fn quality(&self) -> Option<TrackingQuality> {
        self.quality
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn restart_enabled(&self) -> bool {
        self.restart_enabled
    }

    pub fn fallback_armed(&self) -> bool {
        self.fallback_timer.is_some()
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Disabling the fallback policy also disarms a pending fallback.
    pub fn set_fallback_enabled(&mut self, enabled: bool) {
        self.fallback_enabled = enabled;
        if !enabled {
            self.cancel_fallback();
        }
    }

    // --- Quality transitions ---

    /// Handles a new tracking-quality reading. Repeated readings of the same
    /// quality are ignored, as is everything while the session is interrupted.
    pub fn on_quality_changed(
        &mut self,
        quality: TrackingQuality,
        now: f64,
        auto_hide: bool,
        notifier: &mut dyn Notifier,
    ) {
        if self.interrupted {
            debug!("Ignoring tracking quality {:?} while interrupted", quality);
            return;
        }
        if self.quality == Some(quality) {
            return;
        }
        let was_limited = self.quality.is_some_and(|q| q.is_limited());
        self.quality = Some(quality);
        notifier.show_tracking_quality(quality, auto_hide);

        match quality {
            TrackingQuality::NotAvailable => {
                self.cancel_fallback();
                notifier.escalate_feedback(quality, NOT_AVAILABLE_ESCALATION_SECS);
            }
            TrackingQuality::Limited(reason) => {
                if self.fallback_enabled {
                    // A change of reason inside Limited keeps the original deadline.
                    if !was_limited || self.fallback_timer.is_none() {
                        self.arm_fallback(now);
                    }
                } else {
                    debug!("Tracking limited ({:?}); escalating in {}s", reason, LIMITED_ESCALATION_SECS);
                    notifier.escalate_feedback(quality, LIMITED_ESCALATION_SECS);
                }
            }
            TrackingQuality::Normal => {
                notifier.cancel_scheduled_message(MessageType::TrackingStateEscalation);
                self.cancel_fallback();
            }
        }
    }

    fn arm_fallback(&mut self, now: f64) {
        self.cancel_fallback();
        self.fallback_timer = Some(self.timers.schedule(now, TRACKING_FALLBACK_SECS, TrackingTimer::Fallback));
        info!("Armed 3DOF fallback timer, due at t = {:.2}s", now + TRACKING_FALLBACK_SECS);
    }

    /// Invalidates the fallback timer, if one is armed.
    pub fn cancel_fallback(&mut self) {
        if let Some(handle) = self.fallback_timer.take() {
            if self.timers.cancel(handle) {
                info!("Cancelled 3DOF fallback timer");
            }
        }
    }

    // --- Lifecycle events ---

    pub fn on_interrupted(&mut self, notifier: &mut dyn Notifier) {
        info!("Tracking session interrupted");
        self.interrupted = true;
        self.cancel_fallback();
        notifier.blur_background();
        notifier.show_alert(Alert {
            title: "Session Interrupted".into(),
            message: "The session will be reset after the interruption has ended.".into(),
            actions: Vec::new(),
        });
    }

    /// The session must now be re-run from scratch, followed by a full restart.
    pub fn on_interruption_ended(&mut self, notifier: &mut dyn Notifier) -> Vec<TrackingAction> {
        info!("Tracking session interruption ended; resetting");
        self.interrupted = false;
        self.quality = None;
        notifier.unblur_background();
        notifier.show_message("RESETTING SESSION");
        vec![
            TrackingAction::RestartSession(RunOptions::full_reset()),
            TrackingAction::RestartExperience,
        ]
    }

    /// Presents a fatal session error. Only recoverable errors offer a reset.
    pub fn on_failure(&mut self, error: &SessionError, notifier: &mut dyn Notifier) {
        let recoverable = error.is_recoverable();
        warn!(
            "Tracking session failed ({:?}, recoverable: {}): {}",
            error.code, recoverable, error
        );
        self.cancel_fallback();
        notifier.blur_background();
        notifier.show_alert(Alert {
            title: "We're sorry!".into(),
            message: error.user_message(),
            actions: if recoverable { vec![AlertAction::Reset] } else { Vec::new() },
        });
    }

    // --- Restart gate ---

    /// Closes the restart gate and starts the grace period. Returns `false` (and
    /// changes nothing) if a restart is already in flight or an object is loading.
    pub fn begin_restart(&mut self, now: f64, object_loading: bool) -> bool {
        if !self.restart_enabled || object_loading {
            debug!(
                "Restart refused (gate open: {}, loading: {})",
                self.restart_enabled, object_loading
            );
            return false;
        }
        self.restart_enabled = false;
        self.quality = None;
        self.cancel_fallback();
        if let Some(handle) = self.cooldown_timer.take() {
            self.timers.cancel(handle);
        }
        self.cooldown_timer = Some(self.timers.schedule(now, RESTART_GRACE_SECS, TrackingTimer::RestartCooldown));
        true
    }

    // --- Timers ---

    /// Fires every timer due at `now`.
    pub fn poll(&mut self, now: f64) -> Vec<TrackingAction> {
        let mut actions = Vec::new();
        for timer in self.timers.drain_due(now) {
            match timer {
                TrackingTimer::Fallback => {
                    self.fallback_timer = None;
                    info!("Tracking limited for {}s; falling back to 3DOF", TRACKING_FALLBACK_SECS);
                    actions.push(TrackingAction::SwitchMode(TrackingMode::ThreeDof));
                }
                TrackingTimer::RestartCooldown => {
                    self.cooldown_timer = None;
                    self.restart_enabled = true;
                    debug!("Restart grace period over");
                    actions.push(TrackingAction::RestartAvailable);
                }
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::mocks::RecordingNotifier;
    use crate::error::SessionErrorCode;
    use crate::types::LimitedReason;

    const LIMITED: TrackingQuality = TrackingQuality::Limited(LimitedReason::ExcessiveMotion);

    fn mode_switches(actions: &[TrackingAction]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, TrackingAction::SwitchMode(_)))
            .count()
    }

    #[test]
    fn recovery_within_nine_seconds_keeps_the_mode() {
        let mut fsm = TrackingStateMachine::new(true);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(TrackingQuality::Normal, 0.0, true, &mut notifier);
        fsm.on_quality_changed(LIMITED, 1.0, true, &mut notifier);
        assert!(fsm.fallback_armed());

        let mut actions = fsm.poll(5.0);
        fsm.on_quality_changed(TrackingQuality::Normal, 9.0, true, &mut notifier);
        assert!(!fsm.fallback_armed());
        actions.extend(fsm.poll(30.0));
        assert_eq!(mode_switches(&actions), 0);
    }

    #[test]
    fn limited_for_ten_seconds_switches_exactly_once() {
        let mut fsm = TrackingStateMachine::new(true);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(TrackingQuality::Normal, 0.0, true, &mut notifier);
        fsm.on_quality_changed(LIMITED, 0.0, true, &mut notifier);

        assert!(fsm.poll(9.99).is_empty());
        let mut actions = fsm.poll(10.0);
        actions.extend(fsm.poll(20.0));
        actions.extend(fsm.poll(60.0));
        assert_eq!(actions, vec![TrackingAction::SwitchMode(TrackingMode::ThreeDof)]);
        assert!(!fsm.fallback_armed());
    }

    #[test]
    fn changing_limited_reason_keeps_the_original_deadline() {
        let mut fsm = TrackingStateMachine::new(true);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(LIMITED, 0.0, true, &mut notifier);
        fsm.on_quality_changed(
            TrackingQuality::Limited(LimitedReason::InsufficientFeatures),
            6.0,
            true,
            &mut notifier,
        );
        assert_eq!(mode_switches(&fsm.poll(10.0)), 1);
    }

    #[test]
    fn without_fallback_limited_escalates_after_ten_seconds() {
        let mut fsm = TrackingStateMachine::new(false);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(LIMITED, 0.0, true, &mut notifier);
        assert!(!fsm.fallback_armed());
        assert_eq!(
            notifier.scheduled,
            vec![(
                LIMITED.escalation_text().to_string(),
                10.0,
                MessageType::TrackingStateEscalation
            )]
        );
        assert!(fsm.poll(100.0).is_empty());
    }

    #[test]
    fn not_available_escalates_after_five_seconds_and_normal_cancels() {
        let mut fsm = TrackingStateMachine::new(true);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(TrackingQuality::NotAvailable, 0.0, false, &mut notifier);
        assert_eq!(notifier.scheduled[0].1, 5.0);
        fsm.on_quality_changed(TrackingQuality::Normal, 1.0, false, &mut notifier);
        assert_eq!(notifier.cancelled, vec![MessageType::TrackingStateEscalation]);
        assert_eq!(
            notifier.qualities,
            vec![TrackingQuality::NotAvailable, TrackingQuality::Normal]
        );
    }

    #[test]
    fn interruption_cancels_fallback_and_ignores_quality() {
        let mut fsm = TrackingStateMachine::new(true);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(LIMITED, 0.0, true, &mut notifier);
        fsm.on_interrupted(&mut notifier);
        assert!(notifier.blurred);
        assert_eq!(notifier.alerts[0].title, "Session Interrupted");
        assert!(!fsm.fallback_armed());

        fsm.on_quality_changed(TrackingQuality::NotAvailable, 1.0, true, &mut notifier);
        assert_eq!(notifier.qualities.len(), 1);
        assert!(fsm.poll(20.0).is_empty());

        let actions = fsm.on_interruption_ended(&mut notifier);
        assert!(!notifier.blurred);
        assert_eq!(
            actions,
            vec![
                TrackingAction::RestartSession(RunOptions::full_reset()),
                TrackingAction::RestartExperience
            ]
        );
        assert_eq!(notifier.messages, vec!["RESETTING SESSION".to_string()]);
    }

    #[test]
    fn failures_offer_reset_only_when_recoverable() {
        let mut fsm = TrackingStateMachine::default();
        let mut notifier = RecordingNotifier::default();
        fsm.on_failure(
            &SessionError::new(SessionErrorCode::WorldTrackingFailed, "Lost."),
            &mut notifier,
        );
        fsm.on_failure(
            &SessionError::new(SessionErrorCode::CameraUnauthorized, "No camera."),
            &mut notifier,
        );
        assert_eq!(notifier.alerts[0].actions, vec![AlertAction::Reset]);
        assert!(notifier.alerts[1].actions.is_empty());
        assert!(notifier.alerts.iter().all(|a| a.title == "We're sorry!"));
    }

    #[test]
    fn restart_gate_reopens_after_grace_period() {
        let mut fsm = TrackingStateMachine::default();
        assert!(!fsm.begin_restart(0.0, true));
        assert!(fsm.restart_enabled());

        assert!(fsm.begin_restart(0.0, false));
        assert!(!fsm.restart_enabled());
        assert!(!fsm.begin_restart(1.0, false));
        assert!(fsm.poll(4.9).is_empty());
        assert_eq!(fsm.poll(5.0), vec![TrackingAction::RestartAvailable]);
        assert!(fsm.restart_enabled());
    }

    #[test]
    fn disabling_fallback_disarms_the_timer() {
        let mut fsm = TrackingStateMachine::new(true);
        let mut notifier = RecordingNotifier::default();
        fsm.on_quality_changed(LIMITED, 0.0, true, &mut notifier);
        fsm.set_fallback_enabled(false);
        assert!(fsm.poll(15.0).is_empty());
    }
}
