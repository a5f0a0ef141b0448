// tether_core/src/focus.rs

use nalgebra::Point3;

use crate::abstractions::Notifier;
use crate::config::FOCUS_HINT_SECS;
use crate::hit_test::WorldHit;
use crate::messages::MessageType;
use crate::types::AnchorId;

/// The crosshair that follows the screen centre. Its last resolved position is
/// where a freshly loaded object appears.
#[derive(Debug, Clone, Default)]
pub struct FocusSquare {
    last_position: Option<Point3<f64>>,
    last_anchor: Option<AnchorId>,
    hint_pending: bool,
}

impl FocusSquare {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the focus square and schedules the "move around" hint.
    pub fn setup(&mut self, notifier: &mut dyn Notifier) {
        *self = Self::default();
        self.hint_pending = true;
        notifier.schedule_message("TRY MOVING LEFT OR RIGHT", FOCUS_HINT_SECS, MessageType::FocusSquare);
    }

    pub fn update(&mut self, hit: &WorldHit, notifier: &mut dyn Notifier) {
        self.last_position = Some(hit.position);
        self.last_anchor = hit.anchor;
        if self.hint_pending {
            self.hint_pending = false;
            notifier.cancel_scheduled_message(MessageType::FocusSquare);
        }
    }

    pub fn last_position(&self) -> Option<Point3<f64>> {
        self.last_position
    }

    pub fn last_anchor(&self) -> Option<AnchorId> {
        self.last_anchor
    }
}
