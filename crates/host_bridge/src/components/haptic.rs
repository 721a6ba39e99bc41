//! Haptic feedback triggers.

use std::rc::Rc;

use crate::{
    bridge::HostBridge,
    error::BridgeError,
    outbound::{HapticFeedback as Feedback, ImpactStyle, NotificationType, OutboundEvent},
};

/// Lowest host version with haptics.
pub const HAPTIC_MIN_VERSION: &str = "6.1";

#[derive(Debug)]
/// Stateless haptic feedback service.
pub struct HapticFeedback {
    bridge: Rc<HostBridge>,
}

impl HapticFeedback {
    /// Creates the service.
    pub fn new(bridge: Rc<HostBridge>) -> Self {
        Self { bridge }
    }

    /// A collision between interface elements happened.
    pub fn impact_occurred(&self, style: ImpactStyle) -> Result<(), BridgeError> {
        self.trigger(Feedback::Impact {
            impact_style: style,
        })
    }

    /// A task or action succeeded, failed, or produced a warning.
    pub fn notification_occurred(&self, kind: NotificationType) -> Result<(), BridgeError> {
        self.trigger(Feedback::Notification {
            notification_type: kind,
        })
    }

    /// The user changed a selection.
    pub fn selection_changed(&self) -> Result<(), BridgeError> {
        self.trigger(Feedback::SelectionChange)
    }

    fn trigger(&self, feedback: Feedback) -> Result<(), BridgeError> {
        self.bridge.require_version(HAPTIC_MIN_VERSION)?;
        self.bridge
            .post_event(&OutboundEvent::TriggerHapticFeedback(feedback))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::bridge::test_support::bridge_at;

    #[test]
    fn triggers_post_typed_payloads() {
        let (bridge, env) = bridge_at("6.1");
        let haptic = HapticFeedback::new(bridge);

        haptic.impact_occurred(ImpactStyle::Light).expect("impact");
        haptic
            .notification_occurred(NotificationType::Warning)
            .expect("notification");
        haptic.selection_changed().expect("selection");

        let payloads: Vec<_> = env
            .deliveries()
            .into_iter()
            .map(|d| d.frame.payload)
            .collect();
        assert_eq!(
            payloads,
            vec![
                Some(json!({"type": "impact", "impact_style": "light"})),
                Some(json!({"type": "notification", "notification_type": "warning"})),
                Some(json!({"type": "selection_change"})),
            ]
        );
    }

    #[test]
    fn old_hosts_are_rejected() {
        let (bridge, env) = bridge_at("6.0");
        let haptic = HapticFeedback::new(bridge);
        assert!(matches!(
            haptic.selection_changed(),
            Err(BridgeError::Precondition { .. })
        ));
        assert!(env.deliveries().is_empty());
    }
}
