//! Mask Composer (spec §4.4): applies a matched clause's effect to the
//! running mask and reports what the who-clause walk should do next.

use crate::privilege::{AccessMask, ControlVerdict, MaskEffect};

/// Apply `effect` to `running` and return the new mask alongside the
/// clause's control verdict, unchanged (spec §4.4: CONTINUE/BREAK/STOP
/// are interpreted by the caller, not here).
pub fn compose(running: AccessMask, effect: MaskEffect, verdict: ControlVerdict) -> (AccessMask, ControlVerdict) {
    (effect.apply(running), verdict)
}

/// The result of exhausting a rule's clause list without a BREAK or
/// STOP: the mask is cleared (implicit "by * none") and evaluation
/// stops (spec §4.4).
pub fn exhausted() -> (AccessMask, ControlVerdict) {
    (AccessMask::empty(), ControlVerdict::Stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privilege::Privilege;

    #[test]
    fn additive_effect_unions_into_running_mask() {
        let running = Privilege::Auth.cumulative_bits();
        let (mask, verdict) = compose(
            running,
            MaskEffect::Additive(AccessMask::READ),
            ControlVerdict::Continue,
        );
        assert!(mask.contains(AccessMask::READ));
        assert_eq!(verdict, ControlVerdict::Continue);
    }

    #[test]
    fn exhausted_clears_mask_and_stops() {
        let (mask, verdict) = exhausted();
        assert!(mask.is_empty());
        assert_eq!(verdict, ControlVerdict::Stop);
    }
}
