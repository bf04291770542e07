//! Optimistic local mirror of a server-side setting.
//!
//! Updates apply locally first and are confirmed or rolled back when the
//! persistence call settles: `Idle → Pending → committed (Idle)` on success,
//! `Pending → reverted (Idle)` on failure.

#[derive(Clone, Debug, PartialEq, Eq)]
enum ToggleState {
    Idle,
    Pending { previous: String },
}

/// One setting value with optimistic update semantics.
#[derive(Clone, Debug)]
pub struct OptimisticSetting {
    key: String,
    value: String,
    state: ToggleState,
}

impl OptimisticSetting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            state: ToggleState::Idle,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The locally visible value, including a not-yet-confirmed one.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ToggleState::Pending { .. })
    }

    /// Apply a new value locally. The previous confirmed value is kept for
    /// rollback; a second update while pending keeps the original baseline.
    pub fn begin_update(&mut self, new_value: impl Into<String>) {
        let new_value = new_value.into();
        if !self.is_pending() {
            self.state = ToggleState::Pending {
                previous: self.value.clone(),
            };
        }
        self.value = new_value;
    }

    /// The persistence call succeeded; the local value is now confirmed.
    pub fn commit(&mut self) {
        self.state = ToggleState::Idle;
    }

    /// The persistence call failed; silently restore the previous value.
    pub fn revert(&mut self) {
        if let ToggleState::Pending { previous } = std::mem::replace(&mut self.state, ToggleState::Idle) {
            self.value = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_confirms_the_new_value() {
        let mut setting = OptimisticSetting::new("PASTE_SECURITY", "true");
        setting.begin_update("false");
        assert_eq!(setting.value(), "false");
        assert!(setting.is_pending());

        setting.commit();
        assert_eq!(setting.value(), "false");
        assert!(!setting.is_pending());
    }

    #[test]
    fn revert_restores_the_previous_value() {
        let mut setting = OptimisticSetting::new("FOCUS_SECURITY", "true");
        setting.begin_update("false");
        setting.revert();
        assert_eq!(setting.value(), "true");
        assert!(!setting.is_pending());
    }

    #[test]
    fn second_update_while_pending_keeps_the_original_baseline() {
        let mut setting = OptimisticSetting::new("SESSION_DURATION_MINUTES", "60");
        setting.begin_update("90");
        setting.begin_update("120");
        setting.revert();
        assert_eq!(setting.value(), "60");
    }

    #[test]
    fn revert_without_pending_update_is_a_no_op() {
        let mut setting = OptimisticSetting::new("PASTE_SECURITY", "true");
        setting.revert();
        assert_eq!(setting.value(), "true");
    }
}
