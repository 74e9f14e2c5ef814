//! How a simulated entity reacts to `turn_on` / `turn_off`.

use serde::Deserialize;

/// Reaction of a simulated entity to a dispatched call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchBehaviour {
    /// Apply the call right away and fire `state_changed`.
    #[default]
    Apply,
    /// Accept the call but only apply it on
    /// [`InMemoryHost::apply_pending`](crate::InMemoryHost::apply_pending).
    Defer,
    /// Reject the call with the given reason.
    Fail(String),
    /// Accept the call and never apply it.
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        behaviour: DispatchBehaviour,
    }

    #[test]
    fn should_deserialize_unit_behaviours_from_snake_case() {
        let w: Wrapper = serde_json::from_str(r#"{"behaviour":"defer"}"#).unwrap();
        assert_eq!(w.behaviour, DispatchBehaviour::Defer);
    }

    #[test]
    fn should_deserialize_failure_with_reason() {
        let w: Wrapper = serde_json::from_str(r#"{"behaviour":{"fail":"offline"}}"#).unwrap();
        assert_eq!(w.behaviour, DispatchBehaviour::Fail("offline".to_string()));
    }
}
