//! Generic scanner components: the constant sensor and the stock aggregators.

use std::sync::Arc;

use crate::models::{Log, Scanner, State, Status};

// ─── SensorConstant ───────────────────────────────────────────────────────────

/// Sensor that returns a fixed status. The workhorse leaf: instrumentors
/// measure once at instrument time and bake the result in.
#[derive(Debug, Clone)]
pub struct SensorConstant {
    name: String,
    val: Status,
}

impl SensorConstant {
    pub fn new(name: impl Into<String>, val: Status) -> Self {
        Self {
            name: name.into(),
            val,
        }
    }

    pub fn passing(name: impl Into<String>, messages: Vec<Log>) -> Self {
        Self::new(name, Status::new(State::Passing, messages))
    }

    pub fn failing(name: impl Into<String>, messages: Vec<Log>) -> Self {
        Self::new(name, Status::new(State::Failing, messages))
    }

    pub fn unknown(name: impl Into<String>, messages: Vec<Log>) -> Self {
        Self::new(name, Status::new(State::Unknown, messages))
    }
}

impl Scanner for SensorConstant {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        self.val.clone()
    }

    fn children(&self) -> Vec<Arc<dyn Scanner>> {
        Vec::new()
    }
}

// ─── SystemAll / SystemAny ────────────────────────────────────────────────────

/// System that is PASSING only if all of its scanners are PASSING.
#[derive(Debug)]
pub struct SystemAll {
    name: String,
    scanners: Vec<Arc<dyn Scanner>>,
}

impl SystemAll {
    pub fn new(name: impl Into<String>, scanners: Vec<Arc<dyn Scanner>>) -> Self {
        Self {
            name: name.into(),
            scanners,
        }
    }
}

impl Scanner for SystemAll {
    fn name(&self) -> &str {
        &self.name
    }

    /// Child messages are not copied up; they stay addressable through
    /// `children()` and the visualiser walks for them.
    fn status(&self) -> Status {
        Status::from_state(State::all(self.scanners.iter().map(|s| s.status().state)))
    }

    fn children(&self) -> Vec<Arc<dyn Scanner>> {
        self.scanners.clone()
    }
}

/// System that is PASSING if any of its scanners is PASSING.
#[derive(Debug)]
pub struct SystemAny {
    name: String,
    scanners: Vec<Arc<dyn Scanner>>,
}

impl SystemAny {
    pub fn new(name: impl Into<String>, scanners: Vec<Arc<dyn Scanner>>) -> Self {
        Self {
            name: name.into(),
            scanners,
        }
    }
}

impl Scanner for SystemAny {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        Status::from_state(State::any(self.scanners.iter().map(|s| s.status().state)))
    }

    fn children(&self) -> Vec<Arc<dyn Scanner>> {
        self.scanners.clone()
    }
}

// ─── ServiceBasic ─────────────────────────────────────────────────────────────

/// A capability wrapping exactly one system: status delegates to the system,
/// which is also the only child.
#[derive(Debug)]
pub struct ServiceBasic {
    name: String,
    system: Arc<dyn Scanner>,
}

impl ServiceBasic {
    pub fn new(name: impl Into<String>, system: Arc<dyn Scanner>) -> Self {
        Self {
            name: name.into(),
            system,
        }
    }
}

impl Scanner for ServiceBasic {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        self.system.status()
    }

    fn children(&self) -> Vec<Arc<dyn Scanner>> {
        vec![self.system.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn leaf(name: &str, state: State) -> Arc<dyn Scanner> {
        Arc::new(SensorConstant::new(name, Status::from_state(state)))
    }

    #[test]
    fn system_all_requires_every_child_passing() {
        let all = SystemAll::new(
            "all",
            vec![leaf("a", State::Passing), leaf("b", State::Passing)],
        );
        assert_eq!(all.status().state, State::Passing);

        let mixed = SystemAll::new(
            "all",
            vec![leaf("a", State::Passing), leaf("b", State::Failing)],
        );
        assert_eq!(mixed.status().state, State::Failing);
    }

    #[test]
    fn system_any_needs_one_passing_child() {
        let any = SystemAny::new(
            "any",
            vec![leaf("a", State::Failing), leaf("b", State::Passing)],
        );
        assert_eq!(any.status().state, State::Passing);

        let none = SystemAny::new(
            "any",
            vec![leaf("a", State::Failing), leaf("b", State::Failing)],
        );
        assert_eq!(none.status().state, State::Failing);
    }

    #[test]
    fn empty_system_all_is_passing() {
        assert_eq!(SystemAll::new("all", vec![]).status().state, State::Passing);
    }

    #[test]
    fn empty_system_any_is_failing() {
        assert_eq!(SystemAny::new("any", vec![]).status().state, State::Failing);
    }

    #[test]
    fn aggregators_do_not_copy_child_messages() {
        let noisy = Arc::new(SensorConstant::passing(
            "noisy",
            vec![Log::new("something happened", Severity::Warn)],
        ));
        let all = SystemAll::new("all", vec![noisy]);
        assert!(all.status().messages.is_empty());
    }

    #[test]
    fn service_basic_delegates_to_its_system() {
        let system: Arc<dyn Scanner> =
            Arc::new(SystemAll::new("sys", vec![leaf("a", State::Failing)]));
        let service = ServiceBasic::new("svc", system.clone());
        assert_eq!(service.status().state, State::Failing);
        let children = service.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "sys");
    }

    #[test]
    fn sensor_constant_returns_its_value_verbatim() {
        let status = Status::new(
            State::Unknown,
            vec![Log::new("who knows", Severity::Info)],
        );
        let sensor = SensorConstant::new("s", status.clone());
        assert_eq!(sensor.status(), status);
        assert!(sensor.children().is_empty());
    }
}
