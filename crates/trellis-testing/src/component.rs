use std::sync::Arc;

use trellis_core::Component;

/// Component whose rendered output is fully described by its name.
///
/// Two instances with the same name are equivalent but not identical, which
/// is what tests need to tell identity and equivalence checks apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestComponent {
    name: String,
}

impl TestComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn shared(name: impl Into<String>) -> Arc<dyn Component> {
        Arc::new(Self::new(name))
    }
}

impl Component for TestComponent {
    fn simple_name(&self) -> &str {
        &self.name
    }

    fn is_equivalent_to(&self, other: &dyn Component) -> bool {
        self.name == other.simple_name()
    }
}
