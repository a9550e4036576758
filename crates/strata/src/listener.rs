//! Sinks for definition errors and lint warnings.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{DefinitionError, Warning};

/// Receives problems that do not abort the current call.
///
/// Definition calls report through this trait and continue; so does the lint
/// pass that runs after a render.
pub trait ErrorListener {
    fn definition_error(&self, error: &DefinitionError);

    fn warning(&self, warning: &Warning);
}

/// Forwards everything to `tracing`. This is the engine default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ErrorListener for TracingListener {
    fn definition_error(&self, error: &DefinitionError) {
        tracing::error!(%error, "template definition error");
    }

    fn warning(&self, warning: &Warning) {
        tracing::warn!(%warning, "template lint warning");
    }
}

#[derive(Debug, Default)]
struct Collected {
    errors: Vec<DefinitionError>,
    warnings: Vec<Warning>,
}

/// Collects reports in memory. Clones share the same buffer, so keep one
/// handle and give the other to the engine.
///
/// ```
/// use strata::{Engine, ErrorBuffer, TemplateDef};
///
/// let errors = ErrorBuffer::new();
/// let mut engine = Engine::new().with_listener(errors.clone());
/// let group = engine.define_group("g");
/// engine.define_template(group, TemplateDef::new("t", vec![]));
/// engine.define_template(group, TemplateDef::new("t", vec![]));
/// assert_eq!(errors.errors().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ErrorBuffer {
    inner: Rc<RefCell<Collected>>,
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<DefinitionError> {
        self.inner.borrow().errors.clone()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.inner.borrow().warnings.clone()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.borrow();
        inner.errors.is_empty() && inner.warnings.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.errors.clear();
        inner.warnings.clear();
    }
}

impl ErrorListener for ErrorBuffer {
    fn definition_error(&self, error: &DefinitionError) {
        self.inner.borrow_mut().errors.push(error.clone());
    }

    fn warning(&self, warning: &Warning) {
        self.inner.borrow_mut().warnings.push(warning.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_clones_share_state() {
        let buffer = ErrorBuffer::new();
        let handle = buffer.clone();
        assert!(handle.is_empty());

        buffer.definition_error(&DefinitionError::UnknownRegion {
            template: "a".into(),
            region: "r".into(),
        });
        buffer.warning(&Warning::UnusedAttribute {
            template: "a".into(),
            attribute: "x".into(),
        });

        assert_eq!(handle.errors().len(), 1);
        assert_eq!(handle.warnings().len(), 1);

        handle.clear();
        assert!(buffer.is_empty());
    }
}
