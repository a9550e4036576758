use crate::engine::InstanceId;
use crate::error::{RenderError, Result};

/// Stack of instances currently being rendered.
///
/// Entering an instance that is already on the stack, or going deeper than
/// `max_depth`, fails with [`RenderError::InfiniteRecursion`]. Template names
/// are only recorded in lint mode, so outside it the error carries no trace.
#[derive(Debug)]
pub(crate) struct RecursionGuard {
    stack: Vec<(InstanceId, String)>,
    lint: bool,
    max_depth: usize,
}

impl RecursionGuard {
    pub(crate) fn new(lint: bool, max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            lint,
            max_depth,
        }
    }

    pub(crate) fn enter(&mut self, id: InstanceId, template: &str) -> Result<()> {
        let cyclic = self.stack.iter().any(|(active, _)| *active == id);
        if cyclic || self.stack.len() >= self.max_depth {
            let trace = if self.lint {
                self.stack
                    .iter()
                    .map(|(_, name)| name.clone())
                    .chain(std::iter::once(template.to_string()))
                    .collect()
            } else {
                Vec::new()
            };
            tracing::debug!(template, depth = self.stack.len(), cyclic, "recursion guard tripped");
            return Err(RenderError::InfiniteRecursion { trace });
        }
        let name = if self.lint {
            template.to_string()
        } else {
            String::new()
        };
        self.stack.push((id, name));
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_cycle_with_trace() {
        let mut guard = RecursionGuard::new(true, 100);
        guard.enter(InstanceId(0), "a").unwrap();
        guard.enter(InstanceId(1), "b").unwrap();
        let err = guard.enter(InstanceId(0), "a").unwrap_err();
        assert_eq!(
            err,
            RenderError::InfiniteRecursion {
                trace: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_same_template_distinct_instances_allowed() {
        let mut guard = RecursionGuard::new(true, 100);
        guard.enter(InstanceId(0), "block").unwrap();
        guard.enter(InstanceId(1), "block").unwrap();
        assert_eq!(guard.depth(), 2);
        guard.exit();
        guard.exit();
        assert_eq!(guard.depth(), 0);
        guard.enter(InstanceId(0), "block").unwrap();
    }

    #[test]
    fn test_no_trace_without_lint() {
        let mut guard = RecursionGuard::new(false, 100);
        guard.enter(InstanceId(0), "a").unwrap();
        let err = guard.enter(InstanceId(0), "a").unwrap_err();
        assert_eq!(err, RenderError::InfiniteRecursion { trace: vec![] });
    }

    #[test]
    fn test_depth_bound() {
        let mut guard = RecursionGuard::new(false, 3);
        for i in 0..3 {
            guard.enter(InstanceId(i), "t").unwrap();
        }
        assert!(matches!(
            guard.enter(InstanceId(3), "t"),
            Err(RenderError::InfiniteRecursion { .. })
        ));
    }
}
