//! Per-component render snapshots.

use rustc_hash::FxHashMap;

/// Remembers the last render text seen per component identity.
///
/// Owned by one post-processor, so its lifetime is the host's.
#[derive(Debug, Default)]
pub struct RenderTracker {
    renders: FxHashMap<String, String>,
}

impl RenderTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `render` as the current render of `id`.
    pub fn register(&mut self, id: &str, render: &str) {
        self.renders.insert(id.to_string(), render.to_string());
    }

    /// Whether `render` differs from the last one recorded for `id`;
    /// records it when it does. Unknown ids count as changed.
    pub fn render_changed(&mut self, id: &str, render: &str) -> bool {
        match self.renders.get_mut(id) {
            Some(previous) if previous == render => false,
            Some(previous) => {
                render.clone_into(previous);
                true
            }
            None => {
                self.register(id, render);
                true
            }
        }
    }

    /// Number of tracked components.
    pub fn len(&self) -> usize {
        self.renders.len()
    }

    /// Whether no component has been recorded.
    pub fn is_empty(&self) -> bool {
        self.renders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_changed() {
        let mut tracker = RenderTracker::new();
        assert!(tracker.render_changed("c1", "render a"));
        assert!(!tracker.render_changed("c1", "render a"));
        assert!(tracker.render_changed("c1", "render b"));
        assert!(!tracker.render_changed("c1", "render b"));
    }

    #[test]
    fn test_register_then_compare() {
        let mut tracker = RenderTracker::new();
        tracker.register("c1", "r");
        tracker.register("c2", "r");
        assert_eq!(tracker.len(), 2);
        assert!(!tracker.render_changed("c2", "r"));
    }
}
