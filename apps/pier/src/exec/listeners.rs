use std::fmt;

type Disposer = Box<dyn FnOnce() + Send>;

/// Owns one registered listener. The disposer runs exactly once, either
/// through `dispose` or when the guard is dropped.
pub struct ListenerGuard {
    name: &'static str,
    disposer: Option<Disposer>,
}

impl ListenerGuard {
    pub fn new<F>(name: &'static str, disposer: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name,
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.disposer.is_some()
    }

    /// Returns `false` if the guard was already disposed.
    pub fn dispose(&mut self) -> bool {
        match self.disposer.take() {
            Some(disposer) => {
                tracing::trace!(target: "pier::exec", listener = self.name, "disposing listener");
                disposer();
                true
            }
            None => false,
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ListenerSet {
    guards: Vec<ListenerGuard>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, guard: ListenerGuard) {
        self.guards.push(guard);
    }

    pub fn register<F>(&mut self, name: &'static str, disposer: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(ListenerGuard::new(name, disposer));
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Disposes every guard in registration order and empties the set.
    /// Returns how many disposers actually ran.
    pub fn dispose_all(&mut self) -> usize {
        self.guards
            .drain(..)
            .map(|mut guard| guard.dispose())
            .filter(|ran| *ran)
            .count()
    }
}
