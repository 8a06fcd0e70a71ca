use std::collections::HashMap;

use crate::hooks::events::{EventSeverity, HookKind, LifecycleEvent};

pub type HookFn = Box<dyn FnMut(&LifecycleEvent)>;

struct HookEntry {
    callback: HookFn,
    once: bool,
}

/// Named-hook registry: register under a [`HookKind`], trigger with a
/// [`LifecycleEvent`], unregister by name. Every trigger is also logged, so
/// lifecycle moments show up in diagnostics even with no hooks registered.
#[derive(Default)]
pub struct Hooks {
    handlers: HashMap<HookKind, Vec<HookEntry>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook that fires on every trigger of `kind`.
    pub fn on(&mut self, kind: HookKind, callback: impl FnMut(&LifecycleEvent) + 'static) {
        self.handlers.entry(kind).or_default().push(HookEntry {
            callback: Box::new(callback),
            once: false,
        });
    }

    /// Register a hook that fires on the next trigger of `kind`, then drops.
    pub fn once(&mut self, kind: HookKind, callback: impl FnMut(&LifecycleEvent) + 'static) {
        self.handlers.entry(kind).or_default().push(HookEntry {
            callback: Box::new(callback),
            once: true,
        });
    }

    /// Unregister every hook under `kind`.
    pub fn off(&mut self, kind: HookKind) {
        self.handlers.remove(&kind);
    }

    /// Dispatch `event` synchronously to every hook registered under its kind.
    pub fn trigger(&mut self, event: &LifecycleEvent) {
        match event.severity() {
            EventSeverity::Info => {
                tracing::debug!(event = event.event_type(), "lifecycle event")
            }
            EventSeverity::Warning => {
                tracing::warn!(event = event.event_type(), "lifecycle event")
            }
            EventSeverity::Error => {
                tracing::error!(event = event.event_type(), "lifecycle event")
            }
        }
        if let Some(entries) = self.handlers.get_mut(&event.kind()) {
            for entry in entries.iter_mut() {
                (entry.callback)(event);
            }
            entries.retain(|entry| !entry.once);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }
}
