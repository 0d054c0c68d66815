//! Per-visitor widget storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::widget::ChatWidget;

/// One visitor's widget. Clones share state.
#[derive(Debug, Clone)]
pub struct Visitor {
    id: String,
    inner: Arc<VisitorInner>,
}

#[derive(Debug)]
struct VisitorInner {
    widget: Mutex<ChatWidget>,
    last_activity: Mutex<Instant>,
}

impl Visitor {
    fn new(id: String) -> Self {
        Self {
            id,
            inner: Arc::new(VisitorInner {
                widget: Mutex::new(ChatWidget::new()),
                last_activity: Mutex::new(Instant::now()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `f` with the widget locked. The lock must not be held across an
    /// `.await`, so `f` is synchronous.
    pub fn with_widget<R>(&self, f: impl FnOnce(&mut ChatWidget) -> R) -> R {
        *self
            .inner
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        let mut widget = self
            .inner
            .widget
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut widget)
    }

    /// Idle visitors with a request in flight are kept until it completes.
    fn is_idle(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let loading = self
            .inner
            .widget
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_loading();
        !loading && last.elapsed() > timeout
    }
}

/// Thread-safe map from visitor id to widget.
#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    visitors: Arc<RwLock<HashMap<String, Visitor>>>,
}

impl WidgetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Visitor> {
        self.visitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Look up a visitor by cookie value, registering a new one (with a new
    /// id) when the value is missing or unknown.
    ///
    /// Returns the visitor and whether it was just created.
    #[must_use]
    pub fn resolve(&self, id: Option<&str>) -> (Visitor, bool) {
        if let Some(visitor) = id.and_then(|id| self.get(id)) {
            return (visitor, false);
        }
        let visitor = Visitor::new(Uuid::new_v4().to_string());
        self.visitors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(visitor.id().to_string(), visitor.clone());
        (visitor, true)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop visitors idle for longer than `timeout`. Returns how many.
    pub fn cleanup_idle(&self, timeout: Duration) -> usize {
        let mut guard = self
            .visitors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, visitor| !visitor.is_idle(timeout));
        before - guard.len()
    }
}
