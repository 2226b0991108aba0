//! Typed notifications published by every handle.
//!
//! Operations already return their result, so subscribing is optional. A
//! [`Notifier`] is useful when one observer should see everything a handle tree
//! does, since child handles inherit their parent's notifier.
use dyn_clone::DynClone;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum CouchEvent {
    Error { message: String },
    Info { response: Value },
    FetchAll { response: Value },
    Opened { response: Value },
    Saved { response: Value },
    Deleted { response: Value },
    Data { response: Value },
    Replicated { response: Value },
    Created { response: Value },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CouchEventKind {
    Error,
    Info,
    FetchAll,
    Opened,
    Saved,
    Deleted,
    Data,
    Replicated,
    Created,
}

impl CouchEvent {
    pub fn kind(&self) -> CouchEventKind {
        match self {
            CouchEvent::Error { .. } => CouchEventKind::Error,
            CouchEvent::Info { .. } => CouchEventKind::Info,
            CouchEvent::FetchAll { .. } => CouchEventKind::FetchAll,
            CouchEvent::Opened { .. } => CouchEventKind::Opened,
            CouchEvent::Saved { .. } => CouchEventKind::Saved,
            CouchEvent::Deleted { .. } => CouchEventKind::Deleted,
            CouchEvent::Data { .. } => CouchEventKind::Data,
            CouchEvent::Replicated { .. } => CouchEventKind::Replicated,
            CouchEvent::Created { .. } => CouchEventKind::Created,
        }
    }

    /// The decoded response carried by a success notification.
    pub fn response(&self) -> Option<&Value> {
        match self {
            CouchEvent::Error { .. } => None,
            CouchEvent::Info { response }
            | CouchEvent::FetchAll { response }
            | CouchEvent::Opened { response }
            | CouchEvent::Saved { response }
            | CouchEvent::Deleted { response }
            | CouchEvent::Data { response }
            | CouchEvent::Replicated { response }
            | CouchEvent::Created { response } => Some(response),
        }
    }
}

pub trait EventHandler: DynClone + Send + Sync {
    fn handle(&self, event: &CouchEvent);
}

dyn_clone::clone_trait_object!(EventHandler);

impl<F> EventHandler for F
where
    F: Fn(&CouchEvent) + Clone + Send + Sync,
{
    fn handle(&self, event: &CouchEvent) {
        self(event)
    }
}

/// Delivers [`CouchEvent`]s to subscribed handlers.
///
/// By default every `Error` event is also logged with `tracing::error!`. Turn that
/// off with [`Notifier::set_default_error_log`] when a subscriber reports errors itself.
#[derive(Clone)]
pub struct Notifier {
    default_error_log: bool,
    handlers: Vec<(Option<CouchEventKind>, Box<dyn EventHandler>)>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            default_error_log: true,
            handlers: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("default_error_log", &self.default_error_log)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Notifier {
    /// Subscribes a handler to every event.
    pub fn subscribe(&mut self, handler: impl EventHandler + 'static) {
        self.handlers.push((None, Box::new(handler)));
    }

    /// Subscribes a handler to one kind of event.
    pub fn on(&mut self, kind: CouchEventKind, handler: impl EventHandler + 'static) {
        self.handlers.push((Some(kind), Box::new(handler)));
    }

    pub fn set_default_error_log(&mut self, enabled: bool) {
        self.default_error_log = enabled;
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub(crate) fn notify(&self, event: CouchEvent) {
        if let CouchEvent::Error { message } = &event {
            if self.default_error_log {
                tracing::error!("{}", message);
            }
        }

        let kind = event.kind();
        for (filter, handler) in &self.handlers {
            if filter.map(|k| k == kind).unwrap_or(true) {
                handler.handle(&event);
            }
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.notify(CouchEvent::Error {
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    #[test]
    fn on_only_receives_matching_kind() {
        // Arrange
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut notifier = Notifier::default();
        notifier.on(CouchEventKind::Saved, move |event: &CouchEvent| {
            sink.lock().unwrap().push(event.kind());
        });

        // Act
        notifier.notify(CouchEvent::Info {
            response: json!({}),
        });
        notifier.notify(CouchEvent::Saved {
            response: json!({"ok": true}),
        });
        notifier.error("boom");

        // Assert
        assert_eq!(*seen.lock().unwrap(), vec![CouchEventKind::Saved]);
    }

    #[test]
    fn cloned_notifier_keeps_handlers() {
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        let mut notifier = Notifier::default();
        notifier.set_default_error_log(false);
        notifier.subscribe(move |_: &CouchEvent| *sink.lock().unwrap() += 1);

        let copy = notifier.clone();
        notifier.error("first");
        copy.error("second");

        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn response_is_none_for_errors() {
        let error = CouchEvent::Error {
            message: "nope".into(),
        };
        let data = CouchEvent::Data {
            response: json!({"rows": []}),
        };

        assert!(error.response().is_none());
        assert_eq!(data.response(), Some(&json!({"rows": []})));
    }
}
