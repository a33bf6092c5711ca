//! # Observability Collaborator
//!
//! The core accepts a pluggable observer at construction instead of owning
//! a metrics implementation directly; a concrete exporter (Prometheus or
//! otherwise) is an external collaborator wired in by the binary.

use std::time::Duration;

/// Hooks the dispatcher calls around connection and command lifecycle
/// events. Implementations must be cheap and non-blocking: they run
/// inline on the connection task.
pub trait Observer: Send + Sync {
    /// Called after a command finishes, with its uppercased name and the
    /// time spent executing it (parsing and writing excluded).
    fn on_command(&self, name: &str, duration: Duration);

    /// Called when a new connection is accepted.
    fn on_connection_open(&self) {}

    /// Called when a connection's handler loop exits, for any reason.
    fn on_connection_close(&self) {}
}

/// Default observer that does nothing; used when no exporter is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_command(&self, _name: &str, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        commands: AtomicUsize,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl Observer for CountingObserver {
        fn on_command(&self, _name: &str, _duration: Duration) {
            self.commands.fetch_add(1, Ordering::Relaxed);
        }
        fn on_connection_open(&self) {
            self.opens.fetch_add(1, Ordering::Relaxed);
        }
        fn on_connection_close(&self) {
            self.closes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn noop_observer_accepts_all_hooks() {
        let observer = NoopObserver;
        observer.on_command("GET", Duration::from_micros(1));
        observer.on_connection_open();
        observer.on_connection_close();
    }

    #[test]
    fn counting_observer_tracks_calls() {
        let observer = CountingObserver::default();
        observer.on_connection_open();
        observer.on_command("GET", Duration::from_micros(1));
        observer.on_command("SET", Duration::from_micros(1));
        observer.on_connection_close();

        assert_eq!(observer.opens.load(Ordering::Relaxed), 1);
        assert_eq!(observer.commands.load(Ordering::Relaxed), 2);
        assert_eq!(observer.closes.load(Ordering::Relaxed), 1);
    }
}
