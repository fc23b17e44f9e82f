//! Metrics emission for storage access.
//!
//! Events are recorded through the `metrics` facade. Nothing is exported
//! unless the embedding process installs a recorder.

pub mod events;

/// Emit a metric event.
///
/// Calls [`events::InternalEvent::emit`] on the given event.
///
/// ```ignore
/// emit!(EntriesListed { count: 3, glob: false });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
