//! Metrics and observability infrastructure for plume.
//!
//! - `events`: Internal event types and the `InternalEvent` trait
//! - `server`: Prometheus HTTP server and initialization

pub mod events;
pub mod server;

pub use server::init;

/// Emit an internal event as a Prometheus metric.
///
/// # Example
///
/// ```ignore
/// use plume::metrics::events::RecordAppended;
///
/// emit!(RecordAppended { count: 1 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
