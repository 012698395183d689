//! Asynchronous, severity-routed hand-off from producers to sinks.

mod dispatcher;
mod level;
mod sink;

pub use dispatcher::{DispatchRecord, DispatchState, Dispatcher, DEFAULT_QUEUE_CAPACITY};
pub use level::Level;
pub use sink::{MemorySink, Sink, SinkTable};
