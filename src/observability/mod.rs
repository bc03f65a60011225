pub mod metrics;
pub mod noop;
pub mod ports;
pub mod tracing_sink;

pub use noop::NoopObservability;
pub use ports::{LogLevel, ObservabilitySink};
pub use tracing_sink::TracingObservability;
