/*!
 * Monitoring
 * Tracing subscriber setup and timed spans
 */

mod tracer;

pub use tracer::{init_tracing, RunSpan};
