//! collatz-sim-core: Cycle-level model of a Collatz record search pipeline
//!
//! This library models, one clock tick at a time, a small search machine that:
//! - Waits on a serial link for the start byte `A`
//! - Runs the Collatz trajectory of every trial value 1, 2, 3, ... with
//!   fixed-width value and step counters
//! - Reports each new longest trajectory, and every trial that overflowed or
//!   ran out of step budget, as ASCII text on the link
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `queue`: Bounded FIFO with lock-step commit, used between all stages
//! - `widths`: Validated value and step-counter widths
//! - `trajectory`: One-step-per-tick Collatz engine with overflow detection
//! - `search`: Record search controller and report sequencing
//! - `command`: Packed command records between controller and encoder
//! - `digits` / `decimal`: Division-free decimal rendering
//! - `encoder`: Protocol encoder turning commands into ASCII bytes
//! - `transport` / `link`: Simulated serial transport and its pumps
//! - `pipeline`: Wires the stages together and ticks them
//! - `report`: Host-side decoder for the emitted text
//! - `metrics`: Observable system behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Bounded memory**: Every queue and the trace arena have fixed sizes
//! - **Backpressure**: Inside the pipeline a full queue stalls its producer
//! - **Deterministic**: Seeded randomness makes runs reproducible

pub mod command;
pub mod decimal;
pub mod digits;
pub mod encoder;
pub mod error;
pub mod link;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod search;
pub mod trajectory;
pub mod transport;
pub mod widths;

// Re-export commonly used types
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig};
pub use widths::Widths;
