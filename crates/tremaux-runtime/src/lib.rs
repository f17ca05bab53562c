//! `tremaux-runtime` – The navigation engine
//!
//! Drives the vehicle through the maze by alternating corridor traversal and
//! Tremaux intersection handling, on top of `tremaux-hal` for the hardware
//! and `tremaux-kernel` for the marking and decision rules.
//!
//! # Modules
//!
//! - [`vehicle`] – [`Vehicle`][vehicle::Vehicle]: the injected
//!   [`DigitalPort`][tremaux_hal::DigitalPort] together with the sensor and
//!   actuator gateways.
//! - [`corridor`] – [`traverse`][corridor::traverse]: drive forward and
//!   sample the sensors until a wall ahead, a new side opening, or the exit.
//! - [`intersection`] – [`handle`][intersection::handle]: sense, decide,
//!   turn, then commit the visit marks and the new pose as one transaction.
//! - [`progress_guard`] – [`ProgressGuard`][progress_guard::ProgressGuard]:
//!   aborts a run that keeps turning without moving.
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: the
//!   initialise, demonstrate, navigate cycle with cooperative stop.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console,
//!   log-file and OTLP tracing layers.

pub mod control_loop;
pub mod corridor;
pub mod intersection;
pub mod progress_guard;
pub mod telemetry;
pub mod vehicle;

pub use control_loop::{ControlLoop, ControlLoopConfig, RunSummary};
pub use corridor::{CorridorConfig, CorridorOutcome, CorridorReport};
pub use intersection::IntersectionReport;
pub use progress_guard::ProgressGuard;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use vehicle::Vehicle;
