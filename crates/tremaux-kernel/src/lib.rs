//! `tremaux-kernel` – Navigation rules
//!
//! The pure, hardware-free part of the maze solver.  Nothing in this crate
//! performs I/O; it records where the vehicle has been and decides where it
//! should go next.
//!
//! # Modules
//!
//! - [`grid`] – [`VisitGrid`][grid::VisitGrid]: bounded 2-D visit counters,
//!   one per maze cell, incremented every time the vehicle crosses the cell.
//! - [`decision`] – [`decide`][decision::decide]: the Tremaux tie-break rule
//!   mapping the visit counts around the current cell to a
//!   [`TurnCommand`][tremaux_types::TurnCommand].

pub mod decision;
pub mod grid;

pub use decision::decide;
pub use grid::VisitGrid;
