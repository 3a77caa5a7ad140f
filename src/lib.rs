//! `Vigil` - sequence and phase detection engine for game server anti-cheat
//!
//! Domain events from the host server drive per-subject sequences declared
//! by checks. Completed sequences walk their detection's stage cycle: a
//! heuristic weighs the subject's punishment history, a penalty turns the
//! resulting severity into escalating punishments.
//!
//! The [`detection::DetectionManager`] is the context object owning every
//! registry; [`detection::Runtime`] adds thread-safe access and timer-driven
//! expiry.

pub mod capture;
pub mod checks;
pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod event;
pub mod heuristic;
pub mod observability;
pub mod punishment;
pub mod sequence;
pub mod stage;
pub mod time;
