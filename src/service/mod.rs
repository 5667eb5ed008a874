//! The work-assignment and time-tracking engine.

pub mod aggregator;
pub mod assignment_manager;
pub mod events;
pub mod selector;
pub mod time_tracker;

#[cfg(test)]
pub(crate) mod fakes;
