//! Per-frame state machines that judge whether the face in view is ready
//! to be captured. Each one owns a slice of the session record and a named
//! reset policy for it.

pub mod anti_spoof_aggregator;
pub mod capture_gate;
pub mod centering_evaluator;
pub mod liveness_stepper;
pub mod stability_tracker;
