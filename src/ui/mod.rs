//! egui rendering of the dashboard. Reads [`crate::state::AppState`] and
//! routes every widget change back through its mutation methods.

pub mod panels;
pub mod plot;
