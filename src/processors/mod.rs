//! Data processing modules.

pub mod trial;

pub use trial::{read_trial, read_trial_with_config};
