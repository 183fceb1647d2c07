//! Confidence tube fitting and the fitted tube artifact

pub mod builder;
pub(crate) mod interp;
pub mod model;

pub use builder::TubeBuilder;
pub use model::{ConfidenceTube, TubeBand};
