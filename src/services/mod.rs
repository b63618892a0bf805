pub mod ensemble;
pub mod filters;
pub mod providers;

pub use ensemble::{produce_recommendations, EnsembleError};
