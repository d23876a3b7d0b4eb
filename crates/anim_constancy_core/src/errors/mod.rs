mod analysis_error;

pub use analysis_error::*;
