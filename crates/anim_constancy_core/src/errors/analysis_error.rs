use thiserror::Error;

use crate::weight_state::WeightState;

/// Internal-consistency violations that abort the current analysis.
///
/// Missing inputs (no motion, no curve, no controller, unknown clip or
/// registry type) are never errors; they classify as "no data". Silent
/// approximation of the cases below would risk destructive optimizations
/// downstream, so they reject instead.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("layer weight {0:?} must be fully resolved before it is applied to a property map")]
    UnresolvedLayerWeight(WeightState),
    #[error("layer {layer} is synced to layer {target}, which does not exist")]
    SyncedLayerOutOfBounds { layer: usize, target: usize },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
