use serde::{Deserialize, Serialize};

/// What the analysis knows about a blend weight in the 0.0–1.0 range, applied
/// to a whole layer or sub-branch.
///
/// Created once from static layer configuration, then merged with facts
/// discovered while scanning weight-control behaviors. Immutable once
/// composition proceeds past the scanning phase for that layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeightState {
    /// No fact recorded yet. Merge identity.
    #[default]
    NotChanged,
    AlwaysZero,
    AlwaysOne,
    EitherZeroOrOne,
    Variable,
}

impl WeightState {
    /// Classify a literal weight by exact comparison to 0 and 1.
    pub fn from_literal(weight: f32) -> Self {
        if weight == 0.0 {
            WeightState::AlwaysZero
        } else if weight == 1.0 {
            WeightState::AlwaysOne
        } else {
            WeightState::Variable
        }
    }

    /// Fact contributed by a weight-control behavior. A nonzero blend duration
    /// means the weight passes through intermediate values on the way to its
    /// goal.
    pub fn from_weight_control(goal_weight: f32, blend_duration: f32) -> Self {
        if blend_duration != 0.0 {
            WeightState::Variable
        } else {
            Self::from_literal(goal_weight)
        }
    }

    /// Commutative, idempotent merge of two weight facts.
    pub fn merged(self, other: WeightState) -> WeightState {
        use WeightState::*;
        match (self, other) {
            (NotChanged, x) | (x, NotChanged) => x,
            (Variable, _) | (_, Variable) => Variable,
            (AlwaysZero, AlwaysZero) => AlwaysZero,
            (AlwaysOne, AlwaysOne) => AlwaysOne,
            (AlwaysZero, AlwaysOne) | (AlwaysOne, AlwaysZero) => EitherZeroOrOne,
            (EitherZeroOrOne, _) | (_, EitherZeroOrOne) => EitherZeroOrOne,
        }
    }
}
