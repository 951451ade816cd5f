//! Blends text relevance with distance to the proximity centers.

/// Base of the legacy decay `0.99 ^ sqrt(total distance)`.
pub const LEGACY_DECAY_BASE: f64 = 0.99;

/// How a relevance score shrinks with distance.
///
/// Each function leaves the score untouched up to its threshold distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecayFunction {
    /// `score / d` beyond one mile.
    Linear,
    /// `score / sqrt(d)` beyond one mile.
    #[default]
    SquareRoot,
    /// `score / ln(d)` beyond `e` miles.
    Logarithmic,
}

impl DecayFunction {
    pub const fn threshold(self) -> f64 {
        match self {
            Self::Linear | Self::SquareRoot => 1.0,
            Self::Logarithmic => std::f64::consts::E,
        }
    }

    pub fn apply(self, score: f64, distance: f64) -> f64 {
        if distance <= self.threshold() {
            return score;
        }
        match self {
            Self::Linear => score / distance,
            Self::SquareRoot => score / distance.sqrt(),
            Self::Logarithmic => score / distance.ln(),
        }
    }
}

/// Which recorded distance(s) feed the decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceAggregation {
    /// Decay by the distance to the closest center the place is near.
    #[default]
    Nearest,
    /// `score * 0.99 ^ sqrt(sum of distances)`, scoring zero unless the place
    /// is near every center.
    LegacySum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreCombiner {
    pub enabled: bool,
    pub decay: DecayFunction,
    pub aggregation: DistanceAggregation,
}

impl Default for ScoreCombiner {
    fn default() -> Self {
        Self {
            enabled: true,
            decay: DecayFunction::default(),
            aggregation: DistanceAggregation::default(),
        }
    }
}

impl ScoreCombiner {
    /// Pass relevance through unchanged.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            decay: DecayFunction::SquareRoot,
            aggregation: DistanceAggregation::Nearest,
        }
    }

    pub const fn legacy() -> Self {
        Self {
            enabled: true,
            decay: DecayFunction::SquareRoot,
            aggregation: DistanceAggregation::LegacySum,
        }
    }

    /// Final score of a hit from its relevance and per-term distances.
    ///
    /// Without proximity terms the relevance is returned as is.
    pub fn combine(&self, relevance: f64, distances: &[Option<f64>]) -> f64 {
        if !self.enabled || distances.is_empty() {
            return relevance;
        }
        match self.aggregation {
            DistanceAggregation::Nearest => distances
                .iter()
                .flatten()
                .copied()
                .reduce(f64::min)
                .map_or(relevance, |nearest| self.decay.apply(relevance, nearest)),
            DistanceAggregation::LegacySum => {
                let Some(total) = distances.iter().copied().sum::<Option<f64>>() else {
                    return 0.0;
                };
                relevance * LEGACY_DECAY_BASE.powf(total.sqrt())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_leaves_close_places_alone() {
        assert_eq!(DecayFunction::Linear.apply(2.0, 1.0), 2.0);
        assert_eq!(DecayFunction::SquareRoot.apply(2.0, 0.5), 2.0);
        assert_eq!(DecayFunction::Logarithmic.apply(2.0, 2.5), 2.0);
    }

    #[test]
    fn test_decay_functions() {
        assert!((DecayFunction::Linear.apply(1.0, 4.0) - 0.25).abs() < 1e-12);
        assert!((DecayFunction::SquareRoot.apply(1.0, 4.0) - 0.5).abs() < 1e-12);
        let e2 = std::f64::consts::E * std::f64::consts::E;
        assert!((DecayFunction::Logarithmic.apply(1.0, e2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_uses_closest_recorded_distance() {
        let combiner = ScoreCombiner::default();
        let score = combiner.combine(1.0, &[Some(16.0), None, Some(4.0)]);
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_closer_ranks_higher() {
        let combiner = ScoreCombiner::default();
        assert!(combiner.combine(1.0, &[Some(5.0)]) > combiner.combine(1.0, &[Some(50.0)]));
    }

    #[test]
    fn test_legacy_sum() {
        let combiner = ScoreCombiner::legacy();
        assert_eq!(combiner.combine(3.0, &[Some(1.0), None]), 0.0);
        assert_eq!(combiner.combine(3.0, &[Some(0.0)]), 3.0);
        let expected = 2.0 * 0.99_f64.powf(5.0);
        assert!((combiner.combine(2.0, &[Some(9.0), Some(16.0)]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_and_no_terms_pass_through() {
        assert_eq!(ScoreCombiner::disabled().combine(1.7, &[Some(100.0)]), 1.7);
        assert_eq!(ScoreCombiner::default().combine(1.7, &[]), 1.7);
    }
}
