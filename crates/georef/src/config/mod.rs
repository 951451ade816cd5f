use crate::{
    error::GeoreferenceError,
    index::{DEFAULT_WRITER_MEMORY, IndexSettings},
    search::{
        CoordinateSyntax, DEFAULT_MAX_TIER_BOXES, DecayFunction, DistanceAggregation, IndexScope,
        ScoreCombiner,
    },
    tier::{Projection, TierRange},
};

/// Runtime settings of a [`crate::Georeferencer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoreferenceConfig {
    /// How coordinate text in requests is read.
    pub syntax: CoordinateSyntax,
    /// Maximum number of hits returned per search.
    pub hits_per_page: usize,
    pub tiers: TierRange,
    pub projection: Projection,
    /// Cap on tier boxes per proximity filter before falling back to a scan.
    pub max_tier_boxes: usize,
    pub scoring: ScoreCombiner,
    /// Scope used by the convenience search methods when none is given.
    pub default_scope: IndexScope,
    pub writer_memory_bytes: usize,
}

impl Default for GeoreferenceConfig {
    fn default() -> Self {
        Self {
            syntax: CoordinateSyntax::default(),
            hits_per_page: 20,
            tiers: TierRange::default(),
            projection: Projection::default(),
            max_tier_boxes: DEFAULT_MAX_TIER_BOXES,
            scoring: ScoreCombiner::default(),
            default_scope: IndexScope::default(),
            writer_memory_bytes: DEFAULT_WRITER_MEMORY,
        }
    }
}

impl GeoreferenceConfig {
    pub fn builder() -> GeoreferenceConfigBuilder {
        GeoreferenceConfigBuilder::new()
    }

    /// The part of the configuration an index is built with.
    pub const fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            tiers: self.tiers,
            projection: self.projection,
            writer_memory_bytes: self.writer_memory_bytes,
        }
    }
}

/// Builder for creating georeferencing configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct GeoreferenceConfigBuilder {
    config: GeoreferenceConfig,
}

impl GeoreferenceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GeoreferenceConfig::default(),
        }
    }

    /// Few hits, ranked with a steep linear distance decay.
    pub fn precise() -> Self {
        let mut builder = Self::new();
        builder.config.hits_per_page = 5;
        builder.config.scoring.decay = DecayFunction::Linear;
        builder
    }

    /// Legacy ranking: places must be near every proximity point, and the
    /// historical collection is only consulted when the modern one has no
    /// match.
    pub fn legacy() -> Self {
        let mut builder = Self::new();
        builder.config.scoring = ScoreCombiner::legacy();
        builder.config.default_scope = IndexScope::ModernThenHistorical;
        builder
    }

    pub fn hits_per_page(mut self, hits: usize) -> Self {
        self.config.hits_per_page = hits;
        self
    }

    /// Set the characters separating points and the numbers within a point.
    pub fn separators(
        mut self,
        point: char,
        coordinate: char,
    ) -> Result<Self, GeoreferenceError> {
        if point == coordinate {
            return Err(GeoreferenceError::ConfigError(format!(
                "Point and coordinate separators must differ, both are {point:?}"
            )));
        }
        let numeric = |c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E');
        if numeric(point) || numeric(coordinate) {
            return Err(GeoreferenceError::ConfigError(format!(
                "Separators {point:?} and {coordinate:?} clash with number syntax"
            )));
        }
        self.config.syntax.point_separator = point;
        self.config.syntax.coordinate_separator = coordinate;
        Ok(self)
    }

    /// Radius used for proximity points that give none.
    pub fn default_range_miles(mut self, miles: f64) -> Result<Self, GeoreferenceError> {
        if miles.is_nan() || miles <= 0.0 {
            return Err(GeoreferenceError::ConfigError(format!(
                "Default range must be positive, got {miles}"
            )));
        }
        self.config.syntax.default_range_miles = miles;
        Ok(self)
    }

    /// Grid levels to index, inclusive.
    pub fn tiers(mut self, start: u8, end: u8) -> Result<Self, GeoreferenceError> {
        self.config.tiers = TierRange::new(start, end)?;
        Ok(self)
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.config.projection = projection;
        self
    }

    pub fn max_tier_boxes(mut self, max: usize) -> Self {
        self.config.max_tier_boxes = max.max(1);
        self
    }

    pub fn decay(mut self, decay: DecayFunction) -> Self {
        self.config.scoring.decay = decay;
        self
    }

    pub fn aggregation(mut self, aggregation: DistanceAggregation) -> Self {
        self.config.scoring.aggregation = aggregation;
        self
    }

    /// Enable or disable blending distance into the score
    pub fn distance_scoring(mut self, enabled: bool) -> Self {
        self.config.scoring.enabled = enabled;
        self
    }

    pub fn default_scope(mut self, scope: IndexScope) -> Self {
        self.config.default_scope = scope;
        self
    }

    pub fn writer_memory_bytes(mut self, bytes: usize) -> Self {
        self.config.writer_memory_bytes = bytes;
        self
    }

    pub fn build(self) -> GeoreferenceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder() {
        let config = GeoreferenceConfigBuilder::new().build();
        assert_eq!(config, GeoreferenceConfig::default());
        assert_eq!(config.hits_per_page, 20);
        assert_eq!(config.syntax.point_separator, ';');
        assert_eq!(config.syntax.coordinate_separator, ',');
        assert_eq!(config.syntax.default_range_miles, f64::MAX);
        assert_eq!(config.tiers, TierRange::default());
        assert_eq!(config.default_scope, IndexScope::Both);
        assert!(config.scoring.enabled);
    }

    #[test]
    fn test_presets() {
        let precise = GeoreferenceConfigBuilder::precise().build();
        assert_eq!(precise.hits_per_page, 5);
        assert_eq!(precise.scoring.decay, DecayFunction::Linear);

        let legacy = GeoreferenceConfigBuilder::legacy().build();
        assert_eq!(legacy.scoring.aggregation, DistanceAggregation::LegacySum);
        assert_eq!(legacy.default_scope, IndexScope::ModernThenHistorical);
        assert_eq!(legacy.hits_per_page, 20);
    }

    #[test]
    fn test_override_presets() {
        let config = GeoreferenceConfigBuilder::precise()
            .hits_per_page(50)
            .distance_scoring(false)
            .build();
        assert_eq!(config.hits_per_page, 50);
        assert!(!config.scoring.enabled);
        assert_eq!(config.scoring.decay, DecayFunction::Linear);
    }

    #[test]
    fn test_separator_validation() {
        assert!(GeoreferenceConfigBuilder::new().separators(',', ',').is_err());
        assert!(GeoreferenceConfigBuilder::new().separators('.', ',').is_err());
        // Exponent markers belong to numbers like 4.19e1
        assert!(GeoreferenceConfigBuilder::new().separators(';', 'e').is_err());
        assert!(GeoreferenceConfigBuilder::new().separators('E', ',').is_err());
        let config = GeoreferenceConfigBuilder::new()
            .separators('|', ' ')
            .unwrap()
            .build();
        assert_eq!(config.syntax.point_separator, '|');
        assert_eq!(config.syntax.coordinate_separator, ' ');
    }

    #[test]
    fn test_range_and_tier_validation() {
        assert!(GeoreferenceConfigBuilder::new().default_range_miles(0.0).is_err());
        assert!(GeoreferenceConfigBuilder::new().default_range_miles(f64::NAN).is_err());
        assert!(GeoreferenceConfigBuilder::new().tiers(10, 4).is_err());
        assert!(matches!(
            GeoreferenceConfigBuilder::new().tiers(2, 40),
            Err(GeoreferenceError::TierError(_))
        ));

        let config = GeoreferenceConfigBuilder::new()
            .tiers(3, 12)
            .unwrap()
            .default_range_miles(25.0)
            .unwrap()
            .build();
        assert_eq!(config.tiers.levels(), 3..=12);
        assert_eq!(config.syntax.default_range_miles, 25.0);
    }

    #[test]
    fn test_index_settings_follow_config() {
        let config = GeoreferenceConfigBuilder::new()
            .projection(Projection::Equirectangular)
            .writer_memory_bytes(20_000_000)
            .build();
        let settings = config.index_settings();
        assert_eq!(settings.projection, Projection::Equirectangular);
        assert_eq!(settings.writer_memory_bytes, 20_000_000);
        assert_eq!(settings.tiers, config.tiers);
    }
}
