//! Hierarchical grid tiers over a planar projection of the globe.
//!
//! Level `L` divides the projected plane into `2^L x 2^L` equal cells. A
//! point's box id at a level is `row * 2^L + col`, so ids are plain integers
//! that can be indexed as terms and matched with a term set. Every level-`L+1`
//! cell lies inside exactly one level-`L` cell ([`TierBoxId::parent`]).

use std::ops::RangeInclusive;

use crate::geo::BoundingBox;

pub use error::TierError;
use error::Result;

pub const DEFAULT_START_TIER: u8 = 5;
pub const DEFAULT_END_TIER: u8 = 15;
/// Finest level whose box ids still fit comfortably in a `u64`.
pub const MAX_TIER: u8 = 30;
pub const TIER_FIELD_PREFIX: &str = "_tier_";

/// Name of the indexed field holding box ids for `level`.
pub fn tier_field_name(level: u8) -> String {
    format!("{TIER_FIELD_PREFIX}{level}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Projection {
    /// Equal-area: `x = lon * cos(lat)`, `y = lat`.
    #[default]
    Sinusoidal,
    /// `x = lon`, `y = lat`.
    Equirectangular,
}

impl Projection {
    /// Project to planar degrees, `x` in `[-180, 180]` and `y` in `[-90, 90]`.
    pub fn project(self, latitude: f64, longitude: f64) -> (f64, f64) {
        match self {
            Self::Sinusoidal => (longitude * latitude.to_radians().cos(), latitude),
            Self::Equirectangular => (longitude, latitude),
        }
    }

    /// Planar x extent of a lat/lon rectangle.
    ///
    /// For the sinusoidal projection `x` is linear in longitude and monotone in
    /// `|lat|`, so the extremes sit on the corners or on the equator.
    fn x_extent(self, bbox: &BoundingBox) -> (f64, f64) {
        let mut latitudes = vec![bbox.lat_min, bbox.lat_max];
        if bbox.lat_min < 0.0 && bbox.lat_max > 0.0 {
            latitudes.push(0.0);
        }
        let mut extent = (f64::INFINITY, f64::NEG_INFINITY);
        for &lat in &latitudes {
            for lon in [bbox.lon_min, bbox.lon_max] {
                let (x, _) = self.project(lat, lon);
                extent.0 = extent.0.min(x);
                extent.1 = extent.1.max(x);
            }
        }
        extent
    }
}

/// Inclusive range of grid levels that get indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierRange {
    start: u8,
    end: u8,
}

impl Default for TierRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_TIER,
            end: DEFAULT_END_TIER,
        }
    }
}

impl TierRange {
    pub fn new(start: u8, end: u8) -> Result<Self> {
        if start > end || end > MAX_TIER {
            return Err(TierError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> u8 {
        self.start
    }

    pub const fn end(&self) -> u8 {
        self.end
    }

    pub const fn contains(&self, level: u8) -> bool {
        level >= self.start && level <= self.end
    }

    pub const fn levels(&self) -> RangeInclusive<u8> {
        self.start..=self.end
    }

    fn check(&self, level: u8) -> Result<()> {
        if self.contains(level) {
            Ok(())
        } else {
            Err(TierError::LevelOutOfRange {
                level,
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// A cell at one grid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierBoxId {
    pub level: u8,
    pub value: u64,
}

impl TierBoxId {
    const fn cells(level: u8) -> u64 {
        1 << level
    }

    pub const fn row(&self) -> u64 {
        self.value / Self::cells(self.level)
    }

    pub const fn col(&self) -> u64 {
        self.value % Self::cells(self.level)
    }

    /// The enclosing cell one level coarser, `None` at level 0.
    pub const fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        let level = self.level - 1;
        Some(Self {
            level,
            value: (self.row() / 2) * Self::cells(level) + self.col() / 2,
        })
    }
}

fn cell(fraction: f64, cells: u64) -> u64 {
    let scaled = (fraction * cells as f64).floor();
    if scaled > 0.0 {
        (scaled as u64).min(cells - 1)
    } else {
        0
    }
}

fn column_of(x: f64, cells: u64) -> u64 {
    cell((x + 180.0) / 360.0, cells)
}

fn row_of(y: f64, cells: u64) -> u64 {
    cell((y + 90.0) / 180.0, cells)
}

/// Maps points to box ids at every configured level.
///
/// A plain value; two plotters with the same range and projection always
/// agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierPlotter {
    tiers: TierRange,
    projection: Projection,
}

impl TierPlotter {
    pub const fn new(tiers: TierRange, projection: Projection) -> Self {
        Self { tiers, projection }
    }

    pub const fn tiers(&self) -> TierRange {
        self.tiers
    }

    pub const fn projection(&self) -> Projection {
        self.projection
    }

    /// Box id of `(latitude, longitude)` at `level`.
    pub fn box_id(&self, level: u8, latitude: f64, longitude: f64) -> Result<TierBoxId> {
        self.tiers.check(level)?;
        Ok(self.box_id_unchecked(level, latitude, longitude))
    }

    /// Box ids at every configured level, coarsest first.
    pub fn box_ids(&self, latitude: f64, longitude: f64) -> Vec<TierBoxId> {
        self.tiers
            .levels()
            .map(|level| self.box_id_unchecked(level, latitude, longitude))
            .collect()
    }

    fn box_id_unchecked(&self, level: u8, latitude: f64, longitude: f64) -> TierBoxId {
        let (x, y) = self.projection.project(latitude, longitude);
        let cells = TierBoxId::cells(level);
        TierBoxId {
            level,
            value: row_of(y, cells) * cells + column_of(x, cells),
        }
    }

    fn cell_span(&self, level: u8, bbox: &BoundingBox) -> (RangeInclusive<u64>, RangeInclusive<u64>) {
        let cells = TierBoxId::cells(level);
        let (x_min, x_max) = self.projection.x_extent(bbox);
        (
            row_of(bbox.lat_min, cells)..=row_of(bbox.lat_max, cells),
            column_of(x_min, cells)..=column_of(x_max, cells),
        )
    }

    fn span_len(span: &RangeInclusive<u64>) -> usize {
        (span.end() - span.start() + 1) as usize
    }

    /// Number of cells at `level` that a rectangle touches.
    pub fn covering_count(&self, level: u8, bbox: &BoundingBox) -> Result<usize> {
        self.tiers.check(level)?;
        let (rows, cols) = self.cell_span(level, bbox);
        Ok(Self::span_len(&rows).saturating_mul(Self::span_len(&cols)))
    }

    /// Every cell at `level` that a rectangle touches.
    pub fn covering_boxes(&self, level: u8, bbox: &BoundingBox) -> Result<Vec<TierBoxId>> {
        self.tiers.check(level)?;
        let cells = TierBoxId::cells(level);
        let (rows, cols) = self.cell_span(level, bbox);
        Ok(rows
            .flat_map(|row| {
                cols.clone().map(move |col| TierBoxId {
                    level,
                    value: row * cells + col,
                })
            })
            .collect())
    }

    /// Finest level whose cover of `bbox` needs at most `max_boxes` cells.
    ///
    /// Levels are tried coarsest first and the search stops at the first level
    /// that needs too many cells. `None` when even the coarsest level does.
    pub fn best_fit(&self, bbox: &BoundingBox, max_boxes: usize) -> Option<(u8, Vec<TierBoxId>)> {
        let mut best = None;
        for level in self.tiers.levels() {
            let (rows, cols) = self.cell_span(level, bbox);
            if Self::span_len(&rows).saturating_mul(Self::span_len(&cols)) > max_boxes {
                break;
            }
            best = Some(level);
        }
        let level = best?;
        self.covering_boxes(level, bbox).ok().map(|boxes| (level, boxes))
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum TierError {
        #[error("Tier level {level} is outside the configured range {start}..={end}")]
        LevelOutOfRange { level: u8, start: u8, end: u8 },
        #[error("Invalid tier range {start}..={end}")]
        InvalidRange { start: u8, end: u8 },
    }

    pub type Result<T> = std::result::Result<T, TierError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn sample_points() -> Vec<(f64, f64)> {
        let mut points = vec![
            (41.9, 12.5),
            (48.85, 2.35),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (89.999, 179.999),
            (-90.0, -180.0),
            (90.0, 180.0),
        ];
        for lat in (-80..=80).step_by(20) {
            for lon in (-170..=170).step_by(34) {
                points.push((f64::from(lat) + 0.123, f64::from(lon) - 0.456));
            }
        }
        points
    }

    #[test]
    fn test_box_id_is_deterministic() {
        let a = TierPlotter::default();
        let b = TierPlotter::new(TierRange::default(), Projection::Sinusoidal);
        for (lat, lon) in sample_points() {
            assert_eq!(a.box_ids(lat, lon), b.box_ids(lat, lon));
        }
    }

    #[test]
    fn test_finer_cell_lies_in_coarser_cell() {
        for projection in [Projection::Sinusoidal, Projection::Equirectangular] {
            let plotter = TierPlotter::new(TierRange::default(), projection);
            for (lat, lon) in sample_points() {
                let ids = plotter.box_ids(lat, lon);
                for pair in ids.windows(2) {
                    assert_eq!(pair[1].parent(), Some(pair[0]), "at ({lat}, {lon})");
                }
            }
        }
    }

    #[test]
    fn test_level_out_of_range_is_rejected() {
        let plotter = TierPlotter::default();
        assert_eq!(
            plotter.box_id(4, 0.0, 0.0),
            Err(TierError::LevelOutOfRange {
                level: 4,
                start: 5,
                end: 15
            })
        );
        assert!(plotter.box_id(16, 0.0, 0.0).is_err());
        assert!(plotter.box_id(15, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_invalid_range() {
        assert!(TierRange::new(10, 5).is_err());
        assert!(TierRange::new(5, MAX_TIER + 1).is_err());
        assert_eq!(TierRange::new(5, 15), Ok(TierRange::default()));
    }

    #[test]
    fn test_nearby_points_share_coarse_cells_only() {
        let plotter = TierPlotter::default();
        let rome = plotter.box_id(5, 41.9, 12.5).unwrap();
        let tivoli = plotter.box_id(5, 41.96, 12.8).unwrap();
        assert_eq!(rome, tivoli);

        let rome_fine = plotter.box_id(15, 41.9, 12.5).unwrap();
        let tivoli_fine = plotter.box_id(15, 41.96, 12.8).unwrap();
        assert_ne!(rome_fine, tivoli_fine);
    }

    #[test]
    fn test_cover_contains_points_inside_box() {
        let plotter = TierPlotter::default();
        let bbox = BoundingBox::from_corners(GeoPoint::new(-1.0, -2.0), GeoPoint::new(1.5, 2.5));
        for level in [5, 10, 12] {
            let cover = plotter.covering_boxes(level, &bbox).unwrap();
            for (lat, lon) in [(-1.0, -2.0), (1.5, 2.5), (0.0, 0.0), (-0.99, 2.49), (1.49, -1.99)] {
                let id = plotter.box_id(level, lat, lon).unwrap();
                assert!(cover.contains(&id), "level {level} missing ({lat}, {lon})");
            }
            assert_eq!(plotter.covering_count(level, &bbox).unwrap(), cover.len());
        }
    }

    #[test]
    fn test_best_fit_prefers_finer_levels_for_smaller_areas() {
        let plotter = TierPlotter::default();
        let wide = BoundingBox::from_corners(GeoPoint::new(40.0, 10.0), GeoPoint::new(44.0, 15.0));
        let narrow = BoundingBox::from_corners(GeoPoint::new(41.89, 12.49), GeoPoint::new(41.91, 12.51));

        let (wide_level, wide_cover) = plotter.best_fit(&wide, 64).unwrap();
        let (narrow_level, narrow_cover) = plotter.best_fit(&narrow, 64).unwrap();
        assert!(narrow_level > wide_level);
        assert!(wide_cover.len() <= 64);
        assert!(narrow_cover.len() <= 64);
    }

    #[test]
    fn test_best_fit_gives_up_on_huge_areas() {
        let plotter = TierPlotter::default();
        let world = BoundingBox::from_corners(GeoPoint::new(-80.0, -170.0), GeoPoint::new(80.0, 170.0));
        assert!(plotter.best_fit(&world, 64).is_none());
    }

    #[test]
    fn test_field_names_are_distinct() {
        let names: Vec<String> = TierRange::default().levels().map(tier_field_name).collect();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_eq!(names[0], "_tier_5");
    }
}
