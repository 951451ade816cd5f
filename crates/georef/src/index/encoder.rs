use tantivy::TantivyDocument;

use super::{IndexError, PlaceFields, Result};
use crate::geo::GeoPoint;
use crate::tier::{TierBoxId, TierPlotter, tier_field_name};

/// Separator between entries of a multi-valued alternate name column.
pub const ALT_NAME_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierField {
    pub name: String,
    pub box_id: TierBoxId,
}

/// The spatial part of a place document.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFields {
    pub latitude: f64,
    pub longitude: f64,
    /// One entry per configured level, coarsest first.
    pub tiers: Vec<TierField>,
}

/// Turns a coordinate into the exact-value and tier fields of a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialFieldEncoder {
    plotter: TierPlotter,
}

impl SpatialFieldEncoder {
    pub const fn new(plotter: TierPlotter) -> Self {
        Self { plotter }
    }

    pub fn encode(&self, latitude: f64, longitude: f64) -> SpatialFields {
        let tiers = self
            .plotter
            .box_ids(latitude, longitude)
            .into_iter()
            .map(|box_id| TierField {
                name: tier_field_name(box_id.level),
                box_id,
            })
            .collect();
        SpatialFields {
            latitude,
            longitude,
            tiers,
        }
    }
}

/// One gazetteer entry as it is written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord {
    pub record_id: u64,
    pub name: String,
    pub alt_name_1: Option<String>,
    pub alt_name_2: Option<String>,
    pub location: GeoPoint,
    pub spatial: SpatialFields,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

impl PlaceRecord {
    pub fn new(
        record_id: u64,
        name: &str,
        alt_name_1: Option<&str>,
        alt_name_2: Option<&str>,
        location: GeoPoint,
        encoder: &SpatialFieldEncoder,
    ) -> Self {
        Self {
            record_id,
            name: name.to_string(),
            alt_name_1: non_empty(alt_name_1),
            alt_name_2: non_empty(alt_name_2),
            location,
            spatial: encoder.encode(location.lat, location.lon),
        }
    }

    pub fn to_document(&self, fields: &PlaceFields) -> Result<TantivyDocument> {
        let mut doc = TantivyDocument::default();
        doc.add_u64(fields.record_id, self.record_id);
        doc.add_text(fields.name, &self.name);
        for (field, value) in [
            (fields.alt_name_1, &self.alt_name_1),
            (fields.alt_name_2, &self.alt_name_2),
        ] {
            let Some(value) = value else { continue };
            for alt in value
                .split(ALT_NAME_SEPARATOR)
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
            {
                doc.add_text(field, alt);
            }
        }
        doc.add_f64(fields.latitude, self.spatial.latitude);
        doc.add_f64(fields.longitude, self.spatial.longitude);
        for tier in &self.spatial.tiers {
            let field = fields
                .tier(tier.box_id.level)
                .ok_or_else(|| IndexError::MissingField(tier.name.clone()))?;
            doc.add_u64(field, tier.box_id.value);
        }
        Ok(doc)
    }
}
