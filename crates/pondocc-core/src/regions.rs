use geo::{Contains, Geometry, MultiPolygon, Point};
use geojson::{Feature, GeoJson};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_NAME_PROPERTY: &str = "EDP";

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("failed to parse boundary GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("boundary GeoJSON must be a Feature or FeatureCollection")]
    NotFeatures,
    #[error("boundary feature {index} has no '{property}' name")]
    MissingName { index: usize, property: String },
    #[error("boundary '{name}' has no geometry")]
    MissingGeometry { name: String },
    #[error("boundary '{name}' is not a Polygon or MultiPolygon")]
    UnsupportedGeometry { name: String },
}

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub area: MultiPolygon<f64>,
}

/// Named regional boundaries in WGS84 longitude/latitude.
#[derive(Debug, Clone, Default)]
pub struct RegionBoundaries {
    regions: Vec<Region>,
}

impl RegionBoundaries {
    /// Loads a FeatureCollection, naming each region from `name_property`.
    pub fn from_geojson(text: &str, name_property: &str) -> Result<Self, RegionError> {
        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => return Err(RegionError::NotFeatures),
        };

        let regions = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| region_from_feature(index, feature, name_property))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { regions })
    }

    /// Name of the first region strictly containing the point; points on a
    /// boundary line are not inside any region.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Option<&str> {
        let point = Point::new(longitude, latitude);
        self.regions
            .iter()
            .find(|region| region.area.contains(&point))
            .map(|region| region.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn region_from_feature(
    index: usize,
    feature: Feature,
    name_property: &str,
) -> Result<Region, RegionError> {
    let name = match feature.property(name_property) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => {
            return Err(RegionError::MissingName {
                index,
                property: name_property.to_string(),
            })
        }
    };

    let geometry = feature
        .geometry
        .ok_or_else(|| RegionError::MissingGeometry { name: name.clone() })?;

    let area = match Geometry::<f64>::try_from(geometry.value)? {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        Geometry::MultiPolygon(multi) => multi,
        _ => return Err(RegionError::UnsupportedGeometry { name }),
    };

    Ok(Region { name, area })
}
