use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::{
    error::Result,
    types::{BoatDetection, LabeledPolygon},
};

/// Coordinate reference advertised on every exported collection.
pub const CRS84: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

fn crs_member() -> JsonObject {
    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_string(),
        json!({ "type": "name", "properties": { "name": CRS84 } }),
    );
    foreign_members
}

/// Wrap labelled polygons in a feature collection, preserving their order.
pub fn to_feature_collection(polygons: &[LabeledPolygon]) -> FeatureCollection {
    let features = polygons
        .iter()
        .map(|polygon| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(&polygon.geometry))),
            id: None,
            properties: Some(polygon.properties.clone()),
            foreign_members: None,
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(crs_member()),
    }
}

/// Encode labelled polygons as a GeoJSON `FeatureCollection` string.
///
/// Coordinates are written as given; no reprojection happens here.
pub fn to_geojson(polygons: &[LabeledPolygon]) -> Result<String> {
    Ok(serde_json::to_string(&to_feature_collection(polygons))?)
}

/// Decode a feature collection back into labelled polygons.
///
/// Features without a geometry are skipped.
pub fn from_geojson(geojson_str: &str) -> Result<Vec<LabeledPolygon>> {
    let collection: FeatureCollection = geojson_str.parse()?;

    let mut polygons = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let geometry = geo_types::Geometry::<f64>::try_from(geometry)?;
        polygons.push(LabeledPolygon {
            geometry,
            properties: feature.properties.unwrap_or_default(),
        });
    }
    Ok(polygons)
}

impl BoatDetection {
    pub fn to_geojson(&self) -> FeatureCollection {
        to_feature_collection(&self.polygons)
    }

    /// Export to GeoJSON and serialize to a pretty-printed string
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson(&self, path: &str) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }
}

/// Load labelled polygons from a GeoJSON file
pub fn load_geojson(path: &str) -> Result<Vec<LabeledPolygon>> {
    let geojson_str = std::fs::read_to_string(path)?;
    from_geojson(&geojson_str)
}
