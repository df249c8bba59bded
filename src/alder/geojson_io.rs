// GeoJSON in and out for the batch driver.
//
// Lines must be LineString features and points must be Point features; any
// other geometry is reported and left out of the run. Ids come from the
// configured id property and fall back to the feature id, then to the
// feature's position in the collection.

use ahash::AHashMap;
use anyhow::{Context, Result, anyhow};
use cloaca::connectivity::attribute_text;
use cloaca::models::{BatchReport, PointFeature, Segment, SkippedFeature};
use geo_types::Coord;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::path::Path;

pub struct Layer<T> {
    pub features: Vec<T>,
    pub skipped: Vec<SkippedFeature>,
}

pub fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_collection(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_collection(text: &str) -> Result<FeatureCollection> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(anyhow!("expected a FeatureCollection, found a bare geometry")),
    }
}

fn feature_id(feature: &Feature, index: usize, id_field: &str) -> String {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get(id_field))
        .and_then(attribute_text)
        .or_else(|| match &feature.id {
            Some(geojson::feature::Id::String(s)) => Some(s.clone()),
            Some(geojson::feature::Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
        .unwrap_or_else(|| format!("#{}", index))
}

fn attributes(feature: &Feature) -> AHashMap<String, serde_json::Value> {
    feature
        .properties
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Positions missing an axis become NaN so geometry validation rejects them.
fn position_to_coord(position: &[f64]) -> Coord<f64> {
    Coord {
        x: position.first().copied().unwrap_or(f64::NAN),
        y: position.get(1).copied().unwrap_or(f64::NAN),
    }
}

fn geometry_kind(feature: &Feature) -> &'static str {
    match feature.geometry.as_ref().map(|g| &g.value) {
        None => "no geometry",
        Some(Value::Point(_)) => "Point",
        Some(Value::MultiPoint(_)) => "MultiPoint",
        Some(Value::LineString(_)) => "LineString",
        Some(Value::MultiLineString(_)) => "MultiLineString",
        Some(Value::Polygon(_)) => "Polygon",
        Some(Value::MultiPolygon(_)) => "MultiPolygon",
        Some(Value::GeometryCollection(_)) => "GeometryCollection",
    }
}

pub fn load_lines(collection: &FeatureCollection, id_field: &str) -> Layer<Segment> {
    let mut layer = Layer {
        features: Vec::with_capacity(collection.features.len()),
        skipped: Vec::new(),
    };

    for (index, feature) in collection.features.iter().enumerate() {
        let id = feature_id(feature, index, id_field);
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::LineString(positions)) => {
                let vertices = positions.iter().map(|p| position_to_coord(p)).collect();
                layer.features.push(Segment {
                    id,
                    vertices,
                    attributes: attributes(feature),
                });
            }
            _ => layer.skipped.push(SkippedFeature {
                id,
                reason: format!("unsupported line geometry: {}", geometry_kind(feature)),
            }),
        }
    }

    layer
}

pub fn load_points(
    collection: &FeatureCollection,
    id_field: &str,
    category_field: &str,
) -> Layer<PointFeature> {
    let mut layer = Layer {
        features: Vec::with_capacity(collection.features.len()),
        skipped: Vec::new(),
    };

    for (index, feature) in collection.features.iter().enumerate() {
        let id = feature_id(feature, index, id_field);
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(position)) => {
                let coord = position_to_coord(position);
                let category = feature
                    .properties
                    .as_ref()
                    .and_then(|props| props.get(category_field))
                    .and_then(attribute_text);
                layer.features.push(PointFeature {
                    id,
                    x: coord.x,
                    y: coord.y,
                    category,
                    attributes: attributes(feature),
                });
            }
            _ => layer.skipped.push(SkippedFeature {
                id,
                reason: format!("unsupported point geometry: {}", geometry_kind(feature)),
            }),
        }
    }

    layer
}

/// Modified segments as LineStrings, carrying their original properties
/// with the derived fields written over them.
///
/// `lines` is the input handed to the engine; the report lists rows for its
/// valid segments in the same order.
pub fn updated_lines(lines: &[Segment], report: &BatchReport) -> Result<FeatureCollection> {
    let valid = lines.iter().filter(|s| s.validate().is_ok());

    let mut features = Vec::new();
    for (segment, row) in valid.zip(&report.segments) {
        let Some(vertices) = &row.updated_vertices else {
            continue;
        };

        let mut properties: JsonObject = segment
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let serde_json::Value::Object(derived) = serde_json::to_value(row)? {
            for (k, v) in derived {
                if k != "updated_vertices" {
                    properties.insert(k, v);
                }
            }
        }

        let positions = vertices.iter().map(|c| vec![c.x, c.y]).collect();
        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(positions))),
            id: Some(geojson::feature::Id::String(row.segment_id.clone())),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
