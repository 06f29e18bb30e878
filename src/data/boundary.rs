use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use geo::{BoundingRect, Coord, Geometry, MultiPolygon, Polygon, Rect};
use geojson::{GeoJson, Value};
use serde_json::Value as JsonValue;

use super::error::{AtlasError, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Property names that carry the administrative code and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryKeys {
    pub code: String,
    pub name: String,
}

impl Default for BoundaryKeys {
    fn default() -> Self {
        Self {
            code: "cod_comuna".to_string(),
            name: "Comuna".to_string(),
        }
    }
}

/// One commune polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Administrative code as text; matches `commune_id.to_string()`.
    pub code: String,
    pub name: String,
    /// Every areal part with its holes, in lon/lat. Empty when the feature
    /// carries no polygon.
    pub shape: MultiPolygon<f64>,
}

// ---------------------------------------------------------------------------
// BoundarySet – parsed features plus the code → name lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    pub features: Vec<BoundaryFeature>,
    names: HashMap<String, String>,
}

impl BoundarySet {
    /// Build the lookup once from the whole collection. When two features
    /// share a code the later one's name is kept.
    pub fn from_features(features: Vec<BoundaryFeature>) -> Self {
        let mut names = HashMap::with_capacity(features.len());
        for feature in &features {
            if let Some(previous) = names.insert(feature.code.clone(), feature.name.clone()) {
                log::warn!(
                    "Duplicate boundary code {}: '{}' replaces '{}'",
                    feature.code,
                    feature.name,
                    previous
                );
            }
        }
        Self { features, names }
    }

    /// Display name for an administrative code. Unmatched codes are normal.
    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Extent of every polygon, `None` when there is no geometry at all.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.shape.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}

// ---------------------------------------------------------------------------
// GeoJSON loader
// ---------------------------------------------------------------------------

/// Load a GeoJSON `FeatureCollection` of commune polygons.
///
/// Every feature must carry both `keys.code` and `keys.name` in its
/// properties; a feature without geometry is kept for the name lookup only.
pub fn load_boundaries(path: &Path, keys: &BoundaryKeys) -> Result<BoundarySet> {
    let file = File::open(path).map_err(|e| {
        log::error!("Boundary file {} unavailable: {e}", path.display());
        AtlasError::BoundaryUnavailable {
            path: path.to_path_buf(),
        }
    })?;

    match read_features(BufReader::new(file), keys) {
        Ok(features) => {
            let set = BoundarySet::from_features(features);
            if set.is_empty() {
                log::warn!("{} holds no boundary features", path.display());
            }
            log::info!(
                "Loaded {} boundary features ({} distinct codes) from {}",
                set.len(),
                set.names.len(),
                path.display()
            );
            Ok(set)
        }
        Err(e) => {
            log::error!("Failed to parse {}: {e:#}", path.display());
            Err(AtlasError::BoundaryCorrupt {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })
        }
    }
}

fn read_features(
    reader: impl std::io::Read,
    keys: &BoundaryKeys,
) -> anyhow::Result<Vec<BoundaryFeature>> {
    let geojson = GeoJson::from_reader(reader).context("parsing GeoJSON")?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(_) => bail!("Expected a FeatureCollection, found a single Feature"),
        GeoJson::Geometry(_) => bail!("Expected a FeatureCollection, found a bare Geometry"),
    };

    collection
        .features
        .iter()
        .enumerate()
        .map(|(i, feature)| -> anyhow::Result<BoundaryFeature> {
            let property = |key: &str| {
                feature
                    .property(key)
                    .map(property_text)
                    .with_context(|| format!("Feature {i}: missing property '{key}'"))
            };
            let code = property(&keys.code)?;
            let name = property(&keys.name)?;
            let mut parts = Vec::new();
            if let Some(geometry) = &feature.geometry {
                if has_short_position(&geometry.value) {
                    bail!("Feature {i}: position with fewer than two coordinates");
                }
                let geometry = Geometry::<f64>::try_from(&geometry.value)
                    .with_context(|| format!("Feature {i}: converting geometry"))?;
                collect_polygons(geometry, &mut parts);
            }
            Ok(BoundaryFeature {
                code,
                name,
                shape: MultiPolygon::new(parts),
            })
        })
        .collect()
}

/// Codes are often numeric in the source file; join keys are compared as text.
fn property_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The `geo-types` conversion indexes `[0]` and `[1]` of every position.
fn has_short_position(value: &Value) -> bool {
    let short = |position: &Vec<f64>| position.len() < 2;
    match value {
        Value::Point(position) => short(position),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            positions.iter().any(short)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().any(short)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().any(short),
        Value::GeometryCollection(members) => {
            members.iter().any(|member| has_short_position(&member.value))
        }
    }
}

fn collect_polygons(geometry: Geometry<f64>, parts: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(polygon) => parts.push(polygon),
        Geometry::MultiPolygon(multi) => parts.extend(multi.0),
        Geometry::GeometryCollection(members) => {
            for member in members.0 {
                collect_polygons(member, parts);
            }
        }
        Geometry::Rect(rect) => parts.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => parts.push(triangle.to_polygon()),
        // Points and lines have no area to fill.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMUNES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature",
         "properties": {"cod_comuna": 1, "Comuna": "Xville"},
         "geometry": {"type": "Polygon",
                      "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]],
                                      [[0.2,0.2],[0.8,0.2],[0.8,0.8],[0.2,0.2]]]}},
        {"type": "Feature",
         "properties": {"cod_comuna": "3", "Comuna": "Zeta"},
         "geometry": {"type": "MultiPolygon",
                      "coordinates": [[[[2,2],[3,2],[3,3],[2,2]]],
                                      [[[4,-1],[5,-1],[5,0],[4,-1]]]]}},
        {"type": "Feature",
         "properties": {"cod_comuna": 1, "Comuna": "Xtown"},
         "geometry": null}
      ]
    }"#;

    fn load(text: &str) -> Result<BoundarySet> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comunas.geojson");
        std::fs::write(&path, text).unwrap();
        load_boundaries(&path, &BoundaryKeys::default())
    }

    #[test]
    fn builds_code_to_name_lookup() {
        let set = load(COMMUNES).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.name_for("3"), Some("Zeta"));
        assert_eq!(set.name_for("2"), None);
    }

    #[test]
    fn duplicate_codes_keep_last_name() {
        let set = load(COMMUNES).unwrap();
        assert_eq!(set.name_for("1"), Some("Xtown"));
    }

    #[test]
    fn geometries_become_multipolygons() {
        let set = load(COMMUNES).unwrap();
        assert_eq!(set.features[0].shape.0.len(), 1);
        assert_eq!(set.features[0].shape.0[0].interiors().len(), 1);
        assert_eq!(set.features[1].shape.0.len(), 2);
        assert!(set.features[2].shape.0.is_empty());
    }

    #[test]
    fn bounds_cover_every_polygon() {
        let set = load(COMMUNES).unwrap();
        assert_eq!(
            set.bounds(),
            Some(Rect::new(
                Coord { x: 0.0, y: -1.0 },
                Coord { x: 5.0, y: 3.0 }
            ))
        );
        assert_eq!(BoundarySet::default().bounds(), None);
    }

    #[test]
    fn collections_keep_only_areal_members() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"cod_comuna": 4, "Comuna": "Mixed"},
             "geometry": {"type": "GeometryCollection", "geometries": [
                {"type": "Point", "coordinates": [9, 9]},
                {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,0]]]}]}}]}"#;
        let set = load(text).unwrap();
        assert_eq!(set.features[0].shape.0.len(), 1);
    }

    #[test]
    fn short_position_is_corrupt() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"cod_comuna": 5, "Comuna": "Bad"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1],[1,1],[0,0]]]}}]}"#;
        match load(text).unwrap_err() {
            AtlasError::BoundaryCorrupt { reason, .. } => {
                assert!(reason.contains("fewer than two coordinates"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_boundaries(&dir.path().join("none.geojson"), &BoundaryKeys::default())
            .unwrap_err();
        assert!(matches!(err, AtlasError::BoundaryUnavailable { .. }));
    }

    #[test]
    fn missing_property_is_corrupt() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"cod_comuna": 7}, "geometry": null}]}"#;
        match load(text).unwrap_err() {
            AtlasError::BoundaryCorrupt { reason, .. } => assert!(reason.contains("Comuna")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_json_is_corrupt() {
        assert!(matches!(
            load("{ not geojson").unwrap_err(),
            AtlasError::BoundaryCorrupt { .. }
        ));
    }

    #[test]
    fn empty_collection_loads() {
        let set = load(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.bounds(), None);
    }
}
