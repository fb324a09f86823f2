// Boundary identifiers from TopoJSON topologies and GeoJSON feature collections.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::returns::*;

pub fn read_boundary_features(
    path: &str,
    object: Option<&str>,
) -> BReturnsResult<Vec<BoundaryFeature>> {
    info!("Attempting to read boundaries {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    Ok(parse_boundary_features(&contents, object, path)?)
}

/// Decodes the features of a boundary file.
///
/// For a topology, `object` names the layer to read. When it is not given,
/// every layer is read.
pub fn parse_boundary_features(
    contents: &str,
    object: Option<&str>,
    path: &str,
) -> ReturnsResult<Vec<BoundaryFeature>> {
    let bf: BoundaryFile = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    let geometries: Vec<Geometry> = match bf {
        BoundaryFile::Topology(topo) => {
            let mut objects = topo.objects;
            match object {
                Some(name) => objects
                    .remove(name)
                    .context(MissingTopologyObjectSnafu { name, path })?
                    .geometries
                    .unwrap_or_default(),
                None => objects
                    .into_values()
                    .flat_map(|gc| gc.geometries.unwrap_or_default())
                    .collect(),
            }
        }
        BoundaryFile::Features(fc) => fc.features,
    };

    let mut res: Vec<BoundaryFeature> = Vec::new();
    let mut missing_ids = 0;
    for g in geometries.into_iter() {
        match g.feature_id() {
            Some(id) => res.push(BoundaryFeature {
                id,
                name: g.feature_name(),
            }),
            None => missing_ids += 1,
        }
    }
    if missing_ids > 0 {
        warn!("{}: {} features without an identifier", path, missing_ids);
    }
    debug!("parse_boundary_features: {} features", res.len());
    Ok(res)
}

#[derive(Debug, Clone, Deserialize)]
struct FeatureProperties {
    name: Option<String>,
    #[serde(rename = "NAME")]
    upper_name: Option<String>,
    #[serde(rename = "GEOID")]
    geoid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Geometry {
    id: Option<JSValue>,
    properties: Option<FeatureProperties>,
}

impl Geometry {
    fn feature_id(&self) -> Option<String> {
        match &self.id {
            Some(JSValue::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(JSValue::Number(n)) => n.as_u64().map(|x| x.to_string()),
            _ => self.properties.as_ref().and_then(|p| p.geoid.clone()),
        }
    }

    fn feature_name(&self) -> Option<String> {
        let p = self.properties.as_ref()?;
        p.name.clone().or_else(|| p.upper_name.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GeometryCollection {
    geometries: Option<Vec<Geometry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Topology {
    objects: BTreeMap<String, GeometryCollection>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeatureCollection {
    features: Vec<Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoundaryFile {
    Topology(Topology),
    Features(FeatureCollection),
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "objects": {
            "counties": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "id": "13211", "arcs": [[0]], "properties": {"name": "Morgan"}},
                {"type": "Polygon", "id": 1001, "arcs": [[1]], "properties": {"name": "Autauga"}},
                {"type": "Polygon", "arcs": [[2]]}
            ]},
            "states": {"type": "GeometryCollection", "geometries": [
                {"type": "MultiPolygon", "id": "13", "arcs": [], "properties": {"name": "Georgia"}}
            ]}
        },
        "arcs": []
    }"#;

    #[test]
    fn topology_layers() {
        let counties = parse_boundary_features(TOPOLOGY, Some("counties"), "us.json").unwrap();
        assert_eq!(counties.len(), 2);
        assert_eq!(counties[0].id, "13211");
        assert_eq!(counties[0].name.as_deref(), Some("Morgan"));
        assert_eq!(counties[1].county_fips(), "01001");

        let states = parse_boundary_features(TOPOLOGY, Some("states"), "us.json").unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].state_fips(), "13");

        let all = parse_boundary_features(TOPOLOGY, None, "us.json").unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn missing_layer() {
        let e = parse_boundary_features(TOPOLOGY, Some("nation"), "us.json").unwrap_err();
        assert!(matches!(e, ReturnsError::MissingTopologyObject { .. }));
    }

    #[test]
    fn geojson_features() {
        let js = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"GEOID": "02013", "NAME": "Aleutians East"}, "geometry": null}
            ]
        }"#;
        let features = parse_boundary_features(js, Some("counties"), "ak.geojson").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "02013");
        assert_eq!(features[0].name.as_deref(), Some("Aleutians East"));
    }
}
