//! Reconciliation between boundary-topology identifiers and election-data
//! storage keys.
//!
//! The two sources agree on most counties up to formatting (leading zeros,
//! 3- vs 5-digit codes). The exceptions live in [`GeographyTables`], a
//! versioned data file shipped with the crate: the Alaska district to
//! borough table and the per-state correction table.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::*;

pub const ALASKA: &str = "ALASKA";
pub const RHODE_ISLAND: &str = "RHODE ISLAND";

const EMBEDDED_TABLES: &str = include_str!("../data/geography_tables.json");

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    pub fips: String,
    pub name: String,
    pub postal: String,
}

/// A topology id known to differ from the election-data id of the same county.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct KeyCorrection {
    pub state: String,
    /// Years the correction applies to. Empty means every year.
    #[serde(default)]
    pub years: Vec<u32>,
    #[serde(rename = "topologyId")]
    pub topology_id: String,
    #[serde(rename = "electionId")]
    pub election_id: String,
    pub note: Option<String>,
}

impl KeyCorrection {
    fn applies(&self, year: u32, state: &str, topology_id: &str) -> bool {
        self.state == state
            && self.topology_id == topology_id
            && (self.years.is_empty() || self.years.contains(&year))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GeographyTables {
    pub version: String,
    pub states: Vec<StateEntry>,
    /// Election district id -> borough FIPS.
    #[serde(rename = "alaskaDistricts")]
    pub alaska_districts: BTreeMap<String, String>,
    #[serde(default)]
    pub corrections: Vec<KeyCorrection>,
}

impl GeographyTables {
    /// The tables compiled into the crate.
    pub fn embedded() -> Result<GeographyTables, TallyErrors> {
        GeographyTables::from_json(EMBEDDED_TABLES)
    }

    pub fn from_json(contents: &str) -> Result<GeographyTables, TallyErrors> {
        let tables: GeographyTables = serde_json::from_str(contents)
            .map_err(|e| TallyErrors::MalformedTables(e.to_string()))?;
        tables.validate()?;
        info!(
            "Loaded geography tables version {}: {} states, {} Alaska districts, {} corrections",
            tables.version,
            tables.states.len(),
            tables.alaska_districts.len(),
            tables.corrections.len()
        );
        Ok(tables)
    }

    fn validate(&self) -> Result<(), TallyErrors> {
        for s in self.states.iter() {
            if s.fips.len() != 2 || !is_numeric_id(&s.fips) {
                return Err(TallyErrors::InvalidTables(format!(
                    "state {} has an invalid FIPS code {:?}",
                    s.name, s.fips
                )));
            }
        }
        // Two districts under one borough would make storage keys collide.
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        for (district, borough) in self.alaska_districts.iter() {
            if !seen.insert(borough) {
                return Err(TallyErrors::InvalidTables(format!(
                    "borough {} is mapped from more than one district (last: {})",
                    borough, district
                )));
            }
        }
        Ok(())
    }

    pub fn state_name(&self, fips: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.fips == fips)
            .map(|s| s.name.as_str())
    }

    pub fn state_fips(&self, name: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.name == name || s.postal == name)
            .map(|s| s.fips.as_str())
    }

    /// The key under which a county of the election data is stored.
    ///
    /// Alaska reports by election district, which is remapped to the borough
    /// the district is filed under. Districts missing from the table have no
    /// storage key.
    pub fn storage_key(&self, state: &str, county_key: &str) -> Option<String> {
        if state != ALASKA {
            return Some(county_key.to_string());
        }
        // District ids first: some padded districts read like borough codes.
        let district = self.alaska_districts.get(county_key).or_else(|| {
            self.alaska_districts
                .get(county_key.trim_start_matches('0'))
        });
        if let Some(borough) = district {
            return Some(borough.clone());
        }
        if self.alaska_districts.values().any(|b| b == county_key) {
            return Some(county_key.to_string());
        }
        None
    }

    /// Applies the correction table to a (padded) topology id.
    pub fn correct_topology_id(&self, year: u32, state: &str, topology_id: &str) -> String {
        match self
            .corrections
            .iter()
            .find(|c| c.applies(year, state, topology_id))
        {
            Some(c) => {
                debug!(
                    "correct_topology_id: {} {} {} -> {}",
                    year, state, topology_id, c.election_id
                );
                c.election_id.clone()
            }
            None => topology_id.to_string(),
        }
    }
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Zero-pads a numeric county id to the 5-digit topology form.
pub fn pad_topology_id(id: &str) -> String {
    let id = id.trim();
    if is_numeric_id(id) && id.len() < 5 {
        format!("{:0>5}", id)
    } else {
        id.to_string()
    }
}

/// The topology id a storage key is drawn under.
pub fn topology_id_for_key(key: &str) -> String {
    pad_topology_id(key)
}

/// All the storage keys a topology county id may be recorded under, in the
/// order they should be tried.
pub fn candidate_keys(
    tables: &GeographyTables,
    year: u32,
    state: &str,
    topology_id: &str,
) -> Vec<String> {
    let original = pad_topology_id(topology_id);
    let corrected = tables.correct_topology_id(year, state, &original);

    let mut keys: Vec<String> = vec![corrected.clone(), original];
    if let Some(stripped) = corrected.strip_prefix('0') {
        keys.push(stripped.to_string());
    }
    let chars: Vec<char> = corrected.chars().collect();
    if chars.len() >= 3 {
        let suffix: String = chars[chars.len() - 3..].iter().collect();
        let trimmed = suffix.trim_start_matches('0').to_string();
        keys.push(suffix);
        if !trimmed.is_empty() {
            keys.push(trimmed);
        }
    }

    let mut seen: BTreeSet<String> = BTreeSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    keys
}

/// Finds the county result drawn under a topology id.
///
/// Returns `None` when there is no data for this feature, which is a normal
/// outcome (e.g. Alaska boroughs without a mapped district).
pub fn reconcile<'a>(
    tables: &GeographyTables,
    year: u32,
    state: &str,
    topology_id: &str,
    counties: &'a BTreeMap<String, CountyResult>,
) -> Option<(String, &'a CountyResult)> {
    for key in candidate_keys(tables, year, state, topology_id) {
        match counties.get(&key) {
            Some(c) if c.state == state => {
                debug!("reconcile: {} {} {} -> {}", year, state, topology_id, key);
                return Some((key, c));
            }
            Some(c) => {
                debug!(
                    "reconcile: candidate {} for {} belongs to {}, skipping",
                    key, topology_id, c.state
                );
            }
            None => {}
        }
    }
    debug!("reconcile: no data for {} {} {}", year, state, topology_id);
    None
}
