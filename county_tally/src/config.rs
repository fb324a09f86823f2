// ********* Input data structures ***********

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::Display;

use serde::{Serialize, Serializer};

/// One line of a county-level tabulation export.
///
/// Readers fill in what they could parse and leave the rest as `None`.
/// Validation is the job of the aggregator: a row with a missing county id,
/// vote count or party is dropped there, never rejected by the reader.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRow {
    pub year: u32,
    pub state: String,
    /// County identifier in the election-data space (e.g. "1001", "4400540080").
    pub county_fips: Option<String>,
    pub county_name: String,
    pub candidate: String,
    /// Raw party affiliation, as written in the export.
    pub party: Option<String>,
    /// Reporting mode: "TOTAL", "ELECTION DAY", "ABSENTEE", ...
    pub mode: String,
    pub votes: Option<i64>,
}

/// A boundary feature, as decoded from a topology file.
///
/// Only the identifier and the display name are kept, the geometry belongs
/// to the rendering layer.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct BoundaryFeature {
    pub id: String,
    pub name: Option<String>,
}

impl BoundaryFeature {
    /// The 2-digit state FIPS code of this feature.
    pub fn state_fips(&self) -> String {
        let id = self.id.trim();
        if id.len() <= 2 {
            format!("{:0>2}", id)
        } else {
            self.county_fips().chars().take(2).collect()
        }
    }

    /// The 5-digit county FIPS code of this feature (zero-padded).
    ///
    /// For a state feature this is the padded state code.
    pub fn county_fips(&self) -> String {
        crate::geography::pad_topology_id(&self.id)
    }
}

// ******** Parties and winners *********

/// Canonical party identifier.
///
/// Third parties keep their own (upper-cased) label instead of collapsing
/// into a generic bucket.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Party {
    Republican,
    Democrat,
    Other(String),
}

impl Party {
    pub fn id(&self) -> &str {
        match self {
            Party::Republican => "REPUBLICAN",
            Party::Democrat => "DEMOCRAT",
            Party::Other(label) => label.as_str(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Party::Republican => 0,
            Party::Democrat => 1,
            Party::Other(_) => 2,
        }
    }
}

// Parties are ordered by canonical id. This is the scan order of every
// tally, and therefore the tie-break order of the winner resolver.
impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id()
            .cmp(other.id())
            .then_with(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Serialize for Party {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

pub const UNKNOWN: &str = "UNKNOWN";

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Winner {
    Party(Party),
    /// No votes at all, or every party at zero.
    Unknown,
}

impl Winner {
    pub fn id(&self) -> &str {
        match self {
            Winner::Party(p) => p.id(),
            Winner::Unknown => UNKNOWN,
        }
    }
}

impl Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

pub type VoteTally = BTreeMap<Party, u64>;

/// Votes split by reporting mode, then by party.
pub type ModeTallies = BTreeMap<String, VoteTally>;

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CountyResult {
    pub winner: Winner,
    pub votes: VoteTally,
    pub state: String,
    pub name: String,
    pub candidates: BTreeMap<Party, BTreeSet<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct StateResult {
    pub winner: Winner,
    pub votes: VoteTally,
    pub counties: usize,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct NationalResult {
    pub winner: Winner,
    pub votes: VoteTally,
    #[serde(rename = "statesWon")]
    pub states_won: BTreeMap<Party, u32>,
}

/// Everything materialized so far for one year.
///
/// States are keyed by their election-data name, counties by storage key.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize)]
pub struct YearResults {
    pub states: BTreeMap<String, StateResult>,
    pub counties: BTreeMap<String, CountyResult>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct GeographyMatch {
    #[serde(rename = "matchedKey")]
    pub matched_key: String,
    pub county: CountyResult,
}

/// One county of the state-wide overview, as handed to the renderer.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CountyView {
    #[serde(rename = "topologyId")]
    pub topology_id: String,
    pub name: Option<String>,
    /// `None` when the reconciler found no election data for this feature.
    #[serde(rename = "storageKey")]
    pub storage_key: Option<String>,
    pub winner: Winner,
    pub votes: VoteTally,
}

/// Errors that prevent the library from loading its inputs.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    /// The lookup tables could not be decoded.
    MalformedTables(String),
    /// The lookup tables were decoded but are inconsistent.
    InvalidTables(String),
    /// A vote count does not fit in a row.
    VoteOverflow(u64),
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::MalformedTables(msg) => write!(f, "Malformed geography tables: {}", msg),
            TallyErrors::InvalidTables(msg) => write!(f, "Invalid geography tables: {}", msg),
            TallyErrors::VoteOverflow(votes) => write!(f, "Vote count out of range: {}", votes),
        }
    }
}

// ********* Configuration **********

pub const TOTAL_VOTES: &str = "TOTAL VOTES";
pub const TOTAL: &str = "TOTAL";

/// Modes that are components of an aggregate row in some years.
pub const COMPONENT_MODES: [&str; 7] = [
    "EARLY VOTING",
    "LATE EARLY VOTING",
    "ELECTION DAY",
    "PROVISIONAL",
    "ABSENTEE",
    "MAIL-IN",
    "ABSENTEE BY MAIL",
];

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    /// Aggregate modes, in order of precedence.
    pub aggregate_modes: Vec<String>,
    pub component_modes: Vec<String>,
}

impl TallyRules {
    pub fn is_aggregate(&self, mode: &str) -> bool {
        self.aggregate_modes.iter().any(|m| m == mode)
    }

    pub fn is_component(&self, mode: &str) -> bool {
        self.component_modes.iter().any(|m| m == mode)
    }
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules {
            aggregate_modes: vec![TOTAL_VOTES.to_string(), TOTAL.to_string()],
            component_modes: COMPONENT_MODES.iter().map(|m| m.to_string()).collect(),
        }
    }
}
