use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::geography::{GeographyTables, RHODE_ISLAND};
use crate::modes::{merge_tally, normalize_mode, resolve_modes};
use crate::party::normalize_party;
use crate::winner::resolve_winner;

// Candidate labels that are tabulation artifacts rather than candidates.
const NON_CANDIDATE_LABELS: [&str; 3] = ["", "CANDIDATE", "TOTAL VOTES CAST"];
const BALLOT_MARKERS: [&str; 4] = ["OVERVOTE", "UNDERVOTE", "OVER VOTES", "UNDER VOTES"];

/// Why a row was left out of the tally.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DropReason {
    CountyId,
    Votes,
    Party,
    Candidate,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RowStats {
    pub accepted: u64,
    pub bad_county_id: u64,
    pub bad_votes: u64,
    pub bad_party: u64,
    pub not_a_candidate: u64,
    /// Alaska districts without a borough in the tables.
    pub unmapped_counties: u64,
}

impl RowStats {
    pub fn dropped(&self) -> u64 {
        self.bad_county_id + self.bad_votes + self.bad_party + self.not_a_candidate
    }

    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::CountyId => self.bad_county_id += 1,
            DropReason::Votes => self.bad_votes += 1,
            DropReason::Party => self.bad_party += 1,
            DropReason::Candidate => self.not_a_candidate += 1,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CountyAccumulator {
    pub county_name: String,
    pub modes: ModeTallies,
    pub candidates: BTreeMap<Party, BTreeSet<String>>,
}

impl CountyAccumulator {
    fn add(&mut self, mode: String, party: Party, candidate: &str, votes: u64) {
        let tally = self.modes.entry(mode).or_default();
        *tally.entry(party.clone()).or_insert(0) += votes;
        self.candidates
            .entry(party)
            .or_default()
            .insert(candidate.trim().to_string());
    }
}

/// The accumulators of one scope, keyed by (state, county key).
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Aggregation {
    pub counties: BTreeMap<(String, String), CountyAccumulator>,
    pub stats: RowStats,
}

/// The results of one scope, ready to be stored.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Finalized {
    pub counties: BTreeMap<String, CountyResult>,
    pub states: BTreeMap<String, StateResult>,
    pub stats: RowStats,
}

pub fn normalize_state(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn is_tabulation_artifact(candidate: &str) -> bool {
    let label = candidate.trim().to_uppercase();
    NON_CANDIDATE_LABELS.contains(&label.as_str())
        || BALLOT_MARKERS.iter().any(|m| label.contains(m))
}

/// Validates a row. Returns the county key, the canonical party and the
/// vote count.
pub fn check_row(row: &RawRow, state: &str) -> Result<(String, Party, u64), DropReason> {
    let mut county = match row.county_fips.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit()) => c.to_string(),
        _ => return Err(DropReason::CountyId),
    };
    let votes = match row.votes {
        Some(v) if v >= 0 => v as u64,
        _ => return Err(DropReason::Votes),
    };
    let party = match row.party.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => normalize_party(p),
        _ => return Err(DropReason::Party),
    };
    if is_tabulation_artifact(&row.candidate) {
        return Err(DropReason::Candidate);
    }
    // Rhode Island reports some years by town: the first 5 characters of
    // the town code are the county.
    if state == RHODE_ISLAND && county.len() == 10 {
        county.truncate(5);
    }
    Ok((county, party, votes))
}

/// Accumulates the rows of one year, optionally restricted to one state.
pub fn aggregate_rows<'a, I>(rows: I, year: u32, state: Option<&str>) -> Aggregation
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut res = Aggregation::default();
    for row in rows.into_iter() {
        if row.year != year {
            continue;
        }
        let row_state = normalize_state(&row.state);
        if let Some(target) = state {
            if row_state != target {
                continue;
            }
        }
        match check_row(row, &row_state) {
            Ok((county, party, votes)) => {
                let acc = res.counties.entry((row_state, county)).or_default();
                if acc.county_name.is_empty() {
                    acc.county_name = row.county_name.trim().to_string();
                }
                acc.add(normalize_mode(&row.mode), party, &row.candidate, votes);
                res.stats.accepted += 1;
            }
            Err(reason) => {
                debug!("aggregate_rows: dropping row ({:?}): {:?}", reason, row);
                res.stats.record(reason);
            }
        }
    }
    info!(
        "aggregate_rows: year {} state {:?}: {} rows accepted, {} dropped, {} counties",
        year,
        state,
        res.stats.accepted,
        res.stats.dropped(),
        res.counties.len()
    );
    res
}

struct PendingCounty {
    state: String,
    name: String,
    votes: VoteTally,
    candidates: BTreeMap<Party, BTreeSet<String>>,
}

/// Resolves the modes of every county, assigns storage keys, picks the
/// winners and rolls the counties up into their states.
pub fn finalize(agg: Aggregation, tables: &GeographyTables, rules: &TallyRules) -> Finalized {
    let mut stats = agg.stats;
    let mut pending: BTreeMap<String, PendingCounty> = BTreeMap::new();

    for ((state, county), acc) in agg.counties.into_iter() {
        let votes = resolve_modes(&acc.modes, rules);
        let key = match tables.storage_key(&state, &county) {
            Some(k) => k,
            None => {
                warn!(
                    "finalize: no storage key for {} county {} ({}), dropping it",
                    state, county, acc.county_name
                );
                stats.unmapped_counties += 1;
                continue;
            }
        };
        match pending.get_mut(&key) {
            Some(p) if p.state == state => {
                // Several source counties under one key: sum them.
                debug!("finalize: merging {} {} into {}", state, county, key);
                merge_tally(&mut p.votes, &votes);
                for (party, names) in acc.candidates.into_iter() {
                    p.candidates.entry(party).or_default().extend(names);
                }
            }
            Some(p) => {
                warn!(
                    "finalize: storage key {} already used by {}, dropping {} county {}",
                    key, p.state, state, county
                );
            }
            None => {
                pending.insert(
                    key,
                    PendingCounty {
                        state,
                        name: acc.county_name,
                        votes,
                        candidates: acc.candidates,
                    },
                );
            }
        }
    }

    let mut counties: BTreeMap<String, CountyResult> = BTreeMap::new();
    let mut states: BTreeMap<String, StateResult> = BTreeMap::new();
    for (key, p) in pending.into_iter() {
        let state_res = states.entry(p.state.clone()).or_insert(StateResult {
            winner: Winner::Unknown,
            votes: VoteTally::new(),
            counties: 0,
        });
        merge_tally(&mut state_res.votes, &p.votes);
        state_res.counties += 1;

        counties.insert(
            key,
            CountyResult {
                winner: resolve_winner(&p.votes),
                votes: p.votes,
                state: p.state,
                name: p.name,
                candidates: p.candidates,
            },
        );
    }
    for state_res in states.values_mut() {
        state_res.winner = resolve_winner(&state_res.votes);
    }

    Finalized {
        counties,
        states,
        stats,
    }
}
