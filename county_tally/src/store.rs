use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::aggregate::{aggregate_rows, finalize, normalize_state, Finalized};
use crate::config::*;
use crate::geography::{pad_topology_id, reconcile, GeographyTables};
use crate::modes::merge_tally;
use crate::winner::resolve_winner;

/// A unit of lazy work.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum ScopeKey {
    /// Every state of a year, state-level results only.
    Year(u32),
    /// The counties of one state in one year.
    State(u32, String),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ProcessingState {
    Unprocessed,
    Processing,
    Processed,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of times the aggregation routine ran.
    pub runs: u32,
    pub rows_accepted: u64,
    pub rows_dropped: u64,
    pub match_cache_hits: u64,
    pub match_cache_misses: u64,
}

type MatchKey = (u32, String, String);

/// Owns the rows and everything derived from them.
///
/// Results are computed on demand and kept: whole years for the national
/// and state views, single states for the county views. All the caches live
/// here, so two stores never share state.
pub struct ResultStore {
    rows_by_year: BTreeMap<u32, Vec<RawRow>>,
    tables: GeographyTables,
    rules: TallyRules,
    results: BTreeMap<u32, YearResults>,
    processing: HashMap<ScopeKey, ProcessingState>,
    match_cache: HashMap<MatchKey, Option<GeographyMatch>>,
    /// Views per (year, state), with the features they were drawn from.
    overview_cache: HashMap<(u32, String), (Vec<BoundaryFeature>, Vec<CountyView>)>,
    stats: StoreStats,
}

impl ResultStore {
    pub fn new(rows: Vec<RawRow>, tables: GeographyTables, rules: TallyRules) -> ResultStore {
        let mut rows_by_year: BTreeMap<u32, Vec<RawRow>> = BTreeMap::new();
        for row in rows.into_iter() {
            rows_by_year.entry(row.year).or_default().push(row);
        }
        info!(
            "ResultStore: ingested {} rows over years {:?}",
            rows_by_year.values().map(|v| v.len()).sum::<usize>(),
            rows_by_year.keys().collect::<Vec<_>>()
        );
        ResultStore {
            rows_by_year,
            tables,
            rules,
            results: BTreeMap::new(),
            processing: HashMap::new(),
            match_cache: HashMap::new(),
            overview_cache: HashMap::new(),
            stats: StoreStats::default(),
        }
    }

    pub fn tables(&self) -> &GeographyTables {
        &self.tables
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn years(&self) -> Vec<u32> {
        self.rows_by_year.keys().cloned().collect()
    }

    /// The states that have rows in a year, normalized.
    pub fn states(&self, year: u32) -> Vec<String> {
        let names: BTreeSet<String> = self
            .rows_by_year
            .get(&year)
            .map(|rows| rows.iter().map(|r| normalize_state(&r.state)).collect())
            .unwrap_or_default();
        names.into_iter().collect()
    }

    pub fn processing_state(&self, key: &ScopeKey) -> ProcessingState {
        self.processing
            .get(key)
            .cloned()
            .unwrap_or(ProcessingState::Unprocessed)
    }

    // Returns true if the caller should run the work for this key.
    fn begin(&mut self, key: &ScopeKey) -> bool {
        match self.processing_state(key) {
            ProcessingState::Processed => {
                debug!("begin: {:?} already processed", key);
                false
            }
            ProcessingState::Processing => {
                warn!("begin: {:?} is being processed, ignoring request", key);
                false
            }
            ProcessingState::Unprocessed => {
                self.processing
                    .insert(key.clone(), ProcessingState::Processing);
                true
            }
        }
    }

    fn finish(&mut self, key: ScopeKey) {
        self.processing.insert(key, ProcessingState::Processed);
    }

    fn run_aggregation(&mut self, year: u32, state: Option<&str>) -> Finalized {
        let rows: &[RawRow] = self
            .rows_by_year
            .get(&year)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let agg = aggregate_rows(rows.iter(), year, state);
        let fin = finalize(agg, &self.tables, &self.rules);
        self.stats.runs += 1;
        self.stats.rows_accepted += fin.stats.accepted;
        self.stats.rows_dropped += fin.stats.dropped();
        fin
    }

    /// Makes the national and state results of a year available.
    pub fn ensure_year_processed(&mut self, year: u32) {
        let key = ScopeKey::Year(year);
        if !self.begin(&key) {
            return;
        }
        let fin = self.run_aggregation(year, None);
        info!(
            "ensure_year_processed: {}: {} states",
            year,
            fin.states.len()
        );
        let entry = self.results.entry(year).or_default();
        entry.states.extend(fin.states);
        self.finish(key);
    }

    /// Makes the county results of one state available.
    pub fn ensure_state_processed(&mut self, year: u32, state: &str) {
        let state = normalize_state(state);
        let key = ScopeKey::State(year, state.clone());
        if !self.begin(&key) {
            return;
        }
        let fin = self.run_aggregation(year, Some(state.as_str()));
        info!(
            "ensure_state_processed: {} {}: {} counties",
            year,
            state,
            fin.counties.len()
        );
        let entry = self.results.entry(year).or_default();
        let mut dropped = false;
        for (storage_key, county) in fin.counties.into_iter() {
            match entry.counties.get(&storage_key) {
                Some(existing) if existing.state != county.state => {
                    warn!(
                        "ensure_state_processed: storage key {} already used by {}, dropping {} {}",
                        storage_key, existing.state, county.state, county.name
                    );
                    dropped = true;
                }
                _ => {
                    entry.counties.insert(storage_key, county);
                }
            }
        }
        entry.states.extend(fin.states);
        if dropped {
            // The state total must only count the counties that were kept.
            let mut votes = VoteTally::new();
            let mut counties = 0;
            for c in entry.counties.values().filter(|c| c.state == state) {
                merge_tally(&mut votes, &c.votes);
                counties += 1;
            }
            if counties == 0 {
                entry.states.remove(&state);
            } else {
                entry.states.insert(
                    state.clone(),
                    StateResult {
                        winner: resolve_winner(&votes),
                        votes,
                        counties,
                    },
                );
            }
        }
        self.finish(key);
    }

    /// Everything materialized so far for a year.
    pub fn query(&self, year: u32) -> Option<&YearResults> {
        self.results.get(&year)
    }

    pub fn state_result(&mut self, year: u32, state: &str) -> Option<StateResult> {
        self.ensure_year_processed(year);
        let state = normalize_state(state);
        self.results
            .get(&year)
            .and_then(|r| r.states.get(&state))
            .cloned()
    }

    pub fn national_result(&mut self, year: u32) -> NationalResult {
        self.ensure_year_processed(year);
        let mut votes = VoteTally::new();
        let mut states_won: BTreeMap<Party, u32> = BTreeMap::new();
        if let Some(r) = self.results.get(&year) {
            for state_res in r.states.values() {
                merge_tally(&mut votes, &state_res.votes);
                if let Winner::Party(p) = &state_res.winner {
                    *states_won.entry(p.clone()).or_insert(0) += 1;
                }
            }
        }
        NationalResult {
            winner: resolve_winner(&votes),
            votes,
            states_won,
        }
    }

    /// Finds the county result drawn under a topology county id.
    ///
    /// Outcomes, including the absence of data, are cached per
    /// (year, state, topology id).
    pub fn resolve_geography_key(
        &mut self,
        year: u32,
        state: &str,
        topology_id: &str,
    ) -> Option<GeographyMatch> {
        let state = normalize_state(state);
        self.ensure_state_processed(year, &state);
        let cache_key: MatchKey = (year, state.clone(), pad_topology_id(topology_id));
        if let Some(cached) = self.match_cache.get(&cache_key) {
            self.stats.match_cache_hits += 1;
            return cached.clone();
        }
        self.stats.match_cache_misses += 1;

        let empty = BTreeMap::new();
        let counties = self
            .results
            .get(&year)
            .map(|r| &r.counties)
            .unwrap_or(&empty);
        let res = reconcile(&self.tables, year, &state, &cache_key.2, counties).map(
            |(matched_key, county)| GeographyMatch {
                matched_key,
                county: county.clone(),
            },
        );
        self.match_cache.insert(cache_key, res.clone());
        res
    }

    /// The render input of the state-wide county view: one entry per county
    /// feature of the state, with or without data.
    pub fn county_overview(
        &mut self,
        year: u32,
        state: &str,
        features: &[BoundaryFeature],
    ) -> Vec<CountyView> {
        let state = normalize_state(state);
        let state_fips = match self.tables.state_fips(&state) {
            Some(f) => f.to_string(),
            None => {
                warn!("county_overview: unknown state {:?}", state);
                return vec![];
            }
        };
        let state_features: Vec<BoundaryFeature> = features
            .iter()
            .filter(|f| f.state_fips() == state_fips)
            .cloned()
            .collect();
        let cache_key = (year, state.clone());
        if let Some((cached_features, views)) = self.overview_cache.get(&cache_key) {
            if *cached_features == state_features {
                return views.clone();
            }
            debug!("county_overview: {} {}: features changed", year, state);
        }

        let mut views: Vec<CountyView> = Vec::new();
        for feature in state_features.iter() {
            let topology_id = feature.county_fips();
            let view = match self.resolve_geography_key(year, &state, &topology_id) {
                Some(m) => CountyView {
                    topology_id,
                    name: feature.name.clone().or(Some(m.county.name)),
                    storage_key: Some(m.matched_key),
                    winner: m.county.winner,
                    votes: m.county.votes,
                },
                None => CountyView {
                    topology_id,
                    name: feature.name.clone(),
                    storage_key: None,
                    winner: Winner::Unknown,
                    votes: VoteTally::new(),
                },
            };
            views.push(view);
        }
        debug!(
            "county_overview: {} {}: {} features, {} without data",
            year,
            state,
            views.len(),
            views.iter().filter(|v| v.storage_key.is_none()).count()
        );
        self.overview_cache
            .insert(cache_key, (state_features, views.clone()));
        views
    }

    /// Drops the memoized geography matches and render inputs.
    pub fn clear_caches(&mut self) {
        info!(
            "clear_caches: dropping {} matches and {} overviews",
            self.match_cache.len(),
            self.overview_cache.len()
        );
        self.match_cache.clear();
        self.overview_cache.clear();
    }

    /// Swaps in updated rows. Everything derived from the old rows is
    /// discarded and will be recomputed on the next request.
    pub fn replace_rows(&mut self, rows: Vec<RawRow>) {
        let fresh = ResultStore::new(rows, self.tables.clone(), self.rules.clone());
        self.rows_by_year = fresh.rows_by_year;
        self.results.clear();
        self.processing.clear();
        self.clear_caches();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::ALASKA;

    fn row(year: u32, state: &str, county: &str, party: &str, mode: &str, votes: i64) -> RawRow {
        RawRow {
            year,
            state: state.to_string(),
            county_fips: Some(county.to_string()),
            county_name: format!("COUNTY {}", county),
            candidate: format!("CANDIDATE OF {}", party),
            party: Some(party.to_string()),
            mode: mode.to_string(),
            votes: Some(votes),
        }
    }

    fn sample_rows() -> Vec<RawRow> {
        vec![
            row(2020, "ALABAMA", "1001", "REPUBLICAN", "TOTAL", 19838),
            row(2020, "ALABAMA", "1001", "DEMOCRAT", "TOTAL", 5496),
            row(2020, "ALABAMA", "1003", "REPUBLICAN", "TOTAL", 83544),
            row(2020, "ALABAMA", "1003", "DEMOCRAT", "TOTAL", 24578),
            row(2020, "ALASKA", "2001", "REPUBLICAN", "TOTAL", 7000),
            row(2020, "ALASKA", "2001", "DEMOCRAT", "TOTAL", 3000),
            row(2024, "GEORGIA", "13209", "REPUBLICAN", "ELECTION DAY", 1200),
            row(2024, "GEORGIA", "13209", "REPUBLICAN", "ABSENTEE", 300),
            row(2024, "GEORGIA", "13209", "DEMOCRAT", "ELECTION DAY", 500),
            row(2024, "GEORGIA", "13121", "DEMOCRAT", "TOTAL", 9000),
            row(2024, "GEORGIA", "13121", "DEMOCRAT", "ELECTION DAY", 4000),
        ]
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn store() -> ResultStore {
        init_logger();
        ResultStore::new(
            sample_rows(),
            GeographyTables::embedded().unwrap(),
            TallyRules::default(),
        )
    }

    #[test]
    fn state_processing_runs_once() {
        let mut s = store();
        s.ensure_state_processed(2020, "ALABAMA");
        s.ensure_state_processed(2020, "alabama");
        assert_eq!(s.stats().runs, 1);
        assert_eq!(
            s.processing_state(&ScopeKey::State(2020, "ALABAMA".to_string())),
            ProcessingState::Processed
        );
        s.ensure_state_processed(2020, "ALASKA");
        assert_eq!(s.stats().runs, 2);
    }

    #[test]
    fn year_processing_runs_once_and_keeps_counties_out() {
        let mut s = store();
        s.ensure_year_processed(2020);
        s.ensure_year_processed(2020);
        assert_eq!(s.stats().runs, 1);
        let r = s.query(2020).unwrap();
        assert_eq!(r.states.len(), 2);
        assert!(r.counties.is_empty());
        // National and state lookups reuse the processed year.
        let al = s.state_result(2020, "Alabama").unwrap();
        assert_eq!(al.counties, 2);
        let nat = s.national_result(2020);
        assert_eq!(s.stats().runs, 1);
        assert_eq!(nat.winner, Winner::Party(Party::Republican));
        assert_eq!(nat.states_won[&Party::Republican], 2);
        assert_eq!(nat.votes[&Party::Democrat], 5496 + 24578 + 3000);
    }

    #[test]
    fn unknown_year_is_empty() {
        let mut s = store();
        s.ensure_year_processed(1800);
        assert!(s.query(1800).unwrap().states.is_empty());
        assert_eq!(s.national_result(1800).winner, Winner::Unknown);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let mut a = store();
        let mut b = store();
        a.ensure_state_processed(2024, "GEORGIA");
        b.ensure_state_processed(2024, "GEORGIA");
        assert_eq!(a.query(2024), b.query(2024));
        let g = &a.query(2024).unwrap().counties["13209"];
        assert_eq!(g.votes[&Party::Republican], 1500);
        assert_eq!(a.query(2024).unwrap().counties["13121"].votes[&Party::Democrat], 9000);
    }

    #[test]
    fn state_and_county_views_agree() {
        let mut s = store();
        s.ensure_year_processed(2024);
        s.ensure_state_processed(2024, "GEORGIA");
        let r = s.query(2024).unwrap();
        let mut sums = VoteTally::new();
        for c in r.counties.values().filter(|c| c.state == "GEORGIA") {
            merge_tally(&mut sums, &c.votes);
        }
        assert_eq!(sums, r.states["GEORGIA"].votes);
    }

    #[test]
    fn georgia_correction() {
        let mut s = store();
        let m = s.resolve_geography_key(2024, "GEORGIA", "13211").unwrap();
        assert_eq!(m.matched_key, "13209");
        assert_eq!(m.county.winner, Winner::Party(Party::Republican));
    }

    #[test]
    fn alaska_boroughs() {
        let mut s = store();
        s.ensure_state_processed(2020, ALASKA);
        assert!(s.query(2020).unwrap().counties.contains_key("02240"));
        let m = s.resolve_geography_key(2020, ALASKA, "02240").unwrap();
        assert_eq!(m.matched_key, "02240");
        // A borough that no district is filed under.
        assert!(s.resolve_geography_key(2020, ALASKA, "02020").is_none());
    }

    #[test]
    fn match_cache_keeps_negative_results() {
        let mut s = store();
        assert!(s.resolve_geography_key(2020, ALASKA, "02020").is_none());
        assert!(s.resolve_geography_key(2020, ALASKA, "2020").is_none());
        assert_eq!(s.stats().match_cache_misses, 1);
        assert_eq!(s.stats().match_cache_hits, 1);

        s.clear_caches();
        assert!(s.resolve_geography_key(2020, ALASKA, "02020").is_none());
        assert_eq!(s.stats().match_cache_misses, 2);
        // Clearing the caches does not reprocess anything.
        assert_eq!(s.stats().runs, 1);
    }

    #[test]
    fn county_overview_lists_every_feature() {
        let mut s = store();
        let features = vec![
            BoundaryFeature {
                id: "01001".to_string(),
                name: Some("Autauga".to_string()),
            },
            BoundaryFeature {
                id: "01005".to_string(),
                name: Some("Barbour".to_string()),
            },
            BoundaryFeature {
                id: "02240".to_string(),
                name: Some("Southeast Fairbanks".to_string()),
            },
        ];
        let views = s.county_overview(2020, "ALABAMA", &features);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].storage_key.as_deref(), Some("1001"));
        assert_eq!(views[0].winner, Winner::Party(Party::Republican));
        assert_eq!(views[1].storage_key, None);
        assert_eq!(views[1].winner, Winner::Unknown);

        let again = s.county_overview(2020, "ALABAMA", &features);
        assert_eq!(views, again);
        assert_eq!(s.stats().match_cache_misses, 2);

        // Another feature set is not served from the cached views.
        let fewer = s.county_overview(2020, "ALABAMA", &features[..1]);
        assert_eq!(fewer.len(), 1);
        assert_eq!(fewer[0].topology_id, "01001");
        assert_eq!(s.stats().match_cache_misses, 2);
    }

    #[test]
    fn state_totals_skip_counties_lost_to_a_key_collision() {
        let rows = vec![
            row(2020, "OHIO", "39001", "REPUBLICAN", "TOTAL", 9),
            row(2020, "TEXAS", "39001", "DEMOCRAT", "TOTAL", 50),
            row(2020, "TEXAS", "48001", "REPUBLICAN", "TOTAL", 7),
        ];
        let mut s = ResultStore::new(
            rows,
            GeographyTables::embedded().unwrap(),
            TallyRules::default(),
        );
        s.ensure_state_processed(2020, "OHIO");
        s.ensure_state_processed(2020, "TEXAS");
        let r = s.query(2020).unwrap();
        assert_eq!(r.counties["39001"].state, "OHIO");

        let texas = &r.states["TEXAS"];
        let mut sums = VoteTally::new();
        for c in r.counties.values().filter(|c| c.state == "TEXAS") {
            merge_tally(&mut sums, &c.votes);
        }
        assert_eq!(texas.votes, sums);
        assert_eq!(texas.counties, 1);
        assert_eq!(texas.winner, Winner::Party(Party::Republican));
    }

    #[test]
    fn replacing_rows_reprocesses() {
        let mut s = store();
        s.ensure_year_processed(2020);
        s.replace_rows(vec![row(2020, "OHIO", "39001", "GREEN", "TOTAL", 3)]);
        assert!(s.query(2020).is_none());
        s.ensure_year_processed(2020);
        assert_eq!(s.stats().runs, 2);
        assert_eq!(s.states(2020), vec!["OHIO".to_string()]);
    }
}
