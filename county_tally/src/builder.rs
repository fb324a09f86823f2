pub use crate::config::*;
use crate::geography::GeographyTables;
use crate::store::ResultStore;

/// A builder for assembling a result store row by row.
///
/// ```
/// use county_tally::builder::Builder;
/// use county_tally::TallyRules;
/// # use county_tally::TallyErrors;
///
/// let mut builder = Builder::new(&TallyRules::default())?;
///
/// builder.add_row_simple(2020, "OHIO", "39001", "REPUBLICAN", 9)?;
/// builder.add_row_simple(2020, "OHIO", "39001", "DEMOCRAT", 4)?;
///
/// let mut store = builder.build()?;
/// let ohio = store.state_result(2020, "OHIO").unwrap();
/// assert_eq!(ohio.winner.id(), "REPUBLICAN");
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _tables: Option<GeographyTables>,
    pub(crate) _rows: Vec<RawRow>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _tables: None,
            _rows: Vec::new(),
        })
    }

    /// Uses the given lookup tables instead of the embedded ones.
    pub fn tables(self, tables: GeographyTables) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: self._rules,
            _tables: Some(tables),
            _rows: self._rows,
        })
    }

    /// Adds a final count for one party in one county.
    ///
    /// The party label doubles as the candidate name.
    pub fn add_row_simple(
        &mut self,
        year: u32,
        state: &str,
        county_fips: &str,
        party: &str,
        votes: u64,
    ) -> Result<(), TallyErrors> {
        let votes = i64::try_from(votes).map_err(|_| TallyErrors::VoteOverflow(votes))?;
        self.add_row(&RawRow {
            year,
            state: state.to_string(),
            county_fips: Some(county_fips.to_string()),
            county_name: String::new(),
            candidate: party.to_string(),
            party: Some(party.to_string()),
            mode: TOTAL.to_string(),
            votes: Some(votes),
        })
    }

    pub fn add_row(&mut self, row: &RawRow) -> Result<(), TallyErrors> {
        self._rows.push(row.clone());
        Ok(())
    }

    pub fn build(self) -> Result<ResultStore, TallyErrors> {
        let tables = match self._tables {
            Some(t) => t,
            None => GeographyTables::embedded()?,
        };
        Ok(ResultStore::new(self._rows, tables, self._rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_counts_are_rejected() {
        let mut builder = Builder::new(&TallyRules::default()).unwrap();
        let res = builder.add_row_simple(2020, "OHIO", "39001", "GREEN", u64::MAX);
        assert_eq!(res, Err(TallyErrors::VoteOverflow(u64::MAX)));
        assert!(builder._rows.is_empty());

        builder
            .add_row_simple(2020, "OHIO", "39001", "GREEN", i64::MAX as u64)
            .unwrap();
        assert_eq!(builder._rows[0].votes, Some(i64::MAX));
    }
}
