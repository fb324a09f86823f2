// Primitives shared by the tabular readers.

use std::path::Path;

use crate::returns::*;

/// Position of each column in the header row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnIndexes {
    pub year: usize,
    pub state: usize,
    pub county_fips: usize,
    pub county_name: Option<usize>,
    pub candidate: usize,
    pub party: usize,
    pub votes: usize,
    pub mode: Option<usize>,
}

fn position(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn required(header: &[String], name: &str, path: &str) -> ReturnsResult<usize> {
    position(header, name).context(MissingColumnSnafu { column: name, path })
}

pub fn find_columns(
    header: &[String],
    names: &ColumnNames,
    path: &str,
) -> ReturnsResult<ColumnIndexes> {
    let cols = ColumnIndexes {
        year: required(header, names.year(), path)?,
        state: required(header, names.state(), path)?,
        county_fips: required(header, names.county_fips(), path)?,
        county_name: position(header, names.county_name()),
        candidate: required(header, names.candidate(), path)?,
        party: required(header, names.party(), path)?,
        votes: required(header, names.votes(), path)?,
        mode: position(header, names.mode()),
    };
    debug!("find_columns: {:?} -> {:?}", header, cols);
    Ok(cols)
}

/// Empty cells and `NA` mean the value is not known.
pub fn optional_field(cell: Option<&str>) -> Option<String> {
    match cell.map(str::trim) {
        None | Some("") => None,
        Some(s) if s.eq_ignore_ascii_case("NA") => None,
        Some(s) => Some(s.to_string()),
    }
}

pub fn parse_votes(cell: Option<&str>) -> Option<i64> {
    let s = optional_field(cell)?;
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

pub fn parse_year(cell: Option<&str>) -> Option<u32> {
    let s = optional_field(cell)?;
    s.parse::<u32>()
        .ok()
        .or_else(|| parse_votes(Some(s.as_str())).and_then(|v| u32::try_from(v).ok()))
}

/// Assembles a row from its cells. Returns `None` when the year is
/// unreadable, which is the case for repeated header lines.
pub fn build_row(cells: &[String], cols: &ColumnIndexes) -> Option<RawRow> {
    let cell = |idx: usize| cells.get(idx).map(|s| s.as_str());
    let year = parse_year(cell(cols.year))?;
    Some(RawRow {
        year,
        state: cell(cols.state).unwrap_or_default().trim().to_string(),
        county_fips: optional_field(cell(cols.county_fips)),
        county_name: cols
            .county_name
            .and_then(|idx| optional_field(cell(idx)))
            .unwrap_or_default(),
        candidate: cell(cols.candidate).unwrap_or_default().trim().to_string(),
        party: optional_field(cell(cols.party)),
        mode: cols
            .mode
            .and_then(|idx| cell(idx))
            .unwrap_or_default()
            .trim()
            .to_string(),
        votes: parse_votes(cell(cols.votes)),
    })
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        [
            "year",
            "state",
            "state_po",
            "county_name",
            "county_fips",
            "office",
            "candidate",
            "party",
            "candidatevotes",
            "totalvotes",
            "version",
            "mode",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn cells(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn columns_by_name() {
        let cols = find_columns(&header(), &ColumnNames::default(), "x.csv").unwrap();
        assert_eq!(cols.county_fips, 4);
        assert_eq!(cols.votes, 8);
        assert_eq!(cols.mode, Some(11));
    }

    #[test]
    fn missing_column() {
        let h = cells(&["year", "state"]);
        let e = find_columns(&h, &ColumnNames::default(), "x.csv").unwrap_err();
        assert!(format!("{}", e).contains("county_fips"));
    }

    #[test]
    fn values() {
        assert_eq!(optional_field(Some(" NA ")), None);
        assert_eq!(optional_field(Some("")), None);
        assert_eq!(optional_field(Some("01001")), Some("01001".to_string()));
        assert_eq!(parse_votes(Some("12")), Some(12));
        assert_eq!(parse_votes(Some("12.0")), Some(12));
        assert_eq!(parse_votes(Some("12.5")), None);
        assert_eq!(parse_votes(Some("-3")), Some(-3));
        assert_eq!(parse_year(Some("2020")), Some(2020));
        assert_eq!(parse_year(Some("year")), None);
    }

    #[test]
    fn build_rows() {
        let cols = find_columns(&header(), &ColumnNames::default(), "x.csv").unwrap();
        let row = build_row(
            &cells(&[
                "2020", "ALABAMA", "AL", "AUTAUGA", "1001", "US PRESIDENT",
                "JOSEPH R BIDEN JR", "DEMOCRAT", "5909", "27770", "20220315", "TOTAL",
            ]),
            &cols,
        )
        .unwrap();
        assert_eq!(row.year, 2020);
        assert_eq!(row.county_fips.as_deref(), Some("1001"));
        assert_eq!(row.votes, Some(5909));
        assert_eq!(row.mode, "TOTAL");

        let na = build_row(
            &cells(&[
                "2020", "CONNECTICUT", "CT", "", "NA", "US PRESIDENT", "X", "OTHER", "NA",
            ]),
            &cols,
        )
        .unwrap();
        assert_eq!(na.county_fips, None);
        assert_eq!(na.votes, None);
        assert_eq!(na.mode, "");

        assert_eq!(build_row(&header(), &cols), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/countypres.csv"), "countypres.csv");
    }
}
