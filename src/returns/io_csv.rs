// Primitives for reading CSV files.

use std::io;

use csv::Reader;

use crate::returns::{
    io_common::{build_row, find_columns, simplify_file_name},
    *,
};

pub fn read_csv_rows(path: &str, source: &ElectionSource) -> BReturnsResult<Vec<RawRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    Ok(read_records(rdr, source, path)?)
}

fn read_records<R: io::Read>(
    rdr: Reader<R>,
    source: &ElectionSource,
    path: &str,
) -> ReturnsResult<Vec<RawRow>> {
    let mut records = rdr.into_records();
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { path, lineno: 1usize })?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => return EmptyInputSnafu { path }.fail(),
    };
    let cols = find_columns(&header, &source.columns, path)?;

    let mut res: Vec<RawRow> = Vec::new();
    let mut skipped = 0;
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        match build_row(&cells, &cols) {
            Some(row) => res.push(row),
            None => {
                debug!("read_records: line {}: unreadable year: {:?}", lineno, cells);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(
            "{}: skipped {} lines without a readable year",
            simplify_file_name(path),
            skipped
        );
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ElectionSource {
        ElectionSource {
            provider: "csv".to_string(),
            file_path: "countypres.csv".to_string(),
            excel_worksheet_name: None,
            columns: ColumnNames::default(),
        }
    }

    fn read_str(data: &str) -> ReturnsResult<Vec<RawRow>> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());
        read_records(rdr, &source(), "countypres.csv")
    }

    #[test]
    fn read_export() {
        let data = "\
year,state,county_name,county_fips,candidate,party,candidatevotes,mode
2020,GEORGIA,APPLING,13001,DONALD J TRUMP,REPUBLICAN,6525,TOTAL
2020,GEORGIA,APPLING,13001,JOSEPH R BIDEN JR,DEMOCRAT,1779,TOTAL
year,state,county_name,county_fips,candidate,party,candidatevotes,mode
2020,CONNECTICUT,,NA,JO JORGENSEN,LIBERTARIAN,NA,TOTAL
";
        let rows = read_str(data).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].county_name, "APPLING");
        assert_eq!(rows[1].votes, Some(1779));
        assert_eq!(rows[2].county_fips, None);
        assert_eq!(rows[2].votes, None);
    }

    #[test]
    fn short_lines_are_kept() {
        let data = "\
year,state,county_fips,candidate,party,candidatevotes
2016,OHIO,39001,DONALD TRUMP,REPUBLICAN
";
        let rows = read_str(data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].votes, None);
        assert_eq!(rows[0].mode, "");
    }

    #[test]
    fn empty_and_bad_headers() {
        assert!(matches!(
            read_str("").unwrap_err(),
            ReturnsError::EmptyInput { .. }
        ));
        assert!(matches!(
            read_str("year,state\n2020,OHIO\n").unwrap_err(),
            ReturnsError::MissingColumn { .. }
        ));
    }
}
