// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::returns::{
    io_common::{build_row, find_columns, simplify_file_name},
    *,
};

pub fn read_xlsx_rows(path: &str, source: &ElectionSource) -> BReturnsResult<Vec<RawRow>> {
    let wrange = get_range(path, &source.excel_worksheet_name)?;
    Ok(read_range(&wrange, source, path)?)
}

fn get_range(path: &str, worksheet_name: &Option<String>) -> ReturnsResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyInputSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    Ok(wrange)
}

/// The text of a cell. Whole numbers are written without a decimal part,
/// which keeps county codes such as `1001` intact.
pub fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        x => {
            debug!("cell_to_string: unexpected cell {:?}", x);
            String::new()
        }
    }
}

fn read_range(
    wrange: &Range<DataType>,
    source: &ElectionSource,
    path: &str,
) -> ReturnsResult<Vec<RawRow>> {
    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyInputSnafu { path })?
        .iter()
        .map(cell_to_string)
        .collect();
    debug!("header: {:?}", header);
    let cols = find_columns(&header, &source.columns, path)?;

    let mut res: Vec<RawRow> = Vec::new();
    let mut skipped = 0;
    for row in iter {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        match build_row(&cells, &cols) {
            Some(r) => res.push(r),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            "{}: skipped {} rows without a readable year",
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
            provider: "xlsx".to_string(),
            file_path: "returns.xlsx".to_string(),
            excel_worksheet_name: None,
            columns: ColumnNames::default(),
        }
    }

    fn s(x: &str) -> DataType {
        DataType::String(x.to_string())
    }

    #[test]
    fn cells() {
        assert_eq!(cell_to_string(&DataType::Float(1001.0)), "1001");
        assert_eq!(cell_to_string(&DataType::Float(0.5)), "0.5");
        assert_eq!(cell_to_string(&DataType::Int(2020)), "2020");
        assert_eq!(cell_to_string(&DataType::Empty), "");
        assert_eq!(cell_to_string(&s("NA")), "NA");
    }

    #[test]
    fn read_sheet() {
        let mut range: Range<DataType> = Range::new((0, 0), (2, 5));
        let header = ["year", "state", "county_fips", "candidate", "party", "candidatevotes"];
        for (c, h) in header.iter().enumerate() {
            range.set_value((0, c as u32), s(h));
        }
        range.set_value((1, 0), DataType::Float(2020.0));
        range.set_value((1, 1), s("ALASKA"));
        range.set_value((1, 2), DataType::Float(2001.0));
        range.set_value((1, 3), s("DONALD J TRUMP"));
        range.set_value((1, 4), s("REPUBLICAN"));
        range.set_value((1, 5), DataType::Float(3112.0));
        // A trailing row without content.
        range.set_value((2, 1), s("TOTAL"));

        let rows = read_range(&range, &source(), "returns.xlsx").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, 2020);
        assert_eq!(rows[0].county_fips.as_deref(), Some("2001"));
        assert_eq!(rows[0].votes, Some(3112));
        assert_eq!(rows[0].mode, "");
    }
}
