/*!

This is the long-form manual for `county_tally` and `countyreturns`.

## Input rows

The library consumes rows of a county-level tabulation export, one row per
(year, state, county, candidate, reporting mode). The command line tool
reads them from:
* `csv` Comma Separated Values with a header row
* `xlsx` Excel workbooks (first worksheet, or the one named in the configuration)

The default column names follow the county presidential returns published by
the MIT Election Data + Science Lab:

| column           | content                                                   |
|------------------|-----------------------------------------------------------|
| `year`           | election year                                             |
| `state`          | state name, e.g. `GEORGIA`                                |
| `county_fips`    | county code of the election data (`NA` when unknown)      |
| `county_name`    | county name                                               |
| `candidate`      | candidate name                                            |
| `party`          | affiliation, any spelling                                 |
| `candidatevotes` | votes for this candidate in this mode                     |
| `mode`           | reporting mode (`TOTAL`, `ELECTION DAY`, `ABSENTEE`, ...) |

Rows that cannot be counted (no county code, no vote count, negative votes,
no party, over- and undervote lines, repeated headers) are skipped.

## Reporting modes

Some years report every county twice: once per channel (election day,
absentee, provisional, ...) and once as an aggregate `TOTAL` or
`TOTAL VOTES` row. When an aggregate is present it is the count. Otherwise
all the channels are added up.

## Geography tables

The identifiers of the boundary topology and of the election data differ in
a few places. These exceptions are data, in `data/geography_tables.json`:

```json
{
  "version": "2024.1",
  "states": [{"fips": "13", "name": "GEORGIA", "postal": "GA"}],
  "alaskaDistricts": {"2001": "02240"},
  "corrections": [
    {"state": "GEORGIA", "years": [2024], "topologyId": "13211", "electionId": "13209"}
  ]
}
```

* `alaskaDistricts` Alaska reports by election district. Each district is stored
  under the borough it maps to. Districts missing from the table are not counted.
* `corrections` topology ids that point to a different county id in the
  election data. An empty or missing `years` list applies to every year.

A different file can be passed to the command line tool with the
`geographyTablesPath` configuration option.

## Ties

The winner of a county, state or of the country is the party with the most
votes. When several parties share the maximum, the one whose canonical id
comes first alphabetically wins (`DEMOCRAT` before `REPUBLICAN`). A tally
without any vote has the winner `UNKNOWN`.
*/
