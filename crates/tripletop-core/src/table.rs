//! Untyped CSV tables as delivered by a source.

use std::io::Read;

/// Header row plus string cells, exactly as parsed from CSV.
///
/// Rows are padded or truncated to the header width so that every row can be
/// addressed by column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_csv_str(input: &str) -> Result<Self, csv::Error> {
        Self::from_csv_reader(input.as_bytes())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').to_owned())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_cells_and_ragged_rows() {
        let table = RawTable::from_csv_str(
            "\u{feff}Rank,Name,Symbol\n1,\"Reliance Industries, Ltd\",RELIANCE.NS\n2,TCS\n\n",
        )
        .expect("csv parses");

        assert_eq!(table.headers, vec!["Rank", "Name", "Symbol"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], "Reliance Industries, Ltd");
        assert_eq!(table.rows[1], vec!["2", "TCS", ""]);
    }
}
