//! Upload byte stream -> rows of text cells.
//!
//! Two decoding modes: columnar (row 0 is the header, rows become
//! key -> value maps) for well-behaved exports, and raw-matrix (plain cell
//! grids, ragged rows tolerated) for files that bury the real header under
//! metadata banners.

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;

use super::cell::normalize_header;

/// Decode upload bytes to text.
///
/// UTF-8 first; NUL characters in the result are the telltale of a
/// spreadsheet exporter that actually wrote UTF-16LE, so those inputs get
/// re-decoded and the residual NULs stripped. Callers never pick an encoding.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if !text.contains('\u{0}') {
        return text.into_owned();
    }

    let (decoded, _, _) = UTF_16LE.decode(bytes);
    decoded.replace('\u{0}', "")
}

/// Raw-matrix decode: every row as an ordered list of cells, no header
/// assumed. Short rows are padded out so interpreters can index freely.
pub fn raw_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut width = 0usize;

    for record in reader.records() {
        let record = record.context("Failed to read CSV record")?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        width = width.max(cells.len());
        rows.push(cells);
    }

    for row in &mut rows {
        row.resize(width, String::new());
    }

    Ok(rows)
}

/// Columnar decode: first row is the header. Returns the normalized header
/// keys in column order plus each data row as a normalized-key -> value map.
pub fn columnar_rows(text: &str) -> Result<(Vec<String>, Vec<HashMap<String, String>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(normalize_header)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(anyhow!("Upload has no header row."));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read CSV record")?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let mut row = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = record.get(idx).unwrap_or("").to_string();
            row.entry(header.clone()).or_insert(value);
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_utf8_passthrough() {
        assert_eq!(decode_text(b"date,amount\n2024-01-05,100\n"), "date,amount\n2024-01-05,100\n");
    }

    #[test]
    fn test_decode_text_utf16le_fallback() {
        let original = "Symbol,Quantity\nAAPL,10\n";
        let bytes: Vec<u8> = original
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();

        assert_eq!(decode_text(&bytes), original);
    }

    #[test]
    fn test_raw_rows_pads_ragged_rows() {
        let rows = raw_rows("a,b,c\nshort\n1,2,3\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["short", "", ""]);
    }

    #[test]
    fn test_raw_rows_skips_blank_lines() {
        let rows = raw_rows("a,b\n,\n1,2\n").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_columnar_rows_normalizes_header_keys() {
        let (headers, rows) = columnar_rows("\u{feff}Date, Member   Name \n2024-01-05,Jane\n").unwrap();
        assert_eq!(headers, vec!["date", "member name"]);
        assert_eq!(rows[0].get("date").map(String::as_str), Some("2024-01-05"));
        assert_eq!(rows[0].get("member name").map(String::as_str), Some("Jane"));
    }
}
