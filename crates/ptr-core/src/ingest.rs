//! CSV upload parsing.
//!
//! Uploads are parsed once at registration. A file that fails to parse is
//! still registered, with the failure recorded on the dataset, so the run
//! history shows what was uploaded and why it was unusable.

use anyhow::Result;
use sha2::{Digest, Sha256};

use ptr_model::{ParseStatus, RawRow, RowNumber};

/// The parsed form of one uploaded file.
#[derive(Debug)]
pub struct ParsedUpload {
    /// Hex sha256 of the raw bytes.
    pub content_ref: String,
    /// Headers in file order, trimmed.
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub parse_status: ParseStatus,
}

/// Parse an uploaded CSV into headers and numbered raw rows.
pub fn parse_csv(bytes: &[u8]) -> ParsedUpload {
    let content_ref = hex::encode(Sha256::digest(bytes));
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = match reader.headers() {
        Ok(headers) => headers
            .iter()
            .map(|header| header.trim().to_string())
            .collect::<Vec<_>>(),
        Err(err) => {
            return ParsedUpload {
                content_ref,
                headers: Vec::new(),
                rows: Vec::new(),
                parse_status: ParseStatus::Failed {
                    reason: err.to_string(),
                },
            };
        }
    };

    match read_rows(&mut reader, &headers) {
        Ok(rows) => ParsedUpload {
            content_ref,
            headers,
            rows,
            parse_status: ParseStatus::Parsed,
        },
        Err(err) => ParsedUpload {
            content_ref,
            headers,
            rows: Vec::new(),
            parse_status: ParseStatus::Failed {
                reason: err.to_string(),
            },
        },
    }
}

fn read_rows(reader: &mut csv::Reader<&[u8]>, headers: &[String]) -> Result<Vec<RawRow>> {
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let mut row = RawRow::new(RowNumber::new(index as u64 + 1)?);
        for (position, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(position) {
                row.values.insert(header.clone(), value.to_string());
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
