use chrono::NaiveDate;

use crate::broker::RowSource;
use crate::error::{AppError, Result};
use crate::records::OhlcvRecord;

pub const FIELD_DATE: &str = "일자";
pub const FIELD_OPEN: &str = "시가";
pub const FIELD_HIGH: &str = "고가";
pub const FIELD_LOW: &str = "저가";
pub const FIELD_CLOSE: &str = "현재가";
pub const FIELD_VOLUME: &str = "거래량";

/// Most recent trading sessions kept per symbol.
pub const DEFAULT_HISTORY_LIMIT: usize = 240;

pub const DATE_FORMAT: &str = "%Y%m%d";

/// Convert the repeating rows of a daily-chart response into typed records.
///
/// Rows are sorted newest-first before truncating to `limit`, so the kept
/// window is the most recent one whatever order the remote used. A single
/// unparseable field fails the whole call.
pub fn extract(rows: &dyn RowSource, limit: usize) -> Result<Vec<OhlcvRecord>> {
    let count = rows.repeat_count();
    let mut records = Vec::with_capacity(count);

    for row in 0..count {
        records.push(OhlcvRecord {
            date: parse_date(row, &rows.comm_data(row, FIELD_DATE))?,
            open: parse_price(row, FIELD_OPEN, &rows.comm_data(row, FIELD_OPEN))?,
            high: parse_price(row, FIELD_HIGH, &rows.comm_data(row, FIELD_HIGH))?,
            low: parse_price(row, FIELD_LOW, &rows.comm_data(row, FIELD_LOW))?,
            close: parse_price(row, FIELD_CLOSE, &rows.comm_data(row, FIELD_CLOSE))?,
            volume: parse_integer(row, FIELD_VOLUME, &rows.comm_data(row, FIELD_VOLUME))?,
        });
    }

    records.sort_by(|a, b| b.date.cmp(&a.date));
    records.truncate(limit);
    Ok(records)
}

fn parse_date(row: usize, raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| AppError::Extraction {
        row,
        field: FIELD_DATE,
        value: trimmed.to_string(),
    })
}

fn parse_integer(row: usize, field: &'static str, raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().map_err(|_| AppError::Extraction {
        row,
        field,
        value: trimmed.to_string(),
    })
}

// Prices carry a +/- prefix marking the move against the prior close.
fn parse_price(row: usize, field: &'static str, raw: &str) -> Result<i64> {
    parse_integer(row, field, raw)?
        .checked_abs()
        .ok_or_else(|| AppError::Extraction {
            row,
            field,
            value: raw.trim().to_string(),
        })
}
