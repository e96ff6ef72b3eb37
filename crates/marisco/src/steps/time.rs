//! Sampling time parsing and encoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{Table, Value};

/// Format of the HELCOM composite `DATE` column.
pub const HELCOM_DATE_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Rebuild a date from year, month and day fields.
///
/// A zero day or month is read as 1, and a year with neither month nor day
/// becomes January 1st. Anything else that does not form a valid calendar
/// date yields `None`.
pub fn parse_partial_date(
    year: Option<i64>,
    month: Option<i64>,
    day: Option<i64>,
) -> Option<NaiveDateTime> {
    let year = i32::try_from(year?).ok()?;
    let (month, day) = match (month, day) {
        (None, None) => (1, 1),
        (Some(m), Some(d)) => (if m == 0 { 1 } else { m }, if d == 0 { 1 } else { d }),
        _ => return None,
    };
    let month = u32::try_from(month).ok()?;
    let day = u32::try_from(day).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Parse the composite `DATE` string.
pub fn parse_composite_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), HELCOM_DATE_FORMAT).ok()
}

/// Parse and standardize sampling time.
///
/// Writes `time` (a date, or missing when nothing usable is found) and a
/// `begperiod` copy. `DAY` and `MONTH` are repaired in place.
#[derive(Debug, Clone, Default)]
pub struct ParseTime;

impl ParseTime {
    fn parse_table(table: &mut Table) -> usize {
        repair_day_month(table);

        let mut unparsed = 0;
        table.derive_column("time", |t, i| {
            let composite = t.value(i, "DATE").as_str().and_then(parse_composite_date);
            let parsed = composite.or_else(|| {
                parse_partial_date(
                    t.value(i, "YEAR").as_i64(),
                    t.value(i, "MONTH").as_i64(),
                    t.value(i, "DAY").as_i64(),
                )
            });
            match parsed {
                Some(date) => Value::Date(date),
                None => {
                    unparsed += 1;
                    Value::Missing
                }
            }
        });
        table.map_column("time", "begperiod", Value::clone);
        unparsed
    }
}

fn repair_day_month(table: &mut Table) {
    for column in ["DAY", "MONTH"] {
        table.map_column(column, column, |v| match v.as_f64() {
            Some(n) if n == 0.0 => Value::Number(1.0),
            _ => v.clone(),
        });
    }
    if table.has_column("DAY") && table.has_column("MONTH") {
        for i in 0..table.row_count() {
            let missing = table.value(i, "DAY").is_missing()
                && table.value(i, "MONTH").is_missing()
                && !table.value(i, "YEAR").is_missing();
            if missing {
                for column in ["DAY", "MONTH"] {
                    if let Some(idx) = table.column_index(column) {
                        table.set(i, idx, Value::Number(1.0));
                    }
                }
            }
        }
    }
}

impl TransformStep for ParseTime {
    fn name(&self) -> &str {
        "ParseTime"
    }

    fn description(&self) -> String {
        "Parse and standardize time information in the dataframe".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if !table.has_column("DATE") && !table.has_column("YEAR") {
                notes.push(format!("Group '{}' has neither 'DATE' nor 'YEAR'", group));
            }
            let unparsed = Self::parse_table(table);
            if unparsed > 0 {
                notes.push(format!("{} rows in '{}' have no usable date", unparsed, group));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Seconds since 1970-01-01T00:00:00.
pub fn encode_time(date: &NaiveDateTime) -> i64 {
    date.and_utc().timestamp()
}

/// Encode a date column as seconds since the epoch, dropping rows without
/// a date.
#[derive(Debug, Clone)]
pub struct EncodeTime {
    column: String,
}

impl EncodeTime {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Default for EncodeTime {
    fn default() -> Self {
        Self::new("time")
    }
}

impl TransformStep for EncodeTime {
    fn name(&self) -> &str {
        "EncodeTime"
    }

    fn description(&self) -> String {
        "Encode time as seconds since epoch".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if !table.has_column(&self.column) {
                notes.push(format!("Group '{}' has no '{}' column", group, self.column));
                continue;
            }
            let dropped = table.retain_rows(|t, i| t.value(i, &self.column).as_date().is_some());
            if dropped > 0 {
                notes.push(format!(
                    "{} of {} rows dropped from '{}' for missing time",
                    dropped,
                    dropped + table.row_count(),
                    group
                ));
            }
            table.map_column(&self.column, &self.column, |v| match v.as_date() {
                Some(date) => Value::from(encode_time(&date)),
                None => Value::Missing,
            });
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Parse an ISO 8601 timestamp, with or without time and offset.
pub fn parse_iso_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse an ISO 8601 text column (the legacy dump's `TIME`).
#[derive(Debug, Clone)]
pub struct ParseIsoTime {
    column: String,
}

impl ParseIsoTime {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Default for ParseIsoTime {
    fn default() -> Self {
        Self::new("TIME")
    }
}

impl TransformStep for ParseIsoTime {
    fn name(&self) -> &str {
        "ParseIsoTime"
    }

    fn description(&self) -> String {
        "Parse time column from MARIS dump".to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            let mut failed = 0;
            let found = table.map_column(&self.column, &self.column, |v| match v {
                Value::Date(_) | Value::Missing => v.clone(),
                other => match parse_iso_time(&other.key()) {
                    Some(date) => Value::Date(date),
                    None => {
                        failed += 1;
                        Value::Missing
                    }
                },
            });
            if !found {
                notes.push(format!("Group '{}' has no '{}' column", group, self.column));
            } else if failed > 0 {
                notes.push(format!("{} unparseable timestamps in '{}'", failed, group));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}
