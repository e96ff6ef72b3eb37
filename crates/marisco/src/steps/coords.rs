//! Geographic coordinate parsing and validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::pipeline::{StepContext, TransformStep};
use crate::table::{Table, Value};

/// Convert packed degree-minutes (`DDMM.mmm`) to decimal degrees.
///
/// The sign applies to the whole coordinate: `-1030.0` is -10.5.
pub fn ddmm_to_dd(ddmm: f64) -> f64 {
    let sign = if ddmm < 0.0 { -1.0 } else { 1.0 };
    let abs = ddmm.abs();
    let degrees = (abs / 100.0).trunc();
    let minutes = abs - degrees * 100.0;
    sign * (degrees + minutes / 60.0)
}

static DEGREE_MINUTES: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?)(\d+)[\s°:]+(\d+(?:[.,]\d+)?)'?\s*$").ok());

/// Parse a degree-minute coordinate.
///
/// Accepts `"DD MM.mmm"` (space, `°` or `:` separated) and packed
/// `DDMM.mmm` numbers or numeric strings. Minutes must be below 60.
pub fn parse_ddmm(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = DEGREE_MINUTES.as_ref().and_then(|re| re.captures(raw)) {
        let degrees: f64 = caps[2].parse().ok()?;
        let minutes: f64 = caps[3].replace(',', ".").parse().ok()?;
        if minutes >= 60.0 {
            return None;
        }
        let dd = degrees + minutes / 60.0;
        if !dd.is_finite() {
            return None;
        }
        return Some(if &caps[1] == "-" { -dd } else { dd });
    }

    let packed: f64 = raw.replace(',', ".").parse().ok()?;
    if !packed.is_finite() || packed.abs() % 100.0 >= 60.0 {
        return None;
    }
    Some(ddmm_to_dd(packed))
}

fn ddmm_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) if n.abs() % 100.0 < 60.0 => Some(ddmm_to_dd(*n)),
        Value::Text(s) => parse_ddmm(s),
        _ => None,
    }
}

/// First column whose name matches `<axis>.*<format>`, case-insensitively.
fn find_coord_column(table: &Table, axis: &str, format: &str) -> Option<String> {
    let pattern = Regex::new(&format!("(?i){}.*{}", axis, format)).ok()?;
    table.columns.iter().find(|c| pattern.is_match(c)).cloned()
}

/// Build `lat` and `lon` from decimal-degree columns (`LAT (dddddd)`), or
/// from degree-minute columns (`LAT (ddmmmm)`) when the decimal value is
/// missing or zero. Rows left without a latitude or a longitude are dropped.
#[derive(Debug, Clone, Default)]
pub struct ParseCoordinates;

impl ParseCoordinates {
    fn coordinate(table: &Table, row: usize, decimal: Option<&str>, minutes: Option<&str>) -> Value {
        let dd = decimal
            .and_then(|c| table.value(row, c).as_f64())
            .filter(|v| *v != 0.0);
        if let Some(dd) = dd {
            return Value::Number(dd);
        }
        minutes
            .and_then(|c| ddmm_value(table.value(row, c)))
            .map(Value::Number)
            .unwrap_or_default()
    }
}

impl TransformStep for ParseCoordinates {
    fn name(&self) -> &str {
        "ParseCoordinates"
    }

    fn description(&self) -> String {
        "Get geographical coordinates from columns expressed in degrees decimal format or from \
         columns in degrees/minutes decimal format where degrees decimal format is missing"
            .to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            for (axis, dest) in [("LAT", "lat"), ("LON", "lon")] {
                let decimal = find_coord_column(table, axis, "dddddd");
                let minutes = find_coord_column(table, axis, "ddmmmm");
                if decimal.is_none() && minutes.is_none() {
                    notes.push(format!("Group '{}' has no {} columns", group, axis));
                }
                table.derive_column(dest, |t, i| {
                    Self::coordinate(t, i, decimal.as_deref(), minutes.as_deref())
                });
            }

            let dropped = table.retain_rows(|t, i| {
                !t.value(i, "lat").is_missing() && !t.value(i, "lon").is_missing()
            });
            if dropped > 0 {
                notes.push(format!("{} rows without coordinates dropped from '{}'", dropped, group));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

/// Fix decimal commas in coordinates and drop rows outside the valid range
/// (|lat| ≤ 90, |lon| ≤ 180).
#[derive(Debug, Clone)]
pub struct SanitizeLonLat {
    lat: String,
    lon: String,
}

impl SanitizeLonLat {
    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lon: lon.into(),
        }
    }
}

impl Default for SanitizeLonLat {
    fn default() -> Self {
        Self::new("lat", "lon")
    }
}

impl TransformStep for SanitizeLonLat {
    fn name(&self) -> &str {
        "SanitizeLonLat"
    }

    fn description(&self) -> String {
        "Drop row when both longitude & latitude equal 0. Drop unrealistic longitude & latitude values. Convert longitude & latitude `,` separator to `.` separator."
            .to_string()
    }

    fn apply(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut notes = Vec::new();
        for (group, table) in ctx.dataset.iter_mut() {
            if !table.has_column(&self.lat) || !table.has_column(&self.lon) {
                notes.push(format!(
                    "Group '{}' lacks '{}'/'{}' columns",
                    group, self.lat, self.lon
                ));
                continue;
            }
            for column in [&self.lat, &self.lon] {
                table.map_column(column, column, |v| Value::from(v.as_f64()));
            }
            let dropped = table.retain_rows(|t, i| {
                let lat = t.value(i, &self.lat).as_f64();
                let lon = t.value(i, &self.lon).as_f64();
                match (lat, lon) {
                    (Some(lat), Some(lon)) => {
                        lat.abs() <= 90.0 && lon.abs() <= 180.0 && !(lat == 0.0 && lon == 0.0)
                    }
                    _ => false,
                }
            });
            if dropped > 0 {
                notes.push(format!("{} rows with invalid coordinates dropped from '{}'", dropped, group));
            }
        }
        for note in notes {
            ctx.note(note);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TransformLog;
    use crate::table::{Dataset, SEAWATER};

    fn run(step: &mut dyn TransformStep, ds: &mut Dataset) -> TransformLog {
        let mut log = TransformLog::new();
        step.apply(&mut StepContext::new(ds, &mut log, "test")).unwrap();
        log
    }

    #[test]
    fn test_ddmm_to_dd() {
        assert!((ddmm_to_dd(1030.0) - 10.5).abs() < 1e-9);
        assert!((ddmm_to_dd(-5430.6) - -54.51).abs() < 1e-9);
        assert_eq!(parse_ddmm("10 30"), Some(10.5));
        assert_eq!(parse_ddmm("-10 30"), Some(-10.5));
        assert_eq!(parse_ddmm("1030"), Some(10.5));
        assert_eq!(parse_ddmm("10 75"), None);
        assert_eq!(parse_ddmm("north"), None);
    }

    #[test]
    fn test_coordinate_precedence() {
        let table = Table::from_rows(
            ["LAT (dddddd)", "LAT (ddmmmm)", "LON (dddddd)", "LON (ddmmmm)"],
            vec![
                vec![Value::Number(54.1), Value::Missing, Value::Number(12.5), "10 30".into()],
                vec![Value::Number(54.2), Value::Missing, Value::Number(0.0), "10 30".into()],
                vec![Value::Number(54.3), Value::Missing, Value::Missing, Value::Missing],
                vec![Value::Missing, Value::Number(5430.0), Value::Missing, Value::Number(1030.0)],
            ],
        );
        let mut ds = Dataset::new().with_group(SEAWATER, table);
        let log = run(&mut ParseCoordinates, &mut ds);

        let t = ds.get(SEAWATER).unwrap();
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.value(0, "lon"), &Value::Number(12.5));
        assert_eq!(t.value(1, "lon"), &Value::Number(10.5));
        assert_eq!(t.value(2, "lat"), &Value::Number(54.5));
        assert_eq!(t.value(2, "lon"), &Value::Number(10.5));
        assert_eq!(log.notes().len(), 1);
    }

    #[test]
    fn test_sanitize_lon_lat() {
        let table = Table::from_rows(
            ["lat", "lon"],
            vec![
                vec!["54,5".into(), Value::Number(12.0)],
                vec![Value::Number(95.0), Value::Number(12.0)],
                vec![Value::Number(0.0), Value::Number(0.0)],
                vec![Value::Number(-33.0), Value::Number(-181.0)],
            ],
        );
        let mut ds = Dataset::new().with_group(SEAWATER, table);
        run(&mut SanitizeLonLat::default(), &mut ds);

        let t = ds.get(SEAWATER).unwrap();
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.value(0, "lat"), &Value::Number(54.5));
    }
}
