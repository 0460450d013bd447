//! Raw provider series -> ordered time series.

use chrono::NaiveDate;

use crate::domain::{RawSeries, SeriesOrder, TimeSeries, TimeSeriesPoint};
use crate::error::DateParseError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a series key as a strict `YYYY-MM-DD` date.
///
/// Unpadded forms like `2024-1-5` are rejected even though chrono would
/// accept them.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, DateParseError> {
    let bytes = key.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(DateParseError {
            key: key.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        });
    }
    NaiveDate::parse_from_str(key, DATE_FORMAT).map_err(|e| DateParseError {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Order a raw series chronologically.
///
/// All-or-nothing: if any key fails to parse, nothing is sorted and the entries
/// come back in provider order tagged [`SeriesOrder::Insertion`]. Equal dates
/// keep their relative order.
pub fn normalize(raw: &RawSeries) -> TimeSeries {
    match parse_all(raw) {
        Ok(mut points) => {
            points.sort_by_key(|p| p.date);
            tracing::debug!(stage = "normalize", points = points.len(), "series sorted");
            TimeSeries {
                order: SeriesOrder::Chronological,
                points,
            }
        }
        Err(err) => {
            tracing::warn!(
                stage = "normalize",
                error = %err,
                entries = raw.len(),
                "date parse failure, keeping provider order"
            );
            TimeSeries {
                order: SeriesOrder::Insertion,
                points: raw
                    .iter()
                    .map(|entry| TimeSeriesPoint {
                        label: entry.key.clone(),
                        date: None,
                        value: entry.value,
                    })
                    .collect(),
            }
        }
    }
}

fn parse_all(raw: &RawSeries) -> Result<Vec<TimeSeriesPoint>, DateParseError> {
    raw.iter()
        .map(|entry| {
            let date = parse_date_key(&entry.key)?;
            Ok(TimeSeriesPoint {
                label: entry.key.clone(),
                date: Some(date),
                value: entry.value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawEntry;

    fn raw(entries: &[(&str, f64)]) -> RawSeries {
        entries
            .iter()
            .map(|(k, v)| RawEntry {
                key: k.to_string(),
                value: Some(*v),
            })
            .collect()
    }

    fn values(series: &TimeSeries) -> Vec<Option<f64>> {
        series.points.iter().map(|p| p.value).collect()
    }

    fn labels(series: &TimeSeries) -> Vec<&str> {
        series.points.iter().map(|p| p.label.as_str()).collect()
    }

    #[test]
    fn sorts_ascending_by_date() {
        let series = normalize(&raw(&[
            ("2024-01-05", 10.0),
            ("2024-01-01", 5.0),
            ("2024-01-10", 20.0),
        ]));
        assert_eq!(series.order, SeriesOrder::Chronological);
        assert_eq!(labels(&series), vec!["2024-01-01", "2024-01-05", "2024-01-10"]);
        assert_eq!(values(&series), vec![Some(5.0), Some(10.0), Some(20.0)]);
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn one_bad_key_keeps_everything_in_provider_order() {
        let series = normalize(&raw(&[("2024-01-05", 10.0), ("not-a-date", 5.0)]));
        assert_eq!(series.order, SeriesOrder::Insertion);
        assert_eq!(labels(&series), vec!["2024-01-05", "not-a-date"]);
        assert!(series.points.iter().all(|p| p.date.is_none()));

        let series = normalize(&raw(&[
            ("2024-03-01", 3.0),
            ("2024-01-01", 1.0),
            ("2024-2-1", 2.0),
        ]));
        assert_eq!(series.order, SeriesOrder::Insertion);
        assert_eq!(labels(&series), vec!["2024-03-01", "2024-01-01", "2024-2-1"]);
    }

    #[test]
    fn missing_values_still_take_part_in_ordering() {
        let mut input = raw(&[("2024-01-05", 10.0), ("2024-01-01", 5.0)]);
        input.insert(
            1,
            RawEntry {
                key: "totals".to_string(),
                value: None,
            },
        );
        let series = normalize(&input);
        assert_eq!(series.order, SeriesOrder::Insertion);
        assert_eq!(labels(&series), vec!["2024-01-05", "totals", "2024-01-01"]);
        assert_eq!(values(&series), vec![Some(10.0), None, Some(5.0)]);

        input[1].key = "2024-01-03".to_string();
        let series = normalize(&input);
        assert_eq!(series.order, SeriesOrder::Chronological);
        assert_eq!(values(&series), vec![Some(5.0), None, Some(10.0)]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let series = normalize(&RawSeries::new());
        assert!(series.is_empty());
        assert_eq!(series.order, SeriesOrder::Chronological);
    }

    #[test]
    fn duplicate_dates_are_kept_in_relative_order() {
        let series = normalize(&raw(&[
            ("2024-02-01", 2.0),
            ("2024-01-01", 1.0),
            ("2024-02-01", 3.0),
        ]));
        assert_eq!(values(&series), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn date_keys_are_strict() {
        assert!(parse_date_key("2024-02-29").is_ok());
        for bad in [
            "2023-02-29",
            "2024-1-05",
            "2024/01/05",
            " 2024-01-05",
            "2024-01-05T00:00",
            "",
            "+024-01-05",
        ] {
            assert!(parse_date_key(bad).is_err(), "{bad:?}");
        }
    }
}
