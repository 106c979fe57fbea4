//! Period inference for queries in Russian.
//!
//! `--from`/`--to` flags always win. Otherwise the query text is scanned
//! for relative keywords and month names; with no match the period
//! defaults to the trailing 7 days and the answer carries a hint saying
//! so. All inference happens in the local timezone.

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, TimeZone,
};
use salespilot_core::error::Error;

pub const DEFAULT_PERIOD_DAYS: i64 = 7;

pub const DEFAULT_PERIOD_HINT: &str = "Период не указан, использованы последние 7 дней.";

/// An inclusive local-time period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodRange {
    pub from: DateTime<Local>,
    pub to: DateTime<Local>,
}

/// Resolve the period for a query. Returns the range plus an optional
/// user-facing hint about defaults that were applied.
pub fn resolve(
    query: &str,
    from_flag: Option<&str>,
    to_flag: Option<&str>,
    now: DateTime<Local>,
) -> Result<(PeriodRange, Option<String>), Error> {
    if from_flag.is_some() || to_flag.is_some() {
        return resolve_from_flags(from_flag, to_flag, now).map(|r| (r, None));
    }

    let lower = query.to_lowercase();

    if lower.contains("позавчера") {
        let day = now - Duration::days(2);
        return Ok((
            PeriodRange {
                from: at_start_of_day(day),
                to: at_end_of_day(day),
            },
            None,
        ));
    }
    if lower.contains("вчера") {
        let day = now - Duration::days(1);
        return Ok((
            PeriodRange {
                from: at_start_of_day(day),
                to: at_end_of_day(day),
            },
            None,
        ));
    }
    if lower.contains("сегодня") {
        return Ok((
            PeriodRange {
                from: at_start_of_day(now),
                to: now,
            },
            None,
        ));
    }
    if lower.contains("недел") {
        return Ok((
            PeriodRange {
                from: now - Duration::days(DEFAULT_PERIOD_DAYS),
                to: now,
            },
            None,
        ));
    }

    if let Some(month) = detect_month(&lower) {
        let (year, hint) = match detect_year(&lower) {
            Some(year) => (year, None),
            None => (
                now.year(),
                Some(format!("Год не указан, использован {}.", now.year())),
            ),
        };
        let range = month_range(year, month)?;
        return Ok((range, hint));
    }

    Ok((
        PeriodRange {
            from: now - Duration::days(DEFAULT_PERIOD_DAYS),
            to: now,
        },
        Some(DEFAULT_PERIOD_HINT.to_string()),
    ))
}

fn resolve_from_flags(
    from_flag: Option<&str>,
    to_flag: Option<&str>,
    now: DateTime<Local>,
) -> Result<PeriodRange, Error> {
    let from = match from_flag {
        Some(value) => {
            let date = parse_date(value)
                .map_err(|e| Error::config(format!("invalid --from date: {e}")))?;
            at_start_of_day(local_midnight(date)?)
        }
        None => now - Duration::days(DEFAULT_PERIOD_DAYS),
    };
    let to = match to_flag {
        Some(value) => {
            let date = parse_date(value)
                .map_err(|e| Error::config(format!("invalid --to date: {e}")))?;
            at_end_of_day(local_midnight(date)?)
        }
        None => now,
    };

    if to < from {
        return Err(Error::config("--to must be after --from"));
    }

    Ok(PeriodRange { from, to })
}

fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
}

fn local_midnight(date: NaiveDate) -> Result<DateTime<Local>, Error> {
    let naive = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| Error::config("invalid date"))?;
    // Noon avoids DST ambiguity; the day boundaries are applied after.
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt),
        LocalResult::None => Err(Error::config("date does not exist in local time")),
    }
}

fn month_range(year: i32, month: u32) -> Result<PeriodRange, Error> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::config("invalid month"))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| Error::config("invalid month"))?;
    let last = next_month.pred_opt().ok_or_else(|| Error::config("invalid month"))?;

    Ok(PeriodRange {
        from: at_start_of_day(local_midnight(first)?),
        to: at_end_of_day(local_midnight(last)?),
    })
}

pub(crate) fn at_start_of_day(dt: DateTime<Local>) -> DateTime<Local> {
    resolve_local(dt.date_naive().and_hms_opt(0, 0, 0), dt)
}

pub(crate) fn at_end_of_day(dt: DateTime<Local>) -> DateTime<Local> {
    resolve_local(dt.date_naive().and_hms_opt(23, 59, 59), dt)
}

fn resolve_local(
    naive: Option<chrono::NaiveDateTime>,
    fallback: DateTime<Local>,
) -> DateTime<Local> {
    let Some(naive) = naive else {
        return fallback;
    };
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => fallback,
    }
}

/// Russian month name stems, matched as substrings of the lowercased query.
fn detect_month(lower: &str) -> Option<u32> {
    const STEMS: [(&str, u32); 13] = [
        ("январ", 1),
        ("феврал", 2),
        ("март", 3),
        ("апрел", 4),
        ("мая", 5),
        ("май", 5),
        ("июн", 6),
        ("июл", 7),
        ("август", 8),
        ("сентябр", 9),
        ("октябр", 10),
        ("ноябр", 11),
        ("декабр", 12),
    ];
    STEMS
        .iter()
        .find(|(stem, _)| lower.contains(stem))
        .map(|(_, month)| *month)
}

/// A standalone four-digit year in 2000..=2099.
fn detect_year(lower: &str) -> Option<i32> {
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 && &lower[start..start + 2] == "20" {
                if let Ok(year) = lower[start..i].parse() {
                    return Some(year);
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 8, 25, 15, 30, 0).unwrap()
    }

    #[test]
    fn yesterday_keyword() {
        let (range, hint) = resolve("сколько чеков за вчера?", None, None, fixed_now()).unwrap();
        assert!(hint.is_none());
        assert_eq!(range.from.day(), 24);
        assert_eq!(range.from.hour(), 0);
        assert_eq!(range.to.day(), 24);
        assert_eq!(range.to.hour(), 23);
        assert_eq!(range.to.minute(), 59);
    }

    #[test]
    fn today_keyword_ends_now() {
        let now = fixed_now();
        let (range, hint) = resolve("продажи сегодня", None, None, now).unwrap();
        assert!(hint.is_none());
        assert_eq!(range.from.hour(), 0);
        assert_eq!(range.to, now);
    }

    #[test]
    fn day_before_yesterday_wins_over_yesterday() {
        // "позавчера" contains "вчера"; the longer keyword must match first.
        let (range, _) = resolve("выручка позавчера", None, None, fixed_now()).unwrap();
        assert_eq!(range.from.day(), 23);
        assert_eq!(range.to.day(), 23);
    }

    #[test]
    fn week_keyword_is_trailing_seven_days() {
        let now = fixed_now();
        let (range, hint) = resolve("итоги за неделю", None, None, now).unwrap();
        assert!(hint.is_none());
        assert_eq!(range.to, now);
        assert_eq!(range.from, now - Duration::days(7));
    }

    #[test]
    fn month_with_year() {
        let (range, hint) =
            resolve("продажи за июль 2024", None, None, fixed_now()).unwrap();
        assert!(hint.is_none());
        assert_eq!(range.from.year(), 2024);
        assert_eq!(range.from.month(), 7);
        assert_eq!(range.from.day(), 1);
        assert_eq!(range.to.day(), 31);
    }

    #[test]
    fn month_without_year_hints_current() {
        let (range, hint) = resolve("выручка за март", None, None, fixed_now()).unwrap();
        assert_eq!(hint.as_deref(), Some("Год не указан, использован 2025."));
        assert_eq!(range.from.year(), 2025);
        assert_eq!(range.from.month(), 3);
        assert_eq!(range.to.day(), 31);
    }

    #[test]
    fn february_range_is_month_end() {
        let (range, _) = resolve("продажи за февраль 2024", None, None, fixed_now()).unwrap();
        assert_eq!(range.to.day(), 29);
    }

    #[test]
    fn no_keywords_defaults_with_hint() {
        let now = fixed_now();
        let (range, hint) = resolve("сколько чеков?", None, None, now).unwrap();
        assert_eq!(hint.as_deref(), Some(DEFAULT_PERIOD_HINT));
        assert_eq!(range.to, now);
        assert_eq!(range.from, now - Duration::days(7));
    }

    #[test]
    fn flags_win_over_keywords() {
        let (range, hint) = resolve(
            "продажи за вчера",
            Some("2025-08-01"),
            Some("2025-08-10"),
            fixed_now(),
        )
        .unwrap();
        assert!(hint.is_none());
        assert_eq!(range.from.day(), 1);
        assert_eq!(range.from.hour(), 0);
        assert_eq!(range.to.day(), 10);
        assert_eq!(range.to.hour(), 23);
    }

    #[test]
    fn only_from_flag_defaults_to_now() {
        let now = fixed_now();
        let (range, _) = resolve("q", Some("2025-08-20"), None, now).unwrap();
        assert_eq!(range.from.day(), 20);
        assert_eq!(range.to, now);
    }

    #[test]
    fn invalid_from_flag_is_config_error() {
        let err = resolve("q", Some("25-08-2025"), None, fixed_now()).unwrap_err();
        assert!(err.to_string().contains("invalid --from date"));
    }

    #[test]
    fn inverted_flags_rejected() {
        let err = resolve(
            "q",
            Some("2025-08-10"),
            Some("2025-08-01"),
            fixed_now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--to must be after --from"));
    }

    #[test]
    fn year_detection_scans_digit_runs() {
        assert_eq!(detect_year("продажи за 2024 год"), Some(2024));
        assert_eq!(detect_year("магазин 12345"), None);
        assert_eq!(detect_year("без года"), None);
        assert_eq!(detect_year("в 1999 году"), None);
    }
}
