use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use regex::Regex;

use crate::error::{AppError, Result};

static CLOCK_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:([0-9]+):)?([0-9]+):)?([0-9]+(?:[.,][0-9]*)?|[.,][0-9]+)\s*$").unwrap()
});

// Units in Finnish, English and Swedish.
static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        ^\s*
        (?P<num> [0-9]+ (?:[.,][0-9]*)? | [.,][0-9]+ ) \s*
        (?:
            (?P<hours> tuntia? | hours? | timm(?:e|ar) | t | hr | h )
          | (?P<minutes> minuuttia? | minutes? | minut(?:er)? | min | m )
          | (?P<seconds> sekuntia? | seconds? | sekund(?:er)? | se[kc] | s )
        )
        \s*
        (?: (?:ja|and|och)\b | [,;+] )?
        \s*
        ",
    )
    .unwrap()
});

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parses a start or end time. Values without an offset are local time;
/// a bare time of day refers to the day of `now`.
pub fn parse_time(value: &str, now: DateTime<Local>) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(now.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
                .map(|time| now.date_naive().and_time(time))
        })
        .ok_or_else(|| AppError::InvalidTime(value.to_owned()))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::InvalidTime(value.to_owned()))
}

/// Parses a capture duration, either clock style (`hh:mm:ss[.sss]`, `hh:mm`,
/// `ss[.sss]`) or as unit phrases (`1h 30m`, `2 tuntia ja 15 minuuttia`).
pub fn parse_duration(value: &str) -> Result<TimeDelta> {
    let invalid = || AppError::InvalidDuration(value.to_owned());

    let seconds = if let Some(caps) = CLOCK_DURATION.captures(value) {
        let number = |i: usize| caps.get(i).map(|m| m.as_str());
        match (number(1), number(2), number(3)) {
            // hh:mm
            (None, Some(hours), Some(minutes)) => {
                let hours: u64 = hours.parse().map_err(|_| invalid())?;
                let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
                (hours as f64) * 3600.0 + (minutes as f64) * 60.0
            }
            (hours, minutes, Some(seconds)) => {
                let hours: u64 = hours.unwrap_or("0").parse().map_err(|_| invalid())?;
                let minutes: u64 = minutes.unwrap_or("0").parse().map_err(|_| invalid())?;
                (hours as f64) * 3600.0 + (minutes as f64) * 60.0 + decimal(seconds).ok_or_else(invalid)?
            }
            _ => return Err(invalid()),
        }
    } else {
        let mut rest = value;
        let mut total = 0.0;
        let mut parts = 0;
        while !rest.trim().is_empty() {
            let caps = DURATION_PART.captures(rest).ok_or_else(invalid)?;
            let num = decimal(&caps["num"]).ok_or_else(invalid)?;
            let unit = if caps.name("hours").is_some() {
                3600.0
            } else if caps.name("minutes").is_some() {
                60.0
            } else {
                1.0
            };
            total += num * unit;
            parts += 1;
            rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
        }
        if parts == 0 {
            return Err(invalid());
        }
        total
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros > i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(TimeDelta::microseconds(micros as i64))
}

/// Decimal number with either `.` or `,` as separator.
fn decimal(value: &str) -> Option<f64> {
    value.replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap()
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn now_is_now() {
        assert_eq!(parse_time("now", now()).unwrap(), now().with_timezone(&Utc));
        assert_eq!(parse_time(" NOW ", now()).unwrap(), now().with_timezone(&Utc));
    }

    #[test]
    fn explicit_offsets_are_honoured() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap();
        assert_eq!(parse_time("2024-03-10T12:30:00+02:00", now()).unwrap(), expected);
        assert_eq!(parse_time("2024-03-10T10:30:00Z", now()).unwrap(), expected);
    }

    #[test]
    fn local_date_times() {
        assert_eq!(
            parse_time("2024-03-09 21:15", now()).unwrap(),
            local(2024, 3, 9, 21, 15, 0)
        );
        assert_eq!(
            parse_time("2024-03-09T21:15:30", now()).unwrap(),
            local(2024, 3, 9, 21, 15, 30)
        );
        assert_eq!(
            parse_time("9.3.2024 21:15", now()).unwrap(),
            local(2024, 3, 9, 21, 15, 0)
        );
        assert_eq!(parse_time("2024-03-09", now()).unwrap(), local(2024, 3, 9, 0, 0, 0));
    }

    #[test]
    fn time_of_day_is_today() {
        assert_eq!(parse_time("17:45", now()).unwrap(), local(2024, 3, 10, 17, 45, 0));
        assert_eq!(parse_time("06:05:04", now()).unwrap(), local(2024, 3, 10, 6, 5, 4));
    }

    #[test]
    fn garbage_time_is_rejected() {
        assert!(matches!(
            parse_time("yesterday-ish", now()),
            Err(AppError::InvalidTime(_))
        ));
    }

    #[test]
    fn clock_durations() {
        assert_eq!(parse_duration("01:02:03.5").unwrap(), TimeDelta::milliseconds(3_723_500));
        assert_eq!(parse_duration("1:30").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration("90").unwrap(), TimeDelta::seconds(90));
        assert_eq!(parse_duration("2,5").unwrap(), TimeDelta::milliseconds(2_500));
        assert_eq!(parse_duration(".25").unwrap(), TimeDelta::milliseconds(250));
    }

    #[test]
    fn unit_phrases() {
        assert_eq!(parse_duration("1h 2m 3s").unwrap(), TimeDelta::seconds(3_723));
        assert_eq!(parse_duration("1 hour 30 minutes").unwrap(), TimeDelta::minutes(90));
        assert_eq!(
            parse_duration("2 tuntia ja 15 minuuttia").unwrap(),
            TimeDelta::minutes(135)
        );
        assert_eq!(
            parse_duration("1 timme och 5 sekunder").unwrap(),
            TimeDelta::seconds(3_605)
        );
        assert_eq!(parse_duration("1,5h").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration("45 MIN, 30 sec").unwrap(), TimeDelta::seconds(2_730));
    }

    #[test]
    fn malformed_durations_are_rejected() {
        for value in ["", "   ", "abc", "1:30.5", "1h abc", "-5", "1:2:3:4"] {
            assert!(
                matches!(parse_duration(value), Err(AppError::InvalidDuration(_))),
                "{value:?}"
            );
        }
    }
}
