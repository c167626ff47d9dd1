//! WebVTT cue timestamps as integer milliseconds.

/// Parses `[[hours:]minutes:]seconds[.fraction]` into milliseconds.
///
/// Fractions longer than three digits are truncated, shorter ones padded, so
/// `1.5` is 1500 ms. Returns `None` for anything else, including overflow.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };

    let mut fields = [0_i64; 3];
    let mut count = 0;
    for field in whole.split(':') {
        if count == fields.len() {
            return None;
        }
        fields[count] = parse_digits(field)?;
        count += 1;
    }
    let (hours, minutes, seconds) = match count {
        1 => (0, 0, fields[0]),
        2 => (0, fields[0], fields[1]),
        _ => (fields[0], fields[1], fields[2]),
    };

    let millis = match fraction {
        Some(fraction) => {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            fraction
                .bytes()
                .chain(std::iter::repeat(b'0'))
                .take(3)
                .fold(0, |acc, b| acc * 10 + i64::from(b - b'0'))
        }
        None => 0,
    };

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

fn parse_digits(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Renders milliseconds as `HH:MM:SS.mmm`. Hours grow past two digits when
/// needed; negative input renders as zero.
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1000 % 60;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
