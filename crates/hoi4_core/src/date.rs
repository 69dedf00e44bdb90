//! Rewrites the raw hour counters of a decoded gamestate into calendar dates
//! and drops quotes the binary encoding adds around keys and ids.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, TimeDelta, Timelike};
use regex::Regex;

/// Key substrings whose integer values may hold an hour counter.
pub const DATE_KEYS: [&str; 4] = ["date", "expire", "trade", "next_weather_change"];

/// Smallest hour counter that still maps to a representable calendar date.
/// Anything below is an unrelated number that merely sits under a date-like key.
pub const DATE_THRESHOLD: i64 = 43_808_760;

/// Hour counter of the game's reference instant, 1936.1.1.12.
pub const REFERENCE_HOUR: i64 = 60_759_371;

const HOURS_PER_YEAR: i64 = 24 * 365;
const ANCHOR_YEAR: i32 = 2002;
const BASE_YEAR: i64 = 1936;

/// Returns the canonical filestring for a raw one.
pub fn decorate(raw: &str) -> String {
    let mut filestring = raw.to_string();
    for (key, pattern) in DATE_KEYS.iter().zip(date_patterns()) {
        filestring = replace_dates(&filestring, key, pattern);
    }

    let filestring = quoted_key_pattern().replace_all(&filestring, "${1} =");
    id_value_pattern()
        .replace_all(&filestring, " id = ${1}")
        .into_owned()
}

/// Converts an in-game hour counter to `year.month.day.hour`.
///
/// Years are counted as flat 365-day blocks; only the remainder is laid onto
/// a real calendar anchored at 2002-01-01T12:00, so leap days of the anchor
/// never shift the month and day. Returns `None` when the result does not fit
/// a four-digit year.
pub fn game_date(hours: i64) -> Option<String> {
    let delta = hours.checked_sub(REFERENCE_HOUR)?;
    let years = delta.div_euclid(HOURS_PER_YEAR);
    let extra_hours = delta.rem_euclid(HOURS_PER_YEAR);

    let anchor = NaiveDate::from_ymd_opt(ANCHOR_YEAR, 1, 1)?.and_hms_opt(12, 0, 0)?;
    let intermediate = anchor.checked_add_signed(TimeDelta::hours(extra_hours))?;

    let year = BASE_YEAR
        .checked_add(years)?
        .checked_add(i64::from(intermediate.year() - ANCHOR_YEAR))?;
    if !(1..=9999).contains(&year) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        intermediate.month(),
        intermediate.day(),
    )?;

    Some(format!(
        "{:04}.{}.{}.{}",
        date.year(),
        date.month(),
        date.day(),
        intermediate.hour()
    ))
}

fn replace_dates(filestring: &str, key: &str, pattern: &Regex) -> String {
    // Collect every splice against the untouched string first; offsets would
    // shift if the string were edited while matching.
    let mut substitutions = Vec::new();
    for caps in pattern.captures_iter(filestring) {
        let Some(number) = caps.get(2) else {
            continue;
        };
        let Some(date) = date_replacement(number.as_str()) else {
            continue;
        };
        let replacement = match date {
            Some(date) => format!("\"{date}\""),
            None => {
                tracing::warn!(
                    key,
                    field = caps.get(1).map_or("", |m| m.as_str()),
                    value = number.as_str(),
                    "hour counter does not map to a calendar date"
                );
                format!("\"INVALID_DATE_{}\"", number.as_str())
            }
        };
        substitutions.push((number.start(), number.end(), replacement));
    }
    if substitutions.is_empty() {
        return filestring.to_string();
    }

    let mut out = String::with_capacity(filestring.len() + substitutions.len() * 8);
    let mut end = 0;
    for (start, stop, replacement) in substitutions {
        out.push_str(&filestring[end..start]);
        out.push_str(&replacement);
        end = stop;
    }
    out.push_str(&filestring[end..]);
    out
}

/// `None` leaves the number as it is; `Some(None)` marks an hour counter with
/// no calendar date.
fn date_replacement(number: &str) -> Option<Option<String>> {
    // Non-ASCII digits never reach the threshold comparison.
    if !number.is_ascii() {
        return None;
    }
    let hours = match number.parse::<i64>() {
        Ok(v) if v < DATE_THRESHOLD => return None,
        Ok(v) => Some(v),
        // Too wide for i64: far below the threshold when negative, otherwise
        // certainly past the last representable year.
        Err(_) if number.starts_with('-') => return None,
        Err(_) => None,
    };
    Some(hours.and_then(game_date))
}

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DATE_KEYS
            .iter()
            .map(|key| {
                Regex::new(&format!(r"([^\s]*{}[^\s]*) = (-?\d+)", regex::escape(key)))
                    .expect("date key pattern is valid")
            })
            .collect()
    })
}

fn quoted_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""([a-zA-Z0-9_^]+)" ="#).expect("key pattern is valid"))
}

fn id_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#" id = "(.+?)""#).expect("id pattern is valid"))
}

#[cfg(test)]
mod tests {
    use super::{DATE_THRESHOLD, REFERENCE_HOUR, decorate, game_date};

    #[test]
    fn reference_hour_is_the_anchor_date() {
        assert_eq!(game_date(REFERENCE_HOUR).as_deref(), Some("1936.1.1.12"));
    }

    #[test]
    fn hours_roll_over_days_and_years() {
        assert_eq!(game_date(REFERENCE_HOUR + 12).as_deref(), Some("1936.1.2.0"));
        assert_eq!(
            game_date(REFERENCE_HOUR + 24 * 365).as_deref(),
            Some("1937.1.1.12")
        );
        // Second half of a year crosses the anchor's own year boundary.
        assert_eq!(
            game_date(REFERENCE_HOUR + 24 * 364 + 13).as_deref(),
            Some("1937.1.1.1")
        );
    }

    #[test]
    fn negative_deltas_floor_to_the_previous_year() {
        assert_eq!(game_date(REFERENCE_HOUR - 1).as_deref(), Some("1936.1.1.11"));
        assert_eq!(
            game_date(REFERENCE_HOUR - 24).as_deref(),
            Some("1935.12.31.12")
        );
    }

    #[test]
    fn year_is_padded_to_four_digits() {
        let year_999 = REFERENCE_HOUR - (1936 - 999) * 24 * 365;
        assert_eq!(game_date(year_999).as_deref(), Some("0999.1.1.12"));
    }

    #[test]
    fn years_past_9999_are_not_representable() {
        assert_eq!(game_date(REFERENCE_HOUR + (10_000 - 1936) * 24 * 365), None);
        assert_eq!(game_date(i64::MAX), None);
    }

    #[test]
    fn decorate_rewrites_date_fields() {
        let raw = format!("date = {REFERENCE_HOUR} start_date = {}", REFERENCE_HOUR + 12);
        assert_eq!(
            decorate(&raw),
            "date = \"1936.1.1.12\" start_date = \"1936.1.2.0\""
        );
    }

    #[test]
    fn values_below_threshold_are_untouched() {
        let raw = format!("date = {} expire = 5", DATE_THRESHOLD - 1);
        assert_eq!(decorate(&raw), raw);
    }

    #[test]
    fn unrepresentable_dates_become_placeholders() {
        let raw = "trade = 999999999999 date = 99999999999999999999999";
        assert_eq!(
            decorate(raw),
            "trade = \"INVALID_DATE_999999999999\" \
             date = \"INVALID_DATE_99999999999999999999999\""
        );
        assert_eq!(
            decorate("trade = 999999999999 x = 1"),
            "trade = \"INVALID_DATE_999999999999\" x = 1"
        );
    }

    #[test]
    fn non_ascii_digits_are_untouched() {
        let raw = "date = \u{0663} expire = 4\u{0663}";
        assert_eq!(decorate(raw), raw);
    }

    #[test]
    fn hugely_negative_values_are_untouched() {
        let raw = "date = -99999999999999999999999";
        assert_eq!(decorate(raw), raw);
    }

    #[test]
    fn all_date_keys_are_decorated() {
        let raw = format!(
            "expire = {h} trade_deal = {h} next_weather_change = {h} other = {h}",
            h = REFERENCE_HOUR
        );
        assert_eq!(
            decorate(&raw),
            "expire = \"1936.1.1.12\" trade_deal = \"1936.1.1.12\" \
             next_weather_change = \"1936.1.1.12\" other = 60759371"
        );
    }

    #[test]
    fn quoted_keys_and_ids_are_unquoted() {
        let raw = "\"ENG\" = { id = \"123\" name = \"Winston\" }";
        assert_eq!(decorate(raw), "ENG = { id = 123 name = \"Winston\" }");
    }

    #[test]
    fn plain_text_dates_pass_through() {
        let raw = "date=\"1936.1.1.12\"\nplayer=\"ENG\"";
        assert_eq!(decorate(raw), raw);
    }
}
