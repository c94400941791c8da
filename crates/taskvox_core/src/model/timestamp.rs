use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Reads a stored timestamp. RFC 3339 first; ISO-8601 values without an
/// offset (date-only or local date-time) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(value);
    }

    for format in [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ] {
        if let Ok(value) = PrimitiveDateTime::parse(trimmed, format) {
            return Some(value.assume_utc());
        }
    }

    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
}

#[cfg(test)]
mod tests {
    use super::parse_timestamp;
    use time::macros::datetime;

    #[test]
    fn reads_rfc3339_with_offset() {
        assert_eq!(
            parse_timestamp("2026-01-02T09:00:00+02:00"),
            Some(datetime!(2026-01-02 07:00 UTC))
        );
        assert_eq!(
            parse_timestamp(" 2026-01-02T09:00:00.250Z "),
            Some(datetime!(2026-01-02 09:00:00.25 UTC))
        );
    }

    #[test]
    fn offsetless_values_are_utc() {
        assert_eq!(parse_timestamp("2026-01-02"), Some(datetime!(2026-01-02 0:00 UTC)));
        assert_eq!(
            parse_timestamp("2026-01-02T09:00:00"),
            Some(datetime!(2026-01-02 09:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2026-01-02T09:00:00.500"),
            Some(datetime!(2026-01-02 09:00:00.5 UTC))
        );
        assert_eq!(parse_timestamp("2026-01-02T09:30"), Some(datetime!(2026-01-02 09:30 UTC)));
    }

    #[test]
    fn rejects_free_text() {
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("2026-13-40"), None);
    }
}
