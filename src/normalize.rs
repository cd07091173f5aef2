use chrono::NaiveDate;

/// Date formats accepted by [`normalize_date`], attempted in order.
///
/// Listing `%d/%m/%Y` ahead of `%m/%d/%Y` pins the day-first reading for
/// ambiguous dates such as `03/04/2020`; the month-first formats still
/// apply whenever the day-first parse fails, e.g. a value greater than 12
/// in the month position.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%m-%d-%Y"];

/// Converts a free-form monetary string into a non-negative magnitude.
///
/// The export writes amounts like `R$ 1.234,56`: an optional currency
/// marker, `.` as the thousands separator and a decimal comma. Cleanup
/// strips the marker characters and whitespace, removes every `.` and
/// turns the remaining commas into decimal points before parsing.
///
/// This function never reports an error to the caller. Input that fails
/// to parse after cleanup coerces to `0.0`, and so does anything negative
/// or non-finite, keeping the magnitude invariant intact.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, 'R' | '$' | '.') && !ch.is_whitespace())
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// Normalizes the mixed date formats seen in the export to `YYYY-MM-DD`.
///
/// Any time-of-day suffix (space- or `T`-separated) is cut off first, then
/// every format in [`DATE_FORMATS`] is attempted in order and the first
/// successful parse wins. Input matching none of them yields the empty
/// string, so the column is either canonical or visibly absent.
pub fn normalize_date(raw: &str) -> String {
    let date_part = raw
        .split(|ch: char| ch == ' ' || ch == 'T')
        .next()
        .unwrap_or("");
    if date_part.is_empty() {
        return String::new();
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    String::new()
}
