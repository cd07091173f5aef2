/// Character that toggles quoted mode while scanning a line.
const QUOTE: char = '"';

/// Splits one raw line of the export into trimmed field tokens.
///
/// The scanner has exactly two states: inside or outside a quoted segment.
/// A quote character flips the state and is never part of a token; while
/// quoted, the delimiter is literal content rather than a separator. There
/// is no escaped-quote form in this export. A line ending with an open
/// quote flushes whatever was collected so far, so unbalanced quotes lose
/// no data.
///
/// Trailing empty tokens are dropped. Interior empty tokens are kept so
/// that later fields stay at their expected positions.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in line.chars() {
        if ch == QUOTE {
            quoted = !quoted;
        } else if ch == delimiter && !quoted {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    fields.push(current.trim().to_string());

    while fields.last().map_or(false, |field| field.is_empty()) {
        fields.pop();
    }

    fields
}
