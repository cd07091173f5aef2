use crate::errors::RecordError;
use crate::normalize::{normalize_date, parse_amount};
use serde::{Serialize, Serializer};

/// Minimum number of fields a line must carry to be mapped onto a record.
pub const MIN_FIELDS: usize = 5;

/// Label assigned when the export carries no sheet column for a record.
pub const DEFAULT_SHEET_TAB: &str = "Folha1";

/// A cleaned entry of the municipal active-debt roll.
///
/// Field order matches the output column order, so serializing a record
/// yields the documented header layout. Records are built once and never
/// mutated afterwards.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DebtRecord {
    /// Identifier of the debtor exactly as present in the export, trimmed.
    pub taxpayer_id: String,

    /// Total amount owed, in currency units. Never negative.
    #[serde(serialize_with = "serialize_amount")]
    pub amount: f64,

    /// Raw installment markers, possibly several separated by `|`.
    pub installments_added: String,

    /// Raw per-installment values, passed through untouched.
    pub installments_values: String,

    /// Entry date in `YYYY-MM-DD` form, or empty when unparsable/absent.
    pub entry_date: String,

    /// Fiscal year of the debt; `0` when absent or non-numeric.
    pub year: u32,

    /// Originating sheet/tab label of the record.
    pub sheet_tab: String,

    /// Number of `|`-separated markers in `installments_added`, at least 1.
    pub installment_count: usize,
}

impl DebtRecord {
    /// Builds a record from the tokenized fields of one line.
    ///
    /// The mapping is positional and mirrors the source export:
    /// `[0]` taxpayer id, `[1]` amount, `[2]` installments added,
    /// `[3]` installment values, `[4]` entry date, `[5]` year,
    /// `[6]` a duplicate of the year column (ignored), `[7]` sheet tab.
    /// Positions from 5 onward are optional; they and empty tokens fall
    /// back to defaults. Anything shorter than [`MIN_FIELDS`] is rejected.
    ///
    /// Field coercion cannot fail: the normalizers fall back to their
    /// documented defaults, so a short line is the only rejection cause.
    pub fn from_fields(fields: &[String]) -> Result<Self, RecordError> {
        if fields.len() < MIN_FIELDS {
            return Err(RecordError::TooFewFields(fields.len()));
        }

        let installments_added = field_or(fields, 2, "1").to_string();
        let installment_count = count_installments(&installments_added);

        Ok(Self {
            taxpayer_id: fields[0].clone(),
            amount: parse_amount(&fields[1]),
            installments_added,
            installments_values: fields[3].clone(),
            entry_date: normalize_date(&fields[4]),
            year: parse_year(field_or(fields, 5, "")),
            // Field 6 duplicates the year column in the export and is
            // deliberately ignored.
            sheet_tab: field_or(fields, 7, DEFAULT_SHEET_TAB).to_string(),
            installment_count,
        })
    }

    /// Whether the record survives the validity filter: a debt is only
    /// collectible when it names a taxpayer and carries a positive amount.
    pub fn is_collectible(&self) -> bool {
        !self.taxpayer_id.is_empty() && self.amount > 0.0
    }

    /// The tuple used to detect duplicate entries across the input. The
    /// amount participates through its bit pattern so the key is hashable.
    pub fn identity_key(&self) -> (String, u64, String) {
        (
            self.taxpayer_id.clone(),
            self.amount.to_bits(),
            self.entry_date.clone(),
        )
    }
}

/// Returns the field at `index`, falling back to `default` when the
/// position is absent or holds an empty token.
fn field_or<'a>(fields: &'a [String], index: usize, default: &'a str) -> &'a str {
    match fields.get(index) {
        Some(field) if !field.is_empty() => field,
        _ => default,
    }
}

fn parse_year(raw: &str) -> u32 {
    if raw.chars().all(|ch| ch.is_ascii_digit()) {
        raw.parse().unwrap_or(0)
    } else {
        0
    }
}

fn count_installments(added: &str) -> usize {
    if added.contains('|') {
        added.split('|').count()
    } else {
        1
    }
}

/// Writes integral amounts without a fractional part (`1234`, not
/// `1234.0`). The monetary parser treats `.` as a thousands separator, so
/// this keeps a cleaned file re-readable by the same pipeline.
fn serialize_amount<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if amount.fract() == 0.0 {
        serializer.serialize_u64(*amount as u64)
    } else {
        serializer.serialize_f64(*amount)
    }
}
