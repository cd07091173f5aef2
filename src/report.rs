use crate::engine::ProcessStats;
use crate::record::DebtRecord;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// How many of the largest debts the report lists individually.
const TOP_DEBTS: usize = 10;

/// Per-year slice of the roll used by the breakdown section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct YearBucket {
    pub records: usize,
    pub total: f64,
}

/// Aggregated view of one processing run, rendered through Display as the
/// report printed at the end of a run.
pub struct Summary {
    stats: ProcessStats,
    record_count: usize,
    unique_taxpayers: usize,
    total_amount: f64,
    mean_amount: f64,
    min_amount: f64,
    max_amount: f64,
    by_year: BTreeMap<u32, YearBucket>,
    top_debts: Vec<(String, f64)>,
}

impl Summary {
    /// Aggregates the cleaned records and the ingestion counters into a
    /// printable summary.
    pub fn new(records: &[DebtRecord], stats: ProcessStats) -> Self {
        let record_count = records.len();
        let unique_taxpayers = records
            .iter()
            .map(|record| record.taxpayer_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let total_amount: f64 = records.iter().map(|record| record.amount).sum();
        let mean_amount = if record_count == 0 {
            0.0
        } else {
            total_amount / record_count as f64
        };
        let min_amount = records
            .iter()
            .map(|record| record.amount)
            .reduce(f64::min)
            .unwrap_or(0.0);
        let max_amount = records
            .iter()
            .map(|record| record.amount)
            .reduce(f64::max)
            .unwrap_or(0.0);

        // Records without a usable year would all pile up under 0 and say
        // nothing, so the breakdown leaves them out.
        let mut by_year: BTreeMap<u32, YearBucket> = BTreeMap::new();
        for record in records {
            if record.year == 0 {
                continue;
            }
            let bucket = by_year.entry(record.year).or_default();
            bucket.records += 1;
            bucket.total += record.amount;
        }

        let mut top_debts: Vec<(String, f64)> = records
            .iter()
            .map(|record| (record.taxpayer_id.clone(), record.amount))
            .collect();
        top_debts.sort_by(|a, b| b.1.total_cmp(&a.1));
        top_debts.truncate(TOP_DEBTS);

        Self {
            stats,
            record_count,
            unique_taxpayers,
            total_amount,
            mean_amount,
            min_amount,
            max_amount,
            by_year,
            top_debts,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== PROCESSING REPORT ===")?;
        writeln!(f, "lines processed:  {}", self.stats.lines_processed)?;
        writeln!(f, "stray headers:    {}", self.stats.stray_headers)?;
        writeln!(f, "valid records:    {}", self.stats.valid_records)?;
        writeln!(f, "unique records:   {}", self.record_count)?;
        writeln!(f, "unique taxpayers: {}", self.unique_taxpayers)?;
        writeln!(
            f,
            "skipped:          {} ({} malformed, {} filtered, {} duplicates)",
            self.stats.skipped(),
            self.stats.malformed,
            self.stats.filtered,
            self.stats.duplicates
        )?;
        writeln!(f, "total debt:       {}", format_currency(self.total_amount))?;
        writeln!(f, "average debt:     {}", format_currency(self.mean_amount))?;
        writeln!(f, "largest debt:     {}", format_currency(self.max_amount))?;
        writeln!(f, "smallest debt:    {}", format_currency(self.min_amount))?;

        if !self.by_year.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== BREAKDOWN BY YEAR ===")?;
            for (year, bucket) in &self.by_year {
                writeln!(
                    f,
                    "{}: {} records - {}",
                    year,
                    bucket.records,
                    format_currency(bucket.total)
                )?;
            }
        }

        if !self.top_debts.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== TOP {} LARGEST DEBTS ===", TOP_DEBTS)?;
            for (rank, (taxpayer, amount)) in self.top_debts.iter().enumerate() {
                writeln!(f, "{:>2}. {} - {}", rank + 1, taxpayer, format_currency(*amount))?;
            }
        }

        Ok(())
    }
}

/// Renders an amount as `R$ 1,234,567.89`, grouping the whole part in
/// threes and always showing two cent digits.
fn format_currency(value: f64) -> String {
    let cents = (value * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("R$ {}.{:02}", grouped, fraction)
}
