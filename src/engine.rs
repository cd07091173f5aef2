use crate::errors::ExportError;
use crate::record::DebtRecord;
use crate::report::Summary;
use crate::tokenizer::split_fields;
use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

const DELIMITER: char = ',';

/// First column name of the export's header row. The export repeats its
/// header every few hundred lines, so any line opening with this token is
/// structural noise rather than data.
const HEADER_SENTINEL: &str = "DI_CONTRIBUINTE";

/// Longest slice of an input line echoed into a diagnostic message.
const MAX_EXCERPT: usize = 100;

/// Column layout of both generated files, in record field order.
const OUTPUT_HEADER: [&str; 8] = [
    "taxpayer_id",
    "amount",
    "installments_added",
    "installments_values",
    "entry_date",
    "year",
    "sheet_tab",
    "installment_count",
];

/// Counters describing what happened to every line of one ingestion run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessStats {
    /// Non-blank lines examined.
    pub lines_processed: usize,

    /// Repeated header rows found in the middle of the data.
    pub stray_headers: usize,

    /// Lines with too few fields to map onto a record.
    pub malformed: usize,

    /// Well-formed records dropped for missing a taxpayer id or carrying a
    /// non-positive amount.
    pub filtered: usize,

    /// Records dropped because an earlier record had the same identity.
    pub duplicates: usize,

    /// Records that passed mapping and filtering, counted before
    /// deduplication.
    pub valid_records: usize,
}

impl ProcessStats {
    /// Total number of lines that carried data but produced no output
    /// record. Stray headers are not data and are excluded.
    pub fn skipped(&self) -> usize {
        self.malformed + self.filtered + self.duplicates
    }
}

/// A DebtRoll is responsible for turning the raw lines of an active-debt
/// export into a cleaned, deduplicated, and sorted set of records, keeping
/// count of everything it had to drop along the way.
pub struct DebtRoll {
    records: Vec<DebtRecord>,
    stats: ProcessStats,
}

impl DebtRoll {
    /// Builds a roll from an iterator of raw input lines.
    ///
    /// Each line is tokenized, mapped onto a record, and filtered; problem
    /// lines are reported on stderr and counted rather than aborting the
    /// run. The surviving records come out deduplicated and sorted by
    /// taxpayer id, year, and entry date.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut stats = ProcessStats::default();
        let mut records = Vec::new();

        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            stats.lines_processed += 1;

            let fields = split_fields(line, DELIMITER);
            if fields.first().map(String::as_str) == Some(HEADER_SENTINEL) {
                stats.stray_headers += 1;
                continue;
            }

            // We don't want a single truncated line to stop the whole run,
            // so log a diagnostic and keep moving.
            let record = match DebtRecord::from_fields(&fields) {
                Ok(record) => record,
                Err(err) => {
                    stats.malformed += 1;
                    eprintln!("skipping malformed line ({}): {}", err, excerpt(line));
                    continue;
                }
            };

            if !record.is_collectible() {
                stats.filtered += 1;
                eprintln!(
                    "dropping uncollectible record taxpayer={:?} amount={}",
                    record.taxpayer_id, record.amount
                );
                continue;
            }

            stats.valid_records += 1;
            records.push(record);
        }

        let mut records = dedup_records(records, &mut stats);
        sort_records(&mut records);

        Self { records, stats }
    }

    /// The cleaned records, in output order.
    pub fn records(&self) -> &[DebtRecord] {
        &self.records
    }

    /// The counters gathered while ingesting the input.
    pub fn stats(&self) -> &ProcessStats {
        &self.stats
    }

    /// Attempts to generate the cleaned CSV file contents for all records
    /// in the roll.
    pub fn generate_clean_csv(&self) -> Result<String, ExportError> {
        let mut buf = Vec::new();
        {
            // Create a CSV writer from the buffer we allocated above. The
            // header row is written by hand because the writer only emits
            // headers alongside the first row, and an empty roll must still
            // produce one.
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut buf);
            wtr.write_record(&OUTPUT_HEADER)?;

            // Serialize each of the records to our output buffer.
            for record in &self.records {
                wtr.serialize(record)?;
            }

            // Flush the buffer.
            let _ = wtr.flush();
        }

        // Return the string contents of our buffer, bubbling up any UTF-8
        // encoding errors we encounter.
        Ok(String::from_utf8(buf)?)
    }

    /// Attempts to generate a spreadsheet-friendly rendition of the roll:
    /// semicolon-delimited columns with decimal-comma amounts, the dialect
    /// pt-BR spreadsheet imports expect.
    pub fn generate_spreadsheet_csv(&self) -> Result<String, ExportError> {
        let mut buf = Vec::new();
        {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(b';')
                .has_headers(false)
                .from_writer(&mut buf);
            wtr.write_record(&OUTPUT_HEADER)?;

            for record in &self.records {
                let amount = format!("{:.2}", record.amount).replace('.', ",");
                let year = record.year.to_string();
                let count = record.installment_count.to_string();
                wtr.write_record(&[
                    record.taxpayer_id.as_str(),
                    amount.as_str(),
                    record.installments_added.as_str(),
                    record.installments_values.as_str(),
                    record.entry_date.as_str(),
                    year.as_str(),
                    record.sheet_tab.as_str(),
                    count.as_str(),
                ])?;
            }

            let _ = wtr.flush();
        }

        Ok(String::from_utf8(buf)?)
    }

    /// Aggregates the roll into the human-readable processing summary.
    pub fn summary(&self) -> Summary {
        Summary::new(&self.records, self.stats.clone())
    }
}

/// Drops every record whose identity was already seen, keeping the first
/// occurrence. Input order is preserved for the survivors.
pub fn dedup_records(records: Vec<DebtRecord>, stats: &mut ProcessStats) -> Vec<DebtRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.identity_key()) {
            unique.push(record);
        } else {
            stats.duplicates += 1;
            eprintln!(
                "dropping duplicate entry taxpayer={} date={}",
                record.taxpayer_id, record.entry_date
            );
        }
    }

    unique
}

/// Sorts records by taxpayer id, then year, then entry date. The sort is
/// stable, so records with identical keys keep their input order.
pub fn sort_records(records: &mut [DebtRecord]) {
    records.sort_by(|a, b| {
        a.taxpayer_id
            .cmp(&b.taxpayer_id)
            .then_with(|| a.year.cmp(&b.year))
            .then_with(|| a.entry_date.cmp(&b.entry_date))
    });
}

/// Truncates a line to at most [`MAX_EXCERPT`] bytes for diagnostics,
/// backing off to the nearest character boundary.
fn excerpt(line: &str) -> &str {
    if line.len() <= MAX_EXCERPT {
        return line;
    }

    let mut end = MAX_EXCERPT;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

impl TryFrom<PathBuf> for DebtRoll {
    type Error = Box<dyn Error>;

    /// Attempts to read the export file located at the provided PathBuf and
    /// build a DebtRoll from its contents.
    ///
    /// The first line of the export is a title and never carries data, so
    /// it is skipped unconditionally.
    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        let contents = fs::read_to_string(path)?;

        Ok(Self::from_lines(contents.lines().skip(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn should_build_records_from_well_formed_lines() {
        // Ingest two distinct well-formed lines and verify both survive.
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 100,00\",1,\"100,00\",05/01/2024,2024,2024,Folha1",
            "1002,\"R$ 250,50\",1,\"250,50\",06/01/2024,2024,2024,Folha1",
        ]);

        assert_eq!(roll.records().len(), 2);
        assert_eq!(
            roll.stats(),
            &ProcessStats {
                lines_processed: 2,
                stray_headers: 0,
                malformed: 0,
                filtered: 0,
                duplicates: 0,
                valid_records: 2,
            }
        );
    }

    #[test]
    fn should_skip_headers_short_lines_and_duplicates() {
        // Feed one good line, a repeated header row, an exact duplicate of
        // the good line, and a truncated line.
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 1.234,56\",1,\"1.234,56\",05/01/2024,2024,2024,Folha1",
            "DI_CONTRIBUINTE,VALOR,PARCELAS,VALORES,DATA,ANO,ANO,FOLHA",
            "1001,\"R$ 1.234,56\",1,\"1.234,56\",05/01/2024,2024,2024,Folha2",
            "9,9",
        ]);

        // Only the first data line survives and two data lines were
        // dropped: one malformed, one duplicate.
        assert_eq!(roll.records().len(), 1);
        assert_eq!(roll.stats().skipped(), 2);
        assert_eq!(
            roll.stats(),
            &ProcessStats {
                lines_processed: 4,
                stray_headers: 1,
                malformed: 1,
                filtered: 0,
                duplicates: 1,
                valid_records: 2,
            }
        );
    }

    #[test]
    fn should_ignore_blank_lines() {
        let roll = DebtRoll::from_lines([
            "",
            "   ",
            "1001,\"R$ 100,00\",1,\"100,00\",2024-01-05",
        ]);

        assert_eq!(roll.records().len(), 1);
        assert_eq!(roll.stats().lines_processed, 1);
    }

    #[test]
    fn should_filter_uncollectible_records() {
        // An empty taxpayer id and a zero amount both fail the filter.
        let roll = DebtRoll::from_lines([
            ",\"R$ 100,00\",1,\"100,00\",2024-01-05",
            "1002,\"R$ 0,00\",1,\"0,00\",2024-01-05",
        ]);

        assert!(roll.records().is_empty());
        assert_eq!(roll.stats().filtered, 2);
        assert_eq!(roll.stats().valid_records, 0);
    }

    #[test]
    fn should_keep_the_first_of_two_duplicates() {
        // The two lines share taxpayer, amount, and date but name different
        // sheets. The first one wins.
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 100,00\",1,\"100,00\",05/01/2024,2024,2024,FolhaA",
            "1001,\"R$ 100,00\",1,\"100,00\",05/01/2024,2024,2024,FolhaB",
        ]);

        assert_eq!(roll.records().len(), 1);
        assert_eq!(roll.records()[0].sheet_tab, "FolhaA");
        assert_eq!(roll.stats().duplicates, 1);
    }

    #[test]
    fn should_sort_by_taxpayer_year_and_date() {
        let roll = DebtRoll::from_lines([
            "2002,\"R$ 10,00\",1,\"10,00\",2020-06-01,2020",
            "1001,\"R$ 10,00\",1,\"10,00\",2021-01-01,2021",
            "1001,\"R$ 20,00\",1,\"20,00\",2020-12-31,2020",
            "1001,\"R$ 30,00\",1,\"30,00\",2020-01-15,2020",
        ]);

        let keys: Vec<(&str, u32, &str)> = roll
            .records()
            .iter()
            .map(|r| (r.taxpayer_id.as_str(), r.year, r.entry_date.as_str()))
            .collect();
        assert_eq!(
            keys,
            Vec::from([
                ("1001", 2020, "2020-01-15"),
                ("1001", 2020, "2020-12-31"),
                ("1001", 2021, "2021-01-01"),
                ("2002", 2020, "2020-06-01"),
            ])
        );
    }

    #[test]
    fn should_keep_input_order_for_equal_sort_keys() {
        // Same taxpayer, year, and date but different amounts, so both
        // survive deduplication. A stable sort keeps them in input order.
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 100,00\",1,\"100,00\",2020-01-15,2020",
            "1001,\"R$ 50,00\",1,\"50,00\",2020-01-15,2020",
        ]);

        let amounts: Vec<f64> = roll.records().iter().map(|r| r.amount).collect();
        assert_eq!(amounts, Vec::from([100.0, 50.0]));
    }

    #[test]
    fn should_generate_clean_csv() {
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 1.234,56\",1,\"1.234,56\",05/01/2024,2024,2024,Folha1",
        ]);

        let output = roll.generate_clean_csv().unwrap();
        assert_eq!(
            output,
            "taxpayer_id,amount,installments_added,installments_values,\
             entry_date,year,sheet_tab,installment_count\n\
             1001,1234.56,1,\"1.234,56\",2024-01-05,2024,Folha1,1\n"
        );
    }

    #[test]
    fn should_write_integral_amounts_without_a_fraction() {
        let roll =
            DebtRoll::from_lines(["1001,\"R$ 500,00\",1,\"500,00\",2024-01-05,2024,2024,Folha1"]);

        let output = roll.generate_clean_csv().unwrap();
        assert!(output.contains("1001,500,1,"));
    }

    #[test]
    fn should_emit_the_header_for_an_empty_roll() {
        let roll = DebtRoll::from_lines(Vec::new());

        assert_eq!(
            roll.generate_clean_csv().unwrap(),
            "taxpayer_id,amount,installments_added,installments_values,\
             entry_date,year,sheet_tab,installment_count\n"
        );
    }

    #[test]
    fn should_generate_spreadsheet_csv() {
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 1.234,56\",1,\"1.234,56\",05/01/2024,2024,2024,Folha1",
        ]);

        let output = roll.generate_spreadsheet_csv().unwrap();
        assert_eq!(
            output,
            "taxpayer_id;amount;installments_added;installments_values;\
             entry_date;year;sheet_tab;installment_count\n\
             1001;1234,56;1;1.234,56;2024-01-05;2024;Folha1;1\n"
        );
    }

    #[test]
    fn should_reingest_its_own_clean_output() {
        // Integral amounts print without a fractional part, so a cleaned
        // file parses back to the same values it was written from.
        let roll = DebtRoll::from_lines([
            "1001,\"R$ 1.234,00\",1,\"1.234,00\",05/01/2024,2024,2024,Folha1",
            "1002,\"R$ 500,00\",1,\"500,00\",06/01/2024,2024,2024,Folha1",
        ]);
        let output = roll.generate_clean_csv().unwrap();

        // Ingest the generated file again, skipping its header row the way
        // the file loader skips the export title.
        let again = DebtRoll::from_lines(output.lines().skip(1));

        assert_eq!(again.records().len(), roll.records().len());
        assert_eq!(again.stats().skipped(), 0);
        for (a, b) in roll.records().iter().zip(again.records()) {
            assert_eq!(a.taxpayer_id, b.taxpayer_id);
            assert_eq!(a.amount, b.amount);
            assert_eq!(a.entry_date, b.entry_date);
            assert_eq!(a.year, b.year);
        }
    }

    #[test]
    fn should_load_a_roll_from_a_file() {
        // Write an export with a title line and one data line, then load it
        // through the path-based constructor.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ACTIVE DEBT EXPORT 2024").unwrap();
        writeln!(
            file,
            "1001,\"R$ 100,00\",1,\"100,00\",05/01/2024,2024,2024,Folha1"
        )
        .unwrap();

        let roll = DebtRoll::try_from(file.path().to_path_buf()).unwrap();
        assert_eq!(roll.records().len(), 1);
        assert_eq!(roll.records()[0].taxpayer_id, "1001");
    }

    #[test]
    fn should_fail_to_load_a_missing_file() {
        let result = DebtRoll::try_from(PathBuf::from("definitely/not/a/real/file.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn should_truncate_long_lines_in_diagnostics() {
        let short = "a short line";
        assert_eq!(excerpt(short), short);

        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), 100);
    }

    #[test]
    fn should_truncate_excerpts_on_character_boundaries() {
        // Place a two-byte character across the truncation point and check
        // the excerpt backs off instead of splitting it.
        let line = format!("{}é{}", "a".repeat(99), "b".repeat(50));
        assert_eq!(excerpt(&line), "a".repeat(99));
    }
}
