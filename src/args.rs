use clap::{App, Arg};
use std::path::Path;

pub struct Args {
    pub input_file: String,
    pub output_file: String,
}

impl Args {
    pub fn parse() -> Self {
        let matches = App::new("debt-cleanup")
            .version("0.1.0")
            .arg(Arg::with_name("input_file")
                .takes_value(true).required(true).help("path of the debt export to clean"))
            .arg(Arg::with_name("output_file")
                .takes_value(true).help("path of the cleaned CSV to write"))
            .get_matches();

        let input_file = matches.value_of("input_file").unwrap_or_default().to_string();
        let output_file = match matches.value_of("output_file") {
            Some(path) => path.to_string(),
            None => default_output(&input_file),
        };

        Self {
            input_file,
            output_file,
        }
    }
}

/// Where the cleaned CSV goes when no output path was given: next to the
/// input, with `-cleaned.csv` appended to its stem.
pub fn default_output(input: &str) -> String {
    sibling_with_suffix(input, "-cleaned.csv")
}

/// Where the spreadsheet-dialect file goes, derived from the cleaned CSV
/// path so the two artifacts always land together.
pub fn spreadsheet_path(output: &str) -> String {
    sibling_with_suffix(output, "-sheet.csv")
}

fn sibling_with_suffix(path: &str, suffix: &str) -> String {
    let path = Path::new(path);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    let name = format!("{}{}", stem, suffix);

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(name).to_string_lossy().into_owned()
        }
        _ => name,
    }
}
