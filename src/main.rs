use debt_cleanup::args::{spreadsheet_path, Args};
use debt_cleanup::engine::DebtRoll;
use std::fs;
use std::path::PathBuf;
use std::process;

fn main() {
    let args = Args::parse();

    let roll = match DebtRoll::try_from(PathBuf::from(args.input_file)) {
        Ok(roll) => roll,
        Err(err) => {
            eprintln!("failed to process input file: {}", err);
            process::exit(1);
        }
    };

    let clean_csv = match roll.generate_clean_csv() {
        Ok(output) => output,
        Err(err) => {
            eprintln!("failed to generate cleaned output: {}", err);
            process::exit(1);
        }
    };
    if let Err(err) = fs::write(&args.output_file, clean_csv) {
        eprintln!("failed to write {}: {}", args.output_file, err);
        process::exit(1);
    }

    let sheet_file = spreadsheet_path(&args.output_file);
    let sheet_csv = match roll.generate_spreadsheet_csv() {
        Ok(output) => output,
        Err(err) => {
            eprintln!("failed to generate spreadsheet output: {}", err);
            process::exit(1);
        }
    };
    if let Err(err) = fs::write(&sheet_file, sheet_csv) {
        eprintln!("failed to write {}: {}", sheet_file, err);
        process::exit(1);
    }

    println!("{}", roll.summary());
    println!(
        "wrote {} cleaned records to {} and {}",
        roll.records().len(),
        args.output_file,
        sheet_file
    );
}
