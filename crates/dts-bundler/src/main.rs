use std::fs;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;

use dts_bundler::cli::Cli;
use dts_bundler::logger::init_logger;
use dts_bundler::BundleOptions;

fn main() {
    init_logger();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    let entry = cli.entry.to_string_lossy().to_string();
    match dts_bundler::bundle(&entry, cli.inlined_libraries, BundleOptions::default()) {
        Ok(output) => {
            if let Err(err) = fs::write(&cli.output, output) {
                eprintln!("{} {}", "Failed to write output:".red(), err);
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{} {:?}", "Bundling failed:".red(), err);
            process::exit(1);
        }
    }
}
