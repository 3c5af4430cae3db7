use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "dts-bundler", version, about = "Bundle .d.ts files into one")]
pub struct Cli {
    /// Entry declaration file
    #[arg(short, long)]
    pub entry: PathBuf,
    /// Output file path
    #[arg(short, long)]
    pub output: PathBuf,
    /// Comma-separated list of library names to inline
    #[arg(short, long, value_delimiter = ',')]
    pub inlined_libraries: Vec<String>,
}
