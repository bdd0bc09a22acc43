use clap::Parser;
use log::{info, LevelFilter};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thrift_cr_ast::Program;
use thrift_cr_generator::{generate_program, write_files, GenError, GeneratorOptions};

#[derive(Parser)]
#[command(name = "thrift-cr")]
#[command(about = "Generate Crystal sources from a resolved Thrift program", long_about = None)]
struct Cli {
    /// Program AST as JSON, as emitted by the compiler front end
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "gen-cr")]
    out: PathBuf,

    /// Generator option, `key` or `key=value` (namespaced, no-skeleton)
    #[arg(long = "option", value_name = "KEY[=VALUE]")]
    options: Vec<String>,

    /// Log every emitted declaration
    #[arg(short, long)]
    verbose: bool,
}

fn option_map(raw: &[String]) -> BTreeMap<String, String> {
    raw.iter()
        .map(|opt| match opt.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (opt.clone(), String::new()),
        })
        .collect()
}

fn main() -> Result<(), GenError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let options = GeneratorOptions::from_map(&option_map(&cli.options))?;
    let text = fs::read_to_string(&cli.input)?;
    let program: Program = serde_json::from_str(&text)?;

    let files = generate_program(&program, &options)?;
    write_files(&cli.out, &files)?;
    info!("generated {} files into {}", files.len(), cli.out.display());
    Ok(())
}
