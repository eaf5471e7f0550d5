//! `flashdex-build` — offline index builder CLI.
//!
//! Usage: `flashdex-build <line-doc-file> <output-dir> [config.json]`
//!
//! Reads one document per line in the line-doc format (see
//! [`flashdex::ingest::line_doc`]), feeds each into an [`flashdex::IndexBuilder`],
//! and finalizes the on-disk layout in `<output-dir>`. No flag parsing
//! framework is pulled in for three positional arguments.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::ExitCode;

use flashdex::config::Config;
use flashdex::error::FlashError;
use flashdex::ingest::{line_doc, IndexBuilder};

const EXIT_OK: u8 = 0;
const EXIT_INPUT: u8 = 1;
const EXIT_IO: u8 = 2;
const EXIT_INVARIANT: u8 = 3;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("usage: {} <line-doc-file> <output-dir> [config.json]", args.first().map(String::as_str).unwrap_or("flashdex-build"));
        return ExitCode::from(EXIT_INPUT);
    }

    let input_path = Path::new(&args[1]);
    let output_dir = Path::new(&args[2]);
    let config = match args.get(3) {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => return report(e),
        },
        None => Config::default(),
    };

    match run(input_path, output_dir, &config) {
        Ok(n) => {
            eprintln!("flashdex-build: wrote {n} documents to {}", output_dir.display());
            ExitCode::from(EXIT_OK)
        }
        Err(e) => report(e),
    }
}

fn run(input_path: &Path, output_dir: &Path, config: &Config) -> Result<u32, FlashError> {
    std::fs::create_dir_all(output_dir).map_err(|e| FlashError::io(output_dir, e))?;

    let file = std::fs::File::open(input_path).map_err(|e| FlashError::io(input_path, e))?;
    let reader = BufReader::new(file);

    let mut builder = IndexBuilder::create(output_dir, config)?;
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| FlashError::io(input_path, e))?;
        if line.is_empty() {
            continue;
        }
        let doc = line_doc::parse_line(&line, line_no)?;
        match doc.pretokenized {
            Some(tokenized) => builder.add_pretokenized(&doc.body, tokenized)?,
            None => builder.add_document(&doc.body)?,
        };
    }

    let n = builder.doc_count();
    builder.finalize()?;
    Ok(n)
}

fn report(err: FlashError) -> ExitCode {
    eprintln!("flashdex-build: {err}");
    let code = match err {
        FlashError::Input { .. } => EXIT_INPUT,
        FlashError::Io { .. } => EXIT_IO,
        FlashError::Invariant { .. } | FlashError::Resource(_) => EXIT_INVARIANT,
    };
    ExitCode::from(code)
}
