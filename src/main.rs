use std::path::Path;
use std::process;

use log::error;
use pairalign::config::resolve_name;
use pairalign::{AlignOptions, Aligner, MatrixSource};

const USAGE: &str = "usage: pairalign SEQ1 SEQ2 [--alphabet aa|nt] [--scoringmatrix NAME|FILE] \
[--gapopen N] [--gapextend N] [--scale X] [--mode global|local|glocal] \
[--showmatrices yes|no] [--maxcells N|none]";

fn parse_args(args: &[String]) -> Result<(String, String, AlignOptions), Box<dyn std::error::Error>> {
    let mut positional = Vec::new();
    let mut pairs = Vec::new();
    let mut matrix_file = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(name) = arg.strip_prefix("--") {
            let value = iter
                .next()
                .ok_or_else(|| format!("missing value for --{}", name))?;
            // Matrix files are read here; the library only sees their text.
            if resolve_name(name)? == "scoringmatrix" && Path::new(value).is_file() {
                matrix_file = Some(value.clone());
            } else {
                pairs.push((name.to_string(), value.clone()));
            }
        } else {
            positional.push(arg.clone());
        }
    }

    let [seq1, seq2]: [String; 2] = positional
        .try_into()
        .map_err(|_| USAGE.to_string())?;
    let mut options = AlignOptions::from_pairs(pairs)?;
    if let Some(path) = matrix_file {
        options.matrix = Some(MatrixSource::Ncbi(std::fs::read_to_string(path)?));
    }
    Ok((seq1, seq2, options))
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (seq1, seq2, options) = parse_args(&args)?;
    let show_matrices = options.keep_matrices;

    let aligner = Aligner::new(options)?;
    let result = aligner.align(&seq1, &seq2)?;

    println!("# Matrix: {}", aligner.matrix().name());
    println!("# Mode:   {}", result.mode);
    println!("# Score:  {}", result.score);
    println!("# Start:  {}", result.start);
    println!(
        "# Identity: {}/{} ({:.1}%)  Gaps: {}/{}",
        result.stats.identities,
        result.stats.length,
        result.stats.identity(),
        result.stats.gaps,
        result.stats.length
    );
    for warning in &result.warnings {
        println!("# Warning: {}", warning);
    }
    if !result.is_empty() {
        println!();
        print!("{}", result.format_wrapped(60));
    }

    if show_matrices {
        if let Some(matrices) = &result.matrices {
            for (layer, scores) in matrices.scores.iter().enumerate() {
                println!("\n# Score layer {}", layer);
                for row in 0..scores.rows() {
                    let cells: Vec<String> = scores.row(row).iter().map(|v| format!("{:>6}", v)).collect();
                    println!("{}", cells.join(""));
                }
            }
            for (layer, pointers) in matrices.pointers.iter().enumerate() {
                println!("\n# Pointer layer {}", layer);
                for row in 0..pointers.rows() {
                    let cells: String = pointers.row(row).iter().map(|t| t.symbol()).collect();
                    println!("{}", cells);
                }
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("pairalign: {}", e);
        process::exit(1);
    }
}
