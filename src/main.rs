//! Command-line front end: scan, parse, check, or dump the parser tables.
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` to see table
//! statistics and conflicts, `RUST_LOG=trace` for every parser step.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use slr_frontend::grammar::pretty_print::StepOutputVec;
use slr_frontend::{analyze, scan, Grammar, SlrParser, Token};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Plain, global = true)]
    format: Format,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the token stream
    Tokens {
        /// Source file; stdin when omitted
        input: Option<PathBuf>,
    },
    /// Parse and print the parse tree
    Parse {
        input: Option<PathBuf>,

        /// Also print every parser step
        #[arg(short, long)]
        trace: bool,
    },
    /// Parse and run the semantic checks
    Check { input: Option<PathBuf> },
    /// Dump productions, FIRST/FOLLOW sets, the LR(0) automaton and the SLR table
    Tables {
        /// Read a grammar in `A -> a b | c` notation instead of using the built-in language
        #[arg(short, long)]
        grammar: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Plain,
    Latex,
    Json,
}

fn read_input(path: Option<&PathBuf>) -> Result<String, String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("cannot read stdin: {}", e))?;
            Ok(input)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

fn tokens(path: Option<&PathBuf>, format: Format) -> Result<(), String> {
    let tokens = scan(&read_input(path)?).map_err(|e| e.to_string())?;
    for warning in SlrParser::language().validate_tokens(&tokens) {
        log::warn!("{}", warning);
    }
    match format {
        Format::Json => println!("{}", to_json(&tokens)?),
        _ => {
            for t in &tokens {
                println!("{:>4}:{:<4} {:<16} {}", t.line, t.column, t.kind, t.lexeme);
            }
        }
    }
    Ok(())
}

fn scan_and_run(path: Option<&PathBuf>) -> Result<(Vec<Token>, slr_frontend::ParseRun), String> {
    let tokens = scan(&read_input(path)?).map_err(|e| e.to_string())?;
    let parser = SlrParser::language();
    for warning in parser.validate_tokens(&tokens) {
        log::warn!("{}", warning);
    }
    let run = parser.run(&tokens);
    Ok((tokens, run))
}

fn parse(path: Option<&PathBuf>, trace: bool, format: Format) -> Result<(), String> {
    let (_, run) = scan_and_run(path)?;
    if trace {
        let steps = StepOutputVec::new(&run.steps);
        println!(
            "{}",
            match format {
                Format::Plain => steps.to_plaintext(),
                Format::Latex => steps.to_latex(),
                Format::Json => to_json(&steps)?,
            }
        );
    }
    let tree = run.result.map_err(|e| e.detailed_message())?;
    println!(
        "{}",
        match format {
            Format::Plain => tree.to_tree_string(),
            Format::Latex => tree.to_latex(),
            Format::Json => to_json(&tree)?,
        }
    );
    Ok(())
}

fn check(path: Option<&PathBuf>, format: Format) -> Result<(), String> {
    let (_, run) = scan_and_run(path)?;
    let tree = run.result.map_err(|e| e.detailed_message())?;
    let analysis = analyze(&tree);
    match format {
        Format::Json => println!("{}", to_json(&analysis)?),
        _ => {
            for s in analysis.symbols.symbols() {
                println!(
                    "{:<16} {:<10} {:<8} scope {} ({}:{})",
                    s.name,
                    format!("{:?}", s.kind).to_lowercase(),
                    s.value_type,
                    s.scope,
                    s.line,
                    s.column
                );
            }
            for e in &analysis.errors {
                println!("error: {}", e);
            }
        }
    }
    if analysis.is_ok() {
        Ok(())
    } else {
        Err(format!("{} semantic error(s)", analysis.errors.len()))
    }
}

fn tables(grammar: Option<&PathBuf>, format: Format) -> Result<(), String> {
    let owned;
    let parser = match grammar {
        Some(path) => {
            let g = Grammar::parse(&read_input(Some(path))?).map_err(|e| e.to_string())?;
            owned = SlrParser::try_new(g).map_err(|e| e.to_string())?;
            &owned
        }
        None => SlrParser::language(),
    };
    let g = parser.grammar();
    let productions = g.to_production_output_vec();
    let first_follow = parser.first_follow().to_non_terminal_output_vec(g);
    let automaton = parser.automaton().to_output(g);
    let table = parser.table().to_output(parser.conflicts());

    match format {
        Format::Plain => println!(
            "{}\n\n{}\n\n{}\n\n{}",
            productions.to_plaintext(),
            first_follow.to_plaintext(),
            automaton.to_plaintext(),
            table.to_plaintext()
        ),
        Format::Latex => println!(
            "{}\n\n{}\n\n{}\n\n{}",
            productions.to_latex(),
            first_follow.to_latex(),
            automaton.to_latex(),
            table.to_latex()
        ),
        Format::Json => println!(
            "{}",
            to_json(&serde_json::json!({
                "productions": productions,
                "first_follow": first_follow,
                "automaton": automaton,
                "table": table,
            }))?
        ),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let result = match &args.command {
        Commands::Tokens { input } => tokens(input.as_ref(), args.format),
        Commands::Parse { input, trace } => parse(input.as_ref(), *trace, args.format),
        Commands::Check { input } => check(input.as_ref(), args.format),
        Commands::Tables { grammar } => tables(grammar.as_ref(), args.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
