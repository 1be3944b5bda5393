use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use treelox::ast_printer::AstPrinter;
use treelox::error::LoxError;
use treelox::interpreter::Interpreter;
use treelox::lox::{Lox, Report};
use treelox::parser::Parser;
use treelox::scanner::Scanner;
use treelox::token::Token;

/// Exit status for scan, parse and resolve errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the token stream as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Parse a whole program and print one tree per statement
        #[arg(long)]
        program: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs a Lox program from a file, or an interactive prompt without one
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf)
        .map_err(LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))
}

fn require_file(filename: Option<PathBuf>, command: &str) -> Result<String> {
    match filename {
        Some(filename) => read_file(&filename),
        None => {
            info!("No filepath provided for {}", command);
            println!("No input filepath was provided. Exiting...");
            exit(0);
        }
    }
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("treelox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report_errors<'a>(errors: impl IntoIterator<Item = &'a LoxError>) {
    for e in errors {
        eprintln!("{}", e);
    }
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");

    let mut scanner = Scanner::new(source);
    let tokens: Vec<Token> = scanner.scan_tokens();

    report_errors(scanner.errors());

    if json {
        let dump = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", dump);
    } else {
        for token in &tokens {
            debug!("Scanned token: {}", token);
            println!("{}", token);
        }
    }

    if !scanner.errors().is_empty() {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str, program: bool) {
    info!("Running Parse subcommand");

    let mut scanner = Scanner::new(source);
    let mut parser = Parser::new(scanner.scan_tokens());

    let printed: Vec<String> = if program {
        parser.parse().iter().map(AstPrinter::print_stmt).collect()
    } else {
        parser.parse_expression().iter().map(AstPrinter::print).collect()
    };

    if !scanner.errors().is_empty() || !parser.errors().is_empty() {
        report_errors(scanner.errors().iter().chain(parser.errors()));
        exit(EXIT_STATIC_ERROR);
    }

    for line in printed {
        debug!("AST: {}", line);
        println!("{}", line);
    }

    info!("Parse subcommand completed");
}

fn evaluate(source: &str) {
    info!("Running Evaluate subcommand");

    let mut scanner = Scanner::new(source);
    let mut parser = Parser::new(scanner.scan_tokens());
    let expr = parser.parse_expression();

    let expr = match expr {
        Some(expr) if scanner.errors().is_empty() && parser.errors().is_empty() => expr,
        _ => {
            report_errors(scanner.errors().iter().chain(parser.errors()));
            exit(EXIT_STATIC_ERROR);
        }
    };

    let mut interpreter = Interpreter::new();

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
        }
        Err(e) => {
            debug!("Evaluation debug: {}", e);
            eprintln!("{}", e);
            exit(EXIT_RUNTIME_ERROR);
        }
    }

    info!("Evaluate subcommand completed");
}

fn run_file(filename: &PathBuf) -> Result<()> {
    info!("Running Run subcommand on {:?}", filename);

    let source = read_file(filename)?;
    let report: Report = Lox::new().run(&source);

    report_errors(report.errors());

    if report.had_static_error() {
        exit(EXIT_STATIC_ERROR);
    }

    if report.had_runtime_error() {
        exit(EXIT_RUNTIME_ERROR);
    }

    info!("Program executed successfully");
    Ok(())
}

fn run_prompt() -> Result<()> {
    info!("Starting interactive prompt");

    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };

        let line = line.context("Failed to read from stdin")?;

        // Errors are reported and the session carries on.
        report_errors(lox.run(&line).errors());
    }

    info!("Interactive prompt closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let source = require_file(filename, "Tokenize")?;
            tokenize(&source, json)?;
        }

        Commands::Parse { filename, program } => {
            let source = require_file(filename, "Parse")?;
            parse(&source, program);
        }

        Commands::Evaluate { filename } => {
            let source = require_file(filename, "Evaluate")?;
            evaluate(&source);
        }

        Commands::Run { filename } => match filename {
            Some(filename) => run_file(&filename)?,
            None => run_prompt()?,
        },
    }

    Ok(())
}
