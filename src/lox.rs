//! A Lox session: one interpreter kept alive across any number of sources.
//!
//! [`Lox::run`] drives scanner → parser → resolver → interpreter.  The
//! resolver and interpreter only run when every earlier stage came back
//! clean; the diagnostics of each call are handed back in a [`Report`].

use std::io::{self, Write};

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Diagnostics from a single [`Lox::run`].
#[derive(Debug, Default)]
pub struct Report {
    /// Scan, parse and resolve errors, in stage order.
    pub static_errors: Vec<LoxError>,

    /// Errors raised while executing top‑level statements.
    pub runtime_errors: Vec<LoxError>,
}

impl Report {
    pub fn had_static_error(&self) -> bool {
        !self.static_errors.is_empty()
    }

    pub fn had_runtime_error(&self) -> bool {
        !self.runtime_errors.is_empty()
    }

    pub fn is_ok(&self) -> bool {
        !self.had_static_error() && !self.had_runtime_error()
    }

    /// Every diagnostic, static ones first.
    pub fn errors(&self) -> impl Iterator<Item = &LoxError> {
        self.static_errors.iter().chain(self.runtime_errors.iter())
    }
}

pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Session printing program output to `out`.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        Lox {
            interpreter: Interpreter::with_output(out),
        }
    }

    /// Run `source` to completion.  Globals defined by earlier calls stay
    /// visible.
    pub fn run(&mut self, source: &str) -> Report {
        info!("Running {} byte(s) of source", source.len());

        let mut report = Report::default();

        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();
        report.static_errors.extend(scanner.take_errors());

        // Parse even after lex errors so both kinds are reported together.
        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        report.static_errors.extend(parser.take_errors());

        if report.had_static_error() {
            debug!("Skipping resolve: {} static error(s)", report.static_errors.len());
            return report;
        }

        let mut resolver = Resolver::new();
        resolver.resolve(&statements);
        report.static_errors.extend(resolver.take_errors());

        if report.had_static_error() {
            debug!("Skipping interpretation: resolve failed");
            return report;
        }

        let transient = resolver.take_transient();
        self.interpreter.add_locals(resolver.into_locals());
        self.interpreter.interpret(&statements);
        report.runtime_errors = self.interpreter.take_errors();

        // Function bodies keep their entries; closures may still call them.
        self.interpreter.release_locals(&transient);

        info!(
            "Run finished: {} static, {} runtime error(s)",
            report.static_errors.len(),
            report.runtime_errors.len()
        );

        report
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}
