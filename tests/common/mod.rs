#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use treelox::lox::{Lox, Report};

/// In‑memory sink whose contents stay readable after the interpreter
/// takes ownership of a clone.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("program output is UTF-8")
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session wired to a fresh buffer.
pub fn session() -> (Lox, SharedBuffer) {
    let buffer = SharedBuffer::default();
    (Lox::with_output(buffer.clone()), buffer)
}

/// Run `source` in a fresh session; returns printed lines and the report.
pub fn run(source: &str) -> (Vec<String>, Report) {
    let (mut lox, buffer) = session();
    let report = lox.run(source);
    (buffer.lines(), report)
}

/// Printed lines of a program expected to run without any diagnostics.
pub fn run_ok(source: &str) -> Vec<String> {
    let (lines, report) = run(source);
    assert!(
        report.is_ok(),
        "unexpected diagnostics: {:?}",
        report.errors().map(ToString::to_string).collect::<Vec<_>>()
    );
    lines
}

/// Rendered diagnostics, static first.
pub fn messages(report: &Report) -> Vec<String> {
    report.errors().map(ToString::to_string).collect()
}
