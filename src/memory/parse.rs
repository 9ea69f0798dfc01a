//! Loader format:
//!
//! ```text
//! .1000       // directive, moves the load address
//! 1           // stored at 1000
//! 5           // stored at 1001
//! ```
//!
//! Only the leading integer of a line is significant; everything after it is
//! ignored, so trailing comments are free. Lines without a leading integer are
//! skipped.

use std::borrow::Cow;
use std::error;
use std::{fmt, str::Lines};

use super::{Memory, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidAddress { address: Word },
    InvalidDirective,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidAddress { address } => {
                write!(f, "memory has no address `{}`", address)
            }
            ParseErrorKind::InvalidDirective => f.write_str("invalid address directive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Reads the leading decimal integer of `line`, ignoring leading whitespace and
/// anything after the digits.
fn leading_number(line: &str) -> Option<Word> {
    let line = line.trim_start();
    let sign = usize::from(line.starts_with('-') || line.starts_with('+'));
    let digits = line[sign..]
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();

    if digits == 0 {
        return None;
    }

    line[..sign + digits].parse().ok()
}

#[derive(Debug, Clone)]
pub struct Parser<'a, const S: usize> {
    lines: Lines<'a>,
    line_nr: usize,
    address: Word,
    memory: Memory<S>,
}

impl<'a, const S: usize> Parser<'a, S> {
    /// Creates a new parse for `data` which will try to populate `memory`.
    pub fn new(data: &'a str, memory: Memory<S>) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            address: 0,
            memory,
        }
    }

    /// Consumes `self` and parses all lines into memory.
    ///
    /// Lines that could not be used are skipped; the reasons are collected and
    /// returned next to the populated memory. Blank lines and lines without a
    /// leading number are not reported.
    pub fn parse(mut self) -> (Memory<S>, Vec<ParseError>) {
        let mut skipped = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                skipped.push(err);
            }
        }

        (self.memory, skipped)
    }

    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim_start();
        self.line_nr += 1;

        if let Some(directive) = line.strip_prefix('.') {
            Some(self.parse_directive(directive))
        } else {
            Some(self.parse_value(line))
        }
    }

    /// `.1000` moves the load address. A directive without a number leaves the
    /// address untouched.
    fn parse_directive(&mut self, line: &str) -> Result<()> {
        let address = leading_number(line).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::InvalidDirective,
                "a directive needs an address",
                self.line_nr,
            )
        })?;

        log::trace!("[{}] load address {}", self.line_nr, address);
        self.address = address;

        Ok(())
    }

    /// Stores the value at the current address and advances it.
    fn parse_value(&mut self, line: &str) -> Result<()> {
        let value = match leading_number(line) {
            Some(value) => value,
            None => return Ok(()),
        };

        let address = self.address;
        self.address = address.wrapping_add(1);

        if address < 0 || address as usize >= S {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAddress { address },
                format!("value `{}` dropped", value),
                self.line_nr,
            ));
        }

        self.memory.write(address, value);

        Ok(())
    }
}
