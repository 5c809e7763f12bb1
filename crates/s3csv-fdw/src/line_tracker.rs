//! Quote-aware line classification underneath the csv reader.
//!
//! The csv crate drops empty lines without reporting them, yet each one is
//! still a line: it counts toward `skip_header` and maps to an empty row.
//! [`LineTracker`] passes bytes through untouched and records, in order,
//! whether each logical line was blank or carried a record. A record that
//! spans several physical lines inside quotes is one logical line.
//!
//! `\r`, `\n` and `\r\n` each end a line, the same terminators the csv
//! reader accepts.

use std::collections::VecDeque;
use std::io::{self, Read};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    LineStart,
    FieldStart,
    InField,
    InQuoted,
    /// A quote seen inside a quoted field: either an escaped quote or the end.
    QuoteInQuoted,
}

/// The csv reader strips a leading UTF-8 BOM, so the tracker must too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bom {
    Pending(usize),
    Done,
}

pub(crate) struct LineTracker<R> {
    inner: R,
    delimiter: u8,
    quote: u8,
    state: ScanState,
    after_cr: bool,
    bom: Bom,
    lines: VecDeque<LineKind>,
}

impl<R: Read> LineTracker<R> {
    pub(crate) fn new(inner: R, delimiter: u8, quote: u8) -> Self {
        Self {
            inner,
            delimiter,
            quote,
            state: ScanState::LineStart,
            after_cr: false,
            bom: Bom::Pending(0),
            lines: VecDeque::new(),
        }
    }

    /// Consume the next record line. Returns the number of blank lines
    /// that preceded it.
    pub(crate) fn take_record(&mut self) -> usize {
        let mut blanks = 0;
        while let Some(kind) = self.lines.pop_front() {
            match kind {
                LineKind::Blank => blanks += 1,
                LineKind::Record => break,
            }
        }
        blanks
    }

    /// Consume every remaining line. Only blank lines can remain once the
    /// csv reader reports the end of input.
    pub(crate) fn take_blanks(&mut self) -> usize {
        self.lines
            .drain(..)
            .filter(|kind| *kind == LineKind::Blank)
            .count()
    }

    fn scan(&mut self, byte: u8) {
        if let Bom::Pending(matched) = self.bom {
            if byte == UTF8_BOM[matched] {
                self.bom = if matched + 1 == UTF8_BOM.len() {
                    Bom::Done
                } else {
                    Bom::Pending(matched + 1)
                };
                return;
            }
            self.bom = Bom::Done;
            if matched > 0 {
                self.step(UTF8_BOM[0]);
            }
        }
        self.step(byte);
    }

    fn step(&mut self, byte: u8) {
        if self.after_cr {
            self.after_cr = false;
            if byte == b'\n' {
                return;
            }
        }

        let terminator = byte == b'\r' || byte == b'\n';
        let state = self.state;
        self.state = match state {
            ScanState::LineStart if terminator => {
                self.end_line(LineKind::Blank, byte);
                ScanState::LineStart
            }
            ScanState::LineStart | ScanState::FieldStart if byte == self.quote => {
                ScanState::InQuoted
            }
            ScanState::InQuoted if byte == self.quote => ScanState::QuoteInQuoted,
            ScanState::InQuoted => ScanState::InQuoted,
            ScanState::QuoteInQuoted if byte == self.quote => ScanState::InQuoted,
            _ if terminator => {
                self.end_line(LineKind::Record, byte);
                ScanState::LineStart
            }
            _ if byte == self.delimiter => ScanState::FieldStart,
            _ => ScanState::InField,
        };
    }

    fn end_line(&mut self, kind: LineKind, terminator: u8) {
        self.lines.push_back(kind);
        self.after_cr = terminator == b'\r';
    }

    fn finish(&mut self) {
        if let Bom::Pending(matched) = self.bom {
            self.bom = Bom::Done;
            if matched > 0 {
                self.step(UTF8_BOM[0]);
            }
        }
        if self.state != ScanState::LineStart {
            self.lines.push_back(LineKind::Record);
            self.state = ScanState::LineStart;
        }
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.finish();
        } else {
            for &byte in &buf[..n] {
                self.scan(byte);
            }
        }
        Ok(n)
    }
}
