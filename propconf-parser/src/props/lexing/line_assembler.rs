//! Logical line assembly
//!
//!     A physical line ending with the continuation mark `\` has the mark removed and the next
//!     physical line appended to it, verbatim. Logical lines made only of whitespace are skipped.
//!     A continuation on the last line of the input simply ends the logical line.

use std::io::{self, BufRead};

/// Continuation mark at the end of a physical line
pub const CONTINUATION: char = '\\';

/// One logical line and the physical lines it spans (1-based, inclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    pub first_line: usize,
    pub line_number: usize,
}

/// Iterator of logical lines over any buffered reader
#[derive(Debug)]
pub struct LineAssembler<R> {
    input: R,
    line_number: usize,
}

impl<R: BufRead> LineAssembler<R> {
    pub fn new(input: R) -> Self {
        LineAssembler {
            input,
            line_number: 0,
        }
    }

    fn read_physical(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }

    fn assemble(&mut self) -> io::Result<Option<LogicalLine>> {
        loop {
            let mut text = String::new();
            let mut first_line = None;
            while let Some(physical) = self.read_physical()? {
                first_line.get_or_insert(self.line_number);
                match physical.strip_suffix(CONTINUATION) {
                    Some(head) => text.push_str(head),
                    None => {
                        text.push_str(&physical);
                        break;
                    }
                }
            }
            let Some(first_line) = first_line else {
                return Ok(None);
            };
            if text.trim().is_empty() {
                continue;
            }
            return Ok(Some(LogicalLine {
                text,
                first_line,
                line_number: self.line_number,
            }));
        }
    }
}

impl<R: BufRead> Iterator for LineAssembler<R> {
    type Item = io::Result<LogicalLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.assemble().transpose()
    }
}
