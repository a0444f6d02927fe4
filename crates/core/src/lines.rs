use std::io::{self, BufRead};
use std::str;

use crate::record::ParseError;

/// Newline-delimited lines read as raw bytes. An I/O failure ends the
/// iteration with `Err`; a line that is not UTF-8 comes back as
/// `Ok((line_no, Err(ParseError::Encoding)))` so the caller can skip it.
///
/// Line numbers start at 1. The trailing `\n` is stripped; `\r` is left for
/// the parser.
pub struct DecodedLines<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: u64,
}

impl<R: BufRead> DecodedLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for DecodedLines<R> {
    type Item = io::Result<(u64, Result<String, ParseError>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                let decoded = str::from_utf8(&self.buf)
                    .map(str::to_owned)
                    .map_err(|source| ParseError::Encoding { source });
                Some(Ok((self.line_no, decoded)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
