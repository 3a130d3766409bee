//! Quoted, delimiter-separated text used for the translation table.
//!
//! Two variants exist: comma-separated (`.csv`) and tab-separated (`.txt`). A field
//! that contains the delimiter, a double quote, `\r`, or `\n` is wrapped in double
//! quotes with every inner quote doubled. Reading is a pull-style state machine over
//! [`ReadState`]; writing a field and reading it back always reproduces the field.
//!
//! Two row shapes do not survive a write and read. A trailing empty field is not
//! stored, and a row whose only field is empty is written as a bare line end, which
//! the reader skips as a blank line.
use std::{
    io::{Read, Write},
    path::Path,
};

use crate::error::Error;

/// UTF-8 byte-order mark written at the start of every table.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Line terminator used when writing rows.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

const QUOTE: char = '"';

/// Column delimiter of a translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// `,` used by `.csv` files.
    #[default]
    Comma,
    /// `\t` used by `.txt` files.
    Tab,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }

    /// `.csv` (case-insensitive) selects comma; every other extension selects tab.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Delimiter::Comma,
            _ => Delimiter::Tab,
        }
    }
}

/// Internal states of [`DelimitedReader`] while reading one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// At the start of a column.
    TokenStart,
    /// Inside content that is not quoted.
    UnquotedContent,
    /// Inside quoted content.
    QuotedContent,
    /// The end of the row was reached.
    LineEnd,
}

/// Writes one field at a time; rows are closed with [`DelimitedWriter::end_line`].
pub struct DelimitedWriter<W: Write> {
    writer: W,
    delimiter: char,
    first_column: bool,
}

impl<W: Write> DelimitedWriter<W> {
    /// Creates a writer without a byte-order mark.
    pub fn new(writer: W, delimiter: Delimiter) -> Self {
        Self {
            writer,
            delimiter: delimiter.as_char(),
            first_column: true,
        }
    }

    /// Creates a writer and emits the UTF-8 byte-order mark.
    pub fn with_bom(mut writer: W, delimiter: Delimiter) -> Result<Self, Error> {
        writer.write_all(UTF8_BOM)?;
        Ok(Self::new(writer, delimiter))
    }

    /// Writes one field, quoting it when needed.
    pub fn write_column(&mut self, value: &str) -> Result<(), Error> {
        if !self.first_column {
            write!(self.writer, "{}", self.delimiter)?;
        }
        self.first_column = false;

        if self.needs_quoting(value) {
            let mut quoted = String::with_capacity(value.len() + 2);
            quoted.push(QUOTE);
            for c in value.chars() {
                quoted.push(c);
                if c == QUOTE {
                    quoted.push(QUOTE);
                }
            }
            quoted.push(QUOTE);
            self.writer.write_all(quoted.as_bytes())?;
        } else {
            self.writer.write_all(value.as_bytes())?;
        }
        Ok(())
    }

    /// Terminates the current row; the next field starts a new row.
    pub fn end_line(&mut self) -> Result<(), Error> {
        self.writer.write_all(LINE_ENDING.as_bytes())?;
        self.first_column = true;
        Ok(())
    }

    /// Writes all fields of a row and terminates it.
    pub fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), Error> {
        for field in fields {
            self.write_column(field.as_ref())?;
        }
        self.end_line()
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(Error::Io)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn needs_quoting(&self, value: &str) -> bool {
        value
            .chars()
            .any(|c| c == self.delimiter || c == QUOTE || c == '\r' || c == '\n')
    }
}

/// Pull-style row reader.
///
/// ```rust
/// use satloc::formats::delimited::{Delimiter, DelimitedReader};
///
/// let mut reader = DelimitedReader::new("a,\"b,c\"\r\n", Delimiter::Comma);
/// assert!(reader.read_row());
/// assert_eq!(reader.columns(), ["a", "b,c"]);
/// assert!(!reader.read_row());
/// ```
pub struct DelimitedReader {
    chars: Vec<char>,
    pos: usize,
    delimiter: char,
    columns: Vec<String>,
}

impl DelimitedReader {
    pub fn new(text: &str, delimiter: Delimiter) -> Self {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        Self {
            chars: text.chars().collect(),
            pos: 0,
            delimiter: delimiter.as_char(),
            columns: Vec::new(),
        }
    }

    /// Reads the whole input, sniffing a byte-order mark so UTF-8 (with or without
    /// BOM) and UTF-16 tables are both accepted.
    pub fn from_reader<R: Read>(reader: R, delimiter: Delimiter) -> Result<Self, Error> {
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding_rs::UTF_8))
            .bom_override(true)
            .strip_bom(true)
            .build(reader);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).map_err(Error::Io)?;

        Ok(Self::new(&decoded, delimiter))
    }

    /// Advances to the next row.
    ///
    /// Returns `false` at the end of input when no partial row is pending. Blank lines
    /// before a row are skipped and never produce an empty row. A trailing empty
    /// field is not stored, so [`DelimitedReader::column`] reports it as absent.
    pub fn read_row(&mut self) -> bool {
        let Some(mut current) = self.skip_new_lines() else {
            return false;
        };

        self.columns.clear();
        let mut state = ReadState::TokenStart;
        let mut buffer = String::new();

        loop {
            match state {
                ReadState::TokenStart => {
                    if current == self.delimiter {
                        self.columns.push(std::mem::take(&mut buffer));
                    } else if current == QUOTE {
                        state = ReadState::QuotedContent;
                    } else if self.at_line_end(current) {
                        state = ReadState::LineEnd;
                    } else {
                        buffer.push(current);
                        state = ReadState::UnquotedContent;
                    }
                }
                ReadState::UnquotedContent => {
                    if current == self.delimiter {
                        self.columns.push(std::mem::take(&mut buffer));
                        state = ReadState::TokenStart;
                    } else if self.at_line_end(current) {
                        state = ReadState::LineEnd;
                    } else {
                        // a bare quote here is plain content
                        buffer.push(current);
                    }
                }
                ReadState::QuotedContent => {
                    if current == QUOTE {
                        if self.peek() == Some(QUOTE) {
                            self.pos += 1;
                            buffer.push(QUOTE);
                        } else {
                            state = ReadState::UnquotedContent;
                        }
                    } else {
                        buffer.push(current);
                    }
                }
                ReadState::LineEnd => break,
            }

            if state == ReadState::LineEnd {
                break;
            }
            match self.next_char() {
                Some(c) => current = c,
                None => break,
            }
        }

        if !buffer.is_empty() {
            self.columns.push(buffer);
        }
        true
    }

    /// Returns the column at `index` of the current row, if present.
    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Reads every remaining row.
    pub fn rows(mut self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        while self.read_row() {
            rows.push(std::mem::take(&mut self.columns));
        }
        rows
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// `\n`, or `\r` immediately followed by `\n` (the `\n` is consumed too).
    fn at_line_end(&mut self, current: char) -> bool {
        if current == '\n' {
            return true;
        }
        if current == '\r' && self.peek() == Some('\n') {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Skips `\n` and `\r\n` sequences; returns the first other character.
    fn skip_new_lines(&mut self) -> Option<char> {
        while let Some(c) = self.next_char() {
            if !self.at_line_end(c) {
                return Some(c);
            }
        }
        None
    }
}
