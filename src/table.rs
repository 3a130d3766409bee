//! The translation table: stream name → key → translated unit or deletion.
//!
//! Rows are read with [`DelimitedReader`] and have the shape
//! `[stream, key, category, readable, modifiable, comment, content]`.

use std::{collections::HashMap, fs::File, io::Write, ops::Index, path::Path};

use lazy_static::lazy_static;

use crate::{
    error::Error,
    formats::delimited::{DelimitedReader, DelimitedWriter, Delimiter},
    key::{decode_key, encode_key},
    types::{LocalizableKey, LocalizableUnit, LocalizationCategory, LocalizationDictionary},
};

lazy_static! {
    static ref EMPTY_DICTIONARY: LocalizationDictionary = LocalizationDictionary::new();
}

const STREAM_COLUMN: usize = 0;
const KEY_COLUMN: usize = 1;
const CATEGORY_COLUMN: usize = 2;
const READABLE_COLUMN: usize = 3;
const MODIFIABLE_COLUMN: usize = 4;
const COMMENT_COLUMN: usize = 5;
const CONTENT_COLUMN: usize = 6;

/// Translations for every stream of one run. Stream names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    streams: HashMap<String, LocalizationDictionary>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a table file, sniffing its byte-order mark.
    pub fn read_from<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        let reader = DelimitedReader::from_reader(file, delimiter)?;
        Self::from_delimited(reader)
    }

    /// Builds the table from every remaining row of `reader`.
    pub fn from_delimited(mut reader: DelimitedReader) -> Result<Self, Error> {
        let mut table = Self::new();
        let mut row = 0;
        while reader.read_row() {
            row += 1;
            table.add_row(row, reader.columns())?;
        }
        tracing::debug!("Read {} rows for {} streams", row, table.len());
        Ok(table)
    }

    /// Builds the table from rows already split into cells. Missing trailing cells are
    /// simply absent from a row.
    pub fn from_rows<I, R, S>(rows: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for (index, row) in rows.into_iter().enumerate() {
            let cells: Vec<&str> = row.as_ref().iter().map(AsRef::as_ref).collect();
            table.add_row(index + 1, &cells)?;
        }
        Ok(table)
    }

    /// Applies one row; `row` is 1-based and only used in errors.
    fn add_row<S: AsRef<str>>(&mut self, row: usize, cells: &[S]) -> Result<(), Error> {
        let cell = |index: usize| cells.get(index).map(AsRef::as_ref);

        let stream = cell(STREAM_COLUMN)
            .ok_or_else(|| Error::malformed_row(row, "missing stream name"))?;
        if stream.is_empty() {
            // comment line
            return Ok(());
        }

        let key_cell = match cell(KEY_COLUMN) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Error::malformed_row(row, "missing resource key")),
        };
        let key = decode_key(key_cell).map_err(|e| e.at_row(row))?;

        let unit = match cell(CATEGORY_COLUMN) {
            None => None,
            Some("") => {
                if (READABLE_COLUMN..=CONTENT_COLUMN).any(|i| cell(i).is_some_and(|c| !c.is_empty())) {
                    return Err(Error::malformed_row(
                        row,
                        "empty category with populated trailing cells",
                    ));
                }
                None
            }
            Some(category) => Some(parse_unit(row, category, &cell)?),
        };

        self.insert(stream, key, unit);
        Ok(())
    }

    /// Records `unit` for `key` under `stream`; a later insert for the same pair wins.
    pub fn insert(&mut self, stream: &str, key: LocalizableKey, unit: Option<LocalizableUnit>) {
        self.streams
            .entry(stream.to_lowercase())
            .or_default()
            .insert(key, unit);
    }

    /// Translations for `stream`, or an empty mapping when none were supplied.
    pub fn get(&self, stream: &str) -> &LocalizationDictionary {
        self.lookup(stream).unwrap_or(&EMPTY_DICTIONARY)
    }

    /// Translations for `stream`, if the table mentions it at all.
    pub fn lookup(&self, stream: &str) -> Option<&LocalizationDictionary> {
        self.streams.get(&stream.to_lowercase())
    }

    pub fn contains_stream(&self, stream: &str) -> bool {
        self.streams.contains_key(&stream.to_lowercase())
    }

    /// Number of streams with at least one row.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl Index<&str> for TranslationTable {
    type Output = LocalizationDictionary;

    fn index(&self, stream: &str) -> &Self::Output {
        self.get(stream)
    }
}

fn parse_unit<'c>(
    row: usize,
    category: &str,
    cell: &impl Fn(usize) -> Option<&'c str>,
) -> Result<LocalizableUnit, Error> {
    let category: LocalizationCategory = category
        .parse()
        .map_err(|_| Error::malformed_row(row, format!("unknown category `{}`", category)))?;
    let readable = parse_bool(row, "readable", cell(READABLE_COLUMN))?;
    let modifiable = parse_bool(row, "modifiable", cell(MODIFIABLE_COLUMN))?;

    Ok(LocalizableUnit {
        category,
        readable,
        modifiable,
        comment: cell(COMMENT_COLUMN).map(str::to_string),
        content: cell(CONTENT_COLUMN).unwrap_or_default().to_string(),
    })
}

fn parse_bool(row: usize, column: &str, value: Option<&str>) -> Result<bool, Error> {
    let value = value.ok_or_else(|| Error::malformed_row(row, format!("missing {} cell", column)))?;
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(Error::malformed_row(
            row,
            format!("{} cell `{}` is not a boolean", column, other),
        )),
    }
}

fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Writes one 7-column row for an extracted unit.
pub fn write_unit_row<W: Write>(
    writer: &mut DelimitedWriter<W>,
    stream: &str,
    key: &LocalizableKey,
    unit: &LocalizableUnit,
) -> Result<(), Error> {
    writer.write_column(stream)?;
    writer.write_column(&encode_key(key))?;
    writer.write_column(unit.category.as_str())?;
    writer.write_column(format_bool(unit.readable))?;
    writer.write_column(format_bool(unit.modifiable))?;
    writer.write_column(unit.comment.as_deref().unwrap_or_default())?;
    writer.write_column(&unit.content)?;
    writer.end_line()
}
