//! Flat container codec.
//!
//! Layout (little-endian): magic `LRES`, `u32` version, `u32` entry count, then for
//! each entry its name, a kind byte (`0` serialized value, `1` raw stream), the type
//! name of serialized values, a `u32` payload length and the payload.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{payload_len, read_preamble, read_string, truncated, write_string};
use crate::{error::Error, traits::Parser};

pub const MAGIC: &[u8; 4] = b"LRES";
pub const VERSION: u32 = 1;

const KIND_SERIALIZED: u8 = 0;
const KIND_STREAM: u8 = 1;

/// A fully materialized entry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// A typed value that can be re-emitted from its serialized bytes.
    Serialized { type_name: String, data: Vec<u8> },
    /// A raw byte stream.
    Stream(Vec<u8>),
}

impl StoredValue {
    pub fn is_stream(&self) -> bool {
        matches!(self, StoredValue::Stream(_))
    }

    pub fn data(&self) -> &[u8] {
        match self {
            StoredValue::Serialized { data, .. } => data,
            StoredValue::Stream(data) => data,
        }
    }
}

/// An entry value as handed out by [`ResourceReader::read_value`].
///
/// Streams are lazy views into the container and must be consumed before the
/// next entry is read.
pub enum ResourceValue<'a> {
    Serialized { type_name: &'a str, data: Vec<u8> },
    Stream(Box<dyn Read + 'a>),
}

impl ResourceValue<'_> {
    /// Copies the value into memory.
    pub fn materialize(self) -> std::io::Result<StoredValue> {
        match self {
            ResourceValue::Serialized { type_name, data } => Ok(StoredValue::Serialized {
                type_name: type_name.to_string(),
                data,
            }),
            ResourceValue::Stream(mut stream) => {
                let mut data = Vec::new();
                stream.read_to_end(&mut data)?;
                Ok(StoredValue::Stream(data))
            }
        }
    }
}

/// Name and location of one entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub name: String,
    /// Type name of a serialized value; `None` for raw streams.
    pub type_name: Option<String>,
    offset: u64,
    len: u64,
}

impl EntryInfo {
    pub fn is_stream(&self) -> bool {
        self.type_name.is_none()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Reads the entry table eagerly and payloads on demand.
pub struct ResourceReader<R: Read + Seek> {
    inner: R,
    name: String,
    entries: Vec<EntryInfo>,
}

impl<R: Read + Seek> ResourceReader<R> {
    /// Opens a flat container; `name` is used in error messages.
    pub fn new(mut inner: R, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let total = inner.seek(SeekFrom::End(0)).map_err(truncated(&name))?;
        inner.seek(SeekFrom::Start(0)).map_err(truncated(&name))?;

        read_preamble(&mut inner, MAGIC, VERSION, &name)?;
        let count = inner
            .read_u32::<LittleEndian>()
            .map_err(truncated(&name))?;

        let mut entries = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            let entry_name = read_string(&mut inner, &name)?;
            let kind = inner.read_u8().map_err(truncated(&name))?;
            let type_name = match kind {
                KIND_SERIALIZED => Some(read_string(&mut inner, &name)?),
                KIND_STREAM => None,
                other => {
                    return Err(Error::invalid_container(
                        &name,
                        format!("unknown kind {} for entry `{}`", other, entry_name),
                    ));
                }
            };
            let len = u64::from(inner.read_u32::<LittleEndian>().map_err(truncated(&name))?);
            let offset = inner.stream_position().map_err(truncated(&name))?;
            if offset + len > total {
                return Err(Error::invalid_container(
                    &name,
                    format!("entry `{}` runs past the end of the data", entry_name),
                ));
            }
            inner
                .seek(SeekFrom::Current(len as i64))
                .map_err(truncated(&name))?;
            entries.push(EntryInfo {
                name: entry_name,
                type_name,
                offset,
                len,
            });
        }

        Ok(Self {
            inner,
            name,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Positions the reader at entry `index` and returns its value.
    pub fn read_value(&mut self, index: usize) -> Result<ResourceValue<'_>, Error> {
        let Self {
            inner,
            name,
            entries,
        } = self;
        let entry = entries.get(index).ok_or_else(|| {
            Error::invalid_container(name.as_str(), format!("no entry at index {}", index))
        })?;

        inner
            .seek(SeekFrom::Start(entry.offset))
            .map_err(|e| Error::io(format!("{}:{}", name, entry.name), e))?;

        match &entry.type_name {
            Some(type_name) => {
                let mut data = vec![0u8; entry.len as usize];
                inner
                    .read_exact(&mut data)
                    .map_err(|e| Error::io(format!("{}:{}", name, entry.name), e))?;
                Ok(ResourceValue::Serialized { type_name, data })
            }
            None => Ok(ResourceValue::Stream(Box::new(inner.take(entry.len)))),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Collects entries in insertion order and writes them in one pass.
#[derive(Debug, Default)]
pub struct ResourceWriter {
    entries: Vec<ResourceEntry>,
}

impl ResourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: StoredValue) {
        self.entries.push(ResourceEntry {
            name: name.into(),
            value,
        });
    }

    pub fn add_stream(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.add(name, StoredValue::Stream(data));
    }

    pub fn add_serialized(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        data: Vec<u8>,
    ) {
        self.add(
            name,
            StoredValue::Serialized {
                type_name: type_name.into(),
                data,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish<W: Write>(self, mut writer: W) -> Result<(), Error> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(VERSION)?;
        writer.write_u32::<LittleEndian>(payload_len(self.entries.len(), "entry count")?)?;

        for entry in &self.entries {
            write_string(&mut writer, &entry.name)?;
            match &entry.value {
                StoredValue::Serialized { type_name, .. } => {
                    writer.write_u8(KIND_SERIALIZED)?;
                    write_string(&mut writer, type_name)?;
                }
                StoredValue::Stream(_) => writer.write_u8(KIND_STREAM)?,
            }
            let data = entry.value.data();
            writer.write_u32::<LittleEndian>(payload_len(data.len(), &entry.name)?)?;
            writer.write_all(data)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// One named entry of a [`ResourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub value: StoredValue,
}

/// A flat container held fully in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    pub entries: Vec<ResourceEntry>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.entries.push(ResourceEntry {
            name: name.into(),
            value: StoredValue::Stream(data.into()),
        });
        self
    }

    pub fn with_serialized(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.entries.push(ResourceEntry {
            name: name.into(),
            value: StoredValue::Serialized {
                type_name: type_name.into(),
                data: data.into(),
            },
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&StoredValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }
}

impl Parser for ResourceSet {
    fn from_reader<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut source = ResourceReader::new(Cursor::new(bytes), "resources")?;
        let mut entries = Vec::with_capacity(source.len());
        for index in 0..source.len() {
            let name = source.entries()[index].name.clone();
            let value = source.read_value(index)?.materialize()?;
            entries.push(ResourceEntry { name, value });
        }
        Ok(Self { entries })
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut out = ResourceWriter::new();
        for entry in &self.entries {
            out.add(entry.name.clone(), entry.value.clone());
        }
        out.finish(writer)
    }
}
