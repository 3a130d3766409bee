//! Composite container codec: a named bundle of flat containers and manifest files.
//!
//! Layout (little-endian): magic `LBND`, `u32` version, bundle name, culture name
//! (empty for the invariant culture), module name, `u32` entry count, then for each
//! entry its name, a location byte, a `u32` payload length and the payload. The
//! writer streams entries and back-patches the count when it finishes.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{payload_len, read_preamble, read_string, truncated, write_string};
use crate::{error::Error, traits::Parser, types::Culture};

pub const MAGIC: &[u8; 4] = b"LBND";
pub const VERSION: u32 = 1;

/// Where a bundle entry lives, as a set of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceLocation(u8);

impl ResourceLocation {
    /// The payload is stored in this bundle.
    pub const EMBEDDED: ResourceLocation = ResourceLocation(1);
    /// The entry is only a reference to another bundle.
    pub const IN_ANOTHER_BUNDLE: ResourceLocation = ResourceLocation(2);
    /// The entry is declared by the bundle manifest.
    pub const MANIFEST_FILE: ResourceLocation = ResourceLocation(4);

    pub fn from_bits(bits: u8) -> Self {
        ResourceLocation(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: ResourceLocation) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_in_another_bundle(&self) -> bool {
        self.contains(Self::IN_ANOTHER_BUNDLE)
    }
}

impl std::ops::BitOr for ResourceLocation {
    type Output = ResourceLocation;

    fn bitor(self, rhs: Self) -> Self::Output {
        ResourceLocation(self.0 | rhs.0)
    }
}

impl Default for ResourceLocation {
    fn default() -> Self {
        Self::EMBEDDED | Self::MANIFEST_FILE
    }
}

/// Identity of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BundleHeader {
    pub name: String,
    /// `None` for the invariant (neutral) culture.
    pub culture: Option<Culture>,
    /// File name the bundle's main module is known by.
    pub module_name: String,
}

impl BundleHeader {
    pub fn new(name: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            culture: None,
            module_name: module_name.into(),
        }
    }

    pub fn with_culture(mut self, culture: Option<Culture>) -> Self {
        self.culture = culture;
        self
    }
}

/// Name and location of one bundle entry.
#[derive(Debug, Clone)]
pub struct BundleEntryInfo {
    pub name: String,
    pub location: ResourceLocation,
    offset: u64,
    len: u64,
}

impl BundleEntryInfo {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Reads the header and entry table eagerly; payloads one at a time.
pub struct BundleReader<R: Read + Seek> {
    inner: R,
    name: String,
    header: BundleHeader,
    entries: Vec<BundleEntryInfo>,
}

impl<R: Read + Seek> BundleReader<R> {
    /// Opens a bundle; `name` is used in error messages.
    pub fn new(mut inner: R, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let total = inner.seek(SeekFrom::End(0)).map_err(truncated(&name))?;
        inner.seek(SeekFrom::Start(0)).map_err(truncated(&name))?;

        read_preamble(&mut inner, MAGIC, VERSION, &name)?;
        let bundle_name = read_string(&mut inner, &name)?;
        let culture_name = read_string(&mut inner, &name)?;
        let culture = if culture_name.is_empty() {
            None
        } else {
            Some(Culture::parse(&culture_name).map_err(|_| {
                Error::invalid_container(&name, format!("invalid culture `{}`", culture_name))
            })?)
        };
        let module_name = read_string(&mut inner, &name)?;
        let count = inner
            .read_u32::<LittleEndian>()
            .map_err(truncated(&name))?;

        let mut entries = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            let entry_name = read_string(&mut inner, &name)?;
            let location = ResourceLocation(inner.read_u8().map_err(truncated(&name))?);
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
            entries.push(BundleEntryInfo {
                name: entry_name,
                location,
                offset,
                len,
            });
        }

        Ok(Self {
            inner,
            name,
            header: BundleHeader {
                name: bundle_name,
                culture,
                module_name,
            },
            entries,
        })
    }

    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    pub fn entries(&self) -> &[BundleEntryInfo] {
        &self.entries
    }

    /// Reads the payload of entry `index` into memory.
    pub fn read_entry(&mut self, index: usize) -> Result<Vec<u8>, Error> {
        let entry = self.entries.get(index).ok_or_else(|| {
            Error::invalid_container(&self.name, format!("no entry at index {}", index))
        })?;
        let context = || format!("{}:{}", self.name, entry.name);

        self.inner
            .seek(SeekFrom::Start(entry.offset))
            .map_err(|e| Error::io(context(), e))?;
        let mut data = vec![0u8; entry.len as usize];
        self.inner
            .read_exact(&mut data)
            .map_err(|e| Error::io(context(), e))?;
        Ok(data)
    }
}

/// Streams entries to a seekable sink.
pub struct BundleWriter<W: Write + Seek> {
    inner: W,
    count_position: u64,
    count: u32,
}

impl<W: Write + Seek> BundleWriter<W> {
    /// Writes the header and reserves the entry count.
    pub fn new(mut inner: W, header: &BundleHeader) -> Result<Self, Error> {
        inner.write_all(MAGIC)?;
        inner.write_u32::<LittleEndian>(VERSION)?;
        write_string(&mut inner, &header.name)?;
        let culture = header.culture.as_ref().map(Culture::name).unwrap_or_default();
        write_string(&mut inner, &culture)?;
        write_string(&mut inner, &header.module_name)?;

        let count_position = inner.stream_position()?;
        inner.write_u32::<LittleEndian>(0)?;

        Ok(Self {
            inner,
            count_position,
            count: 0,
        })
    }

    pub fn add_entry(
        &mut self,
        name: &str,
        location: ResourceLocation,
        data: &[u8],
    ) -> Result<(), Error> {
        write_string(&mut self.inner, name)?;
        self.inner.write_u8(location.bits())?;
        self.inner
            .write_u32::<LittleEndian>(payload_len(data.len(), name)?)?;
        self.inner.write_all(data)?;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Back-patches the entry count and returns the sink.
    pub fn finish(mut self) -> Result<W, Error> {
        let end = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(self.count_position))?;
        self.inner.write_u32::<LittleEndian>(self.count)?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// One entry of a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    pub location: ResourceLocation,
    pub data: Vec<u8>,
}

/// A bundle held fully in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    pub header: BundleHeader,
    pub entries: Vec<BundleEntry>,
}

impl Bundle {
    pub fn new(header: BundleHeader) -> Self {
        Self {
            header,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(
        mut self,
        name: impl Into<String>,
        location: ResourceLocation,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.entries.push(BundleEntry {
            name: name.into(),
            location,
            data: data.into(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }
}

impl Parser for Bundle {
    fn from_reader<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut source = BundleReader::new(Cursor::new(bytes), "bundle")?;
        let mut entries = Vec::with_capacity(source.entries().len());
        for index in 0..source.entries().len() {
            let info = source.entries()[index].clone();
            let data = source.read_entry(index)?;
            entries.push(BundleEntry {
                name: info.name,
                location: info.location,
                data,
            });
        }
        Ok(Self {
            header: source.header().clone(),
            entries,
        })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut out = BundleWriter::new(Cursor::new(Vec::new()), &self.header)?;
        for entry in &self.entries {
            out.add_entry(&entry.name, entry.location, &entry.data)?;
        }
        writer.write_all(out.finish()?.get_ref())?;
        writer.flush()?;
        Ok(())
    }
}
