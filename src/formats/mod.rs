//! File formats handled by satloc.
//!
//! [`delimited`] is the translation table text format, [`resources`] the flat
//! container and [`bundle`] the composite container. [`FileType`] classifies an
//! input or output path by extension.

pub mod bundle;
pub mod delimited;
pub mod resources;

use std::{
    fmt::{Display, Formatter},
    io::{self, Read, Write},
    path::Path,
    str::FromStr,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub use bundle::{Bundle, BundleEntry, BundleHeader, BundleReader, BundleWriter, ResourceLocation};
pub use delimited::{DelimitedReader, DelimitedWriter, Delimiter};
pub use resources::{ResourceEntry, ResourceReader, ResourceSet, ResourceValue, ResourceWriter, StoredValue};

use crate::error::Error;

/// Extension of a leaf record stream, without the dot.
pub const LEAF_EXTENSION: &str = "baml";

/// Extension of a flat container, without the dot.
pub const RESOURCES_EXTENSION: &str = "resources";

/// Extension of the companion comment file passed to the localizer.
pub const COMMENT_EXTENSION: &str = "loc";

/// Kind of file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// A standalone leaf record stream (`.baml`).
    Leaf,
    /// A flat container (`.resources`).
    Resources,
    /// A composite bundle shipped as a library (`.dll`).
    Dll,
    /// A composite bundle shipped as an executable (`.exe`).
    Exe,
    /// Comma-separated translation table (`.csv`).
    Csv,
    /// Tab-separated translation table (`.txt`).
    Txt,
}

/// Lowercase name of each file type, which is also its extension.
///
/// # Example
/// ```rust
/// use satloc::formats::FileType;
/// assert_eq!(FileType::Leaf.to_string(), "baml");
/// assert_eq!(FileType::Resources.to_string(), "resources");
/// ```
impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Accepts an extension with or without the leading dot, case-insensitively.
impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match s.as_str() {
            LEAF_EXTENSION => Ok(FileType::Leaf),
            RESOURCES_EXTENSION => Ok(FileType::Resources),
            "dll" => Ok(FileType::Dll),
            "exe" => Ok(FileType::Exe),
            "csv" => Ok(FileType::Csv),
            "txt" => Ok(FileType::Txt),
            other => Err(Error::UnsupportedContainerShape(other.to_string())),
        }
    }
}

impl FileType {
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Leaf => LEAF_EXTENSION,
            FileType::Resources => RESOURCES_EXTENSION,
            FileType::Dll => "dll",
            FileType::Exe => "exe",
            FileType::Csv => "csv",
            FileType::Txt => "txt",
        }
    }

    /// Infers the file type from the extension of `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        path.extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::UnsupportedContainerShape(path.display().to_string()))?
            .parse()
    }

    /// Whether the file is a composite bundle.
    pub fn is_bundle(&self) -> bool {
        matches!(self, FileType::Dll | FileType::Exe)
    }

    /// Whether the file holds localizable input (leaf, flat container or bundle).
    pub fn is_localizable_input(&self) -> bool {
        !self.is_table()
    }

    pub fn is_table(&self) -> bool {
        matches!(self, FileType::Csv | FileType::Txt)
    }
}

/// Whether `name` carries the leaf extension, case-insensitively.
pub fn is_leaf_name(name: &str) -> bool {
    has_extension(name, LEAF_EXTENSION)
}

/// Whether `name` carries the flat-container extension, case-insensitively.
pub fn is_resources_name(name: &str) -> bool {
    has_extension(name, RESOURCES_EXTENSION)
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Maps an unexpected end of input to [`Error::InvalidContainer`]; other I/O errors pass through.
pub(crate) fn truncated(container: &str) -> impl Fn(io::Error) -> Error + '_ {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::invalid_container(container, "unexpected end of data")
        } else {
            Error::io(container, e)
        }
    }
}

/// Reads a `u32` length-prefixed UTF-8 string.
pub(crate) fn read_string<R: Read>(reader: &mut R, container: &str) -> Result<String, Error> {
    let len = reader
        .read_u32::<LittleEndian>()
        .map_err(truncated(container))? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).map_err(truncated(container))?;
    String::from_utf8(bytes)
        .map_err(|_| Error::invalid_container(container, "string is not valid UTF-8"))
}

/// Writes a `u32` length-prefixed UTF-8 string.
pub(crate) fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<(), Error> {
    writer.write_u32::<LittleEndian>(payload_len(value.len(), value)?)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

/// Checks that a length fits the `u32` length fields of the container formats.
pub(crate) fn payload_len(len: usize, name: &str) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::invalid_container(name, "entry exceeds 4 GiB"))
}

/// Checks the four magic bytes and the version that open every container.
pub(crate) fn read_preamble<R: Read>(
    reader: &mut R,
    magic: &[u8; 4],
    version: u32,
    container: &str,
) -> Result<(), Error> {
    let mut found = [0u8; 4];
    reader.read_exact(&mut found).map_err(truncated(container))?;
    if &found != magic {
        return Err(Error::invalid_container(
            container,
            format!(
                "bad magic {:?}, expected {:?}",
                String::from_utf8_lossy(&found),
                String::from_utf8_lossy(magic)
            ),
        ));
    }
    let found_version = reader
        .read_u32::<LittleEndian>()
        .map_err(truncated(container))?;
    if found_version != version {
        return Err(Error::invalid_container(
            container,
            format!("unsupported version {}", found_version),
        ));
    }
    Ok(())
}
