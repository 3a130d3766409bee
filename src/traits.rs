//! Traits at the seams of satloc: container parsing, the external leaf localizer and
//! the localizability resolver it consults.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Seek, Write},
    path::Path,
};

use crate::{
    error::Error,
    resolver::{ElementLocalizability, LocalizabilityAttribute, ResolverCache},
    types::LocalizationDictionary,
};

/// A trait for parsing and writing one container from/to one file.
///
/// # Example
///
/// ```rust,no_run
/// use satloc::{formats::ResourceSet, traits::Parser};
/// let set = ResourceSet::read_from("App.g.resources")?;
/// set.write_to("App.g.copy.resources")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: Read>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Write to file path.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        self.to_writer(BufWriter::new(file))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Serialize into a new buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.to_writer(&mut bytes)?;
        Ok(bytes)
    }
}

/// A seekable source, usable as a trait object.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// A seekable sink, usable as a trait object.
pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

/// Everything a [`Localizer`] gets besides the leaf bytes.
pub struct LeafContext<'a> {
    /// Stream name the leaf's translations are stored under.
    pub stream_name: &'a str,
    pub resolver: &'a dyn LocalizabilityResolver,
    /// Run-scoped lookup cache for `resolver`.
    pub cache: &'a mut ResolverCache,
    /// Contents of the companion comment file, if one exists.
    pub comments: Option<&'a str>,
}

/// The format-specific codec that maps one leaf record to its localizable units.
///
/// satloc never looks inside a leaf: it hands the bytes to an implementation of
/// this trait and stores or substitutes whatever units come back.
pub trait Localizer {
    /// Lists every localizable unit of the leaf.
    fn extract(
        &self,
        leaf: &[u8],
        context: &mut LeafContext<'_>,
    ) -> Result<LocalizationDictionary, Error>;

    /// Returns the leaf with `translations` substituted in. A `None` unit asks the
    /// localizer to drop that unit's localized value.
    fn apply(
        &self,
        leaf: &[u8],
        context: &mut LeafContext<'_>,
        translations: &LocalizationDictionary,
    ) -> Result<Vec<u8>, Error>;
}

/// Maps element and property types to their localizability.
///
/// Implementations receive the run's [`ResolverCache`] so repeated type lookups
/// are memoized for the lifetime of one run only.
pub trait LocalizabilityResolver {
    /// Localizability of an element of class `class_name` from `assembly`.
    fn element_localizability(
        &self,
        assembly: &str,
        class_name: &str,
        cache: &mut ResolverCache,
    ) -> ElementLocalizability;

    /// Localizability of `property` on `class_name`; `None` when the type is unknown.
    fn property_localizability(
        &self,
        assembly: &str,
        class_name: &str,
        property: &str,
        cache: &mut ResolverCache,
    ) -> Option<LocalizabilityAttribute>;

    /// Class name of an inline formatting tag such as `b`.
    fn resolve_formatting_tag_to_class(&self, tag: &str) -> Option<String>;

    /// Assembly that defines `class_name`.
    fn resolve_assembly_from_class(
        &self,
        class_name: &str,
        cache: &mut ResolverCache,
    ) -> Option<String>;
}
