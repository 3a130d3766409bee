//! Recursive container walker.
//!
//! A container tree is a [`Node`]: a single leaf, a flat container of leaves and
//! opaque values, a composite bundle of flat containers and manifest files, or an
//! opaque payload. [`Walker::walk`] dispatches on the node, substitutes translations
//! into leaves and re-emits everything else unchanged and in source order.
//! [`visit_leaves`] walks the same shapes for extraction.

use std::{
    fs,
    io::{self, Cursor, Read, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    error::Error,
    formats::{
        BundleHeader, BundleReader, BundleWriter, FileType, ResourceReader, ResourceValue,
        ResourceWriter, StoredValue, is_leaf_name, is_resources_name,
    },
    key::KEY_SEPARATOR,
    naming,
    options::FailurePolicy,
    resolver::ResolverCache,
    table::TranslationTable,
    traits::{LeafContext, LocalizabilityResolver, Localizer, ReadSeek, WriteSeek},
    types::{Culture, LocalizationDictionary},
};

/// One level of a container tree.
pub enum Node<'n> {
    /// A leaf record stream, addressed in the table by `stream_name`.
    Leaf { stream_name: String, data: Vec<u8> },
    /// A flat container. Leaf entries are addressed as `{prefix}:{entry}`.
    Flat {
        prefix: String,
        source: &'n mut dyn ReadSeek,
        sink: &'n mut dyn Write,
    },
    /// A composite bundle, re-emitted as a satellite bundle.
    Composite {
        name: String,
        source: &'n mut dyn ReadSeek,
        sink: &'n mut dyn WriteSeek,
    },
    /// A payload copied as is.
    Opaque { name: String, value: StoredValue },
}

/// What walking a node produced.
#[derive(Debug)]
pub enum Emitted {
    /// A value for the parent container to store.
    Value(StoredValue),
    /// The node wrote itself to its sink.
    Written,
}

/// Counters of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Path of the generated file.
    pub output: PathBuf,
    /// Leaves re-encoded with at least one modified unit.
    pub leaves_translated: usize,
    /// Leaves copied because nothing in them changed.
    pub leaves_unchanged: usize,
    /// Leaves that failed and were tolerated by [`FailurePolicy::SkipLeaf`].
    pub leaves_skipped: usize,
    /// Non-leaf entries copied byte for byte.
    pub opaque_copied: usize,
    /// Bundle entries that live in another bundle and were not emitted.
    pub skipped_external: usize,
}

/// Walks container trees in the generation direction.
pub struct Walker<'a> {
    table: &'a TranslationTable,
    localizer: &'a dyn Localizer,
    resolver: &'a dyn LocalizabilityResolver,
    cache: ResolverCache,
    comments_dir: PathBuf,
    policy: FailurePolicy,
    source_culture: Option<Culture>,
    target_culture: Option<Culture>,
    report: GenerationReport,
}

impl<'a> Walker<'a> {
    pub fn new(
        table: &'a TranslationTable,
        localizer: &'a dyn Localizer,
        resolver: &'a dyn LocalizabilityResolver,
    ) -> Self {
        Self {
            table,
            localizer,
            resolver,
            cache: ResolverCache::new(),
            comments_dir: PathBuf::from("."),
            policy: FailurePolicy::default(),
            source_culture: None,
            target_culture: None,
            report: GenerationReport::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_comments_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.comments_dir = dir.into();
        self
    }

    pub fn with_cultures(mut self, source: Option<Culture>, target: Option<Culture>) -> Self {
        self.source_culture = source;
        self.target_culture = target;
        self
    }

    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    pub fn into_report(self) -> GenerationReport {
        self.report
    }

    /// Walks one node and everything below it.
    pub fn walk(&mut self, node: Node<'_>) -> Result<Emitted, Error> {
        match node {
            Node::Leaf { stream_name, data } => self
                .leaf(&stream_name, data)
                .map(|data| Emitted::Value(StoredValue::Stream(data))),
            Node::Flat {
                prefix,
                source,
                sink,
            } => {
                self.flat(&prefix, source, sink)?;
                Ok(Emitted::Written)
            }
            Node::Composite { name, source, sink } => {
                self.composite(&name, source, sink)?;
                Ok(Emitted::Written)
            }
            Node::Opaque { name, value } => {
                tracing::debug!("Copying {} ({} bytes)", name, value.data().len());
                self.report.opaque_copied += 1;
                Ok(Emitted::Value(value))
            }
        }
    }

    fn tolerates(&self, error: &Error) -> bool {
        self.policy == FailurePolicy::SkipLeaf && error.is_leaf_local()
    }

    fn leaf(&mut self, stream_name: &str, data: Vec<u8>) -> Result<Vec<u8>, Error> {
        let table = self.table;
        let Some(translations) = table.lookup(stream_name) else {
            tracing::debug!("No translations for {}, copying", stream_name);
            self.report.leaves_unchanged += 1;
            return Ok(data);
        };

        match self.localize_leaf(stream_name, &data, translations) {
            Ok(Some(localized)) => {
                self.report.leaves_translated += 1;
                Ok(localized)
            }
            Ok(None) => {
                self.report.leaves_unchanged += 1;
                Ok(data)
            }
            Err(e) if self.tolerates(&e) => {
                tracing::warn!("Keeping source of {}: {}", stream_name, e);
                self.report.leaves_skipped += 1;
                Ok(data)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns `None` when no unit of the leaf actually changes.
    fn localize_leaf(
        &mut self,
        stream_name: &str,
        data: &[u8],
        translations: &LocalizationDictionary,
    ) -> Result<Option<Vec<u8>>, Error> {
        let comments = load_comments(&self.comments_dir, stream_name)?;
        let mut context = LeafContext {
            stream_name,
            resolver: self.resolver,
            cache: &mut self.cache,
            comments: comments.as_deref(),
        };

        let source = self.localizer.extract(data, &mut context)?;
        let modified = translations.modified_against(&source);
        tracing::debug!(
            "{}: {} of {} table units modify the source",
            stream_name,
            modified.len(),
            translations.len()
        );
        if modified.is_empty() {
            return Ok(None);
        }

        self.localizer
            .apply(data, &mut context, &modified)
            .map(Some)
    }

    fn flat(
        &mut self,
        prefix: &str,
        source: &mut dyn ReadSeek,
        sink: &mut dyn Write,
    ) -> Result<(), Error> {
        let mut reader = ResourceReader::new(source, prefix)?;
        let mut writer = ResourceWriter::new();
        tracing::info!("Processing {} ({} entries)", prefix, reader.len());

        for index in 0..reader.len() {
            let info = reader.entries()[index].clone();
            let context = naming::stream_name(prefix, &info.name);

            if info.is_stream() && is_leaf_name(&info.name) {
                let data = match read_stream(&mut reader, index, &context) {
                    Ok(data) => data,
                    Err(e) if self.tolerates(&e) => {
                        tracing::warn!("Dropping {}: {}", context, e);
                        self.report.leaves_skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let node = Node::Leaf {
                    stream_name: context,
                    data,
                };
                if let Emitted::Value(value) = self.walk(node)? {
                    writer.add(info.name, value);
                }
            } else {
                let value = reader
                    .read_value(index)?
                    .materialize()
                    .map_err(|e| Error::io(&context, e))?;
                let node = Node::Opaque {
                    name: context,
                    value,
                };
                if let Emitted::Value(value) = self.walk(node)? {
                    writer.add(info.name, value);
                }
            }
        }

        writer.finish(sink)
    }

    fn composite(
        &mut self,
        name: &str,
        source: &mut dyn ReadSeek,
        sink: &mut dyn WriteSeek,
    ) -> Result<(), Error> {
        let target = self.target_culture.clone().ok_or_else(|| {
            Error::InvalidOptions(format!("a target culture is required to localize `{}`", name))
        })?;
        let mut reader = BundleReader::new(source, name)?;
        let header = reader.header().clone();
        let source_culture = header.culture.clone().or_else(|| self.source_culture.clone());

        let output_name = match FileType::from_path(name) {
            Ok(file_type) => {
                naming::output_file_name(name, file_type, source_culture.as_ref(), Some(&target))
            }
            Err(_) => name.to_string(),
        };
        let bundle_name = Path::new(&output_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&output_name)
            .to_string();
        let out_header = BundleHeader::new(
            bundle_name,
            naming::satellite_module_name(&output_name, &target),
        )
        .with_culture(Some(target.clone()));
        tracing::info!(
            "Generating {} for {} from {}",
            out_header.module_name,
            target,
            name
        );

        let mut writer = BundleWriter::new(sink, &out_header)?;
        for index in 0..reader.entries().len() {
            let info = reader.entries()[index].clone();

            if info.location.is_in_another_bundle() {
                tracing::debug!("Skipping {}, it lives in another bundle", info.name);
                self.report.skipped_external += 1;
                continue;
            }

            let out_name =
                naming::satellite_entry_name(&info.name, source_culture.as_ref(), &target);
            if is_resources_name(&info.name) {
                // one inner container in memory at a time
                let mut inner_source = Cursor::new(reader.read_entry(index)?);
                let mut inner_sink = Vec::new();
                self.walk(Node::Flat {
                    prefix: info.name.clone(),
                    source: &mut inner_source,
                    sink: &mut inner_sink,
                })?;
                writer.add_entry(&out_name, info.location, &inner_sink)?;
            } else if is_leaf_name(&info.name) {
                let data = match reader.read_entry(index) {
                    Ok(data) => data,
                    Err(e) if self.tolerates(&e) => {
                        tracing::warn!("Dropping {}: {}", info.name, e);
                        self.report.leaves_skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let node = Node::Leaf {
                    stream_name: info.name.clone(),
                    data,
                };
                if let Emitted::Value(value) = self.walk(node)? {
                    writer.add_entry(&out_name, info.location, value.data())?;
                }
            } else {
                tracing::debug!("Copying manifest entry {} as {}", info.name, out_name);
                let node = Node::Opaque {
                    name: info.name.clone(),
                    value: StoredValue::Stream(reader.read_entry(index)?),
                };
                if let Emitted::Value(value) = self.walk(node)? {
                    writer.add_entry(&out_name, info.location, value.data())?;
                }
            }
        }

        writer.finish()?;
        Ok(())
    }
}

fn read_stream<R: io::Read + io::Seek>(
    reader: &mut ResourceReader<R>,
    index: usize,
    context: &str,
) -> Result<Vec<u8>, Error> {
    match reader.read_value(index)? {
        ResourceValue::Stream(mut stream) => {
            let mut data = Vec::new();
            stream
                .read_to_end(&mut data)
                .map_err(|e| Error::io(context, e))?;
            Ok(data)
        }
        ResourceValue::Serialized { data, .. } => Ok(data),
    }
}

/// Reads the comment file of the leaf addressed by `stream_name`, if there is one.
pub fn load_comments(dir: &Path, stream_name: &str) -> Result<Option<String>, Error> {
    let leaf = stream_name
        .rsplit_once(KEY_SEPARATOR)
        .map_or(stream_name, |(_, entry)| entry);
    let path = dir.join(naming::comment_file_name(leaf));
    match fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path.display().to_string(), e)),
    }
}

/// Calls `visit` with the stream name and bytes of every leaf in a container tree,
/// in source order. Returns the number of leaves visited.
pub fn visit_leaves(
    file_type: FileType,
    name: &str,
    source: &mut dyn ReadSeek,
    visit: &mut dyn FnMut(&str, &[u8]) -> Result<(), Error>,
) -> Result<usize, Error> {
    match file_type {
        FileType::Leaf => {
            let mut data = Vec::new();
            source
                .read_to_end(&mut data)
                .map_err(|e| Error::io(name, e))?;
            visit(name, &data)?;
            Ok(1)
        }
        FileType::Resources => visit_flat(name, source, visit),
        FileType::Dll | FileType::Exe => visit_bundle(name, source, visit),
        FileType::Csv | FileType::Txt => Err(Error::UnsupportedContainerShape(name.to_string())),
    }
}

fn visit_flat(
    prefix: &str,
    source: &mut dyn ReadSeek,
    visit: &mut dyn FnMut(&str, &[u8]) -> Result<(), Error>,
) -> Result<usize, Error> {
    let mut reader = ResourceReader::new(source, prefix)?;
    let mut visited = 0;
    for index in 0..reader.len() {
        let info = reader.entries()[index].clone();
        if !(info.is_stream() && is_leaf_name(&info.name)) {
            continue;
        }
        let stream_name = naming::stream_name(prefix, &info.name);
        let data = read_stream(&mut reader, index, &stream_name)?;
        visit(&stream_name, &data)?;
        visited += 1;
    }
    Ok(visited)
}

fn visit_bundle(
    name: &str,
    source: &mut dyn ReadSeek,
    visit: &mut dyn FnMut(&str, &[u8]) -> Result<(), Error>,
) -> Result<usize, Error> {
    let mut reader = BundleReader::new(source, name)?;
    let mut visited = 0;
    for index in 0..reader.entries().len() {
        let info = reader.entries()[index].clone();
        if info.location.is_in_another_bundle() {
            continue;
        }
        if is_resources_name(&info.name) {
            let mut inner = Cursor::new(reader.read_entry(index)?);
            visited += visit_flat(&info.name, &mut inner, visit)?;
        } else if is_leaf_name(&info.name) {
            let data = reader.read_entry(index)?;
            visit(&info.name, &data)?;
            visited += 1;
        }
    }
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        formats::{Bundle, ResourceLocation, ResourceSet},
        resolver::RegistryResolver,
        traits::Parser,
        types::{LocalizableKey, LocalizableUnit, LocalizationCategory},
    };

    /// Leaf format for these tests: one `id=content` unit per line.
    struct LineLocalizer;

    impl Localizer for LineLocalizer {
        fn extract(
            &self,
            leaf: &[u8],
            context: &mut LeafContext<'_>,
        ) -> Result<LocalizationDictionary, Error> {
            let text = std::str::from_utf8(leaf)
                .map_err(|_| Error::localizer(context.stream_name, "not UTF-8"))?;
            Ok(text
                .lines()
                .filter_map(|line| line.split_once('='))
                .map(|(id, content)| {
                    (
                        LocalizableKey::new(id, "Ty", "Text"),
                        LocalizableUnit::new(LocalizationCategory::Text, content),
                    )
                })
                .collect())
        }

        fn apply(
            &self,
            leaf: &[u8],
            context: &mut LeafContext<'_>,
            translations: &LocalizationDictionary,
        ) -> Result<Vec<u8>, Error> {
            let source = self.extract(leaf, context)?;
            let mut out = String::new();
            for (key, unit) in &source {
                let content = match translations.get(key) {
                    Some(Some(unit)) => unit.content.as_str(),
                    Some(None) => continue,
                    None => unit.as_ref().map_or("", |u| u.content.as_str()),
                };
                out.push_str(&format!("{}={}\n", key.unit_id, content));
            }
            Ok(out.into_bytes())
        }
    }

    fn table(rows: &[[&str; 7]]) -> TranslationTable {
        TranslationTable::from_rows(rows.iter()).unwrap()
    }

    fn fr() -> Culture {
        Culture::parse("fr-FR").unwrap()
    }

    #[test]
    fn test_leaf_is_translated() {
        let table = table(&[["main.baml", "a:Ty.Text", "Text", "True", "True", "", "Bonjour"]]);
        let resolver = RegistryResolver::new();
        let mut walker = Walker::new(&table, &LineLocalizer, &resolver);

        let emitted = walker
            .walk(Node::Leaf {
                stream_name: "main.baml".to_string(),
                data: b"a=Hello\nb=World\n".to_vec(),
            })
            .unwrap();
        let Emitted::Value(value) = emitted else {
            panic!("expected a value");
        };
        assert_eq!(value.data(), b"a=Bonjour\nb=World\n");
        assert_eq!(walker.report().leaves_translated, 1);
    }

    #[test]
    fn test_unchanged_leaf_is_copied_verbatim() {
        let table = table(&[["main.baml", "a:Ty.Text", "Text", "True", "True", "", "Hello"]]);
        let resolver = RegistryResolver::new();
        let mut walker = Walker::new(&table, &LineLocalizer, &resolver);

        // no trailing newline, so a re-encode would be visible
        let emitted = walker
            .walk(Node::Leaf {
                stream_name: "main.baml".to_string(),
                data: b"a=Hello".to_vec(),
            })
            .unwrap();
        let Emitted::Value(value) = emitted else {
            panic!("expected a value");
        };
        assert_eq!(value.data(), b"a=Hello");
        assert_eq!(walker.report().leaves_unchanged, 1);
    }

    #[test]
    fn test_flat_preserves_order_and_opaque_entries() {
        let set = ResourceSet::new()
            .with_stream("a.baml", b"x=1\n".to_vec())
            .with_serialized("Title", "System.String", b"T".to_vec())
            .with_stream("b.baml", b"y=2\n".to_vec())
            .with_stream("c.png", vec![1, 2, 3]);
        let bytes = set.to_bytes().unwrap();

        let table = table(&[["App.g.resources:b.baml", "y:Ty.Text", "Text", "True", "True", "", "deux"]]);
        let resolver = RegistryResolver::new();
        let mut walker = Walker::new(&table, &LineLocalizer, &resolver);

        let mut source = Cursor::new(bytes);
        let mut sink = Vec::new();
        walker
            .walk(Node::Flat {
                prefix: "App.g.resources".to_string(),
                source: &mut source,
                sink: &mut sink,
            })
            .unwrap();

        let out = ResourceSet::from_bytes(&sink).unwrap();
        assert_eq!(out.names(), vec!["a.baml", "Title", "b.baml", "c.png"]);
        assert_eq!(out.get("a.baml").unwrap().data(), b"x=1\n");
        assert_eq!(out.get("b.baml").unwrap().data(), b"y=deux\n");
        assert_eq!(out.get("Title"), set.get("Title"));
        assert_eq!(out.get("c.png"), set.get("c.png"));

        let report = walker.report();
        assert_eq!(report.leaves_translated, 1);
        assert_eq!(report.leaves_unchanged, 1);
        assert_eq!(report.opaque_copied, 2);
    }

    #[test]
    fn test_composite_renames_and_skips_external() {
        let inner = ResourceSet::new()
            .with_stream("main.baml", b"t=Hi\n".to_vec())
            .to_bytes()
            .unwrap();
        let bundle = Bundle::new(BundleHeader::new("App", "App.exe"))
            .with_entry("App.g.resources", ResourceLocation::default(), inner)
            .with_entry("top.baml", ResourceLocation::default(), b"k=v\n".to_vec())
            .with_entry("Other.resources", ResourceLocation::IN_ANOTHER_BUNDLE, Vec::new())
            .with_entry("icon.ico", ResourceLocation::default(), vec![9, 9]);
        let bytes = bundle.to_bytes().unwrap();

        let table = table(&[
            ["App.g.resources:main.baml", "t:Ty.Text", "Text", "True", "True", "", "Salut"],
            ["top.baml", "k:Ty.Text", "Text", "True", "True", "", "w"],
        ]);
        let resolver = RegistryResolver::new();
        let mut walker =
            Walker::new(&table, &LineLocalizer, &resolver).with_cultures(None, Some(fr()));

        let mut source = Cursor::new(bytes);
        let mut sink = Cursor::new(Vec::new());
        walker
            .walk(Node::Composite {
                name: "App.exe".to_string(),
                source: &mut source,
                sink: &mut sink,
            })
            .unwrap();

        let out = Bundle::from_bytes(sink.get_ref()).unwrap();
        assert_eq!(out.header.name, "App.resources");
        assert_eq!(out.header.module_name, "App.fr-FR.resources.dll");
        assert_eq!(out.header.culture, Some(fr()));
        assert_eq!(
            out.names(),
            vec!["App.g.fr-FR.resources", "top.fr-FR.baml", "icon.fr-FR.ico"]
        );

        let inner = ResourceSet::from_bytes(&out.get("App.g.fr-FR.resources").unwrap().data).unwrap();
        assert_eq!(inner.get("main.baml").unwrap().data(), b"t=Salut\n");
        assert_eq!(out.get("top.fr-FR.baml").unwrap().data, b"k=w\n");
        assert_eq!(out.get("icon.fr-FR.ico").unwrap().data, vec![9, 9]);
        assert!(out.get("top.baml").is_none());
        assert_eq!(walker.report().skipped_external, 1);
    }

    #[test]
    fn test_composite_needs_target_culture() {
        let bytes = Bundle::new(BundleHeader::new("App", "App.exe"))
            .to_bytes()
            .unwrap();
        let table = TranslationTable::new();
        let resolver = RegistryResolver::new();
        let mut walker = Walker::new(&table, &LineLocalizer, &resolver);
        let result = walker.walk(Node::Composite {
            name: "App.exe".to_string(),
            source: &mut Cursor::new(bytes),
            sink: &mut Cursor::new(Vec::new()),
        });
        assert!(matches!(result, Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn test_localizer_failure_follows_policy() {
        let table = table(&[["bad.baml", "a:Ty.Text", "Text", "True", "True", "", "x"]]);
        let resolver = RegistryResolver::new();
        let leaf = || Node::Leaf {
            stream_name: "bad.baml".to_string(),
            data: vec![0xFF, 0xFE],
        };

        let mut walker = Walker::new(&table, &LineLocalizer, &resolver);
        assert!(matches!(walker.walk(leaf()), Err(Error::Localizer { .. })));

        let mut walker =
            Walker::new(&table, &LineLocalizer, &resolver).with_policy(FailurePolicy::SkipLeaf);
        let Emitted::Value(value) = walker.walk(leaf()).unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(value.data(), &[0xFF, 0xFE]);
        assert_eq!(walker.report().leaves_skipped, 1);
    }

    #[test]
    fn test_visit_leaves_in_bundle() {
        let inner = ResourceSet::new()
            .with_stream("one.baml", b"a=1\n".to_vec())
            .with_serialized("two.baml", "System.String", b"not a stream".to_vec())
            .with_stream("three.baml", b"c=3\n".to_vec())
            .to_bytes()
            .unwrap();
        let bytes = Bundle::new(BundleHeader::new("App", "App.dll"))
            .with_entry("App.g.resources", ResourceLocation::default(), inner)
            .with_entry("top.baml", ResourceLocation::default(), b"t=0\n".to_vec())
            .with_entry("x.baml", ResourceLocation::IN_ANOTHER_BUNDLE, Vec::new())
            .to_bytes()
            .unwrap();

        let mut seen = Vec::new();
        let count = visit_leaves(
            FileType::Dll,
            "App.dll",
            &mut Cursor::new(bytes),
            &mut |stream, _| {
                seen.push(stream.to_string());
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            seen,
            vec![
                "App.g.resources:one.baml",
                "App.g.resources:three.baml",
                "top.baml"
            ]
        );
    }

    #[test]
    fn test_load_comments() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.loc"), "notes").unwrap();
        assert_eq!(
            load_comments(dir.path(), "App.g.resources:main.baml").unwrap(),
            Some("notes".to_string())
        );
        assert_eq!(load_comments(dir.path(), "other.baml").unwrap(), None);
    }
}
