//! The two runs: extracting a translation table from a container tree, and
//! generating a localized container tree from a translation table.
//!
//! Outputs are written to a temporary file next to their destination and only moved
//! into place once the whole file was produced.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{
    error::Error,
    formats::{FileType, delimited::DelimitedWriter},
    options::{ExtractOptions, GenerateOptions},
    resolver::ResolverCache,
    table::{TranslationTable, write_unit_row},
    traits::{LeafContext, LocalizabilityResolver, Localizer},
    walker::{Emitted, Node, Walker, load_comments, visit_leaves},
};

pub use crate::walker::GenerationReport;

/// Counters of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    /// Leaf streams visited.
    pub streams: usize,
    /// Rows written.
    pub units: usize,
}

fn file_name(path: &Path) -> Result<String, Error> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidOptions(format!("`{}` has no file name", path.display())))
}

fn open_input(path: &Path) -> Result<BufReader<File>, Error> {
    let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(BufReader::new(file))
}

fn temp_file_in(dir: &Path) -> Result<NamedTempFile, Error> {
    NamedTempFile::new_in(dir).map_err(|e| Error::io(dir.display().to_string(), e))
}

fn persist(temp: NamedTempFile, path: &Path) -> Result<(), Error> {
    temp.persist(path)
        .map_err(|e| Error::io(path.display().to_string(), e.error))?;
    Ok(())
}

/// Writes one row per localizable unit of every leaf under `options.input`.
pub fn extract_translations(
    options: &ExtractOptions,
    localizer: &dyn Localizer,
    resolver: &dyn LocalizabilityResolver,
) -> Result<ExtractReport, Error> {
    let file_type = options.validate()?;
    let input_name = file_name(&options.input)?;
    let comments_dir = options.comments_dir();
    tracing::info!("Extracting {} to {}", options.input.display(), options.output.display());

    let mut source = open_input(&options.input)?;
    let out_dir = match options.output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temp = temp_file_in(&out_dir)?;
    let mut writer =
        DelimitedWriter::with_bom(BufWriter::new(temp.as_file_mut()), options.delimiter())?;

    let mut cache = ResolverCache::new();
    let mut report = ExtractReport::default();
    visit_leaves(file_type, &input_name, &mut source, &mut |stream, data| {
        let comments = load_comments(&comments_dir, stream)?;
        let mut context = LeafContext {
            stream_name: stream,
            resolver,
            cache: &mut cache,
            comments: comments.as_deref(),
        };
        let units = localizer.extract(data, &mut context)?;

        for (key, unit) in &units {
            if let Some(unit) = unit {
                write_unit_row(&mut writer, stream, key, unit)?;
                report.units += 1;
            }
        }
        report.streams += 1;
        tracing::info!("Extracted {} units from {}", units.len(), stream);
        Ok(())
    })?;

    writer.flush()?;
    drop(writer);
    persist(temp, &options.output)?;

    tracing::info!(
        "Done: {} rows from {} streams",
        report.units,
        report.streams
    );
    Ok(report)
}

/// Generates the localized counterpart of `options.input` in `options.output_dir`.
pub fn generate_translations(
    options: &GenerateOptions,
    localizer: &dyn Localizer,
    resolver: &dyn LocalizabilityResolver,
) -> Result<GenerationReport, Error> {
    let file_type = options.validate()?;
    let table = TranslationTable::read_from(&options.translations, options.delimiter())?;

    let input_name = file_name(&options.input)?;
    let output_path = options.output_path(file_type)?;
    tracing::info!("Generating {}", output_path.display());

    let mut walker = Walker::new(&table, localizer, resolver)
        .with_policy(options.failure_policy)
        .with_comments_dir(options.comments_dir())
        .with_cultures(options.source_culture.clone(), options.culture.clone());

    let mut source = open_input(&options.input)?;
    let mut temp = temp_file_in(&options.output_dir)?;
    {
        let mut sink = BufWriter::new(temp.as_file_mut());
        match file_type {
            FileType::Leaf => {
                let mut data = Vec::new();
                source
                    .read_to_end(&mut data)
                    .map_err(|e| Error::io(&input_name, e))?;
                let node = Node::Leaf {
                    stream_name: input_name.clone(),
                    data,
                };
                if let Emitted::Value(value) = walker.walk(node)? {
                    sink.write_all(value.data())?;
                }
            }
            FileType::Resources => {
                walker.walk(Node::Flat {
                    prefix: input_name.clone(),
                    source: &mut source,
                    sink: &mut sink,
                })?;
            }
            FileType::Dll | FileType::Exe => {
                walker.walk(Node::Composite {
                    name: input_name.clone(),
                    source: &mut source,
                    sink: &mut sink,
                })?;
            }
            FileType::Csv | FileType::Txt => {
                return Err(Error::UnsupportedContainerShape(input_name));
            }
        }
        sink.flush()?;
    }
    persist(temp, &output_path)?;

    let mut report = walker.into_report();
    report.output = output_path;
    tracing::info!(
        "Done: {} translated, {} unchanged, {} skipped",
        report.leaves_translated,
        report.leaves_unchanged,
        report.leaves_skipped
    );
    Ok(report)
}
