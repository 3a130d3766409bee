#![allow(dead_code)]

use satloc::formats::{DelimitedReader, DelimitedWriter, Delimiter};
use satloc::resolver::{LocalizabilityAttribute, Readability, TypeDescriptor};
use satloc::{
    Error, LeafContext, LocalizableKey, LocalizableUnit, LocalizationCategory,
    LocalizationDictionary, Localizer, RegistryResolver,
};
use std::fs::File;
use std::path::Path;

pub const ASSEMBLY: &str = "PresentationFramework";
pub const TEXT_BLOCK: &str = "System.Windows.Controls.TextBlock";
pub const BUTTON: &str = "System.Windows.Controls.Button";

/// Leaf format used by the tests: one `id=content` unit per line, or
/// `id@Button=content` for a button. The comment file holds `id: comment` lines.
pub struct TextLocalizer;

fn split_line(line: &str) -> Option<(&str, &str, &str)> {
    let (head, content) = line.split_once('=')?;
    match head.split_once('@') {
        Some((id, "Button")) => Some((id, BUTTON, content)),
        Some(_) => None,
        None => Some((head, TEXT_BLOCK, content)),
    }
}

fn comment_for<'c>(comments: Option<&'c str>, id: &str) -> Option<&'c str> {
    comments?
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(uid, _)| uid.trim() == id)
        .map(|(_, comment)| comment.trim())
}

impl Localizer for TextLocalizer {
    fn extract(
        &self,
        leaf: &[u8],
        context: &mut LeafContext<'_>,
    ) -> Result<LocalizationDictionary, Error> {
        let text = std::str::from_utf8(leaf)
            .map_err(|e| Error::localizer(context.stream_name, e.to_string()))?;

        let mut units = LocalizationDictionary::new();
        for line in text.lines() {
            let Some((id, class_name, content)) = split_line(line) else {
                continue;
            };
            let attribute = context
                .resolver
                .element_localizability(ASSEMBLY, class_name, &mut *context.cache)
                .attribute
                .unwrap_or_else(|| LocalizabilityAttribute::new(LocalizationCategory::Text));

            let mut unit = LocalizableUnit::new(attribute.category, content)
                .with_readable(attribute.readability != Readability::Unreadable);
            if let Some(comment) = comment_for(context.comments, id) {
                unit = unit.with_comment(comment);
            }
            units.insert(LocalizableKey::new(id, class_name, "Text"), Some(unit));
        }
        Ok(units)
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
                Some(Some(translated)) => translated.content.as_str(),
                Some(None) => continue,
                None => unit.as_ref().map_or("", |u| u.content.as_str()),
            };
            if key.type_name == BUTTON {
                out.push_str(&format!("{}@Button={}\n", key.unit_id, content));
            } else {
                out.push_str(&format!("{}={}\n", key.unit_id, content));
            }
        }
        Ok(out.into_bytes())
    }
}

pub fn resolver() -> RegistryResolver {
    RegistryResolver::new()
        .with_type(
            TypeDescriptor::new(ASSEMBLY, TEXT_BLOCK)
                .with_attribute(LocalizabilityAttribute::new(LocalizationCategory::Text)),
        )
        .with_type(
            TypeDescriptor::new(ASSEMBLY, BUTTON)
                .with_attribute(LocalizabilityAttribute::new(LocalizationCategory::Button)),
        )
}

pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let file = File::open(path).expect("open table");
    DelimitedReader::from_reader(file, Delimiter::from_path(path))
        .expect("decode table")
        .rows()
}

pub fn write_rows(path: &Path, rows: &[Vec<String>]) {
    let file = File::create(path).expect("create table");
    let mut writer =
        DelimitedWriter::with_bom(file, Delimiter::from_path(path)).expect("write bom");
    for row in rows {
        writer.write_row(row.as_slice()).expect("write row");
    }
    writer.flush().expect("flush table");
}

/// Rewrites the content cell of every row whose key cell starts with `unit_id:`.
pub fn translate(path: &Path, edits: &[(&str, &str)]) {
    let mut rows = read_rows(path);
    for row in &mut rows {
        let Some((_, target)) = edits
            .iter()
            .find(|(id, _)| row.get(1).is_some_and(|key| key.starts_with(&format!("{}:", id))))
        else {
            continue;
        };
        row.resize(7, String::new());
        row[6] = target.to_string();
    }
    write_rows(path, &rows);
}
