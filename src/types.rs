//! Core, format-agnostic types for satloc.
//! The table reader and the external localizers decode into these; writers serialize these.

use std::{fmt::Display, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// Identifies one translatable field within one leaf record.
///
/// Equality is structural: two keys are the same unit when all three parts match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct LocalizableKey {
    /// Id of the element inside the leaf record. May itself contain `.` and `:`.
    pub unit_id: String,

    /// Fully qualified type name of the element owning the property.
    pub type_name: String,

    /// Name of the localizable property.
    pub property_name: String,
}

impl LocalizableKey {
    pub fn new(
        unit_id: impl Into<String>,
        type_name: impl Into<String>,
        property_name: impl Into<String>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            type_name: type_name.into(),
            property_name: property_name.into(),
        }
    }
}

impl Display for LocalizableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::key::encode_key(self))
    }
}

/// The kind of text a localizable unit holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LocalizationCategory {
    None,
    Text,
    Title,
    Label,
    Button,
    CheckBox,
    ComboBox,
    ListBox,
    Menu,
    RadioButton,
    ToolTip,
    Hyperlink,
    TextFlow,
    XmlData,
    Font,
    Inherit,
    Ignore,
    NeverLocalize,
}

impl LocalizationCategory {
    pub const ALL: [LocalizationCategory; 18] = [
        LocalizationCategory::None,
        LocalizationCategory::Text,
        LocalizationCategory::Title,
        LocalizationCategory::Label,
        LocalizationCategory::Button,
        LocalizationCategory::CheckBox,
        LocalizationCategory::ComboBox,
        LocalizationCategory::ListBox,
        LocalizationCategory::Menu,
        LocalizationCategory::RadioButton,
        LocalizationCategory::ToolTip,
        LocalizationCategory::Hyperlink,
        LocalizationCategory::TextFlow,
        LocalizationCategory::XmlData,
        LocalizationCategory::Font,
        LocalizationCategory::Inherit,
        LocalizationCategory::Ignore,
        LocalizationCategory::NeverLocalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocalizationCategory::None => "None",
            LocalizationCategory::Text => "Text",
            LocalizationCategory::Title => "Title",
            LocalizationCategory::Label => "Label",
            LocalizationCategory::Button => "Button",
            LocalizationCategory::CheckBox => "CheckBox",
            LocalizationCategory::ComboBox => "ComboBox",
            LocalizationCategory::ListBox => "ListBox",
            LocalizationCategory::Menu => "Menu",
            LocalizationCategory::RadioButton => "RadioButton",
            LocalizationCategory::ToolTip => "ToolTip",
            LocalizationCategory::Hyperlink => "Hyperlink",
            LocalizationCategory::TextFlow => "TextFlow",
            LocalizationCategory::XmlData => "XmlData",
            LocalizationCategory::Font => "Font",
            LocalizationCategory::Inherit => "Inherit",
            LocalizationCategory::Ignore => "Ignore",
            LocalizationCategory::NeverLocalize => "NeverLocalize",
        }
    }
}

impl Display for LocalizationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the exact category names, surrounding whitespace ignored.
impl FromStr for LocalizationCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        LocalizationCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// One translatable field's metadata and content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocalizableUnit {
    pub category: LocalizationCategory,

    /// Whether a translator should see the content.
    pub readable: bool,

    /// Whether a translator may change the content.
    pub modifiable: bool,

    /// Optional localization comment for translators.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,

    /// Content of the field. May be empty, never absent.
    pub content: String,
}

impl LocalizableUnit {
    pub fn new(category: LocalizationCategory, content: impl Into<String>) -> Self {
        Self {
            category,
            readable: true,
            modifiable: true,
            comment: None,
            content: content.into(),
        }
    }

    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    pub fn with_modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Ordered mapping from key to unit for one leaf record stream.
///
/// A `None` unit records an explicit deletion: the unit existed in the source but the
/// translator removed its trailing cells. A key that is absent carries no information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizationDictionary {
    entries: IndexMap<LocalizableKey, Option<LocalizableUnit>>,
}

impl LocalizationDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a unit. An overwritten key keeps its first position.
    pub fn insert(&mut self, key: LocalizableKey, unit: Option<LocalizableUnit>) {
        self.entries.insert(key, unit);
    }

    pub fn get(&self, key: &LocalizableKey) -> Option<&Option<LocalizableUnit>> {
        self.entries.get(key)
    }

    /// Returns the unit for `key` when it is present and not a deletion.
    pub fn unit(&self, key: &LocalizableKey) -> Option<&LocalizableUnit> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn contains_key(&self, key: &LocalizableKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, LocalizableKey, Option<LocalizableUnit>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, LocalizableKey, Option<LocalizableUnit>> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps only units that genuinely change `source`: the key must exist in the
    /// source, and either be deleted or carry content different from the source.
    pub fn modified_against(&self, source: &LocalizationDictionary) -> LocalizationDictionary {
        self.entries
            .iter()
            .filter(|(key, unit)| match (source.get(key), unit) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(None), Some(_)) => true,
                (Some(Some(original)), Some(edited)) => original.content != edited.content,
            })
            .map(|(key, unit)| (key.clone(), unit.clone()))
            .collect()
    }
}

impl FromIterator<(LocalizableKey, Option<LocalizableUnit>)> for LocalizationDictionary {
    fn from_iter<T: IntoIterator<Item = (LocalizableKey, Option<LocalizableUnit>)>>(
        iter: T,
    ) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<(LocalizableKey, LocalizableUnit)> for LocalizationDictionary {
    fn from_iter<T: IntoIterator<Item = (LocalizableKey, LocalizableUnit)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LocalizationDictionary {
    type Item = (&'a LocalizableKey, &'a Option<LocalizableUnit>);
    type IntoIter = indexmap::map::Iter<'a, LocalizableKey, Option<LocalizableUnit>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A syntactically valid culture name such as `fr` or `fr-FR`.
///
/// The language subtag must be two or three ASCII letters and subtags are separated
/// by `-`. This keeps ordinary dotted name segments (`Strings`, `g`) from being taken
/// for cultures when names are rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Culture(LanguageIdentifier);

impl Culture {
    pub fn parse(name: &str) -> Result<Self, Error> {
        if !Self::is_valid_name(name) {
            return Err(Error::InvalidCulture(name.to_string()));
        }
        name.parse::<LanguageIdentifier>()
            .map(Culture)
            .map_err(|_| Error::InvalidCulture(name.to_string()))
    }

    /// Whether `name` is a syntactically valid culture name.
    pub fn is_valid_name(name: &str) -> bool {
        if name.is_empty() || name.contains('_') {
            return false;
        }
        match name.parse::<LanguageIdentifier>() {
            Ok(id) => {
                let language = id.language.as_str();
                (2..=3).contains(&language.len())
                    && language != "und"
                    && language.chars().all(|c| c.is_ascii_alphabetic())
            }
            Err(_) => false,
        }
    }

    /// Canonical name, e.g. `fr-FR` for an input of `fr-fr`.
    pub fn name(&self) -> String {
        self.0.to_string()
    }

    /// Case-insensitive comparison against a raw name segment.
    pub fn matches(&self, segment: &str) -> bool {
        self.name().eq_ignore_ascii_case(segment)
    }

    pub fn language_identifier(&self) -> &LanguageIdentifier {
        &self.0
    }
}

impl Display for Culture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Culture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Culture::parse(s)
    }
}

impl TryFrom<String> for Culture {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Culture::parse(&value)
    }
}

impl From<Culture> for String {
    fn from(value: Culture) -> Self {
        value.name()
    }
}
