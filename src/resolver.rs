//! A registry-backed [`LocalizabilityResolver`] and the run-scoped cache it uses.
//!
//! Types are registered up front as [`TypeDescriptor`]s. Lookups are keyed by
//! `assembly:class` and memoized in a [`ResolverCache`] that the caller owns for the
//! duration of one run.

use std::collections::HashMap;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::{traits::LocalizabilityResolver, types::LocalizationCategory};

/// Whether a translator should see a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum Readability {
    Unreadable,
    #[default]
    Readable,
    Inherit,
}

/// Whether a translator may change a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum Modifiability {
    Unmodifiable,
    #[default]
    Modifiable,
    Inherit,
}

/// Localizability of an element or property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct LocalizabilityAttribute {
    pub category: LocalizationCategory,
    #[serde(default)]
    pub readability: Readability,
    #[serde(default)]
    pub modifiability: Modifiability,
}

impl LocalizabilityAttribute {
    /// A readable, modifiable attribute of `category`.
    pub fn new(category: LocalizationCategory) -> Self {
        Self {
            category,
            readability: Readability::Readable,
            modifiability: Modifiability::Modifiable,
        }
    }

    pub fn with_readability(mut self, readability: Readability) -> Self {
        self.readability = readability;
        self
    }

    pub fn with_modifiability(mut self, modifiability: Modifiability) -> Self {
        self.modifiability = modifiability;
        self
    }
}

/// What the resolver knows about an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementLocalizability {
    /// Inline formatting tag for elements that are formatted inside text, e.g. `b`.
    pub formatting_tag: Option<String>,
    /// `None` when the element's type is unknown.
    pub attribute: Option<LocalizabilityAttribute>,
}

/// Broad shape of a type, used to pick a default attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum TypeKind {
    /// Numbers, booleans and characters.
    Primitive,
    /// Uniform resource identifiers.
    Uri,
    /// Structs and enums.
    Value,
    #[default]
    Reference,
}

impl TypeKind {
    /// Kind of a well-known system type, if `class_name` is one.
    pub fn of_well_known(class_name: &str) -> Option<TypeKind> {
        match class_name {
            "System.Boolean" | "System.Byte" | "System.SByte" | "System.Char"
            | "System.Decimal" | "System.Double" | "System.Single" | "System.Int16"
            | "System.UInt16" | "System.Int32" | "System.UInt32" | "System.Int64"
            | "System.UInt64" => Some(TypeKind::Primitive),
            "System.Uri" => Some(TypeKind::Uri),
            "System.String" | "System.Object" => Some(TypeKind::Reference),
            _ => None,
        }
    }

    /// Attribute used when a type declares none.
    pub fn default_attribute(&self) -> LocalizabilityAttribute {
        match self {
            TypeKind::Primitive => LocalizabilityAttribute::new(LocalizationCategory::None)
                .with_readability(Readability::Unreadable),
            TypeKind::Uri => LocalizabilityAttribute::new(LocalizationCategory::None)
                .with_modifiability(Modifiability::Unmodifiable),
            TypeKind::Value => LocalizabilityAttribute::new(LocalizationCategory::Inherit)
                .with_modifiability(Modifiability::Unmodifiable),
            TypeKind::Reference => LocalizabilityAttribute::new(LocalizationCategory::Inherit),
        }
    }
}

/// A property of a registered type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PropertyDescriptor {
    /// Full class name of the property's type.
    pub type_name: String,
    #[serde(default)]
    pub attribute: Option<LocalizabilityAttribute>,
}

/// A registered type and its localizability metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TypeDescriptor {
    pub assembly: String,
    pub class_name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub attribute: Option<LocalizabilityAttribute>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDescriptor>,
}

impl TypeDescriptor {
    pub fn new(assembly: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            assembly: assembly.into(),
            class_name: class_name.into(),
            kind: TypeKind::Reference,
            attribute: None,
            properties: IndexMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attribute(mut self, attribute: LocalizabilityAttribute) -> Self {
        self.attribute = Some(attribute);
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        attribute: Option<LocalizabilityAttribute>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertyDescriptor {
                type_name: type_name.into(),
                attribute,
            },
        );
        self
    }

    /// Declared attribute, or the default for the type's kind.
    pub fn localizability(&self) -> LocalizabilityAttribute {
        self.attribute
            .unwrap_or_else(|| self.kind.default_attribute())
    }
}

lazy_static! {
    /// Inline formatted elements and their tags.
    static ref FORMATTING_TAGS: Vec<(&'static str, &'static str)> = vec![
        ("System.Windows.Documents.Bold", "b"),
        ("System.Windows.Documents.Hyperlink", "a"),
        ("System.Windows.Documents.Inline", "in"),
        ("System.Windows.Documents.Italic", "i"),
        ("System.Windows.Documents.SmallCaps", "small"),
        ("System.Windows.Documents.Subscript", "sub"),
        ("System.Windows.Documents.Superscript", "sup"),
        ("System.Windows.Documents.Underline", "u"),
    ];
}

/// Memoized type lookups for one run.
#[derive(Debug, Default)]
pub struct ResolverCache {
    types: HashMap<String, Option<TypeDescriptor>>,
    assemblies: HashMap<String, Option<String>>,
    hits: usize,
    misses: usize,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached type lookups, including negative ones.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.assemblies.clear();
    }
}

/// Returns the short assembly name: `Lib, Version=1.0.0.0` gives `Lib`.
fn assembly_short_name(assembly: &str) -> &str {
    match assembly.find(',') {
        Some(index) if index > 0 => &assembly[..index],
        _ => assembly,
    }
}

fn cache_key(assembly: &str, class_name: &str) -> String {
    format!(
        "{}:{}",
        assembly_short_name(assembly).to_lowercase(),
        class_name
    )
}

/// Resolves localizability from registered [`TypeDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct RegistryResolver {
    types: IndexMap<String, TypeDescriptor>,
}

impl RegistryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) {
        let key = cache_key(&descriptor.assembly, &descriptor.class_name);
        self.types.insert(key, descriptor);
    }

    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Loads descriptors from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, crate::error::Error> {
        let descriptors: Vec<TypeDescriptor> = serde_json::from_str(json)?;
        Ok(descriptors
            .into_iter()
            .fold(Self::new(), |resolver, descriptor| resolver.with_type(descriptor)))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn find_type(
        &self,
        assembly: &str,
        class_name: &str,
        cache: &mut ResolverCache,
    ) -> Option<TypeDescriptor> {
        let key = cache_key(assembly, class_name);
        if let Some(found) = cache.types.get(&key) {
            cache.hits += 1;
            return found.clone();
        }
        cache.misses += 1;
        let found = self.types.get(&key).cloned();
        cache.types.insert(key, found.clone());
        found
    }

    /// Localizability of a property's type, looked up by class name alone.
    fn type_localizability(
        &self,
        type_name: &str,
        cache: &mut ResolverCache,
    ) -> LocalizabilityAttribute {
        if let Some(kind) = TypeKind::of_well_known(type_name) {
            return kind.default_attribute();
        }
        self.resolve_assembly_from_class(type_name, cache)
            .and_then(|assembly| self.find_type(&assembly, type_name, cache))
            .map(|descriptor| descriptor.localizability())
            .unwrap_or_else(|| TypeKind::Reference.default_attribute())
    }
}

impl LocalizabilityResolver for RegistryResolver {
    fn element_localizability(
        &self,
        assembly: &str,
        class_name: &str,
        cache: &mut ResolverCache,
    ) -> ElementLocalizability {
        let attribute = self
            .find_type(assembly, class_name, cache)
            .map(|descriptor| descriptor.localizability());
        let formatting_tag = FORMATTING_TAGS
            .iter()
            .find(|(class, _)| *class == class_name)
            .map(|(_, tag)| tag.to_string());

        ElementLocalizability {
            formatting_tag,
            attribute,
        }
    }

    fn property_localizability(
        &self,
        assembly: &str,
        class_name: &str,
        property: &str,
        cache: &mut ResolverCache,
    ) -> Option<LocalizabilityAttribute> {
        let descriptor = self.find_type(assembly, class_name, cache)?;
        let Some(found) = descriptor.properties.get(property) else {
            return Some(descriptor.localizability());
        };
        Some(
            found
                .attribute
                .unwrap_or_else(|| self.type_localizability(&found.type_name, cache)),
        )
    }

    fn resolve_formatting_tag_to_class(&self, tag: &str) -> Option<String> {
        FORMATTING_TAGS
            .iter()
            .find(|(_, known)| *known == tag)
            .map(|(class, _)| class.to_string())
    }

    fn resolve_assembly_from_class(
        &self,
        class_name: &str,
        cache: &mut ResolverCache,
    ) -> Option<String> {
        if let Some(found) = cache.assemblies.get(class_name) {
            cache.hits += 1;
            return found.clone();
        }
        cache.misses += 1;
        let found = self
            .types
            .values()
            .find(|descriptor| descriptor.class_name == class_name)
            .map(|descriptor| descriptor.assembly.clone());
        cache
            .assemblies
            .insert(class_name.to_string(), found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> RegistryResolver {
        RegistryResolver::new()
            .with_type(
                TypeDescriptor::new("PresentationFramework", "System.Windows.Controls.Button")
                    .with_attribute(LocalizabilityAttribute::new(LocalizationCategory::Button))
                    .with_property("Content", "System.Object", None)
                    .with_property("IsDefault", "System.Boolean", None)
                    .with_property("NavigateUri", "System.Uri", None)
                    .with_property("Alignment", "System.Windows.HorizontalAlignment", None)
                    .with_property(
                        "Tag",
                        "System.Object",
                        Some(
                            LocalizabilityAttribute::new(LocalizationCategory::NeverLocalize)
                                .with_readability(Readability::Unreadable),
                        ),
                    ),
            )
            .with_type(
                TypeDescriptor::new("PresentationFramework", "System.Windows.HorizontalAlignment")
                    .with_kind(TypeKind::Value),
            )
            .with_type(TypeDescriptor::new(
                "PresentationFramework",
                "System.Windows.Documents.Bold",
            ))
    }

    #[test]
    fn test_element_with_declared_attribute() {
        let mut cache = ResolverCache::new();
        let element = resolver().element_localizability(
            "PresentationFramework, Version=4.0.0.0",
            "System.Windows.Controls.Button",
            &mut cache,
        );
        assert_eq!(
            element.attribute.unwrap().category,
            LocalizationCategory::Button
        );
        assert_eq!(element.formatting_tag, None);
    }

    #[test]
    fn test_formatted_element_gets_tag() {
        let mut cache = ResolverCache::new();
        let r = resolver();
        let element =
            r.element_localizability("PresentationFramework", "System.Windows.Documents.Bold", &mut cache);
        assert_eq!(element.formatting_tag.as_deref(), Some("b"));
        assert_eq!(
            element.attribute.unwrap().category,
            LocalizationCategory::Inherit
        );
        assert_eq!(
            r.resolve_formatting_tag_to_class("sup").as_deref(),
            Some("System.Windows.Documents.Superscript")
        );
        assert_eq!(r.resolve_formatting_tag_to_class("blink"), None);
    }

    #[test]
    fn test_unknown_element_has_no_attribute() {
        let mut cache = ResolverCache::new();
        let element = resolver().element_localizability("Other", "My.Widget", &mut cache);
        assert_eq!(element, ElementLocalizability::default());
    }

    #[test]
    fn test_property_defaults_follow_type_kind() {
        let r = resolver();
        let mut cache = ResolverCache::new();
        let prop = |name: &str, cache: &mut ResolverCache| {
            r.property_localizability(
                "PresentationFramework",
                "System.Windows.Controls.Button",
                name,
                cache,
            )
            .unwrap()
        };

        let boolean = prop("IsDefault", &mut cache);
        assert_eq!(boolean.readability, Readability::Unreadable);
        assert_eq!(boolean.category, LocalizationCategory::None);

        let uri = prop("NavigateUri", &mut cache);
        assert_eq!(uri.modifiability, Modifiability::Unmodifiable);

        let value = prop("Alignment", &mut cache);
        assert_eq!(value.category, LocalizationCategory::Inherit);
        assert_eq!(value.modifiability, Modifiability::Unmodifiable);

        let object = prop("Content", &mut cache);
        assert_eq!(object, LocalizabilityAttribute::new(LocalizationCategory::Inherit));

        let declared = prop("Tag", &mut cache);
        assert_eq!(declared.category, LocalizationCategory::NeverLocalize);
    }

    #[test]
    fn test_property_of_unknown_type_is_none() {
        let mut cache = ResolverCache::new();
        assert!(
            resolver()
                .property_localizability("X", "Y", "Z", &mut cache)
                .is_none()
        );
    }

    #[test]
    fn test_cache_memoizes_lookups() {
        let r = resolver();
        let mut cache = ResolverCache::new();
        for _ in 0..3 {
            r.element_localizability("PresentationFramework", "System.Windows.Controls.Button", &mut cache);
        }
        r.element_localizability("Missing", "Nope", &mut cache);
        r.element_localizability("Missing", "Nope", &mut cache);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resolve_assembly_from_class() {
        let mut cache = ResolverCache::new();
        let r = resolver();
        assert_eq!(
            r.resolve_assembly_from_class("System.Windows.Documents.Bold", &mut cache)
                .as_deref(),
            Some("PresentationFramework")
        );
        assert_eq!(r.resolve_assembly_from_class("Nope", &mut cache), None);
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "assembly": "App",
                "class_name": "App.Banner",
                "attribute": { "category": "Title" },
                "properties": {
                    "Caption": { "type_name": "System.String" }
                }
            }
        ]"#;
        let r = RegistryResolver::from_json(json).unwrap();
        assert_eq!(r.len(), 1);
        let mut cache = ResolverCache::new();
        let caption = r
            .property_localizability("App", "App.Banner", "Caption", &mut cache)
            .unwrap();
        assert_eq!(caption.category, LocalizationCategory::Inherit);
        let banner = r.element_localizability("App", "App.Banner", &mut cache);
        assert_eq!(
            banner.attribute,
            Some(LocalizabilityAttribute::new(LocalizationCategory::Title))
        );
    }
}
