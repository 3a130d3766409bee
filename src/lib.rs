//! Satellite localization toolkit for Rust.
//!
//! Extracts translatable units from leaf record streams nested inside flat resource
//! containers and composite bundles into a delimited translation table, and
//! regenerates a localized satellite container tree from an edited table.
//! Leaf encoding and decoding is delegated to a [`Localizer`], type metadata to a
//! [`LocalizabilityResolver`].

pub mod error;
pub mod formats;
pub mod key;
pub mod naming;
pub mod operations;
pub mod options;
pub mod resolver;
pub mod table;
pub mod traits;
pub mod types;
pub mod walker;

// Re-export most used types for easy consumption
pub use crate::{
    error::Error,
    formats::{Delimiter, FileType},
    key::{decode_key, encode_key},
    naming::derive_output_name,
    operations::{ExtractReport, GenerationReport, extract_translations, generate_translations},
    options::{ExtractOptions, FailurePolicy, GenerateOptions},
    resolver::{RegistryResolver, ResolverCache},
    table::TranslationTable,
    traits::{LeafContext, LocalizabilityResolver, Localizer, Parser},
    types::{
        Culture, LocalizableKey, LocalizableUnit, LocalizationCategory, LocalizationDictionary,
    },
    walker::{Node, Walker},
};
