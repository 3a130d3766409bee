//! Output and stream names.
//!
//! Culture-qualified names carry the culture as the dot-segment right before the
//! final extension (`App.g.fr-FR.resources`) or right before the satellite suffix
//! (`App.fr-FR.resources.dll`). Every rewrite here is idempotent for a fixed target.

use std::path::Path;

use crate::{
    formats::{COMMENT_EXTENSION, FileType},
    key::KEY_SEPARATOR,
    types::Culture,
};

/// Suffix of a satellite bundle's module name.
pub const SATELLITE_SUFFIX: &str = ".resources.dll";

/// Suffix of a flat container name.
pub const RESOURCES_SUFFIX: &str = ".resources";

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    Some(&name[..split])
}

/// Puts `target` as the last dot-segment of `base`, replacing a segment that already
/// names `target` or `source`.
fn qualify_base(base: &str, source: Option<&Culture>, target: &Culture) -> String {
    if let Some((stem, segment)) = base.rsplit_once('.') {
        if target.matches(segment) || source.is_some_and(|s| s.matches(segment)) {
            return format!("{}.{}", stem, target);
        }
    }
    format!("{}.{}", base, target)
}

/// Derives the name an input is written under for `target`.
///
/// * `App.resources.dll` becomes `App.fr-FR.resources.dll`.
/// * `App.de-DE.resources` becomes `App.fr-FR.resources`: a culture segment before
///   the final extension is replaced when it is the source culture or any valid
///   culture name.
/// * Anything else is returned unchanged.
pub fn derive_output_name(name: &str, source: Option<&Culture>, target: &Culture) -> String {
    if let Some(base) = strip_suffix_ignore_case(name, SATELLITE_SUFFIX) {
        let suffix = &name[base.len()..];
        return format!("{}{}", qualify_base(base, source, target), suffix);
    }

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 3 {
        return name.to_string();
    }
    let segment = parts[parts.len() - 2];
    let is_source = source.is_some_and(|s| s.matches(segment));
    if !is_source && !Culture::is_valid_name(segment) {
        return name.to_string();
    }

    let mut renamed: Vec<String> = parts.iter().map(|part| part.to_string()).collect();
    let index = renamed.len() - 2;
    renamed[index] = target.name();
    renamed.join(".")
}

/// Removes the source culture segment from a flat container name:
/// `App.g.en-US.resources` becomes `App.g.resources` for source `en-US`.
pub fn neutral_resource_name(name: &str, source: Option<&Culture>) -> String {
    let (Some(source), Some(base)) = (source, strip_suffix_ignore_case(name, RESOURCES_SUFFIX))
    else {
        return name.to_string();
    };
    match base.rsplit_once('.') {
        Some((stem, segment)) if source.matches(segment) => {
            format!("{}{}", stem, &name[base.len()..])
        }
        _ => name.to_string(),
    }
}

/// Inserts `target` before the last extension of a neutral name:
/// `App.g.resources` becomes `App.g.fr-FR.resources` and `icon.ico` becomes
/// `icon.fr-FR.ico`. A name without an extension gets `target` appended.
pub fn culture_specific_name(neutral: &str, target: &Culture) -> String {
    match neutral.rsplit_once('.') {
        Some((base, extension)) => {
            let qualified = target.matches(extension)
                || base
                    .rsplit_once('.')
                    .is_some_and(|(_, segment)| target.matches(segment));
            if qualified {
                neutral.to_string()
            } else {
                format!("{}.{}.{}", base, target, extension)
            }
        }
        None => format!("{}.{}", neutral, target),
    }
}

/// Name of a manifest entry inside the satellite bundle for `target`.
///
/// A flat container loses its source culture segment first, so
/// `App.g.en-US.resources` and `App.g.resources` both become `App.g.fr-FR.resources`.
pub fn satellite_entry_name(name: &str, source: Option<&Culture>, target: &Culture) -> String {
    culture_specific_name(&neutral_resource_name(name, source), target)
}

/// File name of the generated output for an input file.
///
/// Executables produce `{stem}.resources.dll`, libraries and leaves keep their name,
/// and flat containers follow [`derive_output_name`].
pub fn output_file_name(
    input_file_name: &str,
    file_type: FileType,
    source: Option<&Culture>,
    target: Option<&Culture>,
) -> String {
    match (file_type, target) {
        (FileType::Exe, _) => {
            let stem = Path::new(input_file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(input_file_name);
            format!("{}{}", stem, SATELLITE_SUFFIX)
        }
        (FileType::Resources, Some(target)) => derive_output_name(input_file_name, source, target),
        _ => input_file_name.to_string(),
    }
}

/// Module name of a satellite bundle: `App.resources.dll` becomes
/// `App.fr-FR.resources.dll`; other names are unchanged.
pub fn satellite_module_name(neutral: &str, target: &Culture) -> String {
    match strip_suffix_ignore_case(neutral, SATELLITE_SUFFIX) {
        Some(_) => derive_output_name(neutral, None, target),
        None => neutral.to_string(),
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

/// Stream name of a leaf inside a flat container: `App.g.resources:main.baml`.
pub fn stream_name(container: &str, entry: &str) -> String {
    format!("{}{}{}", file_name(container), KEY_SEPARATOR, file_name(entry))
}

/// File name of the comment file accompanying a leaf: `main.baml` gives `main.loc`.
pub fn comment_file_name(leaf: &str) -> String {
    let leaf = file_name(leaf);
    let stem = Path::new(leaf)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(leaf);
    format!("{}.{}", stem, COMMENT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn culture(name: &str) -> Culture {
        Culture::parse(name).unwrap()
    }

    #[test]
    fn test_satellite_suffix_inserts_target() {
        let fr = culture("fr-FR");
        assert_eq!(
            derive_output_name("App.resources.dll", None, &fr),
            "App.fr-FR.resources.dll"
        );
        assert_eq!(
            derive_output_name("App.fr-FR.resources.dll", None, &fr),
            "App.fr-FR.resources.dll"
        );
    }

    #[test]
    fn test_satellite_suffix_replaces_source() {
        let en = culture("en-US");
        let fr = culture("fr-FR");
        assert_eq!(
            derive_output_name("App.en-US.resources.dll", Some(&en), &fr),
            "App.fr-FR.resources.dll"
        );
    }

    #[test]
    fn test_embedded_culture_is_replaced() {
        let de = culture("de-DE");
        let fr = culture("fr");
        assert_eq!(
            derive_output_name("App.de-DE.resources", Some(&de), &fr),
            "App.fr.resources"
        );
        assert_eq!(
            derive_output_name("Strings.en.resources", None, &fr),
            "Strings.fr.resources"
        );
    }

    #[test]
    fn test_names_without_culture_are_unchanged() {
        let fr = culture("fr-FR");
        assert_eq!(derive_output_name("App.g.resources", None, &fr), "App.g.resources");
        assert_eq!(derive_output_name("main.baml", None, &fr), "main.baml");
        assert_eq!(derive_output_name("App.exe", None, &fr), "App.exe");
    }

    #[test]
    fn test_derive_output_name_is_idempotent() {
        let en = culture("en-US");
        let fr = culture("fr-FR");
        for name in [
            "App.resources.dll",
            "App.en-US.resources.dll",
            "App.de.resources.dll",
            "App.en-US.resources",
            "App.g.resources",
            "Lib.RESOURCES.DLL",
        ] {
            let once = derive_output_name(name, Some(&en), &fr);
            assert_eq!(derive_output_name(&once, Some(&en), &fr), once, "{}", name);
        }
    }

    #[test]
    fn test_satellite_entry_name() {
        let en = culture("en-US");
        let fr = culture("fr-FR");
        assert_eq!(
            satellite_entry_name("App.g.resources", None, &fr),
            "App.g.fr-FR.resources"
        );
        assert_eq!(
            satellite_entry_name("App.g.en-US.resources", Some(&en), &fr),
            "App.g.fr-FR.resources"
        );
        assert_eq!(
            satellite_entry_name("App.g.fr-FR.resources", Some(&en), &fr),
            "App.g.fr-FR.resources"
        );
    }

    #[test]
    fn test_every_entry_becomes_culture_specific() {
        let en = culture("en-US");
        let fr = culture("fr-FR");
        assert_eq!(satellite_entry_name("top.baml", Some(&en), &fr), "top.fr-FR.baml");
        assert_eq!(satellite_entry_name("icon.ico", None, &fr), "icon.fr-FR.ico");
        assert_eq!(satellite_entry_name("LICENSE", None, &fr), "LICENSE.fr-FR");
        for name in ["top.baml", "icon.ico", "LICENSE", "App.g.resources", "a.b.c"] {
            let once = satellite_entry_name(name, Some(&en), &fr);
            assert_eq!(satellite_entry_name(&once, Some(&en), &fr), once, "{}", name);
        }
    }

    #[test]
    fn test_neutral_resource_name_needs_source() {
        assert_eq!(neutral_resource_name("App.g.en.resources", None), "App.g.en.resources");
        assert_eq!(
            neutral_resource_name("App.g.EN.resources", Some(&culture("en"))),
            "App.g.resources"
        );
    }

    #[test]
    fn test_output_file_name() {
        let fr = culture("fr-FR");
        assert_eq!(
            output_file_name("App.exe", FileType::Exe, None, Some(&fr)),
            "App.resources.dll"
        );
        assert_eq!(
            output_file_name("Lib.dll", FileType::Dll, None, Some(&fr)),
            "Lib.dll"
        );
        assert_eq!(
            output_file_name("App.en.resources", FileType::Resources, None, Some(&fr)),
            "App.fr-FR.resources"
        );
        assert_eq!(
            output_file_name("main.baml", FileType::Leaf, None, None),
            "main.baml"
        );
    }

    #[test]
    fn test_satellite_module_name() {
        let fr = culture("fr-FR");
        assert_eq!(
            satellite_module_name("App.resources.dll", &fr),
            "App.fr-FR.resources.dll"
        );
        assert_eq!(satellite_module_name("App.exe", &fr), "App.exe");
    }

    #[test]
    fn test_stream_and_comment_names() {
        assert_eq!(
            stream_name("out/App.g.resources", "views/main.baml"),
            "App.g.resources:main.baml"
        );
        assert_eq!(comment_file_name("views/main.baml"), "main.loc");
        assert_eq!(comment_file_name("README"), "README.loc");
    }
}
