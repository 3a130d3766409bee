//! Options for the extraction and generation runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    formats::{FileType, delimited::Delimiter},
    naming,
    types::Culture,
};

/// What a run does when a single leaf fails to load or localize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure.
    #[default]
    Abort,
    /// Log the failure and keep the leaf's source bytes (or drop the entry when they
    /// could not be read), then continue.
    SkipLeaf,
}

/// Options for [`crate::operations::extract_translations`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractOptions {
    /// Leaf, flat container or bundle to read.
    pub input: PathBuf,
    /// Translation table to write.
    pub output: PathBuf,
    /// Delimiter of the table; inferred from `output` when absent.
    #[serde(default)]
    pub delimiter: Option<Delimiter>,
    /// Directory searched for comment files; defaults to the input's directory.
    #[serde(default)]
    pub comments_dir: Option<PathBuf>,
}

impl ExtractOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            delimiter: None,
            comments_dir: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_comments_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.comments_dir = Some(dir.into());
        self
    }

    /// Loads options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        read_json(path.as_ref())
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
            .unwrap_or_else(|| Delimiter::from_path(&self.output))
    }

    pub fn comments_dir(&self) -> PathBuf {
        self.comments_dir
            .clone()
            .unwrap_or_else(|| parent_dir(&self.input))
    }

    /// Checks the input exists and is a localizable file; returns its type.
    pub fn validate(&self) -> Result<FileType, Error> {
        validate_input(&self.input)
    }
}

/// Options for [`crate::operations::generate_translations`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateOptions {
    /// Leaf, flat container or bundle to localize.
    pub input: PathBuf,
    /// Translation table to read.
    pub translations: PathBuf,
    /// Existing directory the output is written to.
    pub output_dir: PathBuf,
    /// Target culture. Required unless the input is a standalone leaf.
    #[serde(default)]
    pub culture: Option<Culture>,
    /// Culture of the input; read from the bundle header for bundles.
    #[serde(default)]
    pub source_culture: Option<Culture>,
    /// Delimiter of the table; inferred from `translations` when absent.
    #[serde(default)]
    pub delimiter: Option<Delimiter>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Directory searched for comment files; defaults to the input's directory.
    #[serde(default)]
    pub comments_dir: Option<PathBuf>,
}

impl GenerateOptions {
    pub fn new(
        input: impl Into<PathBuf>,
        translations: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            translations: translations.into(),
            output_dir: output_dir.into(),
            culture: None,
            source_culture: None,
            delimiter: None,
            failure_policy: FailurePolicy::default(),
            comments_dir: None,
        }
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = Some(culture);
        self
    }

    pub fn with_source_culture(mut self, culture: Culture) -> Self {
        self.source_culture = Some(culture);
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_comments_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.comments_dir = Some(dir.into());
        self
    }

    /// Loads options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        read_json(path.as_ref())
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
            .unwrap_or_else(|| Delimiter::from_path(&self.translations))
    }

    pub fn comments_dir(&self) -> PathBuf {
        self.comments_dir
            .clone()
            .unwrap_or_else(|| parent_dir(&self.input))
    }

    /// Checks every path and the culture requirement; returns the input's type.
    pub fn validate(&self) -> Result<FileType, Error> {
        let file_type = validate_input(&self.input)?;

        if !self.translations.is_file() {
            return Err(Error::InvalidOptions(format!(
                "translation file `{}` does not exist",
                self.translations.display()
            )));
        }
        if !self.output_dir.is_dir() {
            return Err(Error::InvalidOptions(format!(
                "output directory `{}` does not exist",
                self.output_dir.display()
            )));
        }
        if self.culture.is_none() && file_type != FileType::Leaf {
            return Err(Error::InvalidOptions(format!(
                "a target culture is required to localize `{}`",
                self.input.display()
            )));
        }
        let output = self.output_path(file_type)?;
        if same_path(&output, &self.input) {
            return Err(Error::InvalidOptions(format!(
                "generating `{}` would overwrite the input",
                output.display()
            )));
        }
        Ok(file_type)
    }

    /// Path the localized counterpart of `input` is written to.
    pub fn output_path(&self, file_type: FileType) -> Result<PathBuf, Error> {
        let input_name = self
            .input
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidOptions(format!("`{}` has no file name", self.input.display()))
            })?;
        let output_name = naming::output_file_name(
            input_name,
            file_type,
            self.source_culture.as_ref(),
            self.culture.as_ref(),
        );
        Ok(self.output_dir.join(output_name))
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, Error> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(serde_json::from_str(&text)?)
}

fn validate_input(input: &Path) -> Result<FileType, Error> {
    if !input.is_file() {
        return Err(Error::InvalidOptions(format!(
            "input file `{}` does not exist",
            input.display()
        )));
    }
    let file_type = FileType::from_path(input)?;
    if !file_type.is_localizable_input() {
        return Err(Error::InvalidOptions(format!(
            "`{}` is not a leaf, resources or bundle file",
            input.display()
        )));
    }
    Ok(file_type)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `output`, which may not exist yet, names the same file as `input`.
fn same_path(output: &Path, input: &Path) -> bool {
    let resolved = output
        .parent()
        .and_then(|dir| dir.canonicalize().ok())
        .zip(output.file_name())
        .map(|(dir, name)| dir.join(name));
    match (resolved, input.canonicalize()) {
        (Some(output), Ok(input)) => output == input,
        _ => output == input,
    }
}
