//! Configuration schema for PSPNet training.
//!
//! Two independent records, [`DatasetConfig`] and [`HyperParameters`], hold the
//! settings consumed by the dataset loader and the training script. Both are
//! constructible with zero arguments and accept dynamic overrides that are
//! type-checked field by field.
//!
//! Uses `figment` for layered loading: defaults -> user config -> workspace
//! config -> environment -> explicit overrides. Configuration files live at
//! `~/.config/pspnet/config.toml` and/or `.pspnet/config.toml` in the workspace.

use figment::{
    Figment,
    error::Kind,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::coerce;
use crate::error::{ConfigError, ValidationError};

/// Prefix for environment overrides (`PSPNET_DATASET__IMAGE_SIZE=512`).
pub const ENV_PREFIX: &str = "PSPNET_";

const CONFIG_DIR: &str = ".pspnet";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration: the dataset and hyperparameter records side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub hyperparameters: HyperParameters,
}

/// Where the training data lives and how images are sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Root directory containing the dataset files.
    #[serde(default = "default_dataset_dir")]
    pub dir_base: PathBuf,
    /// File holding the serialized image array.
    #[serde(default = "default_image_file")]
    pub image_file: String,
    /// File holding the serialized label array.
    #[serde(default = "default_label_file")]
    pub label_file: String,
    /// Square pixel dimension images are resized to.
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dir_base: default_dataset_dir(),
            image_file: default_image_file(),
            label_file: default_label_file(),
            image_size: default_image_size(),
        }
    }
}

fn default_dataset_dir() -> PathBuf {
    PathBuf::from("data/dataset_files")
}

fn default_image_file() -> String {
    "images.npy".to_string()
}

fn default_label_file() -> String {
    "labels.npy".to_string()
}

fn default_image_size() -> u32 {
    300
}

/// Training hyperparameters and weight artifact locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    #[serde(default = "default_author")]
    pub author: String,
    /// Logical name used for saved artifacts.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Directory for weight artifacts.
    #[serde(default = "default_weights_dir")]
    pub dir_base: PathBuf,
    /// Full path to a specific weights file.
    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,
    #[serde(default = "default_n_epochs")]
    pub n_epochs: usize,
    /// Peak learning rate.
    #[serde(default = "default_max_lr")]
    pub max_lr: f64,
    /// Number of segmentation output classes.
    #[serde(default = "default_n_classes")]
    pub n_classes: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self {
            author: default_author(),
            file_name: default_file_name(),
            dir_base: default_weights_dir(),
            weights_path: default_weights_path(),
            n_epochs: default_n_epochs(),
            max_lr: default_max_lr(),
            n_classes: default_n_classes(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_author() -> String {
    "Adriano A. Santos".to_string()
}

fn default_file_name() -> String {
    "PSPNet".to_string()
}

fn default_weights_dir() -> PathBuf {
    PathBuf::from("weights")
}

fn default_weights_path() -> PathBuf {
    PathBuf::from("weights/bestPSPNet.pt")
}

fn default_n_epochs() -> usize {
    100
}

fn default_max_lr() -> f64 {
    3e-4
}

fn default_n_classes() -> usize {
    3
}

fn default_batch_size() -> usize {
    4
}

impl DatasetConfig {
    /// Names accepted by [`DatasetConfig::from_overrides`].
    pub const FIELDS: &'static [&'static str] =
        &["dir_base", "image_file", "label_file", "image_size"];

    /// Build a config from defaults with the given fields replaced.
    ///
    /// Numeric fields accept numbers or numeric strings; keys that name no
    /// field are ignored. The first value that cannot be coerced aborts
    /// construction.
    pub fn from_overrides(overrides: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut config = Self::default();
        config.apply(overrides)?;
        Ok(config)
    }

    fn apply(&mut self, overrides: &Map<String, Value>) -> Result<(), ValidationError> {
        for (key, value) in overrides {
            match key.as_str() {
                "dir_base" => self.dir_base = coerce::path(key, value)?,
                "image_file" => self.image_file = coerce::string(key, value)?,
                "label_file" => self.label_file = coerce::string(key, value)?,
                "image_size" => self.image_size = coerce::unsigned(key, value)?,
                _ => debug!(field = %key, "Ignoring unknown dataset override"),
            }
        }
        Ok(())
    }

    /// Serialize into a field map accepted by [`DatasetConfig::from_overrides`].
    ///
    /// Fails when `dir_base` is not valid UTF-8.
    pub fn to_map(&self) -> crate::Result<Map<String, Value>> {
        to_map(self)
    }

    /// Path of the image array file.
    pub fn image_path(&self) -> PathBuf {
        self.dir_base.join(&self.image_file)
    }

    /// Path of the label array file.
    pub fn label_path(&self) -> PathBuf {
        self.dir_base.join(&self.label_file)
    }

    /// Return warnings for values that type-check but are unlikely to be intended.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.image_size == 0 {
            warnings.push("image_size is 0 — images would be resized to nothing".to_string());
        }
        if self.image_file.trim().is_empty() {
            warnings.push("image_file is empty".to_string());
        }
        if self.label_file.trim().is_empty() {
            warnings.push("label_file is empty".to_string());
        }
        if !self.image_file.is_empty() && self.image_file == self.label_file {
            warnings.push(format!(
                "image_file and label_file both point to '{}'",
                self.image_file
            ));
        }

        warnings
    }
}

impl HyperParameters {
    /// Names accepted by [`HyperParameters::from_overrides`].
    pub const FIELDS: &'static [&'static str] = &[
        "author",
        "file_name",
        "dir_base",
        "weights_path",
        "n_epochs",
        "max_lr",
        "n_classes",
        "batch_size",
    ];

    /// Build hyperparameters from defaults with the given fields replaced.
    ///
    /// Same coercion rules as [`DatasetConfig::from_overrides`].
    pub fn from_overrides(overrides: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut params = Self::default();
        params.apply(overrides)?;
        Ok(params)
    }

    fn apply(&mut self, overrides: &Map<String, Value>) -> Result<(), ValidationError> {
        for (key, value) in overrides {
            match key.as_str() {
                "author" => self.author = coerce::string(key, value)?,
                "file_name" => self.file_name = coerce::string(key, value)?,
                "dir_base" => self.dir_base = coerce::path(key, value)?,
                "weights_path" => self.weights_path = coerce::path(key, value)?,
                "n_epochs" => self.n_epochs = coerce::unsigned(key, value)?,
                "max_lr" => self.max_lr = coerce::float(key, value)?,
                "n_classes" => self.n_classes = coerce::unsigned(key, value)?,
                "batch_size" => self.batch_size = coerce::unsigned(key, value)?,
                _ => debug!(field = %key, "Ignoring unknown hyperparameter override"),
            }
        }
        Ok(())
    }

    /// Serialize into a field map. A non-finite `max_lr` becomes `null`.
    pub fn to_map(&self) -> crate::Result<Map<String, Value>> {
        to_map(self)
    }

    /// Path for an artifact named after `file_name` inside `dir_base`,
    /// e.g. `weights/PSPNet.pt` for extension `pt`.
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.dir_base.join(format!("{}.{}", self.file_name, extension))
    }

    /// Return warnings for values that type-check but are unlikely to be intended.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.n_epochs == 0 {
            warnings.push("n_epochs is 0 — training would not run".to_string());
        }
        if self.batch_size == 0 {
            warnings.push("batch_size is 0 — no samples per batch".to_string());
        }
        if self.n_classes == 0 {
            warnings.push("n_classes is 0 — segmentation needs at least one class".to_string());
        }
        if !self.max_lr.is_finite() || self.max_lr <= 0.0 {
            warnings.push(format!(
                "max_lr is {} — expected a positive finite learning rate",
                self.max_lr
            ));
        }
        if self.file_name.trim().is_empty() {
            warnings.push("file_name is empty — saved artifacts would be unnamed".to_string());
        }

        warnings
    }
}

impl TrainingConfig {
    /// Build from a map with optional `dataset` and `hyperparameters` sections.
    ///
    /// Validation errors carry the dotted field path (`dataset.image_size`).
    pub fn from_overrides(overrides: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut config = Self::default();
        if let Some(value) = overrides.get("dataset") {
            config
                .dataset
                .apply(section(value, "dataset")?)
                .map_err(|e| e.in_section("dataset"))?;
        }
        if let Some(value) = overrides.get("hyperparameters") {
            config
                .hyperparameters
                .apply(section(value, "hyperparameters")?)
                .map_err(|e| e.in_section("hyperparameters"))?;
        }
        Ok(config)
    }

    pub fn to_map(&self) -> crate::Result<Map<String, Value>> {
        to_map(self)
    }

    /// Apply `section.field=value` assignments on top of this configuration.
    ///
    /// Values are taken as strings and coerced to the field type, so
    /// `dataset.image_size=512` works while `dataset.image_size=abc` fails
    /// with a validation error. Fields not named keep their current value.
    pub fn with_assignments<S: AsRef<str>>(&self, assignments: &[S]) -> Result<Self, ConfigError> {
        let mut dataset = Map::new();
        let mut hyperparameters = Map::new();

        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (key, raw) = assignment
                .split_once('=')
                .ok_or_else(|| ConfigError::ParseError {
                    message: format!("expected section.field=value, got '{}'", assignment),
                })?;
            let key = key.trim();
            let (section_name, field) = key.split_once('.').ok_or_else(|| ConfigError::ParseError {
                message: format!("'{}' is not of the form section.field", key),
            })?;

            let (fields, known) = match section_name {
                "dataset" => (&mut dataset, DatasetConfig::FIELDS),
                "hyperparameters" => (&mut hyperparameters, HyperParameters::FIELDS),
                _ => {
                    return Err(ConfigError::ParseError {
                        message: format!("unknown configuration section '{}'", section_name),
                    });
                }
            };
            if !known.contains(&field) {
                return Err(ConfigError::ParseError {
                    message: format!("unknown field '{}' in section '{}'", field, section_name),
                });
            }
            fields.insert(field.to_string(), Value::String(raw.trim().to_string()));
        }

        let mut config = self.clone();
        config
            .dataset
            .apply(&dataset)
            .map_err(|e| e.in_section("dataset"))?;
        config
            .hyperparameters
            .apply(&hyperparameters)
            .map_err(|e| e.in_section("hyperparameters"))?;
        Ok(config)
    }

    /// Validation warnings of both records, prefixed with their section.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for w in self.dataset.validate() {
            warnings.push(format!("[dataset] {}", w));
        }
        for w in self.hyperparameters.validate() {
            warnings.push(format!("[hyperparameters] {}", w));
        }
        warnings
    }
}

fn section<'a>(value: &'a Value, name: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(name, "table", value.to_string()))
}

fn to_map<T: Serialize>(value: &T) -> crate::Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::ParseError {
            message: format!("expected a table, got {}", other),
        }
        .into()),
    }
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Path of the user-level configuration file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "pspnet", "pspnet")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides: a partial map of `dataset` / `hyperparameters`
///    sections; only the keys present replace lower layers
/// 2. Environment variables (prefixed with `PSPNET_`, nested with `__`)
/// 3. Workspace-local config (`.pspnet/config.toml`)
/// 4. User config (`~/.config/pspnet/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&Map<String, Value>>,
) -> Result<TrainingConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(TrainingConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            debug!(path = %user_config.display(), "Merging user config");
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            debug!(path = %ws_config.display(), "Merging workspace config");
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // PSPNET_DATASET__IMAGE_SIZE, PSPNET_HYPERPARAMETERS__MAX_LR, etc.
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: TrainingConfig = figment.extract().map_err(into_config_error)?;
    for warning in config.validate() {
        warn!("{}", warning);
    }
    Ok(config)
}

/// Map figment type mismatches onto [`ValidationError`]; keep everything else.
fn into_config_error(err: figment::Error) -> ConfigError {
    let mismatch = err.clone().into_iter().find_map(|e| match &e.kind {
        Kind::InvalidType(actual, expected) | Kind::InvalidValue(actual, expected) => Some(
            ValidationError::new(e.path.join("."), expected.clone(), actual.to_string()),
        ),
        _ => None,
    });

    match mismatch {
        Some(validation) => ConfigError::Validation(validation),
        None => ConfigError::Load(Box::new(err)),
    }
}

/// Check whether any configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if workspace_config_path(ws).exists() {
            return true;
        }
    }

    false
}

/// Write the built-in defaults to `<workspace>/.pspnet/config.toml`.
///
/// Refuses to overwrite an existing file. Returns the path written.
pub fn write_default_config(workspace: &Path) -> crate::Result<PathBuf> {
    let config_path = workspace_config_path(workspace);
    if config_path.exists() {
        return Err(ConfigError::AlreadyExists { path: config_path }.into());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(&TrainingConfig::default())?;
    std::fs::write(&config_path, toml_str)?;
    debug!(path = %config_path.display(), "Wrote default config");

    Ok(config_path)
}
