use crate::core::path::config_file;
use crate::core::{MergeError, MergeResult};
use crate::resources::OverwritePolicy;
use apkmerge_core::DedupPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User configuration, read from `config.yaml`. Every field has a default, so
/// an empty or partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub align: AlignConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

/// Program names (or absolute paths) of the external tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_apktool")]
    pub apktool: String,
    #[serde(default = "default_zipalign")]
    pub zipalign: String,
    #[serde(default = "default_keytool")]
    pub keytool: String,
    #[serde(default = "default_apksigner")]
    pub apksigner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Byte alignment passed to zipalign
    #[serde(default = "default_alignment")]
    pub alignment: u32,

    /// Page-align uncompressed .so files (`zipalign -p`)
    #[serde(default = "default_true")]
    pub page_align: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Keystore used by apksigner. Generated with keytool when missing, and
    /// removed again after signing only if this run generated it.
    #[serde(default = "default_keystore")]
    pub keystore: PathBuf,
    #[serde(default = "default_alias")]
    pub alias: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_key_size")]
    pub key_size: u32,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default = "default_dname")]
    pub dname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub on_conflict: OverwritePolicy,
    #[serde(default)]
    pub dedup: DedupPolicy,
}

fn default_apktool() -> String {
    "apktool".to_string()
}

fn default_zipalign() -> String {
    "zipalign".to_string()
}

fn default_keytool() -> String {
    "keytool".to_string()
}

fn default_apksigner() -> String {
    "apksigner".to_string()
}

fn default_alignment() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_keystore() -> PathBuf {
    PathBuf::from("my-release-key.jks")
}

fn default_alias() -> String {
    "my-alias".to_string()
}

fn default_password() -> String {
    "123456".to_string()
}

fn default_key_size() -> u32 {
    2048
}

fn default_validity_days() -> u32 {
    10000
}

fn default_dname() -> String {
    "CN=Unknown, OU=Unknown, O=Unknown, L=Unknown, ST=Unknown, C=Unknown".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            apktool: default_apktool(),
            zipalign: default_zipalign(),
            keytool: default_keytool(),
            apksigner: default_apksigner(),
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            alignment: default_alignment(),
            page_align: true,
        }
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            keystore: default_keystore(),
            alias: default_alias(),
            password: default_password(),
            key_size: default_key_size(),
            validity_days: default_validity_days(),
            dname: default_dname(),
        }
    }
}

impl Config {
    /// Load config from the platform-specific config directory, falling back
    /// to defaults when no file exists
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\apkmerge\config.yaml
    /// - Linux: ~/.config/apkmerge/config.yaml
    /// - macOS: ~/Library/Application Support/apkmerge/config.yaml
    pub fn load() -> MergeResult<Self> {
        let config_path = config_file()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> MergeResult<Self> {
        if !path.exists() {
            return Err(MergeError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| MergeError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> MergeResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
