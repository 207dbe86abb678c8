//! `manifest.json` retrieval and locale placeholder resolution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::{ExtractError, ManifestError};
use crate::zip::ArchiveReader;

pub const MANIFEST_PATH: &str = "manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentScript {
    #[serde(default)]
    pub matches: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub js: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub css: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,
}

/// The fields of a browser extension manifest that inspection cares about.
/// Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,
    /// Strings in practice, but legacy app manifests allow objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_permissions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_scripts: Vec<ContentScript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub icons: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct LocaleMessage {
    message: String,
}

impl ExtensionManifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Permission names; object-form permissions report their single key.
    pub fn permission_names(&self) -> Vec<String> {
        self.permissions
            .iter()
            .filter_map(|p| match p {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map.keys().next().cloned(),
                _ => None,
            })
            .collect()
    }

    /// Replace `__MSG_key__` placeholders in `name` and `description` using
    /// `_locales/<default_locale>/messages.json`. Missing locale files leave
    /// the manifest unchanged.
    pub fn localize(&mut self, reader: &ArchiveReader<'_>) -> Result<(), ManifestError> {
        let Some(locale) = self.default_locale.as_deref() else {
            return Ok(());
        };

        let path = format!("_locales/{locale}/messages.json");
        let bytes = match reader.read_file(&path) {
            Ok(bytes) => bytes,
            Err(ExtractError::EntryNotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
        let messages: HashMap<String, LocaleMessage> = serde_json::from_slice(bytes)?;
        // Message keys are case-insensitive.
        let messages: HashMap<String, String> = messages
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.message))
            .collect();

        for field in [&mut self.name, &mut self.description] {
            if let Some(value) = field.as_mut() {
                if let Some(resolved) = resolve_placeholder(value, &messages) {
                    *value = resolved;
                }
            }
        }
        Ok(())
    }
}

fn resolve_placeholder(value: &str, messages: &HashMap<String, String>) -> Option<String> {
    let key = value.strip_prefix("__MSG_")?.strip_suffix("__")?;
    messages.get(&key.to_lowercase()).cloned()
}

/// Read and parse `manifest.json` from the archive root.
pub fn read_manifest(reader: &ArchiveReader<'_>) -> Result<ExtensionManifest, ManifestError> {
    let bytes = match reader.read_file(MANIFEST_PATH) {
        Ok(bytes) => bytes,
        Err(ExtractError::EntryNotFound(_)) => return Err(ManifestError::Missing),
        Err(e) => return Err(e.into()),
    };
    if std::str::from_utf8(&bytes).is_err() {
        return Err(ManifestError::NotUtf8);
    }
    ExtensionManifest::from_slice(&bytes)
}
