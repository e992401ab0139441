//! Code generator configuration, optionally loaded from a TOML file.

use serde::Deserialize;
use std::path::Path;

use crate::error::CodegenError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    /// Crate path the generated codec imports its runtime from.
    pub runtime_crate: String,
    /// Seed of the wire-key hash. Changing it changes every key.
    pub hash_seed: u64,
    pub declarations_extension: String,
    pub codec_file_stem: String,
    pub codec_extension: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        CodegenConfig {
            runtime_crate: "tablec_wire".to_owned(),
            hash_seed: tablec_wire::DEFAULT_SEED,
            declarations_extension: "rs".to_owned(),
            codec_file_stem: "serialization".to_owned(),
            codec_extension: "rs".to_owned(),
        }
    }
}

impl CodegenConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, CodegenError> {
        let config: CodegenConfig =
            toml::from_str(text).map_err(|e| CodegenError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CodegenError> {
        let text = std::fs::read_to_string(path).map_err(|source| CodegenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn check(&self) -> Result<(), CodegenError> {
        if self.runtime_crate.trim().is_empty() {
            return Err(CodegenError::Config("runtime_crate must not be empty".into()));
        }
        for (key, value) in [
            ("declarations_extension", &self.declarations_extension),
            ("codec_file_stem", &self.codec_file_stem),
            ("codec_extension", &self.codec_extension),
        ] {
            if value.is_empty() || value.contains(['/', '\\']) {
                return Err(CodegenError::Config(format!(
                    "{} must be a plain file name part, got '{}'",
                    key, value
                )));
            }
        }
        Ok(())
    }
}
