use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};

/// Where the generation number goes in a rotated file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationNaming {
    /// `app.log` → `app.log.1`
    #[default]
    Suffix,
    /// `app.log` → `app.1.log`
    BeforeExtension,
}

/// Size and retention bounds for a rotating file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationPolicy {
    pub max_file_size: u64,
    pub max_generations: u32,
    #[serde(default)]
    pub naming: GenerationNaming,
}

impl RotationPolicy {
    /// Validated constructor. Both bounds must be positive.
    pub fn new(max_file_size: u64, max_generations: u32) -> LogResult<Self> {
        let policy = Self {
            max_file_size,
            max_generations,
            naming: GenerationNaming::Suffix,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn with_naming(mut self, naming: GenerationNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn validate(&self) -> LogResult<()> {
        if self.max_file_size == 0 {
            return Err(LogError::invalid_configuration(
                "maxFileSize must be larger than 0",
            ));
        }
        if self.max_generations == 0 {
            return Err(LogError::invalid_configuration(
                "maxGenerations must be larger than 0",
            ));
        }
        Ok(())
    }

    /// Path of generation `n` (1 = most recent) for `base`.
    pub fn generation_path(&self, base: &Path, n: u32) -> PathBuf {
        match self.naming {
            GenerationNaming::Suffix => {
                let mut name = base.as_os_str().to_owned();
                name.push(format!(".{n}"));
                PathBuf::from(name)
            }
            GenerationNaming::BeforeExtension => {
                let stem = base.file_stem().unwrap_or_default().to_string_lossy();
                let file_name = match base.extension() {
                    Some(ext) => format!("{stem}.{n}.{}", ext.to_string_lossy()),
                    None => format!("{stem}.{n}"),
                };
                base.with_file_name(file_name)
            }
        }
    }
}
