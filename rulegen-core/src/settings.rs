//! Clap-free settings for the generate pipeline.

use rulegen_types::{ConfigError, GeneratorConfig};

/// Names looked up, in order, for an existing build file.
pub const DEFAULT_BUILD_FILE_NAMES: &[&str] = &["BUILD.bazel", "BUILD"];

/// Settings for the generate pipeline.
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    pub generator: GeneratorConfig,

    /// Build file names looked up in each package directory. New files get the first one.
    pub build_file_names: Vec<String>,

    /// Worker threads; `0` is treated as `1`.
    pub jobs: usize,

    /// Compute results and a patch but write nothing.
    pub dry_run: bool,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            build_file_names: DEFAULT_BUILD_FILE_NAMES
                .iter()
                .map(|n| n.to_string())
                .collect(),
            jobs: 1,
            dry_run: false,
        }
    }
}

impl GenerateSettings {
    /// Generator configuration with the build file name taken from `build_file_names`.
    pub fn generator_config(&self) -> Result<GeneratorConfig, ConfigError> {
        let primary = self
            .build_file_names
            .first()
            .filter(|n| !n.trim().is_empty())
            .ok_or(ConfigError::EmptyBuildFileName)?;
        if self.build_file_names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::EmptyBuildFileName);
        }
        Ok(GeneratorConfig {
            build_file_name: primary.clone(),
            ..self.generator.clone()
        })
    }
}
