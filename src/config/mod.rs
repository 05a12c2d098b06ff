pub mod module_loader;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Register the compiled-in providers (GMX).
    #[serde(default = "default_builtin_providers")]
    pub builtin_providers: bool,
    /// Directory of YAML pattern-set modules.
    #[serde(default)]
    pub pattern_dir: Option<String>,
    /// Messages processed at once by the batch runner.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_builtin_providers() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            builtin_providers: default_builtin_providers(),
            pattern_dir: None,
            concurrency: default_concurrency(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> &'static str {
        "/etc/bounce-parser.yaml"
    }
}
