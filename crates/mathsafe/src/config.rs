use anyhow::Result;
use directories::ProjectDirs;
use safecore::{build_config, PolicyConfig, PolicyOverrides};
use std::path::{Path, PathBuf};
use tokio::fs::try_exists;

/// Where the policy overrides were read from, and what they contained.
#[derive(Debug, Clone)]
pub struct PolicySource {
    pub path: Option<PathBuf>,
    pub overrides: PolicyOverrides,
}

impl PolicySource {
    /// Load overrides from `explicit`, or from the default location when
    /// no path is given. A missing or empty file means no overrides.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        // Explicit path first, then env vars and the platform config dir
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path(),
        };

        let Some(config_path) = path else {
            log::info!("No config directory available, using default policy");
            return Ok(Self::defaults(None));
        };

        // Only an explicitly named file has to exist
        if !try_exists(&config_path).await? {
            if explicit.is_some() {
                return Err(anyhow::anyhow!(
                    "Policy file not found: {}",
                    config_path.display()
                ));
            }
            log::info!(
                "Policy file {} does not exist, using default policy",
                config_path.display()
            );
            return Ok(Self::defaults(Some(config_path)));
        }

        // Read the policy file
        let content = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => content,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read policy file: {} - {}",
                    config_path.display(),
                    e
                ));
            }
        };

        if content.trim().is_empty() {
            log::warn!("Policy file is empty, using default policy");
            return Ok(Self::defaults(Some(config_path)));
        }

        // Try to deserialize
        match PolicyOverrides::from_json(&content) {
            Ok(overrides) => {
                log::info!(
                    "Successfully loaded policy from: {}",
                    config_path.display()
                );
                Ok(Self {
                    path: Some(config_path),
                    overrides,
                })
            }
            Err(e) => {
                log::error!("Failed to parse policy file: {}", e);
                Err(anyhow::anyhow!("{} ({})", e, config_path.display()))
            }
        }
    }

    pub fn policy(&self) -> PolicyConfig {
        build_config(&self.overrides)
    }

    fn defaults(path: Option<PathBuf>) -> Self {
        Self {
            path,
            overrides: PolicyOverrides::default(),
        }
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MATHSAFE_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("MATHSAFE_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("policy.json"));
        }

        ProjectDirs::from("com", "mathsafe", "mathsafe")
            .map(|dirs| dirs.config_dir().join("policy.json"))
    }
}
