//! Configuration file support for xamarin-builder.
//!
//! Settings that rarely change between builds (tool locations, hang
//! detection thresholds, the project types to build) live in an
//! `xamarin-builder.toml` file so they do not have to be repeated on every
//! invocation.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./xamarin-builder.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! An explicit `--config <path>` skips the search.
//!
//! ## Example Configuration
//!
//! ```toml
//! [toolchain]
//! mdtool_path = "/Applications/Visual Studio.app/Contents/MacOS/vstool"
//! xbuild_path = "/usr/local/bin/xbuild"
//!
//! [diagnostics.mdtool]
//! hang_timeout_secs = 600
//! retry_on_hang = false
//!
//! [diagnostics.xbuild]
//! liveness_pattern = "Building target"
//!
//! [build]
//! project_types = ["ios", "android"]
//! force_mdtool = false
//! custom_options = ["/verbosity:minimal"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xamarin_builder_sdk::{DiagnosticOptions, ProjectType, Toolchain};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "xamarin-builder.toml";

/// Root configuration structure for `xamarin-builder.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XamarinBuilderConfig {
    /// Tool locations.
    pub toolchain: ToolchainConfig,

    /// Hang detection overrides, per tool.
    pub diagnostics: DiagnosticsConfig,

    /// Build defaults.
    pub build: BuildConfig,
}

/// Tool locations. Unset entries fall back to the standard install paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Path of Xamarin Studio's `mdtool`.
    pub mdtool_path: Option<PathBuf>,

    /// Path of Mono's `xbuild`.
    pub xbuild_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub mdtool: DiagnosticsOverride,
    pub xbuild: DiagnosticsOverride,
}

/// Partial [`DiagnosticOptions`]; only the set fields replace the tool's
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsOverride {
    /// Text an output line must contain to count as progress. Empty means
    /// any line.
    pub liveness_pattern: Option<String>,

    /// Seconds without progress before the tool is considered hung.
    pub hang_timeout_secs: Option<u64>,

    /// Seconds between the terminate request and the forced kill.
    pub force_kill_timeout_secs: Option<u64>,

    /// Whether a hung tool is started once more.
    pub retry_on_hang: Option<bool>,
}

impl DiagnosticsOverride {
    /// Applies the set fields on top of `options`.
    pub fn apply(&self, mut options: DiagnosticOptions) -> DiagnosticOptions {
        if let Some(pattern) = &self.liveness_pattern {
            options.liveness_pattern = pattern.clone();
        }
        if let Some(secs) = self.hang_timeout_secs {
            options.hang_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.force_kill_timeout_secs {
            options.force_kill_timeout = Duration::from_secs(secs);
        }
        if let Some(retry) = self.retry_on_hang {
            options.retry_on_hang = retry;
        }
        options
    }
}

/// Build defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Project types to build. Empty builds every type.
    ///
    /// Can be overridden via CLI `--project-type` flags.
    pub project_types: Vec<ProjectType>,

    /// Build Apple projects with mdtool instead of xbuild.
    pub force_mdtool: bool,

    /// Extra options appended to every tool invocation.
    pub custom_options: Vec<String>,
}

impl XamarinBuilderConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: XamarinBuilderConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration from the current directory
    /// or any parent directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Tool locations and supervision settings with the file's overrides applied.
    pub fn toolchain(&self) -> Toolchain {
        let defaults = Toolchain::default();
        Toolchain {
            mdtool_path: self
                .toolchain
                .mdtool_path
                .clone()
                .unwrap_or(defaults.mdtool_path),
            xbuild_path: self
                .toolchain
                .xbuild_path
                .clone()
                .unwrap_or(defaults.xbuild_path),
            mdtool_diagnostics: self.diagnostics.mdtool.apply(defaults.mdtool_diagnostics),
            xbuild_diagnostics: self.diagnostics.xbuild.apply(defaults.xbuild_diagnostics),
        }
    }
}

/// Configuration resolver that merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<XamarinBuilderConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads `explicit` when given, otherwise discovers a config file from
    /// the current directory upwards.
    pub fn new(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self {
                config: Some(XamarinBuilderConfig::load_from_file(path)?),
                config_path: Some(path.to_path_buf()),
            });
        }

        match XamarinBuilderConfig::discover()? {
            Some((config, path)) => Ok(Self {
                config: Some(config),
                config_path: Some(path),
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn toolchain(&self) -> Toolchain {
        self.config
            .as_ref()
            .map(XamarinBuilderConfig::toolchain)
            .unwrap_or_default()
    }

    /// CLI project types when any were given, otherwise the configured ones.
    pub fn project_types(&self, cli: Vec<ProjectType>) -> Vec<ProjectType> {
        let cli = if cli.is_empty() { None } else { Some(cli) };
        self.resolve(cli, |c| Some(c.build.project_types.clone()), Vec::new())
    }

    /// The `--force-mdtool` flag can only switch mdtool on.
    pub fn force_mdtool(&self, cli: bool) -> bool {
        cli || self.config.as_ref().is_some_and(|c| c.build.force_mdtool)
    }

    pub fn custom_options(&self) -> Vec<String> {
        self.config
            .as_ref()
            .map(|c| c.build.custom_options.clone())
            .unwrap_or_default()
    }

    /// Resolves a CLI value, using config as fallback.
    ///
    /// The resolved value prefers CLI over config over default.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&XamarinBuilderConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use xamarin_builder_sdk::builders::{MDTOOL_PATH, XBUILD_PATH};

    const FULL_CONFIG: &str = r#"
[toolchain]
mdtool_path = "/opt/xamarin/mdtool"

[diagnostics.mdtool]
hang_timeout_secs = 600
retry_on_hang = false

[diagnostics.xbuild]
liveness_pattern = "Building target"

[build]
project_types = ["ios", "android"]
force_mdtool = true
custom_options = ["/verbosity:minimal"]
"#;

    #[test]
    fn test_default_config() {
        let config = XamarinBuilderConfig::default();
        assert!(config.build.project_types.is_empty());
        assert!(!config.build.force_mdtool);
        assert_eq!(config.toolchain(), Toolchain::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, FULL_CONFIG).unwrap();

        let config = XamarinBuilderConfig::load_from_file(&config_path).unwrap();

        assert_eq!(
            config.build.project_types,
            vec![ProjectType::Ios, ProjectType::Android]
        );
        assert!(config.build.force_mdtool);
        assert_eq!(config.build.custom_options, vec!["/verbosity:minimal"]);

        let toolchain = config.toolchain();
        assert_eq!(toolchain.mdtool_path, PathBuf::from("/opt/xamarin/mdtool"));
        assert_eq!(toolchain.xbuild_path, PathBuf::from(XBUILD_PATH));
        assert_eq!(
            toolchain.mdtool_diagnostics.hang_timeout,
            Duration::from_secs(600)
        );
        assert!(!toolchain.mdtool_diagnostics.retry_on_hang);
        assert_eq!(
            toolchain.mdtool_diagnostics.liveness_pattern,
            DiagnosticOptions::mdtool().liveness_pattern
        );
        assert_eq!(
            toolchain.xbuild_diagnostics.liveness_pattern,
            "Building target"
        );
    }

    #[test]
    fn test_load_rejects_unknown_project_type() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[build]\nproject_types = [\"windows\"]\n").unwrap();

        let err = XamarinBuilderConfig::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_discover_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[toolchain]\nxbuild_path = \"/usr/bin/xbuild\"\n").unwrap();
        let nested = temp_dir.path().join("src/App.iOS");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = XamarinBuilderConfig::discover_from(&nested)
            .unwrap()
            .unwrap();
        assert_eq!(
            config.toolchain.xbuild_path,
            Some(PathBuf::from("/usr/bin/xbuild"))
        );
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_no_config() {
        let temp_dir = TempDir::new().unwrap();
        // Create a .git directory to stop the search
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = XamarinBuilderConfig::discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_config_resolver_prefers_cli() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, FULL_CONFIG).unwrap();
        let resolver = ConfigResolver::new(Some(&config_path)).unwrap();

        assert_eq!(
            resolver.project_types(vec![ProjectType::TvOs]),
            vec![ProjectType::TvOs]
        );
        assert_eq!(
            resolver.project_types(Vec::new()),
            vec![ProjectType::Ios, ProjectType::Android]
        );
        assert!(resolver.force_mdtool(false));
        assert_eq!(resolver.config_path.as_deref(), Some(config_path.as_path()));
    }

    #[test]
    fn test_empty_resolver_uses_defaults() {
        let resolver = ConfigResolver::default();
        assert!(resolver.project_types(Vec::new()).is_empty());
        assert!(!resolver.force_mdtool(false));
        assert!(resolver.custom_options().is_empty());
        assert_eq!(resolver.toolchain().mdtool_path, PathBuf::from(MDTOOL_PATH));
    }
}
