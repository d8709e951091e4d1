//! Core types for xamarin-builder-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`BuilderError`] - Error types for parsing, planning, running and exporting
//! - [`ProjectType`] - Platform a project targets (iOS, tvOS, macOS, Android)
//! - [`OutputType`] - Kind of artifact a build produces (APK, IPA, xcarchive, ...)
//! - [`TestFramework`] - Test frameworks recognised among project references
//! - [`BuildWindow`] - Wall-clock interval of a build, used to find fresh artifacts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Error types for xamarin-builder-sdk operations.
///
/// Validation errors ([`BuilderError::InvalidPath`], [`BuilderError::UnknownConfig`])
/// are raised before any build step starts. Parse errors are fatal to the
/// enclosing solution. Execution errors ([`BuilderError::CommandFailed`],
/// [`BuilderError::TimedOut`]) stop the remaining build plan.
///
/// # Example
///
/// ```
/// use xamarin_builder_sdk::BuilderError;
///
/// let err = BuilderError::UnknownConfig {
///     config: "Release|iPhone".to_string(),
///     available: vec!["Debug|iPhone".to_string()],
/// };
/// assert!(err.to_string().contains("Debug|iPhone"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// The given path is not usable (wrong extension, missing file or directory).
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// The requested configuration/platform pair is not declared by the solution.
    #[error("invalid solution config: {config}, available: {available:?}")]
    UnknownConfig {
        config: String,
        available: Vec<String>,
    },

    /// A project maps a solution config to a project config it does not define.
    #[error(
        "project ({project}) contains mapping for solution config ({solution_config} -> {project_config}), but does not have project config for it"
    )]
    MissingProjectConfig {
        project: String,
        solution_config: String,
        project_config: String,
    },

    /// A solution, project or manifest file could not be parsed.
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// A build tool could not be started.
    #[error("failed to start {command}: {source}\n\nEnsure the tool is installed or set its path in xamarin-builder.toml")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A build tool exited unsuccessfully.
    #[error("{command} failed with {status}")]
    CommandFailed { command: String, status: String },

    /// A build tool stopped producing liveness output and was terminated.
    #[error("timed out: {command} was terminated after {after:?} without liveness output{}", signal_note(.signal_errors))]
    TimedOut {
        command: String,
        after: Duration,
        signal_errors: Vec<String>,
    },

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// An artifact search pattern could not be compiled.
    #[error("invalid artifact pattern: {0}")]
    Pattern(#[from] regex::Error),
}

fn signal_note(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(" (signal errors: {})", errors.join("; "))
    }
}

impl BuilderError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuilderError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuilderError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Platform a project builds for.
///
/// Determined from the project's type GUIDs, see
/// [`identify_project_type`](crate::model::identify_project_type).
///
/// # Example
///
/// ```
/// use xamarin_builder_sdk::ProjectType;
///
/// assert_eq!(ProjectType::Ios.as_str(), "ios");
/// assert_eq!("tvos".parse::<ProjectType>().unwrap(), ProjectType::TvOs);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Xamarin.iOS application or library.
    Ios,
    /// Xamarin.tvOS application or library.
    #[serde(rename = "tvos")]
    TvOs,
    /// Xamarin.Mac or MonoMac application or library.
    #[serde(rename = "macos")]
    MacOs,
    /// Xamarin.Android application or library.
    Android,
    /// Anything else (shared code, test projects, ...).
    Unknown,
}

impl ProjectType {
    /// Returns the lowercase identifier of the project type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Ios => "ios",
            ProjectType::TvOs => "tvos",
            ProjectType::MacOs => "macos",
            ProjectType::Android => "android",
            ProjectType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(ProjectType::Ios),
            "tvos" => Ok(ProjectType::TvOs),
            "macos" | "mac" => Ok(ProjectType::MacOs),
            "android" => Ok(ProjectType::Android),
            "unknown" => Ok(ProjectType::Unknown),
            other => Err(format!(
                "unknown project type '{}', expected one of: ios, tvos, macos, android",
                other
            )),
        }
    }
}

/// Kind of artifact collected after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Android package.
    Apk,
    /// iOS/tvOS installable bundle.
    Ipa,
    /// Xcode archive.
    #[serde(rename = "xcarchive")]
    XcArchive,
    /// macOS application bundle.
    App,
    /// Debug symbols of the application bundle.
    #[serde(rename = "dsym")]
    AppDsym,
    /// macOS installer package.
    Pkg,
    /// Debug symbols of an embedded framework.
    #[serde(rename = "framework_dsym")]
    FrameworkDsym,
}

impl OutputType {
    /// File extension (without dot) of the artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputType::Apk => "apk",
            OutputType::Ipa => "ipa",
            OutputType::XcArchive => "xcarchive",
            OutputType::App => "app",
            OutputType::AppDsym => "app.dSYM",
            OutputType::Pkg => "pkg",
            OutputType::FrameworkDsym => "framework.dSYM",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Test frameworks detected among a project's assembly references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TestFramework {
    /// `Xamarin.UITest`
    XamarinUiTest,
    /// `nunit.framework`
    NUnit,
    /// `MonoTouch.NUnitLite`
    NUnitLite,
}

impl TestFramework {
    /// Assembly name that marks the framework.
    pub fn assembly_name(&self) -> &'static str {
        match self {
            TestFramework::XamarinUiTest => "Xamarin.UITest",
            TestFramework::NUnit => "nunit.framework",
            TestFramework::NUnitLite => "MonoTouch.NUnitLite",
        }
    }

    /// Matches an assembly name (case-insensitive) against the known frameworks.
    pub fn from_assembly_name(name: &str) -> Option<Self> {
        [
            TestFramework::XamarinUiTest,
            TestFramework::NUnit,
            TestFramework::NUnitLite,
        ]
        .into_iter()
        .find(|framework| framework.assembly_name().eq_ignore_ascii_case(name))
    }
}

/// Wall-clock interval of a build.
///
/// Artifacts modified inside the window are preferred by the exporter. A
/// window whose bounds are unset (the Unix epoch) or which has no extent is
/// degenerate and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildWindow {
    pub start: SystemTime,
    pub end: SystemTime,
}

impl BuildWindow {
    pub fn new(start: SystemTime, end: SystemTime) -> Self {
        Self { start, end }
    }

    /// A window that matches nothing; exports then fall back to the full file set.
    pub fn unbounded() -> Self {
        Self {
            start: UNIX_EPOCH,
            end: UNIX_EPOCH,
        }
    }

    /// Whether the window cannot contain any modification time.
    pub fn is_degenerate(&self) -> bool {
        self.start == UNIX_EPOCH || self.end == UNIX_EPOCH || self.start >= self.end
    }

    /// Inclusive containment check.
    pub fn contains(&self, time: SystemTime) -> bool {
        !self.is_degenerate() && time >= self.start && time <= self.end
    }
}

impl Default for BuildWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}
