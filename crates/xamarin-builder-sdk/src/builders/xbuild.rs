//! Command builder for Mono's `xbuild`.

use std::path::PathBuf;

use crate::runner::{DiagnosticOptions, run_diagnostic};
use crate::types::BuilderError;

/// Default location of `xbuild` in the Mono framework.
pub const XBUILD_PATH: &str = "/Library/Frameworks/Mono.framework/Commands/xbuild";

/// An `xbuild` invocation on a solution or a single project file.
///
/// `/p:SolutionDir=` is only passed when building a solution, so that
/// project-scoped builds keep resolving their own paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XbuildCommand {
    tool_path: PathBuf,
    build_path: PathBuf,
    target: String,
    configuration: String,
    platform: String,
    archive_on_build: bool,
    build_ipa: bool,
    custom_options: Vec<String>,
    diagnostics: DiagnosticOptions,
}

impl XbuildCommand {
    /// `build_path` is either a `.sln` or a project file.
    pub fn new(tool_path: impl Into<PathBuf>, build_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            build_path: build_path.into(),
            target: String::new(),
            configuration: String::new(),
            platform: String::new(),
            archive_on_build: false,
            build_ipa: false,
            custom_options: Vec::new(),
            diagnostics: DiagnosticOptions::xbuild(),
        }
    }

    /// Sets the MSBuild target, e.g. `Build` or `SignAndroidPackage`.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn archive_on_build(mut self, archive_on_build: bool) -> Self {
        self.archive_on_build = archive_on_build;
        self
    }

    pub fn build_ipa(mut self, build_ipa: bool) -> Self {
        self.build_ipa = build_ipa;
        self
    }

    pub fn diagnostics(mut self, diagnostics: DiagnosticOptions) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn append_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_options
            .extend(options.into_iter().map(Into::into));
    }

    fn is_solution_build(&self) -> bool {
        self.build_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sln"))
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.tool_path.to_string_lossy().into_owned()];

        if !self.build_path.as_os_str().is_empty() {
            args.push(self.build_path.to_string_lossy().into_owned());
        }
        if !self.target.is_empty() {
            args.push(format!("/target:{}", self.target));
        }
        if self.is_solution_build() {
            let solution_dir = match self.build_path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_string_lossy().into_owned(),
                _ => ".".to_string(),
            };
            args.push(format!("/p:SolutionDir={}", solution_dir));
        }
        if !self.configuration.is_empty() {
            args.push(format!("/p:Configuration={}", self.configuration));
        }
        if !self.platform.is_empty() {
            args.push(format!("/p:Platform={}", self.platform));
        }
        if self.archive_on_build {
            args.push("/p:ArchiveOnBuild=true".to_string());
        }
        if self.build_ipa {
            args.push("/p:BuildIpa=true".to_string());
        }

        args.extend(self.custom_options.iter().cloned());
        args
    }

    pub fn run(&self) -> Result<(), BuilderError> {
        run_diagnostic(&self.args(), &self.diagnostics)
    }
}
