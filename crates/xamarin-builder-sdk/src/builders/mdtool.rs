//! Command builder for Xamarin Studio's `mdtool`.

use std::path::PathBuf;

use crate::resolver::is_platform_any_cpu;
use crate::runner::{DiagnosticOptions, run_diagnostic};
use crate::types::BuilderError;

/// Default location of `mdtool` inside the Xamarin Studio bundle.
pub const MDTOOL_PATH: &str = "/Applications/Xamarin Studio.app/Contents/MacOS/mdtool";

/// An `mdtool` invocation.
///
/// The argument vector is
/// `[tool, target, solution, -c:<configuration>[|<platform>], -p:<project>, options...]`
/// where empty parts are left out and the platform is dropped for any-CPU
/// platforms.
///
/// # Example
///
/// ```
/// use xamarin_builder_sdk::builders::MdtoolCommand;
///
/// let command = MdtoolCommand::new("mdtool", "App.sln")
///     .target("archive")
///     .configuration("Release")
///     .platform("iPhone")
///     .project_name("App.iOS");
/// assert_eq!(
///     command.args(),
///     vec!["mdtool", "archive", "App.sln", "-c:Release|iPhone", "-p:App.iOS"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdtoolCommand {
    tool_path: PathBuf,
    solution_path: PathBuf,
    target: String,
    configuration: String,
    platform: String,
    project_name: String,
    custom_options: Vec<String>,
    diagnostics: DiagnosticOptions,
}

impl MdtoolCommand {
    pub fn new(tool_path: impl Into<PathBuf>, solution_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            solution_path: solution_path.into(),
            target: String::new(),
            configuration: String::new(),
            platform: String::new(),
            project_name: String::new(),
            custom_options: Vec::new(),
            diagnostics: DiagnosticOptions::mdtool(),
        }
    }

    /// Sets the mdtool verb, e.g. `build` or `archive`.
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

    /// Restricts the invocation to one project of the solution.
    pub fn project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
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

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.tool_path.to_string_lossy().into_owned()];

        if !self.target.is_empty() {
            args.push(self.target.clone());
        }
        if !self.solution_path.as_os_str().is_empty() {
            args.push(self.solution_path.to_string_lossy().into_owned());
        }

        let mut config = self.configuration.clone();
        if !self.platform.is_empty() && !is_platform_any_cpu(&self.platform) {
            config.push('|');
            config.push_str(&self.platform);
        }
        if !config.is_empty() {
            args.push(format!("-c:{}", config));
        }

        if !self.project_name.is_empty() {
            args.push(format!("-p:{}", self.project_name));
        }

        args.extend(self.custom_options.iter().cloned());
        args
    }

    /// Runs the command in diagnostic mode.
    pub fn run(&self) -> Result<(), BuilderError> {
        run_diagnostic(&self.args(), &self.diagnostics)
    }
}
