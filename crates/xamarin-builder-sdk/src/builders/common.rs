//! Shared command plumbing for both toolchains.
//!
//! [`BuildCommand`] is the single type the planner hands out: a closed enum
//! over the two toolchains, exposing the printable form used for
//! deduplication, extra-option passthrough and execution.

use std::path::{Path, PathBuf};

use super::mdtool::{MDTOOL_PATH, MdtoolCommand};
use super::xbuild::{XBUILD_PATH, XbuildCommand};
use crate::runner::DiagnosticOptions;
use crate::types::BuilderError;

/// Renders an argument vector as a single line: every element double-quoted
/// (embedded quotes escaped) and separated by one space.
///
/// ```
/// use xamarin_builder_sdk::builders::printable_command;
///
/// let args = vec!["xbuild".to_string(), "My App.sln".to_string()];
/// assert_eq!(printable_command(&args), r#""xbuild" "My App.sln""#);
/// ```
pub fn printable_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| format!("\"{}\"", arg.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One planned toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildCommand {
    /// Xamarin Studio's `mdtool`.
    NativeTool(MdtoolCommand),
    /// Mono's `xbuild`.
    GenericTool(XbuildCommand),
}

impl BuildCommand {
    pub fn args(&self) -> Vec<String> {
        match self {
            BuildCommand::NativeTool(command) => command.args(),
            BuildCommand::GenericTool(command) => command.args(),
        }
    }

    /// Stable textual form of the command, used to skip duplicates.
    pub fn printable_command(&self) -> String {
        printable_command(&self.args())
    }

    /// Appends toolchain specific options after the planned arguments.
    pub fn append_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            BuildCommand::NativeTool(command) => command.append_options(options),
            BuildCommand::GenericTool(command) => command.append_options(options),
        }
    }

    /// Runs the command through the diagnostic runner.
    pub fn run(&self) -> Result<(), BuilderError> {
        match self {
            BuildCommand::NativeTool(command) => command.run(),
            BuildCommand::GenericTool(command) => command.run(),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            BuildCommand::NativeTool(_) => "mdtool",
            BuildCommand::GenericTool(_) => "xbuild",
        }
    }
}

impl From<MdtoolCommand> for BuildCommand {
    fn from(command: MdtoolCommand) -> Self {
        BuildCommand::NativeTool(command)
    }
}

impl From<XbuildCommand> for BuildCommand {
    fn from(command: XbuildCommand) -> Self {
        BuildCommand::GenericTool(command)
    }
}

/// Tool locations and their supervision settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub mdtool_path: PathBuf,
    pub xbuild_path: PathBuf,
    pub mdtool_diagnostics: DiagnosticOptions,
    pub xbuild_diagnostics: DiagnosticOptions,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            mdtool_path: PathBuf::from(MDTOOL_PATH),
            xbuild_path: PathBuf::from(XBUILD_PATH),
            mdtool_diagnostics: DiagnosticOptions::mdtool(),
            xbuild_diagnostics: DiagnosticOptions::xbuild(),
        }
    }
}

impl Toolchain {
    pub fn mdtool(&self, solution_path: &Path) -> MdtoolCommand {
        MdtoolCommand::new(&self.mdtool_path, solution_path)
            .diagnostics(self.mdtool_diagnostics.clone())
    }

    pub fn xbuild(&self, build_path: &Path) -> XbuildCommand {
        XbuildCommand::new(&self.xbuild_path, build_path)
            .diagnostics(self.xbuild_diagnostics.clone())
    }
}
