//! Xamarin build orchestration for Rust
//!
//! `xamarin-builder-sdk` builds the mobile projects of a Visual Studio
//! solution (iOS, tvOS, macOS and Android) with Xamarin Studio's `mdtool` or
//! Mono's `xbuild`, watches the build tools for hangs, and locates the
//! artifacts (APK, IPA, xcarchive, app bundles, dSYM) each build produced.
//!
//! # Architecture
//!
//! - **Model**: parses `.sln`, `.csproj` and `AndroidManifest.xml` files
//! - **Resolver**: maps a configuration/platform pair onto each project and
//!   decides which projects are buildable
//! - **Planner**: turns every buildable project into toolchain commands and
//!   runs them in order, skipping duplicates
//! - **Builders**: the `mdtool` and `xbuild` command lines
//! - **Runner**: runs one command with hang detection and a single retry
//! - **Export**: finds the newest matching artifact in the output directories
//!
//! # Example
//!
//! ```ignore
//! use xamarin_builder_sdk::{Builder, ProjectType};
//!
//! fn main() -> Result<(), xamarin_builder_sdk::BuilderError> {
//!     let builder = Builder::new("CreditCardValidator.sln", vec![ProjectType::Android], false)?;
//!
//!     let outcome = builder.build_all_projects("Release", "Any CPU", None);
//!     for warning in &outcome.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!     let window = outcome.result?;
//!
//!     let (outputs, _) = builder.collect_outputs("Release", "Any CPU", window)?;
//!     for (project, output) in &outputs {
//!         println!("{}: {:?}", project, output.outputs);
//!     }
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod export;
pub mod model;
pub mod planner;
pub mod resolver;
pub mod runner;
pub mod types;

pub use builders::{BuildCommand, MdtoolCommand, Toolchain, XbuildCommand};
pub use model::{ConfigurationPlatform, Project, Solution};
pub use planner::{
    BuildEvent, BuildOutcome, Builder, Output, ProjectOutput, ProjectOutputMap, plan_commands,
};
pub use resolver::{BuildableProject, buildable_projects};
pub use runner::{DiagnosticOptions, run_diagnostic};
pub use types::{BuildWindow, BuilderError, OutputType, ProjectType, TestFramework};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
