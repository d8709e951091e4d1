//! Command builders for the two supported toolchains.
//!
//! | Builder | Tool | Scope |
//! |---------|------|-------|
//! | [`MdtoolCommand`] | Xamarin Studio `mdtool` | solution, optionally one project |
//! | [`XbuildCommand`] | Mono `xbuild` | solution or single project file |
//!
//! Both are wrapped by [`BuildCommand`], which the planner returns and the
//! [`Builder`](crate::planner::Builder) runs. A [`Toolchain`] carries the
//! tool locations and the hang-detection settings applied to each tool.
//!
//! ## Example
//!
//! ```
//! use std::path::Path;
//! use xamarin_builder_sdk::builders::{BuildCommand, Toolchain};
//!
//! let toolchain = Toolchain::default();
//! let command: BuildCommand = toolchain
//!     .xbuild(Path::new("App.sln"))
//!     .target("Build")
//!     .configuration("Release")
//!     .platform("iPhone")
//!     .into();
//! assert!(command.printable_command().contains(r#""/p:Platform=iPhone""#));
//! ```

pub mod common;
pub mod mdtool;
pub mod xbuild;

pub use common::{BuildCommand, Toolchain, printable_command};
pub use mdtool::{MDTOOL_PATH, MdtoolCommand};
pub use xbuild::{XBUILD_PATH, XbuildCommand};
