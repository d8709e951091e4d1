//! Solution and project model.
//!
//! Parses Visual Studio solution files (`.sln`), the MSBuild project files
//! they reference (`.csproj`) and Android manifests into immutable values.
//!
//! ## Example
//!
//! ```ignore
//! use xamarin_builder_sdk::model::Solution;
//!
//! let solution = Solution::parse("CreditCardValidator.sln")?;
//! for project in solution.projects() {
//!     println!("{} ({})", project.name, project.project_type);
//! }
//! # Ok::<(), xamarin_builder_sdk::BuilderError>(())
//! ```

pub mod manifest;
pub mod project;
pub mod project_type;
pub mod solution;

pub use manifest::AndroidManifest;
pub use project::{ConfigurationPlatform, Project};
pub use project_type::identify_project_type;
pub use solution::Solution;

/// Converts Windows path separators to `/`.
///
/// ```
/// use xamarin_builder_sdk::model::fix_windows_path;
///
/// assert_eq!(fix_windows_path(r"bin\iPhone\Release"), "bin/iPhone/Release");
/// ```
pub fn fix_windows_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Splits `list` on `separator`, trims every item and drops empty ones.
///
/// ```
/// use xamarin_builder_sdk::model::split_and_strip_list;
///
/// assert_eq!(split_and_strip_list("ARMv7, ARM64", ","), vec!["ARMv7", "ARM64"]);
/// ```
pub fn split_and_strip_list(list: &str, separator: &str) -> Vec<String> {
    list.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
