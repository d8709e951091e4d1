//! Configuration resolution and buildable project filtering.
//!
//! All functions here are pure: they map a requested configuration/platform
//! pair onto the solution and project configuration spaces and decide which
//! projects take part in a build.

use tracing::warn;

use crate::model::{ConfigurationPlatform, Project, Solution};
use crate::types::{BuilderError, ProjectType};

/// A project selected for building together with its resolved project config.
#[derive(Debug, Clone, Copy)]
pub struct BuildableProject<'a> {
    pub project: &'a Project,
    pub config: &'a ConfigurationPlatform,
}

/// Joins a configuration and platform into a config key.
///
/// No normalisation is applied; `("", "")` yields `"|"`.
///
/// ```
/// use xamarin_builder_sdk::resolver::to_config_key;
///
/// assert_eq!(to_config_key("Release", "iPhone"), "Release|iPhone");
/// assert_eq!(to_config_key("", ""), "|");
/// ```
pub fn to_config_key(configuration: &str, platform: &str) -> String {
    format!("{}|{}", configuration, platform)
}

/// Checks that the solution declares the given configuration/platform pair.
pub fn validate_solution_config(
    solution: &Solution,
    configuration: &str,
    platform: &str,
) -> Result<(), BuilderError> {
    let config = to_config_key(configuration, platform);
    if solution.config_map.contains_key(&config) {
        Ok(())
    } else {
        Err(BuilderError::UnknownConfig {
            config,
            available: solution.config_keys(),
        })
    }
}

/// An empty whitelist allows every project type.
pub fn is_project_type_allowed(project_type: ProjectType, whitelist: &[ProjectType]) -> bool {
    whitelist.is_empty() || whitelist.contains(&project_type)
}

/// Keeps the projects whose type is allowed by `whitelist`, preserving order.
pub fn filter_by_type<'a>(
    projects: impl IntoIterator<Item = &'a Project>,
    whitelist: &[ProjectType],
) -> Vec<&'a Project> {
    projects
        .into_iter()
        .filter(|project| is_project_type_allowed(project.project_type, whitelist))
        .collect()
}

/// Resolves the projects to build for `configuration|platform`.
///
/// Projects without a mapping for the solution config, and projects that do
/// not produce an application (iOS, tvOS and macOS need `OutputType` exe,
/// Android needs `AndroidApplication`), are skipped with a warning. Returned
/// warnings are also logged.
///
/// # Errors
///
/// * [`BuilderError::UnknownConfig`] if the solution does not declare the pair
/// * [`BuilderError::MissingProjectConfig`] if a project maps the solution
///   config to a project config it does not define
pub fn buildable_projects<'a>(
    solution: &'a Solution,
    configuration: &str,
    platform: &str,
    whitelist: &[ProjectType],
) -> Result<(Vec<BuildableProject<'a>>, Vec<String>), BuilderError> {
    validate_solution_config(solution, configuration, platform)?;

    let solution_config = to_config_key(configuration, platform);
    let mut buildable = Vec::new();
    let mut warnings = Vec::new();

    for project in filter_by_type(solution.projects(), whitelist) {
        let Some(project_config) = project.config_for(&solution_config) else {
            let warning = format!(
                "project ({}) do not have config for solution config ({}), skipping...",
                project.name, solution_config
            );
            warn!("{}", warning);
            warnings.push(warning);
            continue;
        };

        let Some(config) = project.configs.get(project_config) else {
            return Err(BuilderError::MissingProjectConfig {
                project: project.name.clone(),
                solution_config,
                project_config: project_config.to_string(),
            });
        };

        if let Some(reason) = non_application_reason(project) {
            let warning = format!("project ({}) {}, skipping...", project.name, reason);
            warn!("{}", warning);
            warnings.push(warning);
            continue;
        }

        buildable.push(BuildableProject { project, config });
    }

    Ok((buildable, warnings))
}

fn non_application_reason(project: &Project) -> Option<String> {
    match project.project_type {
        ProjectType::Ios | ProjectType::TvOs | ProjectType::MacOs if project.output_type != "exe" => {
            Some(format!(
                "is not archivable based on output type ({})",
                project.output_type
            ))
        }
        ProjectType::Android if !project.android_application => {
            Some("is not an android application".to_string())
        }
        _ => None,
    }
}

/// Archiving is allowed when every architecture starts with `arm`
/// (case-insensitive). An empty list means the default armv7.
///
/// ```
/// use xamarin_builder_sdk::resolver::is_architecture_archivable;
///
/// assert!(is_architecture_archivable(&["ARMv7".to_string(), "arm64".to_string()]));
/// assert!(!is_architecture_archivable(&["i386".to_string()]));
/// assert!(is_architecture_archivable(&[]));
/// ```
pub fn is_architecture_archivable(archs: &[String]) -> bool {
    archs
        .iter()
        .all(|arch| arch.trim().to_ascii_lowercase().starts_with("arm"))
}

/// Exact match against `Any CPU` and `AnyCPU`.
pub fn is_platform_any_cpu(platform: &str) -> bool {
    platform == "Any CPU" || platform == "AnyCPU"
}

/// Whether `platform` denotes the any-CPU platform in either the solution or
/// the project spelling, ignoring case and spaces.
pub fn denotes_any_cpu(platform: &str) -> bool {
    let collapsed: String = platform
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    is_platform_any_cpu(platform) || collapsed == "anycpu"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::fixtures::{ANDROID_PROJECT, IOS_PROJECT, UITEST_PROJECT};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SOLUTION: &str = r#"
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App.iOS", "App.iOS\App.iOS.csproj", "{90F3C584-FD69-4926-9903-6B9771847782}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App.Droid", "App.Droid\App.Droid.csproj", "{9D1D32A3-D13F-4F23-B7D4-EF9D52B06E60}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App.UITests", "App.UITests\App.UITests.csproj", "{BA48743D-06F3-4D2D-ACFD-EE2642CE155A}"
EndProject
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		Release|iPhone = Release|iPhone
		Release|Any CPU = Release|Any CPU
		Debug|Any CPU = Debug|Any CPU
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{90F3C584-FD69-4926-9903-6B9771847782}.Release|iPhone.ActiveCfg = Release|iPhone
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|Any CPU.ActiveCfg = Debug|Unknown
		{9D1D32A3-D13F-4F23-B7D4-EF9D52B06E60}.Release|Any CPU.ActiveCfg = Release|AnyCPU
		{9D1D32A3-D13F-4F23-B7D4-EF9D52B06E60}.Release|iPhone.ActiveCfg = Release|AnyCPU
		{BA48743D-06F3-4D2D-ACFD-EE2642CE155A}.Release|iPhone.ActiveCfg = Release|AnyCPU
	EndGlobalSection
EndGlobal
"#;

    fn fixture(dir: &Path) -> Solution {
        for (relative, content) in [
            ("App.iOS/App.iOS.csproj", IOS_PROJECT),
            ("App.Droid/App.Droid.csproj", ANDROID_PROJECT),
            ("App.UITests/App.UITests.csproj", UITEST_PROJECT),
        ] {
            let path = dir.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let sln = dir.join("App.sln");
        fs::write(&sln, SOLUTION).unwrap();
        Solution::parse(sln).unwrap()
    }

    #[test]
    fn test_validate_solution_config_lists_available_keys() {
        let temp_dir = TempDir::new().unwrap();
        let solution = fixture(temp_dir.path());

        assert!(validate_solution_config(&solution, "Release", "iPhone").is_ok());
        match validate_solution_config(&solution, "Debug", "iPhone") {
            Err(BuilderError::UnknownConfig { config, available }) => {
                assert_eq!(config, "Debug|iPhone");
                assert_eq!(
                    available,
                    vec!["Debug|Any CPU", "Release|Any CPU", "Release|iPhone"]
                );
            }
            other => panic!("expected UnknownConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_buildable_projects_for_iphone() {
        let temp_dir = TempDir::new().unwrap();
        let solution = fixture(temp_dir.path());

        let (buildable, warnings) =
            buildable_projects(&solution, "Release", "iPhone", &[]).unwrap();
        let names: Vec<_> = buildable.iter().map(|b| b.project.name.as_str()).collect();
        assert_eq!(names, vec!["App.iOS", "App.Droid", "App.UITests"]);
        assert_eq!(buildable[0].config.platform, "iPhone");
        assert_eq!(buildable[1].config.platform, "AnyCPU");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_buildable_projects_respects_whitelist_and_warns_on_missing_mapping() {
        let temp_dir = TempDir::new().unwrap();
        let solution = fixture(temp_dir.path());

        let (buildable, warnings) =
            buildable_projects(&solution, "Release", "Any CPU", &[ProjectType::Ios]).unwrap();
        assert!(buildable.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("App.iOS"));
        assert!(warnings[0].contains("Release|Any CPU"));
    }

    #[test]
    fn test_missing_project_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let solution = fixture(temp_dir.path());

        let err = buildable_projects(&solution, "Debug", "Any CPU", &[]).unwrap_err();
        match err {
            BuilderError::MissingProjectConfig {
                project,
                project_config,
                ..
            } => {
                assert_eq!(project, "App.iOS");
                assert_eq!(project_config, "Debug|Unknown");
            }
            other => panic!("expected MissingProjectConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_non_application_projects_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fixture(dir);
        let library = IOS_PROJECT.replace("<OutputType>Exe</OutputType>", "<OutputType>Library</OutputType>");
        fs::write(dir.join("App.iOS/App.iOS.csproj"), library).unwrap();
        let solution = Solution::parse(dir.join("App.sln")).unwrap();

        let (buildable, warnings) =
            buildable_projects(&solution, "Release", "iPhone", &[ProjectType::Ios]).unwrap();
        assert!(buildable.is_empty());
        assert!(warnings[0].contains("output type (library)"));
    }

    #[test]
    fn test_filter_by_type() {
        let temp_dir = TempDir::new().unwrap();
        let solution = fixture(temp_dir.path());

        assert_eq!(filter_by_type(solution.projects(), &[]).len(), 3);
        let android = filter_by_type(solution.projects(), &[ProjectType::Android]);
        assert_eq!(android.len(), 1);
        assert_eq!(android[0].name, "App.Droid");
        assert!(is_project_type_allowed(ProjectType::TvOs, &[]));
        assert!(!is_project_type_allowed(ProjectType::TvOs, &[ProjectType::Ios]));
    }

    #[test]
    fn test_architecture_archivable() {
        let archs = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(is_architecture_archivable(&archs(&["ARMv7", "Arm64", "armv7s"])));
        assert!(is_architecture_archivable(&archs(&[])));
        assert!(!is_architecture_archivable(&archs(&["ARMv7", "i386"])));
        assert!(!is_architecture_archivable(&archs(&["x86_64"])));
    }

    #[test]
    fn test_platform_any_cpu_is_exact() {
        assert!(is_platform_any_cpu("Any CPU"));
        assert!(is_platform_any_cpu("AnyCPU"));
        assert!(!is_platform_any_cpu("any cpu"));
        assert!(!is_platform_any_cpu("Any  CPU"));
        assert!(!is_platform_any_cpu("iPhone"));
    }

    #[test]
    fn test_denotes_any_cpu_ignores_case_and_spacing() {
        assert!(denotes_any_cpu("any cpu"));
        assert!(denotes_any_cpu("ANYCPU"));
        assert!(!denotes_any_cpu("x86"));
    }
}
