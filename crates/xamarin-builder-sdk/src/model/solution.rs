//! Visual Studio solution (`.sln`) parsing.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::fix_windows_path;
use super::project::Project;
use super::project_type::{SOLUTION_FOLDER_GUID, normalize_guid};
use crate::types::BuilderError;

const PROJECT_LINE_PATTERN: &str = r#"^Project\("(?P<type>[^"]*)"\)\s*=\s*"(?P<name>[^"]*)"\s*,\s*"(?P<path>[^"]*)"\s*,\s*"(?P<id>[^"]*)""#;
const PROJECT_CONFIG_LINE_PATTERN: &str =
    r"^(?P<id>\{[^}]+\})\.(?P<solution_config>.+)\.ActiveCfg\s*=\s*(?P<project_config>.+)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    SolutionConfigs,
    ProjectConfigs,
}

struct Declaration {
    id: String,
    name: String,
    relative_path: String,
}

/// A parsed solution and the projects it references.
///
/// Projects are kept in declaration order with an id index on the side, so
/// iteration order is stable across runs.
#[derive(Debug, Clone)]
pub struct Solution {
    pub id: String,
    pub path: PathBuf,
    /// Solution config keys (`"<Configuration>|<Platform>"`), each mapped to itself.
    pub config_map: BTreeMap<String, String>,
    projects: Vec<Project>,
    index: HashMap<String, usize>,
}

impl Solution {
    /// Parses the solution at `path` together with every project it declares.
    ///
    /// # Errors
    ///
    /// * [`BuilderError::InvalidPath`] if `path` does not have the `.sln`
    ///   extension or does not exist
    /// * any error of [`Project::parse`] for a referenced project
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, BuilderError> {
        let path = path.as_ref();
        let is_sln = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sln"));
        if !is_sln {
            return Err(BuilderError::invalid_path(
                path,
                "solution file should have .sln extension",
            ));
        }
        if !path.is_file() {
            return Err(BuilderError::invalid_path(path, "solution file does not exist"));
        }

        let path = std::path::absolute(path)?;
        let content = fs::read_to_string(&path)?;
        Self::parse_str(&path, &content)
    }

    fn parse_str(path: &Path, content: &str) -> Result<Self, BuilderError> {
        let project_line_re = Regex::new(PROJECT_LINE_PATTERN)?;
        let project_config_re = Regex::new(PROJECT_CONFIG_LINE_PATTERN)?;

        let mut id = String::new();
        let mut declarations = Vec::new();
        let mut config_map = BTreeMap::new();
        let mut project_configs: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        let mut section = Section::None;

        for line in content.trim_start_matches('\u{feff}').lines() {
            let line = line.trim();

            if let Some(caps) = project_line_re.captures(line) {
                let type_guid = normalize_guid(&caps["type"]);
                if id.is_empty() {
                    id = type_guid.clone();
                }
                if type_guid == SOLUTION_FOLDER_GUID {
                    continue;
                }
                declarations.push(Declaration {
                    id: normalize_guid(&caps["id"]),
                    name: caps["name"].to_string(),
                    relative_path: fix_windows_path(&caps["path"]),
                });
                continue;
            }

            if line.starts_with("GlobalSection(SolutionConfigurationPlatforms)") {
                section = Section::SolutionConfigs;
                continue;
            }
            if line.starts_with("GlobalSection(ProjectConfigurationPlatforms)") {
                section = Section::ProjectConfigs;
                continue;
            }
            if line.starts_with("EndGlobalSection") {
                section = Section::None;
                continue;
            }

            match section {
                Section::SolutionConfigs => {
                    if let Some((key, _)) = line.split_once('=') {
                        let key = key.trim();
                        if !key.is_empty() {
                            config_map.insert(key.to_string(), key.to_string());
                        }
                    }
                }
                Section::ProjectConfigs => {
                    if let Some(caps) = project_config_re.captures(line) {
                        project_configs
                            .entry(normalize_guid(&caps["id"]))
                            .or_default()
                            .insert(
                                caps["solution_config"].trim().to_string(),
                                caps["project_config"].trim().to_string(),
                            );
                    }
                }
                Section::None => {}
            }
        }

        let solution_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut projects = Vec::with_capacity(declarations.len());
        let mut index = HashMap::new();

        for declaration in declarations {
            let project_path = solution_dir.join(&declaration.relative_path);
            let is_project_file = project_path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().to_ascii_lowercase().ends_with("proj"));
            if !is_project_file {
                debug!(
                    "skipping solution entry {} ({}), not a project file",
                    declaration.name, declaration.relative_path
                );
                continue;
            }

            let mut project = Project::parse(&project_path)?;
            project.name = declaration.name;
            if project.id.is_empty() {
                project.id = declaration.id.clone();
            }
            project.config_map = project_configs.remove(&declaration.id).unwrap_or_default();

            if index.contains_key(&project.id) {
                debug!("duplicate project id {} in solution, keeping the first", project.id);
                continue;
            }
            index.insert(project.id.clone(), projects.len());
            projects.push(project);
        }

        Ok(Self {
            id,
            path: path.to_path_buf(),
            config_map,
            projects,
            index,
        })
    }

    /// Projects in declaration order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.index
            .get(&normalize_guid(id))
            .map(|&position| &self.projects[position])
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Declared solution config keys, sorted.
    pub fn config_keys(&self) -> Vec<String> {
        self.config_map.keys().cloned().collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const IOS_SOLUTION: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio 2012
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "CreditCardValidator.iOS", "CreditCardValidator.iOS\CreditCardValidator.iOS.csproj", "{90F3C584-FD69-4926-9903-6B9771847782}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "CreditCardValidator.iOS.UITests", "CreditCardValidator.iOS.UITests\CreditCardValidator.iOS.UITests.csproj", "{BA48743D-06F3-4D2D-ACFD-EE2642CE155A}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Solution Items", "Solution Items", "{11111111-2222-3333-4444-555555555555}"
EndProject
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		Debug|iPhoneSimulator = Debug|iPhoneSimulator
		Release|iPhone = Release|iPhone
		Release|iPhoneSimulator = Release|iPhoneSimulator
		Debug|iPhone = Debug|iPhone
		Debug|Any CPU = Debug|Any CPU
		Release|Any CPU = Release|Any CPU
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|Any CPU.ActiveCfg = Debug|iPhoneSimulator
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|Any CPU.Build.0 = Debug|iPhoneSimulator
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|iPhone.ActiveCfg = Debug|iPhone
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|iPhone.Build.0 = Debug|iPhone
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|iPhoneSimulator.ActiveCfg = Debug|iPhoneSimulator
		{90F3C584-FD69-4926-9903-6B9771847782}.Release|Any CPU.ActiveCfg = Release|iPhone
		{90F3C584-FD69-4926-9903-6B9771847782}.Release|iPhone.ActiveCfg = Release|iPhone
		{90F3C584-FD69-4926-9903-6B9771847782}.Release|iPhoneSimulator.ActiveCfg = Release|iPhoneSimulator
		{BA48743D-06F3-4D2D-ACFD-EE2642CE155A}.Debug|Any CPU.ActiveCfg = Debug|Any CPU
		{BA48743D-06F3-4D2D-ACFD-EE2642CE155A}.Release|iPhone.ActiveCfg = Release|Any CPU
	EndGlobalSection
EndGlobal
"#;
}
