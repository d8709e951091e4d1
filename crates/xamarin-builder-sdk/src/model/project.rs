//! MSBuild project (`.csproj`) parsing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use roxmltree::{Document, Node};
use serde::Serialize;
use tracing::{debug, warn};

use super::manifest::AndroidManifest;
use super::project_type::{identify_project_type, normalize_guid};
use super::{fix_windows_path, split_and_strip_list};
use crate::resolver::to_config_key;
use crate::types::{BuilderError, ProjectType, TestFramework};

const CONFIG_CONDITION_PATTERN: &str =
    r"'\$\(Configuration\)\|\$\(Platform\)'\s*==\s*'(?P<configuration>[^|']*)\|(?P<platform>[^']*)'";

/// Build properties of one `Configuration|Platform` of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationPlatform {
    pub configuration: String,
    pub platform: String,
    /// `OutputPath` resolved against the project directory.
    pub output_dir: PathBuf,
    /// `MtouchArch` entries; empty means the default architecture.
    pub mtouch_archs: Vec<String>,
    pub build_ipa: bool,
    pub sign_android: bool,
}

/// A parsed project.
///
/// Built by [`Project::parse`]; the solution fills in [`Project::name`] and
/// [`Project::config_map`] from its own declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub project_type: ProjectType,
    /// Lower-cased `OutputType` ("exe", "library", ...).
    pub output_type: String,
    pub assembly_name: String,
    /// Solution config key to project config key.
    pub config_map: BTreeMap<String, String>,
    /// Project config key to its properties.
    pub configs: BTreeMap<String, ConfigurationPlatform>,
    pub referred_project_ids: Vec<String>,
    pub test_frameworks: BTreeSet<TestFramework>,
    pub manifest_path: Option<PathBuf>,
    /// Package name read from the Android manifest, when it exists.
    pub package_name: Option<String>,
    pub android_application: bool,
}

impl Project {
    /// Parses the project file at `path`.
    ///
    /// PropertyGroups whose condition is not a `Configuration|Platform`
    /// comparison are skipped. A declared but missing Android manifest only
    /// leaves [`Project::package_name`] unset; a malformed one is an error.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, BuilderError> {
        let path = std::path::absolute(path.as_ref())?;
        let content = fs::read_to_string(&path)?;
        Self::parse_str(&path, &content)
    }

    fn parse_str(path: &Path, content: &str) -> Result<Self, BuilderError> {
        let doc = Document::parse(content.trim_start_matches('\u{feff}'))
            .map_err(|e| BuilderError::parse(path, format!("invalid project XML: {}", e)))?;
        let project_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let id = first_text(&doc, "ProjectGuid")
            .map(normalize_guid)
            .unwrap_or_default();
        let project_type = first_text(&doc, "ProjectTypeGuids")
            .map(identify_project_type)
            .unwrap_or(ProjectType::Unknown);
        let output_type = first_text(&doc, "OutputType")
            .map(str::to_lowercase)
            .unwrap_or_default();
        let assembly_name = first_text(&doc, "AssemblyName")
            .map(str::to_string)
            .unwrap_or_default();
        let android_application = first_text(&doc, "AndroidApplication")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let configs = parse_configs(&doc, path, project_dir)?;
        let referred_project_ids = referred_project_ids(&doc);
        let test_frameworks = test_frameworks(&doc);

        let manifest_path = first_text(&doc, "AndroidManifest")
            .map(|manifest| project_dir.join(fix_windows_path(manifest)));
        let package_name = match &manifest_path {
            Some(manifest) if manifest.is_file() => {
                Some(AndroidManifest::parse(manifest)?.package_name)
            }
            Some(manifest) => {
                warn!(
                    "Android manifest {} of {} does not exist",
                    manifest.display(),
                    path.display()
                );
                None
            }
            None => None,
        };

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            path: path.to_path_buf(),
            project_type,
            output_type,
            assembly_name,
            config_map: BTreeMap::new(),
            configs,
            referred_project_ids,
            test_frameworks,
            manifest_path,
            package_name,
            android_application,
        })
    }

    /// Project config mapped to the given solution config key, if any.
    pub fn config_for(&self, solution_config: &str) -> Option<&str> {
        self.config_map.get(solution_config).map(String::as_str)
    }

    /// Directory containing the project file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

fn first_text<'a>(doc: &'a Document, tag: &str) -> Option<&'a str> {
    doc.descendants()
        .find(|node| node.has_tag_name(tag))
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
}

fn parse_configs(
    doc: &Document,
    path: &Path,
    project_dir: &Path,
) -> Result<BTreeMap<String, ConfigurationPlatform>, BuilderError> {
    let condition_re = Regex::new(CONFIG_CONDITION_PATTERN)?;
    let mut configs = BTreeMap::new();

    for group in doc
        .descendants()
        .filter(|node| node.has_tag_name("PropertyGroup"))
    {
        let Some(condition) = group.attribute("Condition") else {
            continue;
        };
        let Some(caps) = condition_re.captures(condition) else {
            if condition.contains("$(Platform)") {
                warn!(
                    "skipping PropertyGroup with unsupported condition ({}) in {}",
                    condition.trim(),
                    path.display()
                );
            } else {
                debug!("ignoring PropertyGroup condition {}", condition.trim());
            }
            continue;
        };

        let configuration = caps["configuration"].trim().to_string();
        let platform = caps["platform"].trim().to_string();
        if configuration.is_empty() {
            warn!(
                "skipping PropertyGroup without configuration name ({}) in {}",
                condition.trim(),
                path.display()
            );
            continue;
        }

        let output_dir = child_text(group, "OutputPath")
            .map(|output| project_dir.join(fix_windows_path(output).trim_end_matches('/')))
            .unwrap_or_else(|| project_dir.to_path_buf());
        let mtouch_archs = child_text(group, "MtouchArch")
            .map(|archs| split_and_strip_list(archs, ","))
            .unwrap_or_default();
        let is_true =
            |tag: &str| child_text(group, tag).is_some_and(|value| value.eq_ignore_ascii_case("true"));

        let key = to_config_key(&configuration, &platform);
        configs.insert(
            key,
            ConfigurationPlatform {
                build_ipa: is_true("BuildIpa"),
                sign_android: is_true("AndroidKeyStore"),
                configuration,
                platform,
                output_dir,
                mtouch_archs,
            },
        );
    }

    Ok(configs)
}

fn referred_project_ids(doc: &Document) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for reference in doc
        .descendants()
        .filter(|node| node.has_tag_name("ProjectReference"))
    {
        let Some(id) = child_text(reference, "Project").map(normalize_guid) else {
            continue;
        };
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn test_frameworks(doc: &Document) -> BTreeSet<TestFramework> {
    doc.descendants()
        .filter(|node| node.has_tag_name("Reference"))
        .filter_map(|node| node.attribute("Include"))
        .filter_map(|include| {
            let assembly = include.split(',').next().unwrap_or_default().trim();
            TestFramework::from_assembly_name(assembly)
        })
        .collect()
}
