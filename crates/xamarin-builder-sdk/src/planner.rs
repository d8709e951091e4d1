//! Build planning and orchestration.
//!
//! [`plan_commands`] decides which toolchain invocations one project needs.
//! [`Builder`] ties everything together: it parses the solution, resolves the
//! buildable projects, runs the planned commands one after the other
//! (skipping commands already run in this build) and finally locates the
//! produced artifacts.
//!
//! Progress is reported as [`BuildEvent`] values pushed onto an optional
//! channel supplied by the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builders::{BuildCommand, Toolchain};
use crate::export;
use crate::model::{ConfigurationPlatform, Project, Solution};
use crate::resolver::{
    BuildableProject, buildable_projects, denotes_any_cpu, filter_by_type,
    is_architecture_archivable,
};
use crate::types::{BuildWindow, BuilderError, OutputType, ProjectType};

/// Plans the commands building `project` for the requested solution config.
///
/// `configuration`/`platform` are the solution level pair, `config` the
/// project config it maps to. Solution-scope xbuild commands use the former,
/// project-scope commands the latter.
pub fn plan_commands(
    solution_path: &Path,
    project: &Project,
    configuration: &str,
    platform: &str,
    config: &ConfigurationPlatform,
    force_native_tool: bool,
    toolchain: &Toolchain,
) -> (Vec<BuildCommand>, Vec<String>) {
    let mut commands: Vec<BuildCommand> = Vec::new();
    let mut warnings = Vec::new();

    let native = |target: &str| {
        toolchain
            .mdtool(solution_path)
            .target(target)
            .configuration(&config.configuration)
            .platform(&config.platform)
            .project_name(&project.name)
    };
    let solution_build = || {
        toolchain
            .xbuild(solution_path)
            .target("Build")
            .configuration(configuration)
            .platform(platform)
    };

    match project.project_type {
        ProjectType::Ios | ProjectType::TvOs => {
            let archivable = is_architecture_archivable(&config.mtouch_archs);
            if force_native_tool {
                commands.push(native("build").into());
                if archivable {
                    commands.push(native("archive").into());
                }
            } else if config.build_ipa {
                commands.push(solution_build().build_ipa(true).into());
            } else {
                commands.push(solution_build().archive_on_build(archivable).into());
            }
        }
        ProjectType::MacOs => {
            if force_native_tool {
                commands.push(native("build").into());
                commands.push(native("archive").into());
            } else {
                commands.push(solution_build().archive_on_build(true).into());
            }
        }
        ProjectType::Android => {
            let target = if config.sign_android {
                "SignAndroidPackage"
            } else {
                "PackageForAndroid"
            };
            let mut command = toolchain
                .xbuild(&project.path)
                .target(target)
                .configuration(&config.configuration);
            if !denotes_any_cpu(&config.platform) {
                command = command.platform(&config.platform);
            }
            commands.push(command.into());
        }
        ProjectType::Unknown => {
            warnings.push(format!(
                "project ({}) has no supported project type, no build command planned",
                project.name
            ));
        }
    }

    for command in &commands {
        debug!("planned for {}: {}", project.name, command.printable_command());
    }
    (commands, warnings)
}

/// Progress notification of a [`Builder`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A command is about to run, or was skipped because an identical
    /// command already ran in this build.
    Command {
        project: String,
        command: String,
        already_performed: bool,
    },
    /// A project output directory was removed.
    Clean { project: String, dir: PathBuf },
}

/// Result of [`Builder::build_all_projects`].
///
/// Warnings collected before a failure are kept.
#[derive(Debug)]
pub struct BuildOutcome {
    pub warnings: Vec<String>,
    /// The wall-clock window of the build on success.
    pub result: Result<BuildWindow, BuilderError>,
}

/// One located artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    pub kind: OutputType,
    pub path: PathBuf,
}

/// Artifacts of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectOutput {
    pub project_type: ProjectType,
    pub outputs: Vec<Output>,
}

impl ProjectOutput {
    pub fn get(&self, kind: OutputType) -> Option<&Path> {
        self.outputs
            .iter()
            .find(|output| output.kind == kind)
            .map(|output| output.path.as_path())
    }
}

/// Artifacts keyed by project name.
pub type ProjectOutputMap = BTreeMap<String, ProjectOutput>;

/// Orchestrates builds of one solution.
///
/// # Example
///
/// ```ignore
/// use std::sync::mpsc;
/// use xamarin_builder_sdk::{Builder, BuildEvent, ProjectType};
///
/// let builder = Builder::new("App.sln", vec![ProjectType::Ios], false)?;
/// let (tx, rx) = mpsc::channel();
/// let outcome = builder.build_all_projects("Release", "iPhone", Some(&tx));
/// drop(tx);
/// for event in rx {
///     if let BuildEvent::Command { command, .. } = event {
///         println!("$ {}", command);
///     }
/// }
/// let window = outcome.result?;
/// let (outputs, _warnings) = builder.collect_outputs("Release", "iPhone", window)?;
/// # Ok::<(), xamarin_builder_sdk::BuilderError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    solution: Solution,
    project_types: Vec<ProjectType>,
    force_native_tool: bool,
    toolchain: Toolchain,
    custom_options: Vec<String>,
}

impl Builder {
    /// Parses the solution at `solution_path`.
    ///
    /// `project_types` restricts the build to the given types; empty allows all.
    pub fn new(
        solution_path: impl AsRef<Path>,
        project_types: Vec<ProjectType>,
        force_native_tool: bool,
    ) -> Result<Self, BuilderError> {
        Ok(Self {
            solution: Solution::parse(solution_path)?,
            project_types,
            force_native_tool,
            toolchain: Toolchain::default(),
            custom_options: Vec::new(),
        })
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Options appended to every command before it runs.
    pub fn with_custom_options(mut self, options: Vec<String>) -> Self {
        self.custom_options = options;
        self
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn project_types(&self) -> &[ProjectType] {
        &self.project_types
    }

    fn buildable(
        &self,
        configuration: &str,
        platform: &str,
    ) -> Result<(Vec<BuildableProject<'_>>, Vec<String>), BuilderError> {
        buildable_projects(&self.solution, configuration, platform, &self.project_types)
    }

    /// Plans every buildable project, pairing each command with its project name.
    pub fn plan(
        &self,
        configuration: &str,
        platform: &str,
    ) -> Result<(Vec<(String, BuildCommand)>, Vec<String>), BuilderError> {
        let (buildable, mut warnings) = self.buildable(configuration, platform)?;
        let mut planned = Vec::new();

        for BuildableProject { project, config } in buildable {
            let (commands, project_warnings) = plan_commands(
                &self.solution.path,
                project,
                configuration,
                platform,
                config,
                self.force_native_tool,
                &self.toolchain,
            );
            warnings.extend(project_warnings);
            for mut command in commands {
                command.append_options(self.custom_options.iter().cloned());
                planned.push((project.name.clone(), command));
            }
        }

        Ok((planned, warnings))
    }

    /// Builds every buildable project sequentially.
    ///
    /// A command whose printable form equals one already run in this build
    /// is reported with `already_performed: true` and not run again. The
    /// first failing command stops the build.
    pub fn build_all_projects(
        &self,
        configuration: &str,
        platform: &str,
        events: Option<&Sender<BuildEvent>>,
    ) -> BuildOutcome {
        let start = SystemTime::now();
        let (planned, warnings) = match self.plan(configuration, platform) {
            Ok(plan) => plan,
            Err(err) => {
                return BuildOutcome {
                    warnings: Vec::new(),
                    result: Err(err),
                };
            }
        };

        let mut performed: Vec<String> = Vec::new();
        for (project, command) in planned {
            let printable = command.printable_command();
            let already_performed = performed.contains(&printable);
            emit(
                events,
                BuildEvent::Command {
                    project: project.clone(),
                    command: printable.clone(),
                    already_performed,
                },
            );

            if already_performed {
                debug!("{} already performed, skipping", printable);
                continue;
            }

            info!("building {} with {}", project, command.tool_name());
            if let Err(err) = command.run() {
                return BuildOutcome {
                    warnings,
                    result: Err(err),
                };
            }
            performed.push(printable);
        }

        BuildOutcome {
            warnings,
            result: Ok(BuildWindow::new(start, SystemTime::now())),
        }
    }

    /// Removes the `bin` and `obj` directories next to each allowed project.
    ///
    /// Returns the removed directories.
    pub fn clean_all(
        &self,
        events: Option<&Sender<BuildEvent>>,
    ) -> Result<Vec<PathBuf>, BuilderError> {
        let mut removed = Vec::new();

        for project in filter_by_type(self.solution.projects(), &self.project_types) {
            for name in ["bin", "obj"] {
                let dir = project.dir().join(name);
                if !dir.is_dir() {
                    continue;
                }
                info!("removing {}", dir.display());
                fs::remove_dir_all(&dir)?;
                emit(
                    events,
                    BuildEvent::Clean {
                        project: project.name.clone(),
                        dir: dir.clone(),
                    },
                );
                removed.push(dir);
            }
        }

        Ok(removed)
    }

    /// Locates the artifacts of every buildable project.
    ///
    /// Export failures, such as a missing `HOME` for Xcode archives, only
    /// become warnings for the affected artifact.
    pub fn collect_outputs(
        &self,
        configuration: &str,
        platform: &str,
        window: BuildWindow,
    ) -> Result<(ProjectOutputMap, Vec<String>), BuilderError> {
        let (buildable, mut warnings) = self.buildable(configuration, platform)?;
        let mut output_map = ProjectOutputMap::new();

        for BuildableProject { project, config } in buildable {
            let mut collector = Collector {
                project,
                outputs: Vec::new(),
                warnings: &mut warnings,
            };
            let dir = config.output_dir.as_path();
            let name = project.assembly_name.as_str();

            match project.project_type {
                ProjectType::Ios | ProjectType::TvOs => {
                    let archivable = is_architecture_archivable(&config.mtouch_archs);
                    if self.force_native_tool {
                        // mdtool only produces an IPA as part of an archive.
                        if archivable {
                            collector.add(OutputType::XcArchive, || {
                                export::export_latest_xcarchive_from_xcode_archives(name, window)
                            });
                            if config.build_ipa {
                                collector.add(OutputType::Ipa, || export::export_ipa(dir, name, window));
                            }
                        }
                    } else if config.build_ipa {
                        collector.add(OutputType::Ipa, || export::export_ipa(dir, name, window));
                    } else if archivable {
                        collector.add(OutputType::XcArchive, || {
                            export::export_latest_xcarchive_from_xcode_archives(name, window)
                        });
                    }
                    collector.add(OutputType::AppDsym, || {
                        export::export_app_dsym(dir, name, window)
                    });
                    collector.add_all(OutputType::FrameworkDsym, || {
                        export::export_framework_dsyms(dir, window)
                    });
                }
                ProjectType::MacOs => {
                    collector.add(OutputType::XcArchive, || {
                        export::export_latest_xcarchive_from_xcode_archives(name, window)
                    });
                    collector.add(OutputType::App, || export::export_app(dir, name, window));
                    collector.add(OutputType::Pkg, || export::export_pkg(dir, name, window));
                }
                ProjectType::Android => {
                    let package = project.package_name.as_deref().unwrap_or(name);
                    collector.add(OutputType::Apk, || export::export_apk(dir, package, window));
                }
                ProjectType::Unknown => continue,
            }

            let outputs = collector.outputs;
            if outputs.is_empty() {
                let warning = format!("no output found for project ({})", project.name);
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }
            output_map.insert(
                project.name.clone(),
                ProjectOutput {
                    project_type: project.project_type,
                    outputs,
                },
            );
        }

        Ok((output_map, warnings))
    }
}

struct Collector<'a> {
    project: &'a Project,
    outputs: Vec<Output>,
    warnings: &'a mut Vec<String>,
}

impl Collector<'_> {
    fn add(
        &mut self,
        kind: OutputType,
        export: impl FnOnce() -> Result<Option<PathBuf>, BuilderError>,
    ) {
        match export() {
            Ok(Some(path)) => self.outputs.push(Output { kind, path }),
            Ok(None) => debug!("no {} found for {}", kind, self.project.name),
            Err(err) => self.warn_failed(kind, err),
        }
    }

    fn add_all(
        &mut self,
        kind: OutputType,
        export: impl FnOnce() -> Result<Vec<PathBuf>, BuilderError>,
    ) {
        match export() {
            Ok(paths) => self
                .outputs
                .extend(paths.into_iter().map(|path| Output { kind, path })),
            Err(err) => self.warn_failed(kind, err),
        }
    }

    fn warn_failed(&mut self, kind: OutputType, err: BuilderError) {
        let warning = format!(
            "failed to export {} of project ({}): {}",
            kind, self.project.name, err
        );
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

fn emit(events: Option<&Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(events) = events {
        // A dropped receiver only means nobody is listening.
        let _ = events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::fixtures::{ANDROID_PROJECT, IOS_PROJECT, MANIFEST};
    use crate::runner::DiagnosticOptions;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    const SOLUTION: &str = r#"
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App.iOS", "App.iOS\App.iOS.csproj", "{90F3C584-FD69-4926-9903-6B9771847782}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App.Droid", "App.Droid\App.Droid.csproj", "{9D1D32A3-D13F-4F23-B7D4-EF9D52B06E60}"
EndProject
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		Release|iPhone = Release|iPhone
		Debug|iPhoneSimulator = Debug|iPhoneSimulator
		Release|Any CPU = Release|Any CPU
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{90F3C584-FD69-4926-9903-6B9771847782}.Release|iPhone.ActiveCfg = Release|iPhone
		{90F3C584-FD69-4926-9903-6B9771847782}.Debug|iPhoneSimulator.ActiveCfg = Debug|iPhoneSimulator
		{9D1D32A3-D13F-4F23-B7D4-EF9D52B06E60}.Release|iPhone.ActiveCfg = Release|AnyCPU
		{9D1D32A3-D13F-4F23-B7D4-EF9D52B06E60}.Release|Any CPU.ActiveCfg = Release|AnyCPU
	EndGlobalSection
EndGlobal
"#;

    fn fixture(dir: &Path) -> PathBuf {
        for (relative, content) in [
            ("App.iOS/App.iOS.csproj", IOS_PROJECT),
            ("App.Droid/App.Droid.csproj", ANDROID_PROJECT),
            ("App.Droid/Properties/AndroidManifest.xml", MANIFEST),
        ] {
            let path = dir.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let sln = dir.join("App.sln");
        fs::write(&sln, SOLUTION).unwrap();
        sln
    }

    /// A toolchain whose tools are `true`, so every command succeeds instantly.
    fn noop_toolchain() -> Toolchain {
        let quick = DiagnosticOptions {
            hang_timeout: Duration::from_secs(30),
            ..DiagnosticOptions::xbuild()
        };
        Toolchain {
            mdtool_path: PathBuf::from("true"),
            xbuild_path: PathBuf::from("true"),
            mdtool_diagnostics: quick.clone(),
            xbuild_diagnostics: quick,
        }
    }

    fn printable(commands: &[(String, BuildCommand)]) -> Vec<String> {
        commands.iter().map(|(_, c)| c.printable_command()).collect()
    }

    fn project<'a>(solution: &'a Solution, name: &str) -> &'a Project {
        solution.projects().find(|p| p.name == name).unwrap()
    }

    #[test]
    fn test_ios_generic_tool_builds_ipa() {
        let temp_dir = TempDir::new().unwrap();
        let solution = Solution::parse(fixture(temp_dir.path())).unwrap();
        let ios = project(&solution, "App.iOS");
        let config = &ios.configs["Release|iPhone"];

        let (commands, warnings) = plan_commands(
            &solution.path,
            ios,
            "Release",
            "iPhone",
            config,
            false,
            &Toolchain::default(),
        );
        assert!(warnings.is_empty());
        assert_eq!(commands.len(), 1);
        let args = commands[0].args();
        assert!(args.contains(&"/p:BuildIpa=true".to_string()));
        assert!(!args.contains(&"/p:ArchiveOnBuild=true".to_string()));
        assert!(args.contains(&"/p:Platform=iPhone".to_string()));
    }

    #[test]
    fn test_ios_generic_tool_archives_when_no_ipa() {
        let temp_dir = TempDir::new().unwrap();
        let solution = Solution::parse(fixture(temp_dir.path())).unwrap();
        let ios = project(&solution, "App.iOS");

        let mut config = ios.configs["Release|iPhone"].clone();
        config.build_ipa = false;
        let (commands, _) = plan_commands(
            &solution.path,
            ios,
            "Release",
            "iPhone",
            &config,
            false,
            &Toolchain::default(),
        );
        let args = commands[0].args();
        assert!(args.contains(&"/p:ArchiveOnBuild=true".to_string()));
        assert!(!args.contains(&"/p:BuildIpa=true".to_string()));

        let simulator = &ios.configs["Debug|iPhoneSimulator"];
        let (commands, _) = plan_commands(
            &solution.path,
            ios,
            "Debug",
            "iPhoneSimulator",
            simulator,
            false,
            &Toolchain::default(),
        );
        let args = commands[0].args();
        assert!(!args.contains(&"/p:ArchiveOnBuild=true".to_string()));
    }

    #[test]
    fn test_ios_native_tool_builds_and_archives() {
        let temp_dir = TempDir::new().unwrap();
        let solution = Solution::parse(fixture(temp_dir.path())).unwrap();
        let ios = project(&solution, "App.iOS");

        let (commands, _) = plan_commands(
            &solution.path,
            ios,
            "Release",
            "iPhone",
            &ios.configs["Release|iPhone"],
            true,
            &Toolchain::default(),
        );
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], BuildCommand::NativeTool(_)));
        assert_eq!(commands[0].args()[1], "build");
        assert_eq!(commands[1].args()[1], "archive");
        assert!(commands[1].args().contains(&"-p:App.iOS".to_string()));

        let (commands, _) = plan_commands(
            &solution.path,
            ios,
            "Debug",
            "iPhoneSimulator",
            &ios.configs["Debug|iPhoneSimulator"],
            true,
            &Toolchain::default(),
        );
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_macos_archives_unconditionally() {
        let temp_dir = TempDir::new().unwrap();
        let solution = Solution::parse(fixture(temp_dir.path())).unwrap();
        let mut mac = project(&solution, "App.iOS").clone();
        mac.project_type = ProjectType::MacOs;
        let config = ConfigurationPlatform {
            mtouch_archs: vec!["x86_64".to_string()],
            ..mac.configs["Debug|iPhoneSimulator"].clone()
        };

        let (commands, _) = plan_commands(
            &solution.path,
            &mac,
            "Debug",
            "iPhoneSimulator",
            &config,
            true,
            &Toolchain::default(),
        );
        assert_eq!(commands.len(), 2);

        let (commands, _) = plan_commands(
            &solution.path,
            &mac,
            "Debug",
            "iPhoneSimulator",
            &config,
            false,
            &Toolchain::default(),
        );
        assert!(commands[0].args().contains(&"/p:ArchiveOnBuild=true".to_string()));
    }

    #[test]
    fn test_android_builds_project_file_without_any_cpu_platform() {
        let temp_dir = TempDir::new().unwrap();
        let solution = Solution::parse(fixture(temp_dir.path())).unwrap();
        let droid = project(&solution, "App.Droid");

        let (commands, _) = plan_commands(
            &solution.path,
            droid,
            "Release",
            "Any CPU",
            &droid.configs["Release|AnyCPU"],
            true,
            &Toolchain::default(),
        );
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], BuildCommand::GenericTool(_)));
        let args = commands[0].args();
        assert_eq!(args[1], droid.path.to_string_lossy());
        assert_eq!(args[2], "/target:SignAndroidPackage");
        assert!(!args.iter().any(|arg| arg.starts_with("/p:Platform")));
        assert!(!args.iter().any(|arg| arg.starts_with("/p:SolutionDir")));

        let (commands, _) = plan_commands(
            &solution.path,
            droid,
            "Debug",
            "Any CPU",
            &droid.configs["Debug|AnyCPU"],
            false,
            &Toolchain::default(),
        );
        assert_eq!(commands[0].args()[2], "/target:PackageForAndroid");
    }

    #[test]
    fn test_unknown_projects_get_no_commands() {
        let temp_dir = TempDir::new().unwrap();
        let solution = Solution::parse(fixture(temp_dir.path())).unwrap();
        let mut unknown = project(&solution, "App.iOS").clone();
        unknown.project_type = ProjectType::Unknown;

        let (commands, warnings) = plan_commands(
            &solution.path,
            &unknown,
            "Release",
            "iPhone",
            &unknown.configs["Release|iPhone"],
            false,
            &Toolchain::default(),
        );
        assert!(commands.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_plan_appends_custom_options() {
        let temp_dir = TempDir::new().unwrap();
        let builder = Builder::new(fixture(temp_dir.path()), vec![], false)
            .unwrap()
            .with_custom_options(vec!["/nologo".to_string()]);

        let (planned, _) = builder.plan("Release", "iPhone").unwrap();
        assert_eq!(planned.len(), 2);
        for command in printable(&planned) {
            assert!(command.ends_with(r#""/nologo""#));
        }
    }

    #[test]
    fn test_build_all_projects_deduplicates_commands() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let sln = fixture(dir);
        let ios_twin = IOS_PROJECT
            .replace("90F3C584-FD69-4926-9903-6B9771847782", "11111111-FD69-4926-9903-6B9771847782");
        fs::create_dir_all(dir.join("App.iOS2")).unwrap();
        fs::write(dir.join("App.iOS2/App.iOS2.csproj"), ios_twin).unwrap();
        let solution = SOLUTION
            .replacen(
                "\nGlobal\n",
                "\nProject(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"App.iOS2\", \"App.iOS2\\App.iOS2.csproj\", \"{11111111-FD69-4926-9903-6B9771847782}\"\nEndProject\nGlobal\n",
                1,
            )
            .replacen(
                "GlobalSection(ProjectConfigurationPlatforms) = postSolution\n",
                "GlobalSection(ProjectConfigurationPlatforms) = postSolution\n{11111111-FD69-4926-9903-6B9771847782}.Release|iPhone.ActiveCfg = Release|iPhone\n",
                1,
            );
        fs::write(&sln, solution).unwrap();

        let builder = Builder::new(&sln, vec![ProjectType::Ios], false)
            .unwrap()
            .with_toolchain(noop_toolchain());
        let (tx, rx) = mpsc::channel();
        let outcome = builder.build_all_projects("Release", "iPhone", Some(&tx));
        drop(tx);

        let window = outcome.result.unwrap();
        assert!(window.start <= window.end);

        let events: Vec<_> = rx.into_iter().collect();
        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (
                BuildEvent::Command {
                    project: first,
                    command: first_command,
                    already_performed: false,
                },
                BuildEvent::Command {
                    project: second,
                    command: second_command,
                    already_performed: true,
                },
            ) => {
                assert_eq!(first, "App.iOS");
                assert_eq!(second, "App.iOS2");
                assert_eq!(first_command, second_command);
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn test_build_stops_on_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let toolchain = Toolchain {
            xbuild_path: PathBuf::from("false"),
            ..noop_toolchain()
        };
        let builder = Builder::new(fixture(temp_dir.path()), vec![], false)
            .unwrap()
            .with_toolchain(toolchain);
        let (tx, rx) = mpsc::channel();

        let outcome = builder.build_all_projects("Release", "iPhone", Some(&tx));
        drop(tx);

        assert!(matches!(
            outcome.result,
            Err(BuilderError::CommandFailed { .. })
        ));
        assert_eq!(rx.into_iter().count(), 1);
    }

    #[test]
    fn test_build_with_unknown_config_fails_before_running() {
        let temp_dir = TempDir::new().unwrap();
        let builder = Builder::new(fixture(temp_dir.path()), vec![], false).unwrap();
        let outcome = builder.build_all_projects("Debug", "iPhone", None);
        assert!(matches!(
            outcome.result,
            Err(BuilderError::UnknownConfig { .. })
        ));
    }

    #[test]
    fn test_clean_all_removes_bin_and_obj() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let sln = fixture(dir);
        for sub in ["App.iOS/bin/iPhone", "App.iOS/obj", "App.Droid/bin"] {
            fs::create_dir_all(dir.join(sub)).unwrap();
        }

        let builder = Builder::new(&sln, vec![ProjectType::Ios], false).unwrap();
        let (tx, rx) = mpsc::channel();
        let removed = builder.clean_all(Some(&tx)).unwrap();
        drop(tx);

        assert_eq!(removed, vec![dir.join("App.iOS/bin"), dir.join("App.iOS/obj")]);
        assert!(dir.join("App.Droid/bin").exists());
        assert_eq!(rx.into_iter().count(), 2);
    }

    #[test]
    fn test_collect_outputs_for_android_uses_package_name() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let sln = fixture(dir);
        let release = dir.join("App.Droid/bin/Release");
        fs::create_dir_all(&release).unwrap();
        fs::write(release.join("hu.bitrise.test.apk"), b"").unwrap();
        fs::write(release.join("hu.bitrise.test-Signed.apk"), b"").unwrap();

        let builder = Builder::new(&sln, vec![ProjectType::Android], false).unwrap();
        let (outputs, warnings) = builder
            .collect_outputs("Release", "Any CPU", BuildWindow::unbounded())
            .unwrap();

        assert!(warnings.is_empty(), "{:?}", warnings);
        let droid = &outputs["App.Droid"];
        assert_eq!(droid.project_type, ProjectType::Android);
        assert_eq!(
            droid.get(OutputType::Apk),
            Some(release.join("hu.bitrise.test-Signed.apk").as_path())
        );
    }

    #[test]
    fn test_collect_outputs_for_ios_ipa_and_dsym() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let sln = fixture(dir);
        let release = dir.join("App.iOS/bin/iPhone/Release");
        fs::create_dir_all(release.join("CreditCardValidator.iOS.app.dSYM")).unwrap();
        fs::create_dir_all(release.join("TTTAttributedLabel.framework.dSYM")).unwrap();
        fs::create_dir_all(release.join("CreditCardValidator.iOS 2016-10-18")).unwrap();
        fs::write(
            release.join("CreditCardValidator.iOS 2016-10-18/CreditCardValidator.iOS.ipa"),
            b"",
        )
        .unwrap();

        let builder = Builder::new(&sln, vec![ProjectType::Ios], false).unwrap();
        let (outputs, _) = builder
            .collect_outputs("Release", "iPhone", BuildWindow::unbounded())
            .unwrap();

        let ios = &outputs["App.iOS"];
        assert!(ios.get(OutputType::Ipa).is_some());
        assert!(ios.get(OutputType::AppDsym).is_some());
        assert!(ios.get(OutputType::XcArchive).is_none());
        assert_eq!(
            ios.get(OutputType::FrameworkDsym),
            Some(release.join("TTTAttributedLabel.framework.dSYM").as_path())
        );
    }

    #[test]
    fn test_collect_outputs_native_tool_skips_ipa_of_simulator_build() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let sln = fixture(dir);
        let simulator_release = IOS_PROJECT.replacen(
            "<MtouchArch>ARMv7, ARM64</MtouchArch>\n    <BuildIpa>true</BuildIpa>",
            "<MtouchArch>i386</MtouchArch>\n    <BuildIpa>true</BuildIpa>",
            1,
        );
        assert_ne!(simulator_release, IOS_PROJECT);
        fs::write(dir.join("App.iOS/App.iOS.csproj"), simulator_release).unwrap();
        let release = dir.join("App.iOS/bin/iPhone/Release");
        fs::create_dir_all(release.join("CreditCardValidator.iOS.app.dSYM")).unwrap();
        fs::write(release.join("CreditCardValidator.iOS.ipa"), b"").unwrap();

        let builder = Builder::new(&sln, vec![ProjectType::Ios], true).unwrap();
        let (outputs, warnings) = builder
            .collect_outputs("Release", "iPhone", BuildWindow::unbounded())
            .unwrap();

        assert!(warnings.is_empty(), "{:?}", warnings);
        let ios = &outputs["App.iOS"];
        assert!(ios.get(OutputType::Ipa).is_none());
        assert!(ios.get(OutputType::XcArchive).is_none());
        assert!(ios.get(OutputType::AppDsym).is_some());
    }

    #[test]
    fn test_collect_outputs_warns_when_nothing_found() {
        let temp_dir = TempDir::new().unwrap();
        let builder = Builder::new(fixture(temp_dir.path()), vec![ProjectType::Android], false)
            .unwrap();
        let (outputs, warnings) = builder
            .collect_outputs("Release", "Any CPU", BuildWindow::unbounded())
            .unwrap();

        assert!(outputs.is_empty());
        assert!(warnings[0].contains("App.Droid"));
    }
}
