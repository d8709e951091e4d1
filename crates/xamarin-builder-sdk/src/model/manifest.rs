//! Android manifest parsing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::BuilderError;

/// The parts of `AndroidManifest.xml` the builder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidManifest {
    pub path: PathBuf,
    /// Application id from the `package` attribute of `<manifest>`.
    pub package_name: String,
}

impl AndroidManifest {
    /// Reads and parses the manifest at `path`.
    ///
    /// Fails with [`BuilderError::Parse`] when the file is not well-formed XML,
    /// the root is not `<manifest>`, or it carries no `package` attribute.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self, BuilderError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse_str(path, &content)
    }

    pub(crate) fn parse_str(path: &Path, content: &str) -> Result<Self, BuilderError> {
        let doc = roxmltree::Document::parse(content.trim_start_matches('\u{feff}'))
            .map_err(|e| BuilderError::parse(path, format!("invalid manifest XML: {}", e)))?;

        let root = doc.root_element();
        if !root.has_tag_name("manifest") {
            return Err(BuilderError::parse(
                path,
                format!(
                    "expected <manifest> root element, found <{}>",
                    root.tag_name().name()
                ),
            ));
        }

        let package_name = root
            .attribute("package")
            .map(str::trim)
            .filter(|package| !package.is_empty())
            .ok_or_else(|| BuilderError::parse(path, "<manifest> has no package attribute"))?;

        Ok(Self {
            path: path.to_path_buf(),
            package_name: package_name.to_string(),
        })
    }
}
