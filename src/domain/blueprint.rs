//! Blueprints: the manifest of files a generation run materializes.
//!
//! A blueprint maps each section (`frontend`, `backend`, `database`, `root`)
//! to an optional framework label and an ordered list of `path → purpose`
//! entries. File order inside a section is the manifest's own order and is
//! preserved through (de)serialization.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::log::LogStep;

/// Framework label used when a section does not name one
pub const UNKNOWN_FRAMEWORK: &str = "Unknown";

/// The four blueprint sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Frontend,
    Backend,
    Database,
    Root,
}

impl SectionName {
    /// Fixed processing order of a run
    pub const ORDER: [SectionName; 4] = [
        SectionName::Frontend,
        SectionName::Backend,
        SectionName::Database,
        SectionName::Root,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Database => "database",
            Self::Root => "root",
        }
    }

    /// Output subdirectory below the project root (`root` writes to the root itself)
    pub fn subdir(self) -> Option<&'static str> {
        match self {
            Self::Root => None,
            other => Some(other.as_str()),
        }
    }

    /// Human-readable progress phase shown while this section is generated
    pub fn phase_label(self) -> &'static str {
        match self {
            Self::Frontend => "Generating frontend code",
            Self::Backend => "Generating backend code",
            Self::Database => "Generating database schema",
            Self::Root => "Generating project documentation",
        }
    }

    /// Audit log step tag for entries of this section
    pub fn log_step(self) -> LogStep {
        match self {
            Self::Frontend => LogStep::Frontend,
            Self::Backend => LogStep::Backend,
            Self::Database => LogStep::Database,
            Self::Root => LogStep::Root,
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `path → purpose` entry of a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the section's output directory
    pub path: String,

    /// What the file is for
    pub purpose: String,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purpose: purpose.into(),
        }
    }
}

/// A blueprint section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Framework label (e.g. "React"), if the section has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// Files in manifest order
    #[serde(default, with = "ordered_files")]
    pub files: Vec<FileEntry>,
}

impl Section {
    pub fn new(framework: Option<&str>, files: &[(&str, &str)]) -> Self {
        Self {
            framework: framework.map(str::to_string),
            files: files.iter().map(|(p, d)| FileEntry::new(*p, *d)).collect(),
        }
    }

    /// Framework label, defaulting to [`UNKNOWN_FRAMEWORK`]
    pub fn framework_or_unknown(&self) -> &str {
        self.framework.as_deref().unwrap_or(UNKNOWN_FRAMEWORK)
    }
}

/// A complete manifest for one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<Section>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Section>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Section>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Section>,
}

impl Blueprint {
    /// Parse the JSON exchanged with blueprint providers
    pub fn from_json(content: &str) -> Result<Self, BlueprintError> {
        let blueprint: Blueprint = serde_json::from_str(content)?;
        Ok(blueprint)
    }

    /// Look up a section by name
    pub fn section(&self, name: SectionName) -> Option<&Section> {
        match name {
            SectionName::Frontend => self.frontend.as_ref(),
            SectionName::Backend => self.backend.as_ref(),
            SectionName::Database => self.database.as_ref(),
            SectionName::Root => self.root.as_ref(),
        }
    }

    /// Present sections in processing order
    pub fn sections(&self) -> impl Iterator<Item = (SectionName, &Section)> {
        SectionName::ORDER
            .into_iter()
            .filter_map(move |name| self.section(name).map(|s| (name, s)))
    }

    /// Sum of file counts across all sections
    pub fn total_files(&self) -> usize {
        self.sections().map(|(_, s)| s.files.len()).sum()
    }

    /// Deterministic minimal blueprint used when a provider response is unusable
    pub fn fallback(tech_stack: &str) -> Self {
        let frontend_framework = if tech_stack.contains("React") {
            "React"
        } else {
            UNKNOWN_FRAMEWORK
        };
        let backend_framework = if tech_stack.contains("FastAPI") {
            "FastAPI"
        } else {
            UNKNOWN_FRAMEWORK
        };

        Self {
            frontend: Some(Section::new(
                Some(frontend_framework),
                &[
                    ("src/App.tsx", "Main application component"),
                    ("src/index.tsx", "Application entry point"),
                    ("package.json", "Dependencies and scripts"),
                    ("README.md", "Frontend setup instructions"),
                ],
            )),
            backend: Some(Section::new(
                Some(backend_framework),
                &[
                    ("main.py", "Application entry point"),
                    ("requirements.txt", "Python dependencies"),
                    ("README.md", "Backend setup instructions"),
                ],
            )),
            database: Some(Section::new(
                None,
                &[("schema.sql", "Database schema definition")],
            )),
            root: Some(Section::new(
                None,
                &[
                    ("README.md", "Project documentation"),
                    (".gitignore", "Git ignore patterns"),
                ],
            )),
        }
    }
}

/// Why a provider response could not be used as a blueprint
#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("Blueprint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Blueprint lists no files")]
    Empty,

    #[error("Blueprint path '{path}' in section {section} is unsafe: {reason}")]
    UnsafePath {
        section: SectionName,
        path: String,
        reason: String,
    },
}

/// Order-preserving (de)serialization of `{"path": "purpose"}` objects.
///
/// Duplicate keys keep their first position and their last purpose.
mod ordered_files {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::FileEntry;

    pub fn serialize<S>(files: &[FileEntry], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(files.len()))?;
        for file in files {
            map.serialize_entry(&file.path, &file.purpose)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<FileEntry>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(FilesVisitor)
    }

    struct FilesVisitor;

    impl<'de> Visitor<'de> for FilesVisitor {
        type Value = Vec<FileEntry>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of relative paths to purpose descriptions")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut files: Vec<FileEntry> = Vec::with_capacity(access.size_hint().unwrap_or(0));

            while let Some((path, purpose)) = access.next_entry::<String, String>()? {
                match files.iter_mut().find(|f| f.path == path) {
                    Some(existing) => existing.purpose = purpose,
                    None => files.push(FileEntry { path, purpose }),
                }
            }

            Ok(files)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUEPRINT_JSON: &str = r#"{
        "frontend": {"framework": "React", "files": {
            "src/main.tsx": "Entry point",
            "src/App.tsx": "Root component",
            "package.json": "Dependencies"
        }},
        "backend": {"framework": "FastAPI", "files": {"app/main.py": "API server"}},
        "database": {"files": {"schema.sql": "Tables"}},
        "root": {"files": {"README.md": "Docs"}}
    }"#;

    #[test]
    fn test_parse_preserves_manifest_order() {
        let blueprint = Blueprint::from_json(BLUEPRINT_JSON).unwrap();
        let frontend = blueprint.frontend.as_ref().unwrap();

        let paths: Vec<&str> = frontend.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.tsx", "src/App.tsx", "package.json"]);
        assert_eq!(frontend.framework.as_deref(), Some("React"));
        assert_eq!(blueprint.total_files(), 6);
    }

    #[test]
    fn test_sections_follow_fixed_order() {
        let json = r#"{"root": {"files": {"README.md": "Docs"}},
                       "frontend": {"files": {"index.html": "Page"}}}"#;
        let blueprint = Blueprint::from_json(json).unwrap();

        let names: Vec<SectionName> = blueprint.sections().map(|(n, _)| n).collect();
        assert_eq!(names, vec![SectionName::Frontend, SectionName::Root]);
        assert_eq!(blueprint.section(SectionName::Root).unwrap().framework_or_unknown(), "Unknown");
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let json = r#"{"root": {"files": {"a.txt": "first", "b.txt": "b", "a.txt": "second"}}}"#;
        let blueprint = Blueprint::from_json(json).unwrap();
        let root = blueprint.root.unwrap();

        assert_eq!(root.files.len(), 2);
        assert_eq!(root.files[0], FileEntry::new("a.txt", "second"));
    }

    #[test]
    fn test_non_string_purpose_is_rejected() {
        let json = r#"{"root": {"files": {"a.txt": {"nested": true}}}}"#;
        assert!(matches!(
            Blueprint::from_json(json),
            Err(BlueprintError::Json(_))
        ));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let react = Blueprint::fallback("React + FastAPI");
        assert_eq!(react, Blueprint::fallback("React + FastAPI"));
        assert_eq!(react.total_files(), 10);
        assert_eq!(react.frontend.as_ref().unwrap().framework.as_deref(), Some("React"));
        assert_eq!(react.backend.as_ref().unwrap().framework.as_deref(), Some("FastAPI"));

        let other = Blueprint::fallback("Vue + Go");
        assert_eq!(other.frontend.unwrap().framework_or_unknown(), "Unknown");
    }

    #[test]
    fn test_serialization_keeps_wire_shape() {
        let blueprint = Blueprint::fallback("React");
        let json = serde_json::to_string(&blueprint).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["database"]["files"]["schema.sql"], "Database schema definition");
        assert!(value["database"].get("framework").is_none());

        let back = Blueprint::from_json(&json).unwrap();
        assert_eq!(back, blueprint);
    }
}
