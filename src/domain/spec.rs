//! Project specifications.
//!
//! A spec carries four independent facets. Each facet is an opaque
//! structured document; nothing here enforces a schema on its contents.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single spec facet (map-of-maps, schema-free)
pub type Facet = serde_json::Map<String, serde_json::Value>;

/// The structured input driving blueprint and content generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    /// Feature descriptions
    #[serde(default, alias = "features_json")]
    pub features: Facet,

    /// API surface
    #[serde(default, alias = "apis_json")]
    pub apis: Facet,

    /// Database schema
    #[serde(default, alias = "database_json")]
    pub database: Facet,

    /// Technology-stack details
    #[serde(default, alias = "tech_stack_json")]
    pub tech_stack: Facet,
}

impl Spec {
    /// Apply an uploaded document on top of an optional previous spec
    ///
    /// Facets missing from the upload keep their previous value.
    pub fn merged(previous: Option<Spec>, update: SpecUpdate) -> Self {
        let base = previous.unwrap_or_default();
        Self {
            features: update.features.unwrap_or(base.features),
            apis: update.apis.unwrap_or(base.apis),
            database: update.database.unwrap_or(base.database),
            tech_stack: update.tech_stack.unwrap_or(base.tech_stack),
        }
    }

    /// True when every facet is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
            && self.apis.is_empty()
            && self.database.is_empty()
            && self.tech_stack.is_empty()
    }
}

/// An uploaded spec document; absent facets are left untouched on merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecUpdate {
    #[serde(default, alias = "features_json")]
    pub features: Option<Facet>,
    #[serde(default, alias = "apis_json")]
    pub apis: Option<Facet>,
    #[serde(default, alias = "database_json")]
    pub database: Option<Facet>,
    #[serde(default, alias = "tech_stack_json")]
    pub tech_stack: Option<Facet>,
}

/// Errors raised while reading a spec document
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Invalid JSON spec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML spec: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Raw spec document as handed over by the ingestion layer
#[derive(Debug, Clone)]
pub enum SpecSource {
    Json(String),
    Yaml(String),
    Parsed(SpecUpdate),
}

impl SpecSource {
    /// Pick the format from a file extension (YAML for `.yaml`/`.yml`, JSON otherwise)
    pub fn from_path_content(path: &Path, content: String) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml(content),
            _ => Self::Json(content),
        }
    }

    /// Parse into a facet update
    pub fn parse(self) -> Result<SpecUpdate, SpecError> {
        match self {
            Self::Json(content) => Ok(serde_json::from_str(&content)?),
            Self::Yaml(content) => Ok(serde_yaml::from_str(&content)?),
            Self::Parsed(update) => Ok(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_with_legacy_names() {
        let source = SpecSource::Json(
            r#"{"features_json": {"auth": {"login": "email"}}, "apis": {}}"#.to_string(),
        );
        let update = source.parse().unwrap();

        assert_eq!(update.features.unwrap()["auth"], json!({"login": "email"}));
        assert!(update.apis.unwrap().is_empty());
        assert!(update.database.is_none());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
features:
  cart:
    add_item: "Add product to cart"
tech_stack:
  frontend:
    framework: React
"#;
        let update = SpecSource::Yaml(yaml.to_string()).parse().unwrap();
        let spec = Spec::merged(None, update);

        assert_eq!(spec.tech_stack["frontend"]["framework"], json!("React"));
        assert!(spec.apis.is_empty());
    }

    #[test]
    fn test_merge_keeps_absent_facets() {
        let mut previous = Spec::default();
        previous
            .database
            .insert("users".to_string(), json!({"id": "uuid"}));
        previous.apis.insert("GET /users".to_string(), json!({}));

        let update = SpecUpdate {
            apis: Some(Facet::new()),
            ..Default::default()
        };
        let merged = Spec::merged(Some(previous), update);

        assert!(merged.database.contains_key("users"));
        assert!(merged.apis.is_empty());
    }

    #[test]
    fn test_invalid_document_reports_format() {
        let err = SpecSource::Json("{not json".to_string()).parse().unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON spec"));
    }

    #[test]
    fn test_format_from_extension() {
        let source = SpecSource::from_path_content(Path::new("spec.yml"), String::new());
        assert!(matches!(source, SpecSource::Yaml(_)));

        let source = SpecSource::from_path_content(Path::new("spec.json"), String::new());
        assert!(matches!(source, SpecSource::Json(_)));
    }
}
