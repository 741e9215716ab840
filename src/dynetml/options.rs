/*!
Load-time configuration.

`LoadOptions` is the serde-facing shape (it can be read from a JSON file); `LoadFilter`
is the validated form the reader actually consults.
*/

use std::{collections::HashSet, path::Path};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}_to_include and {0}_to_ignore cannot both contain values")]
    ConflictingSelection(&'static str),
    #[error("start {start} is after end {end}")]
    EmptyTimeWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid options file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which names of one category (properties, node-sets, networks) survive loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Include(HashSet<String>),
    Ignore(HashSet<String>),
}

impl Selection {
    pub fn from_lists(
        category: &'static str,
        include: &[String],
        ignore: &[String],
    ) -> Result<Self, ConfigError> {
        match (include.is_empty(), ignore.is_empty()) {
            (false, false) => Err(ConfigError::ConflictingSelection(category)),
            (false, true) => Ok(Selection::Include(include.iter().cloned().collect())),
            (true, false) => Ok(Selection::Ignore(ignore.iter().cloned().collect())),
            (true, true) => Ok(Selection::All),
        }
    }

    pub fn admits(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Include(names) => names.contains(name),
            Selection::Ignore(names) => !names.contains(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub properties_to_include: Vec<String>,
    pub properties_to_ignore: Vec<String>,
    pub nodesets_to_include: Vec<String>,
    pub nodesets_to_ignore: Vec<String>,
    pub networks_to_include: Vec<String>,
    pub networks_to_ignore: Vec<String>,
    /// Dynamic documents: skip slices stamped before this time.
    pub start: Option<NaiveDateTime>,
    /// Dynamic documents: skip slices stamped after this time.
    pub end: Option<NaiveDateTime>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn include_properties<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.properties_to_include = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_properties<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.properties_to_ignore = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_nodesets<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.nodesets_to_include = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_nodesets<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.nodesets_to_ignore = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_networks<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.networks_to_include = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_networks<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.networks_to_ignore = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn between(mut self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn to_filter(&self) -> Result<LoadFilter, ConfigError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ConfigError::EmptyTimeWindow { start, end });
            }
        }
        Ok(LoadFilter {
            properties: Selection::from_lists(
                "properties",
                &self.properties_to_include,
                &self.properties_to_ignore,
            )?,
            nodesets: Selection::from_lists(
                "nodesets",
                &self.nodesets_to_include,
                &self.nodesets_to_ignore,
            )?,
            networks: Selection::from_lists(
                "networks",
                &self.networks_to_include,
                &self.networks_to_ignore,
            )?,
            start: self.start,
            end: self.end,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadFilter {
    pub properties: Selection,
    pub nodesets: Selection,
    pub networks: Selection,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl LoadFilter {
    pub fn admits_time(&self, ts: NaiveDateTime) -> bool {
        self.start.is_none_or(|start| ts >= start) && self.end.is_none_or(|end| ts <= end)
    }

    pub fn filters_time(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_lists_are_rejected() {
        let options = LoadOptions::new()
            .include_networks(["a"])
            .ignore_networks(["b"]);
        assert!(matches!(
            options.to_filter(),
            Err(ConfigError::ConflictingSelection("networks"))
        ));
    }

    #[test]
    fn test_selection_semantics() {
        let filter = LoadOptions::new()
            .include_properties(["age"])
            .ignore_nodesets(["Location"])
            .to_filter()
            .unwrap();
        assert!(filter.properties.admits("age"));
        assert!(!filter.properties.admits("height"));
        assert!(filter.nodesets.admits("Agent"));
        assert!(!filter.nodesets.admits("Location"));
        assert!(filter.networks.admits("anything"));
    }

    #[test]
    fn test_options_from_json() {
        let json = r#"{ "networks_to_ignore": ["Tweet x Concept"], "start": "2014-02-24T21:00:00" }"#;
        let options: LoadOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.networks_to_ignore, vec!["Tweet x Concept".to_string()]);
        assert!(options.start.is_some());
        assert!(options.properties_to_include.is_empty());
    }
}
