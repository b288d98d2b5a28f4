//! Plan document model: the application description, its architectural
//! decisions, and the component graph with per-component build status.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Plan {
    #[serde(deserialize_with = "null_as_default")]
    pub application_description: String,
    #[serde(alias = "architectural_desicions", deserialize_with = "null_as_default")]
    pub architectural_decisions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub components: Vec<Component>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Component {
    #[serde(rename = "component_name", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "component_description", deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(
        rename = "component_detailed_design",
        deserialize_with = "null_as_default"
    )]
    pub detailed_design: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    #[serde(rename = "development_status")]
    pub status: DevelopmentStatus,
}

/// Build status of a single component.
///
/// Only ever advances `NotStarted -> InProgress -> Completed`.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl DevelopmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for DevelopmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevelopmentStatus {
    type Err = String;

    /// Accepts any casing, with or without `_`, `-` or space separators.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "notstarted" => Ok(Self::NotStarted),
            "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown development_status '{raw}'")),
        }
    }
}

impl<'de> Deserialize<'de> for DevelopmentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::default()),
            Value::String(raw) => raw.parse().map_err(de::Error::custom),
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(Self::NotStarted),
                Some(1) => Ok(Self::InProgress),
                Some(2) => Ok(Self::Completed),
                _ => Err(de::Error::custom(format!(
                    "unknown development_status {n}"
                ))),
            },
            other => Err(de::Error::custom(format!(
                "development_status must be a string, got {other}"
            ))),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Plan {
    /// True when there is at least one component and none has been touched yet.
    pub fn is_pristine(&self) -> bool {
        !self.components.is_empty()
            && self
                .components
                .iter()
                .all(|c| c.status == DevelopmentStatus::NotStarted)
    }

    pub fn is_complete(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.status == DevelopmentStatus::Completed)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Names of every component not yet `Completed`, in stored order.
    pub fn unfinished_names(&self) -> Vec<String> {
        self.components
            .iter()
            .filter(|c| c.status != DevelopmentStatus::Completed)
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_any_casing() {
        for raw in ["NotStarted", "notStarted", "not_started", "NOT-STARTED"] {
            assert_eq!(
                raw.parse::<DevelopmentStatus>(),
                Ok(DevelopmentStatus::NotStarted)
            );
        }
        assert_eq!(
            "In_Progress".parse::<DevelopmentStatus>(),
            Ok(DevelopmentStatus::InProgress)
        );
        assert!("finished".parse::<DevelopmentStatus>().is_err());
    }

    #[test]
    fn status_accepts_integer_form() {
        let component: Component =
            serde_json::from_str(r#"{"component_name":"a","development_status":2}"#)
                .expect("decode");
        assert_eq!(component.status, DevelopmentStatus::Completed);
    }

    #[test]
    fn status_serializes_lower_snake() {
        let json = serde_json::to_string(&DevelopmentStatus::InProgress).expect("encode");
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn missing_and_null_fields_default_to_empty() {
        let plan: Plan = serde_json::from_str(
            r#"{"components":[{"component_name":"a","dependencies":null,"extra":1}]}"#,
        )
        .expect("decode");
        assert_eq!(plan.application_description, "");
        assert!(plan.architectural_decisions.is_empty());
        assert!(plan.components[0].dependencies.is_empty());
        assert_eq!(plan.components[0].status, DevelopmentStatus::NotStarted);
    }

    #[test]
    fn misspelled_decisions_key_is_accepted() {
        let plan: Plan =
            serde_json::from_str(r#"{"architectural_desicions":["use rust"]}"#).expect("decode");
        assert_eq!(plan.architectural_decisions, vec!["use rust".to_string()]);
    }

    #[test]
    fn pristine_requires_components_all_not_started() {
        let mut plan = Plan::default();
        assert!(!plan.is_pristine());
        plan.components.push(Component {
            name: "a".to_string(),
            ..Component::default()
        });
        assert!(plan.is_pristine());
        plan.components[0].status = DevelopmentStatus::InProgress;
        assert!(!plan.is_pristine());
    }
}
