//! Typed read-only view over the Kaito `Workspace` custom resource.
//!
//! The resource is fetched untyped (see [`crate::cluster`]) because its
//! schema moved between releases: older objects nest the inference block
//! under `spec`, `v1beta1` objects carry it at the top level. Every read
//! goes through [`Lookup`], which separates "field absent" from "field has
//! the wrong shape" instead of collapsing both into an empty value.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::CliError;

/// API group of the Workspace resource.
pub const WORKSPACE_GROUP: &str = "kaito.sh";
/// API version of the Workspace resource.
pub const WORKSPACE_VERSION: &str = "v1beta1";
/// Kind of the Workspace resource.
pub const WORKSPACE_KIND: &str = "Workspace";
/// Plural resource name used in API paths.
pub const WORKSPACE_PLURAL: &str = "workspaces";

/// Condition type gating endpoint discovery.
pub const WORKSPACE_READY: &str = "WorkspaceReady";
/// Condition type reported once GPU nodes are provisioned.
pub const RESOURCE_READY: &str = "ResourceReady";
/// Condition type reported once the inference server is up.
pub const INFERENCE_READY: &str = "InferenceReady";
/// Condition type reported by tuning workspaces.
pub const JOB_STARTED: &str = "JobStarted";

/// Name and namespace of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceRef {
    /// Workspace name. The inference Service shares it.
    pub name: String,
    /// Namespace holding both the workspace and its Service.
    pub namespace: String,
}

impl WorkspaceRef {
    /// Create a new reference.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Parse `name` or `workspace/name`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or any other `kind/` prefix.
    pub fn parse(reference: &str, namespace: impl Into<String>) -> Result<Self, CliError> {
        let name = match reference.split_once('/') {
            None => reference,
            Some(("workspace" | "workspaces", name)) if !name.contains('/') => name,
            Some(_) => {
                return Err(CliError::validation(format!(
                    "invalid workspace reference format: {reference}"
                )));
            }
        };
        if name.is_empty() {
            return Err(CliError::validation("workspace name is required"));
        }
        Ok(Self::new(name, namespace))
    }

    /// Canonical in-cluster DNS name of the workspace Service.
    #[must_use]
    pub fn service_host(&self) -> String {
        format!("{}.{}.svc.cluster.local", self.name, self.namespace)
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of a typed field read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The field exists and has the expected shape.
    Found(T),
    /// The field, or one of its parents, is absent.
    Missing,
    /// A value exists at `path` but is not of the `expected` shape.
    TypeMismatch {
        /// Dotted path of the offending value.
        path: String,
        /// Shape that was expected there.
        expected: &'static str,
    },
}

impl<T> Lookup<T> {
    /// The found value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing | Self::TypeMismatch { .. } => None,
        }
    }

    /// Chain another read on the found value.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Lookup<U>) -> Lookup<U> {
        match self {
            Self::Found(value) => f(value),
            Self::Missing => Lookup::Missing,
            Self::TypeMismatch { path, expected } => Lookup::TypeMismatch { path, expected },
        }
    }
}

/// Status of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// Condition holds.
    True,
    /// Condition does not hold.
    False,
    /// Controller has not decided, or the value is unrecognised.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A single `status.conditions[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, e.g. `WorkspaceReady`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Condition status.
    pub status: ConditionStatus,
    /// Machine-readable reason.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reason: String,
    /// Human-readable message.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    /// RFC 3339 timestamp of the last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where the inference block lives in a workspace object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceLayout {
    /// `spec.inference` (pre-`v1beta1` objects).
    SpecNested,
    /// Top-level `inference` (`v1beta1`).
    TopLevel,
    /// No inference block, e.g. a tuning workspace.
    Absent,
}

/// Snapshot of a Workspace object.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Object name.
    pub name: String,
    /// Object namespace.
    pub namespace: String,
    /// `metadata.creationTimestamp`.
    pub created: Option<DateTime<Utc>>,
    data: Value,
}

impl Workspace {
    /// Build a snapshot from the non-metadata body of the object.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            created: None,
            data,
        }
    }

    /// Attach the creation timestamp.
    #[must_use]
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Walk `path` through nested objects.
    pub fn lookup(&self, path: &[&str]) -> Lookup<&Value> {
        let mut current = &self.data;
        for (i, key) in path.iter().enumerate() {
            let Value::Object(map) = current else {
                return Lookup::TypeMismatch {
                    path: path[..i].join("."),
                    expected: "object",
                };
            };
            match map.get(*key) {
                Some(Value::Null) | None => return Lookup::Missing,
                Some(next) => current = next,
            }
        }
        Lookup::Found(current)
    }

    /// Read a string at `path`.
    pub fn string_at(&self, path: &[&str]) -> Lookup<&str> {
        self.lookup(path).and_then(|value| match value {
            Value::String(s) => Lookup::Found(s.as_str()),
            _ => Lookup::TypeMismatch {
                path: path.join("."),
                expected: "string",
            },
        })
    }

    /// Read `status.conditions`.
    ///
    /// Entries that do not decode as a condition are skipped with a warning.
    pub fn conditions(&self) -> Lookup<Vec<Condition>> {
        let items = match self.lookup(&["status", "conditions"]) {
            Lookup::Found(Value::Array(items)) => items,
            Lookup::Found(_) => {
                return Lookup::TypeMismatch {
                    path: "status.conditions".into(),
                    expected: "array",
                };
            }
            Lookup::Missing => return Lookup::Missing,
            Lookup::TypeMismatch { path, expected } => {
                return Lookup::TypeMismatch { path, expected };
            }
        };

        let conditions = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match Condition::deserialize(item) {
                Ok(condition) => Some(condition),
                Err(e) => {
                    warn!(workspace = %self.name, index = i, error = %e, "Skipping unreadable condition");
                    None
                }
            })
            .collect();
        Lookup::Found(conditions)
    }

    /// Find a condition by type.
    pub fn condition(&self, type_: &str) -> Lookup<Condition> {
        self.conditions().and_then(|conditions| {
            conditions
                .into_iter()
                .find(|c| c.type_ == type_)
                .map_or(Lookup::Missing, Lookup::Found)
        })
    }

    /// Status of a condition, `Unknown` when it cannot be read.
    #[must_use]
    pub fn condition_status(&self, type_: &str) -> ConditionStatus {
        self.condition(type_)
            .found()
            .map_or(ConditionStatus::Unknown, |c| c.status)
    }

    /// Classify where the inference block lives.
    #[must_use]
    pub fn inference_layout(&self) -> InferenceLayout {
        if matches!(self.lookup(&["spec", "inference"]), Lookup::Found(_)) {
            InferenceLayout::SpecNested
        } else if matches!(self.lookup(&["inference"]), Lookup::Found(_)) {
            InferenceLayout::TopLevel
        } else {
            InferenceLayout::Absent
        }
    }

    /// Model served by this workspace.
    #[must_use]
    pub fn model_name(&self) -> Option<String> {
        const SPEC_PRESET: &[&str] = &["spec", "inference", "preset", "name"];
        const PRESET: &[&str] = &["inference", "preset", "name"];
        const MODEL: &[&str] = &["inference", "model"];

        // The layout picks where to start; later paths still fill in an
        // empty preferred one.
        let candidates: &[&[&str]] = match self.inference_layout() {
            InferenceLayout::SpecNested => &[SPEC_PRESET, PRESET, MODEL],
            InferenceLayout::TopLevel => &[PRESET, MODEL],
            InferenceLayout::Absent => &[],
        };
        candidates
            .iter()
            .filter_map(|path| self.string_at(path).found())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// GPU instance type requested by the workspace.
    #[must_use]
    pub fn instance_type(&self) -> Option<String> {
        self.string_at(&["resource", "instanceType"])
            .found()
            .or_else(|| self.string_at(&["spec", "resource", "instanceType"]).found())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
