//! Attribute and tag predicates, and the JSON filter bodies built from them.
//!
//! Empty attribute values mean "unconstrained". Builders return `None` when
//! there is nothing to constrain, which callers take as "send an unfiltered
//! request", never as an empty filter object.

use crate::error::ApiError;
use crate::types::Tag;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ENVIRONMENTS: [&str; 9] = [
    "frontend",
    "backend",
    "internal",
    "external",
    "mobile",
    "saas",
    "on-prem",
    "hosted",
    "distributed",
];
pub const LIFECYCLES: [&str; 3] = ["production", "development", "sandbox"];
pub const CRITICALITIES: [&str; 4] = ["critical", "high", "medium", "low"];

/// Requested attribute values; `None` or empty leaves the attribute out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSelection {
    pub environment: Option<String>,
    pub lifecycle: Option<String>,
    pub criticality: Option<String>,
}

impl AttributeSelection {
    pub fn new(
        environment: Option<String>,
        lifecycle: Option<String>,
        criticality: Option<String>,
    ) -> Self {
        Self {
            environment,
            lifecycle,
            criticality,
        }
    }

    fn environment(&self) -> Option<&str> {
        non_empty(&self.environment)
    }

    fn lifecycle(&self) -> Option<&str> {
        non_empty(&self.lifecycle)
    }

    fn criticality(&self) -> Option<&str> {
        non_empty(&self.criticality)
    }

    pub fn is_empty(&self) -> bool {
        self.environment().is_none() && self.lifecycle().is_none() && self.criticality().is_none()
    }

    /// Check every given value against its enumerated domain.
    pub fn validate(&self) -> Result<(), ApiError> {
        check("environment", self.environment(), &ENVIRONMENTS)?;
        check("lifecycle", self.lifecycle(), &LIFECYCLES)?;
        check("criticality", self.criticality(), &CRITICALITIES)?;
        Ok(())
    }

    fn body(&self) -> Option<AttributesBody<'_>> {
        if self.is_empty() {
            return None;
        }
        Some(AttributesBody {
            environment: self.environment().map(|v| [v]),
            lifecycle: self.lifecycle().map(|v| [v]),
            criticality: self.criticality().map(|v| [v]),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn check(
    field: &'static str,
    value: Option<&str>,
    allowed: &'static [&'static str],
) -> Result<(), ApiError> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(ApiError::InvalidValue {
            field,
            value: v.to_string(),
            allowed,
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize)]
struct AttributesBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<[&'a str; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lifecycle: Option<[&'a str; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    criticality: Option<[&'a str; 1]>,
}

#[derive(Debug, Serialize)]
struct TagRef<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct TagsClause<'a> {
    includes: Vec<TagRef<'a>>,
}

#[derive(Debug, Serialize)]
struct Filters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributesBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<TagsClause<'a>>,
}

#[derive(Debug, Serialize)]
struct FilterBody<'a> {
    filters: Filters<'a>,
}

/// `{"environment":["frontend"],...}` with only the given attributes, or `None`.
pub fn build_attributes_body(selection: &AttributeSelection) -> Option<String> {
    selection.body().map(|body| to_json(&body))
}

/// Split `key=value`. Both sides must be non-empty and there must be exactly one `=`.
pub fn parse_tag(raw: &str) -> Result<Tag, ApiError> {
    let invalid = || ApiError::InvalidTag(raw.to_string());
    let (key, value) = raw.split_once('=').ok_or_else(invalid)?;
    if key.is_empty() || value.is_empty() || value.contains('=') {
        return Err(invalid());
    }
    Ok(Tag {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse tag predicates into a key to value mapping; a repeated key keeps its last value.
pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> Result<BTreeMap<String, String>, ApiError> {
    let mut tags = BTreeMap::new();
    for entry in raw {
        let tag = parse_tag(entry.as_ref())?;
        tags.insert(tag.key, tag.value);
    }
    Ok(tags)
}

/// The full `{"filters": {...}}` body, or `None` when neither clause constrains anything.
pub fn build_filter_body(
    selection: &AttributeSelection,
    tags: &BTreeMap<String, String>,
) -> Option<String> {
    let attributes = selection.body();
    let tags = if tags.is_empty() {
        None
    } else {
        Some(TagsClause {
            includes: tags
                .iter()
                .map(|(key, value)| TagRef { key, value })
                .collect(),
        })
    };

    if attributes.is_none() && tags.is_none() {
        return None;
    }

    Some(to_json(&FilterBody {
        filters: Filters { attributes, tags },
    }))
}

fn to_json<T: Serialize>(value: &T) -> String {
    // Plain structs of strings always serialize.
    serde_json::to_string(value).unwrap_or_default()
}
