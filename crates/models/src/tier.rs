use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ModelError;
use crate::validation::{normalize_groups, validate_tier_name};

/// One service tier as stored in the catalog document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tier {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub level: i64,
    /// Never serialized as null; a tier without groups carries `[]`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<String>,
}

impl Tier {
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Create input. `groups` may be omitted, null or empty; all three mean "no groups".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub level: i64,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

impl TierSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, level: i64) -> Self {
        Self { name: name.into(), description: description.into(), level, groups: None }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Validate the name and groups and resolve defaults into a storable tier.
    pub fn into_tier(self) -> Result<Tier, ModelError> {
        validate_tier_name(&self.name)?;
        let groups = normalize_groups(self.groups.unwrap_or_default())?;
        Ok(Tier { name: self.name, description: self.description, level: self.level, groups })
    }
}

/// Full replacement of the mutable fields of an existing tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierUpdate {
    #[serde(default)]
    pub description: String,
    pub level: i64,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

impl TierUpdate {
    pub fn new(description: impl Into<String>, level: i64) -> Self {
        Self { description: description.into(), level, groups: None }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Validated copy with `groups` always resolved to `Some`.
    pub fn normalized(self) -> Result<Self, ModelError> {
        let groups = normalize_groups(self.groups.unwrap_or_default())?;
        Ok(Self { description: self.description, level: self.level, groups: Some(groups) })
    }

    /// Write the fields onto `tier`, leaving its name untouched.
    pub fn apply_to(&self, tier: &mut Tier) {
        tier.description.clone_from(&self.description);
        tier.level = self.level;
        tier.groups = self.groups.clone().unwrap_or_default();
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
