//! Entity selection: which products, companies or countries a report covers.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Entity identifier as stored in the catalog tables.
pub type EntityId = i64;

/// Either every available entity or an explicit, ordered id list.
///
/// Serialized the way report forms send it: the string `"all"` or an array
/// of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntitySelection {
    #[default]
    All,
    Ids(Vec<EntityId>),
}

impl EntitySelection {
    pub fn ids<I: IntoIterator<Item = EntityId>>(ids: I) -> Self {
        EntitySelection::Ids(ids.into_iter().collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, EntitySelection::All)
    }

    /// Resolve the selection to concrete ids.
    ///
    /// `universe` is every id the caller may report on, in display order.
    /// When `authorized` is given, the result is intersected with it. Explicit
    /// ids keep their order and any duplicates.
    pub fn resolve(
        &self,
        universe: &[EntityId],
        authorized: Option<&HashSet<EntityId>>,
    ) -> Result<Vec<EntityId>> {
        let allowed = |id: &EntityId| authorized.map_or(true, |auth| auth.contains(id));
        let resolved: Vec<EntityId> = match self {
            EntitySelection::All => universe.iter().copied().filter(allowed).collect(),
            EntitySelection::Ids(ids) => ids.iter().copied().filter(allowed).collect(),
        };

        if resolved.is_empty() {
            return Err(ReportError::EmptySelection(match self {
                EntitySelection::All => "no authorized entities are available".to_string(),
                EntitySelection::Ids(ids) if ids.is_empty() => {
                    "no entities were selected".to_string()
                }
                EntitySelection::Ids(ids) => format!(
                    "none of the {} selected entities are authorized",
                    ids.len()
                ),
            }));
        }
        Ok(resolved)
    }
}

/// Parses the legacy form field: `"all"` (any case) or comma-separated ids.
impl FromStr for EntitySelection {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(EntitySelection::All);
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<EntityId>().map_err(|_| {
                    ReportError::InvalidArgument(format!("invalid entity id '{}'", part))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(EntitySelection::Ids)
    }
}

impl Serialize for EntitySelection {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            EntitySelection::All => serializer.serialize_str("all"),
            EntitySelection::Ids(ids) => ids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EntitySelection {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Ids(Vec<EntityId>),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Ids(ids) => Ok(EntitySelection::Ids(ids)),
            Wire::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
