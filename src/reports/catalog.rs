//! Pick-lists for report forms.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::{Dataset, EntityKind, FIRST_PICKER_YEAR};
use crate::error::Result;
use crate::period::{period_options, PeriodOption};
use crate::selection::EntityId;
use crate::store::RowSource;

/// One entry of an entity pick-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickOption {
    pub value: EntityId,
    pub text: String,
}

/// Catalog lookups against a [`RowSource`].
pub struct CatalogQuery<'a> {
    source: &'a dyn RowSource,
}

impl<'a> CatalogQuery<'a> {
    pub fn new(source: &'a dyn RowSource) -> Self {
        Self { source }
    }

    /// Products ordered by name, restricted to `authorized` when given.
    pub fn products(&self, authorized: Option<&HashSet<EntityId>>) -> Result<Vec<PickOption>> {
        self.options(EntityKind::Product, authorized)
    }

    /// Companies ordered by name, labelled `"Name[Location]"`.
    pub fn companies(&self, authorized: Option<&HashSet<EntityId>>) -> Result<Vec<PickOption>> {
        self.options(EntityKind::Company, authorized)
    }

    pub fn countries(&self) -> Result<Vec<PickOption>> {
        self.options(EntityKind::Country, None)
    }

    /// The period picker for a dataset, running through its latest year.
    pub fn periods(&self, dataset: Dataset) -> Result<Vec<PeriodOption>> {
        let bounds = self.source.min_max_period(dataset)?;
        Ok(period_options(
            FIRST_PICKER_YEAR.min(bounds.min.year),
            bounds.max.year,
        ))
    }

    fn options(
        &self,
        kind: EntityKind,
        authorized: Option<&HashSet<EntityId>>,
    ) -> Result<Vec<PickOption>> {
        let ids: Vec<EntityId> = self
            .source
            .entity_ids(kind)?
            .into_iter()
            .filter(|id| authorized.map_or(true, |auth| auth.contains(id)))
            .collect();
        Ok(self
            .source
            .entity_labels(kind, &ids)?
            .into_iter()
            .map(|label| PickOption {
                value: label.id,
                text: label.label(),
            })
            .collect())
    }
}
