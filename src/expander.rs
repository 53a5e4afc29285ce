//! Lookup-suffix expansion of simple filters.
//!
//! Every simple filter (`exact`, `iexact`, `in`) without a method handler gets
//! one companion filter per suffix of its category's lookup map, named
//! `<filter>__<suffix>`. Suffixes the field cannot support are skipped one by
//! one so that model changes never break existing clients.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use sea_orm::EntityTrait;

use crate::errors::FilterSetError;
use crate::fields::{FieldTarget, LookupError, resolve_field, resolve_lookup};
use crate::filter::{Filter, FilterKind};
use crate::lookups::{EMPTY_SUFFIX, LOOKUP_SEPARATOR, Lookup, is_negation};
use crate::registry::filter_for_field;

/// Filters of a filter set keyed by parameter name.
pub type FilterMap = BTreeMap<String, Filter>;

/// Builds lookup companions for the filters of one filter set definition.
pub struct Expander<E: EntityTrait> {
    filterset: &'static str,
    is_abstract: bool,
    _entity: PhantomData<E>,
}

impl<E: EntityTrait> Expander<E> {
    #[must_use]
    pub fn new(filterset: &'static str, is_abstract: bool) -> Self {
        Self {
            filterset,
            is_abstract,
            _entity: PhantomData,
        }
    }

    /// Companion filters for `existing`, registered under `name`.
    ///
    /// `declared` marks filters explicitly declared on the definition; those are
    /// rebuilt with their own kind and options instead of the column default.
    ///
    /// # Errors
    ///
    /// Returns [`FilterSetError::InvalidDeclaration`] when a declared filter
    /// targets a field that does not exist on the entity.
    pub fn additional_lookups(
        &self,
        name: &str,
        existing: &Filter,
        declared: bool,
    ) -> Result<FilterMap, FilterSetError> {
        let mut new_filters = FilterMap::new();

        if self.is_abstract || existing.method.is_some() || !existing.lookup.is_simple() {
            return Ok(new_filters);
        }
        let Some(lookup_map) = existing.category().lookup_map() else {
            return Ok(new_filters);
        };

        let target = resolve_field::<E>(&existing.field_name);
        if declared && target.is_none() {
            return Err(FilterSetError::invalid_declaration(
                self.filterset,
                format!(
                    "invalid field name/lookup on {name}: {}",
                    existing.field_name
                ),
            ));
        }

        for &(suffix, lookup) in lookup_map {
            let new_name = format!("{name}{LOOKUP_SEPARATOR}{suffix}");

            // Unsupported lookups drop this suffix only.
            let mut new_filter = match Self::build(existing, target.as_ref(), lookup, declared) {
                Ok(filter) => filter,
                Err(err) => {
                    tracing::debug!(
                        filterset = self.filterset,
                        filter = %new_name,
                        error = %err,
                        "skipping lookup expansion"
                    );
                    continue;
                }
            };

            if suffix == EMPTY_SUFFIX || lookup.is_presence_check() {
                into_presence_check(&mut new_filter);
            }
            if is_negation(suffix) {
                new_filter.exclude = !existing.exclude;
            }

            new_filters.insert(new_name, new_filter);
        }

        Ok(new_filters)
    }

    fn build(
        existing: &Filter,
        target: Option<&FieldTarget<E::Column>>,
        lookup: Lookup,
        declared: bool,
    ) -> Result<Filter, LookupError> {
        let unsupported = || LookupError {
            field: existing.field_name.clone(),
            lookup,
        };
        let target = target.ok_or_else(unsupported)?;

        if declared {
            resolve_lookup(&existing.field_name, target, lookup)?;
            let mut filter = existing.clone();
            filter.lookup = lookup;
            if lookup == Lookup::In {
                filter.multiple = true;
            }
            return Ok(filter);
        }

        if let Some(custom_field) = existing.custom_field() {
            resolve_lookup(&existing.field_name, target, lookup)?;
            return custom_field.to_filter(Some(lookup)).ok_or_else(unsupported);
        }

        filter_for_field(target, &existing.field_name, lookup)
    }
}

/// "Is empty" is a presence check: boolean valued, no choices, no null token.
fn into_presence_check(filter: &mut Filter) {
    filter.kind = FilterKind::Boolean;
    filter.multiple = false;
    filter.extra.choices = None;
    filter.extra.null_value = None;
    filter.extra.conjoined = false;
}
