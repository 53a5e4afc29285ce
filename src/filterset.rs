//! Filter set definitions and their per-request instances.
//!
//! A [`FilterSetDefinition`] declares which parameters a model can be filtered
//! by. The full filter table of a definition (universal filters of its model
//! family, declared filters, generated filters for its meta fields and every
//! lookup companion) is built on first use and cached for the process.
//!
//! A [`FilterSet`] binds one request's parameters to that table, adds the
//! filters of custom fields assigned to the model and turns everything into a
//! Sea-ORM [`Condition`].
//!
//! ```rust,ignore
//! struct ClusterFilterSet;
//!
//! impl FilterSetDefinition for ClusterFilterSet {
//!     type Entity = cluster::Entity;
//!     const NAME: &'static str = "ClusterFilterSet";
//!     const CONTENT_TYPE: &'static str = "virtualization.cluster";
//!     const FAMILY: ModelFamily = ModelFamily::NetBox;
//!
//!     fn fields() -> Vec<&'static str> {
//!         vec!["id", "name", "weight", "description"]
//!     }
//!
//!     fn declared_filters() -> Vec<(&'static str, Filter)> {
//!         vec![("status", Filter::new(FilterKind::Choice).choices(["active", "planned"]))]
//!     }
//!
//!     fn search(value: &str) -> Option<Condition> {
//!         search::icontains_any::<cluster::Entity>(&["name", "description"], value)
//!     }
//! }
//!
//! let params = QueryParams::parse("status=active&name__ic=core&weight__gte=10");
//! let filterset = FilterSet::<ClusterFilterSet>::new(params, &ctx).await?;
//! let clusters = filterset.apply(cluster::Entity::find()).await?.all(&db).await?;
//! ```

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use sea_orm::sea_query::Expr;
use sea_orm::{
    Condition, EntityTrait, Iterable, PrimaryKeyToColumn, QueryFilter, Select,
};

use crate::attributes::{AttributeFilter, AttributeFilters};
use crate::changelog::{CREATED_BY_REQUEST, MODIFIED_BY_REQUEST, ObjectId, UPDATED_BY_REQUEST};
use crate::conditions::{column_expr, lookup_condition};
use crate::context::FilterContext;
use crate::custom_fields::CUSTOM_FIELD_DATA;
use crate::errors::FilterSetError;
use crate::expander::{Expander, FilterMap};
use crate::fields::{FieldClass, FieldTarget, resolve_field, resolve_lookup};
use crate::filter::{Filter, FilterKind, FilterMethod, FilterValue};
use crate::lookups::Lookup;
use crate::params::QueryParams;
use crate::registry::filter_for_field;
use crate::saved::expand_saved_filters;
use crate::search::family_search;
use crate::tags::{TAGS_FIELD, TagRef};
use crate::validation::ValidationErrors;

/// Base model a definition's entity derives from. Decides the universal
/// filters and the default search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// No universal filters
    Base,
    /// `created`, `last_updated` and the `*_by_request` filters
    ChangeLogged,
    /// Change-logged plus `q`, `tag`, `tag_id` and custom field filters
    NetBox,
    /// NetBox model searched by name, slug and description
    Organizational,
    /// Organizational model that also searches its comments
    NestedGroup,
}

impl ModelFamily {
    #[must_use]
    pub const fn is_change_logged(self) -> bool {
        !matches!(self, Self::Base)
    }

    #[must_use]
    pub const fn is_netbox(self) -> bool {
        matches!(self, Self::NetBox | Self::Organizational | Self::NestedGroup)
    }
}

/// Declaration of the filters available on one model.
pub trait FilterSetDefinition: Send + Sync + 'static {
    type Entity: EntityTrait;

    /// Name used in logs and declaration errors
    const NAME: &'static str;
    /// `app_label.model` of the entity, used by the change log, tag index and
    /// custom field lookups
    const CONTENT_TYPE: &'static str;
    const FAMILY: ModelFamily;
    /// Abstract definitions never get lookup companions
    const IS_ABSTRACT: bool = false;

    /// Columns filterable with their default filter.
    fn fields() -> Vec<&'static str>;

    /// Explicit filters; these override universal filters of the same name.
    fn declared_filters() -> Vec<(&'static str, Filter)> {
        Vec::new()
    }

    /// Condition for the `q` parameter. `None` leaves the query unconstrained.
    fn search(value: &str) -> Option<Condition> {
        family_search::<Self::Entity>(Self::FAMILY, value)
    }

    /// Condition for filters declared with [`FilterMethod::Named`].
    fn filter_method(name: &str, _filter: &Filter, _values: &[FilterValue]) -> Option<Condition> {
        tracing::warn!(filterset = Self::NAME, method = name, "no handler for filter method");
        None
    }

    /// Enables `attr_*` style filters on a JSON attribute column.
    fn attribute_filters() -> Option<AttributeFilters> {
        None
    }
}

/// Universal filters every definition of `family` declares.
#[must_use]
pub fn universal_filters(family: ModelFamily) -> Vec<(&'static str, Filter)> {
    let mut filters = Vec::new();

    if family.is_change_logged() {
        filters.extend([
            ("created", Filter::new(FilterKind::DateTime)),
            ("last_updated", Filter::new(FilterKind::DateTime)),
            (
                "created_by_request",
                Filter::new(FilterKind::Uuid).method(FilterMethod::ByRequest(CREATED_BY_REQUEST)),
            ),
            (
                "updated_by_request",
                Filter::new(FilterKind::Uuid).method(FilterMethod::ByRequest(UPDATED_BY_REQUEST)),
            ),
            (
                "modified_by_request",
                Filter::new(FilterKind::Uuid).method(FilterMethod::ByRequest(MODIFIED_BY_REQUEST)),
            ),
        ]);
    }

    if family.is_netbox() {
        filters.extend([
            (
                "q",
                Filter::new(FilterKind::Char)
                    .single()
                    .method(FilterMethod::Search)
                    .label("Search"),
            ),
            (
                "tag",
                Filter::new(FilterKind::Tag).field(TAGS_FIELD).conjoined(),
            ),
            (
                "tag_id",
                Filter::new(FilterKind::TagId).field(TAGS_FIELD).conjoined(),
            ),
        ]);
    }

    filters
}

static FILTER_TABLES: LazyLock<Mutex<HashMap<TypeId, Arc<FilterMap>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The cached filter table of `D`, built on first use.
///
/// # Errors
///
/// Returns [`FilterSetError::InvalidDeclaration`] when the definition does not
/// fit its entity. Failed builds are not cached.
pub fn base_filters<D: FilterSetDefinition>() -> Result<Arc<FilterMap>, FilterSetError> {
    let key = TypeId::of::<D>();
    if let Some(table) = FILTER_TABLES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(table));
    }

    let built = Arc::new(build_filters::<D>()?);
    tracing::debug!(filterset = D::NAME, filters = built.len(), "built filter table");

    let mut tables = FILTER_TABLES.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(tables.entry(key).or_insert(built)))
}

fn build_filters<D: FilterSetDefinition>() -> Result<FilterMap, FilterSetError> {
    let invalid = |message: String| FilterSetError::invalid_declaration(D::NAME, message);

    let mut declared = FilterMap::new();
    for (name, mut filter) in universal_filters(D::FAMILY)
        .into_iter()
        .chain(D::declared_filters())
    {
        if filter.field_name.is_empty() {
            filter.field_name = name.to_string();
        }
        declared.insert(name.to_string(), filter);
    }

    for (name, filter) in &declared {
        if filter.method.is_some() {
            continue;
        }
        let target = resolve_field::<D::Entity>(&filter.field_name).ok_or_else(|| {
            invalid(format!("invalid field name/lookup on {name}: {}", filter.field_name))
        })?;
        resolve_lookup(&filter.field_name, &target, filter.lookup)
            .map_err(|err| invalid(format!("{name}: {err}")))?;
    }

    let mut filters = declared.clone();
    for field in D::fields() {
        if filters.contains_key(field) {
            continue;
        }
        let target = resolve_field::<D::Entity>(field)
            .ok_or_else(|| invalid(format!("unknown field '{field}'")))?;
        let filter = filter_for_field(&target, field, Lookup::Exact)
            .map_err(|_| invalid(format!("field '{field}' has no default filter")))?;
        filters.insert(field.to_string(), filter);
    }

    let expander = Expander::<D::Entity>::new(D::NAME, D::IS_ABSTRACT);
    let mut additional = FilterMap::new();
    for (name, filter) in &filters {
        additional.extend(expander.additional_lookups(name, filter, declared.contains_key(name))?);
    }
    filters.extend(additional);

    Ok(filters)
}

/// A filter together with the values bound to it from the request.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    pub name: String,
    pub filter: Filter,
    pub values: Vec<FilterValue>,
}

/// Filters of one definition bound to one request.
pub struct FilterSet<D: FilterSetDefinition> {
    base: Arc<FilterMap>,
    /// Custom field filters of this instance; looked up before `base`
    overlay: FilterMap,
    params: QueryParams,
    attribute_filters: Vec<AttributeFilter>,
    context: FilterContext,
    _definition: PhantomData<fn() -> D>,
}

impl<D: FilterSetDefinition> FilterSet<D> {
    /// Build the filter set for `params`.
    ///
    /// Attribute filters are read from `params` as given. Saved filter
    /// references are then replaced by their stored parameters, and filters
    /// for the custom fields assigned to the model are added.
    ///
    /// # Errors
    ///
    /// Declaration errors of `D`, invalid saved filter references and
    /// collaborator failures.
    pub async fn new(mut params: QueryParams, context: &FilterContext) -> Result<Self, FilterSetError> {
        let base = base_filters::<D>()?;

        let attribute_filters = D::attribute_filters()
            .map(|attributes| attributes.extract(&params))
            .unwrap_or_default();

        expand_saved_filters(&mut params, context.saved_filters.as_ref(), &context.options).await?;

        let overlay = if D::FAMILY.is_netbox() {
            custom_field_filters::<D>(context).await?
        } else {
            FilterMap::new()
        };

        Ok(Self {
            base,
            overlay,
            params,
            attribute_filters,
            context: context.clone(),
            _definition: PhantomData,
        })
    }

    /// The filter registered under `name`.
    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.overlay.get(name).or_else(|| self.base.get(name))
    }

    /// Every filter of this instance by name.
    #[must_use]
    pub fn filters(&self) -> BTreeMap<&str, &Filter> {
        self.base
            .iter()
            .chain(self.overlay.iter())
            .map(|(name, filter)| (name.as_str(), filter))
            .collect()
    }

    /// Parameters after saved filter expansion.
    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    #[must_use]
    pub fn attribute_filters(&self) -> &[AttributeFilter] {
        &self.attribute_filters
    }

    /// Parse the values of every parameter that names a filter.
    ///
    /// # Errors
    ///
    /// All malformed values, reported per parameter.
    pub fn bind(&self) -> Result<Vec<BoundFilter>, ValidationErrors> {
        let options = &self.context.options;
        let mut errors = ValidationErrors::new();
        let mut bound = Vec::new();

        for (name, raw_values) in self.params.iter() {
            let Some(filter) = self.filter(name) else {
                continue;
            };

            let raw: Vec<&str> = raw_values
                .iter()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .collect();
            if raw.is_empty() {
                continue;
            }
            if raw.len() > options.max_values_per_param {
                errors.push(
                    name,
                    format!("Too many values; at most {} are allowed.", options.max_values_per_param),
                );
                continue;
            }

            let selected = if filter.multiple { &raw[..] } else { &raw[raw.len() - 1..] };
            let mut values = Vec::with_capacity(selected.len());
            for value in selected {
                if value.len() > options.max_value_length {
                    errors.push(
                        name,
                        format!(
                            "Ensure this value has at most {} characters.",
                            options.max_value_length
                        ),
                    );
                    continue;
                }
                match filter.parse_value(value) {
                    Ok(parsed) => values.push(parsed),
                    Err(message) => errors.push(name, message),
                }
            }

            if !values.is_empty() {
                bound.push(BoundFilter {
                    name: name.to_string(),
                    filter: filter.clone(),
                    values,
                });
            }
        }

        errors.result().map(|()| bound)
    }

    /// Conjunction of every bound filter, then of the attribute filters.
    ///
    /// # Errors
    ///
    /// Validation errors from binding or unknown tags, and collaborator failures.
    pub async fn condition(&self) -> Result<Condition, FilterSetError> {
        let mut condition = Condition::all();

        for bound in self.bind()? {
            if let Some(filter_condition) = self.filter_condition(&bound).await? {
                condition = condition.add(filter_condition);
            }
        }

        if let Some(attributes) = D::attribute_filters() {
            if let Some(attribute_condition) = attributes.condition::<D::Entity>(
                D::NAME,
                &self.attribute_filters,
                self.context.backend,
            )? {
                condition = condition.add(attribute_condition);
            }
        }

        Ok(condition)
    }

    /// Constrain `select` by [`condition`](Self::condition). The query stays lazy.
    ///
    /// # Errors
    ///
    /// See [`condition`](Self::condition).
    pub async fn apply(
        &self,
        select: Select<D::Entity>,
    ) -> Result<Select<D::Entity>, FilterSetError> {
        Ok(select.filter(self.condition().await?))
    }

    async fn filter_condition(&self, bound: &BoundFilter) -> Result<Option<Condition>, FilterSetError> {
        match bound.filter.method {
            Some(FilterMethod::Search) => {
                let text = bound.values.last().map(FilterValue::to_text).unwrap_or_default();
                Ok(D::search(&text))
            }
            Some(FilterMethod::ByRequest(actions)) => {
                let Some(FilterValue::Uuid(request_id)) = bound.values.last() else {
                    return Ok(None);
                };
                let ids = self
                    .context
                    .change_log
                    .object_ids_for_request(D::CONTENT_TYPE, *request_id, actions)
                    .await?;
                tracing::debug!(
                    filter = %bound.name,
                    request_id = %request_id,
                    objects = ids.len(),
                    "resolved objects changed by request"
                );
                Ok(Some(Condition::all().add(pk_in::<D>(ids, false)?)))
            }
            Some(FilterMethod::Named(method)) => {
                Ok(D::filter_method(method, &bound.filter, &bound.values))
            }
            None => {
                let Some(target) = resolve_field::<D::Entity>(&bound.filter.field_name) else {
                    tracing::debug!(
                        filterset = D::NAME,
                        filter = %bound.name,
                        field = %bound.filter.field_name,
                        "filter field does not resolve; ignored"
                    );
                    return Ok(None);
                };
                if matches!(target, FieldTarget::Tags) {
                    return self.tag_condition(bound).await.map(Some);
                }
                Ok(lookup_condition(
                    &target,
                    &bound.filter,
                    &bound.values,
                    self.context.backend,
                ))
            }
        }
    }

    /// Every tag must match; excluding filters drop objects carrying any of them.
    async fn tag_condition(&self, bound: &BoundFilter) -> Result<Condition, FilterSetError> {
        let mut errors = ValidationErrors::new();
        let mut tagged = Vec::with_capacity(bound.values.len());

        for value in &bound.values {
            let tag = match value {
                FilterValue::Int(id) => TagRef::Id(*id),
                other => TagRef::Slug(other.to_text()),
            };
            match self.context.tags.tagged_object_ids(D::CONTENT_TYPE, &tag).await? {
                Some(ids) => tagged.push(ids),
                None => errors.push(
                    &bound.name,
                    format!("Select a valid choice. {tag} is not one of the available choices."),
                ),
            }
        }
        errors.result()?;

        let exclude = bound.filter.exclude;
        let mut condition = if exclude || bound.filter.extra.conjoined {
            Condition::all()
        } else {
            Condition::any()
        };
        for ids in tagged {
            condition = condition.add(pk_in::<D>(ids, exclude)?);
        }
        Ok(condition)
    }
}

/// Primary key `IN ids` (or `NOT IN`); an empty list matches nothing (or everything).
fn pk_in<D: FilterSetDefinition>(
    ids: Vec<ObjectId>,
    negate: bool,
) -> Result<sea_orm::sea_query::SimpleExpr, FilterSetError> {
    let pk = <D::Entity as EntityTrait>::PrimaryKey::iter()
        .next()
        .map(PrimaryKeyToColumn::into_column)
        .ok_or_else(|| FilterSetError::invalid_declaration(D::NAME, "entity has no primary key"))?;
    let column = Expr::expr(column_expr(pk));
    Ok(if negate {
        column.is_not_in(ids)
    } else {
        column.is_in(ids)
    })
}

/// `cf_<name>` filters, plus companions, for the custom fields of `D`'s model.
async fn custom_field_filters<D: FilterSetDefinition>(
    context: &FilterContext,
) -> Result<FilterMap, FilterSetError> {
    let fields = context
        .custom_fields
        .list_for_content_type(D::CONTENT_TYPE)
        .await?;
    let mut overlay = FilterMap::new();
    if fields.iter().all(|field| !field.is_filterable()) {
        return Ok(overlay);
    }

    let has_data_column = matches!(
        resolve_field::<D::Entity>(CUSTOM_FIELD_DATA).map(|target| target.class()),
        Some(FieldClass::Json)
    );
    if !has_data_column {
        return Err(FilterSetError::invalid_declaration(
            D::NAME,
            format!("custom fields require a JSON column named '{CUSTOM_FIELD_DATA}'"),
        ));
    }

    let expander = Expander::<D::Entity>::new(D::NAME, D::IS_ABSTRACT);
    for field in fields {
        if !field.is_filterable() {
            continue;
        }
        let field = Arc::new(field);
        let Some(filter) = field.to_filter(None) else {
            continue;
        };
        let name = format!("{}{}", context.options.custom_field_prefix, field.name);
        if resolve_field::<D::Entity>(&filter.field_name).is_none() {
            tracing::warn!(
                filterset = D::NAME,
                custom_field = %field.name,
                "custom field name is not a valid JSON key; no filter added"
            );
            continue;
        }
        let additional = expander.additional_lookups(&name, &filter, false)?;
        overlay.insert(name, filter);
        overlay.extend(additional);
    }

    tracing::debug!(filterset = D::NAME, filters = overlay.len(), "added custom field filters");
    Ok(overlay)
}
