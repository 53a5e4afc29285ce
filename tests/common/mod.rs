#![allow(dead_code)]

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use filterset::search::icontains_any;
use filterset::stores::{MemoryChangeLog, MemoryCustomFields, MemorySavedFilters, MemoryTags};
use filterset::{
    ApiError, AttributeFilters, ChangeAction, CustomField, CustomFieldType, Filter,
    FilterContext, FilterKind, FilterSet, FilterSetDefinition, ModelFamily, QueryParams,
    SavedFilter,
};
use sea_orm::{
    ActiveModelTrait, Condition, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryOrder, Schema, Set,
};
use sea_orm_migration::{MigrationName, MigrationTrait, MigratorTrait, SchemaManager};
use serde_json::json;
use uuid::Uuid;

pub mod cluster {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "virtualization_cluster")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub status: String,
        pub description: String,
        pub weight: Option<i32>,
        pub created: DateTimeUtc,
        pub last_updated: DateTimeUtc,
        pub custom_field_data: Json,
        pub attribute_data: Json,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod cluster_group {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "virtualization_clustergroup")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub slug: String,
        pub description: String,
        pub comments: String,
        pub created: DateTimeUtc,
        pub last_updated: DateTimeUtc,
        pub custom_field_data: Json,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub const CLUSTER: &str = "virtualization.cluster";
pub const CLUSTER_GROUP: &str = "virtualization.clustergroup";

pub struct ClusterFilterSet;

impl FilterSetDefinition for ClusterFilterSet {
    type Entity = cluster::Entity;
    const NAME: &'static str = "ClusterFilterSet";
    const CONTENT_TYPE: &'static str = CLUSTER;
    const FAMILY: ModelFamily = ModelFamily::NetBox;

    fn fields() -> Vec<&'static str> {
        vec!["id", "name", "description", "weight"]
    }

    fn declared_filters() -> Vec<(&'static str, Filter)> {
        vec![(
            "status",
            Filter::new(FilterKind::Choice).choices(["active", "planned", "offline"]),
        )]
    }

    fn search(value: &str) -> Option<Condition> {
        icontains_any::<cluster::Entity>(&["name", "description"], value)
    }

    fn attribute_filters() -> Option<AttributeFilters> {
        Some(AttributeFilters::default())
    }
}

pub struct ClusterGroupFilterSet;

impl FilterSetDefinition for ClusterGroupFilterSet {
    type Entity = cluster_group::Entity;
    const NAME: &'static str = "ClusterGroupFilterSet";
    const CONTENT_TYPE: &'static str = CLUSTER_GROUP;
    const FAMILY: ModelFamily = ModelFamily::NestedGroup;

    fn fields() -> Vec<&'static str> {
        vec!["id", "name", "slug", "description"]
    }
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTables)]
    }
}

pub struct CreateTables;

impl MigrationName for CreateTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_cluster_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(cluster::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(cluster_group::Entity))
            .await?;
        Ok(())
    }
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Request that created `core-1` and `edge-2`.
pub const CREATE_REQUEST: Uuid = Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111);
/// Request that updated `edge-2`.
pub const UPDATE_REQUEST: Uuid = Uuid::from_u128(0x2222_2222_2222_2222_2222_2222_2222_2222);

async fn insert_cluster(
    db: &DatabaseConnection,
    name: &str,
    status: &str,
    description: &str,
    weight: Option<i32>,
    custom_field_data: serde_json::Value,
    attribute_data: serde_json::Value,
) -> Result<cluster::Model, DbErr> {
    let now = Utc::now();
    cluster::ActiveModel {
        name: Set(name.to_string()),
        status: Set(status.to_string()),
        description: Set(description.to_string()),
        weight: Set(weight),
        created: Set(now),
        last_updated: Set(now),
        custom_field_data: Set(custom_field_data),
        attribute_data: Set(attribute_data),
        ..Default::default()
    }
    .insert(db)
    .await
}

async fn insert_group(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
    description: &str,
    comments: &str,
) -> Result<cluster_group::Model, DbErr> {
    let now = Utc::now();
    cluster_group::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        description: Set(description.to_string()),
        comments: Set(comments.to_string()),
        created: Set(now),
        last_updated: Set(now),
        custom_field_data: Set(json!({})),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Three clusters, three groups and collaborators describing them:
///
/// | id | name   | status  | weight | tags       | cf site | attrs status |
/// |----|--------|---------|--------|------------|---------|--------------|
/// | 1  | core-1 | active  | 10     | prod       | ams1    | ok           |
/// | 2  | edge-2 | planned | -      |            | fra2    | degraded     |
/// | 3  | lab-3  | active  | 30     | prod, lab  | -       | ok           |
pub async fn seed(db: &DatabaseConnection) -> Result<FilterContext, DbErr> {
    insert_cluster(
        db,
        "core-1",
        "active",
        "Core cluster",
        Some(10),
        json!({"site": "ams1", "rack_count": 4}),
        json!({"status": "ok", "size": 10}),
    )
    .await?;
    insert_cluster(
        db,
        "edge-2",
        "planned",
        "edge deployment",
        None,
        json!({"site": "fra2", "rack_count": 1}),
        json!({"status": "degraded", "size": 3}),
    )
    .await?;
    insert_cluster(
        db,
        "lab-3",
        "active",
        "",
        Some(30),
        json!({}),
        json!({"status": "ok", "size": 42, "power": {"input": "dual"}}),
    )
    .await?;

    insert_group(db, "Backbone", "backbone", "", "").await?;
    insert_group(db, "Branch", "branch", "edge sites", "").await?;
    insert_group(db, "Labs", "labs", "", "scratch space at the edge").await?;

    let saved_filters = MemorySavedFilters::new([
        SavedFilter {
            id: 1,
            name: "Planned".to_string(),
            slug: "planned".to_string(),
            parameters: json!({"status": ["planned"]}),
        },
        SavedFilter {
            id: 2,
            name: "Heavy".to_string(),
            slug: "heavy".to_string(),
            parameters: json!({"weight__gte": 20}),
        },
    ]);

    let custom_fields = MemoryCustomFields::new([
        CustomField::new("site", CustomFieldType::Text).object_type(CLUSTER),
        CustomField::new("rack_count", CustomFieldType::Integer).object_type(CLUSTER),
    ]);

    let change_log = MemoryChangeLog::new();
    change_log.record(CLUSTER, 1, CREATE_REQUEST, ChangeAction::Create)?;
    change_log.record(CLUSTER, 2, CREATE_REQUEST, ChangeAction::Create)?;
    change_log.record(CLUSTER, 2, UPDATE_REQUEST, ChangeAction::Update)?;

    let tags = MemoryTags::new();
    tags.add_tag(1, "prod")?;
    tags.add_tag(2, "lab")?;
    tags.tag_object(1, CLUSTER, 1)?;
    tags.tag_object(1, CLUSTER, 3)?;
    tags.tag_object(2, CLUSTER, 3)?;

    Ok(FilterContext::new(db.get_database_backend())
        .with_saved_filters(Arc::new(saved_filters))
        .with_custom_fields(Arc::new(custom_fields))
        .with_change_log(Arc::new(change_log))
        .with_tags(Arc::new(tags)))
}

pub async fn setup() -> (DatabaseConnection, FilterContext) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let db = setup_test_db().await.expect("Failed to setup test database");
    let ctx = seed(&db).await.expect("Failed to seed test database");
    (db, ctx)
}

/// Names of the clusters matching `query`, ordered by id.
pub async fn cluster_names(
    db: &DatabaseConnection,
    ctx: &FilterContext,
    query: &str,
) -> Vec<String> {
    let filterset = FilterSet::<ClusterFilterSet>::new(QueryParams::parse(query), ctx)
        .await
        .expect("filter set should build");
    filterset
        .apply(cluster::Entity::find().order_by_asc(cluster::Column::Id))
        .await
        .expect("filters should apply")
        .all(db)
        .await
        .expect("query should run")
        .into_iter()
        .map(|cluster| cluster.name)
        .collect()
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub ctx: FilterContext,
}

async fn list_clusters(
    State(state): State<AppState>,
    params: QueryParams,
) -> Result<Json<Vec<cluster::Model>>, ApiError> {
    let filterset = FilterSet::<ClusterFilterSet>::new(params, &state.ctx).await?;
    let clusters = filterset
        .apply(cluster::Entity::find().order_by_asc(cluster::Column::Id))
        .await?
        .all(&state.db)
        .await?;
    Ok(Json(clusters))
}

pub fn setup_test_app(db: DatabaseConnection, ctx: FilterContext) -> Router {
    let api = Router::new()
        .route("/clusters", get(list_clusters))
        .with_state(AppState { db, ctx });

    Router::new().nest("/api/v1", api)
}
