use chrono::Utc;
use filterset::stores::SeaStore;
use filterset::stores::entities::{custom_field, object_change, saved_filter, tag, tagged_item};
use filterset::{
    ChangeAction, ChangeLog, CustomFieldStore, CustomFieldType, FilterContext, FilterLogic,
    SavedFilterStore, TagIndex, TagRef,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Schema, Set};
use serde_json::json;
use uuid::Uuid;

mod common;
use common::{CLUSTER, cluster_names, setup_test_db};

async fn create_store_tables(db: &DatabaseConnection) {
    let schema = Schema::new(db.get_database_backend());
    let backend = db.get_database_backend();
    for statement in [
        schema.create_table_from_entity(saved_filter::Entity),
        schema.create_table_from_entity(custom_field::Entity),
        schema.create_table_from_entity(object_change::Entity),
        schema.create_table_from_entity(tag::Entity),
        schema.create_table_from_entity(tagged_item::Entity),
    ] {
        db.execute(backend.build(&statement)).await.unwrap();
    }
}

async fn seed_store_tables(db: &DatabaseConnection, request_id: Uuid) {
    saved_filter::ActiveModel {
        name: Set("Planned".to_string()),
        slug: Set("planned".to_string()),
        enabled: Set(true),
        parameters: Set(json!({"status": ["planned"]})),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    saved_filter::ActiveModel {
        name: Set("Retired".to_string()),
        slug: Set("retired".to_string()),
        enabled: Set(false),
        parameters: Set(json!({"status": ["offline"]})),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    for (name, field_type, filter_logic, weight) in [
        ("site", "text", "exact", 100),
        ("rack_count", "integer", "loose", 50),
        ("notes", "longtext", "disabled", 200),
        ("broken", "hologram", "loose", 300),
    ] {
        custom_field::ActiveModel {
            name: Set(name.to_string()),
            label: Set(None),
            field_type: Set(field_type.to_string()),
            filter_logic: Set(filter_logic.to_string()),
            object_types: Set(json!([CLUSTER])),
            weight: Set(weight),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }
    custom_field::ActiveModel {
        name: Set("asset_tag".to_string()),
        label: Set(Some("Asset tag".to_string())),
        field_type: Set("text".to_string()),
        filter_logic: Set("loose".to_string()),
        object_types: Set(json!(["dcim.device"])),
        weight: Set(10),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    for (object_id, action) in [(1, "create"), (2, "create"), (2, "update"), (1, "create")] {
        object_change::ActiveModel {
            time: Set(Utc::now()),
            request_id: Set(request_id),
            action: Set(action.to_string()),
            changed_object_type: Set(CLUSTER.to_string()),
            changed_object_id: Set(object_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    let prod = tag::ActiveModel {
        name: Set("Production".to_string()),
        slug: Set("prod".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    for (content_type, object_id) in [(CLUSTER, 1), (CLUSTER, 3), ("dcim.device", 7)] {
        tagged_item::ActiveModel {
            tag_id: Set(prod.id),
            content_type: Set(content_type.to_string()),
            object_id: Set(object_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_saved_filters_are_read_by_slug_and_id() {
    let db = setup_test_db().await.unwrap();
    create_store_tables(&db).await;
    seed_store_tables(&db, Uuid::new_v4()).await;
    let store = SeaStore::new(db);

    let by_slug = store.lookup(&["planned".to_string()], &[]).await.unwrap();
    assert_eq!(by_slug.len(), 1);
    assert_eq!(by_slug[0].parameters, json!({"status": ["planned"]}));

    let by_id = store.lookup(&[], &[by_slug[0].id]).await.unwrap();
    assert_eq!(by_id, by_slug);

    // Disabled saved filters are never returned.
    assert!(store.lookup(&["retired".to_string()], &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_fields_are_listed_per_content_type() {
    let db = setup_test_db().await.unwrap();
    create_store_tables(&db).await;
    seed_store_tables(&db, Uuid::new_v4()).await;
    let store = SeaStore::new(db);

    let fields = store.list_for_content_type(CLUSTER).await.unwrap();
    let names: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    // Ordered by weight; rows with an unknown type are skipped.
    assert_eq!(names, vec!["rack_count", "site", "notes"]);
    assert_eq!(fields[0].kind, CustomFieldType::Integer);
    assert_eq!(fields[1].filter_logic, FilterLogic::Exact);
    assert_eq!(fields[2].filter_logic, FilterLogic::Disabled);
}

#[tokio::test]
async fn test_change_log_returns_distinct_object_ids() {
    let db = setup_test_db().await.unwrap();
    create_store_tables(&db).await;
    let request_id = Uuid::new_v4();
    seed_store_tables(&db, request_id).await;
    let store = SeaStore::new(db);

    let created = store
        .object_ids_for_request(CLUSTER, request_id, &[ChangeAction::Create])
        .await
        .unwrap();
    assert_eq!(created, vec![1, 2]);

    let updated = store
        .object_ids_for_request(CLUSTER, request_id, &[ChangeAction::Update])
        .await
        .unwrap();
    assert_eq!(updated, vec![2]);

    let unknown = store
        .object_ids_for_request(CLUSTER, Uuid::new_v4(), &[ChangeAction::Create])
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn test_tag_index_resolves_slugs_and_ids() {
    let db = setup_test_db().await.unwrap();
    create_store_tables(&db).await;
    seed_store_tables(&db, Uuid::new_v4()).await;
    let store = SeaStore::new(db);

    let mut by_slug = store
        .tagged_object_ids(CLUSTER, &TagRef::Slug("prod".to_string()))
        .await
        .unwrap()
        .unwrap();
    by_slug.sort_unstable();
    assert_eq!(by_slug, vec![1, 3]);

    let by_id = store
        .tagged_object_ids("dcim.device", &TagRef::Id(1))
        .await
        .unwrap();
    assert_eq!(by_id, Some(vec![7]));

    assert_eq!(
        store
            .tagged_object_ids(CLUSTER, &TagRef::Slug("nope".to_string()))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_filter_context_from_connection() {
    let db = setup_test_db().await.unwrap();
    create_store_tables(&db).await;
    let request_id = Uuid::new_v4();
    seed_store_tables(&db, request_id).await;
    common::seed(&db).await.unwrap();

    let ctx = FilterContext::from_connection(&db);

    assert_eq!(cluster_names(&db, &ctx, "filter=planned").await, vec!["edge-2"]);
    assert_eq!(cluster_names(&db, &ctx, "tag=prod").await, vec!["core-1", "lab-3"]);
    assert_eq!(
        cluster_names(&db, &ctx, &format!("updated_by_request={request_id}")).await,
        vec!["edge-2"]
    );
    // `site` uses exact logic here.
    assert!(cluster_names(&db, &ctx, "cf_site=ams").await.is_empty());
    assert_eq!(cluster_names(&db, &ctx, "cf_site=ams1").await, vec!["core-1"]);
}
