use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "extras_customfield")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub label: Option<String>,
    /// Custom field type name (`text`, `integer`, `multiselect`, ...)
    #[sea_orm(column_name = "type")]
    pub field_type: String,
    /// `disabled`, `loose` or `exact`
    pub filter_logic: String,
    /// JSON array of `app_label.model` content types
    pub object_types: Json,
    pub weight: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the field is assigned to `content_type`.
    #[must_use]
    pub fn applies_to(&self, content_type: &str) -> bool {
        self.object_types
            .as_array()
            .is_some_and(|types| types.iter().any(|t| t.as_str() == Some(content_type)))
    }
}

impl TryFrom<Model> for crate::custom_fields::CustomField {
    type Error = DbErr;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = serde_json::from_value(Json::String(model.field_type.clone()))
            .map_err(|e| DbErr::Json(format!("custom field {}: {e}", model.name)))?;
        let filter_logic = serde_json::from_value(Json::String(model.filter_logic.clone()))
            .map_err(|e| DbErr::Json(format!("custom field {}: {e}", model.name)))?;
        let object_types = model
            .object_types
            .as_array()
            .map(|types| {
                types
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: model.name,
            label: model.label,
            kind,
            filter_logic,
            object_types,
        })
    }
}
