//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::{Fields, RecordId, UserRecord};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uuid: String,
    #[sea_orm(unique)]
    pub email: String,
    pub digest: String,
    /// Extension fields as a JSON object
    pub fields: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain record
impl From<Model> for UserRecord {
    fn from(model: Model) -> Self {
        let fields = match model.fields {
            Json::Object(map) => map,
            _ => Fields::new(),
        };
        UserRecord {
            id: Some(RecordId(model.id)),
            uuid: model.uuid,
            email: model.email,
            digest: model.digest,
            fields,
        }
    }
}
