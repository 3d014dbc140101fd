use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(indexed)]
    pub ts: OffsetDateTime,
    pub level: String,
    pub kind: String,
    pub request_id: Option<String>,
    pub provider_from: Option<String>,
    pub provider_to: Option<String>,
    pub model: Option<String>,
    pub error_code: Option<String>,
    pub message: Option<String>,
    pub meta: Option<Json>,
}

impl ActiveModelBehavior for ActiveModel {}
