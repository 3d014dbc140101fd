use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(indexed)]
    pub provider_id: String,
    #[sea_orm(indexed)]
    pub created_at: OffsetDateTime,
    pub request_id: Option<String>,
    pub request_body: Json,
    pub response_body: Json,
}

impl ActiveModelBehavior for ActiveModel {}
