use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use time::OffsetDateTime;

use aigateway_provider_core::{CredentialStore, ProviderCredential, StoreError, StoreResult};

use crate::entities::credentials;

fn backend_err<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Grounded on `examples/original_source/app/storage/credentials.py`: a
/// single-row-per-provider upsert store, not the teacher's timed-cooldown
/// credential pool.
pub struct SeaOrmCredentialStore {
    db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_row(&self, provider_id: &str) -> StoreResult<Option<credentials::Model>> {
        credentials::Entity::find()
            .filter(credentials::Column::ProviderId.eq(provider_id))
            .one(&self.db)
            .await
            .map_err(backend_err)
    }
}

fn to_domain(row: credentials::Model) -> ProviderCredential {
    ProviderCredential {
        provider_id: row.provider_id,
        api_key: row.api_key,
        last_error: row.last_error,
        last_error_at: row.last_error_at,
        updated_at: row.updated_at,
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn upsert(&self, provider_id: &str, api_key: &str) -> StoreResult<()> {
        let now = OffsetDateTime::now_utc();
        match self.find_row(provider_id).await? {
            Some(row) => {
                let mut active: credentials::ActiveModel = row.into();
                active.api_key = Set(api_key.to_string());
                active.last_error = Set(None);
                active.last_error_at = Set(None);
                active.updated_at = Set(now);
                active.update(&self.db).await.map_err(backend_err)?;
            }
            None => {
                let active = credentials::ActiveModel {
                    provider_id: Set(provider_id.to_string()),
                    api_key: Set(api_key.to_string()),
                    last_error: Set(None),
                    last_error_at: Set(None),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(backend_err)?;
            }
        }
        Ok(())
    }

    async fn get(&self, provider_id: &str) -> StoreResult<Option<String>> {
        Ok(self.find_row(provider_id).await?.map(|row| row.api_key))
    }

    async fn list(&self) -> StoreResult<Vec<ProviderCredential>> {
        let rows = credentials::Entity::find().all(&self.db).await.map_err(backend_err)?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    async fn record_error(&self, provider_id: &str, code: &str) -> StoreResult<()> {
        let now = OffsetDateTime::now_utc();
        match self.find_row(provider_id).await? {
            Some(row) => {
                let mut active: credentials::ActiveModel = row.into();
                active.last_error = Set(Some(code.to_string()));
                active.last_error_at = Set(Some(now));
                active.updated_at = Set(now);
                active.update(&self.db).await.map_err(backend_err)?;
            }
            None => {
                let active = credentials::ActiveModel {
                    provider_id: Set(provider_id.to_string()),
                    api_key: Set(String::new()),
                    last_error: Set(Some(code.to_string())),
                    last_error_at: Set(Some(now)),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(backend_err)?;
            }
        }
        Ok(())
    }

    async fn clear_error(&self, provider_id: &str) -> StoreResult<()> {
        let Some(row) = self.find_row(provider_id).await? else {
            return Ok(());
        };
        if row.last_error.is_none() {
            return Ok(());
        }
        let mut active: credentials::ActiveModel = row.into();
        active.last_error = Set(None);
        active.last_error_at = Set(None);
        active.updated_at = Set(OffsetDateTime::now_utc());
        active.update(&self.db).await.map_err(backend_err)?;
        Ok(())
    }

    async fn delete(&self, provider_id: &str) -> StoreResult<bool> {
        let Some(row) = self.find_row(provider_id).await? else {
            return Ok(false);
        };
        let active: credentials::ActiveModel = row.into();
        active.delete(&self.db).await.map_err(backend_err)?;
        Ok(true)
    }
}
