use std::sync::{OnceLock, RwLock};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::entities::{credentials, events, provider_logs};

struct SharedDb {
    dsn: String,
    connection: DatabaseConnection,
}

static SHARED_DB: OnceLock<RwLock<Option<SharedDb>>> = OnceLock::new();

pub async fn connect_shared(dsn: &str) -> Result<DatabaseConnection, DbErr> {
    let lock = SHARED_DB.get_or_init(|| RwLock::new(None));
    if let Ok(guard) = lock.read()
        && let Some(shared) = guard.as_ref()
        && shared.dsn == dsn
    {
        return Ok(shared.connection.clone());
    }

    let connection = Database::connect(dsn).await?;
    if let Ok(mut guard) = lock.write() {
        *guard = Some(SharedDb { dsn: dsn.to_string(), connection: connection.clone() });
    }
    Ok(connection)
}

/// Entity-first schema sync; the on-disk schema is an implementation detail
/// of this store, not part of the core's contract (persistence engine choice
/// stays out of scope for callers).
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    for stmt in [
        backend.build(&schema.create_table_from_entity(credentials::Entity).if_not_exists()),
        backend.build(&schema.create_table_from_entity(events::Entity).if_not_exists()),
        backend.build(&schema.create_table_from_entity(provider_logs::Entity).if_not_exists()),
    ] {
        db.execute(stmt).await?;
    }
    Ok(())
}
