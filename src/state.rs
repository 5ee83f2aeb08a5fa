use crate::db::{DbPool, OrmConn};

/// Shared application state: the sqlx pool drives migrations and audit
/// writes, the SeaORM connection everything else.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}
