use sqlx::PgPool;

/// Handle that the `entities` processors run their queries against.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
