use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{run_pending, MIGRATOR};
    use crate::connect;

    #[tokio::test]
    async fn migrations_create_conversation_state_table() {
        let pool = connect("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let table_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master \
             WHERE type = 'table' AND name = 'conversation_state'",
        )
        .fetch_one(&pool)
        .await
        .expect("check conversation_state table")
        .get::<i64, _>("count");

        let index_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master \
             WHERE type = 'index' AND name = 'idx_conversation_state_channel_user'",
        )
        .fetch_one(&pool)
        .await
        .expect("check channel/user index")
        .get::<i64, _>("count");

        assert_eq!(table_count, 1);
        assert_eq!(index_count, 1);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let table_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master \
             WHERE type = 'table' AND name = 'conversation_state'",
        )
        .fetch_one(&pool)
        .await
        .expect("check conversation_state table removed")
        .get::<i64, _>("count");

        assert_eq!(table_count, 0);
    }
}
