use sqlx::SqlitePool;

// Uniqueness the handlers rely on lives in the schema, not in code:
// skill names collate NOCASE, profile rows key on (user, skill, role),
// and match requests / conversations hold one row per unordered user
// pair via the min/max expression indexes.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        bio TEXT NOT NULL DEFAULT '',
        location TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS skills (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        category TEXT NOT NULL DEFAULT 'Other',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS user_skills (
        user_id TEXT NOT NULL,
        skill_id TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('teach', 'learn')),
        PRIMARY KEY (user_id, skill_id, role)
    )",
    "CREATE TABLE IF NOT EXISTS match_requests (
        id TEXT PRIMARY KEY,
        from_user TEXT NOT NULL,
        to_user TEXT NOT NULL,
        skill_offered TEXT NOT NULL,
        skill_requested TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS match_requests_pair
        ON match_requests (min(from_user, to_user), max(from_user, to_user))",
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        user_a TEXT NOT NULL,
        user_b TEXT NOT NULL,
        last_message_id TEXT,
        last_message_time TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS conversations_pair
        ON conversations (min(user_a, user_b), max(user_a, user_b))",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
];

pub async fn init(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let pool = test_pool().await;
        init(&pool).await.unwrap();

        sqlx::query("INSERT INTO users (id, username, email, password_hash, created_at) VALUES ('u1', 'ada', 'ada@example.com', 'x', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn skill_names_are_unique_ignoring_case() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO skills (id, name, created_at) VALUES ('s1', 'Guitar', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO skills (id, name, created_at) VALUES ('s2', 'guitar', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn one_match_request_per_user_pair_either_direction() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO match_requests (id, from_user, to_user, skill_offered, skill_requested, created_at) VALUES ('m1', 'u1', 'u2', 's1', 's2', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO match_requests (id, from_user, to_user, skill_offered, skill_requested, created_at) VALUES ('m2', 'u2', 'u1', 's2', 's1', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn one_conversation_per_user_pair_either_direction() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO conversations (id, user_a, user_b, created_at) VALUES ('c1', 'u1', 'u2', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO conversations (id, user_a, user_b, created_at) VALUES ('c2', 'u2', 'u1', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
    }
}
