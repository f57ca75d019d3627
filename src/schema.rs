use sqlx::PgPool;
use tracing::info;

use crate::StoreResult;

/// Idempotent bootstrap schema.
///
/// Foreign keys have no `ON DELETE CASCADE`; repositories remove dependent
/// rows inside the deleting transaction.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(254) NOT NULL UNIQUE,
    username VARCHAR(150) NOT NULL UNIQUE,
    first_name VARCHAR(30) NOT NULL,
    last_name VARCHAR(150) NOT NULL,
    is_superuser BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS auth_tokens (
    key UUID PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id BIGSERIAL PRIMARY KEY,
    subscriber_id BIGINT NOT NULL REFERENCES users(id),
    author_id BIGINT NOT NULL REFERENCES users(id),
    CONSTRAINT unique_following UNIQUE (subscriber_id, author_id),
    CONSTRAINT no_self_follow CHECK (subscriber_id <> author_id)
);

CREATE TABLE IF NOT EXISTS tags (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(30) NOT NULL,
    color VARCHAR(7) NOT NULL,
    slug VARCHAR(30) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS ingredients (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(30) NOT NULL,
    measurement_unit VARCHAR(10) NOT NULL,
    CONSTRAINT unique_ingredient UNIQUE (name, measurement_unit)
);

CREATE TABLE IF NOT EXISTS recipes (
    id BIGSERIAL PRIMARY KEY,
    author_id BIGINT NOT NULL REFERENCES users(id),
    name VARCHAR(50) NOT NULL,
    image TEXT NOT NULL DEFAULT '',
    text TEXT NOT NULL,
    cooking_time INTEGER NOT NULL CHECK (cooking_time >= 1),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS recipe_tags (
    recipe_id BIGINT NOT NULL REFERENCES recipes(id),
    tag_id BIGINT NOT NULL REFERENCES tags(id),
    PRIMARY KEY (recipe_id, tag_id)
);

CREATE TABLE IF NOT EXISTS recipe_ingredients (
    id BIGSERIAL PRIMARY KEY,
    recipe_id BIGINT NOT NULL REFERENCES recipes(id),
    ingredient_id BIGINT NOT NULL REFERENCES ingredients(id),
    amount INTEGER NOT NULL CHECK (amount >= 1),
    CONSTRAINT unique_recipe_ingredient UNIQUE (recipe_id, ingredient_id)
);

CREATE TABLE IF NOT EXISTS favorites (
    id BIGSERIAL PRIMARY KEY,
    recipe_id BIGINT NOT NULL REFERENCES recipes(id),
    user_id BIGINT NOT NULL REFERENCES users(id),
    CONSTRAINT unique_favorite UNIQUE (recipe_id, user_id)
);

CREATE TABLE IF NOT EXISTS shopping_cart (
    id BIGSERIAL PRIMARY KEY,
    recipe_id BIGINT NOT NULL REFERENCES recipes(id),
    user_id BIGINT NOT NULL REFERENCES users(id),
    CONSTRAINT unique_cart UNIQUE (recipe_id, user_id)
);
"#;

pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    info!("database schema is up to date");
    Ok(())
}
