use sqlx::SqlitePool;

use super::{Post, PostCreatePayload, PostUpdatePayload};
use crate::{
    models::user::{self, User, UserId, UserRole},
    tests::TEST_PASSWORD_HASH,
};

/// Generate a PostCreatePayload for testing.
/// Parameter `i` controls the value of the fields, just to make sure that the objects
/// don't all look identical.
pub fn make_create_payload(i: usize) -> PostCreatePayload {
    PostCreatePayload {
        title: format!("Test post {i}"),
        body: format!("Test body {i}"),
    }
}

/// Generate a PostUpdatePayload for testing.
pub fn make_update_payload(i: usize) -> PostUpdatePayload {
    PostUpdatePayload {
        title: format!("Updated post {i}"),
        body: format!("Updated body {i}"),
    }
}

/// Insert a user whose password is [crate::tests::TEST_PASSWORD].
pub async fn make_user(pool: &SqlitePool, user_name: &str) -> User {
    user::queries::create_raw(
        pool,
        UserId::new(),
        user_name,
        TEST_PASSWORD_HASH,
        UserRole::User,
    )
    .await
    .expect("Creating user")
}

/// Insert a post owned by `user_name`, which must already exist.
pub async fn make_post(pool: &SqlitePool, user_name: &str, i: usize) -> Post {
    let mut tx = pool.begin().await.unwrap();
    let post = super::queries::create(&mut *tx, user_name, make_create_payload(i))
        .await
        .expect("Creating post");
    tx.commit().await.unwrap();
    post
}
