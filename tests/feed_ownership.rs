use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use feedhub::auth::token::TokenCodec;
use feedhub::auth::AuthManager;
use feedhub::config::{open_pool, FeedConfig};
use feedhub::ctx::ResolvedIdentity;
use feedhub::error::Error;
use feedhub::guard::authorize_mutation;
use feedhub::posts::{PostInput, PostStore};
use tempfile::tempdir;

async fn fixture(dir: &Path) -> (AuthManager, PostStore) {
    let config = FeedConfig::with_base_dir(dir);
    config.ensure_dirs().await.unwrap();
    let pool = open_pool(&config).await.unwrap();
    let codec = Arc::new(TokenCodec::new("test-secret", None));
    let auth = AuthManager::new(pool.clone(), codec, 3600).await.unwrap();
    let posts = PostStore::new(pool).await.unwrap();
    (auth, posts)
}

fn authed(user_id: &str) -> ResolvedIdentity {
    ResolvedIdentity::Authenticated {
        user_id: user_id.to_string(),
    }
}

fn input(title: &str) -> PostInput {
    PostInput::parse(title, "some content", "images/a.png").unwrap()
}

#[tokio::test]
async fn only_the_creator_may_delete() {
    let dir = tempdir().unwrap();
    let (auth, posts) = fixture(dir.path()).await;

    let ann = auth.signup("a@x.com", "Ann", "pass1").await.unwrap();
    let bob = auth.signup("b@x.com", "Bob", "pass2").await.unwrap();

    let post = posts.create(input("Ann's first post"), &ann.id).await.unwrap();

    // Bob is authenticated but not the owner.
    let denied = authorize_mutation(&authed(&bob.id), &post.creator.id).unwrap_err();
    assert!(matches!(denied, Error::Forbidden(_)));

    // Anonymous callers never get through.
    let denied = authorize_mutation(&ResolvedIdentity::Anonymous, &post.creator.id).unwrap_err();
    assert_eq!(denied, Error::Unauthenticated);

    // The owner succeeds, and the post is gone afterwards.
    authorize_mutation(&authed(&ann.id), &post.creator.id).unwrap();
    posts.remove(&post.id).await.unwrap();
    assert!(posts.find(&post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_never_reassigns_the_creator() {
    let dir = tempdir().unwrap();
    let (auth, posts) = fixture(dir.path()).await;

    let ann = auth.signup("a@x.com", "Ann", "pass1").await.unwrap();
    let post = posts.create(input("Original title"), &ann.id).await.unwrap();

    let updated = posts
        .update(&post.id, input("Rewritten title"))
        .await
        .unwrap();

    assert_eq!(updated.title, "Rewritten title");
    assert_eq!(updated.creator.id, ann.id);
    assert_eq!(updated.creator.name, "Ann");
}

#[tokio::test]
async fn orphaned_posts_keep_their_owner_id() {
    let dir = tempdir().unwrap();
    let (_, posts) = fixture(dir.path()).await;

    // Creator id that resolves to no user record at all.
    let post = posts.create(input("Orphan post"), "gone-user").await.unwrap();

    let found = posts.find(&post.id).await.unwrap().unwrap();
    assert_eq!(found.creator.id, "gone-user");
    assert_eq!(found.creator.name, "");

    // Still protected against everyone but the recorded owner.
    assert!(matches!(
        authorize_mutation(&authed("someone-else"), &found.creator.id),
        Err(Error::Forbidden(_))
    ));
    assert!(authorize_mutation(&authed("gone-user"), &found.creator.id).is_ok());
}

#[tokio::test]
async fn listing_pages_newest_first_with_total() {
    let dir = tempdir().unwrap();
    let (auth, posts) = fixture(dir.path()).await;

    let ann = auth.signup("a@x.com", "Ann", "pass1").await.unwrap();
    for title in ["First post!", "Second post!", "Third post!"] {
        posts.create(input(title), &ann.id).await.unwrap();
        // Distinct creation timestamps keep the ordering deterministic.
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (page_one, total) = posts.list_page(1, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page_one.len(), 2);
    assert_eq!(page_one[0].title, "Third post!");
    assert_eq!(page_one[1].title, "Second post!");

    let (page_two, total) = posts.list_page(2, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].title, "First post!");

    // Page 0 is clamped to the first page.
    let (clamped, _) = posts.list_page(0, 2).await.unwrap();
    assert_eq!(clamped[0].title, "Third post!");
}

#[tokio::test]
async fn huge_page_numbers_yield_an_empty_page() {
    let dir = tempdir().unwrap();
    let (auth, posts) = fixture(dir.path()).await;

    let ann = auth.signup("a@x.com", "Ann", "pass1").await.unwrap();
    posts.create(input("Lonely post"), &ann.id).await.unwrap();

    // The largest representable page must not wrap the offset.
    let (page, total) = posts.list_page(u32::MAX, 2).await.unwrap();
    assert_eq!(total, 1);
    assert!(page.is_empty());

    let (page, _) = posts.list_page(u32::MAX, u32::MAX).await.unwrap();
    assert!(page.is_empty());
}
