mod support;

use accounts::store::{CreateUserOutcome, NewUser, PgStore, Store, TokenRecord, User};
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Utc};
use support::TestDb;

fn new_user(n: u8) -> NewUser {
    NewUser {
        username: format!("user{n}"),
        email: format!("user{n}@mail.com"),
        password_hash: "old-hash".to_string(),
        activation_token: vec![b'a', n],
    }
}

async fn create(store: &PgStore, n: u8) -> Result<User> {
    match store.create_user(new_user(n)).await? {
        CreateUserOutcome::Created(user) => Ok(user),
        CreateUserOutcome::Conflict => bail!("user{n} conflicted"),
    }
}

async fn insert_token(
    store: &PgStore,
    digest: &[u8],
    user: Option<&User>,
    last_used_at: DateTime<Utc>,
) -> Result<()> {
    let inserted = store
        .insert_token(TokenRecord {
            token_hash: digest.to_vec(),
            user_id: user.map(|u| u.id),
            last_used_at,
        })
        .await?;
    if !inserted {
        bail!("digest {digest:?} already stored");
    }
    Ok(())
}

#[tokio::test]
async fn reset_swaps_password_activates_and_revokes_in_one_go() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    let user = create(&store, 1).await?;
    let other = create(&store, 2).await?;
    assert!(!user.active);
    insert_token(&store, b"session-1", Some(&user), Utc::now()).await?;
    insert_token(&store, b"session-2", Some(&user), Utc::now()).await?;
    insert_token(&store, b"other", Some(&other), Utc::now()).await?;
    store.set_password_reset_token(user.id, b"reset").await?;

    let completed = store.complete_password_reset(b"reset", "new-hash").await?;
    assert_eq!(completed, Some(user.id));

    let user = store
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| anyhow!("user missing"))?;
    assert_eq!(user.password_hash, "new-hash");
    assert!(user.active);
    assert!(user.activation_token.is_none());
    assert!(user.password_reset_token.is_none());
    assert!(store.find_token(b"session-1").await?.is_none());
    assert!(store.find_token(b"session-2").await?.is_none());
    assert!(store.find_token(b"other").await?.is_some());

    // single use
    assert_eq!(store.complete_password_reset(b"reset", "again").await?, None);
    Ok(())
}

#[tokio::test]
async fn reset_keeps_activation_state_of_active_user() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    let user = create(&store, 1).await?;
    assert!(store.activate_user(&[b'a', 1]).await?);
    store.set_password_reset_token(user.id, b"reset").await?;
    store.complete_password_reset(b"reset", "new-hash").await?;

    let user = store
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| anyhow!("user missing"))?;
    assert!(user.active);
    assert!(user.activation_token.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_reset_token_changes_nothing() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    let user = create(&store, 1).await?;
    insert_token(&store, b"session", Some(&user), Utc::now()).await?;
    store.set_password_reset_token(user.id, b"reset").await?;
    let before = store.find_user_by_id(user.id).await?;

    assert_eq!(store.complete_password_reset(b"unknown", "new-hash").await?, None);

    assert_eq!(store.find_user_by_id(user.id).await?, before);
    assert!(store.find_token(b"session").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    create(&store, 1).await?;
    let duplicate = NewUser {
        activation_token: b"another".to_vec(),
        ..new_user(1)
    };
    assert!(matches!(
        store.create_user(duplicate).await?,
        CreateUserOutcome::Conflict
    ));
    Ok(())
}

#[tokio::test]
async fn sweep_deletes_strictly_older_tokens() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    // whole seconds, so the column's microsecond precision cannot shift the boundary
    let cutoff = DateTime::from_timestamp(1_767_225_600, 0).ok_or_else(|| anyhow!("bad cutoff"))?;
    insert_token(&store, b"before", None, cutoff - Duration::seconds(1)).await?;
    insert_token(&store, b"at", None, cutoff).await?;
    insert_token(&store, b"after", None, cutoff + Duration::seconds(1)).await?;

    assert_eq!(store.delete_tokens_used_before(cutoff).await?, 1);
    assert!(store.find_token(b"before").await?.is_none());
    assert!(store.find_token(b"at").await?.is_some());
    assert!(store.find_token(b"after").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn touch_and_cascade_follow_the_schema() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    let user = create(&store, 1).await?;
    insert_token(&store, b"session", Some(&user), Utc::now() - Duration::days(1)).await?;
    assert!(store.touch_token(b"session", Utc::now()).await?);
    assert!(!store.touch_token(b"missing", Utc::now()).await?);

    store.delete_user(user.id).await?;
    assert!(store.find_token(b"session").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn listing_orders_by_creation_and_excludes_caller() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let store = PgStore::new(db.pool.clone());

    let mut users = Vec::new();
    for n in 1..=3 {
        users.push(create(&store, n).await?);
        assert!(store.activate_user(&[b'a', n]).await?);
    }
    create(&store, 4).await?;

    let page = store.list_active_users(None, 0, 2).await?;
    assert_eq!(page.total, 3);
    let ids: Vec<_> = page.users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![users[0].id, users[1].id]);

    let page = store.list_active_users(Some(users[0].id), 1, 1).await?;
    assert_eq!(page.total, 2);
    assert_eq!(page.users.first().map(|u| u.id), Some(users[2].id));
    Ok(())
}
