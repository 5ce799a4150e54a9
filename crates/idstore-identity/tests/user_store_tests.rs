//! Integration tests for the users store
//!
//! Tests cover:
//! - Full-record round trips through every lookup path
//! - Soft delete visibility
//! - Claims and external logins
//! - Optimistic concurrency
//! - Custom user types embedding the base record

mod common;

use chrono::{Duration, Utc};
use common::{setup_stores, setup_stores_on};
use idstore_commons::ZERO_TIMESTAMP;
use idstore_identity::prelude::*;
use idstore_identity::{impl_identity_user, IdentityError};
use idstore_store::{string_key, AttributeValue, InMemoryTableBackend, TableBackend, TableEntity};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

fn fully_populated_user() -> User {
    let mut user = User::with_email("Alice", "alice@x.com");
    user.set_phone_number("+15550100");
    user.password_hash = Some("hash".to_string());
    user.security_stamp = Some("stamp".to_string());
    user.is_two_factor_enabled = true;
    user.is_lockout_enabled = true;
    user.access_failed_count = 2;
    user.add_claim(Claim::new("role", "admin"));
    user.add_login(UserLogin::new("github", "alice-gh", Some("GitHub".to_string())))
        .unwrap();
    user
}

/// Every field survives a save and each lookup path
#[tokio::test]
async fn test_round_trip_every_field() {
    let (_backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut user = fully_populated_user();
    users.set_email_confirmed(&mut user, true).unwrap();
    users.set_lockout_end_date(&mut user, Some(Utc::now() + Duration::hours(1)));
    users.create(&mut user, &cancel).await.unwrap();

    let by_id = users.find_by_id(user.id().as_str(), &cancel).await.unwrap();
    let by_name = users.find_by_normalized_user_name("ALICE", &cancel).await.unwrap();
    let by_email = users.find_by_normalized_email("ALICE@X.COM", &cancel).await.unwrap();
    let by_login = users.find_by_login("github", "alice-gh", &cancel).await.unwrap();

    for found in [by_id, by_name, by_email, by_login] {
        assert_eq!(found.as_ref(), Some(&user));
    }
}

/// Scenario: look up alice by email, then lock her out until a future instant
#[tokio::test]
async fn test_alice_lockout_timestamp_is_exact() {
    let (_backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut alice = User::with_email("alice", "alice@x.com");
    users.create(&mut alice, &cancel).await.unwrap();

    let mut found = users
        .find_by_normalized_email("ALICE@X.COM", &cancel)
        .await
        .unwrap()
        .expect("alice should be found by email");
    assert_eq!(found.id(), alice.id());
    assert_eq!(found.user_name, "alice");

    let lockout_end = Utc::now() + Duration::days(3);
    users.set_lockout_end_date(&mut found, Some(lockout_end));
    users.update(&mut found, &cancel).await.unwrap();

    let reloaded = users.find_by_id(alice.id().as_str(), &cancel).await.unwrap().unwrap();
    assert_eq!(users.get_lockout_end_date(&reloaded), Some(lockout_end));
}

/// Soft-deleted users disappear from lookups but stay in the table
#[tokio::test]
async fn test_soft_deleted_user_stays_in_table() {
    let (backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut user = fully_populated_user();
    users.create(&mut user, &cancel).await.unwrap();
    users.delete(&mut user, &cancel).await.unwrap();

    assert!(users.find_by_id(user.id().as_str(), &cancel).await.unwrap().is_none());
    assert!(users.find_by_normalized_user_name("ALICE", &cancel).await.unwrap().is_none());
    assert!(users.find_by_normalized_email("ALICE@X.COM", &cancel).await.unwrap().is_none());

    let raw = backend
        .get_item("users", &string_key("Id", user.id().as_str()))
        .await
        .unwrap()
        .expect("record should still be stored");
    let deleted_on = raw.get("DeletedOn").and_then(AttributeValue::as_s).unwrap();
    assert_ne!(deleted_on, ZERO_TIMESTAMP);

    let err = users.delete(&mut user, &cancel).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidState(_)));
}

/// A deleted user frees the name for a new account
#[tokio::test]
async fn test_name_reusable_after_delete() {
    let (_backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut first = User::new("bob");
    users.create(&mut first, &cancel).await.unwrap();
    users.delete(&mut first, &cancel).await.unwrap();

    let mut second = User::new("bob");
    users.create(&mut second, &cancel).await.unwrap();

    let found = users.find_by_normalized_user_name("BOB", &cancel).await.unwrap().unwrap();
    assert_eq!(found.id(), second.id());
}

/// Claims survive persistence and drive the claim lookup
#[tokio::test]
async fn test_claims_round_trip() {
    let (_backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let claims = vec![Claim::new("dept", "eng"), Claim::new("level", "3")];
    let mut user = User::new("carol");
    users.add_claims(&mut user, &claims).unwrap();
    users.create(&mut user, &cancel).await.unwrap();

    let stored = users.find_by_id(user.id().as_str(), &cancel).await.unwrap().unwrap();
    assert_eq!(users.get_claims(&stored), claims);

    let holders = users
        .get_users_for_claim(&Claim::new("dept", "eng"), &cancel)
        .await
        .unwrap();
    assert_eq!(holders.len(), 1);
    // Type and value must match on the same claim.
    let mixed = users
        .get_users_for_claim(&Claim::new("dept", "3"), &cancel)
        .await
        .unwrap();
    assert!(mixed.is_empty());
}

/// A login pair is unique per user and drives the login lookup
#[tokio::test]
async fn test_login_uniqueness_and_lookup() {
    let (_backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut user = User::new("dave");
    users.add_login(&mut user, UserLogin::new("google", "g-1", None)).unwrap();
    let err = users
        .add_login(&mut user, UserLogin::new("google", "g-1", Some("Google".to_string())))
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidState(_)));
    assert_eq!(users.get_logins(&user)[0].provider_display_name, "google");
    users.create(&mut user, &cancel).await.unwrap();

    let found = users.find_by_login("google", "g-1", &cancel).await.unwrap().unwrap();
    assert_eq!(found.id(), user.id());

    users.remove_login(&mut user, "google", "g-1").unwrap();
    users.update(&mut user, &cancel).await.unwrap();
    assert!(users.find_by_login("google", "g-1", &cancel).await.unwrap().is_none());
    // Removing it again is a no-op.
    users.remove_login(&mut user, "google", "g-1").unwrap();
}

/// Scan lookups follow pagination across pages
#[tokio::test]
async fn test_scan_lookup_follows_pages() {
    let (_backend, stores) = setup_stores_on::<User, Role>(InMemoryTableBackend::new().with_page_size(1)).await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    for name in ["erin", "finn", "gail"] {
        let mut user = User::new(name);
        users.add_claims(&mut user, &[Claim::new("team", "core")]).unwrap();
        users.create(&mut user, &cancel).await.unwrap();
    }
    let mut outsider = User::new("hugo");
    users.create(&mut outsider, &cancel).await.unwrap();

    let team = users
        .get_users_for_claim(&Claim::new("team", "core"), &cancel)
        .await
        .unwrap();
    assert_eq!(team.len(), 3);
}

/// A stale copy cannot overwrite a newer save
#[tokio::test]
async fn test_version_conflict_on_stale_save() {
    let (_backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut user = User::new("iris");
    users.create(&mut user, &cancel).await.unwrap();
    let mut stale = users.find_by_id(user.id().as_str(), &cancel).await.unwrap().unwrap();

    users.set_security_stamp(&mut user, "rotated").unwrap();
    users.update(&mut user, &cancel).await.unwrap();

    users.set_security_stamp(&mut stale, "lost").unwrap();
    let err = users.update(&mut stale, &cancel).await.unwrap_err();
    assert!(matches!(err, IdentityError::Storage(ref e) if e.is_conditional_check_failed()));

    // Creating the same record twice is also a conflict.
    let mut copy = User::new("jane");
    users.create(&mut copy, &cancel).await.unwrap();
    copy.set_version(None);
    assert!(users.create(&mut copy, &cancel).await.is_err());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AppUser {
    #[serde(flatten)]
    base: User,
    favourite_colour: Option<String>,
}

impl_identity_user!(AppUser, base);

/// Application-defined user types persist their extra fields
#[tokio::test]
async fn test_custom_user_type_round_trip() {
    let (_backend, stores) = setup_stores::<AppUser, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();

    let mut user = AppUser {
        base: User::with_email("kim", "kim@x.com"),
        favourite_colour: Some("teal".to_string()),
    };
    users.create(&mut user, &cancel).await.unwrap();

    let found = users
        .find_by_normalized_email("KIM@X.COM", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, user);
    assert_eq!(found.favourite_colour.as_deref(), Some("teal"));
}

/// Nothing is written once the token has fired
#[tokio::test]
async fn test_cancellation_before_io() {
    let (backend, stores) = setup_stores::<User, Role>().await;
    let users = &stores.users;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut user = User::new("lena");
    assert!(matches!(users.create(&mut user, &cancel).await, Err(IdentityError::Cancelled)));
    assert!(matches!(
        users.find_by_normalized_user_name("LENA", &cancel).await,
        Err(IdentityError::Cancelled)
    ));
    assert_eq!(backend.item_count("users"), 0);
}
