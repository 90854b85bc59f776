//! Integration tests for adding, refreshing and removing repositories.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

mod common;

use common::{FakeGitHub, at, commit, setup_db};
use gmonitor::TrackError;
use gmonitor::store::{commits, repositories};
use gmonitor::sync::default_epoch;
use gmonitor::tracker::{refresh_repository, track_repository, untrack_repository};

#[tokio::test]
async fn track_stores_metadata_and_initial_commits() {
    let db = setup_db().await;
    let fake = FakeGitHub::new().with_repository("acme/widgets");
    fake.set_commits(
        "acme/widgets",
        vec![commit("h1", "alice", at(1)), commit("h2", "bob", at(2))],
    );

    let tracked = track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap();

    assert_eq!(tracked.repository.name, "acme/widgets");
    assert_eq!(tracked.repository.stars, 42);
    assert_eq!(tracked.commits_inserted, 2);
    assert!(tracked.initial_commit_error.is_none());
    assert_eq!(
        commits::count_for_repository(&db, tracked.repository.id).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn track_twice_is_rejected() {
    let db = setup_db().await;
    let fake = FakeGitHub::new().with_repository("acme/widgets");

    track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap();
    let err = track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackError::AlreadyTracked { .. }));
}

#[tokio::test]
async fn failed_initial_pull_keeps_the_repository() {
    let db = setup_db().await;
    let fake = FakeGitHub::new().with_repository("acme/widgets");
    fake.fail("acme/widgets");

    let tracked = track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap();

    assert_eq!(tracked.commits_inserted, 0);
    assert!(tracked.initial_commit_error.unwrap().contains("connection reset"));
    assert!(
        repositories::find_by_name(&db, "acme/widgets")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn untracked_repository_can_be_tracked_again() {
    let db = setup_db().await;
    let fake = FakeGitHub::new().with_repository("acme/widgets");

    let first = track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap();
    untrack_repository(&db, "acme/widgets").await.unwrap();
    assert!(repositories::find_all(&db).await.unwrap().is_empty());

    let again = track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap();
    assert_eq!(again.repository.id, first.repository.id);
    assert!(again.repository.deleted_at.is_none());

    let err = untrack_repository(&db, "acme/other").await.unwrap_err();
    assert!(matches!(err, TrackError::NotTracked { .. }));
}

#[tokio::test]
async fn refresh_requires_a_tracked_repository() {
    let db = setup_db().await;
    let fake = FakeGitHub::new().with_repository("acme/widgets");

    let err = refresh_repository(&db, &fake, "acme/widgets")
        .await
        .unwrap_err();
    assert!(matches!(err, TrackError::NotTracked { .. }));

    track_repository(&db, &fake, "acme/widgets", default_epoch())
        .await
        .unwrap();
    let refreshed = refresh_repository(&db, &fake, "acme/widgets").await.unwrap();
    assert_eq!(refreshed.name, "acme/widgets");
    assert_eq!(refreshed.watchers, 42);
}
