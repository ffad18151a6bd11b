//! Subscriptions and self-healing positions against SQLite

mod common;

use common::app;
use std::time::Duration;
use tokio::time::timeout;
use waitline_core::application::Subscription;
use waitline_core::domain::{EntryStatus, QueueEntry, UserInfo};

const WAIT: Duration = Duration::from_secs(5);

fn positions(entries: &[QueueEntry]) -> Vec<u32> {
    entries.iter().map(|e| e.position).collect()
}

/// Pull snapshots until one satisfies `done`
async fn next_matching<T>(sub: &mut Subscription<T>, done: impl Fn(&T) -> bool) -> T {
    timeout(WAIT, async {
        loop {
            let snapshot = sub.next().await.expect("subscription ended early");
            if done(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("no matching snapshot in time")
}

#[tokio::test]
async fn test_queue_subscription_sees_joins() {
    let app = app().await;
    let mut sub = app.engine.subscribe("b1").await.unwrap();

    let initial = timeout(WAIT, sub.next()).await.unwrap().unwrap();
    assert!(initial.is_empty());

    app.engine.join("b1", UserInfo::new("Ann")).await.unwrap();
    app.engine.join("b1", UserInfo::new("Bob")).await.unwrap();

    let snapshot = next_matching(&mut sub, |s| s.len() == 2).await;
    assert_eq!(positions(&snapshot), vec![1, 2]);
    assert_eq!(snapshot[0].user_info.name, "Ann");

    sub.unsubscribe().await;
}

#[tokio::test]
async fn test_listener_heals_gaps_after_cancel() {
    let app = app().await;

    let ann = app.engine.join("b1", UserInfo::new("Ann")).await.unwrap();
    app.engine.join("b1", UserInfo::new("Bob")).await.unwrap();
    app.engine.join("b1", UserInfo::new("Cid")).await.unwrap();

    let mut sub = app.engine.subscribe("b1").await.unwrap();
    next_matching(&mut sub, |s| s.len() == 3).await;

    // Nobody calls recalculate explicitly; the listener repairs 2,3 -> 1,2
    app.engine.cancel(&ann.id).await.unwrap();

    let healed = next_matching(&mut sub, |s| s.len() == 2 && positions(s) == vec![1, 2]).await;
    assert_eq!(healed[0].user_info.name, "Bob");

    sub.unsubscribe().await;
}

#[tokio::test]
async fn test_entry_subscription_follows_one_customer() {
    let app = app().await;

    let ann = app.engine.join("b1", UserInfo::new("Ann")).await.unwrap();
    let bob = app.engine.join("b1", UserInfo::new("Bob")).await.unwrap();

    let mut sub = app.engine.subscribe_to_entry(&bob.id).await.unwrap();
    let initial = timeout(WAIT, sub.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(initial.position, 2);

    app.engine.call(&ann.id).await.unwrap();
    app.engine.serve(&ann.id).await.unwrap();
    app.engine.recalculate_positions("b1").await.unwrap();

    let moved = next_matching(&mut sub, |e| e.as_ref().map(|e| e.position) == Some(1)).await;
    assert_eq!(moved.unwrap().status, EntryStatus::Waiting);

    app.engine.call(&bob.id).await.unwrap();
    let called = next_matching(&mut sub, |e| {
        e.as_ref().map(|e| e.status) == Some(EntryStatus::Called)
    })
    .await;
    assert!(called.unwrap().called_at.is_some());

    sub.unsubscribe().await;
}

#[tokio::test]
async fn test_unknown_entry_subscription_yields_none() {
    let app = app().await;

    let mut sub = app.engine.subscribe_to_entry("missing").await.unwrap();
    let initial = timeout(WAIT, sub.next()).await.unwrap().unwrap();
    assert!(initial.is_none());

    sub.unsubscribe().await;
}

#[tokio::test]
async fn test_unsubscribe_releases_the_feed() {
    let app = app().await;
    let before = app.engine.feed().listener_count();

    let mut sub = app.engine.subscribe("b1").await.unwrap();
    timeout(WAIT, sub.next()).await.unwrap().unwrap();
    assert_eq!(app.engine.feed().listener_count(), before + 1);

    sub.unsubscribe().await;
    assert_eq!(app.engine.feed().listener_count(), before);
}
