mod common;

use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;

use common::{HOSPITAL, NURSE, between, next_snapshot, service, service_with_store, stays_quiet};
use nursejob_chat::Subscription;
use nursejob_types::events::ChangeEvent;
use nursejob_types::models::{Conversation, Message};

#[tokio::test]
async fn message_subscription_delivers_initial_and_appended_lists() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();
    chat.send_message(&id, NURSE, "Nok", "first").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Message>>();
    let sub = chat
        .subscribe_to_messages(&id, move |messages| {
            let _ = tx.send(messages);
        })
        .await
        .unwrap();
    assert!(sub.is_active());

    let initial = next_snapshot(&mut rx).await;
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].text, "first");

    let sent = chat.send_message(&id, HOSPITAL, "BKK", "second").await.unwrap();
    let update = next_snapshot(&mut rx).await;
    assert_eq!(update.len(), 2);
    assert_eq!(update.last(), Some(&sent));
    assert!(update.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    sub.unsubscribe();
}

#[tokio::test]
async fn message_subscription_ignores_other_conversations() {
    let chat = service();
    let watched = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();
    let other = chat.get_or_create_conversation(between(NURSE, HOSPITAL, Some("J1"))).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Message>>();
    let sub = chat
        .subscribe_to_messages(&watched, move |messages| {
            let _ = tx.send(messages);
        })
        .await
        .unwrap();
    assert!(next_snapshot(&mut rx).await.is_empty());

    chat.send_message(&other, NURSE, "Nok", "elsewhere").await.unwrap();
    assert!(stays_quiet(&mut rx).await);

    sub.unsubscribe();
}

#[tokio::test]
async fn conversation_subscription_follows_activity() {
    let chat = service();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Conversation>>();
    let sub = chat
        .subscribe_to_conversations(NURSE, move |conversations| {
            let _ = tx.send(conversations);
        })
        .await
        .unwrap();
    assert!(next_snapshot(&mut rx).await.is_empty());

    let id = chat.get_or_create_conversation(between(HOSPITAL, NURSE, None)).await.unwrap();
    let created = next_snapshot(&mut rx).await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, id);

    chat.send_message(&id, HOSPITAL, "BKK", "Can you cover Friday?").await.unwrap();
    let updated = next_snapshot(&mut rx).await;
    assert_eq!(updated[0].last_message, "Can you cover Friday?");
    assert_eq!(updated[0].unread_count, 1);

    chat.mark_conversation_as_read(&id, NURSE).await;
    let read = next_snapshot(&mut rx).await;
    assert_eq!(read[0].unread_count, 0);

    // Conversations of other users do not wake this listener
    chat.get_or_create_conversation(between(HOSPITAL, "other-nurse", None)).await.unwrap();
    assert!(stays_quiet(&mut rx).await);

    sub.unsubscribe();
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_stops_delivery() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Message>>();
    let sub = chat
        .subscribe_to_messages(&id, move |messages| {
            let _ = tx.send(messages);
        })
        .await
        .unwrap();
    next_snapshot(&mut rx).await;

    sub.unsubscribe();
    sub.unsubscribe();
    assert!(!sub.is_active());

    chat.send_message(&id, NURSE, "Nok", "anyone?").await.unwrap();
    assert!(stays_quiet(&mut rx).await);
}

#[tokio::test]
async fn dropping_the_handle_does_not_release_the_listener() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Message>>();
    let sub = chat
        .subscribe_to_messages(&id, move |messages| {
            let _ = tx.send(messages);
        })
        .await
        .unwrap();
    next_snapshot(&mut rx).await;
    drop(sub);

    chat.send_message(&id, NURSE, "Nok", "still listening").await.unwrap();
    let update = next_snapshot(&mut rx).await;
    assert_eq!(update.len(), 1);
}

#[tokio::test]
async fn each_subscription_gets_its_own_handle() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let (tx_a, mut rx_a) = mpsc::unbounded_channel::<Vec<Message>>();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel::<Vec<Message>>();
    let a = chat
        .subscribe_to_messages(&id, move |m| {
            let _ = tx_a.send(m);
        })
        .await
        .unwrap();
    let b = chat
        .subscribe_to_messages(&id, move |m| {
            let _ = tx_b.send(m);
        })
        .await
        .unwrap();
    assert_ne!(a.id(), b.id());
    next_snapshot(&mut rx_a).await;
    next_snapshot(&mut rx_b).await;

    a.unsubscribe();
    chat.send_message(&id, NURSE, "Nok", "only b hears this").await.unwrap();

    assert_eq!(next_snapshot(&mut rx_b).await.len(), 1);
    assert!(stays_quiet(&mut rx_a).await);

    b.unsubscribe();
}

#[tokio::test]
async fn lagging_listener_resyncs_with_a_fresh_snapshot() {
    let (chat, db) = service_with_store();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Message>>();
    let sub = chat
        .subscribe_to_messages(&id, move |messages| {
            let _ = tx.send(messages);
        })
        .await
        .unwrap();
    assert!(next_snapshot(&mut rx).await.is_empty());

    // Written without a bus event, so only a resync can surface it
    db.insert_message(&id, HOSPITAL, "BKK", "shift confirmed").unwrap();

    // Overflow the bus with unrelated changes before the listener gets to run
    for _ in 0..2_000 {
        chat.bus().publish(ChangeEvent::NotificationsChanged {
            user_id: "someone-else".to_string(),
        });
    }

    let resync = next_snapshot(&mut rx).await;
    assert_eq!(resync.len(), 1);
    assert_eq!(resync[0].text, "shift confirmed");
    assert!(sub.is_active());

    // The unrelated backlog does not produce more snapshots
    assert!(stays_quiet(&mut rx).await);

    chat.send_message(&id, NURSE, "Nok", "see you tonight").await.unwrap();
    assert_eq!(next_snapshot(&mut rx).await.len(), 2);

    sub.unsubscribe();
}

#[tokio::test]
async fn callback_can_unsubscribe_its_own_subscription() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let slot: Arc<OnceLock<Arc<Subscription>>> = Arc::new(OnceLock::new());
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Message>>();
    let own = slot.clone();
    let sub = chat
        .subscribe_to_messages(&id, move |messages| {
            // Stop after the first message arrives
            if !messages.is_empty() {
                if let Some(sub) = own.get() {
                    sub.unsubscribe();
                }
            }
            let _ = tx.send(messages);
        })
        .await
        .unwrap();
    let sub = Arc::new(sub);
    let _ = slot.set(sub.clone());
    assert!(next_snapshot(&mut rx).await.is_empty());

    chat.send_message(&id, NURSE, "Nok", "one").await.unwrap();
    assert_eq!(next_snapshot(&mut rx).await.len(), 1);
    assert!(!sub.is_active());

    chat.send_message(&id, NURSE, "Nok", "two").await.unwrap();
    assert!(stays_quiet(&mut rx).await);
}
