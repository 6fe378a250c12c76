mod common;

use common::{HOSPITAL, NURSE, between, service};
use nursejob_chat::ChatError;

#[tokio::test]
async fn three_sequential_sends_count_three_unread() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, Some("J1"))).await.unwrap();

    for text in ["Hello", "Is the ICU shift still open?", "I can start Monday"] {
        chat.send_message(&id, NURSE, "Nok", text).await.unwrap();
    }

    let conversation = chat.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conversation.unread_count, 3);
    assert_eq!(conversation.last_message, "I can start Monday");
}

#[tokio::test]
async fn send_updates_summary_with_non_decreasing_timestamp() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();
    let before = chat.get_conversation(&id).await.unwrap().unwrap();

    let message = chat.send_message(&id, HOSPITAL, "BKK", "Interview tomorrow?").await.unwrap();
    assert_eq!(message.conversation_id, id);
    assert_eq!(message.sender_id, HOSPITAL);
    assert_eq!(message.sender_name, "BKK");
    assert!(!message.read);

    let after = chat.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(after.last_message, "Interview tomorrow?");
    assert!(after.last_message_at >= before.last_message_at);
    assert_eq!(after.unread_count, before.unread_count + 1);
}

#[tokio::test]
async fn message_is_kept_when_parent_conversation_is_missing() {
    let chat = service();

    let message = chat.send_message("no-such-conversation", NURSE, "Nok", "hello?").await.unwrap();

    let stored = chat.list_messages("no-such-conversation").await.unwrap();
    assert_eq!(stored, vec![message]);
    assert!(chat.get_conversation("no-such-conversation").await.unwrap().is_none());
}

#[tokio::test]
async fn blank_messages_are_rejected() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let err = chat.send_message(&id, NURSE, "Nok", "   ").await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));
    assert!(chat.list_messages(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn mark_read_clears_the_shared_counter() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();
    chat.send_message(&id, NURSE, "Nok", "one").await.unwrap();
    chat.send_message(&id, HOSPITAL, "BKK", "two").await.unwrap();

    // The sender marking read clears it for the recipient as well
    chat.mark_conversation_as_read(&id, NURSE).await;

    let conversation = chat.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conversation.unread_count, 0);
    assert_eq!(chat.get_unread_count(HOSPITAL).await.unwrap(), 0);
}

#[tokio::test]
async fn mark_read_on_missing_conversation_is_silent() {
    let chat = service();
    chat.mark_conversation_as_read("no-such-conversation", NURSE).await;
}

#[tokio::test]
async fn unread_count_sums_only_the_users_conversations() {
    let chat = service();
    let a = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();
    let b = chat.get_or_create_conversation(between(NURSE, HOSPITAL, Some("J1"))).await.unwrap();
    let c = chat.get_or_create_conversation(between("other-nurse", HOSPITAL, None)).await.unwrap();

    chat.send_message(&a, HOSPITAL, "BKK", "1").await.unwrap();
    chat.send_message(&b, HOSPITAL, "BKK", "2").await.unwrap();
    chat.send_message(&b, HOSPITAL, "BKK", "3").await.unwrap();
    chat.send_message(&c, HOSPITAL, "BKK", "4").await.unwrap();

    assert_eq!(chat.get_unread_count(NURSE).await.unwrap(), 3);
    assert_eq!(chat.get_unread_count("other-nurse").await.unwrap(), 1);
    assert_eq!(chat.get_unread_count(HOSPITAL).await.unwrap(), 4);
    assert_eq!(chat.get_unread_count("nobody").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_do_not_lose_increments() {
    let chat = service();
    let id = chat.get_or_create_conversation(between(NURSE, HOSPITAL, None)).await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let chat = chat.clone();
            let id = id.clone();
            tokio::spawn(async move {
                chat.send_message(&id, NURSE, "Nok", &format!("message {}", i)).await.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let conversation = chat.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conversation.unread_count, 20);
    assert_eq!(chat.list_messages(&id).await.unwrap().len(), 20);
}
