use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nursejob_chat::{ChatService, Subscription};
use nursejob_types::events::{GatewayCommand, GatewayEvent, SubscriptionTopic};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Per-connection state: the live subscriptions a client opened and the
/// outbound event queue their snapshots are pushed into.
pub struct Session {
    chat: ChatService,
    user_id: String,
    events: mpsc::UnboundedSender<GatewayEvent>,
    subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl Session {
    pub fn new(chat: ChatService, user_id: String, events: mpsc::UnboundedSender<GatewayEvent>) -> Self {
        Self {
            chat,
            user_id,
            events,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.lock_subscriptions().len()
    }

    pub async fn handle_command(&self, cmd: GatewayCommand) {
        match cmd {
            GatewayCommand::SubscribeMessages { conversation_id } => {
                match self.chat.get_conversation(&conversation_id).await {
                    Ok(Some(conversation)) if conversation.has_participant(&self.user_id) => {}
                    Ok(_) => {
                        self.error(format!("no access to conversation {}", conversation_id));
                        return;
                    }
                    Err(e) => {
                        warn!("{} subscribe to {} failed: {}", self.user_id, conversation_id, e);
                        self.error("conversation lookup failed".to_string());
                        return;
                    }
                }

                let subscription_id = self.announce(SubscriptionTopic::Messages {
                    conversation_id: conversation_id.clone(),
                });
                let events = self.events.clone();
                let cid = conversation_id.clone();
                let result = self
                    .chat
                    .subscribe_to_messages(&conversation_id, move |messages| {
                        let _ = events.send(GatewayEvent::MessagesSnapshot {
                            subscription_id,
                            conversation_id: cid.clone(),
                            messages,
                        });
                    })
                    .await;
                self.register(subscription_id, result);
            }

            GatewayCommand::SubscribeConversations => {
                let subscription_id = self.announce(SubscriptionTopic::Conversations);
                let events = self.events.clone();
                let result = self
                    .chat
                    .subscribe_to_conversations(&self.user_id, move |conversations| {
                        let _ = events.send(GatewayEvent::ConversationsSnapshot {
                            subscription_id,
                            conversations,
                        });
                    })
                    .await;
                self.register(subscription_id, result);
            }

            GatewayCommand::SubscribeNotifications => {
                let subscription_id = self.announce(SubscriptionTopic::Notifications);
                let events = self.events.clone();
                let result = self
                    .chat
                    .subscribe_to_notifications(&self.user_id, move |notifications| {
                        let _ = events.send(GatewayEvent::NotificationsSnapshot {
                            subscription_id,
                            notifications,
                        });
                    })
                    .await;
                self.register(subscription_id, result);
            }

            GatewayCommand::Unsubscribe { subscription_id } => {
                let removed = self.lock_subscriptions().remove(&subscription_id);
                match removed {
                    Some(subscription) => {
                        subscription.unsubscribe();
                        let _ = self.events.send(GatewayEvent::Unsubscribed { subscription_id });
                    }
                    None => self.error(format!("unknown subscription {}", subscription_id)),
                }
            }
        }
    }

    /// Release every subscription this connection opened.
    pub fn release_all(&self) {
        let drained: Vec<Subscription> = self.lock_subscriptions().drain().map(|(_, s)| s).collect();
        for subscription in &drained {
            subscription.unsubscribe();
        }
        if !drained.is_empty() {
            debug!("{} released {} subscriptions", self.user_id, drained.len());
        }
    }

    /// Allocate an id and tell the client before the first snapshot arrives.
    fn announce(&self, topic: SubscriptionTopic) -> Uuid {
        let subscription_id = Uuid::new_v4();
        debug!("{} subscribing to {:?} as {}", self.user_id, topic, subscription_id);
        let _ = self.events.send(GatewayEvent::Subscribed { subscription_id, topic });
        subscription_id
    }

    fn register(&self, subscription_id: Uuid, result: nursejob_chat::Result<Subscription>) {
        match result {
            Ok(subscription) => {
                self.lock_subscriptions().insert(subscription_id, subscription);
            }
            Err(e) => {
                warn!("{} subscription {} failed: {}", self.user_id, subscription_id, e);
                self.error(format!("subscription {} failed", subscription_id));
            }
        }
    }

    fn error(&self, message: String) {
        let _ = self.events.send(GatewayEvent::Error { message });
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Handle a pre-authenticated WebSocket connection until either side closes.
pub async fn handle_connection(socket: WebSocket, chat: ChatService, user_id: String, name: String) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) connected to gateway", name, user_id);

    let ready = GatewayEvent::Ready {
        user_id: user_id.clone(),
        name: name.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let session = Arc::new(Session::new(chat, user_id.clone(), events_tx));

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward snapshots and command replies -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_session = session.clone();
    let user_id_recv = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => recv_session.handle_command(cmd).await,
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id_recv,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                        recv_session.error(format!("bad command: {}", e));
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish, then for the other to stop, so no
    // command can register a subscription after the release below
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    session.release_all();
    info!("{} ({}) disconnected from gateway", name, user_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => sender.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            Ok(())
        }
    }
}
