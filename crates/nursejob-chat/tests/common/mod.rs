#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use nursejob_chat::{ChatService, NewConversation};
use nursejob_db::Database;

pub const NURSE: &str = "nurse-nok";
pub const HOSPITAL: &str = "hospital-bkk";

pub fn service() -> ChatService {
    service_with_store().0
}

/// Service plus direct store access, for writes that bypass the change bus.
pub fn service_with_store() -> (ChatService, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    (ChatService::new(db.clone()), db)
}

pub fn between(user: &str, other: &str, job_id: Option<&str>) -> NewConversation {
    NewConversation {
        user_id: user.to_string(),
        user_name: format!("{} name", user),
        other_user_id: other.to_string(),
        other_user_name: format!("{} name", other),
        job_id: job_id.map(str::to_string),
        job_title: job_id.map(|_| "ICU night shift".to_string()),
        facility_name: job_id.map(|_| "Bangkok General Hospital".to_string()),
    }
}

/// Next snapshot delivered to a subscription callback.
pub async fn next_snapshot<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for snapshot")
        .expect("subscription channel closed")
}

/// True when nothing arrives within a short grace period.
pub async fn stays_quiet<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_millis(200), rx.recv()).await,
        Err(_) | Ok(None)
    )
}
