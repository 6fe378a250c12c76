use tracing::{debug, info};

use nursejob_types::events::ChangeEvent;
use nursejob_types::models::{Notification, NotificationPayload};

use crate::{ChatError, ChatService, Result, Subscription};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
}

impl ChatService {
    pub async fn create_notification(&self, user_id: &str, new: NewNotification) -> Result<Notification> {
        let uid = user_id.to_string();
        let notification: Notification = self
            .blocking(move |db| db.insert_notification(&uid, &new.title, &new.body, &new.payload))
            .await?
            .into();

        info!(
            "Notification {} ({}) created for {}",
            notification.id,
            notification.kind().as_str(),
            user_id
        );
        self.notifications_changed(user_id);

        Ok(notification)
    }

    /// The user's notifications, newest first.
    pub async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let uid = user_id.to_string();
        let rows = self.blocking(move |db| db.list_notifications_for_user(&uid)).await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    pub async fn get_notification(&self, notification_id: &str) -> Result<Option<Notification>> {
        let id = notification_id.to_string();
        let row = self.blocking(move |db| db.get_notification(&id)).await?;
        Ok(row.map(Notification::from))
    }

    /// Live view of the user's notifications, newest first.
    pub async fn subscribe_to_notifications<F>(&self, user_id: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Notification>) + Send + Sync + 'static,
    {
        let uid = user_id.to_string();
        let watched = uid.clone();

        self.listen(
            format!("notifications of {}", user_id),
            move |event| event.touches_notifications_of(&watched),
            move |db| {
                Ok(db
                    .list_notifications_for_user(&uid)?
                    .into_iter()
                    .map(Notification::from)
                    .collect())
            },
            callback,
        )
        .await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        let id = notification_id.to_string();
        let owner = self
            .blocking(move |db| db.mark_notification_read(&id))
            .await?
            .ok_or_else(|| ChatError::NotFound("notification", notification_id.to_string()))?;

        self.notifications_changed(&owner);
        Ok(())
    }

    /// Mark every unread notification of the user read. Returns how many
    /// records changed.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        let uid = user_id.to_string();
        let updated = self.blocking(move |db| db.mark_all_notifications_read(&uid)).await?;

        debug!("Marked {} notifications read for {}", updated, user_id);
        if updated > 0 {
            self.notifications_changed(user_id);
        }
        Ok(updated)
    }

    pub async fn delete_notification(&self, notification_id: &str) -> Result<()> {
        let id = notification_id.to_string();
        let owner = self
            .blocking(move |db| db.delete_notification(&id))
            .await?
            .ok_or_else(|| ChatError::NotFound("notification", notification_id.to_string()))?;

        debug!("Notification {} deleted", notification_id);
        self.notifications_changed(&owner);
        Ok(())
    }

    pub async fn unread_notification_count(&self, user_id: &str) -> Result<u64> {
        let uid = user_id.to_string();
        self.blocking(move |db| db.count_unread_notifications(&uid)).await
    }

    fn notifications_changed(&self, user_id: &str) {
        self.bus.publish(ChangeEvent::NotificationsChanged {
            user_id: user_id.to_string(),
        });
    }
}
