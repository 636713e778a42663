use diesel::prelude::*;
use f1w_core::error::WatcherError;
use f1w_core::model::NotificationTarget;

use crate::convert::{
    join_event_mask, notification_kind_from_str, notification_kind_to_str, split_event_mask,
};
use crate::models::{NewNotificationTargetRow, NotificationTargetRow};
use crate::pool::Store;
use crate::schema::notification_targets;

pub struct NotificationTargetRepo<'a> {
    store: &'a Store,
}

impl<'a> NotificationTargetRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        target: &NotificationTarget,
    ) -> Result<NotificationTarget, WatcherError> {
        let mut conn = self.store.writer().await;
        let new_row = to_new_row(target);
        diesel::insert_into(notification_targets::table)
            .values(&new_row)
            .execute(&mut *conn)?;
        let row: NotificationTargetRow = notification_targets::table
            .order(notification_targets::id.desc())
            .first(&mut *conn)?;
        Ok(row_to_domain(row))
    }

    pub async fn update(&self, target: &NotificationTarget) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::update(notification_targets::table.filter(notification_targets::id.eq(target.id)))
            .set(&to_new_row(target))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), WatcherError> {
        let mut conn = self.store.writer().await;
        diesel::delete(notification_targets::table.filter(notification_targets::id.eq(id)))
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<NotificationTarget, WatcherError> {
        let mut conn = self.store.read()?;
        let row: NotificationTargetRow = notification_targets::table
            .filter(notification_targets::id.eq(id))
            .first(&mut conn)
            .map_err(|_| WatcherError::not_found("NotificationTarget", id.to_string()))?;
        Ok(row_to_domain(row))
    }

    pub fn list_all(&self) -> Result<Vec<NotificationTarget>, WatcherError> {
        let mut conn = self.store.read()?;
        let rows: Vec<NotificationTargetRow> = notification_targets::table.load(&mut conn)?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }
}

fn to_new_row(target: &NotificationTarget) -> NewNotificationTargetRow {
    NewNotificationTargetRow {
        kind: notification_kind_to_str(target.kind).to_string(),
        url: target.url.clone(),
        name: target.name.clone(),
        event_mask: join_event_mask(&target.event_mask),
        webhook_secret: target.webhook_secret.clone(),
    }
}

fn row_to_domain(row: NotificationTargetRow) -> NotificationTarget {
    NotificationTarget {
        id: row.id,
        kind: notification_kind_from_str(&row.kind),
        url: row.url,
        name: row.name,
        event_mask: split_event_mask(&row.event_mask),
        webhook_secret: row.webhook_secret,
    }
}
