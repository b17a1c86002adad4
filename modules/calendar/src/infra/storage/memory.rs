//! In-process document store.
//!
//! One `DashMap` per collection. Every write goes through a single entry guard,
//! which gives the per-document atomicity the repository ports promise. No
//! guard is held while another map (or another shard of the same map) is touched,
//! except the email index entry during user insert, which locks a different map.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::contract::model::{Event, Membership, Notification, Schedule, User};
use crate::domain::repo::{
    EventPatch, EventsRepository, NotificationsRepository, SchedulesRepository, UsersRepository,
};

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    events: DashMap<Uuid, Event>,
    schedules: DashMap<Uuid, Schedule>,
    notifications: DashMap<Uuid, Notification>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

fn membership_index(user: &mut User, membership: Membership) -> &mut Vec<Uuid> {
    match membership {
        Membership::Created => &mut user.events_created,
        Membership::Shared => &mut user.events_shared,
    }
}

/// `$pull` semantics: drop every occurrence, report whether anything changed.
fn pull_all(list: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = list.len();
    list.retain(|e| *e != id);
    list.len() != before
}

#[async_trait]
impl UsersRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let Some(id) = self.emails.get(email).map(|e| *e) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn insert(&self, user: User) -> anyhow::Result<bool> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                Ok(true)
            }
        }
    }

    async fn push_membership(
        &self,
        user_id: Uuid,
        membership: Membership,
        event_id: Uuid,
    ) -> anyhow::Result<bool> {
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        membership_index(&mut user, membership).push(event_id);
        Ok(true)
    }

    async fn pull_membership(
        &self,
        user_id: Uuid,
        membership: Membership,
        event_id: Uuid,
    ) -> anyhow::Result<bool> {
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        pull_all(membership_index(&mut user, membership), event_id);
        Ok(true)
    }

    async fn pull_shared_everywhere(&self, event_id: Uuid) -> anyhow::Result<u64> {
        let mut modified = 0;
        for mut user in self.users.iter_mut() {
            if pull_all(&mut user.events_shared, event_id) {
                modified += 1;
            }
        }
        Ok(modified)
    }
}

#[async_trait]
impl EventsRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        Ok(self.events.get(&id).map(|e| e.clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Event>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.events.get(id).map(|e| e.clone()))
            .collect())
    }

    async fn find_by_original(&self, parent_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let mut children: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.original_event_id == Some(parent_id))
            .map(|e| e.clone())
            .collect();
        children.sort_by_key(|e| e.start_time);
        Ok(children)
    }

    async fn insert(&self, event: Event) -> anyhow::Result<()> {
        self.events.insert(event.id, event);
        Ok(())
    }

    async fn apply_patch(&self, id: Uuid, patch: EventPatch) -> anyhow::Result<Option<Event>> {
        let Some(mut event) = self.events.get_mut(&id) else {
            return Ok(None);
        };
        event.title = patch.title;
        event.description = patch.description;
        event.start_time = patch.start_time;
        event.end_time = patch.end_time;
        event.location = patch.location;
        event.reminder = patch.reminder;
        event.is_recurring = patch.is_recurring;
        event.recurrence_frequency = patch.recurrence_frequency;
        for recipient in patch.add_shared_with {
            if !event.shared_with.contains(&recipient) {
                event.shared_with.push(recipient);
            }
        }
        Ok(Some(event.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        Ok(self.events.remove(&id).map(|(_, e)| e))
    }
}

#[async_trait]
impl SchedulesRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Schedule>> {
        Ok(self.schedules.get(&id).map(|s| s.clone()))
    }

    async fn insert(&self, schedule: Schedule) -> anyhow::Result<()> {
        self.schedules.insert(schedule.id, schedule);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.schedules.remove(&id).is_some())
    }

    async fn push_event(&self, schedule_id: Uuid, event_id: Uuid) -> anyhow::Result<bool> {
        let Some(mut schedule) = self.schedules.get_mut(&schedule_id) else {
            return Ok(false);
        };
        schedule.events.push(event_id);
        Ok(true)
    }

    async fn pull_event(&self, schedule_id: Uuid, event_id: Uuid) -> anyhow::Result<bool> {
        let Some(mut schedule) = self.schedules.get_mut(&schedule_id) else {
            return Ok(false);
        };
        pull_all(&mut schedule.events, event_id);
        Ok(true)
    }

    async fn pull_event_everywhere(&self, event_id: Uuid) -> anyhow::Result<u64> {
        let mut modified = 0;
        for mut schedule in self.schedules.iter_mut() {
            if pull_all(&mut schedule.events, event_id) {
                modified += 1;
            }
        }
        Ok(modified)
    }
}

#[async_trait]
impl NotificationsRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|n| n.clone()))
    }

    async fn find_by_recipient(&self, recipient: Uuid) -> anyhow::Result<Vec<Notification>> {
        let mut list: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.recipient == recipient)
            .map(|n| n.clone())
            .collect();
        list.sort_by_key(|n| n.reminder_time);
        Ok(list)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Notification>> {
        let mut due: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.is_pending() && n.reminder_time <= now)
            .map(|n| n.clone())
            .collect();
        due.sort_by_key(|n| n.reminder_time);
        Ok(due)
    }

    async fn insert(&self, notification: Notification) -> anyhow::Result<()> {
        self.notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn claim(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<bool> {
        let Some(mut notification) = self.notifications.get_mut(&id) else {
            return Ok(false);
        };
        if notification.sent_time.is_some() {
            return Ok(false);
        }
        notification.sent_time = Some(at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::{RecurrenceFrequency, Role, Timezone};

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            credential_hash: "x".into(),
            timezone: Timezone::Est,
            role: Role::User,
            schedule: Uuid::new_v4(),
            events_created: Vec::new(),
            events_shared: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn event(shared_with: Vec<Uuid>) -> Event {
        let start = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Review".into(),
            description: "Quarterly".into(),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            location: "HQ".into(),
            reminder: 10,
            is_recurring: false,
            recurrence_frequency: RecurrenceFrequency::NotApplicable,
            shared_with,
            created_by: Uuid::new_v4(),
            original_event_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        assert!(UsersRepository::insert(&store, user("a@b.io")).await.unwrap());
        assert!(!UsersRepository::insert(&store, user("a@b.io")).await.unwrap());
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn patch_merges_recipients_without_duplicates() {
        let store = InMemoryStore::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let e = event(vec![a, b]);
        let id = e.id;
        EventsRepository::insert(&store, e.clone()).await.unwrap();

        let patch = EventPatch {
            title: "Renamed".into(),
            description: e.description.clone(),
            start_time: e.start_time,
            end_time: e.end_time,
            location: e.location.clone(),
            reminder: e.reminder,
            is_recurring: false,
            recurrence_frequency: RecurrenceFrequency::NotApplicable,
            add_shared_with: vec![b, c],
        };
        let updated = store.apply_patch(id, patch).await.unwrap().unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.shared_with, vec![a, b, c]);
    }

    #[tokio::test]
    async fn claim_is_one_shot() {
        let store = InMemoryStore::new();
        let n = Notification {
            id: Uuid::new_v4(),
            recipient: Uuid::new_v4(),
            kind: "Event Reminder".into(),
            message: "soon".into(),
            reminder_time: Utc::now(),
            sent_time: None,
        };
        let id = n.id;
        NotificationsRepository::insert(&store, n).await.unwrap();

        let first = Utc::now();
        assert!(store.claim(id, first).await.unwrap());
        assert!(!store.claim(id, Utc::now()).await.unwrap());

        let stored = NotificationsRepository::find_by_id(&store, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sent_time, Some(first));
        assert!(store.find_due(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pull_everywhere_counts_modified_documents() {
        let store = InMemoryStore::new();
        let target = Uuid::new_v4();
        for events in [vec![target, target], vec![Uuid::new_v4()], vec![target]] {
            SchedulesRepository::insert(
                &store,
                Schedule {
                    id: Uuid::new_v4(),
                    title: "My Schedule".into(),
                    events,
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(store.pull_event_everywhere(target).await.unwrap(), 2);
        assert_eq!(store.pull_event_everywhere(target).await.unwrap(), 0);
    }
}
