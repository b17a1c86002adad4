use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{NewUser, Recipient, User, UserOverview};
use crate::domain::error::DomainError;
use crate::domain::events::CalendarDomainEvent;
use crate::domain::ports::{Clock, EventPublisher, ReconciliationSink};
use crate::domain::repo::UsersRepository;
use crate::domain::saga::Saga;
use crate::domain::schedules::ScheduleStore;
use crate::domain::validation;

/// User identities, email⇄id resolution and membership indexes.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UsersRepository>,
    schedules: ScheduleStore,
    events: Arc<dyn EventPublisher<CalendarDomainEvent>>,
    repairs: Arc<dyn ReconciliationSink>,
    clock: Arc<dyn Clock>,
}

impl UserDirectory {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        schedules: ScheduleStore,
        events: Arc<dyn EventPublisher<CalendarDomainEvent>>,
        repairs: Arc<dyn ReconciliationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            schedules,
            events,
            repairs,
            clock,
        }
    }

    /// Register a user together with their (empty) schedule.
    ///
    /// The schedule is written first so a stored user never lacks one; if the
    /// user insert then fails, the schedule is discarded again.
    #[instrument(
        name = "calendar.users.register",
        skip(self, new_user),
        fields(email = %new_user.email)
    )]
    pub async fn register_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Registering user");

        let first_name = validation::person_name("first_name", &new_user.first_name)?;
        let last_name = validation::person_name("last_name", &new_user.last_name)?;
        let email = validation::normalize_email(&new_user.email)?;
        if new_user.credential_hash.trim().is_empty() {
            return Err(DomainError::validation("credential_hash", "cannot be empty"));
        }
        let timezone = validation::parse_timezone(&new_user.timezone)?;
        let role = validation::parse_role(&new_user.role)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::email_already_exists(email));
        }

        let schedule = self.schedules.create_schedule().await?;
        let user = User {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email,
            credential_hash: new_user.credential_hash,
            timezone,
            role,
            schedule,
            events_created: Vec::new(),
            events_shared: Vec::new(),
            created_at: self.clock.now(),
        };

        let outcome = match self.users.insert(user.clone()).await {
            Ok(true) => Ok(()),
            // Lost a race with a concurrent registration of the same email.
            Ok(false) => Err(DomainError::email_already_exists(user.email.clone())),
            Err(e) => Err(DomainError::from(e)),
        };
        if let Err(e) = outcome {
            let mut saga = Saga::new(
                "register_user",
                user.id,
                self.repairs.clone(),
                self.clock.clone(),
            );
            saga.step("discard_schedule", self.schedules.discard_schedule(schedule))
                .await;
            return Err(e);
        }

        self.events.publish(&CalendarDomainEvent::UserRegistered {
            id: user.id,
            at: user.created_at,
        });
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    #[instrument(name = "calendar.users.get", skip(self), fields(user_id = %id))]
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "calendar.users.id_from_email", skip(self))]
    pub async fn get_id_from_email(&self, email: &str) -> Result<Uuid, DomainError> {
        let email = validation::normalize_email(email)?;
        self.users
            .find_by_email(&email)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| DomainError::user_not_found(email))
    }

    /// Resolve an id-or-email recipient to an existing user's id.
    pub async fn resolve_recipient(&self, recipient: &Recipient) -> Result<Uuid, DomainError> {
        match recipient {
            Recipient::Id(id) => self.get_user_by_id(*id).await.map(|u| u.id),
            Recipient::Email(email) => self.get_id_from_email(email).await,
        }
    }

    /// Resolve recipients for an event created by `creator`.
    ///
    /// Duplicates collapse (first occurrence wins); the creator is rejected.
    pub async fn resolve_recipients(
        &self,
        creator: Uuid,
        recipients: &[Recipient],
    ) -> Result<Vec<Uuid>, DomainError> {
        let mut resolved = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let id = self.resolve_recipient(recipient).await?;
            if id == creator {
                return Err(DomainError::validation(
                    "shared_with",
                    "cannot share an event with its creator",
                ));
            }
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }
        Ok(resolved)
    }

    /// Admin overview: every user with a populated schedule.
    /// A user whose schedule record is gone gets an empty view instead of an error.
    #[instrument(name = "calendar.users.list_with_schedules", skip(self))]
    pub async fn list_users_with_schedules(&self) -> Result<Vec<UserOverview>, DomainError> {
        let users = self.users.list().await?;
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let schedule = match self.schedules.get_schedule_by_id(user.schedule).await {
                Ok(view) => view,
                Err(DomainError::ScheduleNotFound { id }) => {
                    warn!(user_id = %user.id, schedule_id = %id, "user schedule missing");
                    self.schedules.empty_view(id)
                }
                Err(e) => return Err(e),
            };
            out.push(UserOverview { user, schedule });
        }
        debug!(count = out.len(), "listed users with schedules");
        Ok(out)
    }
}
