//! Demo data for `calendar-server run --seed`.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use calendar::contract::client::CalendarApi;
use calendar::contract::model::{NewEvent, NewUser, Recipient};

const DEMO_USERS: &[(&str, &str, &str, &str, &str)] = &[
    ("Admin", "User", "admin@domain.com", "EST", "admin"),
    ("Alice", "Moreau", "alice@domain.com", "EST", "user"),
    ("Bruno", "Castillo", "bruno@domain.com", "CST", "user"),
    ("Chen", "Walker", "chen@domain.com", "PST", "user"),
];

/// Register the demo users and a weekly meeting the admin shares with everyone.
pub async fn seed_demo(api: &dyn CalendarApi) -> Result<()> {
    let mut users = Vec::with_capacity(DEMO_USERS.len());
    for (first, last, email, timezone, role) in DEMO_USERS {
        let user = api
            .register_user(NewUser {
                first_name: (*first).to_string(),
                last_name: (*last).to_string(),
                email: (*email).to_string(),
                // Placeholder: credentials are hashed by the auth layer, not here.
                credential_hash: format!("seed:{email}"),
                timezone: (*timezone).to_string(),
                role: (*role).to_string(),
            })
            .await
            .with_context(|| format!("failed to seed user {email}"))?;
        users.push(user);
    }

    let Some((admin, others)) = users.split_first() else {
        return Ok(());
    };
    let start = Utc::now() + Duration::days(1);
    let event = api
        .create_event(NewEvent {
            title: "Weekly sync".to_string(),
            created_by: admin.id,
            description: "Status round for the whole team".to_string(),
            start_time: start,
            end_time: start + Duration::minutes(45),
            location: "Main room".to_string(),
            reminder: 15,
            is_recurring: true,
            recurrence_frequency: Some("weekly".to_string()),
            shared_with: others
                .iter()
                .map(|u| Recipient::Email(u.email.clone()))
                .collect(),
            number_of_occurrences: Some(4),
        })
        .await
        .context("failed to seed demo event")?;

    tracing::info!(
        users = users.len(),
        event_id = %event.id,
        "demo data seeded"
    );
    Ok(())
}
