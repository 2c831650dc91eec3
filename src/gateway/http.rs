/// HTTP implementation of the persistence gateway
///
/// This module provides the concrete client for the remote habit service.
/// Every call maps to one request; a non-2xx response is surfaced as
/// `GatewayError::Status` so the store can roll back its optimistic state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use tracing::debug;

use crate::domain::{Habit, HabitCompletion, HabitId, HabitPatch, Streak, UserId};
use crate::gateway::{
    CompleteRequest, CompletionReceipt, GatewayError, PersistenceGateway, UncompletionReceipt,
};

/// Default per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP-based persistence gateway
///
/// Holds a reqwest client and the service base URL. The client is cheap to
/// clone and safe to share across tasks.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a new HTTP gateway against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("teatime-habits/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-2xx response to a gateway error
    fn check_status(response: Response, operation: &str) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Status { status: status.as_u16(), operation: operation.to_string() })
        }
    }
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    async fn fetch_habits(&self, user: UserId) -> Result<Vec<Habit>, GatewayError> {
        let url = self.url(&format!("/users/{}/habits", user));
        debug!(%user, "fetching habits");

        let response = self.client.get(&url).query(&[("active", "true")]).send().await?;
        let habits = Self::check_status(response, "fetch_habits")?.json().await?;
        Ok(habits)
    }

    async fn fetch_completions(
        &self,
        user: UserId,
        since: NaiveDate,
    ) -> Result<Vec<HabitCompletion>, GatewayError> {
        let url = self.url(&format!("/users/{}/completions", user));
        debug!(%user, %since, "fetching completions");

        let response =
            self.client.get(&url).query(&[("since", since.to_string())]).send().await?;
        let completions = Self::check_status(response, "fetch_completions")?.json().await?;
        Ok(completions)
    }

    async fn fetch_streaks(&self, user: UserId) -> Result<Vec<Streak>, GatewayError> {
        let url = self.url(&format!("/users/{}/streaks", user));
        debug!(%user, "fetching streaks");

        let response = self.client.get(&url).send().await?;
        let streaks = Self::check_status(response, "fetch_streaks")?.json().await?;
        Ok(streaks)
    }

    async fn insert_habit(&self, habit: &Habit) -> Result<Habit, GatewayError> {
        let url = self.url("/habits");
        debug!(habit_id = %habit.id, "inserting habit");

        let response = self.client.post(&url).json(habit).send().await?;
        let created = Self::check_status(response, "insert_habit")?.json().await?;
        Ok(created)
    }

    async fn update_habit(
        &self,
        habit_id: HabitId,
        patch: &HabitPatch,
    ) -> Result<(), GatewayError> {
        let url = self.url(&format!("/habits/{}", habit_id));
        debug!(%habit_id, "patching habit");

        let response = self.client.patch(&url).json(patch).send().await?;
        Self::check_status(response, "update_habit")?;
        Ok(())
    }

    async fn deactivate_habit(&self, habit_id: HabitId) -> Result<(), GatewayError> {
        let url = self.url(&format!("/habits/{}/deactivate", habit_id));
        debug!(%habit_id, "deactivating habit");

        let response = self.client.post(&url).send().await?;
        Self::check_status(response, "deactivate_habit")?;
        Ok(())
    }

    async fn complete(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<CompletionReceipt, GatewayError> {
        let url = self.url(&format!("/habits/{}/complete", habit_id));
        debug!(%habit_id, %date, "posting completion");

        let body = CompleteRequest { date };
        let response = self.client.post(&url).json(&body).send().await?;
        let receipt = Self::check_status(response, "complete")?.json().await?;
        Ok(receipt)
    }

    async fn uncomplete(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<UncompletionReceipt, GatewayError> {
        let url = self.url(&format!("/habits/{}/uncomplete", habit_id));
        debug!(%habit_id, %date, "posting uncompletion");

        let body = CompleteRequest { date };
        let response = self.client.post(&url).json(&body).send().await?;
        let receipt = Self::check_status(response, "uncomplete")?.json().await?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[tokio::test]
    async fn complete_posts_date_body_and_parses_receipt() {
        let server = MockServer::start().await;
        let habit_id = HabitId::new();
        let completion_id = crate::domain::CompletionId::new();

        Mock::given(method("POST"))
            .and(path(format!("/habits/{}/complete", habit_id)))
            .and(body_json(serde_json::json!({ "date": "2024-01-10" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "completion_id": completion_id,
                "streak": 6,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(server.uri()).expect("gateway");
        let receipt = gateway.complete(habit_id, sample_date()).await.expect("receipt");

        assert_eq!(receipt.completion_id, completion_id);
        assert_eq!(receipt.streak, 6);
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_error() {
        let server = MockServer::start().await;
        let habit_id = HabitId::new();

        Mock::given(method("POST"))
            .and(path(format!("/habits/{}/complete", habit_id)))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(server.uri()).expect("gateway");
        let result = gateway.complete(habit_id, sample_date()).await;

        match result {
            Err(GatewayError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_habits_round_trips_json() {
        let server = MockServer::start().await;
        let user = UserId::new();
        let habit = Habit::new(
            Some(user),
            "Morning Tea".to_string(),
            None,
            Some("mindfulness".to_string()),
            Frequency::Daily,
            None,
        )
        .unwrap();

        Mock::given(method("GET"))
            .and(path(format!("/users/{}/habits", user)))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![habit.clone()]))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(server.uri()).expect("gateway");
        let habits = gateway.fetch_habits(user).await.expect("habits");

        assert_eq!(habits, vec![habit]);
    }
}
