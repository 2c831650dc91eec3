/// End-to-end workflows: demo mode, in-memory gateway, HTTP gateway, and the
/// scheduler wired over a live store.
use teatime_habits::*;

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft(name: &str) -> HabitDraft {
    HabitDraft {
        name: name.to_string(),
        description: None,
        category: None,
        frequency: Frequency::Daily,
        reminder_time: None,
        color: None,
        icon: None,
    }
}

#[tokio::test]
async fn demo_mode_full_workflow() {
    let today = date(2024, 1, 10);
    let store = HabitStore::demo().with_today(move || today);
    store.fetch_habits().await;

    let habit = store.add_habit(draft("Water the Plants")).await.expect("created");
    assert!(store.complete_habit(habit.id, None).await);
    assert!(store.is_completed_today(habit.id));
    assert_eq!(store.get_streak(habit.id).unwrap().current_streak, 1);

    // Completing again the same day changes nothing
    let completions = store.completions();
    assert!(!store.complete_habit(habit.id, None).await);
    assert_eq!(store.completions(), completions);

    assert!(store.uncomplete_habit(habit.id, None).await);
    assert!(!store.is_completed_today(habit.id));
    assert_eq!(store.get_streak(habit.id).unwrap().current_streak, 0);

    store.reset();
    assert!(store.habits().is_empty());
}

#[tokio::test]
async fn connected_lifecycle_over_in_memory_gateway() {
    let today = date(2024, 1, 10);
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.set_today(today);
    let user = UserId::new();
    let store = HabitStore::connected(gateway.clone(), user).with_today(move || today);

    let habit = store.add_habit(draft("Morning Pages")).await.expect("created");

    // Three consecutive days, completed most-recent-last
    for offset in (0..3).rev() {
        assert!(store.complete_habit(habit.id, Some(today - Duration::days(offset))).await);
    }
    let streak = store.get_streak(habit.id).unwrap();
    assert_eq!(streak.current_streak, 3);
    assert_eq!(streak.longest_streak, 3);

    // A reload from the gateway reproduces the same state
    store.fetch_habits().await;
    assert_eq!(store.get_streak(habit.id).unwrap().current_streak, 3);
    assert_eq!(store.completions().len(), 3);

    // Gateway failure rolls an edit back
    gateway.set_fail_requests(true);
    assert!(!store.edit_habit(habit.id, HabitPatch::rename("Renamed")).await);
    assert_eq!(store.habit(habit.id).unwrap().name, "Morning Pages");

    gateway.set_fail_requests(false);
    assert!(store.delete_habit(habit.id).await);
    assert!(store.habits().is_empty());

    // Soft delete: the gateway no longer lists it but kept the row
    store.fetch_habits().await;
    assert!(store.habits().is_empty());
}

#[tokio::test]
async fn http_gateway_completion_reconciles_against_server() {
    let today = date(2024, 1, 10);
    let server = MockServer::start().await;
    let user = UserId::new();

    let habit = Habit::new(
        Some(user),
        "Evening Walk".to_string(),
        None,
        None,
        Frequency::Daily,
        None,
    )
    .unwrap();
    let mut streak = Streak::new(habit.id);
    streak.current_streak = 5;
    streak.longest_streak = 5;
    streak.last_completed_date = Some(today - Duration::days(1));

    Mock::given(method("GET"))
        .and(path(format!("/users/{}/habits", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![habit.clone()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/completions", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<HabitCompletion>::new()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/streaks", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![streak]))
        .mount(&server)
        .await;

    let server_completion_id = CompletionId::new();
    Mock::given(method("POST"))
        .and(path(format!("/habits/{}/complete", habit.id)))
        .and(body_json(serde_json::json!({ "date": "2024-01-10" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "completion_id": server_completion_id,
            "streak": 6,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = Arc::new(HttpGateway::new(server.uri()).expect("gateway"));
    let store = HabitStore::connected(gateway, user).with_today(move || today);
    store.fetch_habits().await;
    assert!(store.last_error().is_none());
    assert_eq!(store.get_streak(habit.id).unwrap().current_streak, 5);

    assert!(store.complete_habit(habit.id, Some(today)).await);

    let streak = store.get_streak(habit.id).unwrap();
    assert_eq!(streak.current_streak, 6);
    assert_eq!(streak.longest_streak, 6);
    let completions = store.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].id, server_completion_id);
}

#[tokio::test]
async fn http_gateway_failure_rolls_back_optimistic_state() {
    let today = date(2024, 1, 10);
    let server = MockServer::start().await;
    let user = UserId::new();

    let habit = Habit::new(
        Some(user),
        "Evening Walk".to_string(),
        None,
        None,
        Frequency::Daily,
        None,
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path(format!("/users/{}/habits", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![habit.clone()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/completions", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<HabitCompletion>::new()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/streaks", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Streak>::new()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/habits/{}/complete", habit.id)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateway = Arc::new(HttpGateway::new(server.uri()).expect("gateway"));
    let store = HabitStore::connected(gateway, user).with_today(move || today);
    store.fetch_habits().await;

    let completions_before = store.completions();
    let streak_before = store.get_streak(habit.id).unwrap();

    assert!(!store.complete_habit(habit.id, Some(today)).await);

    assert_eq!(store.completions(), completions_before);
    assert_eq!(store.get_streak(habit.id).unwrap(), streak_before);
    assert!(store.last_error().is_some());
}

/// Notifier recording deliveries for assertion
#[derive(Default)]
struct RecordingNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn is_available(&self) -> bool {
        true
    }

    fn notify(&self, notification: Notification) {
        self.delivered.lock().unwrap().push(notification);
    }
}

#[tokio::test]
async fn scheduler_reminds_only_incomplete_habits() {
    let today = date(2024, 1, 10);
    let store = Arc::new(HabitStore::demo().with_today(move || today));
    store.fetch_habits().await;

    let dir = TempDir::new().expect("temp dir");
    let local_store = LocalStore::open(dir.path().to_path_buf()).expect("local store");
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = ReminderScheduler::new(store.clone(), notifier.clone(), local_store);

    let habits = store.habits();
    let at = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
    for habit in &habits {
        scheduler.set_reminder(HabitReminder::daily(habit.id, at));
    }
    // One habit is already done today
    assert!(store.complete_habit(habits[0].id, None).await);

    scheduler.check_reminders_at(today.and_time(at), Utc::now());

    let delivered = notifier.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), habits.len() - 1);
    assert!(delivered.iter().all(|n| n.tag != format!("habit-reminder-{}", habits[0].id)));
}
