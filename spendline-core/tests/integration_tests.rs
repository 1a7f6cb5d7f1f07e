//! Integration tests for spendline-core
//!
//! These run the whole context against real DuckDB files. Time is driven by
//! a manual clock and simulated latencies are zero.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use spendline_core::adapters::duckdb::DuckDbStore;
use spendline_core::config::Config;
use spendline_core::ports::{KeyValueStore, ManualClock};
use spendline_core::services::WatchdogVerdict;
use spendline_core::{
    Category, Error, Expense, ExpenseDraft, ExpenseFilter, LoginForm, Route, SignupForm,
    SpendlineContext, SyncAction, SyncStatus,
};

// ============================================================================
// Test Helpers
// ============================================================================

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct horse";

fn create_test_store(temp_dir: &TempDir) -> Arc<DuckDbStore> {
    let db_path = temp_dir.path().join("spendline.duckdb");
    let store = DuckDbStore::new(&db_path).expect("Failed to open store");
    store.ensure_schema().expect("Failed to initialize schema");
    Arc::new(store)
}

fn create_context(store: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> SpendlineContext {
    SpendlineContext::with_store(Config::instant(), store, clock)
}

async fn signup_and_login(ctx: &SpendlineContext) {
    let cancel = CancellationToken::new();
    ctx.signup(
        &SignupForm {
            name: "Ada".to_string(),
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
        },
        &cancel,
    )
    .await
    .expect("signup failed");
    ctx.login(&LoginForm::new(EMAIL, PASSWORD), &cancel)
        .await
        .expect("login failed");
}

fn draft(title: &str, amount: &str, category: &str) -> ExpenseDraft {
    ExpenseDraft {
        title: title.to_string(),
        amount: amount.to_string(),
        category: Some(category.to_string()),
        date: None,
    }
}

fn titles(ctx: &SpendlineContext) -> Vec<String> {
    let (expenses, _) = ctx.list_expenses(&ExpenseFilter::default()).unwrap();
    expenses.into_iter().map(|e| e.title).collect()
}

/// Store that can be told to reject writes to one key prefix
struct FlakyStore {
    inner: Arc<dyn KeyValueStore>,
    failing_prefix: &'static str,
    armed: AtomicBool,
}

impl FlakyStore {
    fn new(inner: Arc<dyn KeyValueStore>, failing_prefix: &'static str) -> Self {
        Self {
            inner,
            failing_prefix,
            armed: AtomicBool::new(false),
        }
    }

    fn arm(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get_item(&self, key: &str) -> spendline_core::Result<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> spendline_core::Result<()> {
        if self.armed.load(Ordering::SeqCst) && key.starts_with(self.failing_prefix) {
            return Err(Error::storage("disk full"));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> spendline_core::Result<()> {
        self.inner.remove_item(key)
    }

    fn keys(&self) -> spendline_core::Result<Vec<String>> {
        self.inner.keys()
    }
}

// ============================================================================
// Authentication and sessions
// ============================================================================

#[tokio::test]
async fn test_session_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));

    {
        let ctx = create_context(store.clone(), clock.clone());
        signup_and_login(&ctx).await;
        ctx.submit_expense(None, draft("Rent", "1200", "Housing"), &CancellationToken::new())
            .await
            .unwrap();
    }

    // A fresh context over the same file picks the session back up
    clock.advance(Duration::from_secs(120));
    let ctx = create_context(store, clock);
    assert_eq!(ctx.open_dashboard().unwrap(), Route::Dashboard);
    assert_eq!(titles(&ctx), vec!["Rent"]);
}

#[tokio::test]
async fn test_wrong_password_keeps_user_on_login() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ctx = create_context(store.clone(), Arc::new(ManualClock::new(0)));
    signup_and_login(&ctx).await;
    ctx.logout().unwrap();

    let err = ctx
        .login(&LoginForm::new(EMAIL, "wrong"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidCredentials));
    assert!(store.get_item("session").unwrap().is_none());
    assert_eq!(ctx.route(Route::Dashboard).unwrap(), Route::Login);
}

#[tokio::test]
async fn test_email_is_case_insensitive() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(create_test_store(&temp_dir), Arc::new(ManualClock::new(0)));
    signup_and_login(&ctx).await;
    ctx.logout().unwrap();

    let session = ctx
        .login(&LoginForm::new("  ADA@Example.com ", PASSWORD), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(session.user.email, EMAIL);
}

#[tokio::test]
async fn test_watchdog_forces_logout_at_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let ctx = create_context(store.clone(), clock.clone());
    signup_and_login(&ctx).await;

    let watchdog = ctx.watchdog();
    clock.advance(Duration::from_secs(599));
    assert!(matches!(
        watchdog.check().unwrap(),
        WatchdogVerdict::Active { remaining_secs: 1 }
    ));

    clock.advance(Duration::from_secs(1));
    assert_eq!(watchdog.check().unwrap(), WatchdogVerdict::Expired);
    assert!(store.get_item("session").unwrap().is_none());
    assert_eq!(ctx.route(Route::Root).unwrap(), Route::Login);
}

// ============================================================================
// Offline queue and replay
// ============================================================================

#[tokio::test]
async fn test_offline_coffee_syncs_once_online() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let mut ctx = create_context(store.clone(), Arc::new(ManualClock::new(0)));
    signup_and_login(&ctx).await;
    let cancel = CancellationToken::new();

    ctx.set_offline(true).unwrap();
    ctx.submit_expense(None, draft("Coffee", "4.50", "Food & Dining"), &cancel)
        .await
        .unwrap();

    let queue = ctx.sync_service.pending().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].kind(), "add");
    assert!(titles(&ctx).is_empty());

    ctx.set_offline(false).unwrap();
    ctx.sync(&cancel).await.unwrap();

    let (expenses, _) = ctx.list_expenses(&ExpenseFilter::default()).unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].title, "Coffee");
    assert_eq!(expenses[0].amount, Decimal::new(450, 2));
    assert_eq!(expenses[0].category, Category::FoodAndDining);
    assert!(ctx.sync_service.pending().unwrap().is_empty());
    assert!(store.get_item("syncQueue_ada@example.com").unwrap().is_none());
}

#[tokio::test]
async fn test_offline_sequence_replays_net_effect() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let mut ctx = create_context(store.clone(), Arc::new(ManualClock::new(0)));
    signup_and_login(&ctx).await;
    let cancel = CancellationToken::new();

    let groceries = ctx
        .submit_expense(None, draft("Groceries", "52.10", "food"), &cancel)
        .await
        .unwrap()
        .expense;

    ctx.set_offline(true).unwrap();
    let bus = ctx
        .submit_expense(None, draft("Bus", "2.75", "transportation"), &cancel)
        .await
        .unwrap()
        .expense;
    let movie = ctx
        .submit_expense(None, draft("Movie", "12", "entertainment"), &cancel)
        .await
        .unwrap()
        .expense;
    ctx.submit_expense(Some(bus.id), draft("Bus pass", "30", "transportation"), &cancel)
        .await
        .unwrap();
    ctx.delete_expense(movie.id).unwrap();
    ctx.delete_expense(groceries.id).unwrap();

    assert_eq!(ctx.sync_service.pending().unwrap().len(), 5);
    assert_eq!(titles(&ctx), vec!["Groceries"]);

    assert_eq!(ctx.set_offline(false).unwrap(), SyncStatus::Syncing);
    let report = ctx.sync(&cancel).await.unwrap().unwrap();
    assert_eq!(report.total, 5);
    assert_eq!(report.skipped, 0);

    assert_eq!(titles(&ctx), vec!["Bus pass"]);
    let raw = store.get_item("expenses_ada@example.com").unwrap().unwrap();
    let persisted: Vec<Expense> = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].id, bus.id);
}

#[tokio::test]
async fn test_delete_then_readd_replays_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = create_context(create_test_store(&temp_dir), Arc::new(ManualClock::new(0)));
    signup_and_login(&ctx).await;
    let cancel = CancellationToken::new();

    let original = ctx
        .submit_expense(None, draft("Gym", "40", "Healthcare"), &cancel)
        .await
        .unwrap()
        .expense;

    ctx.set_offline(true).unwrap();
    let mut restored = original.clone();
    restored.title = "Gym (annual)".to_string();
    ctx.sync_service.enqueue(SyncAction::delete(original.id)).unwrap();
    ctx.sync_service.enqueue(SyncAction::add(restored.clone())).unwrap();

    ctx.set_offline(false).unwrap();
    let report = ctx.sync(&cancel).await.unwrap().unwrap();
    assert_eq!(report.applied, 2);

    let (expenses, _) = ctx.list_expenses(&ExpenseFilter::default()).unwrap();
    assert_eq!(expenses, vec![restored]);
}

#[tokio::test]
async fn test_replay_failure_keeps_queue_until_retry() {
    let temp_dir = TempDir::new().unwrap();
    let flaky = Arc::new(FlakyStore::new(create_test_store(&temp_dir), "expenses_"));
    let mut ctx = create_context(flaky.clone(), Arc::new(ManualClock::new(0)));
    signup_and_login(&ctx).await;
    let cancel = CancellationToken::new();

    ctx.set_offline(true).unwrap();
    ctx.submit_expense(None, draft("Taxi", "18", "Travel"), &cancel)
        .await
        .unwrap();

    flaky.arm(true);
    ctx.set_offline(false).unwrap();
    let err = ctx.sync(&cancel).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(ctx.sync_service.status().unwrap(), SyncStatus::Error);
    assert_eq!(ctx.sync_service.pending().unwrap().len(), 1);
    assert!(flaky.get_item("syncQueue_ada@example.com").unwrap().is_some());
    assert!(titles(&ctx).is_empty());

    // Nothing retries on its own
    assert!(ctx.sync(&cancel).await.unwrap().is_none());

    flaky.arm(false);
    assert_eq!(ctx.retry_sync().unwrap(), SyncStatus::Syncing);
    ctx.sync(&cancel).await.unwrap();
    assert_eq!(titles(&ctx), vec!["Taxi"]);
    assert!(ctx.sync_service.pending().unwrap().is_empty());
}

#[tokio::test]
async fn test_queue_survives_restart_and_resumes() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let clock = Arc::new(ManualClock::new(0));

    {
        let mut ctx = create_context(store.clone(), clock.clone());
        signup_and_login(&ctx).await;
        ctx.set_offline(true).unwrap();
        ctx.submit_expense(None, draft("Books", "35", "Education"), &CancellationToken::new())
            .await
            .unwrap();
    }

    // Restarted online: the leftover queue puts sync straight into `syncing`
    let ctx = create_context(store, clock);
    assert_eq!(ctx.open_dashboard().unwrap(), Route::Dashboard);
    assert_eq!(ctx.sync_service.status().unwrap(), SyncStatus::Syncing);

    ctx.sync(&CancellationToken::new()).await.unwrap();
    assert_eq!(titles(&ctx), vec!["Books"]);
}

#[tokio::test]
async fn test_users_do_not_see_each_other() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(create_test_store(&temp_dir), Arc::new(ManualClock::new(0)));
    let cancel = CancellationToken::new();

    signup_and_login(&ctx).await;
    ctx.submit_expense(None, draft("Coffee", "4.50", "food"), &cancel)
        .await
        .unwrap();
    ctx.logout().unwrap();

    ctx.signup(
        &SignupForm {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password: "hopper".to_string(),
            confirm_password: "hopper".to_string(),
        },
        &cancel,
    )
    .await
    .unwrap();
    ctx.login(&LoginForm::new("grace@example.com", "hopper"), &cancel)
        .await
        .unwrap();

    assert!(titles(&ctx).is_empty());
}
