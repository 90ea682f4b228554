use super::*;
use crate::{
    model::Role,
    remote::RemoteError,
    session::SessionState,
    test_support::{Fixture, LOGOUT_DELAY},
};

fn expired() -> Error {
    Error::from_remote(
        RemoteError::response(400, "JWT expired"),
        WriteFailureReason::Database,
    )
}

#[test]
fn classify_follows_the_taxonomy() {
    let cases = [
        (expired(), ErrorClass::Authorization),
        (Error::NotAuthenticated, ErrorClass::Authorization),
        (
            Error::TransientIo {
                message: "reset".into(),
            },
            ErrorClass::Transient,
        ),
        (Error::validation("name is required"), ErrorClass::Domain),
        (Error::profile_unavailable("p1", None), ErrorClass::Domain),
        (Error::forbidden("no"), ErrorClass::Domain),
    ];

    for (error, class) in cases {
        assert_eq!(Reporter::classify(&error), class, "{error:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn authorization_expiry_logs_out_after_the_delay() {
    let fx = Fixture::signed_in(Role::Member).await;

    let class = fx
        .reporter
        .report(&expired(), &ActionLabel::general("Update member"));
    assert_eq!(class, ErrorClass::Authorization);
    assert_eq!(
        fx.reporter.current().unwrap().message,
        SESSION_EXPIRED_MESSAGE
    );

    tokio::time::sleep(LOGOUT_DELAY - Duration::from_millis(1)).await;
    assert!(matches!(
        fx.session.state(),
        SessionState::Authenticated(_)
    ));

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(fx.session.state(), SessionState::Anonymous);
    assert!(!fx.reporter.logout_pending());
}

#[tokio::test(start_paused = true)]
async fn overlapping_expiries_schedule_one_logout() {
    let fx = Fixture::signed_in(Role::Member).await;

    for _ in 0..3 {
        fx.reporter
            .report(&expired(), &ActionLabel::general("Load members"));
    }
    tokio::time::sleep(LOGOUT_DELAY * 2).await;

    let logouts = fx
        .sink
        .events()
        .into_iter()
        .filter(|event| *event == SyncEvent::ForcedLogout)
        .count();
    assert_eq!(logouts, 1);
    assert_eq!(fx.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn profile_unavailable_offers_recovery() {
    let fx = Fixture::new().await;

    fx.reporter.report(
        &Error::profile_unavailable("p1", None),
        &ActionLabel::session("Sign in"),
    );

    let notice = fx.reporter.current().unwrap();
    assert_eq!(notice.recovery, Some(RecoveryAction::ProfilePolicy));
    assert_eq!(notice.message, PROFILE_UNAVAILABLE_MESSAGE);
    assert!(!fx.reporter.logout_pending());
}

#[tokio::test]
async fn domain_failures_name_the_action_and_hint_by_category() {
    let fx = Fixture::new().await;
    let storage = Error::domain(WriteFailureReason::Storage, "bucket not found");
    let email = Error::domain(WriteFailureReason::Email, "provider down");
    let database = Error::domain(WriteFailureReason::Database, "insert failed");

    fx.reporter
        .report(&storage, &ActionLabel::storage("Upload document"));
    assert_eq!(
        fx.reporter.current().unwrap().message,
        format!("Upload document failed: bucket not found {STORAGE_HINT}")
    );

    fx.reporter
        .report(&email, &ActionLabel::email("Send communication"));
    assert!(fx.reporter.current().unwrap().message.ends_with(EMAIL_HINT));

    fx.reporter
        .report(&database, &ActionLabel::storage("Upload document"));
    assert_eq!(
        fx.reporter.current().unwrap().message,
        "Upload document failed: insert failed"
    );

    fx.reporter
        .report(&Error::validation("name is required"), &ActionLabel::general("Create event"));
    assert_eq!(
        fx.reporter.current().unwrap().message,
        "Create event failed: name is required"
    );
}

#[tokio::test]
async fn transient_failures_suggest_retry() {
    let fx = Fixture::new().await;

    fx.reporter.report(
        &Error::TransientIo {
            message: "timeout".into(),
        },
        &ActionLabel::general("Load events"),
    );

    let notice = fx.reporter.current().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.message.starts_with("Load events failed"));
    assert!(notice.message.contains("try again"));
}

#[tokio::test]
async fn reporter_without_session_only_notifies() {
    let reporter = Reporter::without_session();

    assert_eq!(
        reporter.report(&expired(), &ActionLabel::general("Load")),
        ErrorClass::Authorization
    );
    assert!(!reporter.logout_pending());
    assert_eq!(reporter.current().unwrap().message, SESSION_EXPIRED_MESSAGE);
}

#[test]
fn notify_and_dismiss_replace_the_single_notice() {
    let reporter = Reporter::without_session();
    let mut notices = reporter.notices();

    reporter.notify(NoticeLevel::Success, "Saved.");
    assert!(notices.has_changed().unwrap());
    assert_eq!(
        notices.borrow_and_update().as_ref().map(|n| n.message.as_str()),
        Some("Saved.")
    );

    reporter.dismiss();
    assert!(reporter.current().is_none());
}
