use super::*;
use crate::{
    config::FunctionConfig,
    error::ErrorClass,
    model::Role,
    remote::{FaultPoint, MemoryRemote, RemoteError},
    test_support::{Fixture, SECRET, row},
};
use serde_json::json;

async fn settle() {
    // let the auth-feed pump drain
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ---- start -------------------------------------------------------------

#[tokio::test]
async fn start_without_session_is_anonymous() {
    let fx = Fixture::new().await;

    assert_eq!(fx.session.state(), SessionState::Anonymous);
    assert!(!*fx.session.loading().borrow());
}

#[tokio::test]
async fn start_resolves_an_existing_session() {
    let remote = MemoryRemote::new();
    let principal = remote.add_account("ana@example.org", SECRET);
    remote.seed(
        "profiles",
        row(json!({ "id": principal, "name": "Ana", "email": "ana@example.org", "role": "Finance" })),
    );
    remote.sign_in("ana@example.org", SECRET).await.unwrap();

    let keeper = SessionKeeper::start(remote.clone(), remote.clone()).await;

    assert_eq!(keeper.identity().unwrap().role, Role::Finance);
}

// ---- login -------------------------------------------------------------

#[tokio::test]
async fn login_resolves_profile() {
    let fx = Fixture::new().await;
    let principal = fx.account("ana@example.org", "Ana", Role::Member);

    let profile = fx.session.login("ana@example.org", SECRET).await.unwrap();

    assert_eq!(profile.id.as_str(), principal);
    assert_eq!(fx.session.state(), SessionState::Authenticated(profile));
    assert!(fx.session.fault().is_none());
}

#[tokio::test]
async fn wrong_secret_is_rejected_and_anonymous() {
    let fx = Fixture::new().await;
    fx.account("ana@example.org", "Ana", Role::Member);

    let err = fx.session.login("ana@example.org", "nope").await.unwrap_err();

    assert!(matches!(err, Error::SignInRejected { .. }));
    assert_eq!(fx.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn unreachable_auth_is_transient() {
    let fx = Fixture::new().await;
    fx.remote
        .fail_next(FaultPoint::SignIn, RemoteError::network("dns failure"));

    let err = fx.session.login("ana@example.org", SECRET).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Transient);
}

#[tokio::test]
async fn missing_profile_row_fails_closed() {
    let fx = Fixture::new().await;
    fx.remote.add_account("ghost@example.org", SECRET);

    let err = fx.session.login("ghost@example.org", SECRET).await.unwrap_err();
    settle().await;

    assert!(matches!(err, Error::ProfileUnavailable { detail: None, .. }));
    assert_eq!(fx.session.state(), SessionState::Anonymous);
    assert!(fx.remote.current_session().await.unwrap().is_none());
    assert_eq!(fx.session.take_fault(), Some(err));
    assert!(fx.session.fault().is_none());
}

#[tokio::test]
async fn recursive_policy_error_fails_closed() {
    let fx = Fixture::new().await;
    fx.account("ana@example.org", "Ana", Role::SuperAdmin);
    fx.remote.deny_reads(
        "profiles",
        Some(RemoteError::response(
            500,
            "infinite recursion detected in policy for relation \"profiles\"",
        )),
    );

    let err = fx.session.login("ana@example.org", SECRET).await.unwrap_err();
    settle().await;

    let Error::ProfileUnavailable { detail, .. } = &err else {
        panic!("expected ProfileUnavailable, got {err:?}");
    };
    assert!(detail.as_deref().unwrap().contains("infinite recursion"));
    assert_eq!(fx.session.state(), SessionState::Anonymous);
    assert!(fx.remote.current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn hidden_profile_row_fails_closed() {
    let fx = Fixture::new().await;
    fx.account("ana@example.org", "Ana", Role::Member);
    fx.remote.deny_reads("profiles", None);

    let err = fx.session.login("ana@example.org", SECRET).await.unwrap_err();

    assert!(matches!(err, Error::ProfileUnavailable { .. }));
    assert!(fx.remote.current_session().await.unwrap().is_none());
}

// ---- logout ------------------------------------------------------------

#[tokio::test]
async fn logout_is_idempotent_and_swallows_remote_failures() {
    let fx = Fixture::signed_in(Role::Member).await;

    fx.remote
        .fail_next(FaultPoint::SignOut, RemoteError::network("offline"));
    fx.session.logout().await;
    fx.session.logout().await;

    assert_eq!(fx.session.state(), SessionState::Anonymous);
    assert!(fx.session.require_identity().is_err());
}

#[tokio::test]
async fn remote_sign_out_reaches_the_keeper() {
    let fx = Fixture::signed_in(Role::Member).await;
    let mut state = fx.session.subscribe();

    fx.remote.sign_out().await.unwrap();
    state
        .wait_for(|state| *state == SessionState::Anonymous)
        .await
        .unwrap();
}

#[tokio::test]
async fn dropping_the_keeper_unsubscribes() {
    let fx = Fixture::new().await;
    assert_eq!(fx.remote.listener_count(), 1);

    let Fixture {
        remote,
        session,
        reporter,
        ..
    } = fx;
    drop(reporter);
    drop(session);

    assert_eq!(remote.listener_count(), 0);
}

// ---- roster ------------------------------------------------------------

#[tokio::test]
async fn roster_is_loaded_for_super_admins_only() {
    let fx = Fixture::new().await;
    fx.account("root@example.org", "Root", Role::SuperAdmin);
    fx.account("fin@example.org", "Fin", Role::Finance);

    fx.session.login("root@example.org", SECRET).await.unwrap();
    assert_eq!(fx.session.profiles().borrow().len(), 2);

    fx.session.logout().await;
    assert!(fx.session.profiles().borrow().is_empty());

    fx.session.login("fin@example.org", SECRET).await.unwrap();
    assert!(fx.session.profiles().borrow().is_empty());
}

// ---- user admin --------------------------------------------------------

fn admin(fx: &Fixture) -> UserAdmin {
    UserAdmin::new(
        Arc::clone(&fx.session),
        fx.remote.clone(),
        fx.remote.clone(),
        Arc::clone(&fx.reporter),
        FunctionConfig::default(),
    )
}

fn new_user() -> NewUser {
    NewUser {
        email: "new@example.org".into(),
        password: "initial-secret".into(),
        name: "New".into(),
        role: Role::Member,
    }
}

#[tokio::test]
async fn only_super_admins_manage_users() {
    let fx = Fixture::signed_in(Role::Finance).await;
    fx.remote
        .register_function("create-user", Arc::new(|_| Ok(json!({}))));

    let err = admin(&fx).create_user(&new_user()).await.unwrap_err();

    assert!(matches!(err, Error::Forbidden { .. }));
    assert!(fx.remote.invocations().is_empty());
}

#[tokio::test]
async fn create_user_invokes_function() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    fx.remote
        .register_function("create-user", Arc::new(|_| Ok(json!({ "id": "u9" }))));

    admin(&fx).create_user(&new_user()).await.unwrap();

    let (name, body) = fx.remote.invocations().pop().unwrap();
    assert_eq!(name, "create-user");
    assert_eq!(body["role"], json!("Member"));
}

#[tokio::test]
async fn set_role_rejects_own_profile() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let me = fx.session.identity().unwrap();

    let err = admin(&fx).set_role(&me.id, Role::Member).await.unwrap_err();

    assert!(matches!(err, Error::Forbidden { .. }));
    assert_eq!(fx.session.identity().unwrap().role, Role::SuperAdmin);
}

#[tokio::test]
async fn set_role_updates_another_profile() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let other = fx.account("fin@example.org", "Fin", Role::Member);

    let updated = admin(&fx)
        .set_role(&other.as_str().into(), Role::Finance)
        .await
        .unwrap();

    assert_eq!(updated.role, Role::Finance);
    assert!(
        fx.session
            .profiles()
            .borrow()
            .iter()
            .any(|p| p.id.as_str() == other && p.role == Role::Finance)
    );
}

#[tokio::test]
async fn remove_user_rejects_self() {
    let fx = Fixture::signed_in(Role::SuperAdmin).await;
    let me = fx.session.identity().unwrap();

    let err = admin(&fx).remove_user(&me.id).await.unwrap_err();

    assert!(matches!(err, Error::Forbidden { .. }));
}

