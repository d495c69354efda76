use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::time::Duration;
use typed_auth::{
    AuthConfig, AuthService, AuthStrategy, BasicAuth, DatabaseStore, DebugTokenGenerator, Error,
    ExemptPaths, ExpiringStore, GateDecision, JsonFileRecords, MemoryStore, MemoryUserStore,
    RequestContext, RequestGate, SessionAuth, SessionId, SessionLifetime, SessionManager,
    SessionRecord, SessionRecords, SessionStore, StrategyFactory, StrategyKind, UserStore,
};

fn exempt_paths() -> ExemptPaths {
    AuthConfig::default().exempt_paths().unwrap()
}

fn basic_header(credentials: &str) -> String {
    format!("Basic {}", STANDARD.encode(credentials))
}

/// A created session can be looked up until it is destroyed, and destroying twice reports false.
#[async_std::test]
async fn test_session_lifecycle() {
    let store = SessionStore::new_with_token_generator(
        MemoryStore::new(),
        DebugTokenGenerator::<32>::default(),
    );
    let token = store.create("user-1").await.unwrap();
    assert_eq!(token, format!("{:032}", 0));

    assert_eq!(store.lookup(&token).await.unwrap(), Some("user-1".to_string()));
    assert!(store.destroy(&token).await.unwrap());
    assert_eq!(store.lookup(&token).await.unwrap(), None);
    assert!(!store.destroy(&token).await.unwrap());
    assert!(store.implementation().is_empty());
}

/// Tokens never collide, even if the generator repeats itself.
#[async_std::test]
async fn test_token_collision_is_retried() {
    let store = SessionStore::new_with_token_generator(
        MemoryStore::new(),
        DebugTokenGenerator::<8>::default(),
    );
    let first = store.create("a").await.unwrap();

    // A fresh generator over the same backend starts with the token that already exists.
    let colliding = SessionStore::new_with_token_generator(
        store.into_inner(),
        DebugTokenGenerator::<8>::default(),
    );
    let second = colliding.create("b").await.unwrap();
    assert_ne!(first, second);
    assert_eq!(colliding.lookup(&first).await.unwrap(), Some("a".to_string()));
    assert_eq!(colliding.lookup(&second).await.unwrap(), Some("b".to_string()));
}

/// The durable store gives up after a bounded number of collisions.
#[async_std::test]
async fn test_database_store_gives_up_on_collisions() {
    let directory = tempfile::tempdir().unwrap();
    let records = Arc::new(JsonFileRecords::open(directory.path().join("sessions.json")).unwrap());
    let token = format!("{:08}", 0);
    records
        .insert(SessionRecord {
            session_id: SessionId::from_token(&token).to_hex(),
            user_id: "squatter".to_string(),
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    // A generator that always returns the same token.
    #[derive(Debug)]
    struct Constant;
    impl typed_auth::TokenGenerator for Constant {
        fn generate_token(&self) -> String {
            format!("{:08}", 0)
        }
    }

    let store = SessionStore::new_with_token_generator(DatabaseStore::new(records), Constant);
    assert!(matches!(
        store.create("user").await,
        Err(Error::MaximumTokenGenerationTriesReached { maximum: 8 })
    ));
}

/// Concurrent logins each get their own session.
#[async_std::test]
async fn test_concurrent_sessions() {
    let store: Arc<dyn SessionManager> = Arc::new(SessionStore::new(MemoryStore::new()));
    let handles: Vec<_> = (0..32)
        .map(|index| {
            let store = store.clone();
            async_std::task::spawn(async move {
                let user_id = format!("user-{index}");
                let token = store.create(&user_id).await.unwrap();
                (user_id, token)
            })
        })
        .collect();

    let mut tokens = HashSet::new();
    for handle in handles {
        let (user_id, token) = handle.await;
        assert_eq!(store.lookup(&token).await.unwrap(), Some(user_id));
        tokens.insert(token);
    }
    assert_eq!(tokens.len(), 32);
}

/// A session with a lifetime of one second is gone after two seconds,
/// and is then indistinguishable from a token that was never issued.
#[async_std::test]
async fn test_session_expires() {
    let store = SessionStore::new(ExpiringStore::new(
        MemoryStore::new(),
        SessionLifetime::from_seconds(1),
    ));
    let token = store.create("user-1").await.unwrap();
    assert_eq!(store.lookup(&token).await.unwrap(), Some("user-1".to_string()));

    async_std::task::sleep(Duration::from_secs(2)).await;
    let expired = store.lookup(&token).await.unwrap();
    let never_issued = store.lookup("never issued").await.unwrap();
    assert_eq!(expired, None);
    assert_eq!(expired, never_issued);

    // The expired session is masked, not evicted.
    assert_eq!(store.implementation().inner().len(), 1);
    assert_eq!(store.implementation().cleanup(), 1);
}

/// A lifetime of zero means sessions never expire.
#[async_std::test]
async fn test_zero_lifetime_never_expires() {
    let store = SessionStore::new(ExpiringStore::new(
        MemoryStore::new(),
        SessionLifetime::from_seconds(0),
    ));
    let token = store.create("user-1").await.unwrap();
    async_std::task::sleep(Duration::from_millis(1100)).await;
    assert_eq!(store.lookup(&token).await.unwrap(), Some("user-1".to_string()));
}

/// Sessions kept in session records survive reopening the record file, and expire based on
/// their persisted creation time.
#[async_std::test]
async fn test_database_sessions_persist() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("sessions.json");

    let token = {
        let records = Arc::new(JsonFileRecords::open(&path).unwrap());
        let store = SessionStore::new(ExpiringStore::new(
            DatabaseStore::new(records),
            SessionLifetime::from_seconds(1),
        ));
        store.create("user-1").await.unwrap()
    };

    let records = Arc::new(JsonFileRecords::open(&path).unwrap());
    assert_eq!(records.len(), 1);
    assert!(!std::fs::read_to_string(&path).unwrap().contains(&token));
    let store = SessionStore::new(ExpiringStore::new(
        DatabaseStore::new(records),
        SessionLifetime::from_seconds(1),
    ));
    assert_eq!(store.lookup(&token).await.unwrap(), Some("user-1".to_string()));

    async_std::task::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.lookup(&token).await.unwrap(), None);
}

/// Destroying a session removes every record with its id.
#[async_std::test]
async fn test_database_destroy_removes_duplicates() {
    let directory = tempfile::tempdir().unwrap();
    let records = Arc::new(JsonFileRecords::open(directory.path().join("sessions.json")).unwrap());
    let store = SessionStore::new(DatabaseStore::new(records.clone()));
    let token = store.create("user-1").await.unwrap();
    let duplicate = records
        .search(&SessionId::from_token(&token).to_hex())
        .await
        .unwrap()
        .remove(0);
    records.insert(duplicate).await.unwrap();
    let other = store.create("user-2").await.unwrap();
    assert_eq!(records.len(), 3);

    assert!(store.destroy(&token).await.unwrap());
    assert_eq!(records.len(), 1);
    assert_eq!(store.lookup(&token).await.unwrap(), None);
    assert!(!store.destroy(&token).await.unwrap());
    assert_eq!(store.lookup(&other).await.unwrap(), Some("user-2".to_string()));
}

/// Missing credentials are rejected with 401, unresolvable credentials with 403.
#[async_std::test]
async fn test_basic_auth_gate() {
    let users = Arc::new(MemoryUserStore::new());
    let service = AuthService::new(
        users.clone(),
        Arc::new(SessionStore::new(MemoryStore::new())),
    );
    service.register_user("bob@hbtn.io", "H0lberton:School:98!").await.unwrap();
    let gate = RequestGate::new(Some(Box::new(BasicAuth::new(users))), exempt_paths());

    assert!(matches!(
        gate.check(&RequestContext::new("/api/v1/status")).await,
        GateDecision::Open
    ));
    assert!(matches!(
        gate.check(&RequestContext::new("/api/v1/users")).await,
        GateDecision::Unauthorized
    ));

    let request = RequestContext::new("/api/v1/users/me")
        .with_header("Authorization", basic_header("bob@hbtn.io:H0lberton:School:98!"));
    match gate.check(&request).await {
        GateDecision::Authenticated(user) => assert_eq!(user.email, "bob@hbtn.io"),
        decision => panic!("unexpected decision {decision:?}"),
    }

    for header in [
        basic_header("bob@hbtn.io:wrong"),
        basic_header("alice@hbtn.io:H0lberton:School:98!"),
        basic_header("no separator"),
        "Basic !!!".to_string(),
        "Bearer abc".to_string(),
    ] {
        let request = RequestContext::new("/api/v1/users").with_header("Authorization", header);
        let decision = gate.check(&request).await;
        assert_eq!(decision.status_code(), Some(403), "{decision:?}");
    }
}

/// Session auth authenticates by cookie, and a session cookie alone avoids the 401.
#[async_std::test]
async fn test_session_auth_gate() {
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let sessions: Arc<dyn SessionManager> = Arc::new(SessionStore::new(MemoryStore::new()));
    let service = AuthService::new(users.clone(), sessions.clone());
    let user = service.register_user("a@b.com", "secret1").await.unwrap();

    let strategy = SessionAuth::new(sessions, users, "_my_session_id");
    let token = strategy.create_session(&user.id).await.unwrap().unwrap();
    assert_eq!(strategy.create_session("").await.unwrap(), None);
    let gate = RequestGate::new(Some(Box::new(strategy)), exempt_paths());

    let request = RequestContext::new("/api/v1/users/me").with_cookie("_my_session_id", &token);
    assert!(matches!(
        gate.check(&request).await,
        GateDecision::Authenticated(authenticated) if authenticated.id == user.id
    ));

    let stale = RequestContext::new("/api/v1/users/me").with_cookie("_my_session_id", "stale");
    assert!(matches!(gate.check(&stale).await, GateDecision::Forbidden));

    let wrong_cookie = RequestContext::new("/api/v1/users/me").with_cookie("session_id", &token);
    assert!(matches!(gate.check(&wrong_cookie).await, GateDecision::Unauthorized));

    let strategy = gate.strategy().unwrap();
    assert!(strategy.destroy_session(&request).await.unwrap());
    assert!(!strategy.destroy_session(&request).await.unwrap());
    assert!(!strategy
        .destroy_session(&RequestContext::new("/api/v1/auth_session/logout"))
        .await
        .unwrap());
    assert!(matches!(gate.check(&request).await, GateDecision::Forbidden));
}

/// Every configured strategy kind yields a working strategy.
#[async_std::test]
async fn test_factory_strategies() {
    let directory = tempfile::tempdir().unwrap();
    let records: Arc<dyn SessionRecords> =
        Arc::new(JsonFileRecords::open(directory.path().join("sessions.json")).unwrap());
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let sessions: Arc<dyn SessionManager> = Arc::new(SessionStore::new(MemoryStore::new()));
    let user = AuthService::new(users.clone(), sessions)
        .register_user("a@b.com", "secret1")
        .await
        .unwrap();
    let factory = StrategyFactory::new(users).with_session_records(records);

    for kind in [
        StrategyKind::SessionAuth,
        StrategyKind::SessionExpAuth,
        StrategyKind::SessionDbAuth,
    ] {
        let config = AuthConfig {
            strategy: kind,
            session_duration: 60,
            ..Default::default()
        };
        let strategy = factory.build(&config).unwrap().unwrap();
        let token = strategy.create_session(&user.id).await.unwrap().unwrap();
        let request = RequestContext::new("/").with_cookie(config.session_cookie_name.clone(), token);
        assert_eq!(
            strategy.current_user(&request).await.map(|user| user.email),
            Some("a@b.com".to_string()),
            "{kind:?}"
        );
        assert!(strategy.destroy_session(&request).await.unwrap(), "{kind:?}");
        assert!(strategy.current_user(&request).await.is_none(), "{kind:?}");
    }

    let config = AuthConfig {
        strategy: StrategyKind::Auth,
        ..Default::default()
    };
    let gate = RequestGate::new(factory.build(&config).unwrap(), config.exempt_paths().unwrap());
    let request = RequestContext::new("/api/v1/users").with_header("Authorization", basic_header("a@b.com:secret1"));
    assert!(matches!(gate.check(&request).await, GateDecision::Forbidden));

    let gate = RequestGate::new(factory.build(&AuthConfig::default()).unwrap(), exempt_paths());
    assert!(matches!(
        gate.check(&RequestContext::new("/api/v1/users")).await,
        GateDecision::Open
    ));
}

/// Register, fail and succeed to log in, look up the profile, log out.
#[async_std::test]
async fn test_end_to_end() {
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let sessions: Arc<dyn SessionManager> = Arc::new(SessionStore::new(MemoryStore::new()));
    let service = AuthService::new(users.clone(), sessions);

    let user = service.register_user("a@b.com", "secret1").await.unwrap();
    assert_eq!(user.email, "a@b.com");
    assert!(matches!(
        service.register_user("a@b.com", "other").await,
        Err(Error::UserAlreadyExists { email }) if email == "a@b.com"
    ));

    assert!(!service.valid_login("a@b.com", "wrong").await.unwrap());
    assert!(!service.valid_login("nobody@b.com", "secret1").await.unwrap());
    assert_eq!(service.login("a@b.com", "wrong").await.unwrap(), None);
    assert_eq!(service.create_session("nobody@b.com").await.unwrap(), None);
    assert!(service.get_user_from_session_id(None).await.unwrap().is_none());

    let token = service.login("a@b.com", "secret1").await.unwrap().unwrap();
    let profile = service
        .get_user_from_session_id(Some(&token))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.email, "a@b.com");
    assert_eq!(profile.session_id.as_deref(), Some(token.as_str()));

    assert!(service.destroy_session(&token).await.unwrap());
    assert!(service
        .get_user_from_session_id(Some(&token))
        .await
        .unwrap()
        .is_none());
    assert!(!service.destroy_session(&token).await.unwrap());
    let user = users
        .find_user_by(typed_auth::UserQuery::Email("a@b.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.session_id, None);
}

/// A reset token can be redeemed exactly once, and the new password replaces the old one.
#[async_std::test]
async fn test_password_reset() {
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let sessions: Arc<dyn SessionManager> = Arc::new(SessionStore::new(MemoryStore::new()));
    let service = AuthService::new(users.clone(), sessions);
    service.register_user("guillaume@holberton.io", "b4l0u").await.unwrap();

    assert!(matches!(
        service.get_reset_password_token("nobody@holberton.io").await,
        Err(Error::UserNotFound { .. })
    ));

    let reset_token = service
        .get_reset_password_token("guillaume@holberton.io")
        .await
        .unwrap();
    assert!(!reset_token.is_empty());

    service.update_password(&reset_token, "t4rt1fl3tt3").await.unwrap();
    let user = users
        .find_user_by(typed_auth::UserQuery::Email("guillaume@holberton.io"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.reset_token, None);

    assert!(matches!(
        service.update_password(&reset_token, "again").await,
        Err(Error::InvalidResetToken)
    ));
    assert!(matches!(
        service.update_password("", "again").await,
        Err(Error::InvalidResetToken)
    ));

    assert!(!service.valid_login("guillaume@holberton.io", "b4l0u").await.unwrap());
    assert!(service
        .login("guillaume@holberton.io", "t4rt1fl3tt3")
        .await
        .unwrap()
        .is_some());
}

/// Issuing a new reset token invalidates the previous one.
#[async_std::test]
async fn test_reset_token_replaced() {
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let service = AuthService::new_with_parts(
        users,
        Arc::new(SessionStore::new(MemoryStore::new())),
        Default::default(),
        DebugTokenGenerator::<16>::default(),
    );
    service.register_user("a@b.com", "secret1").await.unwrap();
    let first = service.get_reset_password_token("a@b.com").await.unwrap();
    let second = service.get_reset_password_token("a@b.com").await.unwrap();
    assert_ne!(first, second);
    assert!(matches!(
        service.update_password(&first, "x").await,
        Err(Error::InvalidResetToken)
    ));
    service.update_password(&second, "x").await.unwrap();
}

/// Registrations of the same email racing on separate threads create exactly one user.
#[test]
fn test_concurrent_registration() {
    const THREADS: usize = 4;
    let users = Arc::new(MemoryUserStore::new());
    let service = Arc::new(AuthService::new(
        users.clone(),
        Arc::new(SessionStore::new(MemoryStore::new())),
    ));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let service = service.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                async_std::task::block_on(service.register_user("a@b.com", "pw"))
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|result| result.is_err())
        .all(|result| matches!(result, Err(Error::UserAlreadyExists { .. }))));
    assert_eq!(users.len(), 1);
}

/// Logging out with an expired session answers like logging out with a token that was never
/// issued, and still clears the token from the user.
#[async_std::test]
async fn test_destroy_after_expiry() {
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let sessions: Arc<dyn SessionManager> = Arc::new(SessionStore::new(ExpiringStore::new(
        MemoryStore::new(),
        SessionLifetime::from_seconds(1),
    )));
    let service = AuthService::new(users.clone(), sessions.clone());
    let strategy = SessionAuth::new(sessions, users.clone(), "_my_session_id");
    service.register_user("a@b.com", "secret1").await.unwrap();
    let first = service.login("a@b.com", "secret1").await.unwrap().unwrap();
    let second = service.login("a@b.com", "secret1").await.unwrap().unwrap();

    async_std::task::sleep(Duration::from_secs(2)).await;
    let expired = RequestContext::new("/api/v1/auth_session/logout").with_cookie("_my_session_id", &first);
    let never_issued =
        RequestContext::new("/api/v1/auth_session/logout").with_cookie("_my_session_id", "never issued");
    assert!(!strategy.destroy_session(&expired).await.unwrap());
    assert!(!strategy.destroy_session(&never_issued).await.unwrap());

    assert!(!service.destroy_session(&second).await.unwrap());
    let user = users
        .find_user_by(typed_auth::UserQuery::Email("a@b.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.session_id, None);
}

/// A failed write of the record file neither adds nor removes sessions.
#[async_std::test]
async fn test_database_write_failure_changes_nothing() {
    let directory = tempfile::tempdir().unwrap();
    let subdirectory = directory.path().join("records");
    std::fs::create_dir(&subdirectory).unwrap();
    let records = Arc::new(JsonFileRecords::open(subdirectory.join("sessions.json")).unwrap());
    let store = SessionStore::new(DatabaseStore::new(records.clone()));
    let token = store.create("user-1").await.unwrap();

    std::fs::remove_dir_all(&subdirectory).unwrap();
    assert!(store.create("user-2").await.is_err());
    assert!(store.destroy(&token).await.is_err());
    assert_eq!(records.len(), 1);
    assert_eq!(store.lookup(&token).await.unwrap(), Some("user-1".to_string()));
}
