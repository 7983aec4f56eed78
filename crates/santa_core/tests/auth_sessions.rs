use rusqlite::Connection;
use santa_core::db::open_db_in_memory;
use santa_core::{
    verify_password, AuthError, AuthService, NewMember, ParticipantService, Role, Scope,
    SqliteParticipantRepository, SqliteSessionRepository,
};
use std::time::Duration;

const TEST_BCRYPT_COST: u32 = 4;

fn setup() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteParticipantRepository::try_new(&mut conn).unwrap();
        let service = ParticipantService::with_bcrypt_cost(repo, TEST_BCRYPT_COST);
        service
            .register(&Scope::Group("smiths".to_string()), "alice", "correct horse")
            .unwrap();
        let hash = bcrypt::hash("admin-pw", TEST_BCRYPT_COST).unwrap();
        service.ensure_admin("root", &hash).unwrap();
    }
    conn
}

#[test]
fn login_issues_token_that_verifies_to_identity() {
    let conn = setup();
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let smiths = Scope::Group("smiths".to_string());

    let session = auth.login(&smiths, " alice ", "correct horse").unwrap();
    assert_eq!(session.identity.name, "alice");
    assert_eq!(session.identity.role, Role::Member);
    assert!(!session.token.is_empty());

    let identity = auth.verify(&session.token).unwrap();
    assert_eq!(identity.scope, smiths);
    assert!(!identity.is_admin());
}

#[test]
fn admin_logs_in_against_global_scope() {
    let conn = setup();
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());

    let session = auth.login(&Scope::Global, "root", "admin-pw").unwrap();
    assert!(session.identity.is_admin());
    assert_eq!(session.identity.scope, Scope::Global);
}

#[test]
fn admin_login_with_group_code_falls_back_to_global_scope() {
    let conn = setup();
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let smiths = Scope::Group("smiths".to_string());

    let session = auth.login(&smiths, "root", "admin-pw").unwrap();
    assert!(session.identity.is_admin());
    assert_eq!(session.identity.scope, Scope::Global);

    let identity = auth.verify(&session.token).unwrap();
    assert_eq!(identity.scope, Scope::Global);
    assert!(matches!(
        auth.login(&smiths, "root", "wrong"),
        Err(AuthError::InvalidCredentials)
    ));
}

#[test]
fn global_members_are_not_reachable_through_group_fallback() {
    let mut conn = setup();
    {
        let repo = SqliteParticipantRepository::try_new(&mut conn).unwrap();
        ParticipantService::with_bcrypt_cost(repo, TEST_BCRYPT_COST)
            .register(&Scope::Global, "bob", "pw")
            .unwrap();
    }
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());

    assert!(auth.login(&Scope::Global, "bob", "pw").is_ok());
    assert!(matches!(
        auth.login(&Scope::Group("smiths".to_string()), "bob", "pw"),
        Err(AuthError::InvalidCredentials)
    ));
}

#[test]
fn login_steps_can_run_separately() {
    let mut conn = setup();
    let member = NewMember::prepare(" carol ", "pw", TEST_BCRYPT_COST).unwrap();
    assert_eq!(member.name(), "carol");
    {
        let repo = SqliteParticipantRepository::try_new(&mut conn).unwrap();
        ParticipantService::new(repo)
            .register_prepared(&Scope::Global, member)
            .unwrap();
    }

    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let pending = auth.load_credentials(&Scope::Global, "carol").unwrap();
    assert_eq!(pending.role(), Role::Member);
    assert!(matches!(
        verify_password(&pending, "nope"),
        Err(AuthError::InvalidCredentials)
    ));
    verify_password(&pending, "pw").unwrap();

    let session = auth.issue_session(&pending).unwrap();
    assert_eq!(auth.verify(&session.token).unwrap().name, "carol");
}

#[test]
fn wrong_password_unknown_name_and_wrong_scope_fail_alike() {
    let conn = setup();
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let smiths = Scope::Group("smiths".to_string());

    assert!(matches!(
        auth.login(&smiths, "alice", "wrong"),
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login(&smiths, "mallory", "correct horse"),
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login(&Scope::Global, "alice", "correct horse"),
        Err(AuthError::InvalidCredentials)
    ));
}

#[test]
fn logout_revokes_token_and_is_idempotent() {
    let conn = setup();
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    let session = auth.login(&Scope::Global, "root", "admin-pw").unwrap();

    auth.logout(&session.token).unwrap();
    auth.logout(&session.token).unwrap();
    assert!(matches!(
        auth.verify(&session.token),
        Err(AuthError::InvalidToken)
    ));
}

#[test]
fn expired_token_is_rejected_and_removed() {
    let conn = setup();
    let auth = AuthService::with_session_ttl(
        SqliteSessionRepository::try_new(&conn).unwrap(),
        Duration::ZERO,
    );
    let session = auth.login(&Scope::Global, "root", "admin-pw").unwrap();

    assert!(matches!(auth.verify(&session.token), Err(AuthError::Expired)));
    assert!(matches!(
        auth.verify(&session.token),
        Err(AuthError::InvalidToken)
    ));
}

#[test]
fn unknown_token_is_invalid() {
    let conn = setup();
    let auth = AuthService::new(SqliteSessionRepository::try_new(&conn).unwrap());
    assert!(matches!(
        auth.verify("not-a-token"),
        Err(AuthError::InvalidToken)
    ));
}
