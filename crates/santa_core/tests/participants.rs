use rusqlite::Connection;
use santa_core::db::open_db_in_memory;
use santa_core::{
    AssignmentError, AssignmentService, NameValidationError, ParticipantService,
    ParticipantServiceError, Role, Scope, SqliteAssignmentRepository, SqliteParticipantRepository,
};

const TEST_BCRYPT_COST: u32 = 4;

fn with_participants<T>(
    conn: &mut Connection,
    f: impl FnOnce(&mut ParticipantService<SqliteParticipantRepository<'_>>) -> T,
) -> T {
    let repo = SqliteParticipantRepository::try_new(conn).unwrap();
    let mut service = ParticipantService::with_bcrypt_cost(repo, TEST_BCRYPT_COST);
    f(&mut service)
}

#[test]
fn register_normalizes_name_and_hashes_password() {
    let mut conn = open_db_in_memory().unwrap();
    let created = with_participants(&mut conn, |service| {
        service.register(&Scope::Global, "  alice ", "hunter2").unwrap()
    });
    assert_eq!(created.name, "alice");
    assert_eq!(created.role, Role::Member);
    assert_eq!(created.scope, Scope::Global);

    let stored_hash: String = conn
        .query_row(
            "SELECT password_hash FROM participants WHERE name = 'alice';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_ne!(stored_hash, "hunter2");
    assert!(bcrypt::verify("hunter2", &stored_hash).unwrap());
}

#[test]
fn register_rejects_duplicates_within_scope_only() {
    let mut conn = open_db_in_memory().unwrap();
    with_participants(&mut conn, |service| {
        let smiths = Scope::Group("smiths".to_string());
        service.register(&smiths, "alice", "pw").unwrap();
        service.register(&Scope::Global, "alice", "pw").unwrap();

        let err = service.register(&smiths, "alice", "other").unwrap_err();
        assert!(matches!(
            err,
            ParticipantServiceError::DuplicateParticipant(name) if name == "alice"
        ));
    });
}

#[test]
fn register_rejects_invalid_input() {
    let mut conn = open_db_in_memory().unwrap();
    with_participants(&mut conn, |service| {
        let err = service.register(&Scope::Global, "   ", "pw").unwrap_err();
        assert!(matches!(
            err,
            ParticipantServiceError::InvalidName(NameValidationError::Empty)
        ));

        let err = service.register(&Scope::Global, "me", "pw").unwrap_err();
        assert!(matches!(
            err,
            ParticipantServiceError::InvalidName(NameValidationError::Reserved(_))
        ));

        let err = service.register(&Scope::Global, "bob", "").unwrap_err();
        assert!(matches!(err, ParticipantServiceError::InvalidPassword(_)));
    });
}

#[test]
fn list_is_sorted_by_name() {
    let mut conn = open_db_in_memory().unwrap();
    let names = with_participants(&mut conn, |service| {
        for name in ["carol", "alice", "bob"] {
            service.register(&Scope::Global, name, "pw").unwrap();
        }
        service
            .list(&Scope::Global)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
    });
    assert_eq!(names, vec!["alice", "bob", "carol"]);
}

#[test]
fn ensure_admin_is_idempotent_and_requires_bcrypt_hash() {
    let mut conn = open_db_in_memory().unwrap();
    with_participants(&mut conn, |service| {
        let first = bcrypt::hash("one", TEST_BCRYPT_COST).unwrap();
        let second = bcrypt::hash("two", TEST_BCRYPT_COST).unwrap();
        service.ensure_admin("admin", &first).unwrap();
        service.ensure_admin("admin", &second).unwrap();

        let admins = service.list(&Scope::Global).unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].role, Role::Admin);

        let err = service.ensure_admin("admin", "plain-text").unwrap_err();
        assert!(matches!(err, ParticipantServiceError::InvalidPassword(_)));
    });
}

#[test]
fn remove_deletes_assignments_in_both_directions() {
    let mut conn = open_db_in_memory().unwrap();
    let scope = Scope::Global;
    with_participants(&mut conn, |service| {
        for name in ["alice", "bob", "carol", "dave"] {
            service.register(&scope, name, "pw").unwrap();
        }
    });

    let pairs = {
        let repo = SqliteAssignmentRepository::try_new(&mut conn).unwrap();
        let mut draws = AssignmentService::new(repo);
        draws.generate(&scope).unwrap();
        draws.list(&scope).unwrap()
    };
    let giver_of_carol = pairs
        .iter()
        .find(|p| p.receiver == "carol")
        .map(|p| p.giver.clone())
        .unwrap();

    with_participants(&mut conn, |service| service.remove(&scope, "carol").unwrap());

    let remaining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM assignments WHERE giver = 'carol' OR receiver = 'carol';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);

    let repo = SqliteAssignmentRepository::try_new(&mut conn).unwrap();
    let draws = AssignmentService::new(repo);
    assert_eq!(draws.list(&scope).unwrap().len(), 2);
    assert!(matches!(
        draws.lookup(&scope, &giver_of_carol),
        Err(AssignmentError::NotFound(_))
    ));
}

#[test]
fn remove_unknown_participant_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    with_participants(&mut conn, |service| {
        let err = service.remove(&Scope::Global, "ghost").unwrap_err();
        assert!(matches!(
            err,
            ParticipantServiceError::ParticipantNotFound(name) if name == "ghost"
        ));
    });
}
