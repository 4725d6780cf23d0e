use skillbridge::db::queries;
use skillbridge::error::AppError;
use skillbridge::models::*;

use crate::common::*;

#[test]
fn create_project_requires_at_least_one_role() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");

    let mut conn = db.pool.get().unwrap();
    let result = queries::create_project(&mut conn, &owner.id, &project_input("Empty", &[]));
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[test]
fn create_project_rejects_zero_openings() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");

    let mut conn = db.pool.get().unwrap();
    let result = queries::create_project(
        &mut conn,
        &owner.id,
        &project_input("Bad", &[("Backend", &[], 0)]),
    );
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[test]
fn create_project_rejects_duplicate_role_names() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");

    let mut conn = db.pool.get().unwrap();
    let result = queries::create_project(
        &mut conn,
        &owner.id,
        &project_input("Bad", &[("Backend", &[], 1), ("Backend", &[], 2)]),
    );
    assert!(matches!(result, Err(AppError::Duplicate(_))));
}

#[test]
fn new_project_is_open_visible_and_unfilled() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let created = create_project_owned(
        &db.pool,
        &owner.id,
        "Portal",
        &[("Backend", &["Rust"], 2), ("Frontend", &["TypeScript"], 1)],
    );

    assert_eq!(created.project.project_status, ProjectStatus::Open);
    assert!(created.project.is_visible);
    assert_eq!(created.required_roles.len(), 2);
    assert!(created.required_roles.iter().all(|r| r.filled_positions == 0));
    assert!(has_open_role(&created.required_roles));
}

#[test]
fn submit_appends_a_pending_request() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);

    let request = submit(&db.pool, &created.project.id, &applicant.id, "Backend");
    assert_eq!(request.status, JoinRequestStatus::Pending);

    let conn = db.pool.get().unwrap();
    let requests = queries::list_join_requests(&conn, &created.project.id).unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_id, applicant.id);
}

#[test]
fn owner_cannot_apply_to_own_project() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);

    let mut conn = db.pool.get().unwrap();
    let result =
        queries::submit_join_request(&mut conn, &created.project.id, &owner.id, "Backend");
    assert!(matches!(result, Err(AppError::Duplicate(_))));
}

#[test]
fn submit_unknown_role_fails() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);

    let mut conn = db.pool.get().unwrap();
    // Role names are case-sensitive exact matches.
    let result =
        queries::submit_join_request(&mut conn, &created.project.id, &applicant.id, "backend");
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[test]
fn submit_to_closed_project_fails() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);

    let conn = db.pool.get().unwrap();
    queries::archive_project(&conn, &created.project.id, &owner.id).unwrap();
    drop(conn);

    let mut conn = db.pool.get().unwrap();
    let result =
        queries::submit_join_request(&mut conn, &created.project.id, &applicant.id, "Backend");
    assert!(matches!(result, Err(AppError::InvalidState(_))));
}

#[test]
fn submit_missing_project_fails() {
    let db = test_db();
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");

    let mut conn = db.pool.get().unwrap();
    let result = queries::submit_join_request(&mut conn, "no-such-id", &applicant.id, "Backend");
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[test]
fn duplicate_pending_request_blocked_until_rejected() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);
    let project_id = created.project.id;

    let request = submit(&db.pool, &project_id, &applicant.id, "Backend");

    let mut conn = db.pool.get().unwrap();
    let again = queries::submit_join_request(&mut conn, &project_id, &applicant.id, "Backend");
    assert!(matches!(again, Err(AppError::Duplicate(_))));

    queries::respond_join_request(
        &mut conn,
        &project_id,
        &request.id,
        &owner.id,
        JoinRequestAction::Reject,
    )
    .unwrap();

    // A rejected request is terminal and no longer blocks a retry.
    let retry = queries::submit_join_request(&mut conn, &project_id, &applicant.id, "Backend");
    assert!(retry.is_ok());
}

#[test]
fn reject_has_no_side_effects() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);
    let project_id = created.project.id;

    let request = submit(&db.pool, &project_id, &applicant.id, "Backend");

    let mut conn = db.pool.get().unwrap();
    let decision = queries::respond_join_request(
        &mut conn,
        &project_id,
        &request.id,
        &owner.id,
        JoinRequestAction::Reject,
    )
    .unwrap();

    assert_eq!(decision.request.status, JoinRequestStatus::Rejected);
    assert_eq!(decision.project_status, ProjectStatus::Open);
    assert!(queries::list_project_members(&conn, &project_id)
        .unwrap()
        .is_empty());
    let roles = queries::list_project_roles(&conn, &project_id).unwrap();
    assert_eq!(roles[0].filled_positions, 0);
}

#[test]
fn only_owner_can_respond() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);
    let project_id = created.project.id;

    let request = submit(&db.pool, &project_id, &applicant.id, "Backend");

    let mut conn = db.pool.get().unwrap();
    let result = queries::respond_join_request(
        &mut conn,
        &project_id,
        &request.id,
        &applicant.id,
        JoinRequestAction::Accept,
    );
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
fn respond_to_unknown_request_fails() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);

    let mut conn = db.pool.get().unwrap();
    let result = queries::respond_join_request(
        &mut conn,
        &created.project.id,
        "no-such-request",
        &owner.id,
        JoinRequestAction::Accept,
    );
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[test]
fn responding_twice_fails() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 2)]);
    let project_id = created.project.id;

    let request = submit(&db.pool, &project_id, &applicant.id, "Backend");
    accept(&db.pool, &project_id, &request.id, &owner.id);

    let mut conn = db.pool.get().unwrap();
    let again = queries::respond_join_request(
        &mut conn,
        &project_id,
        &request.id,
        &owner.id,
        JoinRequestAction::Reject,
    );
    assert!(matches!(again, Err(AppError::InvalidState(_))));
}

#[test]
fn accept_commits_all_three_effects_and_derives_status() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(
        &db.pool,
        &owner.id,
        "Portal",
        &[("Backend", &["Go"], 1)],
    );
    let project_id = created.project.id;

    let request = submit(&db.pool, &project_id, &applicant.id, "Backend");
    let decision = accept(&db.pool, &project_id, &request.id, &owner.id);

    assert_eq!(decision.request.status, JoinRequestStatus::Accepted);
    // Last open slot filled, so the project moved to in-progress.
    assert_eq!(decision.project_status, ProjectStatus::InProgress);

    let conn = db.pool.get().unwrap();
    let members = queries::list_project_members(&conn, &project_id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, applicant.id);
    assert_eq!(members[0].role_name, "Backend");

    let roles = queries::list_project_roles(&conn, &project_id).unwrap();
    assert_eq!(roles[0].filled_positions, 1);

    let project = queries::get_project_by_id(&conn, &project_id).unwrap().unwrap();
    assert_eq!(project.project_status, ProjectStatus::InProgress);

    // A later applicant is refused: the role is full.
    let other = create_user(&db.pool, "Other", "CS-003", "other@campus.test");
    drop(conn);
    let mut conn = db.pool.get().unwrap();
    let late = queries::submit_join_request(&mut conn, &project_id, &other.id, "Backend");
    assert!(matches!(late, Err(AppError::CapacityConflict(_))));
}

#[test]
fn status_stays_open_while_any_role_has_an_opening() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(
        &db.pool,
        &owner.id,
        "Portal",
        &[("Backend", &[], 1), ("Frontend", &[], 1)],
    );
    let project_id = created.project.id;

    let request = submit(&db.pool, &project_id, &applicant.id, "Backend");
    let decision = accept(&db.pool, &project_id, &request.id, &owner.id);

    // One role filled, the other still open: no transition yet.
    assert_eq!(decision.project_status, ProjectStatus::Open);

    let conn = db.pool.get().unwrap();
    let project = queries::get_project_by_id(&conn, &project_id).unwrap().unwrap();
    assert_eq!(project.project_status, ProjectStatus::Open);
}

#[test]
fn accept_revalidates_capacity_at_commit_time() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let first = create_user(&db.pool, "First", "CS-002", "first@campus.test");
    let second = create_user(&db.pool, "Second", "CS-003", "second@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);
    let project_id = created.project.id;

    // Both requests were valid when submitted.
    let r1 = submit(&db.pool, &project_id, &first.id, "Backend");
    let r2 = submit(&db.pool, &project_id, &second.id, "Backend");

    accept(&db.pool, &project_id, &r1.id, &owner.id);

    // The second accept loses: capacity is checked at commit time.
    let mut conn = db.pool.get().unwrap();
    let result = queries::respond_join_request(
        &mut conn,
        &project_id,
        &r2.id,
        &owner.id,
        JoinRequestAction::Accept,
    );
    assert!(matches!(result, Err(AppError::CapacityConflict(_))));

    // The losing request is still pending and no partial effect leaked.
    let requests = queries::list_join_requests(&conn, &project_id).unwrap();
    let loser = requests.iter().find(|r| r.id == r2.id).unwrap();
    assert_eq!(loser.status, JoinRequestStatus::Pending);

    let roles = queries::list_project_roles(&conn, &project_id).unwrap();
    assert_eq!(roles[0].filled_positions, 1);
    assert_eq!(queries::list_project_members(&conn, &project_id).unwrap().len(), 1);
}

#[test]
fn concurrent_accepts_never_overfill_a_role() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let first = create_user(&db.pool, "First", "CS-002", "first@campus.test");
    let second = create_user(&db.pool, "Second", "CS-003", "second@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);
    let project_id = created.project.id;

    let r1 = submit(&db.pool, &project_id, &first.id, "Backend");
    let r2 = submit(&db.pool, &project_id, &second.id, "Backend");

    let mut handles = Vec::new();
    for request_id in [r1.id, r2.id] {
        let pool = db.pool.clone();
        let project_id = project_id.clone();
        let owner_id = owner.id.clone();
        handles.push(std::thread::spawn(move || {
            let mut conn = pool.get().unwrap();
            queries::respond_join_request(
                &mut conn,
                &project_id,
                &request_id,
                &owner_id,
                JoinRequestAction::Accept,
            )
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::CapacityConflict(_)))));

    let conn = db.pool.get().unwrap();
    let roles = queries::list_project_roles(&conn, &project_id).unwrap();
    assert_eq!(roles[0].filled_positions, 1);
    assert_eq!(queries::list_project_members(&conn, &project_id).unwrap().len(), 1);

    let project = queries::get_project_by_id(&conn, &project_id).unwrap().unwrap();
    assert_eq!(project.project_status, ProjectStatus::InProgress);
}

#[test]
fn member_cannot_apply_again_but_parallel_requests_can_both_land() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let applicant = create_user(&db.pool, "App", "CS-002", "app@campus.test");
    let created = create_project_owned(
        &db.pool,
        &owner.id,
        "Portal",
        &[("Backend", &[], 1), ("Frontend", &[], 1), ("Design", &[], 1)],
    );
    let project_id = created.project.id;

    // Two pending requests for different roles, submitted before either
    // is accepted, may both be accepted. Membership only blocks new
    // submissions, not pending decisions.
    let backend = submit(&db.pool, &project_id, &applicant.id, "Backend");
    let frontend = submit(&db.pool, &project_id, &applicant.id, "Frontend");

    accept(&db.pool, &project_id, &backend.id, &owner.id);
    accept(&db.pool, &project_id, &frontend.id, &owner.id);

    let conn = db.pool.get().unwrap();
    let members = queries::list_project_members(&conn, &project_id).unwrap();
    assert_eq!(members.len(), 2);
    drop(conn);

    // Any further application from a member is refused, even for a role
    // that still has an opening.
    let mut conn = db.pool.get().unwrap();
    let result = queries::submit_join_request(&mut conn, &project_id, &applicant.id, "Design");
    assert!(matches!(result, Err(AppError::Duplicate(_))));
}

#[test]
fn complete_and_archive_are_owner_gated_and_hide_the_project() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let other = create_user(&db.pool, "Other", "CS-002", "other@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);
    let project_id = created.project.id;

    let conn = db.pool.get().unwrap();

    let forbidden = queries::complete_project(&conn, &project_id, &other.id);
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    // Not status-gated: an Open project may be completed directly.
    let completed = queries::complete_project(&conn, &project_id, &owner.id).unwrap();
    assert_eq!(completed.project_status, ProjectStatus::Completed);
    assert!(!completed.is_visible);

    assert!(queries::list_open_projects(&conn).unwrap().is_empty());
    assert!(queries::list_match_candidates(&conn).unwrap().is_empty());
}

#[test]
fn archive_hides_from_listing() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");
    let created = create_project_owned(&db.pool, &owner.id, "Portal", &[("Backend", &[], 1)]);

    let conn = db.pool.get().unwrap();
    let archived = queries::archive_project(&conn, &created.project.id, &owner.id).unwrap();
    assert_eq!(archived.project_status, ProjectStatus::Archived);
    assert!(!archived.is_visible);
    assert!(queries::list_open_projects(&conn).unwrap().is_empty());
}

#[test]
fn listing_is_newest_first_and_match_scan_is_insertion_order() {
    let db = test_db();
    let owner = create_user(&db.pool, "Owner", "CS-001", "owner@campus.test");

    let first = create_project_owned(&db.pool, &owner.id, "First", &[("Backend", &[], 1)]);
    // Distinct created_at values keep the ordering assertions meaningful.
    {
        let conn = db.pool.get().unwrap();
        conn.execute(
            "UPDATE projects SET created_at = created_at - 10 WHERE id = ?1",
            rusqlite::params![&first.project.id],
        )
        .unwrap();
    }
    let second = create_project_owned(&db.pool, &owner.id, "Second", &[("Backend", &[], 1)]);

    let conn = db.pool.get().unwrap();
    let listed = queries::list_open_projects(&conn).unwrap();
    assert_eq!(listed[0].id, second.project.id);
    assert_eq!(listed[1].id, first.project.id);

    let candidates = queries::list_match_candidates(&conn).unwrap();
    assert_eq!(candidates[0].id, first.project.id);
    assert_eq!(candidates[1].id, second.project.id);
}
