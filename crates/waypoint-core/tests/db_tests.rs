use jiff::{Timestamp, ToSpan};
use tempfile::NamedTempFile;
use waypoint_core::{
    AgentMessage, AgentType, Database, EngineError, Plan, PlanStatus, Step, StepStatus,
    EXECUTOR_SOURCE,
};

/// Helper function to create a temporary database for testing
fn create_test_db() -> (NamedTempFile, Database) {
    let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
    let db = Database::new(temp_file.path()).expect("Failed to create test database");
    (temp_file, db)
}

fn create_test_plan(tenant_id: &str, session_id: &str) -> Plan {
    let mut plan = Plan::new(tenant_id, session_id, "user-1", "Evaluate 12 Elm St");
    plan.steps
        .push(Step::planned(&plan.id, AgentType::Valuation, "Estimate value"));
    plan
}

#[test]
fn test_database_initialization() {
    let (temp_file, _db) = create_test_db();

    // Opening the same file again must not fail on the existing schema
    let _again = Database::new(temp_file.path()).expect("Failed to reopen database");
    assert!(temp_file.path().exists());
}

#[test]
fn test_insert_and_get_plan() {
    let (_temp_file, mut db) = create_test_db();
    let plan = create_test_plan("tenant-a", "session-1");

    db.insert_plan(&plan).expect("Failed to insert plan");

    let retrieved = db
        .get_plan("tenant-a", &plan.id)
        .expect("Failed to get plan")
        .expect("Plan should exist");
    assert_eq!(retrieved, plan);
    assert!(db
        .get_plan("tenant-b", &plan.id)
        .expect("Failed to get plan")
        .is_none());
}

#[test]
fn test_insert_duplicate_plan() {
    let (_temp_file, mut db) = create_test_db();
    let plan = create_test_plan("tenant-a", "session-1");
    db.insert_plan(&plan).expect("Failed to insert plan");

    let result = db.insert_plan(&plan);

    assert!(matches!(result, Err(EngineError::AlreadyExists { .. })));
}

#[test]
fn test_replace_plan_bumps_version() {
    let (_temp_file, mut db) = create_test_db();
    let mut plan = create_test_plan("tenant-a", "session-1");
    db.insert_plan(&plan).expect("Failed to insert plan");

    plan.steps[0].status = StepStatus::Completed;
    plan.steps[0].result = Some("$410,000".to_string());
    plan.status = PlanStatus::Completed;
    let written = db.replace_plan(&plan).expect("Failed to replace plan");

    assert_eq!(written.version, 2);
    let retrieved = db
        .get_plan("tenant-a", &plan.id)
        .expect("Failed to get plan")
        .expect("Plan should exist");
    assert_eq!(retrieved, written);
    assert_eq!(retrieved.steps[0].result.as_deref(), Some("$410,000"));
}

#[test]
fn test_replace_with_stale_version_conflicts() {
    let (_temp_file, mut db) = create_test_db();
    let plan = create_test_plan("tenant-a", "session-1");
    db.insert_plan(&plan).expect("Failed to insert plan");
    db.replace_plan(&plan).expect("Failed to replace plan");
    let document = db
        .get_plan_document("tenant-a", &plan.id)
        .expect("Failed to get document");

    let result = db.replace_plan(&plan);

    assert!(matches!(
        result,
        Err(EngineError::Conflict { expected: 1, .. })
    ));
    assert_eq!(
        db.get_plan_document("tenant-a", &plan.id)
            .expect("Failed to get document"),
        document
    );
}

#[test]
fn test_replace_missing_plan() {
    let (_temp_file, mut db) = create_test_db();
    let plan = create_test_plan("tenant-a", "session-1");

    let result = db.replace_plan(&plan);

    assert!(matches!(result, Err(EngineError::PlanNotFound { .. })));
}

#[test]
fn test_list_plans_newest_first() {
    let (_temp_file, mut db) = create_test_db();
    let mut older = create_test_plan("tenant-a", "session-1");
    older.created_at = Timestamp::now() - 1.hour();
    let newer = create_test_plan("tenant-a", "session-2");
    let other_tenant = create_test_plan("tenant-b", "session-1");
    for plan in [&older, &newer, &other_tenant] {
        db.insert_plan(plan).expect("Failed to insert plan");
    }

    let plans = db
        .list_plans("tenant-a", None)
        .expect("Failed to list plans");
    assert_eq!(
        plans.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        vec![newer.id.as_str(), older.id.as_str()]
    );

    let session = db
        .list_plans("tenant-a", Some("session-1"))
        .expect("Failed to list plans");
    assert_eq!(session.len(), 1);
    assert_eq!(session[0].id, older.id);
}

#[test]
fn test_messages_round_trip_in_order() {
    let (_temp_file, mut db) = create_test_db();
    let plan = create_test_plan("tenant-a", "session-1");
    db.insert_plan(&plan).expect("Failed to insert plan");

    let notice = AgentMessage::for_plan(&plan, EXECUTOR_SOURCE, "Starting");
    let result = AgentMessage::for_step(&plan, &plan.steps[0], "Valuation_Agent", "$410,000");
    db.insert_message(&notice).expect("Failed to insert message");
    db.insert_message(&result).expect("Failed to insert message");

    let messages = db
        .get_messages("tenant-a", &plan.id)
        .expect("Failed to get messages");
    assert_eq!(messages, vec![notice, result]);
    assert!(db
        .get_messages("tenant-b", &plan.id)
        .expect("Failed to get messages")
        .is_empty());
}
