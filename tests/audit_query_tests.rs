//! Audit ledger tests: one record per mutation, and the reporting query path

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use lablink_core::audit::{ActionKind, AuditFilter, AuditLedger, EntityRef};
use lablink_core::component::{ComponentService, CreateComponentInput, UpdateComponentInput};
use lablink_core::models::UserRole;
use lablink_core::request::CreateRequestInput;
use lablink_core::reservation::ReservationService;

/// Helper to create a test database pool with migrations applied
async fn setup_test_db() -> PgPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/lablink_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    lablink_core::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn seed_user(pool: &PgPool, role: UserRole) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, username, email, role, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(format!("user-{}", id.simple()))
    .bind(format!("{}@lab.test", id.simple()))
    .bind(role)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("Failed to seed user");
    id
}

async fn seed_component(pool: &PgPool, faculty_id: Uuid, name: &str, quantity: i32) -> Uuid {
    let service = ComponentService::new(pool.clone());
    let component = service
        .create_component(
            faculty_id,
            CreateComponentInput {
                name: name.to_string(),
                category: "instrument".to_string(),
                quantity,
                description: None,
                image_url: None,
                location: "Shelf C2".to_string(),
            },
        )
        .await
        .expect("Failed to seed component");
    component.id
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_every_operation_writes_exactly_one_record() {
    let pool = setup_test_db().await;
    let reservations = ReservationService::new(pool.clone());
    let ledger = AuditLedger::new(pool.clone());

    let student = seed_user(&pool, UserRole::Student).await;
    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let name = format!("Signal generator {}", Uuid::new_v4().simple());
    let component_id = seed_component(&pool, faculty, &name, 10).await;

    let request = reservations
        .create_request(student, CreateRequestInput { component_id, quantity: 4 })
        .await
        .unwrap();
    reservations.approve_request(request.id, faculty).await.unwrap();
    reservations.return_request(request.id, faculty).await.unwrap();

    // Request + Approve + Return against the request entity
    let page = ledger
        .query(AuditFilter {
            entity: Some(EntityRef::Request(request.id)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);

    let actions: Vec<ActionKind> = page.records.iter().map(|r| r.action).collect();
    // Most recent first
    assert_eq!(
        actions,
        vec![ActionKind::Return, ActionKind::Approve, ActionKind::Request]
    );
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_approve_record_matches_component_state() {
    let pool = setup_test_db().await;
    let reservations = ReservationService::new(pool.clone());
    let components = ComponentService::new(pool.clone());
    let ledger = AuditLedger::new(pool.clone());

    let student = seed_user(&pool, UserRole::Student).await;
    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let component_id = seed_component(&pool, faculty, "Stepper motor", 9).await;

    let request = reservations
        .create_request(student, CreateRequestInput { component_id, quantity: 4 })
        .await
        .unwrap();
    reservations.approve_request(request.id, faculty).await.unwrap();

    let component = components.get_component(component_id).await.unwrap();
    assert_eq!(component.quantity, 5);

    let page = ledger
        .query(AuditFilter {
            entity: Some(EntityRef::Request(request.id)),
            action: Some(ActionKind::Approve),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let record = &page.records[0];
    assert_eq!(record.actor_id, faculty);
    assert_eq!(record.details["previous_component_quantity"], 9);
    assert_eq!(record.details["new_component_quantity"], 5);
    assert_eq!(
        record.details["new_component_quantity"],
        serde_json::json!(component.quantity)
    );
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_filter_by_actor_and_action() {
    let pool = setup_test_db().await;
    let reservations = ReservationService::new(pool.clone());
    let ledger = AuditLedger::new(pool.clone());

    let student = seed_user(&pool, UserRole::Student).await;
    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let component_id = seed_component(&pool, faculty, "Thermocouple", 6).await;

    let first = reservations
        .create_request(student, CreateRequestInput { component_id, quantity: 1 })
        .await
        .unwrap();
    let second = reservations
        .create_request(student, CreateRequestInput { component_id, quantity: 2 })
        .await
        .unwrap();
    reservations.approve_request(first.id, faculty).await.unwrap();
    reservations
        .reject_request(second.id, faculty, Some("duplicate".to_string()))
        .await
        .unwrap();

    // The student only ever submitted requests
    let page = ledger
        .query(AuditFilter {
            actor_id: Some(student),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.records.iter().all(|r| r.action == ActionKind::Request));

    // Faculty actions filtered down to the reject alone
    let page = ledger
        .query(AuditFilter {
            actor_id: Some(faculty),
            action: Some(ActionKind::Reject),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].details["rejection_reason"], "duplicate");
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_filter_by_subject_name() {
    let pool = setup_test_db().await;
    let ledger = AuditLedger::new(pool.clone());

    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let marker = Uuid::new_v4().simple().to_string();
    let name = format!("Spectrum analyzer {}", marker);
    seed_component(&pool, faculty, &name, 2).await;

    // Case-insensitive partial match against the denormalized name
    let page = ledger
        .query(AuditFilter {
            subject: Some(format!("SPECTRUM ANALYZER {}", marker.to_uppercase())),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].action, ActionKind::Create);
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_date_range_filter() {
    let pool = setup_test_db().await;
    let ledger = AuditLedger::new(pool.clone());

    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let before = Utc::now() - Duration::seconds(5);
    seed_component(&pool, faculty, "Breadboard", 12).await;
    let after = Utc::now() + Duration::seconds(5);

    let page = ledger
        .query(AuditFilter {
            actor_id: Some(faculty),
            start_date: Some(before),
            end_date: Some(after),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    // A window in the past matches nothing
    let page = ledger
        .query(AuditFilter {
            actor_id: Some(faculty),
            end_date: Some(before),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_pagination_with_independent_total() {
    let pool = setup_test_db().await;
    let components = ComponentService::new(pool.clone());
    let ledger = AuditLedger::new(pool.clone());

    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let component_id = seed_component(&pool, faculty, "Servo arm", 1).await;

    // Four updates plus the create: five records for this actor
    for location in ["B1", "B2", "B3", "B4"] {
        components
            .update_component(
                faculty,
                component_id,
                UpdateComponentInput {
                    location: Some(location.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let page = ledger
        .query(AuditFilter {
            actor_id: Some(faculty),
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total, 5);
    assert_eq!(page.limit, 2);

    // Offset walks the same ordering
    let next = ledger
        .query(AuditFilter {
            actor_id: Some(faculty),
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(next.records.len(), 2);
    assert_eq!(next.total, 5);
    assert!(next.records[0].id < page.records[1].id);

    // Records come back most recent first
    let all = ledger
        .query(AuditFilter {
            actor_id: Some(faculty),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<i64> = all.records.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);
}

#[tokio::test]
#[ignore] // Requires database setup
async fn test_update_record_carries_old_and_new_values() {
    let pool = setup_test_db().await;
    let components = ComponentService::new(pool.clone());
    let ledger = AuditLedger::new(pool.clone());

    let faculty = seed_user(&pool, UserRole::Faculty).await;
    let component_id = seed_component(&pool, faculty, "Multimeter", 3).await;

    components
        .update_component(
            faculty,
            component_id,
            UpdateComponentInput {
                quantity: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let page = ledger
        .query(AuditFilter {
            entity: Some(EntityRef::Component(component_id)),
            action: Some(ActionKind::Update),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let record = &page.records[0];
    assert_eq!(record.details["old_values"]["quantity"], 3);
    assert_eq!(record.details["new_values"]["quantity"], 7);
}
