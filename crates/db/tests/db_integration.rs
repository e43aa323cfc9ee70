//! Database integration tests.
//!
//! These run against a migrated in-memory `SQLite` database, so no external
//! server is needed.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use logbook_common::AppError;
use logbook_db::entities::{assignment, check_in, log_entry, user};
use logbook_db::repositories::{
    AssignmentRepository, CheckInRepository, LogEntryRepository, UserRepository,
};
use logbook_db::test_utils::TestDatabase;
use maplit::hashset;
use sea_orm::Set;

async fn insert_user(repo: &UserRepository, id: &str, role: user::UserRole) -> user::Model {
    repo.create(user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(format!("{id}@example.edu")),
        name: Set(format!("User {id}")),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    })
    .await
    .unwrap()
}

fn new_assignment(id: &str, student: &str, supervisor: &str) -> assignment::ActiveModel {
    assignment::ActiveModel {
        id: Set(id.to_string()),
        student_id: Set(student.to_string()),
        supervisor_id: Set(supervisor.to_string()),
        supervisor_type: Set(assignment::SupervisorType::Academic),
        assigned_by: Set("admin".to_string()),
        assigned_at: Set(Utc::now().fixed_offset()),
        is_active: Set(true),
        deactivated_at: Set(None),
    }
}

fn automatic_check_in(id: &str, student: &str, day: NaiveDate) -> check_in::ActiveModel {
    check_in::ActiveModel {
        id: Set(id.to_string()),
        student_id: Set(student.to_string()),
        student_name: Set("Ada".to_string()),
        checked_in_at: Set(Utc::now().fixed_offset()),
        local_date: Set(day),
        latitude: Set(6.5244),
        longitude: Set(3.3792),
        address: Set("Tech Hub".to_string()),
        status: Set(check_in::CheckInStatus::Success),
        is_automatic: Set(true),
        distance_meters: Set(None),
        site_status: Set(None),
        auto_day: Set(Some(day)),
    }
}

#[tokio::test]
async fn test_reassignment_keeps_history_and_one_active_row() {
    let db = TestDatabase::new().await.unwrap();
    let users = UserRepository::new(db.connection());
    let repo = AssignmentRepository::new(db.connection());

    insert_user(&users, "student", user::UserRole::Student).await;
    insert_user(&users, "sup-a", user::UserRole::AcademicSupervisor).await;
    insert_user(&users, "sup-b", user::UserRole::AcademicSupervisor).await;

    repo.replace_active(new_assignment("a1", "student", "sup-a"))
        .await
        .unwrap();
    repo.replace_active(new_assignment("a2", "student", "sup-b"))
        .await
        .unwrap();

    let history = repo.find_history("student").await.unwrap();
    assert_eq!(history.len(), 2);
    let active: Vec<_> = history.iter().filter(|a| a.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].supervisor_id, "sup-b");

    let old = repo.get_by_id("a1").await.unwrap();
    assert!(!old.is_active);
    assert!(old.deactivated_at.is_some());

    let student = users.get_by_id("student").await.unwrap();
    assert_eq!(student.assigned_supervisor_id.as_deref(), Some("sup-b"));
}

#[tokio::test]
async fn test_deactivate_clears_mirror_and_is_idempotent() {
    let db = TestDatabase::new().await.unwrap();
    let users = UserRepository::new(db.connection());
    let repo = AssignmentRepository::new(db.connection());

    insert_user(&users, "student", user::UserRole::Student).await;
    insert_user(&users, "sup-a", user::UserRole::AcademicSupervisor).await;

    repo.replace_active(new_assignment("a1", "student", "sup-a"))
        .await
        .unwrap();

    let first = repo.deactivate("a1").await.unwrap();
    assert!(!first.is_active);
    let second = repo.deactivate("a1").await.unwrap();
    assert_eq!(first.deactivated_at, second.deactivated_at);

    let student = users.get_by_id("student").await.unwrap();
    assert!(student.assigned_supervisor_id.is_none());

    assert!(matches!(
        repo.deactivate("missing").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_active_students_for_supervisor() {
    let db = TestDatabase::new().await.unwrap();
    let users = UserRepository::new(db.connection());
    let repo = AssignmentRepository::new(db.connection());

    insert_user(&users, "s1", user::UserRole::Student).await;
    insert_user(&users, "s2", user::UserRole::Student).await;
    insert_user(&users, "s3", user::UserRole::Student).await;
    insert_user(&users, "sup", user::UserRole::AcademicSupervisor).await;

    repo.replace_active(new_assignment("a1", "s1", "sup")).await.unwrap();
    repo.replace_active(new_assignment("a2", "s2", "sup")).await.unwrap();
    repo.replace_active(new_assignment("a3", "s3", "sup")).await.unwrap();
    repo.deactivate("a3").await.unwrap();

    let students: HashSet<String> = repo
        .find_active_for_supervisor("sup", Some(assignment::SupervisorType::Academic))
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.student_id)
        .collect();

    assert_eq!(students, hashset! {"s1".to_string(), "s2".to_string()});
}

#[tokio::test]
async fn test_unique_index_rejects_second_automatic_check_in_same_day() {
    let db = TestDatabase::new().await.unwrap();
    let users = UserRepository::new(db.connection());
    let repo = CheckInRepository::new(db.connection());

    insert_user(&users, "student", user::UserRole::Student).await;
    let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    repo.create(automatic_check_in("c1", "student", day))
        .await
        .unwrap();
    let duplicate = repo.create(automatic_check_in("c2", "student", day)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let next_day = day.succ_opt().unwrap();
    repo.create(automatic_check_in("c3", "student", next_day))
        .await
        .unwrap();

    // Manual rows have no auto_day and are never constrained.
    for id in ["m1", "m2"] {
        let mut manual = automatic_check_in(id, "student", day);
        manual.is_automatic = Set(false);
        manual.auto_day = Set(None);
        repo.create(manual).await.unwrap();
    }

    assert!(repo.find_automatic_on("student", day).await.unwrap().is_some());
    assert_eq!(repo.count_manual_on("student", day).await.unwrap(), 2);
}

#[tokio::test]
async fn test_compare_and_swap_detects_stale_version() {
    let db = TestDatabase::new().await.unwrap();
    let users = UserRepository::new(db.connection());
    let repo = LogEntryRepository::new(db.connection());

    insert_user(&users, "student", user::UserRole::Student).await;
    let now = Utc::now().fixed_offset();
    let entry = repo
        .create(log_entry::ActiveModel {
            id: Set("e1".to_string()),
            student_id: Set("student".to_string()),
            student_name: Set("Ada".to_string()),
            activity_date: Set(now.date_naive()),
            description: Set("Worked on API integration".to_string()),
            status: Set(log_entry::LogStatus::Pending),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .await
        .unwrap();

    let approve = log_entry::ActiveModel {
        status: Set(log_entry::LogStatus::Approved),
        ..Default::default()
    };
    let first = repo
        .compare_and_swap(&entry.id, entry.version, approve.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, log_entry::LogStatus::Approved);
    assert_eq!(first.version, 1);

    // Same expected version again: lost race.
    let second = repo
        .compare_and_swap(&entry.id, entry.version, approve)
        .await
        .unwrap();
    assert!(second.is_none());

    assert!(!repo.delete_if_version(&entry.id, 0).await.unwrap());
    assert!(repo.delete_if_version(&entry.id, 1).await.unwrap());
    assert!(repo.find_by_id(&entry.id).await.unwrap().is_none());
}
