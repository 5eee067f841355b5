use attendance_be::AppError;
use attendance_be::database::models::{
    AdminSessionFilter, CloseSessionInput, ManualSessionInput, SessionStatus, TodayStatus,
    UpdateSessionInput, UserRole,
};
use pretty_assertions::assert_eq;

mod common;

use common::{TestContext, date, instant};

#[actix_web::test]
async fn test_full_day_check_in_and_out() {
    // Arrange
    let ctx = TestContext::at("2025-03-03", "08:29:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    // Act
    let opened = ctx.state.attendance.check_in(user.id).await.unwrap();
    ctx.set_time("2025-03-03", "18:05:00");
    let closed = ctx.state.attendance.check_out(user.id, None).await.unwrap();

    // Assert
    assert_eq!(opened.status, SessionStatus::Open);
    assert_eq!(opened.work_date, date("2025-03-03"));
    assert_eq!(opened.day_unit, 0.5);
    assert_eq!(closed.id, opened.id);
    assert_eq!(closed.status, SessionStatus::Closed);
    assert_eq!(closed.worked_minutes, 480);
    assert_eq!(closed.day_unit, 1.0);
}

#[actix_web::test]
async fn test_afternoon_only_session() {
    let ctx = TestContext::at("2025-03-03", "13:30:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let opened = ctx.state.attendance.check_in(user.id).await.unwrap();
    assert_eq!(opened.day_unit, 0.0);

    ctx.set_time("2025-03-03", "18:00:00");
    let closed = ctx.state.attendance.check_out(user.id, None).await.unwrap();

    assert_eq!(closed.worked_minutes, 270);
    assert_eq!(closed.day_unit, 0.5);
}

#[actix_web::test]
async fn test_late_check_in_earns_minutes_but_no_credit() {
    let ctx = TestContext::at("2025-03-03", "16:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    ctx.state.attendance.check_in(user.id).await.unwrap();
    ctx.set_time("2025-03-03", "18:00:00");
    let closed = ctx.state.attendance.check_out(user.id, None).await.unwrap();

    assert_eq!(closed.worked_minutes, 120);
    assert_eq!(closed.day_unit, 0.0);
}

#[actix_web::test]
async fn test_check_in_outside_window_is_rejected() {
    let ctx = TestContext::at("2025-03-03", "07:30:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let err = ctx.state.attendance.check_in(user.id).await.unwrap_err();

    assert!(matches!(err, AppError::Validation { .. }));
    assert_eq!(ctx.store.session_count().await, 0);
}

#[actix_web::test]
async fn test_check_in_window_edges_are_inclusive() {
    let ctx = TestContext::at("2025-03-03", "08:00:00");
    let early = ctx.store.add_user("Early", UserRole::User).await;
    let late = ctx.store.add_user("Late", UserRole::User).await;

    assert!(ctx.state.attendance.check_in(early.id).await.is_ok());

    ctx.set_time("2025-03-03", "18:00:00");
    assert!(ctx.state.attendance.check_in(late.id).await.is_ok());

    ctx.set_time("2025-03-03", "18:00:01");
    let other = ctx.store.add_user("Other", UserRole::User).await;
    assert!(ctx.state.attendance.check_in(other.id).await.is_err());
}

#[actix_web::test]
async fn test_second_check_in_same_day_conflicts() {
    let ctx = TestContext::at("2025-03-03", "09:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    ctx.state.attendance.check_in(user.id).await.unwrap();
    ctx.set_time("2025-03-03", "10:00:00");
    let err = ctx.state.attendance.check_in(user.id).await.unwrap_err();

    match err {
        AppError::Conflict(message) => assert_eq!(message, "Already checked in today"),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(ctx.store.session_count().await, 1);
}

#[actix_web::test]
async fn test_check_out_without_session_conflicts() {
    let ctx = TestContext::at("2025-03-03", "17:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let err = ctx.state.attendance.check_out(user.id, None).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[actix_web::test]
async fn test_check_out_closes_latest_open_session_from_a_previous_day() {
    // Arrange
    let ctx = TestContext::at("2025-03-04", "09:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    ctx.store
        .insert_session(user.id, "2025-03-01", "09:00:00", None, 0.5)
        .await;
    let forgotten = ctx
        .store
        .insert_session(user.id, "2025-03-03", "08:30:00", None, 0.5)
        .await;

    // Act
    let closed = ctx
        .state
        .attendance
        .check_out(user.id, Some("forgot yesterday".to_string()))
        .await
        .unwrap();

    // Assert
    assert_eq!(closed.id, forgotten.id);
    assert_eq!(closed.status, SessionStatus::Closed);
    assert_eq!(closed.checkout_reason.as_deref(), Some("forgot yesterday"));
    // Minutes clamp to the check-in day's window; the afternoon cut-off is read on the close day
    assert_eq!(closed.worked_minutes, 480);
    assert_eq!(closed.day_unit, 0.5);
}

#[actix_web::test]
async fn test_repeated_check_out_overwrites_close_time() {
    let ctx = TestContext::at("2025-03-03", "09:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    ctx.state.attendance.check_in(user.id).await.unwrap();

    ctx.set_time("2025-03-03", "12:00:00");
    let first = ctx.state.attendance.check_out(user.id, None).await.unwrap();
    assert_eq!(first.worked_minutes, 180);
    assert_eq!(first.day_unit, 0.5);

    ctx.set_time("2025-03-03", "17:00:00");
    let second = ctx.state.attendance.check_out(user.id, None).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.check_out_at, Some(instant("2025-03-03", "17:00:00")));
    assert_eq!(second.worked_minutes, 390);
    assert_eq!(second.day_unit, 1.0);
}

#[actix_web::test]
async fn test_today_reports_each_state() {
    let ctx = TestContext::at("2025-03-03", "09:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let before = ctx.state.attendance.today(user.id).await.unwrap();
    assert_eq!(before.status, TodayStatus::NotCheckedIn);
    assert_eq!(before.work_date, date("2025-03-03"));
    assert_eq!(before.check_in_at, None);

    ctx.state.attendance.check_in(user.id).await.unwrap();
    let open = ctx.state.attendance.today(user.id).await.unwrap();
    assert_eq!(open.status, TodayStatus::Open);

    ctx.set_time("2025-03-03", "18:00:00");
    ctx.state.attendance.check_out(user.id, None).await.unwrap();
    let closed = ctx.state.attendance.today(user.id).await.unwrap();
    assert_eq!(closed.status, TodayStatus::Closed);
    assert_eq!(closed.worked_minutes, 450);
}

#[actix_web::test]
async fn test_list_mine_defaults_to_current_month() {
    let ctx = TestContext::at("2025-03-15", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    let other = ctx.store.add_user("Bob", UserRole::User).await;
    ctx.store
        .insert_session(user.id, "2025-02-28", "09:00:00", Some("18:00:00"), 1.0)
        .await;
    ctx.store
        .insert_session(user.id, "2025-03-03", "09:00:00", Some("18:00:00"), 1.0)
        .await;
    ctx.store
        .insert_session(user.id, "2025-03-10", "09:00:00", Some("12:00:00"), 0.5)
        .await;
    ctx.store
        .insert_session(other.id, "2025-03-10", "09:00:00", None, 0.5)
        .await;

    let range = ctx
        .state
        .attendance
        .list_mine(user.id, None, None)
        .await
        .unwrap();

    assert_eq!(range.from, date("2025-03-01"));
    assert_eq!(range.to, date("2025-03-31"));
    let dates: Vec<_> = range.rows.iter().map(|row| row.work_date).collect();
    assert_eq!(dates, vec![date("2025-03-10"), date("2025-03-03")]);
}

#[actix_web::test]
async fn test_list_mine_rejects_inverted_range() {
    let ctx = TestContext::at("2025-03-15", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let err = ctx
        .state
        .attendance
        .list_mine(user.id, Some(date("2025-03-10")), Some(date("2025-03-01")))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { .. }));
}

#[actix_web::test]
async fn test_admin_create_bypasses_the_check_in_window() {
    let ctx = TestContext::at("2025-03-10", "20:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let session = ctx
        .state
        .attendance
        .create_manual(ManualSessionInput {
            user_id: user.id,
            work_date: date("2025-03-03"),
            check_in_at: instant("2025-03-03", "07:00:00"),
            check_out_at: Some(instant("2025-03-03", "18:30:00")),
            reason: "  badge reader down ".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Closed);
    assert_eq!(session.worked_minutes, 480);
    assert_eq!(session.day_unit, 1.0);
    assert_eq!(session.checkout_reason.as_deref(), Some("badge reader down"));
}

#[actix_web::test]
async fn test_admin_create_requires_reason_and_ordering() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let missing_reason = ctx
        .state
        .attendance
        .create_manual(ManualSessionInput {
            user_id: user.id,
            work_date: date("2025-03-03"),
            check_in_at: instant("2025-03-03", "09:00:00"),
            check_out_at: None,
            reason: "   ".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(missing_reason, AppError::Validation { .. }));

    let inverted = ctx
        .state
        .attendance
        .create_manual(ManualSessionInput {
            user_id: user.id,
            work_date: date("2025-03-03"),
            check_in_at: instant("2025-03-03", "17:00:00"),
            check_out_at: Some(instant("2025-03-03", "09:00:00")),
            reason: "typo".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(inverted, AppError::Validation { .. }));
    assert_eq!(ctx.store.session_count().await, 0);
}

#[actix_web::test]
async fn test_admin_create_duplicate_conflicts() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    ctx.store
        .insert_session(user.id, "2025-03-03", "09:00:00", None, 0.5)
        .await;

    let err = ctx
        .state
        .attendance
        .create_manual(ManualSessionInput {
            user_id: user.id,
            work_date: date("2025-03-03"),
            check_in_at: instant("2025-03-03", "09:00:00"),
            check_out_at: None,
            reason: "backfill".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[actix_web::test]
async fn test_admin_update_recomputes_credit() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    let session = ctx
        .store
        .insert_session(user.id, "2025-03-03", "09:00:00", Some("12:00:00"), 0.5)
        .await;

    let updated = ctx
        .state
        .attendance
        .update_session(
            session.id,
            UpdateSessionInput {
                check_out_at: Some(Some(instant("2025-03-03", "18:00:00"))),
                reason: "left late".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, SessionStatus::Closed);
    assert_eq!(updated.worked_minutes, 450);
    assert_eq!(updated.day_unit, 1.0);
    assert_eq!(updated.checkout_reason.as_deref(), Some("left late"));
}

#[actix_web::test]
async fn test_admin_update_clearing_check_out_reopens() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    let session = ctx
        .store
        .insert_session(user.id, "2025-03-03", "09:00:00", Some("18:00:00"), 1.0)
        .await;

    let reopened = ctx
        .state
        .attendance
        .update_session(
            session.id,
            UpdateSessionInput {
                check_out_at: Some(None),
                reason: "wrong close".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(reopened.status, SessionStatus::Open);
    assert_eq!(reopened.check_out_at, None);
    assert_eq!(reopened.worked_minutes, 0);
    assert_eq!(reopened.day_unit, 0.5);
}

#[actix_web::test]
async fn test_admin_update_absent_check_out_keeps_it() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    let session = ctx
        .store
        .insert_session(user.id, "2025-03-03", "10:00:00", Some("18:00:00"), 0.5)
        .await;

    let updated = ctx
        .state
        .attendance
        .update_session(
            session.id,
            UpdateSessionInput {
                check_in_at: Some(instant("2025-03-03", "08:30:00")),
                reason: "came in early".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.check_out_at, session.check_out_at);
    assert_eq!(updated.worked_minutes, 480);
    assert_eq!(updated.day_unit, 1.0);
}

#[actix_web::test]
async fn test_admin_update_unknown_id_creates_when_keys_given() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;

    let created = ctx
        .state
        .attendance
        .update_session(
            999,
            UpdateSessionInput {
                user_id: Some(user.id),
                work_date: Some(date("2025-03-05")),
                check_in_at: Some(instant("2025-03-05", "09:00:00")),
                check_out_at: None,
                reason: "missing day".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.user_id, user.id);
    assert_eq!(created.status, SessionStatus::Open);

    let not_found = ctx
        .state
        .attendance
        .update_session(
            999,
            UpdateSessionInput {
                reason: "missing day".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(not_found, AppError::NotFound(_)));
}

#[actix_web::test]
async fn test_admin_close_and_delete() {
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let user = ctx.store.add_user("Alice", UserRole::User).await;
    let session = ctx
        .store
        .insert_session(user.id, "2025-03-03", "09:00:00", None, 0.5)
        .await;

    let closed = ctx
        .state
        .attendance
        .close_session(
            session.id,
            CloseSessionInput {
                check_out_at: instant("2025-03-03", "15:30:00"),
                reason: "forgot to check out".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(closed.status, SessionStatus::Closed);
    assert_eq!(closed.day_unit, 1.0);

    let early = ctx
        .state
        .attendance
        .close_session(
            session.id,
            CloseSessionInput {
                check_out_at: instant("2025-03-03", "08:00:00"),
                reason: "typo".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(early, AppError::Validation { .. }));

    assert!(
        ctx.state
            .attendance
            .delete_session(session.id, "")
            .await
            .is_err()
    );
    ctx.state
        .attendance
        .delete_session(session.id, "duplicate entry")
        .await
        .unwrap();
    assert_eq!(ctx.store.session_count().await, 0);

    let gone = ctx
        .state
        .attendance
        .delete_session(session.id, "duplicate entry")
        .await
        .unwrap_err();
    assert!(matches!(gone, AppError::NotFound(_)));
}

#[actix_web::test]
async fn test_admin_list_filters_and_formats_wall_clock() {
    // Arrange
    let ctx = TestContext::at("2025-03-10", "10:00:00");
    let sales = ctx.store.add_department("Sales").await;
    let alice = ctx
        .store
        .insert_user(
            "Alice",
            UserRole::User,
            attendance_be::database::models::UserStatus::Active,
            Some(sales),
            None,
            0.0,
        )
        .await;
    let bob = ctx.store.add_user("Bob", UserRole::User).await;
    ctx.store
        .insert_session(alice.id, "2025-03-03", "08:45:10", Some("17:30:00"), 1.0)
        .await;
    ctx.store
        .insert_session(alice.id, "2025-03-04", "09:00:00", None, 0.5)
        .await;
    ctx.store
        .insert_session(bob.id, "2025-03-04", "10:00:00", None, 0.0)
        .await;

    // Act
    let all = ctx
        .state
        .attendance
        .list_admin(AdminSessionFilter::default())
        .await
        .unwrap();
    let sales_closed = ctx
        .state
        .attendance
        .list_admin(AdminSessionFilter {
            department_id: Some(sales),
            status: Some(SessionStatus::Closed),
            ..Default::default()
        })
        .await
        .unwrap();

    // Assert
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].work_date, date("2025-03-03"));
    assert_eq!(sales_closed.len(), 1);
    let row = &sales_closed[0];
    assert_eq!(row.user_name, "Alice");
    assert_eq!(row.department_name.as_deref(), Some("Sales"));
    assert_eq!(row.check_in_at, "08:45:10");
    assert_eq!(row.check_out_at.as_deref(), Some("17:30:00"));

    let inverted = ctx
        .state
        .attendance
        .list_admin(AdminSessionFilter {
            from: Some(date("2025-03-10")),
            to: Some(date("2025-03-01")),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(inverted, AppError::Validation { .. }));
}
