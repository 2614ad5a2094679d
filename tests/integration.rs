//! End-to-end tests for the scheduling integrity engine.
//!
//! This test suite drives the public `Engine` facade over the in-memory store:
//! - Shift overlap across categories and midnight
//! - Clock-in/clock-out conflicts and lookups
//! - Report generation, uniqueness and totals
//! - Signing, the edit gate and the signature log
//! - Audit delivery

use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shift_ledger::audit::{AuditError, AuditRecord, AuditSink, MemoryAuditSink};
use shift_ledger::clock::FixedClock;
use shift_ledger::config::ConfigLoader;
use shift_ledger::engine::{Engine, Stores};
use shift_ledger::error::{ConflictDetail, EngineError, ErrorKind};
use shift_ledger::models::{
    Actor, EntryStatus, Membership, MembershipStatus, PeriodMonth, Role, ScheduleCategory,
    SignatureLogEntry, TimeEntryPatch, User,
};
use shift_ledger::store::MemoryStore;

// =============================================================================
// Test Helpers
// =============================================================================

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn utc(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
}

struct TestRestaurant {
    engine: Arc<Engine>,
    store: Arc<MemoryStore>,
    audit: Arc<MemoryAuditSink>,
    clock: Arc<FixedClock>,
    restaurant_id: Uuid,
    kitchen: ScheduleCategory,
    bar: ScheduleCategory,
    manager: Actor,
}

fn create_test_restaurant() -> TestRestaurant {
    let config = ConfigLoader::load("./config/engine.yaml").expect("Failed to load config");
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    // 07:00 UTC is 08:00 in Warsaw in January.
    let clock = Arc::new(FixedClock::new(utc(15, 7)));
    let engine = Arc::new(Engine::new(
        Stores::from_single(store.clone()),
        audit.clone(),
        clock.clone(),
        config,
    ));

    let restaurant_id = Uuid::new_v4();
    store.add_restaurant(restaurant_id).unwrap();
    let add_category = |name: &str| {
        let category = ScheduleCategory {
            id: Uuid::new_v4(),
            restaurant_id,
            name: name.to_string(),
        };
        store.add_category(category.clone()).unwrap();
        category
    };
    let kitchen = add_category("Kitchen");
    let bar = add_category("Bar");

    TestRestaurant {
        engine,
        store,
        audit,
        clock,
        restaurant_id,
        kitchen,
        bar,
        manager: Actor {
            user_id: Uuid::new_v4(),
            role: Role::Manager,
            membership_id: None,
        },
    }
}

impl TestRestaurant {
    fn hire(&self, name: &str, role: Role, default_rate: Option<&str>, manager_rate: Option<&str>) -> (Membership, Actor) {
        let user = User {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            default_rate: default_rate.map(decimal),
        };
        self.store.add_user(user.clone()).unwrap();
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: user.id,
            restaurant_id: self.restaurant_id,
            role,
            status: MembershipStatus::Active,
            manager_rate: manager_rate.map(decimal),
        };
        self.store.add_membership(membership.clone()).unwrap();
        let actor = Actor {
            user_id: user.id,
            role,
            membership_id: Some(membership.id),
        };
        (membership, actor)
    }
}

// =============================================================================
// SECTION 1: Shift Overlap
// =============================================================================

#[test]
fn test_midnight_crossing_shift_blocks_next_morning() {
    let r = create_test_restaurant();
    let (worker, _) = r.hire("Ola", Role::Employee, Some("35"), None);

    let night = r
        .engine
        .create_shift(r.kitchen.id, utc(15, 22), utc(16, 2), None, &r.manager)
        .unwrap();
    r.engine.assign_shift(night.id, worker.id, &r.manager).unwrap();

    let check = r
        .engine
        .check_shift_overlap(worker.id, utc(16, 1), utc(16, 5), None)
        .unwrap();
    assert!(check.has_overlap);
    let conflict = check.conflict.unwrap();
    assert_eq!(conflict.shift_id, night.id);
    assert_eq!(conflict.interval.start, utc(15, 22));
    assert_eq!(conflict.interval.end, utc(16, 2));

    let touching = r
        .engine
        .check_shift_overlap(worker.id, utc(16, 2), utc(16, 5), None)
        .unwrap();
    assert!(!touching.has_overlap);
    assert!(touching.conflict.is_none());
}

#[test]
fn test_assignment_in_other_category_is_rejected_with_conflicting_shift() {
    let r = create_test_restaurant();
    let (worker, _) = r.hire("Ola", Role::Employee, Some("35"), None);

    let kitchen = r
        .engine
        .create_shift(r.kitchen.id, utc(15, 9), utc(15, 17), None, &r.manager)
        .unwrap();
    let bar = r
        .engine
        .create_shift(r.bar.id, utc(15, 16), utc(15, 22), None, &r.manager)
        .unwrap();
    r.engine.assign_shift(kitchen.id, worker.id, &r.manager).unwrap();

    let err = r.engine.assign_shift(bar.id, worker.id, &r.manager).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    match err {
        EngineError::Conflict(ConflictDetail::ShiftOverlap { shift_id, category_name, interval }) => {
            assert_eq!(shift_id, kitchen.id);
            assert_eq!(category_name, "Kitchen");
            assert_eq!(interval.end, utc(15, 17));
        }
        other => panic!("Expected ShiftOverlap, got {:?}", other),
    }
}

#[test]
fn test_validate_shift_times_uses_configured_maximum() {
    let r = create_test_restaurant();
    assert!(r.engine.validate_shift_times(utc(15, 8), utc(16, 8)).is_ok());

    let err = r.engine.validate_shift_times(utc(15, 8), utc(16, 9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = r.engine.validate_shift_times(utc(15, 8), utc(15, 8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// =============================================================================
// SECTION 2: Clock-in / Clock-out
// =============================================================================

#[test]
fn test_duplicate_clock_in_is_conflict() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);

    let entry = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    let err = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    match err {
        EngineError::Conflict(ConflictDetail::OpenEntry { entry_id, clock_in, .. }) => {
            assert_eq!(entry_id, entry.id);
            assert_eq!(clock_in, utc(15, 7));
        }
        other => panic!("Expected OpenEntry, got {:?}", other),
    }

    // A different schedule is a separate entry.
    assert!(r.engine.clock_in(worker.id, r.bar.id, &actor).is_ok());
}

#[test]
fn test_clock_out_without_open_entry_is_not_found() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);

    let err = r
        .engine
        .clock_out_open(worker.id, r.kitchen.id, &actor)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_concurrent_clock_ins_create_one_entry() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = r.engine.clone();
            let schedule_id = r.kitchen.id;
            thread::spawn(move || engine.clock_in(worker.id, schedule_id, &actor))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::Conflict)
    );
}

#[test]
fn test_clock_out_then_approve() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);

    r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(8));
    let closed = r.engine.clock_out_open(worker.id, r.kitchen.id, &actor).unwrap();
    assert_eq!(closed.status, EntryStatus::Pending);
    assert_eq!(closed.effective_minutes(), Some(480));

    let approved = r
        .engine
        .approve_or_reject(closed.id, true, None, &r.manager)
        .unwrap();
    assert_eq!(approved.status, EntryStatus::Approved);

    let err = r
        .engine
        .approve_or_reject(closed.id, false, Some("late"), &r.manager)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

// =============================================================================
// SECTION 3: Report Aggregation
// =============================================================================

#[test]
fn test_end_to_end_daily_totals_21_hours_930() {
    let r = create_test_restaurant();
    let (anna, anna_actor) = r.hire("Anna", Role::Employee, Some("55"), None);
    let (bartek, bartek_actor) = r.hire("Bartek", Role::Employee, Some("35"), None);
    let (celina, celina_actor) = r.hire("Celina", Role::Employee, Some("40"), None);

    let a = r.engine.clock_in(anna.id, r.kitchen.id, &anna_actor).unwrap();
    let b = r.engine.clock_in(bartek.id, r.bar.id, &bartek_actor).unwrap();
    let c = r.engine.clock_in(celina.id, r.kitchen.id, &celina_actor).unwrap();

    r.clock.advance(Duration::hours(6));
    r.engine.clock_out(b.id, &bartek_actor).unwrap();
    r.clock.advance(Duration::hours(1));
    r.engine.clock_out(c.id, &celina_actor).unwrap();
    r.clock.advance(Duration::hours(1));
    r.engine.clock_out(a.id, &anna_actor).unwrap();

    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), Some(&r.manager))
        .unwrap();

    let summary = &report.totals.summary;
    assert_eq!(summary.total_employees, 3);
    assert_eq!(summary.total_hours, decimal("21.00"));
    assert_eq!(summary.total_amount, decimal("930.00"));
    assert_eq!(summary.currency, "PLN");

    let names: Vec<&str> = report
        .totals
        .employees
        .iter()
        .map(|row| row.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Anna", "Bartek", "Celina"]);
    let amounts: Vec<Decimal> = report.totals.employees.iter().map(|row| row.total_amount).collect();
    assert_eq!(amounts, vec![decimal("440.00"), decimal("210.00"), decimal("280.00")]);
}

#[test]
fn test_open_entries_never_count() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();

    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), None)
        .unwrap();
    assert_eq!(report.totals.summary.total_employees, 0);
    assert_eq!(report.totals.summary.total_hours, decimal("0.00"));
    assert_eq!(report.totals.summary.total_amount, decimal("0.00"));
}

#[test]
fn test_duplicate_daily_report_is_conflict_and_keeps_first_totals() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    let entry = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(4));
    r.engine.clock_out(entry.id, &actor).unwrap();

    let first = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), None)
        .unwrap();

    let more = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(2));
    r.engine.clock_out(more.id, &actor).unwrap();

    let err = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = r.engine.daily_report(r.restaurant_id, date(15)).unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.totals, first.totals);
    assert_eq!(stored.totals.summary.total_hours, decimal("4.00"));
}

#[test]
fn test_concurrent_daily_generation_creates_one_report() {
    let r = create_test_restaurant();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = r.engine.clone();
            let restaurant_id = r.restaurant_id;
            thread::spawn(move || engine.generate_daily_report(restaurant_id, date(15), None))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
}

#[test]
fn test_unknown_restaurant_is_not_found() {
    let r = create_test_restaurant();
    let err = r
        .engine
        .generate_monthly_report(Uuid::new_v4(), PeriodMonth::new(2026, 1).unwrap(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_weekly_and_monthly_source_entries_directly() {
    let r = create_test_restaurant();
    let (manager, manager_actor) = r.hire("Marta", Role::Manager, Some("30"), Some("50"));

    for day in [13, 14, 15] {
        r.clock.set(utc(day, 8));
        let entry = r.engine.clock_in(manager.id, r.kitchen.id, &manager_actor).unwrap();
        r.clock.advance(Duration::hours(5));
        r.engine.clock_out(entry.id, &manager_actor).unwrap();
    }

    let err = r
        .engine
        .generate_weekly_report(r.restaurant_id, date(13), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let weekly = r
        .engine
        .generate_weekly_report(r.restaurant_id, date(12), None)
        .unwrap();
    assert_eq!(weekly.totals.summary.total_hours, decimal("15.00"));
    assert_eq!(weekly.totals.summary.total_amount, decimal("750.00"));
    assert_eq!(weekly.totals.employees[0].rate, decimal("50"));

    let monthly = r
        .engine
        .generate_monthly_report(r.restaurant_id, PeriodMonth::new(2026, 1).unwrap(), None)
        .unwrap();
    assert_eq!(monthly.totals, weekly.totals);
}

// =============================================================================
// SECTION 4: Signing and the Edit Gate
// =============================================================================

#[test]
fn test_generate_edit_sign_freezes_current_totals() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    let entry = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(8));
    r.engine.clock_out(entry.id, &actor).unwrap();

    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), Some(&r.manager))
        .unwrap();
    assert_eq!(report.totals.summary.total_hours, decimal("8.00"));

    let patch = TimeEntryPatch {
        adjustment_minutes: Some(-240),
        reason: Some("left after lunch".to_string()),
        ..Default::default()
    };
    let edited = r.engine.edit_time_entry(entry.id, &patch, &r.manager).unwrap();
    assert_eq!(edited.worked_minutes(), 240);

    let signed = r.engine.sign_report(report.id, &r.manager).unwrap();
    assert_eq!(signed.totals.summary.total_hours, decimal("4.00"));
    assert_eq!(signed.totals.summary.total_amount, decimal("140.00"));
    assert_eq!(
        r.engine.daily_report(r.restaurant_id, date(15)).unwrap().totals,
        signed.totals
    );
}

#[test]
fn test_overflowing_adjustment_is_rejected_without_panic() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    let entry = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(8));
    r.engine.clock_out(entry.id, &actor).unwrap();

    let patch = TimeEntryPatch {
        adjustment_minutes: Some(i64::MAX),
        ..Default::default()
    };
    let err = r.engine.edit_time_entry(entry.id, &patch, &r.manager).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), None)
        .unwrap();
    assert_eq!(report.totals.summary.total_hours, decimal("8.00"));
}

#[test]
fn test_summer_entry_after_local_midnight_locks_next_day() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    // 00:30 in Warsaw under summer time.
    r.clock.set(Utc.with_ymd_and_hms(2026, 7, 10, 22, 30, 0).unwrap());
    let entry = r.engine.clock_in(worker.id, r.bar.id, &actor).unwrap();
    r.clock.advance(Duration::hours(2));
    r.engine.clock_out(entry.id, &actor).unwrap();

    let july = |d| NaiveDate::from_ymd_opt(2026, 7, d).unwrap();
    let july_10 = r.engine.generate_daily_report(r.restaurant_id, july(10), None).unwrap();
    let july_11 = r.engine.generate_daily_report(r.restaurant_id, july(11), None).unwrap();
    assert_eq!(july_10.totals.summary.total_employees, 0);
    assert_eq!(july_11.totals.summary.total_hours, decimal("2.00"));

    r.engine.sign_report(july_11.id, &r.manager).unwrap();
    let err = r
        .engine
        .approve_or_reject(entry.id, true, None, &r.manager)
        .unwrap_err();
    assert!(matches!(err, EngineError::PeriodLocked { date: d, .. } if d == july(11)));
}

#[test]
fn test_sign_edit_unsign_edit_resign() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    let entry = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(8));
    r.engine.clock_out(entry.id, &actor).unwrap();

    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), Some(&r.manager))
        .unwrap();
    r.clock.advance(Duration::minutes(5));
    let signed = r.engine.sign_report(report.id, &r.manager).unwrap();
    assert_eq!(signed.signed_by(), Some(r.manager.user_id));

    let patch = TimeEntryPatch {
        adjustment_minutes: Some(-30),
        reason: Some("unpaid break".to_string()),
        ..Default::default()
    };
    let err = r
        .engine
        .edit_time_entry(entry.id, &patch, &r.manager)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(err, EngineError::PeriodLocked { date: d, .. } if d == date(15)));
    assert_eq!(r.engine.time_entry(entry.id).unwrap().adjustment_minutes, 0);

    r.clock.advance(Duration::minutes(5));
    let unsigned = r
        .engine
        .unsign_report(report.id, &r.manager, "break was not deducted")
        .unwrap();
    assert!(!unsigned.is_signed());

    let edited = r.engine.edit_time_entry(entry.id, &patch, &r.manager).unwrap();
    assert_eq!(edited.effective_minutes(), Some(450));

    r.clock.advance(Duration::minutes(5));
    let resigned = r.engine.sign_report(report.id, &r.manager).unwrap();
    assert_eq!(resigned.totals.summary.total_hours, decimal("7.50"));

    let log = r.engine.signature_log(report.id).unwrap();
    let actions: Vec<&str> = log.iter().map(|e| e.action()).collect();
    assert_eq!(actions, vec!["signed", "unsigned", "signed"]);
    assert_ne!(log[0], log[2]);
    match &log[1] {
        SignatureLogEntry::Unsigned {
            reason,
            previous_signed_by,
            previous_signed_at,
            ..
        } => {
            assert_eq!(reason, "break was not deducted");
            assert_eq!(*previous_signed_by, r.manager.user_id);
            assert_eq!(Some(*previous_signed_at), signed.signed_at());
        }
        other => panic!("Expected Unsigned, got {:?}", other),
    }
}

#[test]
fn test_signing_twice_and_unsigning_unsigned_are_invalid_state() {
    let r = create_test_restaurant();
    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), None)
        .unwrap();

    let err = r
        .engine
        .unsign_report(report.id, &r.manager, "typo")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    r.engine.sign_report(report.id, &r.manager).unwrap();
    let err = r.engine.sign_report(report.id, &r.manager).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = r.engine.unsign_report(report.id, &r.manager, "  ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_signed_day_does_not_lock_other_days() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);

    r.clock.set(utc(14, 9));
    let yesterday = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(4));
    r.engine.clock_out(yesterday.id, &actor).unwrap();

    r.clock.set(utc(15, 9));
    let today = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(4));
    r.engine.clock_out(today.id, &actor).unwrap();

    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(14), None)
        .unwrap();
    r.engine.sign_report(report.id, &r.manager).unwrap();

    assert!(
        r.engine
            .approve_or_reject(yesterday.id, true, None, &r.manager)
            .is_err()
    );
    assert!(
        r.engine
            .approve_or_reject(today.id, true, None, &r.manager)
            .is_ok()
    );
}

#[test]
fn test_delete_daily_report_requires_unsigned() {
    let r = create_test_restaurant();
    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), None)
        .unwrap();
    r.engine.sign_report(report.id, &r.manager).unwrap();

    let err = r
        .engine
        .delete_daily_report(report.id, &r.manager)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    r.engine.unsign_report(report.id, &r.manager, "regenerate").unwrap();
    r.engine.delete_daily_report(report.id, &r.manager).unwrap();
    assert!(r.engine.signature_for(r.restaurant_id, date(15)).unwrap().is_none());
    assert!(
        r.engine
            .generate_daily_report(r.restaurant_id, date(15), None)
            .is_ok()
    );
}

// =============================================================================
// SECTION 5: Audit
// =============================================================================

struct BrokenSink;

impl AuditSink for BrokenSink {
    fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Err(AuditError {
            message: "connection refused".to_string(),
        })
    }
}

#[test]
fn test_audit_failure_never_aborts_operation() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        Stores::from_single(store.clone()),
        Arc::new(BrokenSink),
        Arc::new(FixedClock::new(utc(15, 9))),
        ConfigLoader::default(),
    );
    let restaurant_id = Uuid::new_v4();
    store.add_restaurant(restaurant_id).unwrap();
    let manager = Actor {
        user_id: Uuid::new_v4(),
        role: Role::Owner,
        membership_id: None,
    };

    let report = engine
        .generate_daily_report(restaurant_id, date(15), Some(&manager))
        .unwrap();
    assert!(engine.sign_report(report.id, &manager).unwrap().is_signed());
}

#[test]
fn test_audit_records_each_transition() {
    let r = create_test_restaurant();
    let (worker, actor) = r.hire("Ola", Role::Employee, Some("35"), None);
    let entry = r.engine.clock_in(worker.id, r.kitchen.id, &actor).unwrap();
    r.clock.advance(Duration::hours(3));
    r.engine.clock_out(entry.id, &actor).unwrap();
    r.engine.approve_or_reject(entry.id, true, None, &r.manager).unwrap();
    let report = r
        .engine
        .generate_daily_report(r.restaurant_id, date(15), Some(&r.manager))
        .unwrap();
    r.engine.sign_report(report.id, &r.manager).unwrap();

    assert_eq!(
        r.audit.actions(),
        vec!["clock_in", "clock_out", "approve", "generate", "sign"]
    );
    let sign = r.audit.records().pop().unwrap();
    assert_eq!(sign.entity_type, "report_daily");
    assert_eq!(sign.actor, Some(r.manager.user_id));
    assert!(sign.before.is_some() && sign.after.is_some());
}
