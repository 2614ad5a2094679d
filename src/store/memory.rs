//! In-memory implementation of every persistence port.
//!
//! Uniqueness constraints are enforced inside the same write lock as the
//! insert, so two racing callers cannot both pass. Daily report writes are
//! serialized per `(restaurant, date)` through [`ReportStore::with_day_locks`],
//! and shift bookings per membership through
//! [`ShiftStore::with_membership_locks`].

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::NaiveDate;
use uuid::Uuid;

use super::{
    DayLockFn, MembershipLockFn, MembershipStore, ReportStore, ShiftStore, TimeEntryStore,
};
use crate::calculation::Interval;
use crate::error::{ConflictDetail, EngineError, EngineResult};
use crate::models::{
    AssignedShift, Membership, PeriodMonth, ReportDaily, ReportMonthly, ReportWeekly,
    ScheduleCategory, Shift, ShiftAssignment, TimeEntry, User,
};

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::Internal {
        message: "store lock poisoned".to_string(),
    }
}

/// One mutex per key, created on first use and dropped again once no caller
/// holds or waits for it.
#[derive(Debug)]
struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Eq + Hash + Ord> KeyedLocks<K> {
    /// Runs `f` while holding the locks of `keys`, acquired in key order.
    fn run<T>(&self, keys: &[K], f: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let handles = {
            let mut locks = self.locks.lock().map_err(poisoned)?;
            keys.iter()
                .map(|key| locks.entry(*key).or_default().clone())
                .collect::<Vec<_>>()
        };

        let result = match handles
            .iter()
            .map(|handle| handle.lock().map_err(poisoned))
            .collect::<EngineResult<Vec<MutexGuard<'_, ()>>>>()
        {
            Ok(_guards) => f(),
            Err(err) => Err(err),
        };
        drop(handles);

        // Handles are only cloned under the map lock, so a count of one
        // means nobody else holds or waits for this key.
        let mut locks = self.locks.lock().map_err(poisoned)?;
        for key in &keys {
            if locks.get(key).is_some_and(|handle| Arc::strong_count(handle) == 1) {
                locks.remove(key);
            }
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// A thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    restaurants: RwLock<HashSet<Uuid>>,
    users: RwLock<HashMap<Uuid, User>>,
    memberships: RwLock<HashMap<Uuid, Membership>>,
    categories: RwLock<HashMap<Uuid, ScheduleCategory>>,
    shifts: RwLock<HashMap<Uuid, Shift>>,
    assignments: RwLock<HashMap<Uuid, ShiftAssignment>>,
    entries: Mutex<HashMap<Uuid, TimeEntry>>,
    daily: RwLock<HashMap<Uuid, ReportDaily>>,
    weekly: RwLock<HashMap<Uuid, ReportWeekly>>,
    monthly: RwLock<HashMap<Uuid, ReportMonthly>>,
    day_locks: KeyedLocks<(Uuid, NaiveDate)>,
    membership_locks: KeyedLocks<Uuid>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a restaurant id.
    pub fn add_restaurant(&self, restaurant_id: Uuid) -> EngineResult<()> {
        self.restaurants.write().map_err(poisoned)?.insert(restaurant_id);
        Ok(())
    }

    /// Adds or replaces a user.
    pub fn add_user(&self, user: User) -> EngineResult<()> {
        self.users.write().map_err(poisoned)?.insert(user.id, user);
        Ok(())
    }

    /// Adds or replaces a membership.
    pub fn add_membership(&self, membership: Membership) -> EngineResult<()> {
        self.memberships
            .write()
            .map_err(poisoned)?
            .insert(membership.id, membership);
        Ok(())
    }

    /// Adds or replaces a schedule category.
    pub fn add_category(&self, category: ScheduleCategory) -> EngineResult<()> {
        self.categories
            .write()
            .map_err(poisoned)?
            .insert(category.id, category);
        Ok(())
    }

    /// Number of day and membership locks currently registered.
    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.day_locks.len() + self.membership_locks.len()
    }
}

impl MembershipStore for MemoryStore {
    fn restaurant_exists(&self, restaurant_id: Uuid) -> EngineResult<bool> {
        Ok(self.restaurants.read().map_err(poisoned)?.contains(&restaurant_id))
    }

    fn membership(&self, id: Uuid) -> EngineResult<Option<Membership>> {
        Ok(self.memberships.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn memberships_for_restaurant(&self, restaurant_id: Uuid) -> EngineResult<Vec<Membership>> {
        let memberships = self.memberships.read().map_err(poisoned)?;
        let mut found: Vec<Membership> = memberships
            .values()
            .filter(|m| m.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.id);
        Ok(found)
    }

    fn user(&self, id: Uuid) -> EngineResult<Option<User>> {
        Ok(self.users.read().map_err(poisoned)?.get(&id).cloned())
    }
}

impl ShiftStore for MemoryStore {
    fn category(&self, id: Uuid) -> EngineResult<Option<ScheduleCategory>> {
        Ok(self.categories.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn shift(&self, id: Uuid) -> EngineResult<Option<Shift>> {
        Ok(self.shifts.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn insert_shift(&self, shift: Shift) -> EngineResult<Shift> {
        self.shifts
            .write()
            .map_err(poisoned)?
            .insert(shift.id, shift.clone());
        Ok(shift)
    }

    fn update_shift(&self, shift: Shift) -> EngineResult<Shift> {
        let mut shifts = self.shifts.write().map_err(poisoned)?;
        match shifts.get_mut(&shift.id) {
            Some(stored) => {
                *stored = shift.clone();
                Ok(shift)
            }
            None => Err(EngineError::not_found("Shift", shift.id)),
        }
    }

    fn assignments_for_membership(&self, membership_id: Uuid) -> EngineResult<Vec<AssignedShift>> {
        let assignments = self.assignments.read().map_err(poisoned)?;
        let shifts = self.shifts.read().map_err(poisoned)?;
        let categories = self.categories.read().map_err(poisoned)?;

        let mut found: Vec<AssignedShift> = assignments
            .values()
            .filter(|a| a.membership_id == membership_id)
            .filter_map(|a| {
                let shift = shifts.get(&a.shift_id)?;
                let category_name = categories
                    .get(&shift.category_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                Some(AssignedShift {
                    shift: shift.clone(),
                    category_name,
                    status: a.status,
                })
            })
            .collect();
        found.sort_by(|a, b| {
            a.shift
                .start
                .cmp(&b.shift.start)
                .then_with(|| a.shift.id.cmp(&b.shift.id))
        });
        Ok(found)
    }

    fn assignments_for_shift(&self, shift_id: Uuid) -> EngineResult<Vec<ShiftAssignment>> {
        let assignments = self.assignments.read().map_err(poisoned)?;
        let mut found: Vec<ShiftAssignment> = assignments
            .values()
            .filter(|a| a.shift_id == shift_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.id);
        Ok(found)
    }

    fn assignment(&self, id: Uuid) -> EngineResult<Option<ShiftAssignment>> {
        Ok(self.assignments.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn insert_assignment(&self, assignment: ShiftAssignment) -> EngineResult<ShiftAssignment> {
        self.assignments
            .write()
            .map_err(poisoned)?
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    fn update_assignment(&self, assignment: ShiftAssignment) -> EngineResult<ShiftAssignment> {
        let mut assignments = self.assignments.write().map_err(poisoned)?;
        match assignments.get_mut(&assignment.id) {
            Some(stored) => {
                *stored = assignment.clone();
                Ok(assignment)
            }
            None => Err(EngineError::not_found("Shift assignment", assignment.id)),
        }
    }

    fn with_membership_locks(
        &self,
        membership_ids: &[Uuid],
        f: &mut MembershipLockFn<'_>,
    ) -> EngineResult<()> {
        self.membership_locks.run(membership_ids, || f())
    }
}

impl TimeEntryStore for MemoryStore {
    fn insert_open(&self, entry: TimeEntry) -> EngineResult<TimeEntry> {
        let mut entries = self.entries.lock().map_err(poisoned)?;

        if let Some(open) = entries.values().find(|e| {
            e.is_open() && e.membership_id == entry.membership_id && e.schedule_id == entry.schedule_id
        }) {
            return Err(EngineError::Conflict(ConflictDetail::OpenEntry {
                entry_id: open.id,
                membership_id: open.membership_id,
                schedule_id: open.schedule_id,
                clock_in: open.clock_in(),
            }));
        }

        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn entry(&self, id: Uuid) -> EngineResult<Option<TimeEntry>> {
        Ok(self.entries.lock().map_err(poisoned)?.get(&id).cloned())
    }

    fn find_open(&self, membership_id: Uuid, schedule_id: Uuid) -> EngineResult<Option<TimeEntry>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries
            .values()
            .find(|e| e.is_open() && e.membership_id == membership_id && e.schedule_id == schedule_id)
            .cloned())
    }

    fn update(&self, entry: TimeEntry) -> EngineResult<TimeEntry> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let stored = entries
            .get_mut(&entry.id)
            .ok_or_else(|| EngineError::not_found("Time entry", entry.id))?;

        if stored.version != entry.version {
            return Err(EngineError::Conflict(ConflictDetail::StaleWrite {
                entity: "Time entry",
                id: entry.id,
            }));
        }

        let mut updated = entry;
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    fn completed_in_window(
        &self,
        membership_ids: &[Uuid],
        window: Interval,
    ) -> EngineResult<Vec<TimeEntry>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        let mut found: Vec<TimeEntry> = entries
            .values()
            .filter(|e| !e.is_open() && membership_ids.contains(&e.membership_id))
            .filter(|e| window.start <= e.clock_in() && e.clock_in() < window.end)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.clock_in().cmp(&b.clock_in()).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }
}

impl ReportStore for MemoryStore {
    fn insert_daily(&self, report: ReportDaily) -> EngineResult<ReportDaily> {
        let mut daily = self.daily.write().map_err(poisoned)?;
        if let Some(existing) = daily
            .values()
            .find(|r| r.restaurant_id == report.restaurant_id && r.date == report.date)
        {
            return Err(EngineError::Conflict(ConflictDetail::DuplicateReport {
                report_id: existing.id,
                restaurant_id: existing.restaurant_id,
                period: existing.date.to_string(),
            }));
        }
        daily.insert(report.id, report.clone());
        Ok(report)
    }

    fn daily(&self, id: Uuid) -> EngineResult<Option<ReportDaily>> {
        Ok(self.daily.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn daily_for_date(
        &self,
        restaurant_id: Uuid,
        date: NaiveDate,
    ) -> EngineResult<Option<ReportDaily>> {
        let daily = self.daily.read().map_err(poisoned)?;
        Ok(daily
            .values()
            .find(|r| r.restaurant_id == restaurant_id && r.date == date)
            .cloned())
    }

    fn update_daily(&self, report: ReportDaily) -> EngineResult<ReportDaily> {
        let mut daily = self.daily.write().map_err(poisoned)?;
        let stored = daily
            .get_mut(&report.id)
            .ok_or_else(|| EngineError::not_found("Daily report", report.id))?;

        if stored.version != report.version {
            return Err(EngineError::Conflict(ConflictDetail::StaleWrite {
                entity: "Daily report",
                id: report.id,
            }));
        }

        let mut updated = report;
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    fn delete_daily(&self, report: &ReportDaily) -> EngineResult<()> {
        let mut daily = self.daily.write().map_err(poisoned)?;
        match daily.get(&report.id) {
            None => Err(EngineError::not_found("Daily report", report.id)),
            Some(stored) if stored.version != report.version => {
                Err(EngineError::Conflict(ConflictDetail::StaleWrite {
                    entity: "Daily report",
                    id: report.id,
                }))
            }
            Some(_) => {
                daily.remove(&report.id);
                Ok(())
            }
        }
    }

    fn with_day_locks(
        &self,
        restaurant_id: Uuid,
        dates: &[NaiveDate],
        f: &mut DayLockFn<'_>,
    ) -> EngineResult<()> {
        let keys: Vec<(Uuid, NaiveDate)> = dates.iter().map(|date| (restaurant_id, *date)).collect();

        self.day_locks.run(&keys, || {
            let reports: Vec<ReportDaily> = {
                let daily = self.daily.read().map_err(poisoned)?;
                let mut found: Vec<ReportDaily> = daily
                    .values()
                    .filter(|r| r.restaurant_id == restaurant_id && dates.contains(&r.date))
                    .cloned()
                    .collect();
                found.sort_by_key(|r| r.date);
                found
            };
            f(&reports)
        })
    }

    fn insert_weekly(&self, report: ReportWeekly) -> EngineResult<ReportWeekly> {
        let mut weekly = self.weekly.write().map_err(poisoned)?;
        if let Some(existing) = weekly
            .values()
            .find(|r| r.restaurant_id == report.restaurant_id && r.week_start == report.week_start)
        {
            return Err(EngineError::Conflict(ConflictDetail::DuplicateReport {
                report_id: existing.id,
                restaurant_id: existing.restaurant_id,
                period: format!("week {}", existing.week_start),
            }));
        }
        weekly.insert(report.id, report.clone());
        Ok(report)
    }

    fn weekly_for(
        &self,
        restaurant_id: Uuid,
        week_start: NaiveDate,
    ) -> EngineResult<Option<ReportWeekly>> {
        let weekly = self.weekly.read().map_err(poisoned)?;
        Ok(weekly
            .values()
            .find(|r| r.restaurant_id == restaurant_id && r.week_start == week_start)
            .cloned())
    }

    fn delete_weekly(&self, id: Uuid) -> EngineResult<()> {
        self.weekly
            .write()
            .map_err(poisoned)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("Weekly report", id))
    }

    fn insert_monthly(&self, report: ReportMonthly) -> EngineResult<ReportMonthly> {
        let mut monthly = self.monthly.write().map_err(poisoned)?;
        if let Some(existing) = monthly.values().find(|r| {
            r.restaurant_id == report.restaurant_id && r.period_month == report.period_month
        }) {
            return Err(EngineError::Conflict(ConflictDetail::DuplicateReport {
                report_id: existing.id,
                restaurant_id: existing.restaurant_id,
                period: format!("month {}", existing.period_month),
            }));
        }
        monthly.insert(report.id, report.clone());
        Ok(report)
    }

    fn monthly_for(
        &self,
        restaurant_id: Uuid,
        period_month: PeriodMonth,
    ) -> EngineResult<Option<ReportMonthly>> {
        let monthly = self.monthly.read().map_err(poisoned)?;
        Ok(monthly
            .values()
            .find(|r| r.restaurant_id == restaurant_id && r.period_month == period_month)
            .cloned())
    }

    fn delete_monthly(&self, id: Uuid) -> EngineResult<()> {
        self.monthly
            .write()
            .map_err(poisoned)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found("Monthly report", id))
    }
}
