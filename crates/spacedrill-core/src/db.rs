// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use serde::Serialize;

use crate::error::Error;
use crate::error::Fallible;
use crate::types::card_state::CardState;
use crate::types::ids::CardId;
use crate::types::ids::LearnerId;
use crate::types::ids::StageId;
use crate::types::ids::UnitId;
use crate::types::progress::StageProgress;
use crate::types::progress::UnitProgress;
use crate::types::review_event::ReviewEvent;
use crate::types::schedule::CardScheduleState;
use crate::types::schedule::Schedule;
use crate::types::timestamp::Timestamp;

/// How long a connection waits on another writer's lock before the write is
/// reported as a conflict.
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let conn = Connection::open(database_path)?;
        Self::setup(conn)
    }

    pub fn in_memory() -> Fallible<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup(conn)
    }

    fn setup(mut conn: Connection) -> Fallible<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating database schema.");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// Run read-only queries.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Fallible<T>) -> Fallible<T> {
        let conn = self.acquire();
        f(&conn)
    }

    /// Run `f` inside a write transaction. The transaction takes the write
    /// lock up front, and commits only if `f` succeeds.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction) -> Fallible<T>) -> Fallible<T> {
        let mut conn = self.acquire();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn acquire(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a transaction open: the
        // transaction rolls back when it is dropped during unwinding.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

const SCHEDULE_COLUMNS: &str = "learner_id, card_id, ease_factor, interval_minutes, repetitions, state, next_review_at, last_reviewed_at, created_at, version";

fn schedule_from_row(row: &Row) -> rusqlite::Result<CardScheduleState> {
    Ok(CardScheduleState {
        learner_id: row.get(0)?,
        card_id: row.get(1)?,
        schedule: Schedule {
            ease_factor: row.get(2)?,
            interval: row.get(3)?,
            repetitions: row.get(4)?,
            state: row.get(5)?,
        },
        next_review_date: row.get(6)?,
        last_reviewed_at: row.get(7)?,
        created_at: row.get(8)?,
        version: row.get(9)?,
    })
}

pub fn select_schedule(
    conn: &Connection,
    learner: &LearnerId,
    card: &CardId,
) -> Fallible<Option<CardScheduleState>> {
    let sql = format!(
        "select {SCHEDULE_COLUMNS} from card_schedule where learner_id = ? and card_id = ?;"
    );
    let state = conn
        .query_row(&sql, (learner, card), schedule_from_row)
        .optional()?;
    Ok(state)
}

/// Insert a scheduling record unless one already exists for the pair.
/// Returns whether a row was inserted.
pub fn insert_schedule_if_absent(conn: &Connection, state: &CardScheduleState) -> Fallible<bool> {
    let sql = "insert into card_schedule (learner_id, card_id, ease_factor, interval_minutes, repetitions, state, next_review_at, last_reviewed_at, created_at, version) values (?, ?, ?, ?, ?, ?, ?, ?, ?, 0) on conflict (learner_id, card_id) do nothing;";
    let changed = conn.execute(
        sql,
        (
            &state.learner_id,
            &state.card_id,
            state.schedule.ease_factor,
            state.schedule.interval,
            state.schedule.repetitions,
            state.schedule.state,
            state.next_review_date,
            state.last_reviewed_at,
            state.created_at,
        ),
    )?;
    Ok(changed == 1)
}

/// Overwrite a scheduling record, provided nobody else has written it since
/// it was read. `state.version` must be the version that was read.
pub fn update_schedule(conn: &Connection, state: &CardScheduleState) -> Fallible<()> {
    let sql = "update card_schedule set ease_factor = ?, interval_minutes = ?, repetitions = ?, state = ?, next_review_at = ?, last_reviewed_at = ?, version = version + 1 where learner_id = ? and card_id = ? and version = ?;";
    let changed = conn.execute(
        sql,
        (
            state.schedule.ease_factor,
            state.schedule.interval,
            state.schedule.repetitions,
            state.schedule.state,
            state.next_review_date,
            state.last_reviewed_at,
            &state.learner_id,
            &state.card_id,
            state.version,
        ),
    )?;
    if changed == 0 {
        return Err(Error::StoreConflict(format!(
            "schedule for learner {} card {} changed concurrently",
            state.learner_id, state.card_id
        )));
    }
    Ok(())
}

/// Filters for [`select_due`].
pub struct DueQuery<'a> {
    pub learner: &'a LearnerId,
    pub now: Timestamp,
    /// Cards reviewed after this instant are held back.
    pub cooldown_cutoff: Timestamp,
    pub include_new: bool,
    pub limit: usize,
}

pub fn select_due(conn: &Connection, query: &DueQuery) -> Fallible<Vec<CardScheduleState>> {
    let sql = format!(
        "select {SCHEDULE_COLUMNS} from card_schedule \
         where learner_id = ?1 \
           and next_review_at <= ?2 \
           and (last_reviewed_at is null or last_reviewed_at <= ?3) \
           and (?4 or state <> 'new') \
         order by case state when 'new' then 0 when 'learning' then 1 else 2 end, next_review_at, card_id \
         limit ?5;"
    );
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        (
            query.learner,
            query.now,
            query.cooldown_cutoff,
            query.include_new,
            limit,
        ),
        schedule_from_row,
    )?;
    let mut due = Vec::new();
    for row in rows {
        due.push(row?);
    }
    Ok(due)
}

/// Count the learner's cards first reviewed at or after `since`. Only
/// events since the card was provisioned count, so a card provisioned again
/// after a reset is new again.
pub fn count_introduced_since(
    conn: &Connection,
    learner: &LearnerId,
    since: Timestamp,
) -> Fallible<usize> {
    let sql = "select count(*) from card_schedule s \
               where s.learner_id = ?1 \
               and (select min(e.reviewed_at) from review_events e \
                    where e.learner_id = s.learner_id and e.card_id = s.card_id \
                    and e.reviewed_at >= s.created_at) >= ?2;";
    let count: i64 = conn.query_row(sql, (learner, since), |row| row.get(0))?;
    Ok(count as usize)
}

/// Count the learner's records due at `now`, per state.
pub fn count_due_by_state(
    conn: &Connection,
    learner: &LearnerId,
    now: Timestamp,
) -> Fallible<Vec<(CardState, usize)>> {
    let sql = "select state, count(*) from card_schedule where learner_id = ? and next_review_at <= ? group by state;";
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query((learner, now))?;
    let mut counts = Vec::new();
    while let Some(row) = rows.next()? {
        let state: CardState = row.get(0)?;
        let count: i64 = row.get(1)?;
        counts.push((state, count as usize));
    }
    Ok(counts)
}

pub fn insert_review_event(conn: &Connection, event: &ReviewEvent) -> Fallible<i64> {
    let sql = "insert into review_events (learner_id, card_id, result, time_taken_seconds, ease_factor_after, interval_after, reviewed_at) values (?, ?, ?, ?, ?, ?, ?) returning review_id;";
    let review_id: i64 = conn.query_row(
        sql,
        (
            &event.learner_id,
            &event.card_id,
            event.result,
            event.time_taken_seconds,
            event.ease_factor_after,
            event.interval_after,
            event.reviewed_at,
        ),
        |row| row.get(0),
    )?;
    Ok(review_id)
}

const EVENT_COLUMNS: &str = "learner_id, card_id, result, time_taken_seconds, ease_factor_after, interval_after, reviewed_at";

fn event_from_row(row: &Row) -> rusqlite::Result<ReviewEvent> {
    Ok(ReviewEvent {
        learner_id: row.get(0)?,
        card_id: row.get(1)?,
        result: row.get(2)?,
        time_taken_seconds: row.get(3)?,
        ease_factor_after: row.get(4)?,
        interval_after: row.get(5)?,
        reviewed_at: row.get(6)?,
    })
}

/// The learner's review events with `from <= reviewed_at <= until`, oldest
/// first.
pub fn select_review_events(
    conn: &Connection,
    learner: &LearnerId,
    from: Timestamp,
    until: Timestamp,
) -> Fallible<Vec<ReviewEvent>> {
    let sql = format!(
        "select {EVENT_COLUMNS} from review_events where learner_id = ? and reviewed_at >= ? and reviewed_at <= ? order by reviewed_at, review_id;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map((learner, from, until), event_from_row)?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

pub fn select_card_events(
    conn: &Connection,
    learner: &LearnerId,
    card: &CardId,
) -> Fallible<Vec<ReviewEvent>> {
    let sql = format!(
        "select {EVENT_COLUMNS} from review_events where learner_id = ? and card_id = ? order by reviewed_at, review_id;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map((learner, card), event_from_row)?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

pub fn select_unit_progress(
    conn: &Connection,
    learner: &LearnerId,
    unit: &UnitId,
) -> Fallible<Option<UnitProgress>> {
    let sql = "select is_completed, completed_at, watch_time_seconds from unit_progress where learner_id = ? and unit_id = ?;";
    let progress = conn
        .query_row(sql, (learner, unit), |row| {
            let watch_time: i64 = row.get(2)?;
            Ok(UnitProgress {
                learner_id: learner.clone(),
                unit_id: unit.clone(),
                is_completed: row.get(0)?,
                completed_at: row.get(1)?,
                watch_time_seconds: watch_time.max(0) as u64,
            })
        })
        .optional()?;
    Ok(progress)
}

pub fn add_watch_time(
    conn: &Connection,
    learner: &LearnerId,
    unit: &UnitId,
    seconds: u64,
) -> Fallible<()> {
    let seconds = i64::try_from(seconds)
        .map_err(|_| Error::InvalidInput(format!("watch time too large: {seconds}")))?;
    let sql = "insert into unit_progress (learner_id, unit_id, watch_time_seconds) values (?1, ?2, ?3) \
               on conflict (learner_id, unit_id) do update set watch_time_seconds = watch_time_seconds + ?3;";
    conn.execute(sql, (learner, unit, seconds))?;
    Ok(())
}

/// Mark a unit completed. Completing it again keeps the original
/// completion time.
pub fn mark_unit_completed(
    conn: &Connection,
    learner: &LearnerId,
    unit: &UnitId,
    now: Timestamp,
) -> Fallible<()> {
    let sql = "insert into unit_progress (learner_id, unit_id, is_completed, completed_at) values (?1, ?2, 1, ?3) \
               on conflict (learner_id, unit_id) do update set is_completed = 1, completed_at = coalesce(completed_at, ?3);";
    conn.execute(sql, (learner, unit, now))?;
    Ok(())
}

pub fn select_completed_units(conn: &Connection, learner: &LearnerId) -> Fallible<HashSet<UnitId>> {
    let sql = "select unit_id from unit_progress where learner_id = ? and is_completed = 1;";
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([learner])?;
    let mut units = HashSet::new();
    while let Some(row) = rows.next()? {
        units.insert(row.get(0)?);
    }
    Ok(units)
}

pub fn select_stage_progress(
    conn: &Connection,
    learner: &LearnerId,
    stage: &StageId,
) -> Fallible<Option<StageProgress>> {
    let sql = "select is_completed, completed_at from stage_progress where learner_id = ? and stage_id = ?;";
    let progress = conn
        .query_row(sql, (learner, stage), |row| {
            Ok(StageProgress {
                learner_id: learner.clone(),
                stage_id: stage.clone(),
                is_completed: row.get(0)?,
                completed_at: row.get(1)?,
            })
        })
        .optional()?;
    Ok(progress)
}

pub fn mark_stage_completed(
    conn: &Connection,
    learner: &LearnerId,
    stage: &StageId,
    now: Timestamp,
) -> Fallible<()> {
    let sql = "insert into stage_progress (learner_id, stage_id, is_completed, completed_at) values (?1, ?2, 1, ?3) \
               on conflict (learner_id, stage_id) do update set is_completed = 1, completed_at = coalesce(completed_at, ?3);";
    conn.execute(sql, (learner, stage, now))?;
    Ok(())
}

/// Row counts removed by a progress reset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCounts {
    pub schedules: usize,
    pub unit_progress: usize,
    pub stage_progress: usize,
}

/// Delete the learner's schedules and progress. Review events are history
/// and stay.
pub fn delete_learner(conn: &Connection, learner: &LearnerId) -> Fallible<ResetCounts> {
    Ok(ResetCounts {
        schedules: conn.execute("delete from card_schedule where learner_id = ?;", [learner])?,
        unit_progress: conn.execute("delete from unit_progress where learner_id = ?;", [learner])?,
        stage_progress: conn.execute("delete from stage_progress where learner_id = ?;", [learner])?,
    })
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["card_schedule"], |row| row.get(0))?;
    Ok(count > 0)
}
