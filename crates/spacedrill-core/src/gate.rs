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

use serde::Serialize;

use crate::db;
use crate::db::ResetCounts;
use crate::engine::Engine;
use crate::error::Error;
use crate::error::Fallible;
use crate::scheduler::initial_state;
use crate::types::ids::LearnerId;
use crate::types::ids::StageId;
use crate::types::ids::UnitId;
use crate::types::progress::StageProgress;
use crate::types::progress::UnitProgress;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    /// Scheduling records created by this call. Cards that were already
    /// scheduled are not counted.
    pub cards_created: usize,
    /// Whether the unit's stage is (now) complete.
    pub stage_completed: bool,
}

impl Engine {
    /// Mark a unit completed, schedule each of its cards the learner has not
    /// seen yet, and complete the stage once all of its units are complete.
    pub fn complete_unit(&self, learner: &LearnerId, unit: &UnitId) -> Fallible<CompletionReport> {
        let cards = self.catalog.cards_in_unit(unit)?;
        let stage = self.catalog.stage_of(unit)?;
        let stage_units = self.catalog.units_in_stage(&stage)?;
        let now = self.clock.now();
        let report = self.retry("complete unit", || {
            self.db.write(|tx| {
                db::mark_unit_completed(tx, learner, unit, now)?;
                let mut cards_created = 0;
                for card in &cards {
                    let state = initial_state(learner.clone(), card.clone(), now);
                    if db::insert_schedule_if_absent(tx, &state)? {
                        cards_created += 1;
                    }
                }
                let completed = db::select_completed_units(tx, learner)?;
                let stage_completed = stage_units.iter().all(|u| completed.contains(u));
                if stage_completed {
                    db::mark_stage_completed(tx, learner, &stage, now)?;
                }
                Ok(CompletionReport {
                    cards_created,
                    stage_completed,
                })
            })
        })?;
        log::info!(
            "{learner} completed unit {unit}: {} cards scheduled",
            report.cards_created
        );
        if report.stage_completed {
            log::info!("{learner} completed stage {stage}");
        }
        Ok(report)
    }

    /// Add watched seconds to the learner's progress on a unit.
    pub fn record_watch_time(
        &self,
        learner: &LearnerId,
        unit: &UnitId,
        seconds: u64,
    ) -> Fallible<UnitProgress> {
        // Reject units the catalog does not know about.
        self.catalog.stage_of(unit)?;
        self.retry("record watch time", || {
            self.db.write(|tx| {
                db::add_watch_time(tx, learner, unit, seconds)?;
                db::select_unit_progress(tx, learner, unit)?
                    .ok_or_else(|| Error::NotFound(format!("unit progress {unit}")))
            })
        })
    }

    pub fn unit_progress(&self, learner: &LearnerId, unit: &UnitId) -> Fallible<UnitProgress> {
        let progress = self
            .db
            .read(|conn| db::select_unit_progress(conn, learner, unit))?;
        Ok(progress.unwrap_or_else(|| UnitProgress::untouched(learner.clone(), unit.clone())))
    }

    pub fn stage_progress(&self, learner: &LearnerId, stage: &StageId) -> Fallible<StageProgress> {
        let progress = self
            .db
            .read(|conn| db::select_stage_progress(conn, learner, stage))?;
        Ok(progress.unwrap_or_else(|| StageProgress::untouched(learner.clone(), stage.clone())))
    }

    /// A unit is unlocked if it is the first in its stage, or the unit before
    /// it is complete. Whether the stage itself is unlocked is a separate
    /// question, see [`Engine::is_stage_unlocked`].
    pub fn is_unit_unlocked(&self, learner: &LearnerId, unit: &UnitId) -> Fallible<bool> {
        let stage = self.catalog.stage_of(unit)?;
        let units = self.catalog.units_in_stage(&stage)?;
        let index = position(&units, unit)
            .ok_or_else(|| Error::NotFound(format!("unit {unit} in stage {stage}")))?;
        if index == 0 {
            return Ok(true);
        }
        let previous = &units[index - 1];
        Ok(self.unit_progress(learner, previous)?.is_completed)
    }

    /// A stage is unlocked if it is the first, or every unit of the stage
    /// before it is complete.
    pub fn is_stage_unlocked(&self, learner: &LearnerId, stage: &StageId) -> Fallible<bool> {
        let stages = self.catalog.stages();
        let index =
            position(&stages, stage).ok_or_else(|| Error::NotFound(format!("stage {stage}")))?;
        if index == 0 {
            return Ok(true);
        }
        let previous_units = self.catalog.units_in_stage(&stages[index - 1])?;
        let completed = self
            .db
            .read(|conn| db::select_completed_units(conn, learner))?;
        Ok(previous_units.iter().all(|u| completed.contains(u)))
    }

    /// Delete the learner's card schedules and unit and stage progress. The
    /// review history is kept.
    pub fn reset_progress(&self, learner: &LearnerId) -> Fallible<ResetCounts> {
        let counts =
            self.retry("reset progress", || self.db.write(|tx| db::delete_learner(tx, learner)))?;
        log::info!("Reset progress for {learner}: {counts:?}");
        Ok(counts)
    }
}

fn position<T: PartialEq>(items: &[T], item: &T) -> Option<usize> {
    items.iter().position(|x| x == item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::engine;
    use crate::engine::testing::start;
    use crate::types::card_state::CardState;
    use crate::types::ids::CardId;
    use crate::types::outcome::Outcome;

    fn ann() -> LearnerId {
        LearnerId::from("ann")
    }

    #[test]
    fn test_complete_unit_provisions_cards() -> Fallible<()> {
        let (engine, _) = engine()?;
        let report = engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        assert_eq!(report.cards_created, 3);
        assert!(!report.stage_completed);
        let due = engine.get_due_cards(&ann(), None)?;
        assert_eq!(due.len(), 3);
        assert!(due.iter().all(|s| s.schedule.state == CardState::New));
        assert!(due.iter().all(|s| s.next_review_date == start()));
        let progress = engine.unit_progress(&ann(), &UnitId::from("greetings"))?;
        assert!(progress.is_completed);
        assert_eq!(progress.completed_at, Some(start()));
        Ok(())
    }

    #[test]
    fn test_complete_unit_is_idempotent() -> Fallible<()> {
        let (engine, clock) = engine()?;
        let unit = UnitId::from("greetings");
        engine.complete_unit(&ann(), &unit)?;
        let hello = CardId::from("hello");
        let reviewed = engine.submit_review(&ann(), &hello, Outcome::Easy, None)?;

        clock.advance_minutes(60);
        let report = engine.complete_unit(&ann(), &unit)?;
        assert_eq!(report.cards_created, 0);

        // The reviewed card keeps its schedule.
        let stored = engine
            .db
            .read(|conn| db::select_schedule(conn, &ann(), &hello))?
            .unwrap();
        assert_eq!(stored, reviewed);
        // And the unit keeps its first completion time.
        let progress = engine.unit_progress(&ann(), &unit)?;
        assert_eq!(progress.completed_at, Some(start()));
        Ok(())
    }

    #[test]
    fn test_stage_completes_with_its_last_unit() -> Fallible<()> {
        let (engine, _) = engine()?;
        let basics = StageId::from("basics");
        engine.complete_unit(&ann(), &UnitId::from("numbers"))?;
        assert!(!engine.stage_progress(&ann(), &basics)?.is_completed);
        let report = engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        assert!(report.stage_completed);
        let progress = engine.stage_progress(&ann(), &basics)?;
        assert!(progress.is_completed);
        assert_eq!(progress.completed_at, Some(start()));
        // Other learners are unaffected.
        let bob = LearnerId::from("bob");
        assert!(!engine.stage_progress(&bob, &basics)?.is_completed);
        Ok(())
    }

    #[test]
    fn test_unknown_unit_is_not_found() -> Fallible<()> {
        let (engine, _) = engine()?;
        let err = engine
            .complete_unit(&ann(), &UnitId::from("nope"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(engine.get_due_cards(&ann(), None)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_unlock_policy() -> Fallible<()> {
        let (engine, _) = engine()?;
        let greetings = UnitId::from("greetings");
        let numbers = UnitId::from("numbers");
        let basics = StageId::from("basics");
        let travel = StageId::from("travel");

        assert!(engine.is_unit_unlocked(&ann(), &greetings)?);
        assert!(!engine.is_unit_unlocked(&ann(), &numbers)?);
        assert!(engine.is_stage_unlocked(&ann(), &basics)?);
        assert!(!engine.is_stage_unlocked(&ann(), &travel)?);

        engine.complete_unit(&ann(), &greetings)?;
        assert!(engine.is_unit_unlocked(&ann(), &numbers)?);
        assert!(!engine.is_stage_unlocked(&ann(), &travel)?);

        engine.complete_unit(&ann(), &numbers)?;
        assert!(engine.is_stage_unlocked(&ann(), &travel)?);
        assert!(engine.is_unit_unlocked(&ann(), &UnitId::from("airport"))?);
        Ok(())
    }

    #[test]
    fn test_watch_time_accumulates() -> Fallible<()> {
        let (engine, _) = engine()?;
        let unit = UnitId::from("airport");
        engine.record_watch_time(&ann(), &unit, 40)?;
        let progress = engine.record_watch_time(&ann(), &unit, 20)?;
        assert_eq!(progress.watch_time_seconds, 60);
        assert!(!progress.is_completed);
        let err = engine
            .record_watch_time(&ann(), &UnitId::from("nope"), 1)
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotFound(_)));
        Ok(())
    }

    #[test]
    fn test_reset_progress() -> Fallible<()> {
        let (engine, _) = engine()?;
        engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        engine.complete_unit(&ann(), &UnitId::from("numbers"))?;
        engine.submit_review(&ann(), &CardId::from("one"), Outcome::Good, None)?;
        let counts = engine.reset_progress(&ann())?;
        assert_eq!(
            counts,
            ResetCounts {
                schedules: 5,
                unit_progress: 2,
                stage_progress: 1,
            }
        );
        assert!(engine.get_due_cards(&ann(), None)?.is_empty());
        assert!(!engine.is_unit_unlocked(&ann(), &UnitId::from("numbers"))?);
        assert_eq!(engine.card_history(&ann(), &CardId::from("one"))?.len(), 1);
        // Completing the unit again provisions from scratch.
        let report = engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        assert_eq!(report.cards_created, 3);
        Ok(())
    }
}
