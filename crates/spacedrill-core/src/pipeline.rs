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
use crate::engine::Engine;
use crate::error::Error;
use crate::error::Fallible;
use crate::scheduler::advance;
use crate::types::ids::CardId;
use crate::types::ids::LearnerId;
use crate::types::outcome::Outcome;
use crate::types::period::Period;
use crate::types::review_event::ReviewEvent;
use crate::types::schedule::CardScheduleState;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsBreakdown {
    pub wrong: usize,
    pub hard: usize,
    pub good: usize,
    pub easy: usize,
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: usize,
    pub results_breakdown: ResultsBreakdown,
    /// Mean time taken, in seconds, over the reviews that recorded one.
    pub average_time: f64,
}

impl ReviewStats {
    pub fn summarize(events: &[ReviewEvent]) -> Self {
        let mut breakdown = ResultsBreakdown::default();
        let mut timed = 0u64;
        let mut total_time = 0u64;
        for event in events {
            match event.result {
                Outcome::Wrong => breakdown.wrong += 1,
                Outcome::Hard => breakdown.hard += 1,
                Outcome::Good => breakdown.good += 1,
                Outcome::Easy => breakdown.easy += 1,
            }
            if let Some(seconds) = event.time_taken_seconds {
                timed += 1;
                total_time += u64::from(seconds);
            }
        }
        let average_time = if timed == 0 {
            0.0
        } else {
            total_time as f64 / timed as f64
        };
        Self {
            total_reviews: events.len(),
            results_breakdown: breakdown,
            average_time,
        }
    }
}

impl Engine {
    /// Record a review: advance the card's schedule and append the review to
    /// the history, atomically. The card must have been provisioned.
    pub fn submit_review(
        &self,
        learner: &LearnerId,
        card: &CardId,
        outcome: Outcome,
        time_taken_seconds: Option<u32>,
    ) -> Fallible<CardScheduleState> {
        self.retry("submit review", || {
            self.try_submit_review(learner, card, outcome, time_taken_seconds)
        })
    }

    fn try_submit_review(
        &self,
        learner: &LearnerId,
        card: &CardId,
        outcome: Outcome,
        time_taken_seconds: Option<u32>,
    ) -> Fallible<CardScheduleState> {
        let now = self.clock.now();
        self.db.write(|tx| {
            let current = db::select_schedule(tx, learner, card)?.ok_or_else(|| {
                Error::NotFound(format!("no schedule for learner {learner} card {card}"))
            })?;
            let advanced = advance(current.schedule, outcome, now);
            let next = CardScheduleState {
                schedule: advanced.schedule,
                next_review_date: advanced.next_review_date,
                last_reviewed_at: Some(now),
                ..current.clone()
            };
            db::update_schedule(tx, &next)?;
            db::insert_review_event(
                tx,
                &ReviewEvent {
                    learner_id: learner.clone(),
                    card_id: card.clone(),
                    result: outcome,
                    time_taken_seconds,
                    ease_factor_after: next.schedule.ease_factor,
                    interval_after: next.schedule.interval,
                    reviewed_at: now,
                },
            )?;
            log::debug!(
                "{learner} {card} {outcome}: {} -> {} EF={:.2} interval={}min",
                current.schedule.state,
                next.schedule.state,
                next.schedule.ease_factor,
                next.schedule.interval
            );
            Ok(CardScheduleState {
                version: next.version + 1,
                ..next
            })
        })
    }

    /// Summarize the learner's reviews since the start of `period`.
    pub fn get_review_stats(&self, learner: &LearnerId, period: Period) -> Fallible<ReviewStats> {
        let now = self.clock.now();
        let from = period.window_start(now, self.clock.offset());
        let events = self
            .db
            .read(|conn| db::select_review_events(conn, learner, from, now))?;
        Ok(ReviewStats::summarize(&events))
    }

    /// Every review the learner has made of a card, oldest first.
    pub fn card_history(&self, learner: &LearnerId, card: &CardId) -> Fallible<Vec<ReviewEvent>> {
        self.db
            .read(|conn| db::select_card_events(conn, learner, card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::engine;
    use crate::engine::testing::start;
    use crate::types::card_state::CardState;
    use crate::types::ids::UnitId;

    fn ann() -> LearnerId {
        LearnerId::from("ann")
    }

    #[test]
    fn test_unprovisioned_card_is_not_found() -> Fallible<()> {
        let (engine, _) = engine()?;
        let err = engine
            .submit_review(&ann(), &CardId::from("hello"), Outcome::Good, None)
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(engine.card_history(&ann(), &CardId::from("hello"))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_submit_updates_state_and_appends_event() -> Fallible<()> {
        let (engine, _) = engine()?;
        engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        let card = CardId::from("hello");
        let state = engine.submit_review(&ann(), &card, Outcome::Good, Some(7))?;
        assert_eq!(state.schedule.state, CardState::Learning);
        assert_eq!(state.schedule.interval, 1);
        assert_eq!(state.schedule.repetitions, 1);
        assert_eq!(state.last_reviewed_at, Some(start()));
        assert_eq!(state.next_review_date, start().plus_minutes(1));

        let stored = engine.db.read(|conn| db::select_schedule(conn, &ann(), &card))?;
        assert_eq!(stored, Some(state));

        let history = engine.card_history(&ann(), &card)?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, Outcome::Good);
        assert_eq!(history[0].time_taken_seconds, Some(7));
        assert_eq!(history[0].interval_after, 1);
        assert_eq!(history[0].ease_factor_after, 2.5);
        assert_eq!(history[0].reviewed_at, start());
        Ok(())
    }

    #[test]
    fn test_successive_reviews_graduate() -> Fallible<()> {
        let (engine, clock) = engine()?;
        engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        let card = CardId::from("hello");
        let mut intervals = Vec::new();
        for _ in 0..4 {
            let state = engine.submit_review(&ann(), &card, Outcome::Good, None)?;
            intervals.push(state.schedule.interval);
            clock.advance_minutes(state.schedule.interval);
        }
        assert_eq!(intervals, vec![1, 1440, 7200, 18000]);
        let history = engine.card_history(&ann(), &card)?;
        assert_eq!(history.len(), 4);
        Ok(())
    }

    #[test]
    fn test_reviewed_card_leaves_queue_until_due() -> Fallible<()> {
        let (engine, clock) = engine()?;
        engine.complete_unit(&ann(), &UnitId::from("numbers"))?;
        let one = CardId::from("one");
        engine.submit_review(&ann(), &one, Outcome::Wrong, None)?;
        let due = engine.get_due_cards(&ann(), None)?;
        assert!(due.iter().all(|s| s.card_id != one));
        // Due again after one minute, but still cooling down.
        clock.advance_minutes(2);
        let due = engine.get_due_cards(&ann(), None)?;
        assert!(due.iter().all(|s| s.card_id != one));
        clock.advance_minutes(3);
        let due = engine.get_due_cards(&ann(), None)?;
        assert!(due.iter().any(|s| s.card_id == one));
        Ok(())
    }

    #[test]
    fn test_stats_count_events_since_window_start() -> Fallible<()> {
        let (engine, clock) = engine()?;
        engine.complete_unit(&ann(), &UnitId::from("greetings"))?;
        // Ten days ago: outside the week, inside the month.
        clock.set(start().minus_days(10));
        engine.submit_review(&ann(), &CardId::from("hello"), Outcome::Wrong, Some(30))?;
        // Three days ago: inside the week.
        clock.set(start().minus_days(3));
        engine.submit_review(&ann(), &CardId::from("goodbye"), Outcome::Hard, None)?;
        // Today.
        clock.set(start());
        engine.submit_review(&ann(), &CardId::from("thanks"), Outcome::Easy, Some(10))?;

        let today = engine.get_review_stats(&ann(), Period::Today)?;
        assert_eq!(today.total_reviews, 1);
        assert_eq!(today.results_breakdown.easy, 1);
        assert_eq!(today.average_time, 10.0);

        let week = engine.get_review_stats(&ann(), Period::Week)?;
        assert_eq!(week.total_reviews, 2);
        assert_eq!(week.results_breakdown.hard, 1);
        assert_eq!(week.average_time, 10.0);

        let month = engine.get_review_stats(&ann(), Period::Month)?;
        assert_eq!(month.total_reviews, 3);
        assert_eq!(
            month.results_breakdown,
            ResultsBreakdown {
                wrong: 1,
                hard: 1,
                good: 0,
                easy: 1,
            }
        );
        assert_eq!(month.average_time, 20.0);
        Ok(())
    }

    #[test]
    fn test_stats_for_learner_without_reviews() -> Fallible<()> {
        let (engine, _) = engine()?;
        let stats = engine.get_review_stats(&ann(), Period::Month)?;
        assert_eq!(stats.total_reviews, 0);
        assert_eq!(stats.average_time, 0.0);
        Ok(())
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = ReviewStats::summarize(&[]);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["totalReviews"], 0);
        assert_eq!(json["resultsBreakdown"]["wrong"], 0);
        assert_eq!(json["averageTime"], 0.0);
    }
}
