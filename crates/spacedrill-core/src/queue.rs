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
use crate::db::DueQuery;
use crate::engine::Engine;
use crate::error::Fallible;
use crate::types::card_state::CardState;
use crate::types::ids::LearnerId;
use crate::types::schedule::CardScheduleState;

/// A card reviewed less than this many minutes ago is held back from the
/// queue, even if it is already due again.
pub const COOLDOWN_MINUTES: i64 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCounts {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub total: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub cards_due: DueCounts,
}

impl Engine {
    /// The cards the learner should review now: new cards first, then
    /// learning, then review, most overdue first within each state.
    ///
    /// Once the learner has reviewed `daily_new_card_limit` new cards for
    /// the first time today, new cards are left out entirely.
    pub fn get_due_cards(
        &self,
        learner: &LearnerId,
        limit: Option<usize>,
    ) -> Fallible<Vec<CardScheduleState>> {
        let now = self.clock.now();
        let day_start = now.start_of_day(self.clock.offset());
        let limit = limit.unwrap_or(self.config.queue_limit);
        let cap = self.config.daily_new_card_limit as usize;
        self.db.read(|conn| {
            let introduced_today = db::count_introduced_since(conn, learner, day_start)?;
            let include_new = introduced_today < cap;
            if !include_new {
                log::debug!(
                    "{learner}: {introduced_today} new cards introduced today (cap {cap}), skipping new cards"
                );
            }
            let query = DueQuery {
                learner,
                now,
                cooldown_cutoff: now.minus_minutes(COOLDOWN_MINUTES),
                include_new,
                limit,
            };
            db::select_due(conn, &query)
        })
    }

    /// How many cards are due now, per state. Unlike the queue, this counts
    /// every due card, ignoring the cooldown and the daily new-card cap.
    pub fn get_dashboard_stats(&self, learner: &LearnerId) -> Fallible<DashboardStats> {
        let now = self.clock.now();
        let counts = self
            .db
            .read(|conn| db::count_due_by_state(conn, learner, now))?;
        let mut cards_due = DueCounts::default();
        for (state, count) in counts {
            match state {
                CardState::New => cards_due.new += count,
                CardState::Learning => cards_due.learning += count,
                CardState::Review => cards_due.review += count,
            }
            cards_due.total += count;
        }
        Ok(DashboardStats { cards_due })
    }
}
