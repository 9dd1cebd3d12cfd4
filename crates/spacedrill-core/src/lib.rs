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

//! spacedrill-core: the scheduling engine behind spacedrill.
//!
//! - A fixed SM-2 variant that advances a card's schedule after each review.
//! - The review queue, which picks the cards a learner should see now.
//! - The review pipeline, which records reviews and summarizes them.
//! - The progress gate, which schedules a unit's cards once the unit is
//!   completed and cascades completion up to stages.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod types;

pub use catalog::{Catalog, StaticCatalog};
pub use clock::{Clock, FixedClock};
#[cfg(feature = "clock")]
pub use clock::SystemClock;
pub use config::Config;
pub use db::{Database, ResetCounts};
pub use engine::Engine;
pub use error::{Error, Fallible, fail};
pub use gate::CompletionReport;
pub use pipeline::{ResultsBreakdown, ReviewStats};
pub use queue::{DashboardStats, DueCounts};
pub use scheduler::{advance, format_interval, initial_state};
pub use types::card_state::CardState;
pub use types::ids::{CardId, LearnerId, StageId, UnitId};
pub use types::outcome::Outcome;
pub use types::period::Period;
pub use types::progress::{StageProgress, UnitProgress};
pub use types::review_event::ReviewEvent;
pub use types::schedule::{CardScheduleState, Schedule};
pub use types::timestamp::Timestamp;
