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

//! A fixed variant of the SM-2 algorithm, working in minutes rather than
//! days so that the learning phase can use sub-day steps.

use crate::types::card_state::CardState;
use crate::types::ids::CardId;
use crate::types::ids::LearnerId;
use crate::types::outcome::Outcome;
use crate::types::schedule::CardScheduleState;
use crate::types::schedule::Schedule;
use crate::types::timestamp::Timestamp;

/// The lowest ease factor a card can have.
pub const MIN_EASE: f64 = 1.3;

/// The highest ease factor a card can have.
pub const MAX_EASE: f64 = 2.5;

/// The ease factor of a freshly provisioned card.
pub const INITIAL_EASE: f64 = 2.5;

/// Interval, in minutes, after a wrong answer.
pub const WRONG_INTERVAL: i64 = 1;

/// Interval, in minutes, for the first learning step.
pub const HARD_FIRST_INTERVAL: i64 = 10;

/// Interval, in minutes, for the second learning step (one day).
pub const GOOD_FIRST_DAY_INTERVAL: i64 = 1440;

/// Interval, in minutes, on graduation to the review phase (five days).
pub const GRADUATE_INTERVAL: i64 = 7200;

const EASY_BONUS: f64 = 0.10;
const HARD_PENALTY: f64 = 0.15;
const WRONG_PENALTY: f64 = 0.20;

/// Repetition count at which a learning card graduates.
pub const GRADUATION_REPETITIONS: u32 = 3;

const HARD_REVIEW_MULTIPLIER: f64 = 1.2;
const EASY_REVIEW_MULTIPLIER: f64 = 1.3;

/// The result of scheduling a review.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Advanced {
    pub schedule: Schedule,
    pub next_review_date: Timestamp,
}

impl Schedule {
    /// The schedule of a card that has never been reviewed.
    pub fn initial() -> Self {
        Self {
            ease_factor: INITIAL_EASE,
            interval: 0,
            repetitions: 0,
            state: CardState::New,
        }
    }
}

/// The scheduling record provisioned for a card the moment it is unlocked.
/// It is due immediately.
pub fn initial_state(learner_id: LearnerId, card_id: CardId, now: Timestamp) -> CardScheduleState {
    CardScheduleState {
        learner_id,
        card_id,
        schedule: Schedule::initial(),
        next_review_date: now,
        last_reviewed_at: None,
        created_at: now,
        version: 0,
    }
}

/// Compute a card's next schedule from its current one and the outcome of a
/// review performed at `now`.
pub fn advance(current: Schedule, outcome: Outcome, now: Timestamp) -> Advanced {
    let schedule = match outcome {
        Outcome::Wrong => Schedule {
            ease_factor: clamp_ease(current.ease_factor - WRONG_PENALTY),
            interval: WRONG_INTERVAL,
            repetitions: 0,
            state: CardState::Learning,
        },
        Outcome::Hard => {
            let ease_factor = clamp_ease(current.ease_factor - HARD_PENALTY);
            match current.state {
                CardState::New => Schedule {
                    ease_factor,
                    interval: WRONG_INTERVAL,
                    repetitions: 0,
                    state: CardState::Learning,
                },
                // Hard answers never graduate a card.
                CardState::Learning => Schedule {
                    ease_factor,
                    interval: HARD_FIRST_INTERVAL,
                    repetitions: (current.repetitions + 1).min(GRADUATION_REPETITIONS - 1),
                    state: CardState::Learning,
                },
                CardState::Review => Schedule {
                    ease_factor,
                    interval: scale(current.interval, HARD_REVIEW_MULTIPLIER),
                    repetitions: current.repetitions + 1,
                    state: CardState::Review,
                },
            }
        }
        Outcome::Good => {
            let ease_factor = clamp_ease(current.ease_factor);
            match current.state {
                CardState::New => Schedule {
                    ease_factor,
                    interval: WRONG_INTERVAL,
                    repetitions: 1,
                    state: CardState::Learning,
                },
                CardState::Learning => match current.repetitions {
                    0 => Schedule {
                        ease_factor,
                        interval: HARD_FIRST_INTERVAL,
                        repetitions: 1,
                        state: CardState::Learning,
                    },
                    1 => Schedule {
                        ease_factor,
                        interval: GOOD_FIRST_DAY_INTERVAL,
                        repetitions: 2,
                        state: CardState::Learning,
                    },
                    _ => graduate(ease_factor),
                },
                CardState::Review => Schedule {
                    ease_factor,
                    interval: scale(current.interval, ease_factor),
                    repetitions: current.repetitions + 1,
                    state: CardState::Review,
                },
            }
        }
        Outcome::Easy => {
            let ease_factor = clamp_ease(current.ease_factor + EASY_BONUS);
            match current.state {
                CardState::New | CardState::Learning => graduate(ease_factor),
                CardState::Review => Schedule {
                    ease_factor,
                    interval: scale(current.interval, ease_factor * EASY_REVIEW_MULTIPLIER),
                    repetitions: current.repetitions + 1,
                    state: CardState::Review,
                },
            }
        }
    };
    Advanced {
        schedule,
        next_review_date: now.plus_minutes(schedule.interval),
    }
}

fn graduate(ease_factor: f64) -> Schedule {
    Schedule {
        ease_factor,
        interval: GRADUATE_INTERVAL,
        repetitions: GRADUATION_REPETITIONS,
        state: CardState::Review,
    }
}

fn clamp_ease(ease_factor: f64) -> f64 {
    ease_factor.clamp(MIN_EASE, MAX_EASE)
}

/// Multiply an interval, rounding half away from zero to whole minutes.
fn scale(interval: i64, factor: f64) -> i64 {
    // The float-to-int cast saturates, so runaway growth cannot wrap.
    ((interval as f64) * factor).round().max(0.0) as i64
}

/// Render an interval in minutes as a short human-readable string, e.g.
/// `10min`, `3h`, `5d`, `2m` (months), `1y`.
pub fn format_interval(minutes: i64) -> String {
    let m = minutes as f64;
    if minutes < 60 {
        format!("{minutes}min")
    } else if minutes < 1440 {
        format!("{}h", (m / 60.0).round())
    } else if minutes < 43200 {
        format!("{}d", (m / 1440.0).round())
    } else if minutes < 525600 {
        format!("{}m", (m / 43200.0).round())
    } else {
        format!("{}y", (m / 525600.0).round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse("2025-06-01T12:00:00Z").unwrap()
    }

    fn schedule(state: CardState, ease_factor: f64, interval: i64, repetitions: u32) -> Schedule {
        Schedule {
            ease_factor,
            interval,
            repetitions,
            state,
        }
    }

    fn starting_points() -> Vec<Schedule> {
        let mut points = vec![Schedule::initial()];
        for state in [CardState::New, CardState::Learning, CardState::Review] {
            for ease in [MIN_EASE, 1.45, 2.0, MAX_EASE] {
                for (interval, repetitions) in [(0, 0), (1, 1), (10, 2), (7200, 3), (90000, 9)] {
                    points.push(schedule(state, ease, interval, repetitions));
                }
            }
        }
        points
    }

    #[test]
    fn test_wrong_always_demotes_to_learning() {
        for start in starting_points() {
            let next = advance(start, Outcome::Wrong, now()).schedule;
            assert_eq!(next.state, CardState::Learning);
            assert_eq!(next.interval, 1);
            assert_eq!(next.repetitions, 0);
        }
    }

    #[test]
    fn test_bounds_hold_along_every_path() {
        // Walk every outcome sequence of length 6 from the initial state.
        let mut frontier = vec![Schedule::initial()];
        for _ in 0..6 {
            let mut next_frontier = Vec::new();
            for start in frontier {
                for outcome in Outcome::ALL {
                    let next = advance(start, outcome, now()).schedule;
                    assert!(next.ease_factor >= MIN_EASE, "{next:?}");
                    assert!(next.ease_factor <= MAX_EASE, "{next:?}");
                    assert!(next.interval >= 0, "{next:?}");
                    next_frontier.push(next);
                }
            }
            frontier = next_frontier;
        }
    }

    #[test]
    fn test_easy_skips_learning() {
        let next = advance(Schedule::initial(), Outcome::Easy, now()).schedule;
        assert_eq!(next, schedule(CardState::Review, 2.5, 7200, 3));
    }

    #[test]
    fn test_graduation_path() {
        let mut current = schedule(CardState::Learning, 2.5, 1, 0);
        let mut intervals = Vec::new();
        for _ in 0..3 {
            current = advance(current, Outcome::Good, now()).schedule;
            intervals.push(current.interval);
        }
        assert_eq!(intervals, vec![10, 1440, 7200]);
        assert_eq!(current.state, CardState::Review);
        assert_eq!(current.repetitions, 3);
    }

    #[test]
    fn test_good_on_new_card() {
        let next = advance(Schedule::initial(), Outcome::Good, now()).schedule;
        assert_eq!(next, schedule(CardState::Learning, 2.5, 1, 1));
    }

    #[test]
    fn test_review_growth() {
        let start = schedule(CardState::Review, 2.5, 7200, 3);
        let good = advance(start, Outcome::Good, now()).schedule;
        assert_eq!(good.interval, 18000);
        assert_eq!(good.repetitions, 4);
        let easy = advance(start, Outcome::Easy, now()).schedule;
        assert_eq!(easy.interval, 23400);
        assert_eq!(easy.ease_factor, 2.5);
    }

    #[test]
    fn test_hard_on_new_card() {
        let next = advance(Schedule::initial(), Outcome::Hard, now()).schedule;
        assert_eq!(next.state, CardState::Learning);
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 0);
        assert!((next.ease_factor - 2.35).abs() < 1e-9);
    }

    #[test]
    fn test_hard_never_graduates() {
        let mut current = schedule(CardState::Learning, 2.5, 1, 0);
        for _ in 0..5 {
            current = advance(current, Outcome::Hard, now()).schedule;
            assert_eq!(current.state, CardState::Learning);
            assert_eq!(current.interval, 10);
        }
        assert_eq!(current.repetitions, 2);
        assert!((current.ease_factor - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_hard_in_review() {
        let start = schedule(CardState::Review, 2.0, 7200, 3);
        let next = advance(start, Outcome::Hard, now()).schedule;
        assert_eq!(next.interval, 8640);
        assert_eq!(next.repetitions, 4);
        assert_eq!(next.state, CardState::Review);
        assert!((next.ease_factor - 1.85).abs() < 1e-9);
    }

    #[test]
    fn test_review_rounding() {
        // 7 * 1.3 = 9.1, 7 * 1.5 = 10.5
        let start = schedule(CardState::Review, 1.3, 7, 3);
        assert_eq!(advance(start, Outcome::Good, now()).schedule.interval, 9);
        let start = schedule(CardState::Review, 1.5, 7, 3);
        assert_eq!(advance(start, Outcome::Good, now()).schedule.interval, 11);
    }

    #[test]
    fn test_wrong_floors_ease() {
        let start = schedule(CardState::Review, 1.4, 7200, 5);
        let next = advance(start, Outcome::Wrong, now()).schedule;
        assert_eq!(next.ease_factor, MIN_EASE);
    }

    #[test]
    fn test_next_review_date() {
        let result = advance(schedule(CardState::Learning, 2.5, 10, 1), Outcome::Good, now());
        assert_eq!(
            result.next_review_date,
            Timestamp::parse("2025-06-02T12:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_initial_state() {
        let state = initial_state(LearnerId::from("ann"), CardId::from("hello"), now());
        assert_eq!(state.schedule.ease_factor, 2.5);
        assert_eq!(state.schedule.interval, 0);
        assert_eq!(state.schedule.repetitions, 0);
        assert_eq!(state.schedule.state, CardState::New);
        assert_eq!(state.next_review_date, now());
        assert_eq!(state.last_reviewed_at, None);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "0min");
        assert_eq!(format_interval(59), "59min");
        assert_eq!(format_interval(60), "1h");
        assert_eq!(format_interval(90), "2h");
        assert_eq!(format_interval(1440), "1d");
        assert_eq!(format_interval(7200), "5d");
        assert_eq!(format_interval(43200), "1m");
        assert_eq!(format_interval(525600), "1y");
        assert_eq!(format_interval(1_051_200), "2y");
    }
}
