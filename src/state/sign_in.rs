//! Daily sign-in ledger: one bonus per player and calendar day (UTC+8).

use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::{
    dao::models::{DailySignInsEntity, SignInEntity, SignInLedgerEntity},
    state::{
        clock::{GROUP_OFFSET, date_key},
        game::to_local,
    },
};

/// Points and opening hours of the sign-in bonus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRules {
    /// Awarded to every sign-in.
    pub base_points: i64,
    /// Extra points for the first sign-ins of the day; index 0 is rank 1.
    pub rank_bonus: Vec<i64>,
    /// First local hour (inclusive) at which sign-ins are accepted.
    pub start_hour: u8,
    /// Local hour (exclusive) at which sign-ins close.
    pub end_hour: u8,
}

impl Default for SignInRules {
    fn default() -> Self {
        Self {
            base_points: 10,
            rank_bonus: vec![50, 30, 20],
            start_hour: 8,
            end_hour: 23,
        }
    }
}

impl SignInRules {
    /// Bonus for the `order`-th sign-in of the day (1-based).
    pub fn bonus_for_rank(&self, order: u32) -> i64 {
        (order as usize)
            .checked_sub(1)
            .and_then(|index| self.rank_bonus.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn is_open(&self, local: OffsetDateTime) -> bool {
        (self.start_hour..self.end_hour).contains(&local.hour())
    }
}

/// One accepted sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInEntry {
    /// Player who signed in.
    pub player_id: String,
    /// Moment of the sign-in, in UTC+8.
    pub signed_at: OffsetDateTime,
    /// 1-based rank within the day.
    pub order: u32,
    /// Fixed part of the award.
    pub base_points: i64,
    /// Early bird part of the award.
    pub bonus_points: i64,
    /// Total points credited.
    pub points_awarded: i64,
}

/// What happened to a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Attempt made outside the opening hours.
    Closed {
        /// Opening hour.
        start_hour: u8,
        /// Closing hour.
        end_hour: u8,
    },
    /// The player already signed in today; nothing changed.
    AlreadySignedIn {
        /// Points credited by the earlier sign-in.
        points_awarded: i64,
    },
    /// New entry appended to today's list.
    SignedIn(SignInEntry),
}

/// Sign-ins of a group, keyed by `YYYY-MM-DD` in UTC+8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInLedger {
    days: IndexMap<String, Vec<SignInEntry>>,
}

impl SignInLedger {
    /// Try to sign `player_id` in at `now`.
    pub fn sign_in(
        &mut self,
        player_id: &str,
        now: OffsetDateTime,
        rules: &SignInRules,
    ) -> SignInOutcome {
        let local = now.to_offset(GROUP_OFFSET);
        if !rules.is_open(local) {
            return SignInOutcome::Closed {
                start_hour: rules.start_hour,
                end_hour: rules.end_hour,
            };
        }

        let today = self.days.entry(date_key(local.date())).or_default();
        if let Some(existing) = today.iter().find(|entry| entry.player_id == player_id) {
            return SignInOutcome::AlreadySignedIn {
                points_awarded: existing.points_awarded,
            };
        }

        let order = today.len() as u32 + 1;
        let bonus_points = rules.bonus_for_rank(order);
        let entry = SignInEntry {
            player_id: player_id.to_string(),
            signed_at: local,
            order,
            base_points: rules.base_points,
            bonus_points,
            points_awarded: rules.base_points + bonus_points,
        };
        today.push(entry.clone());

        SignInOutcome::SignedIn(entry)
    }

    /// Number of sign-ins recorded for the day containing `now`.
    #[cfg(test)]
    pub(crate) fn count_on(&self, now: OffsetDateTime) -> usize {
        self.days
            .get(&date_key(now.to_offset(GROUP_OFFSET).date()))
            .map_or(0, Vec::len)
    }
}

impl From<SignInLedgerEntity> for SignInLedger {
    fn from(value: SignInLedgerEntity) -> Self {
        let days = value
            .days
            .into_iter()
            .map(|(day, daily)| {
                let entries = daily
                    .sign_ins
                    .into_iter()
                    .map(|entry| SignInEntry {
                        player_id: entry.player_id,
                        signed_at: to_local(entry.signed_at),
                        order: entry.order,
                        base_points: entry.base_points,
                        bonus_points: entry.bonus_points,
                        points_awarded: entry.points_awarded,
                    })
                    .collect();
                (day, entries)
            })
            .collect();
        Self { days }
    }
}

impl From<SignInLedger> for SignInLedgerEntity {
    fn from(value: SignInLedger) -> Self {
        let days = value
            .days
            .into_iter()
            .map(|(day, entries)| {
                let sign_ins = entries
                    .into_iter()
                    .map(|entry| SignInEntity {
                        player_id: entry.player_id,
                        signed_at: entry.signed_at.into(),
                        order: entry.order,
                        base_points: entry.base_points,
                        bonus_points: entry.bonus_points,
                        points_awarded: entry.points_awarded,
                    })
                    .collect();
                (day, DailySignInsEntity { sign_ins })
            })
            .collect();
        Self { days }
    }
}
