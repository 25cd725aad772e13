//! The pending → matched state machine for a pair's Match record.
//!
//! Storage backends load the current record under a per-key lock, call [`apply_accept`], and
//! persist the returned state in the same transaction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
	Pending,
	Matched,
}
impl MatchStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Matched => "matched",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"pending" => Some(Self::Pending),
			"matched" => Some(Self::Matched),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
	pub users: BTreeSet<String>,
	pub status: MatchStatus,
	pub created_at: OffsetDateTime,
	pub matched_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
	/// First accept from either side, or a repeated accept by the same side.
	Pending,
	/// This accept completed the pair. The caller must create the message thread.
	Matched,
	/// The pair was already matched; nothing changes.
	AlreadyMatched,
}
impl AcceptOutcome {
	pub fn is_matched(self) -> bool {
		!matches!(self, Self::Pending)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
	pub state: MatchState,
	pub outcome: AcceptOutcome,
}

pub fn apply_accept(
	existing: Option<MatchState>,
	source: &str,
	target: &str,
	now: OffsetDateTime,
) -> Transition {
	let Some(mut state) = existing else {
		return Transition {
			state: MatchState {
				users: BTreeSet::from([source.to_string()]),
				status: MatchStatus::Pending,
				created_at: now,
				matched_at: None,
			},
			outcome: AcceptOutcome::Pending,
		};
	};

	if state.status == MatchStatus::Matched {
		return Transition { state, outcome: AcceptOutcome::AlreadyMatched };
	}

	let other_side_accepted = state.users.contains(target);

	state.users.insert(source.to_string());

	if other_side_accepted {
		state.status = MatchStatus::Matched;
		state.matched_at = Some(now);

		return Transition { state, outcome: AcceptOutcome::Matched };
	}

	Transition { state, outcome: AcceptOutcome::Pending }
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	const T0: OffsetDateTime = datetime!(2026-01-01 00:00 UTC);
	const T1: OffsetDateTime = datetime!(2026-01-01 00:05 UTC);
	const T2: OffsetDateTime = datetime!(2026-01-01 00:09 UTC);

	#[test]
	fn first_accept_creates_pending() {
		let t = apply_accept(None, "alice", "bob", T0);

		assert_eq!(t.outcome, AcceptOutcome::Pending);
		assert_eq!(t.state.status, MatchStatus::Pending);
		assert_eq!(t.state.users, BTreeSet::from(["alice".to_string()]));
		assert_eq!(t.state.created_at, T0);
		assert_eq!(t.state.matched_at, None);
	}

	#[test]
	fn repeated_accept_by_same_side_stays_pending() {
		let first = apply_accept(None, "alice", "bob", T0);
		let again = apply_accept(Some(first.state.clone()), "alice", "bob", T1);

		assert_eq!(again.outcome, AcceptOutcome::Pending);
		assert_eq!(again.state, first.state);
	}

	#[test]
	fn second_side_completes_the_match() {
		let first = apply_accept(None, "alice", "bob", T0);
		let second = apply_accept(Some(first.state), "bob", "alice", T1);

		assert_eq!(second.outcome, AcceptOutcome::Matched);
		assert_eq!(second.state.status, MatchStatus::Matched);
		assert_eq!(
			second.state.users,
			BTreeSet::from(["alice".to_string(), "bob".to_string()])
		);
		assert_eq!(second.state.created_at, T0);
		assert_eq!(second.state.matched_at, Some(T1));
	}

	#[test]
	fn matched_record_never_reverts() {
		let first = apply_accept(None, "alice", "bob", T0);
		let second = apply_accept(Some(first.state), "bob", "alice", T1);
		let third = apply_accept(Some(second.state.clone()), "alice", "bob", T2);

		assert_eq!(third.outcome, AcceptOutcome::AlreadyMatched);
		assert!(third.outcome.is_matched());
		assert_eq!(third.state, second.state);
	}

	#[test]
	fn status_round_trips_through_text() {
		for status in [MatchStatus::Pending, MatchStatus::Matched] {
			assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
		}

		assert_eq!(MatchStatus::parse("rejected"), None);
	}
}
