//! Derangement generator for the gift draw.
//!
//! # Responsibility
//! - Turn an ordered list of distinct participant names into giver/receiver
//!   pairs where nobody draws themself.
//!
//! # Invariants
//! - Output has one pair per input name, in input order by giver.
//! - Every name appears exactly once as giver and once as receiver.
//! - `Shuffle` and `Rotation` never return a fixed point. Only `Legacy` may,
//!   and only after exhausting its attempt budget.
//!
//! The generator is pure and CPU-bound; it never touches storage.

use crate::model::assignment::Assignment;
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default rejection-sampling budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// How receivers are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Uniform Fisher-Yates shuffle with rejection of fixed points.
    /// Fails with `Exhausted` when no derangement was found in budget.
    Shuffle { max_attempts: u32 },
    /// Random order paired with a random non-zero cyclic offset.
    /// Always succeeds in one pass; not uniform over all derangements.
    Rotation,
    /// Same sampling as `Shuffle`, but keeps the last shuffle on exhaustion
    /// even if it contains fixed points.
    Legacy { max_attempts: u32 },
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Shuffle {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Strategy {
    /// Parses `shuffle|rotation|legacy` with the given attempt budget.
    pub fn parse(value: &str, max_attempts: u32) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shuffle" => Some(Self::Shuffle { max_attempts }),
            "rotation" => Some(Self::Rotation),
            "legacy" => Some(Self::Legacy { max_attempts }),
            _ => None,
        }
    }

    /// Stable lowercase name used in config and log events.
    pub fn name(self) -> &'static str {
        match self {
            Self::Shuffle { .. } => "shuffle",
            Self::Rotation => "rotation",
            Self::Legacy { .. } => "legacy",
        }
    }
}

/// Generator failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerangementError {
    /// Fewer than two names; no derangement exists.
    TooFewParticipants(usize),
    /// Input names must be distinct.
    DuplicateName(String),
    /// Every attempt in the budget produced a fixed point.
    Exhausted { attempts: u32 },
}

impl Display for DerangementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewParticipants(found) => {
                write!(f, "at least 2 participants required, found {found}")
            }
            Self::DuplicateName(name) => write!(f, "duplicate participant `{name}`"),
            Self::Exhausted { attempts } => {
                write!(f, "no derangement found after {attempts} attempts")
            }
        }
    }
}

impl Error for DerangementError {}

/// Draws receivers for `givers` using `strategy`.
///
/// # Errors
/// - `TooFewParticipants` for fewer than two names.
/// - `DuplicateName` when a name repeats.
/// - `Exhausted` when `Strategy::Shuffle` runs out of attempts.
pub fn derange<R: Rng + ?Sized>(
    givers: &[String],
    rng: &mut R,
    strategy: Strategy,
) -> Result<Vec<Assignment>, DerangementError> {
    check_input(givers)?;

    match strategy {
        Strategy::Shuffle { max_attempts } => {
            sample_derangement(givers, max_attempts, false, |receivers| {
                receivers.shuffle(&mut *rng)
            })
        }
        Strategy::Legacy { max_attempts } => {
            sample_derangement(givers, max_attempts, true, |receivers| {
                receivers.shuffle(&mut *rng)
            })
        }
        Strategy::Rotation => Ok(rotate(givers, rng)),
    }
}

fn check_input(givers: &[String]) -> Result<(), DerangementError> {
    if givers.len() < 2 {
        return Err(DerangementError::TooFewParticipants(givers.len()));
    }
    let mut seen = HashSet::with_capacity(givers.len());
    for giver in givers {
        if !seen.insert(giver.as_str()) {
            return Err(DerangementError::DuplicateName(giver.clone()));
        }
    }
    Ok(())
}

/// Rejection sampling over full reshuffles of a receiver copy.
fn sample_derangement<F>(
    givers: &[String],
    max_attempts: u32,
    accept_on_exhaustion: bool,
    mut shuffle: F,
) -> Result<Vec<Assignment>, DerangementError>
where
    F: FnMut(&mut [String]),
{
    // An accepted result must come from at least one shuffle, never the identity.
    let max_attempts = if accept_on_exhaustion {
        max_attempts.max(1)
    } else {
        max_attempts
    };
    let mut receivers = givers.to_vec();
    for _ in 0..max_attempts {
        shuffle(&mut receivers);
        if !has_fixed_point(givers, &receivers) {
            return Ok(pair(givers, receivers));
        }
    }

    if accept_on_exhaustion {
        warn!(
            "event=derangement_exhausted module=derangement status=accepted attempts={} participants={}",
            max_attempts,
            givers.len()
        );
        return Ok(pair(givers, receivers));
    }

    warn!(
        "event=derangement_exhausted module=derangement status=error attempts={} participants={}",
        max_attempts,
        givers.len()
    );
    Err(DerangementError::Exhausted {
        attempts: max_attempts,
    })
}

fn rotate<R: Rng + ?Sized>(givers: &[String], rng: &mut R) -> Vec<Assignment> {
    let n = givers.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let offset = rng.gen_range(1..n);

    let mut receiver_of = vec![0usize; n];
    for (position, &giver_index) in order.iter().enumerate() {
        receiver_of[giver_index] = order[(position + offset) % n];
    }

    givers
        .iter()
        .zip(receiver_of)
        .map(|(giver, receiver_index)| {
            Assignment::new(giver.clone(), givers[receiver_index].clone())
        })
        .collect()
}

fn has_fixed_point(givers: &[String], receivers: &[String]) -> bool {
    givers
        .iter()
        .zip(receivers)
        .any(|(giver, receiver)| giver == receiver)
}

fn pair(givers: &[String], receivers: Vec<String>) -> Vec<Assignment> {
    givers
        .iter()
        .cloned()
        .zip(receivers)
        .map(|(giver, receiver)| Assignment { giver, receiver })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{derange, sample_derangement, DerangementError, Strategy};
    use crate::model::assignment::Assignment;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("p{i:03}")).collect()
    }

    fn assert_derangement(givers: &[String], pairs: &[Assignment]) {
        assert_eq!(pairs.len(), givers.len());
        let pair_givers: Vec<&str> = pairs.iter().map(|p| p.giver.as_str()).collect();
        let expected: Vec<&str> = givers.iter().map(String::as_str).collect();
        assert_eq!(pair_givers, expected, "givers keep input order");

        let receivers: HashSet<&str> = pairs.iter().map(|p| p.receiver.as_str()).collect();
        assert_eq!(receivers.len(), givers.len(), "receivers form a bijection");
        assert!(receivers.iter().all(|r| expected.contains(r)));
        assert!(pairs.iter().all(|p| !p.is_fixed_point()));
    }

    #[test]
    fn shuffle_produces_derangements_for_many_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in 2..=40 {
            let givers = names(size);
            for _ in 0..20 {
                let pairs = derange(&givers, &mut rng, Strategy::default()).unwrap();
                assert_derangement(&givers, &pairs);
            }
        }
    }

    #[test]
    fn rotation_produces_derangements_for_many_sizes() {
        let mut rng = StdRng::seed_from_u64(11);
        for size in 2..=40 {
            let givers = names(size);
            for _ in 0..20 {
                let pairs = derange(&givers, &mut rng, Strategy::Rotation).unwrap();
                assert_derangement(&givers, &pairs);
            }
        }
    }

    #[test]
    fn two_participants_always_swap() {
        let givers = vec!["alice".to_string(), "bob".to_string()];
        let mut rng = StdRng::seed_from_u64(3);
        for strategy in [Strategy::default(), Strategy::Rotation] {
            for _ in 0..50 {
                let pairs = derange(&givers, &mut rng, strategy).unwrap();
                assert_eq!(
                    pairs,
                    vec![Assignment::new("alice", "bob"), Assignment::new("bob", "alice")]
                );
            }
        }
    }

    #[test]
    fn rejects_too_few_and_duplicate_names() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = derange(&["solo".to_string()], &mut rng, Strategy::default()).unwrap_err();
        assert_eq!(err, DerangementError::TooFewParticipants(1));

        let err = derange(&[], &mut rng, Strategy::Rotation).unwrap_err();
        assert_eq!(err, DerangementError::TooFewParticipants(0));

        let dup = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let err = derange(&dup, &mut rng, Strategy::default()).unwrap_err();
        assert_eq!(err, DerangementError::DuplicateName("a".to_string()));
    }

    #[test]
    fn exhausted_budget_fails_unless_legacy() {
        let givers = names(3);
        let mut calls = 0;
        let err = sample_derangement(&givers, 100, false, |_| calls += 1).unwrap_err();
        assert_eq!(err, DerangementError::Exhausted { attempts: 100 });
        assert_eq!(calls, 100);

        let pairs = sample_derangement(&givers, 100, true, |_| {}).unwrap();
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(Assignment::is_fixed_point));
    }

    #[test]
    fn zero_attempt_budget_is_immediately_exhausted() {
        let mut rng = StdRng::seed_from_u64(5);
        let err = derange(&names(4), &mut rng, Strategy::Shuffle { max_attempts: 0 }).unwrap_err();
        assert_eq!(err, DerangementError::Exhausted { attempts: 0 });
    }

    #[test]
    fn legacy_with_zero_budget_still_shuffles_once() {
        let givers = names(2);
        let mut calls = 0;
        let pairs = sample_derangement(&givers, 0, true, |receivers| {
            calls += 1;
            receivers.reverse();
        })
        .unwrap();

        assert_eq!(calls, 1);
        assert_derangement(&givers, &pairs);
    }

    #[test]
    fn strategy_parse_accepts_known_names() {
        assert_eq!(
            Strategy::parse(" Shuffle ", 10),
            Some(Strategy::Shuffle { max_attempts: 10 })
        );
        assert_eq!(Strategy::parse("rotation", 10), Some(Strategy::Rotation));
        assert_eq!(
            Strategy::parse("legacy", 5),
            Some(Strategy::Legacy { max_attempts: 5 })
        );
        assert_eq!(Strategy::parse("random", 10), None);
    }
}
