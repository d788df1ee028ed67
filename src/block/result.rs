//! Per-candidate match results and the rejection sentinel.

use crate::block::Offset;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Distance written for a rejected candidate.
///
/// Accepted distances are never negative, so this is the only negative value
/// an output distance can hold.
pub const REJECTED_DISTANCE: f32 = -1.0;

/// Outcome of matching one candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Scaled SSE, or [`REJECTED_DISTANCE`].
    pub distance: f32,
    /// Candidate offset. Only meaningful when the result is accepted.
    pub position: Offset,
}

impl MatchResult {
    /// A rejected result.
    pub const fn rejected() -> Self {
        Self {
            distance: REJECTED_DISTANCE,
            position: Offset::new(0, 0),
        }
    }

    /// Returns true unless the distance is the rejection sentinel.
    pub fn is_accepted(&self) -> bool {
        self.distance != REJECTED_DISTANCE
    }

    /// Returns the position for accepted results.
    pub fn accepted_position(&self) -> Option<Offset> {
        self.is_accepted().then_some(self.position)
    }
}

/// Zips the two kernel output channels into per-candidate results.
pub fn decode_results(distances: &[f32], positions: &[Offset]) -> BlockMatchResult<Vec<MatchResult>> {
    if distances.len() != positions.len() {
        return Err(BlockMatchError::LengthMismatch {
            context: "output positions",
            expected: distances.len(),
            got: positions.len(),
        });
    }
    Ok(distances
        .iter()
        .zip(positions)
        .map(|(&distance, &position)| {
            if distance == REJECTED_DISTANCE {
                MatchResult::rejected()
            } else {
                MatchResult { distance, position }
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{decode_results, MatchResult, REJECTED_DISTANCE};
    use crate::block::Offset;

    #[test]
    fn decode_hides_positions_of_rejected() {
        let results = decode_results(
            &[REJECTED_DISTANCE, 12.5],
            &[Offset::new(7, 7), Offset::new(3, 1)],
        )
        .unwrap();
        assert_eq!(results[0], MatchResult::rejected());
        assert_eq!(results[0].accepted_position(), None);
        assert_eq!(results[1].accepted_position(), Some(Offset::new(3, 1)));
    }

    #[test]
    fn decode_requires_equal_lengths() {
        assert!(decode_results(&[1.0, 2.0], &[Offset::default()]).is_err());
    }
}
