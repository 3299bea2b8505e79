//! Piece length selection

use tracing::debug;

use crate::error::{Result, TorrentError};

/// Smallest piece length ever chosen (16 KiB)
pub const MIN_PIECE_LENGTH: u64 = 16384;

/// Largest piece length allowed (64 MiB)
pub const MAX_PIECE_LENGTH: u64 = 67108864;

/// Divisor applied to the total length by the automatic policies
const AUTO_PIECE_DIVISOR: u64 = 1000;

/// How the piece length of a build is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PieceLengthPolicy {
    /// `total / 1000`, clamped to `[MIN_PIECE_LENGTH, MAX_PIECE_LENGTH]`
    #[default]
    Auto,
    /// `total / 1000`, clamped to `[MIN_PIECE_LENGTH, max]`
    Capped { max: u64 },
    /// A fixed length, raised to `MIN_PIECE_LENGTH` if smaller
    Fixed(u64),
}

impl PieceLengthPolicy {
    /// Reject overrides outside the hard limits.
    ///
    /// Must pass before [`piece_length`](Self::piece_length) is used.
    pub fn validate(&self) -> Result<()> {
        match *self {
            PieceLengthPolicy::Auto => Ok(()),
            PieceLengthPolicy::Capped { max } if max > MAX_PIECE_LENGTH => Err(TorrentError::config_error_with_field(
                format!("Maximum piece length {} exceeds the hard limit of {}", max, MAX_PIECE_LENGTH),
                "max_piece_length",
            )),
            PieceLengthPolicy::Capped { max } if max < MIN_PIECE_LENGTH => Err(TorrentError::config_error_with_field(
                format!("Maximum piece length {} is below the minimum of {}", max, MIN_PIECE_LENGTH),
                "max_piece_length",
            )),
            PieceLengthPolicy::Fixed(length) if length > MAX_PIECE_LENGTH => Err(TorrentError::config_error_with_field(
                format!("Piece length {} exceeds the hard limit of {}", length, MAX_PIECE_LENGTH),
                "piece_length",
            )),
            _ => Ok(()),
        }
    }

    /// Piece length for content of `total_length` bytes
    pub fn piece_length(&self, total_length: u64) -> u64 {
        let length = match *self {
            PieceLengthPolicy::Auto => clamp(total_length / AUTO_PIECE_DIVISOR, MAX_PIECE_LENGTH),
            PieceLengthPolicy::Capped { max } => clamp(total_length / AUTO_PIECE_DIVISOR, max),
            PieceLengthPolicy::Fixed(length) => length.max(MIN_PIECE_LENGTH),
        };
        debug!("Piece length for {} bytes with {:?}: {}", total_length, self, length);
        length
    }
}

fn clamp(length: u64, max: u64) -> u64 {
    length.min(max).max(MIN_PIECE_LENGTH)
}

/// Number of pieces needed to cover `total_length` bytes
pub fn piece_count(total_length: u64, piece_length: u64) -> u64 {
    if total_length == 0 || piece_length == 0 {
        return 0;
    }
    total_length.div_ceil(piece_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_policy_bounds() {
        let policy = PieceLengthPolicy::Auto;
        assert_eq!(policy.piece_length(0), MIN_PIECE_LENGTH);
        assert_eq!(policy.piece_length(14), MIN_PIECE_LENGTH);
        assert_eq!(policy.piece_length(100_000_000), 100_000);
        assert_eq!(policy.piece_length(u64::MAX), MAX_PIECE_LENGTH);
    }

    #[test]
    fn test_auto_policy_is_monotonic() {
        let policy = PieceLengthPolicy::Auto;
        let mut previous = 0;
        for total in (0..200u64).map(|i| i * 1_000_000_000) {
            let length = policy.piece_length(total);
            assert!((MIN_PIECE_LENGTH..=MAX_PIECE_LENGTH).contains(&length));
            assert!(length >= previous);
            previous = length;
        }
    }

    #[test]
    fn test_capped_policy() {
        let policy = PieceLengthPolicy::Capped { max: 1 << 20 };
        assert!(policy.validate().is_ok());
        assert_eq!(policy.piece_length(0), MIN_PIECE_LENGTH);
        assert_eq!(policy.piece_length(500_000_000), 500_000);
        assert_eq!(policy.piece_length(50_000_000_000), 1 << 20);
    }

    #[test]
    fn test_capped_policy_above_hard_max_rejected() {
        let policy = PieceLengthPolicy::Capped { max: MAX_PIECE_LENGTH + 1 };
        assert!(matches!(policy.validate(), Err(TorrentError::ConfigError { .. })));
    }

    #[test]
    fn test_capped_policy_below_min_rejected() {
        let policy = PieceLengthPolicy::Capped { max: 1024 };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_fixed_policy_clamps_to_minimum() {
        let policy = PieceLengthPolicy::Fixed(30);
        assert!(policy.validate().is_ok());
        assert_eq!(policy.piece_length(15), MIN_PIECE_LENGTH);
        assert_eq!(PieceLengthPolicy::Fixed(1 << 20).piece_length(15), 1 << 20);
    }

    #[test]
    fn test_fixed_policy_above_max_rejected() {
        assert!(PieceLengthPolicy::Fixed(MAX_PIECE_LENGTH * 2).validate().is_err());
    }

    #[test]
    fn test_piece_count() {
        assert_eq!(piece_count(0, 16384), 0);
        assert_eq!(piece_count(1, 16384), 1);
        assert_eq!(piece_count(16384, 16384), 1);
        assert_eq!(piece_count(16385, 16384), 2);
        assert_eq!(piece_count(5, 2), 3);
    }
}
