//! Read N-limit check (C15).

use crate::error::AddReadOutcome;

/// Scans `seq` for undefined bases ('N'/'n'), returning
/// `AddReadOutcome::NLimitExceeded` as soon as the count exceeds `limit`
/// (when set), without scanning the rest of the sequence.
pub fn check_n_limit(seq: Option<&[u8]>, limit: Option<u32>) -> AddReadOutcome {
    let Some(seq) = seq else {
        return AddReadOutcome::NullRead;
    };
    let Some(limit) = limit else {
        return AddReadOutcome::Accepted;
    };
    let mut count = 0u32;
    for &b in seq {
        if b == b'N' || b == b'n' {
            count += 1;
            if count > limit {
                return AddReadOutcome::NLimitExceeded;
            }
        }
    }
    AddReadOutcome::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_read_is_reported() {
        assert_eq!(check_n_limit(None, Some(2)), AddReadOutcome::NullRead);
    }

    #[test]
    fn no_limit_always_accepts() {
        assert_eq!(check_n_limit(Some(b"NNNNNN"), None), AddReadOutcome::Accepted);
    }

    #[test]
    fn exceeding_limit_is_rejected() {
        assert_eq!(
            check_n_limit(Some(b"ACNGNTN"), Some(2)),
            AddReadOutcome::NLimitExceeded
        );
    }

    #[test]
    fn at_limit_is_accepted() {
        assert_eq!(
            check_n_limit(Some(b"ACNGNT"), Some(2)),
            AddReadOutcome::Accepted
        );
    }
}
