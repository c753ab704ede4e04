//! Batch-dimension bucketing for registry probes.
//!
//! Kernels tuned for a row tile zero-pad smaller batches, so every `M` up to 128
//! is rounded up to the next tuned tile and shares that registry entry.

/// Row counts the registry is keyed on for small batches.
pub const M_BUCKETS: [usize; 4] = [16, 32, 64, 128];

/// Round `m` up to the nearest bucket; values above the last bucket pass through.
///
/// Precondition: `m >= 1`. Zero rounds to 16 arithmetically but is never a real probe.
#[inline]
pub fn bucket(m: usize) -> usize {
    if m <= 16 {
        16
    } else if m <= 32 {
        32
    } else if m <= 64 {
        64
    } else if m <= 128 {
        128
    } else {
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket(1), 16);
        assert_eq!(bucket(16), 16);
        assert_eq!(bucket(17), 32);
        assert_eq!(bucket(32), 32);
        assert_eq!(bucket(33), 64);
        assert_eq!(bucket(64), 64);
        assert_eq!(bucket(65), 128);
        assert_eq!(bucket(128), 128);
        assert_eq!(bucket(129), 129);
        assert_eq!(bucket(200), 200);
    }

    #[test]
    fn test_bucket_idempotent() {
        for m in 1..=1024 {
            assert_eq!(bucket(bucket(m)), bucket(m));
            if m <= 128 {
                assert!(M_BUCKETS.contains(&bucket(m)));
            } else {
                assert_eq!(bucket(m), m);
            }
        }
    }
}
