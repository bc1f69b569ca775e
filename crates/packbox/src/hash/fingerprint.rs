//! Whitespace-insensitive 32-bit content fingerprint
//!
//! This is the Murmur2-derived hash CurseForge's bulk fingerprint API keys
//! files by. Bytes 9, 10, 13 and 32 are dropped before hashing (both from the
//! length seed and from the mixed input), so re-indented text files keep the
//! same fingerprint. It is not a cryptographic hash.

const MULTIPLIER: u32 = 0x5bd1e995;

/// Bytes excluded from both the length seed and the mixing input
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, 9 | 10 | 13 | 32)
}

/// Reducer state: bytes waiting to form a 32-bit word plus the running hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintState {
    pending: u32,
    pending_count: u8,
    accumulator: u32,
}

impl FingerprintState {
    /// Seed the accumulator from the count of non-whitespace bytes
    pub fn new(normalized_length: u32) -> Self {
        Self {
            pending: 0,
            pending_count: 0,
            accumulator: 1 ^ normalized_length,
        }
    }

    /// Consume one non-whitespace byte, mixing a word once four are packed
    pub fn step(self, byte: u8) -> Self {
        let pending = self.pending | (u32::from(byte) << (8 * u32::from(self.pending_count)));
        if self.pending_count < 3 {
            return Self {
                pending,
                pending_count: self.pending_count + 1,
                ..self
            };
        }

        let k = pending.wrapping_mul(MULTIPLIER);
        let k = (k ^ (k >> 24)).wrapping_mul(MULTIPLIER);
        Self {
            pending: 0,
            pending_count: 0,
            accumulator: self.accumulator.wrapping_mul(MULTIPLIER) ^ k,
        }
    }

    /// Mix any trailing partial word and apply the final avalanche
    pub fn finish(self) -> u32 {
        let mut h = self.accumulator;
        if self.pending_count > 0 {
            // Trailing 1-3 bytes skip the per-word avalanche round
            h = (h ^ self.pending).wrapping_mul(MULTIPLIER);
        }
        h = (h ^ (h >> 13)).wrapping_mul(MULTIPLIER);
        h ^ (h >> 15)
    }
}

/// Computes the fingerprint a CurseForge fingerprint lookup expects
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintCodec;

impl FingerprintCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn fingerprint(&self, bytes: &[u8]) -> u32 {
        fingerprint(bytes)
    }
}

/// Pure fingerprint of a byte buffer
pub fn fingerprint(bytes: &[u8]) -> u32 {
    let normalized_length = bytes.iter().filter(|b| !is_whitespace(**b)).count() as u32;

    bytes
        .iter()
        .copied()
        .filter(|b| !is_whitespace(*b))
        .fold(FingerprintState::new(normalized_length), FingerprintState::step)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_golden_value() {
        // seed = 1, no words, final avalanche only
        let expected = {
            let h = 1u32 ^ (1u32 >> 13);
            let h = h.wrapping_mul(MULTIPLIER);
            h ^ (h >> 15)
        };
        assert_eq!(fingerprint(&[]), expected);
        assert_eq!(fingerprint(&[]), 1_540_447_798);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(fingerprint(b"a"), 626_045_324);
        assert_eq!(fingerprint(b"abcd"), 3_376_380_438);
        assert_eq!(fingerprint(b"abcde"), 3_469_237_630);
        assert_eq!(fingerprint(b"hello world"), 2_824_650_221);
    }

    #[test]
    fn test_whitespace_is_ignored_everywhere() {
        let compact = fingerprint(b"packbox");
        assert_eq!(compact, 139_204_222);
        assert_eq!(fingerprint(b" \t\r\npackbox\n"), compact);
        assert_eq!(fingerprint(b"pack box"), compact);
        assert_eq!(fingerprint(b"p\ta\rc\nk b o x"), compact);
        assert_eq!(fingerprint(b"\n\n\n"), fingerprint(&[]));
    }

    #[test]
    fn test_other_control_bytes_are_significant() {
        assert_ne!(fingerprint(b"pack\x0bbox"), fingerprint(b"packbox"));
        assert_ne!(fingerprint(b"pack\x00box"), fingerprint(b"packbox"));
    }

    #[test]
    fn test_deterministic_over_binary_input() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_007).collect();
        let codec = FingerprintCodec::new();
        assert_eq!(codec.fingerprint(&data), codec.fingerprint(&data.clone()));
    }

    #[test]
    fn test_reducer_packs_little_endian_words() {
        let state = [1u8, 2, 3]
            .into_iter()
            .fold(FingerprintState::new(3), FingerprintState::step);
        assert_eq!(state.pending, 0x0003_0201);
        assert_eq!(state.pending_count, 3);

        let state = state.step(4);
        assert_eq!(state.pending, 0);
        assert_eq!(state.pending_count, 0);
        assert_ne!(state.accumulator, 1 ^ 3);
    }

    // Property-based tests using proptest
    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn whitespace_run() -> impl Strategy<Value = Vec<u8>> {
            prop::collection::vec(prop::sample::select(vec![9u8, 10, 13, 32]), 1..8)
        }

        proptest! {
            #[test]
            fn test_fingerprint_is_deterministic(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
                let copy = bytes.clone();
                prop_assert_eq!(fingerprint(&bytes), fingerprint(&copy));
                prop_assert_eq!(FingerprintCodec::new().fingerprint(&bytes), fingerprint(&bytes));
            }

            #[test]
            fn test_inserted_whitespace_is_ignored(
                bytes in prop::collection::vec(any::<u8>(), 0..2048),
                insertions in prop::collection::vec((any::<usize>(), whitespace_run()), 0..16)
            ) {
                let mut padded = bytes.clone();
                for (position, run) in insertions {
                    let at = position % (padded.len() + 1);
                    padded.splice(at..at, run);
                }
                prop_assert_eq!(fingerprint(&padded), fingerprint(&bytes));
            }

            #[test]
            fn test_removed_whitespace_is_ignored(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
                let stripped: Vec<u8> = bytes.iter().copied().filter(|b| !is_whitespace(*b)).collect();
                prop_assert_eq!(fingerprint(&stripped), fingerprint(&bytes));
            }
        }
    }
}
