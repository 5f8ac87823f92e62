//! Monotonic, lexicographically sortable message identifiers.
//!
//! An identifier is 26 characters from the Crockford base32 alphabet:
//! the first 10 encode milliseconds since the Unix epoch (big-endian,
//! left-padded), the last 16 encode 80 bits of randomness. Byte-wise
//! lexicographic order therefore equals time order, and two ids minted
//! in the same millisecond stay strictly increasing because the random
//! portion of the previous id is incremented instead of redrawn.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Total identifier length in characters.
pub const ENCODED_LEN: usize = 26;

/// Characters encoding the timestamp.
const TIME_LEN: usize = 10;

/// Characters encoding the random suffix.
const RAND_LEN: usize = 16;

/// Crockford base32 alphabet (no I, L, O, U).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mask for the 80-bit random portion.
const RAND_MASK: u128 = (1 << (RAND_LEN * 5)) - 1;

/// Milliseconds since the Unix epoch, from the system clock.
pub fn system_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Source of timestamps for [`IdGenerator`]. Swapped for a fixed
/// closure in tests so identifiers come out deterministic.
pub type Clock = Box<dyn FnMut() -> u64 + Send>;

/// Stateful identifier generator.
///
/// Holds the previous timestamp and random portion so that ids minted
/// within one millisecond increment rather than redraw.
pub struct IdGenerator {
    clock: Clock,
    rng: StdRng,
    last_ms: u64,
    last_rand: u128,
    primed: bool,
}

impl IdGenerator {
    /// Generator backed by the system clock and OS entropy.
    pub fn new() -> Self {
        Self::with_parts(Box::new(system_ms), StdRng::from_os_rng())
    }

    /// Generator with an explicit clock and RNG (test seam).
    pub fn with_parts(clock: Clock, rng: StdRng) -> Self {
        Self {
            clock,
            rng,
            last_ms: 0,
            last_rand: 0,
            primed: false,
        }
    }

    /// Mints the next identifier.
    pub fn generate(&mut self) -> String {
        let ms = (self.clock)();
        self.generate_at(ms)
    }

    /// Mints an identifier for the given millisecond timestamp.
    ///
    /// A timestamp at or before the previous one is clamped to the
    /// previous one and the random portion incremented, so ids from a
    /// single generator always compare strictly increasing.
    pub fn generate_at(&mut self, ms: u64) -> String {
        let (ms, rand) = if self.primed && ms <= self.last_ms {
            (self.last_ms, self.last_rand.wrapping_add(1) & RAND_MASK)
        } else {
            (ms, self.rng.random::<u128>() & RAND_MASK)
        };

        self.last_ms = ms;
        self.last_rand = rand;
        self.primed = true;

        encode(ms, rand)
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last_ms", &self.last_ms)
            .finish_non_exhaustive()
    }
}

fn encode(ms: u64, rand: u128) -> String {
    let mut out = [0u8; ENCODED_LEN];
    for (i, slot) in out.iter_mut().take(TIME_LEN).enumerate() {
        let shift = (TIME_LEN - 1 - i) * 5;
        *slot = ALPHABET[((ms >> shift) & 0x1f) as usize];
    }
    for (i, slot) in out.iter_mut().skip(TIME_LEN).enumerate() {
        let shift = (RAND_LEN - 1 - i) * 5;
        *slot = ALPHABET[((rand >> shift) & 0x1f) as usize];
    }
    String::from_utf8(out.to_vec()).expect("alphabet is ASCII")
}

fn decode_char(c: u8) -> Option<u64> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u64)
}

/// Returns `true` if `s` is a well-formed full identifier.
pub fn is_valid_id(s: &str) -> bool {
    s.len() == ENCODED_LEN && s.bytes().all(|b| decode_char(b).is_some())
}

/// Uppercases and validates a user-supplied identifier or prefix.
///
/// Returns `None` when the input is empty, longer than a full id, or
/// contains characters outside the alphabet.
pub fn normalize_prefix(s: &str) -> Option<String> {
    let s = s.trim().to_ascii_uppercase();
    if s.is_empty() || s.len() > ENCODED_LEN {
        return None;
    }
    if !s.bytes().all(|b| decode_char(b).is_some()) {
        return None;
    }
    Some(s)
}

/// Decodes the millisecond timestamp embedded in a full identifier.
pub fn timestamp_ms(id: &str) -> Option<u64> {
    if id.len() != ENCODED_LEN {
        return None;
    }
    let mut ms: u64 = 0;
    for b in id.bytes().take(TIME_LEN) {
        ms = (ms << 5) | decode_char(b)?;
    }
    Some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_gen(ms: u64) -> IdGenerator {
        IdGenerator::with_parts(Box::new(move || ms), StdRng::seed_from_u64(7))
    }

    #[test]
    fn id_shape() {
        let id = fixed_gen(1_700_000_000_000).generate();
        assert_eq!(id.len(), ENCODED_LEN);
        assert!(is_valid_id(&id));
    }

    #[test]
    fn same_millisecond_is_strictly_increasing() {
        let mut g = fixed_gen(1_700_000_000_000);
        let mut prev = g.generate();
        for _ in 0..100 {
            let next = g.generate();
            assert!(next > prev, "{next} should sort after {prev}");
            assert_eq!(&next[..TIME_LEN], &prev[..TIME_LEN]);
            prev = next;
        }
    }

    #[test]
    fn later_millisecond_sorts_after() {
        let mut g = IdGenerator::with_parts(
            Box::new(system_ms),
            StdRng::seed_from_u64(1),
        );
        let a = g.generate_at(1_000);
        let b = g.generate_at(2_000);
        assert!(b > a);
    }

    #[test]
    fn clock_going_backwards_still_increases() {
        let mut g = IdGenerator::with_parts(Box::new(|| 0), StdRng::seed_from_u64(2));
        let a = g.generate_at(5_000);
        let b = g.generate_at(4_000);
        assert!(b > a);
    }

    #[test]
    fn timestamp_roundtrip() {
        let ms = 1_700_000_000_123;
        let id = fixed_gen(ms).generate();
        assert_eq!(timestamp_ms(&id), Some(ms));
    }

    #[test]
    fn seeded_generator_is_deterministic() {
        let a = fixed_gen(42).generate();
        let b = fixed_gen(42).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_prefix_uppercases() {
        assert_eq!(normalize_prefix("01hx3k").as_deref(), Some("01HX3K"));
    }

    #[test]
    fn normalize_prefix_rejects_bad_input() {
        assert_eq!(normalize_prefix(""), None);
        assert_eq!(normalize_prefix("contains space "), None);
        assert_eq!(normalize_prefix("ILOU"), None); // excluded letters
        assert_eq!(normalize_prefix(&"0".repeat(27)), None);
    }
}
