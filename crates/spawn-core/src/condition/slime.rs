//! Seeded slime-chunk test.
//!
//! Reproduces the 48-bit linear congruential generator used by the host game
//! so that a chunk's slime flag matches what players see in-game.

use spawn_world::ChunkPos;

const MULTIPLIER: i64 = 0x5_DEEC_E66D;
const ADDEND: i64 = 0xB;
const MASK: i64 = (1 << 48) - 1;

/// Minimal port of the host game's seeded generator; only `next_int` is needed.
struct LegacyRandom {
    seed: i64,
}

impl LegacyRandom {
    fn new(seed: i64) -> Self {
        Self {
            seed: (seed ^ MULTIPLIER) & MASK,
        }
    }

    fn next(&mut self, bits: u32) -> i32 {
        self.seed = (self.seed.wrapping_mul(MULTIPLIER).wrapping_add(ADDEND)) & MASK;
        (self.seed >> (48 - bits)) as i32
    }

    fn next_int(&mut self, bound: i32) -> i32 {
        if bound & bound.wrapping_neg() == bound {
            return ((bound as i64 * self.next(31) as i64) >> 31) as i32;
        }
        loop {
            let bits = self.next(31);
            let value = bits % bound;
            if bits.wrapping_sub(value).wrapping_add(bound - 1) >= 0 {
                return value;
            }
        }
    }
}

/// Whether `chunk` is a slime chunk in a world with `seed`.
///
/// Products of chunk coordinates overflow as 32-bit integers before being
/// widened, except `z * z`, which is widened before its multiplier.
pub fn is_slime_chunk(seed: i64, chunk: ChunkPos) -> bool {
    let x = chunk.x;
    let z = chunk.z;
    let mixed = seed
        .wrapping_add(x.wrapping_mul(x).wrapping_mul(4_987_142) as i64)
        .wrapping_add(x.wrapping_mul(5_947_611) as i64)
        .wrapping_add((z.wrapping_mul(z) as i64).wrapping_mul(4_392_871))
        .wrapping_add(z.wrapping_mul(389_711) as i64)
        ^ 987_234_911;
    LegacyRandom::new(mixed).next_int(10) == 0
}
