use crate::random::Random;

/// Xoroshiro128++ generator, seeded through the stafford mixer.
#[derive(Debug, Clone)]
pub struct Xoroshiro {
    seed_lo: u64,
    seed_hi: u64,
}

// Ratios used in the mix functions
const GOLDEN_RATIO_64: u64 = 0x9E37_79B9_7F4A_7C15;
const SILVER_RATIO_64: u64 = 0x6A09_E667_F3BC_C909;

impl Xoroshiro {
    /// Creates a generator from a 64 bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        let (lo, hi) = Self::upgrade_seed_to_128_bit(seed);
        Self::new(mix_stafford_13(lo), mix_stafford_13(hi))
    }

    fn new(lo: u64, hi: u64) -> Self {
        // An all zero state would only ever produce zeros.
        let (lo, hi) = if (lo | hi) == 0 {
            (GOLDEN_RATIO_64, SILVER_RATIO_64)
        } else {
            (lo, hi)
        };
        Self {
            seed_lo: lo,
            seed_hi: hi,
        }
    }

    fn upgrade_seed_to_128_bit(seed: u64) -> (u64, u64) {
        let lo = seed ^ SILVER_RATIO_64;
        let hi = lo.wrapping_add(GOLDEN_RATIO_64);
        (lo, hi)
    }

    fn next(&mut self, bits: u64) -> u64 {
        self.next_random() >> (64 - bits)
    }

    fn next_random(&mut self) -> u64 {
        let l = self.seed_lo;
        let m = self.seed_hi;
        let n = l.wrapping_add(m).rotate_left(17).wrapping_add(l);
        let m = m ^ l;
        self.seed_lo = l.rotate_left(49) ^ m ^ (m << 21);
        self.seed_hi = m.rotate_left(28);
        n
    }
}

fn mix_stafford_13(z: u64) -> u64 {
    let z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    let z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Random for Xoroshiro {
    fn fork(&mut self) -> Self {
        Self::new(self.next_random(), self.next_random())
    }

    fn next_i32(&mut self) -> i32 {
        self.next_random() as i32
    }

    fn next_i32_bounded(&mut self, bound: i32) -> i32 {
        debug_assert!(bound > 0, "bound must be positive");
        let bound = u64::from(bound.max(1) as u32);
        let mut l = u64::from(self.next_i32() as u32);
        let mut m = l * bound;
        let mut n = m & 0xFFFF_FFFF;
        if n < bound {
            let threshold = (bound.wrapping_neg() & 0xFFFF_FFFF) % bound;
            while n < threshold {
                l = u64::from(self.next_i32() as u32);
                m = l * bound;
                n = m & 0xFFFF_FFFF;
            }
        }
        (m >> 32) as i32
    }

    fn next_i64(&mut self) -> i64 {
        self.next_random() as i64
    }

    fn next_f32(&mut self) -> f32 {
        self.next(24) as f32 * 5.960_464_5e-8
    }

    fn next_f64(&mut self) -> f64 {
        self.next(53) as f64 * 1.110_223e-16
    }

    fn next_bool(&mut self) -> bool {
        (self.next_random() & 1) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = Xoroshiro::from_seed(12345);
        let mut b = Xoroshiro::from_seed(12345);
        for _ in 0..100 {
            assert_eq!(a.next_i64(), b.next_i64());
        }
    }

    #[test]
    fn test_floats_in_unit_range() {
        let mut rng = Xoroshiro::from_seed(1);
        for _ in 0..10_000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f), "{f} out of range");
            let d = rng.next_f64();
            assert!((0.0..1.0).contains(&d), "{d} out of range");
        }
    }

    #[test]
    fn test_bounded_stays_in_bounds() {
        let mut rng = Xoroshiro::from_seed(42);
        for bound in [1, 2, 3, 7, 49, 1000] {
            for _ in 0..500 {
                let v = rng.next_i32_bounded(bound);
                assert!((0..bound).contains(&v), "{v} not in 0..{bound}");
            }
        }
        for _ in 0..500 {
            let v = rng.next_i32_between(-24, 24);
            assert!((-24..=24).contains(&v));
        }
    }

    #[test]
    fn test_fork_diverges() {
        let mut rng = Xoroshiro::from_seed(5);
        let mut forked = rng.fork();
        assert_ne!(rng.next_i64(), forked.next_i64());
    }
}
