// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It is used only for sampling genomes inside bounds and for reproducible test sweeps.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_f64_01(&mut self) -> f64 {
        // Top 53 bits -> [0,1).
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    #[inline]
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64_01()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Prng::new(7);
        let mut b = Prng::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        // Zero seed is remapped, not stuck at zero.
        assert_ne!(Prng::new(0).next_u64(), 0);
    }

    #[test]
    fn ranges_are_half_open() {
        let mut rng = Prng::new(42);
        for _ in 0..10_000 {
            let x = rng.gen_range_f64(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&x));
        }
    }
}
