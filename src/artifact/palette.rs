use egui::Color32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Attempts before giving up on distinctness and using the last candidate.
const MAX_ATTEMPTS: usize = 32;
/// Minimum summed channel difference for two colours to count as distinct.
const MIN_CHANNEL_DISTANCE: u32 = 60;

/// Deterministic colour source for one creation or split event.
///
/// Seeding per event (rather than sharing one global generator) means a
/// replayed sequence of edits yields the exact same colours.
pub struct SplitPalette {
    rng: StdRng,
}

impl SplitPalette {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed for the `event`th palette derived from a base seed
    pub fn for_event(base_seed: u64, event: u64) -> Self {
        Self::new(base_seed ^ event.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    /// Random opaque colour, best-effort different from everything in `avoid`.
    pub fn next_distinct(&mut self, avoid: &[Color32]) -> Color32 {
        let mut candidate = self.next_color();
        for _ in 1..MAX_ATTEMPTS {
            if avoid.iter().all(|c| channel_distance(*c, candidate) >= MIN_CHANNEL_DISTANCE) {
                break;
            }
            candidate = self.next_color();
        }
        candidate
    }

    fn next_color(&mut self) -> Color32 {
        Color32::from_rgb(
            self.rng.random_range(30..=230),
            self.rng.random_range(30..=230),
            self.rng.random_range(30..=230),
        )
    }
}

fn channel_distance(a: Color32, b: Color32) -> u32 {
    a.r().abs_diff(b.r()) as u32 + a.g().abs_diff(b.g()) as u32 + a.b().abs_diff(b.b()) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_colors() {
        let mut a = SplitPalette::for_event(7, 3);
        let mut b = SplitPalette::for_event(7, 3);
        for _ in 0..5 {
            assert_eq!(a.next_distinct(&[]), b.next_distinct(&[]));
        }
    }

    #[test]
    fn test_avoids_listed_colors() {
        let mut palette = SplitPalette::new(42);
        let first = palette.next_distinct(&[]);
        let second = palette.next_distinct(&[first]);
        assert!(channel_distance(first, second) >= MIN_CHANNEL_DISTANCE);
    }
}
