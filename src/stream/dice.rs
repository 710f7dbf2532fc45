use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform randomness for the per-frame drop and jitter decisions
pub trait Dice {
    /// A sample from `[0, 1)`
    fn roll(&mut self) -> f64;
}

/// [`Dice`] backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RandDice<R> {
    rng: R,
}

impl<R: RngCore> RandDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandDice<SmallRng> {
    /// Reproducible dice when `seed` is given, entropy-seeded otherwise
    pub fn seeded(seed: Option<u64>) -> Self {
        Self::new(small_rng(seed))
    }
}

impl<R: RngCore> Dice for RandDice<R> {
    fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Build a fast generator, reproducible when `seed` is given
pub fn small_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Dice that replay a fixed sequence, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    rolls: Vec<f64>,
    position: usize,
}

impl ScriptedDice {
    pub fn new(rolls: Vec<f64>) -> Self {
        assert!(!rolls.is_empty(), "scripted dice need at least one roll");
        Self { rolls, position: 0 }
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> f64 {
        let value = self.rolls[self.position % self.rolls.len()];
        self.position += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_dice_stays_in_unit_interval() {
        let mut dice = RandDice::seeded(Some(42));
        for _ in 0..10_000 {
            let roll = dice.roll();
            assert!((0.0..1.0).contains(&roll));
        }
    }

    #[test]
    fn test_seeded_dice_repeat() {
        let mut a = RandDice::seeded(Some(7));
        let mut b = RandDice::seeded(Some(7));
        for _ in 0..16 {
            assert_eq!(a.roll(), b.roll());
        }
    }

    #[test]
    fn test_scripted_dice_cycle() {
        let mut dice = ScriptedDice::new(vec![0.1, 0.9]);
        assert_eq!(
            (0..5).map(|_| dice.roll()).collect::<Vec<_>>(),
            vec![0.1, 0.9, 0.1, 0.9, 0.1]
        );
    }
}
