//! Display-name generator for players who did not pick one.

use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Brave", "Clever", "Curious", "Dizzy", "Eager", "Fancy", "Gentle", "Happy",
    "Jolly", "Lucky", "Mighty", "Nimble", "Quiet", "Rapid", "Silly", "Sneaky",
    "Sunny", "Swift", "Witty", "Zesty",
];

const ANIMALS: &[&str] = &[
    "Badger", "Beaver", "Falcon", "Ferret", "Gecko", "Heron", "Koala", "Lemur",
    "Lynx", "Marmot", "Otter", "Panda", "Puffin", "Raven", "Salmon", "Tapir",
    "Walrus", "Weasel", "Yak", "Zebra",
];

/// Generate a name like `SwiftOtter42` from the thread-local RNG.
pub fn generate_name() -> String {
    generate_name_with(&mut rand::thread_rng())
}

/// Generate a name from the given RNG.
pub fn generate_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Anonymous");
    let animal = ANIMALS.choose(rng).copied().unwrap_or("Player");
    let number: u8 = rng.gen_range(10..100);
    format!("{adjective}{animal}{number}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_name_shape() {
        let name = generate_name();
        assert!(!name.is_empty());
        assert!(name.chars().next().unwrap().is_ascii_uppercase());
        assert!(name.ends_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn test_same_seed_same_name() {
        let a = generate_name_with(&mut StdRng::seed_from_u64(3));
        let b = generate_name_with(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_concurrent_generation() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(generate_name))
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap().is_empty());
        }
    }
}
