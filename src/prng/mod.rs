use std::io::{Error, ErrorKind, Result};

mod glibc_rand;
mod msvc_rand;
mod mt19937;
mod php_mt_rand;

pub use glibc_rand::GlibcRand;
pub use msvc_rand::MsvcRand;
pub use mt19937::Mt19937;
pub use php_mt_rand::PhpMtRand;

/// Static description of a registered algorithm.
pub struct Descriptor {
    /// Stable name used on the command line and in the registry.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Width of the seed value in bits.
    pub seed_bits: u32,
    /// Number of 32-bit words in the raw internal state.
    pub state_words: usize,
    /// Largest value the generator can emit.
    pub max_output: u32,
    /// Whether `infer_state` is implemented for this algorithm.
    pub infers_state: bool,
}

/// Contract shared by every supported generator.
///
/// Seeding and output are bit-exact reproductions of the reference
/// implementation named in each algorithm's descriptor; any deviation makes
/// brute-force matching and state inference meaningless.
pub trait Prng: Send {
    fn descriptor(&self) -> &'static Descriptor;

    /// Reset the internal state from a seed value, following the algorithm's
    /// published seeding procedure.
    fn seed(&mut self, seed: u32);

    /// Install a raw state block. `words` must contain exactly
    /// `descriptor().state_words` entries.
    fn set_state(&mut self, words: &[u32]) -> Result<()>;

    /// Snapshot of the raw state, in the same layout `set_state` accepts.
    fn state(&self) -> Vec<u32>;

    /// Advance the state and return the next output.
    fn next(&mut self) -> u32;

    fn max_output(&self) -> u32 {
        self.descriptor().max_output
    }

    /// Reconstruct the internal state from observed outputs by inverting the
    /// output transform. `observed` must contain exactly
    /// `descriptor().state_words` entries.
    fn infer_state(&mut self, _observed: &[u32]) -> Result<()> {
        Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "state inference is not implemented for {}",
                self.descriptor().name
            ),
        ))
    }

    /// Clone through the trait object.
    fn boxed_clone(&self) -> Box<dyn Prng>;
}

type Constructor = fn() -> Box<dyn Prng>;

fn make_mt19937() -> Box<dyn Prng> {
    Box::new(Mt19937::new())
}

fn make_glibc_rand() -> Box<dyn Prng> {
    Box::new(GlibcRand::new())
}

fn make_msvc_rand() -> Box<dyn Prng> {
    Box::new(MsvcRand::new())
}

fn make_php_mt_rand() -> Box<dyn Prng> {
    Box::new(PhpMtRand::new())
}

/// Registry of supported algorithms. The first entry is the default.
static REGISTRY: [(&Descriptor, Constructor); 4] = [
    (&mt19937::DESCRIPTOR, make_mt19937),
    (&glibc_rand::DESCRIPTOR, make_glibc_rand),
    (&msvc_rand::DESCRIPTOR, make_msvc_rand),
    (&php_mt_rand::DESCRIPTOR, make_php_mt_rand),
];

/// Stable-ordered list of registered algorithm names.
pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(d, _)| d.name).collect()
}

pub fn supports(name: &str) -> bool {
    REGISTRY.iter().any(|(d, _)| d.name == name)
}

pub fn descriptor(name: &str) -> Option<&'static Descriptor> {
    REGISTRY
        .iter()
        .find(|(d, _)| d.name == name)
        .map(|(d, _)| *d)
}

/// Construct a fresh generator by registry name.
pub fn make(name: &str) -> Result<Box<dyn Prng>> {
    REGISTRY
        .iter()
        .find(|(d, _)| d.name == name)
        .map(|(_, constructor)| constructor())
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "unsupported PRNG \"{}\", expected one of: {}",
                    name,
                    names().join(", ")
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_algorithm_is_first() {
        assert_eq!(names()[0], "mt19937");
    }

    #[test]
    fn registry_round_trip() {
        for name in names() {
            assert!(supports(name));
            let generator = make(name).unwrap();
            assert_eq!(generator.descriptor().name, name);
            assert_eq!(
                generator.state().len(),
                generator.descriptor().state_words
            );
        }
        assert!(!supports("xorshift128"));
        assert!(make("xorshift128").is_err());
    }
}
