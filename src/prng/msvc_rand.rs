use super::{Descriptor, Prng};
use std::io::{Error, ErrorKind, Result};

// Microsoft CRT rand(): full 32-bit LCG state, 15-bit output window,
//   state = state * 214013 + 2531011
//   output = (state >> 16) & 0x7fff

const MULTIPLIER: u32 = 214_013;
const INCREMENT: u32 = 2_531_011;
const OUTPUT_SHIFT: u32 = 16;
const OUTPUT_MASK: u32 = 0x7fff;

pub static DESCRIPTOR: Descriptor = Descriptor {
    name: "microsoft-rand",
    label: "Microsoft CRT rand()",
    seed_bits: 32,
    state_words: 1,
    max_output: OUTPUT_MASK,
    infers_state: false,
};

#[derive(Clone)]
pub struct MsvcRand {
    state: u32,
}

impl MsvcRand {
    pub fn new() -> Self {
        MsvcRand { state: 1 }
    }
}

impl Default for MsvcRand {
    fn default() -> Self {
        Self::new()
    }
}

impl Prng for MsvcRand {
    fn descriptor(&self) -> &'static Descriptor {
        &DESCRIPTOR
    }

    fn seed(&mut self, seed: u32) {
        self.state = seed;
    }

    fn set_state(&mut self, words: &[u32]) -> Result<()> {
        match words {
            [word] => {
                self.state = *word;
                Ok(())
            }
            _ => Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "microsoft-rand state is a single word, got {}",
                    words.len()
                ),
            )),
        }
    }

    fn state(&self) -> Vec<u32> {
        vec![self.state]
    }

    fn next(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        (self.state >> OUTPUT_SHIFT) & OUTPUT_MASK
    }

    fn boxed_clone(&self) -> Box<dyn Prng> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_sequence_seed_one() {
        let mut generator = MsvcRand::new();
        generator.seed(1);
        let expected = [
            41u32, 18467, 6334, 26500, 19169, 15724, 11478, 29358, 26962, 24464,
        ];
        for &value in &expected {
            assert_eq!(generator.next(), value);
        }
    }

    #[test]
    fn reference_sequence_seed_42() {
        let mut generator = MsvcRand::new();
        generator.seed(42);
        let expected = [175u32, 400, 17869, 30056, 16083, 12879];
        for &value in &expected {
            assert_eq!(generator.next(), value);
        }
    }

    #[test]
    fn output_is_fifteen_bits() {
        let mut generator = MsvcRand::new();
        generator.seed(0xffff_ffff);
        for _ in 0..1000 {
            assert!(generator.next() <= DESCRIPTOR.max_output);
        }
    }
}
