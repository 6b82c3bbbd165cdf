use super::{Descriptor, Prng};
use std::io::{Error, ErrorKind, Result};

// MT19937 per Matsumoto-Nishimura's mt19937ar.c. The single modular twist
// loop below is equivalent to the reference's three unrolled loops: entries
// read through (i + M) % N and (i + 1) % N land on the correct generation
// either side of the in-place update.

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

const INIT_MULTIPLIER: u32 = 1_812_433_253;
const DEFAULT_SEED: u32 = 5489;

const TEMPER_U: u32 = 11;
const TEMPER_S: u32 = 7;
const TEMPER_B: u32 = 0x9d2c_5680;
const TEMPER_T: u32 = 15;
const TEMPER_C: u32 = 0xefc6_0000;
const TEMPER_L: u32 = 18;

pub static DESCRIPTOR: Descriptor = Descriptor {
    name: "mt19937",
    label: "Mersenne Twister (MT19937)",
    seed_bits: 32,
    state_words: N,
    max_output: u32::MAX,
    infers_state: true,
};

#[derive(Clone)]
pub struct Mt19937 {
    state: [u32; N],
    index: usize,
}

impl Mt19937 {
    pub fn new() -> Self {
        let mut generator = Mt19937 {
            state: [0; N],
            index: N,
        };
        generator.seed(DEFAULT_SEED);
        generator
    }

    fn twist(&mut self) {
        for i in 0..N {
            let y = (self.state[i] & UPPER_MASK) | (self.state[(i + 1) % N] & LOWER_MASK);
            let mag = if y & 1 == 0 { 0 } else { MATRIX_A };
            self.state[i] = self.state[(i + M) % N] ^ (y >> 1) ^ mag;
        }
        self.index = 0;
    }

    fn temper(mut y: u32) -> u32 {
        y ^= y >> TEMPER_U;
        y ^= (y << TEMPER_S) & TEMPER_B;
        y ^= (y << TEMPER_T) & TEMPER_C;
        y ^ (y >> TEMPER_L)
    }

    /// Invert the tempering transform, recovering the raw state word that
    /// produced `output`.
    pub fn untemper(output: u32) -> u32 {
        let mut y = undo_right_shift_xor(output, TEMPER_L);
        y = undo_left_shift_mask_xor(y, TEMPER_T, TEMPER_C);
        y = undo_left_shift_mask_xor(y, TEMPER_S, TEMPER_B);
        undo_right_shift_xor(y, TEMPER_U)
    }
}

impl Default for Mt19937 {
    fn default() -> Self {
        Self::new()
    }
}

impl Prng for Mt19937 {
    fn descriptor(&self) -> &'static Descriptor {
        &DESCRIPTOR
    }

    fn seed(&mut self, seed: u32) {
        self.state[0] = seed;
        for i in 1..N {
            let previous = self.state[i - 1];
            self.state[i] = INIT_MULTIPLIER
                .wrapping_mul(previous ^ (previous >> 30))
                .wrapping_add(i as u32);
        }
        self.index = N;
    }

    fn set_state(&mut self, words: &[u32]) -> Result<()> {
        if words.len() != N {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("mt19937 state requires {} words, got {}", N, words.len()),
            ));
        }
        self.state.copy_from_slice(words);
        // The installed words are a full post-twist generation; the next
        // output comes from a fresh twist of them.
        self.index = N;
        Ok(())
    }

    fn state(&self) -> Vec<u32> {
        self.state.to_vec()
    }

    fn next(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }
        let y = self.state[self.index];
        self.index += 1;
        Self::temper(y)
    }

    fn infer_state(&mut self, observed: &[u32]) -> Result<()> {
        if observed.len() != N {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "mt19937 state inference requires {} observed outputs, got {}",
                    N,
                    observed.len()
                ),
            ));
        }
        let mut words = [0u32; N];
        for (word, &output) in words.iter_mut().zip(observed) {
            *word = Self::untemper(output);
        }
        self.set_state(&words)
    }

    fn boxed_clone(&self) -> Box<dyn Prng> {
        Box::new(self.clone())
    }
}

// y = x ^ (x >> shift): the top `shift` bits are already plain, each pass
// extends the recovered prefix downward by another `shift` bits.
fn undo_right_shift_xor(value: u32, shift: u32) -> u32 {
    let mut recovered = value;
    let mut covered = shift;
    while covered < 32 {
        recovered = value ^ (recovered >> shift);
        covered += shift;
    }
    recovered
}

// y = x ^ ((x << shift) & mask): same fixed point, working upward from the
// untouched low `shift` bits.
fn undo_left_shift_mask_xor(value: u32, shift: u32, mask: u32) -> u32 {
    let mut recovered = value;
    let mut covered = shift;
    while covered < 32 {
        recovered = value ^ ((recovered << shift) & mask);
        covered += shift;
    }
    recovered
}
