//! Viterbi decoding of the 16-state rate-1/4 RCPC mother code,
//! Clause 8.2.3.1.1.
//!
//! The decoder walks the trellis forward over all 32 (state, input)
//! transitions, maximizing the correlation between the received soft bits
//! and the symbols an encoder replica would emit on that transition.
//! Depunctured positions arrive as soft zeroes and contribute to neither
//! hypothesis.

use crate::lmac::convenc::ERASED;

/// Type used to represent input bits.
/// "0" is represented as -1, "1" as +1, and a punctured bit as 0.
/// Larger magnitudes express more confident soft decisions.
pub type SoftBit = i8;

/// Path metrics accumulate at most `4 * 127` per trellis step, so a 32-bit
/// correlation sum never needs renormalization at our block lengths.
type Metric = i32;

/// Constraint length of the mother code.
const CONSTRAINT_LENGTH: usize = 5;

/// Encoder states: one per register history of the four previous inputs.
const NUM_STATES: usize = 1 << (CONSTRAINT_LENGTH - 1);

/// Code rate 1/4: four output bits per input bit.
const CODE_RATE: usize = 4;

/// Generator polynomials G1 = 0b10011, G2 = 0b11101, G3 = 0b10111,
/// G4 = 0b11011 (MSB as D^4), re-packed as masks over the encoder register
/// `[current : d0 : d1 : d2 : d3]` with the current input in bit 4.
const REGISTER_TAPS: [u8; CODE_RATE] = [0b11001, 0b10111, 0b11101, 0b11011];

/// A state is the last four inputs with the most recent in the high bit,
/// so the input hypothesized on a transition is its successor's top bit.
#[inline]
fn successor(state: usize, input: usize) -> usize {
    (input << 3) | (state >> 1)
}

pub struct TetraViterbiDecoder {
    /// Expected channel symbols (+1/-1) for every 5-bit register value.
    expected: [[SoftBit; CODE_RATE]; 1 << CONSTRAINT_LENGTH],
}

impl TetraViterbiDecoder {
    pub fn new() -> Self {
        let expected = std::array::from_fn(|register| {
            std::array::from_fn(|generator| {
                let parity = (register as u8 & REGISTER_TAPS[generator]).count_ones() & 1;
                if parity == 1 { 1 as SoftBit } else { -1 as SoftBit }
            })
        });
        TetraViterbiDecoder { expected }
    }

    /// Decode one soft bit per trellis step from groups of four received
    /// symbols. The encoder starts and, thanks to the tail bits, ends in
    /// the all-zero state; traceback runs from there to trellis step 0
    /// inclusive.
    pub fn decode(&self, received: &[SoftBit]) -> Vec<u8> {
        let steps = received.len() / CODE_RATE;

        // Per step, the surviving predecessor state of every state.
        let mut survivors: Vec<[u8; NUM_STATES]> = Vec::with_capacity(steps);

        // Only state 0 is a legal start; the offset is far enough below
        // zero that no unreached path can win, with room to accumulate.
        let mut path_metrics = [Metric::MIN / 2; NUM_STATES];
        path_metrics[0] = 0;

        for symbols in received.chunks_exact(CODE_RATE) {
            let mut next_metrics = [Metric::MIN / 2; NUM_STATES];
            let mut choice = [0u8; NUM_STATES];

            for state in 0..NUM_STATES {
                for input in 0..2 {
                    let register = (input << 4) | state;
                    let mut metric = path_metrics[state];
                    for (symbol, expected) in symbols.iter().zip(&self.expected[register]) {
                        metric += *symbol as Metric * *expected as Metric;
                    }

                    let to = successor(state, input);
                    if metric > next_metrics[to] {
                        next_metrics[to] = metric;
                        choice[to] = state as u8;
                    }
                }
            }

            path_metrics = next_metrics;
            survivors.push(choice);
        }

        let mut decoded = vec![0u8; steps];
        let mut state = 0usize;
        for (step, choice) in survivors.iter().enumerate().rev() {
            decoded[step] = (state >> 3) as u8;
            state = choice[state] as usize;
        }
        decoded
    }
}

impl Default for TetraViterbiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `bit_count` type-2 bits from a depunctured mother-code buffer of
/// {0, 1, ERASED} bytes.
pub fn decode_depunctured(decoder: &TetraViterbiDecoder, mother: &[u8], bit_count: usize, out: &mut [u8]) {
    assert!(mother.len() >= bit_count * 4, "mother buffer too short");
    assert!(out.len() >= bit_count, "output buffer too short");

    let soft: Vec<SoftBit> = mother[..bit_count * 4]
        .iter()
        .map(|&b| match b {
            0x00 => -1,
            0x01 => 1,
            ERASED => 0,
            _ => panic!("decode_depunctured: invalid input byte {}", b),
        })
        .collect();

    let decoded = decoder.decode(&soft);
    out[..bit_count].copy_from_slice(&decoded[..bit_count]);
}
