//! Burst synchronization over raw π/4-DQPSK symbols (IQ path).
//!
//! Uplink bursts arrive unannounced, so a window of hard-decided symbols is
//! correlated against the time-reversed conjugated training sequences; a
//! normalized correlation peak emits the burst. Downlink IQ streams are
//! hard-decided to bits and fed through the bit synchronizer instead.

use std::collections::VecDeque;

use num_complex::Complex;
use tetra_core::BurstType;

/// Symbol window retained for correlation.
const SYMBOL_BUFFER_LEN: usize = 300;

/// Normalized per-symbol correlation magnitude needed to declare a burst.
const SEQUENCE_DETECTION_THRESHOLD: f32 = 1.5;

/// Control uplink burst length in symbols (103 symbols = 206 bits).
const CUB_SYMBOLS: usize = 103;
/// Normal uplink burst length in symbols (231 symbols = 462 bits).
const NUB_SYMBOLS: usize = 231;

// 9.4.4.3.2 Normal training sequence n, as symbols
const TRAINING_SEQ_N: [Complex<f32>; 11] = [
    Complex::new(-1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(1.0, -1.0),
    Complex::new(1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(1.0, 1.0),
];

// 9.4.4.3.2 Normal training sequence p, as symbols
const TRAINING_SEQ_P: [Complex<f32>; 11] = [
    Complex::new(-1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(1.0, -1.0),
    Complex::new(1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(1.0, -1.0),
];

// 9.4.4.3.3 Extended training sequence x, as symbols
const TRAINING_SEQ_X: [Complex<f32>; 15] = [
    Complex::new(1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(1.0, -1.0),
    Complex::new(1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(-1.0, -1.0),
    Complex::new(-1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(1.0, 1.0),
    Complex::new(-1.0, -1.0),
];

/// Window offset of the n/p training sequence middle:
/// 2 tail + 108 coded symbols, training starts one symbol later.
const NUB_TRAINING_OFFSET: usize = 109;
/// Window offset of the x training sequence: 2 tail + 42 coded symbols.
const CUB_TRAINING_OFFSET: usize = 44;

/// Quadrant hard decision of one symbol.
pub fn hard_decision(symbol: Complex<f32>) -> Complex<f32> {
    Complex::new(
        if symbol.re > 0.0 { 1.0 } else { -1.0 },
        if symbol.im > 0.0 { 1.0 } else { -1.0 },
    )
}

/// Map one symbol to its two bits (Clause 5.3 symbol constellation).
pub fn symbol_to_bits(symbol: Complex<f32>) -> [u8; 2] {
    match (symbol.re > 0.0, symbol.im > 0.0) {
        (true, true) => [0, 0],
        (true, false) => [1, 0],
        (false, true) => [0, 1],
        (false, false) => [1, 1],
    }
}

pub fn symbols_to_bits(symbols: impl Iterator<Item = Complex<f32>>) -> Vec<u8> {
    let mut bits = Vec::new();
    for symbol in symbols {
        bits.extend_from_slice(&symbol_to_bits(symbol));
    }
    bits
}

/// Uplink burst detector over an IQ symbol stream.
pub struct IqSynchronizer {
    symbol_buffer: VecDeque<Complex<f32>>,
    hard_decision_buffer: VecDeque<Complex<f32>>,
}

impl Default for IqSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl IqSynchronizer {
    pub fn new() -> Self {
        IqSynchronizer {
            symbol_buffer: VecDeque::with_capacity(SYMBOL_BUFFER_LEN),
            hard_decision_buffer: VecDeque::with_capacity(SYMBOL_BUFFER_LEN),
        }
    }

    /// Push one received symbol; detected bursts are handed to `sink` as
    /// `(burst type, frame bits)`.
    pub fn process_symbol(
        &mut self,
        symbol: Complex<f32>,
        sink: &mut dyn FnMut(BurstType, Vec<u8>),
    ) {
        self.symbol_buffer.push_back(symbol);
        self.hard_decision_buffer.push_back(hard_decision(symbol));
        if self.symbol_buffer.len() < SYMBOL_BUFFER_LEN {
            return;
        }

        let find_x = self.correlate(CUB_TRAINING_OFFSET, &TRAINING_SEQ_X);
        if find_x >= SEQUENCE_DETECTION_THRESHOLD {
            let bits = symbols_to_bits(self.symbol_buffer.iter().copied().take(CUB_SYMBOLS));
            sink(BurstType::Cub, bits);
            self.advance(CUB_SYMBOLS);
            return;
        }

        let find_n = self.correlate(NUB_TRAINING_OFFSET, &TRAINING_SEQ_N);
        let find_p = self.correlate(NUB_TRAINING_OFFSET, &TRAINING_SEQ_P);
        if find_n >= SEQUENCE_DETECTION_THRESHOLD || find_p >= SEQUENCE_DETECTION_THRESHOLD {
            // ties resolve to the normal uplink burst
            let burst_type = if find_p > find_n { BurstType::NubSplit } else { BurstType::Nub };
            let bits = symbols_to_bits(self.symbol_buffer.iter().copied().take(NUB_SYMBOLS));
            sink(burst_type, bits);
            self.advance(NUB_SYMBOLS);
            return;
        }

        self.advance(1);
    }

    /// Normalized correlation of the hard-decision window at `offset`
    /// against a training sequence: the per-symbol average of
    /// `sum(window[i] * conj(seq[i]))`, 2.0 for a perfect match.
    fn correlate(&self, offset: usize, sequence: &[Complex<f32>]) -> f32 {
        let mut acc = Complex::new(0.0f32, 0.0);
        for (i, s) in sequence.iter().enumerate() {
            acc += self.hard_decision_buffer[offset + i] * s.conj();
        }
        acc.norm() / sequence.len() as f32
    }

    fn advance(&mut self, symbols: usize) {
        self.symbol_buffer.drain(..symbols);
        self.hard_decision_buffer.drain(..symbols);
    }
}
