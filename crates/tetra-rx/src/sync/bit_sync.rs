//! Burst synchronization over a hard-bit stream.
//!
//! A sliding 510-bit window is scored against the training sequences at
//! their layout-specific offsets; matches emit an aligned burst. Once
//! locked, up to 50 burst periods may pass without a match before the lock
//! is dropped, and during that time the best-scoring burst type is emitted
//! at every period boundary.

use std::collections::VecDeque;

use tetra_core::BurstType;

/// Length of one burst in bits.
pub const FRAME_LEN: usize = 510;

/// Burst periods without a training-sequence match before sync is lost.
const MAX_MISSED_FRAMES: i64 = 50;

// 9.4.4.3.2 Normal training sequences
pub const NORMAL_TRAINING_SEQ_1: [u8; 22] =
    [1, 1, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 0]; // n1..n22
pub const NORMAL_TRAINING_SEQ_2: [u8; 22] =
    [0, 1, 1, 1, 1, 0, 1, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 1, 1, 1, 1, 0]; // p1..p22
pub const NORMAL_TRAINING_SEQ_3_BEGIN: [u8; 12] = [0, 0, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1]; // q11..q22
pub const NORMAL_TRAINING_SEQ_3_END: [u8; 10] = [1, 0, 1, 1, 0, 1, 1, 1, 0, 0]; // q1..q10

// 9.4.4.3.3 Extended training sequence
pub const EXTENDED_TRAINING_SEQ: [u8; 30] = [
    1, 0, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0, 1, 1,
]; // x1..x30

// 9.4.4.3.4 Synchronisation training sequence
pub const SYNC_TRAINING_SEQ: [u8; 38] = [
    1, 1, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0,
    1, 1, 0, 0, 1, 1, 1,
]; // y1..y38

pub struct BitSynchronizer {
    frame: VecDeque<u8>,
    is_uplink: bool,
    is_synchronized: bool,
    sync_bit_counter: i64,
}

impl BitSynchronizer {
    pub fn new(is_uplink: bool) -> Self {
        BitSynchronizer {
            frame: VecDeque::with_capacity(FRAME_LEN),
            is_uplink,
            is_synchronized: false,
            sync_bit_counter: 0,
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.is_synchronized
    }

    /// Push one received bit; any completed burst is handed to `sink` as
    /// `(burst type, frame bits)`.
    pub fn process_bit(&mut self, bit: u8, sink: &mut dyn FnMut(BurstType, Vec<u8>)) {
        debug_assert!(bit <= 1);
        self.frame.push_back(bit);

        if self.is_uplink {
            if self.frame.len() >= FRAME_LEN {
                self.process_uplink_window(sink);
            }
            return;
        }

        if self.frame.len() >= FRAME_LEN {
            self.process_downlink_window(sink);
        }
        // the countdown runs per received bit, keeping the forced emission
        // cadence aligned to burst boundaries across window refills
        self.tick_countdown();
    }

    fn process_downlink_window(&mut self, sink: &mut dyn FnMut(BurstType, Vec<u8>)) {
        let score_sb = self.pattern_score(&SYNC_TRAINING_SEQ, 214);
        let score_ndb = self.pattern_score(&NORMAL_TRAINING_SEQ_1, 244);
        let score_ndb_split = self.pattern_score(&NORMAL_TRAINING_SEQ_2, 244);

        let mut best_score = score_sb;
        let mut burst_type = BurstType::Sdb;
        if score_ndb < best_score {
            best_score = score_ndb;
            burst_type = BurstType::Ndb;
        }
        if score_ndb_split < best_score {
            best_score = score_ndb_split;
            burst_type = BurstType::NdbSplit;
        }

        // partial q-sequence at both window edges allows a fast re-lock
        // even when the training sequence in the middle is corrupted
        let score_begin = self.pattern_score(&NORMAL_TRAINING_SEQ_3_BEGIN, 0);
        let score_end = self.pattern_score(&NORMAL_TRAINING_SEQ_3_END, 500);
        let fast_relock = score_begin == 0 && score_end < 2;

        if best_score <= 5 || fast_relock {
            self.is_synchronized = true;
            self.sync_bit_counter = FRAME_LEN as i64 * MAX_MISSED_FRAMES;
            self.emit(burst_type, sink);
        } else if self.is_synchronized && self.sync_bit_counter % FRAME_LEN as i64 == 0 {
            // still in the lock window: emit the best guess at the burst
            // cadence and let the CRCs decide
            self.emit(burst_type, sink);
        } else {
            self.frame.pop_front();
        }
    }

    fn tick_countdown(&mut self) {
        if !self.is_synchronized {
            return;
        }
        self.sync_bit_counter -= 1;
        if self.sync_bit_counter <= 0 {
            tracing::info!("synchronization lost");
            self.is_synchronized = false;
            self.sync_bit_counter = 0;
        }
    }

    fn process_uplink_window(&mut self, sink: &mut dyn FnMut(BurstType, Vec<u8>)) {
        let score_cub = self.pattern_score(&EXTENDED_TRAINING_SEQ, 88);
        let score_nub = self.pattern_score(&NORMAL_TRAINING_SEQ_1, 220);
        let score_nub_split = self.pattern_score(&NORMAL_TRAINING_SEQ_2, 220);

        let mut best_score = score_cub;
        let mut burst_type = BurstType::Cub;
        if score_nub < best_score {
            best_score = score_nub;
            burst_type = BurstType::Nub;
        }
        if score_nub_split < best_score {
            best_score = score_nub_split;
            burst_type = BurstType::NubSplit;
        }

        if score_cub <= 4 {
            let frame: Vec<u8> = self.frame.iter().copied().collect();
            sink(BurstType::Cub, frame);
            self.frame.drain(..200);
        } else if best_score <= 2 {
            let frame: Vec<u8> = self.frame.iter().copied().collect();
            sink(burst_type, frame);
            self.frame.pop_front();
        } else {
            self.frame.pop_front();
        }
    }

    fn emit(&mut self, burst_type: BurstType, sink: &mut dyn FnMut(BurstType, Vec<u8>)) {
        let frame: Vec<u8> = self.frame.iter().copied().collect();
        sink(burst_type, frame);
        self.frame.clear();
    }

    /// Hamming distance between the window at `position` and `pattern`.
    fn pattern_score(&self, pattern: &[u8], position: usize) -> usize {
        pattern
            .iter()
            .enumerate()
            .map(|(i, &p)| (p ^ self.frame[position + i]) as usize)
            .sum()
    }
}
