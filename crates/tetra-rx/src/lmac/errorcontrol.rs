//! Type-5 to type-1 decoding chains for the control channels,
//! Figure 8.5/8.6 error control structure for π/4-DQPSK logical channels.

use tetra_core::BitBuffer;

use crate::lmac::convenc;
use crate::lmac::crc16;
use crate::lmac::interleaver;
use crate::lmac::rm3014;
use crate::lmac::scrambler::ScramblerCache;
use crate::lmac::viterbi::{self, TetraViterbiDecoder};

pub const MAX_TYPE2_BITS: usize = 288;
pub const MAX_TYPE345_BITS: usize = 432;

/// Block sizes and interleaving constant of one logical channel.
#[derive(Debug)]
pub struct ErrorControlParams {
    pub type345_bits: usize,
    pub type2_bits: usize,
    pub type1_bits: usize,
    pub interleave_a: usize,
}

/// BSCH (SB block of the synchronization burst)
pub const BSCH_PARAMS: ErrorControlParams = ErrorControlParams {
    type345_bits: 120,
    type2_bits: 80,
    type1_bits: 60,
    interleave_a: 11,
};

/// SCH/HD and STCH half-slot blocks
pub const SCH_HD_PARAMS: ErrorControlParams = ErrorControlParams {
    type345_bits: 216,
    type2_bits: 144,
    type1_bits: 124,
    interleave_a: 101,
};

/// SCH/F full-slot block
pub const SCH_F_PARAMS: ErrorControlParams = ErrorControlParams {
    type345_bits: 432,
    type2_bits: 288,
    type1_bits: 268,
    interleave_a: 103,
};

/// SCH/HU block of the control uplink burst
pub const SCH_HU_PARAMS: ErrorControlParams = ErrorControlParams {
    type345_bits: 168,
    type2_bits: 112,
    type1_bits: 92,
    interleave_a: 13,
};

/// Decode a control-plane block from type-5 bits (one bit per byte) down to
/// type-1 bits. Returns the type-1 block and the CRC verdict; a failed CRC
/// still yields the decoded bits for the caller to dispose of.
pub fn decode_cp(
    decoder: &TetraViterbiDecoder,
    scrambler: &mut ScramblerCache,
    params: &ErrorControlParams,
    type5: &[u8],
    scrambling_code: u32,
) -> (BitBuffer, bool) {
    assert_eq!(type5.len(), params.type345_bits, "type5 block size mismatch");

    // Unscrambling, type5 -> type4
    let mut type4_arr = [0u8; MAX_TYPE345_BITS];
    type4_arr[..params.type345_bits].copy_from_slice(type5);
    scrambler.descramble(scrambling_code, &mut type4_arr[..params.type345_bits]);

    // De-interleaving, type4 -> type3
    let mut type3_arr = [0u8; MAX_TYPE345_BITS];
    interleaver::block_deinterleave(
        params.type345_bits,
        params.interleave_a,
        &type4_arr,
        &mut type3_arr,
    );

    // De-puncturing, type3 -> mother code with erasures
    let mut mother_arr = [convenc::ERASED; MAX_TYPE2_BITS * 4];
    convenc::depuncture23(&type3_arr, params.type345_bits, &mut mother_arr);

    // Viterbi, mother -> type2
    let mut type2_arr = [0u8; MAX_TYPE2_BITS];
    viterbi::decode_depunctured(decoder, &mother_arr, params.type2_bits, &mut type2_arr);

    // CRC check over information word plus appended CRC, type2 -> type1
    let crc_ok = crc16::check_crc16_ccitt(&type2_arr, params.type1_bits + 16);
    let type1 = BitBuffer::from_bits(&type2_arr[..params.type1_bits]);

    (type1, crc_ok)
}

/// Decode the 30-bit broadcast block into the 14 AACH bits.
pub fn decode_aach(
    scrambler: &mut ScramblerCache,
    type5: &[u8; 30],
    scrambling_code: u32,
) -> [u8; 14] {
    let mut type2 = *type5;
    scrambler.descramble(scrambling_code, &mut type2);
    rm3014::rm3014_decode(&type2)
}

/// Descramble a traffic block in place (traffic is not error-decoded at
/// this layer).
pub fn descramble_traffic(scrambler: &mut ScramblerCache, bits: &mut [u8], scrambling_code: u32) {
    scrambler.descramble(scrambling_code, bits);
}

#[cfg(test)]
pub(crate) mod testenc {
    //! Encode-side chains for building test vectors.

    use super::*;
    use crate::lmac::convenc::ConvEncState;

    /// Encode type-1 bits up to a type-5 block for the given parameters.
    pub fn encode_cp(
        scrambler: &mut ScramblerCache,
        params: &ErrorControlParams,
        type1: &[u8],
        scrambling_code: u32,
    ) -> Vec<u8> {
        assert_eq!(type1.len(), params.type1_bits);

        // CRC addition, type1 -> type2
        let mut type2_arr = vec![0u8; params.type2_bits];
        type2_arr[..params.type1_bits].copy_from_slice(type1);
        crc16::append_crc16_ccitt(&mut type2_arr, params.type1_bits);
        // the remaining type2 bits are the encoder tail, left zero

        // Convolutional encoding, type2 -> mother
        let mut mother = vec![0u8; params.type2_bits * 4];
        ConvEncState::new().encode(&type2_arr, &mut mother);

        // Puncturing, mother -> type3
        let mut type3 = vec![0u8; params.type345_bits];
        convenc::puncture23(&mother, &mut type3);

        // Interleaving, type3 -> type4
        let mut type4 = vec![0u8; params.type345_bits];
        interleaver::block_interleave(params.type345_bits, params.interleave_a, &type3, &mut type4);

        // Scrambling, type4 -> type5
        scrambler.descramble(scrambling_code, &mut type4);
        type4
    }

    /// Encode 14 AACH bits into the scrambled 30-bit broadcast block.
    pub fn encode_aach(scrambler: &mut ScramblerCache, bits14: u16, scrambling_code: u32) -> [u8; 30] {
        let code = rm3014::rm3014_encode(bits14);
        let mut bits = [0u8; 30];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = ((code >> (29 - i)) & 1) as u8;
        }
        scrambler.descramble(scrambling_code, &mut bits);
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::testenc::{encode_aach, encode_cp};
    use super::*;
    use crate::lmac::scrambler::SCRAMB_INIT;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 29 + 11) % 5 < 2) as u8).collect()
    }

    #[test]
    fn roundtrip_bsch() {
        let mut scrambler = ScramblerCache::new();
        let decoder = TetraViterbiDecoder::new();
        let type1 = pattern(BSCH_PARAMS.type1_bits);

        let type5 = encode_cp(&mut scrambler, &BSCH_PARAMS, &type1, SCRAMB_INIT);
        let (decoded, crc_ok) =
            decode_cp(&decoder, &mut scrambler, &BSCH_PARAMS, &type5, SCRAMB_INIT);

        assert!(crc_ok);
        assert_eq!(decoded.to_bitstr(), BitBuffer::from_bits(&type1).to_bitstr());
    }

    #[test]
    fn roundtrip_sch_hd_sch_f_sch_hu() {
        let code = 0x41BFFF1F;
        let mut scrambler = ScramblerCache::new();
        let decoder = TetraViterbiDecoder::new();

        for params in [&SCH_HD_PARAMS, &SCH_F_PARAMS, &SCH_HU_PARAMS] {
            let type1 = pattern(params.type1_bits);
            let type5 = encode_cp(&mut scrambler, params, &type1, code);
            let (decoded, crc_ok) = decode_cp(&decoder, &mut scrambler, params, &type5, code);

            assert!(crc_ok, "crc failed for {:?}", params);
            assert_eq!(decoded.to_bitstr(), BitBuffer::from_bits(&type1).to_bitstr());
        }
    }

    #[test]
    fn wrong_scrambling_code_fails_crc() {
        let mut scrambler = ScramblerCache::new();
        let decoder = TetraViterbiDecoder::new();
        let type1 = pattern(SCH_HD_PARAMS.type1_bits);

        let type5 = encode_cp(&mut scrambler, &SCH_HD_PARAMS, &type1, 0x41BFFF1F);
        let (_, crc_ok) =
            decode_cp(&decoder, &mut scrambler, &SCH_HD_PARAMS, &type5, 0x12345677);
        assert!(!crc_ok);
    }

    #[test]
    fn aach_roundtrip_with_bit_error() {
        let mut scrambler = ScramblerCache::new();
        let code = 0x41BFFF1F;

        let mut type5 = encode_aach(&mut scrambler, 0b00001010001010, code);
        type5[7] ^= 1; // single channel error, correctable by the RM code
        let bits = decode_aach(&mut scrambler, &type5, code);

        let value = bits.iter().fold(0u16, |acc, &b| (acc << 1) | b as u16);
        assert_eq!(value, 0b00001010001010);
    }
}
