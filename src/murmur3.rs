//! Murmur3 Hash Rust Implementation
//!
//! The x86 128-bit variant, modified from the `murmur3` package <https://docs.rs/murmur3/latest/murmur3/>.

use core::hash::Hasher;

const C1: u32 = 0x239b_961b;
const C2: u32 = 0xab0e_9789;
const C3: u32 = 0x38b3_4ae5;
const C4: u32 = 0xa1e3_8b93;
const C5: u32 = 0x561c_cd1b;
const C6: u32 = 0x0bca_a747;
const C7: u32 = 0x96cd_1c35;
const C8: u32 = 0x32ac_3b17;
const M: u32 = 5;

/// Per-lane multipliers and rotations: lane `i` mixes with `(LANE_C[i], ROT[i], LANE_C[i + 1])`
const LANE_C: [u32; 5] = [C1, C2, C3, C4, C1];
const LANE_ROT: [u32; 4] = [15, 16, 17, 18];

/// Internal mixing operation
fn fmix32(k: u32) -> u32 {
    let mut tmp = k;
    tmp ^= tmp >> 16;
    tmp = tmp.wrapping_mul(0x85eb_ca6b);
    tmp ^= tmp >> 13;
    tmp = tmp.wrapping_mul(0xc2b2_ae35);
    tmp ^= tmp >> 16;
    tmp
}

#[inline]
fn mix_lane(k: u32, lane: usize) -> u32 {
    k.wrapping_mul(LANE_C[lane])
        .rotate_left(LANE_ROT[lane])
        .wrapping_mul(LANE_C[lane + 1])
}

fn lanes(block: &[u8]) -> [u32; 4] {
    let mut k = [0u32; 4];
    for (lane, word) in block.chunks_exact(4).enumerate() {
        k[lane] = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }
    k
}

/// Murmur3 x86/128 over a whole byte slice
pub(crate) fn murmur3_x86_128(source: &[u8], seed: u32) -> u128 {
    let mut h = [seed; 4];

    let mut blocks = source.chunks_exact(16);
    for block in &mut blocks {
        let k = lanes(block);
        h[0] ^= mix_lane(k[0], 0);
        h[0] = h[0].rotate_left(19).wrapping_add(h[1]).wrapping_mul(M).wrapping_add(C5);
        h[1] ^= mix_lane(k[1], 1);
        h[1] = h[1].rotate_left(17).wrapping_add(h[2]).wrapping_mul(M).wrapping_add(C6);
        h[2] ^= mix_lane(k[2], 2);
        h[2] = h[2].rotate_left(15).wrapping_add(h[3]).wrapping_mul(M).wrapping_add(C7);
        h[3] ^= mix_lane(k[3], 3);
        h[3] = h[3].rotate_left(13).wrapping_add(h[0]).wrapping_mul(M).wrapping_add(C8);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut buf = [0u8; 16];
        buf[..tail.len()].copy_from_slice(tail);
        let k = lanes(&buf);
        // Only lanes that received at least one tail byte are mixed in
        for lane in (0..4).filter(|lane| tail.len() > lane * 4) {
            h[lane] ^= mix_lane(k[lane], lane);
        }
    }

    let len = source.len() as u32;
    for x in h.iter_mut() {
        *x ^= len;
    }
    h[0] = h[0].wrapping_add(h[1]).wrapping_add(h[2]).wrapping_add(h[3]);
    h[1] = h[1].wrapping_add(h[0]);
    h[2] = h[2].wrapping_add(h[0]);
    h[3] = h[3].wrapping_add(h[0]);
    for x in h.iter_mut() {
        *x = fmix32(*x);
    }
    h[0] = h[0].wrapping_add(h[1]).wrapping_add(h[2]).wrapping_add(h[3]);
    h[1] = h[1].wrapping_add(h[0]);
    h[2] = h[2].wrapping_add(h[0]);
    h[3] = h[3].wrapping_add(h[0]);

    ((h[3] as u128) << 96) | ((h[2] as u128) << 64) | ((h[1] as u128) << 32) | h[0] as u128
}

/// A `Hasher` that buffers everything written to it and runs Murmur3 once in `finish`.
///
/// Buffering keeps the digest independent of how a `Hash` impl splits its writes (a `str` writes its
/// bytes and then a terminator, for instance).
#[derive(Debug, Default, Clone)]
pub struct Murmur3Hasher {
    seed: u32,
    buf: Vec<u8>,
}

impl Murmur3Hasher {
    pub fn with_seed(seed: u32) -> Self {
        Murmur3Hasher {
            seed,
            buf: Vec::new(),
        }
    }

    /// Full 128-bit digest of everything written so far
    pub fn finish_u128(&self) -> u128 {
        murmur3_x86_128(&self.buf, self.seed)
    }
}

impl Hasher for Murmur3Hasher {
    /// Both halves of the 128-bit digest folded together
    fn finish(&self) -> u64 {
        let digest = self.finish_u128();
        (digest as u64) ^ ((digest >> 64) as u64)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/* -------------------- Unit Tests -------------------- */
