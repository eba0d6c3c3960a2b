//! Memory port capability and the block RAM backend.
//!
//! The bus never owns its storage; it drives whatever implements
//! [`MemoryPort`]. Writes carry a bit mask so a narrower writer (a coefficient
//! half, the exposed top bits of a state word) leaves every other bit of the
//! stored word untouched.

use rtservo_common::mask;

/// A single read/write memory port.
pub trait MemoryPort {
    /// Word width in bits.
    fn width(&self) -> u32;

    /// Number of addressable words.
    fn depth(&self) -> usize;

    /// Reads the word at `addr`.
    fn read(&self, addr: u32) -> u64;

    /// Writes the bits of `word` selected by `bit_mask` at `addr`.
    fn write(&mut self, addr: u32, word: u64, bit_mask: u64);
}

/// A zero-initialised RAM of `2^addr_width` words.
///
/// Addresses are truncated to the address width and words to the data
/// width, as a hardware port would.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRam {
    width: u32,
    addr_width: u32,
    words: Vec<u64>,
}

impl BlockRam {
    /// Creates a RAM with `width`-bit words and `addr_width` address bits.
    pub fn new(width: u32, addr_width: u32) -> Self {
        debug_assert!(width <= 64, "word width {width} exceeds 64 bits");
        Self {
            width,
            addr_width,
            words: vec![0; 1usize << addr_width],
        }
    }

    /// Address width in bits.
    pub fn addr_width(&self) -> u32 {
        self.addr_width
    }

    /// Clears every word to zero.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// All stored words, indexed by address.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Overwrites a whole word, bypassing the port. Used to stand in for
    /// the engine's own port when seeding state in tests and testbenches.
    pub fn poke(&mut self, addr: u32, word: u64) {
        let idx = self.index(addr);
        self.words[idx] = word & mask(self.width);
    }

    fn index(&self, addr: u32) -> usize {
        (u64::from(addr) & mask(self.addr_width)) as usize
    }
}

impl MemoryPort for BlockRam {
    fn width(&self) -> u32 {
        self.width
    }

    fn depth(&self) -> usize {
        self.words.len()
    }

    fn read(&self, addr: u32) -> u64 {
        self.words[self.index(addr)]
    }

    fn write(&mut self, addr: u32, word: u64, bit_mask: u64) {
        let idx = self.index(addr);
        let m = bit_mask & mask(self.width);
        self.words[idx] = (self.words[idx] & !m) | (word & m);
    }
}
