/// A 64-bit word read and written as named sub-ranges.
///
/// Each field is addressed by its bit offset and a right-aligned value mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitVector64(pub u64);

impl BitVector64 {
    pub const fn new(value: u64) -> Self {
        BitVector64(value)
    }

    pub const fn data(&self) -> u64 {
        self.0
    }

    pub const fn get(&self, offset: u32, mask: u64) -> u64 {
        (self.0 >> offset) & mask
    }

    /// Overwrite the field, truncating `value` to `mask`.
    pub fn set(&mut self, offset: u32, mask: u64, value: u64) {
        self.0 = (self.0 & !(mask << offset)) | ((value & mask) << offset);
    }
}
