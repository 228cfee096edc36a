//! Reusable byte slot passed between the producer, the queue and the consumer.

/// A fixed-capacity byte buffer plus the number of valid bytes in it.
///
/// Allocated once; afterwards only the backing buffer is swapped between
/// owners, so no per-chunk allocation or byte copy takes place.
#[derive(Debug, Clone)]
pub struct ChunkSlot {
    data: Box<[u8]>,
    len: usize,
}

impl ChunkSlot {
    /// Create an empty slot able to hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Maximum number of bytes this slot can hold.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid bytes of this slot.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Whole backing buffer, for filling from a source.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mark the first `len` bytes as valid. Clamped to the capacity.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.data.len());
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Exchange contents with `other` without copying the bytes.
    pub fn swap_with(&mut self, other: &mut ChunkSlot) {
        std::mem::swap(self, other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_len_is_clamped_to_capacity() {
        let mut slot = ChunkSlot::with_capacity(8);
        slot.set_len(20);
        assert_eq!(slot.len(), 8);
        assert_eq!(slot.as_bytes().len(), 8);
    }

    #[test]
    fn swap_moves_buffers_not_bytes() {
        let mut a = ChunkSlot::with_capacity(4);
        a.buffer_mut().copy_from_slice(&[1, 2, 3, 4]);
        a.set_len(3);
        let a_ptr = a.as_bytes().as_ptr();

        let mut b = ChunkSlot::with_capacity(4);
        a.swap_with(&mut b);

        assert!(a.is_empty());
        assert_eq!(b.as_bytes(), &[1, 2, 3]);
        assert_eq!(b.as_bytes().as_ptr(), a_ptr);
    }
}
