//! Chunk layout arithmetic shared by creation and per-chunk validation.

/// How a declared file size is cut into fixed-size chunks.
///
/// Every chunk has `chunk_size` bytes except the last, which carries the
/// remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGeometry {
    /// Declared total size in bytes.
    pub total_size: i64,
    /// Size of every chunk but the last.
    pub chunk_size: i32,
    /// `ceil(total_size / chunk_size)`.
    pub total_chunks: i32,
}

impl ChunkGeometry {
    /// Compute the layout, or `None` when the inputs are non-positive or the
    /// chunk count does not fit in an `i32`.
    pub fn new(total_size: i64, chunk_size: i32) -> Option<Self> {
        if total_size <= 0 || chunk_size <= 0 {
            return None;
        }
        let chunk = i64::from(chunk_size);
        let count = total_size / chunk + i64::from(total_size % chunk != 0);
        let total_chunks = i32::try_from(count).ok()?;
        Some(Self {
            total_size,
            chunk_size,
            total_chunks,
        })
    }

    /// Rebuild from stored values without recomputing the chunk count.
    pub fn from_stored(total_size: i64, chunk_size: i32, total_chunks: i32) -> Self {
        Self {
            total_size,
            chunk_size,
            total_chunks,
        }
    }

    /// Exact byte length required for `index`, or `None` if out of range.
    pub fn expected_chunk_size(&self, index: i32) -> Option<i64> {
        if index < 0 || index >= self.total_chunks {
            return None;
        }
        if index == self.total_chunks - 1 {
            Some(self.total_size - i64::from(self.chunk_size) * i64::from(self.total_chunks - 1))
        } else {
            Some(i64::from(self.chunk_size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count_is_ceiling() {
        let cases = [
            (8_i64, 4_i32, 2_i32),
            (9, 4, 3),
            (1, 4, 1),
            (4, 4, 1),
            (3, 8, 1),
            (2 * 1024 * 1024 * 1024, 8 * 1024 * 1024, 256),
            (2 * 1024 * 1024 * 1024 + 1, 8 * 1024 * 1024, 257),
        ];
        for (total, chunk, expected) in cases {
            let g = ChunkGeometry::new(total, chunk).unwrap();
            assert_eq!(g.total_chunks, expected, "total={total} chunk={chunk}");
        }
    }

    #[test]
    fn test_last_chunk_carries_remainder() {
        for total in 1..=64_i64 {
            for chunk in 1..=16_i32 {
                let g = ChunkGeometry::new(total, chunk).unwrap();
                let last = g.expected_chunk_size(g.total_chunks - 1).unwrap();
                assert_eq!(
                    last,
                    total - i64::from(chunk) * i64::from(g.total_chunks - 1)
                );
                assert!(last > 0 && last <= i64::from(chunk));
                let sum: i64 = (0..g.total_chunks)
                    .map(|i| g.expected_chunk_size(i).unwrap())
                    .sum();
                assert_eq!(sum, total);
            }
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let g = ChunkGeometry::new(8, 4).unwrap();
        assert_eq!(g.expected_chunk_size(-1), None);
        assert_eq!(g.expected_chunk_size(2), None);
    }

    #[test]
    fn test_rejects_non_positive_and_overflow() {
        assert!(ChunkGeometry::new(0, 4).is_none());
        assert!(ChunkGeometry::new(8, 0).is_none());
        assert!(ChunkGeometry::new(-8, 4).is_none());
        assert!(ChunkGeometry::new(i64::MAX, 1).is_none());
    }
}
