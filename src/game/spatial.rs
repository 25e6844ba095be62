//! Chunked occupancy index
//!
//! Partitions the grid into fixed-size square chunks. Each chunk holds the set of
//! cells currently occupied by an ant (painted cells are not tracked here).
//! Every chunk in range is allocated up front so lookups never miss a chunk.

use hashbrown::{HashMap, HashSet};

use crate::game::state::Position;

/// Chunk coordinate (x / chunk_size, y / chunk_size)
pub type ChunkKey = (u32, u32);

/// Occupancy index: chunk key -> occupied cells in that chunk
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    chunk_size: u32,
    chunks_x: u32,
    chunks_y: u32,
    chunks: HashMap<ChunkKey, HashSet<Position>>,
}

impl ChunkIndex {
    /// Build an empty index covering a `width` x `height` grid
    pub fn new(width: u32, height: u32, chunk_size: u32) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks_x = width.div_ceil(chunk_size);
        let chunks_y = height.div_ceil(chunk_size);

        let mut chunks = HashMap::with_capacity(chunks_x as usize * chunks_y as usize);
        for cx in 0..chunks_x {
            for cy in 0..chunks_y {
                chunks.insert((cx, cy), HashSet::new());
            }
        }

        Self {
            chunk_size,
            chunks_x,
            chunks_y,
            chunks,
        }
    }

    /// Chunk containing a cell
    #[inline]
    pub fn chunk_key(&self, position: Position) -> ChunkKey {
        (position.x / self.chunk_size, position.y / self.chunk_size)
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of chunks (ceil(w/size) * ceil(h/size))
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk grid dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.chunks_x, self.chunks_y)
    }

    /// Mark a cell occupied. Returns false if it already was.
    pub fn insert(&mut self, position: Position) -> bool {
        let key = self.chunk_key(position);
        self.chunks.entry(key).or_default().insert(position)
    }

    /// Clear a cell. Returns false if it was not occupied.
    pub fn remove(&mut self, position: Position) -> bool {
        let key = self.chunk_key(position);
        self.chunks
            .get_mut(&key)
            .map(|cells| cells.remove(&position))
            .unwrap_or(false)
    }

    /// O(1) occupancy check
    #[inline]
    pub fn is_occupied(&self, position: Position) -> bool {
        self.chunks
            .get(&self.chunk_key(position))
            .is_some_and(|cells| cells.contains(&position))
    }

    /// Occupied cells in one chunk (empty for out-of-range keys)
    pub fn cells_in_chunk(&self, key: ChunkKey) -> impl Iterator<Item = &Position> {
        self.chunks.get(&key).into_iter().flat_map(|cells| cells.iter())
    }

    /// Chunk keys that currently contain at least one ant
    pub fn occupied_chunks(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.chunks
            .iter()
            .filter(|(_, cells)| !cells.is_empty())
            .map(|(key, _)| *key)
    }

    /// Total occupied cells across all chunks
    pub fn occupied_count(&self) -> usize {
        self.chunks.values().map(|cells| cells.len()).sum()
    }

    /// Statistics about the index
    pub fn stats(&self) -> ChunkIndexStats {
        let occupied_chunks = self.chunks.values().filter(|c| !c.is_empty()).count();
        let max_per_chunk = self.chunks.values().map(|c| c.len()).max().unwrap_or(0);

        ChunkIndexStats {
            total_chunks: self.chunks.len(),
            occupied_chunks,
            occupied_cells: self.occupied_count(),
            max_per_chunk,
        }
    }
}

/// Statistics about the chunk index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIndexStats {
    pub total_chunks: usize,
    pub occupied_chunks: usize,
    pub occupied_cells: usize,
    pub max_per_chunk: usize,
}
