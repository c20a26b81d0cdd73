use crate::block_map::BlockMap;
use crate::store::LobStore;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct LobOptions {
    /// Chunks strictly smaller than this are inlined in the id. Default 256.
    pub min_block_size: usize,
    /// Upper bound on a single block, and the read chunk size. Default 256KB.
    pub max_block_size: usize,
}

impl Default for LobOptions {
    fn default() -> Self {
        LobOptions {
            min_block_size: 256,
            max_block_size: 256 * 1024,
        }
    }
}

impl LobOptions {
    pub fn open<M: BlockMap>(self, map: M) -> LobStore<M> {
        LobStore::new(map, self)
    }
}
