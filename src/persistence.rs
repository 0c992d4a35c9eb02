//! Chain persistence for TallyChain

use crate::blockchain::Block;
use crate::error::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

/// Abstraction for persistence backends. Implementations save and load the
/// full block list atomically; validation happens when a ledger is rebuilt.
pub trait ChainStore: Send + Sync {
    fn save_chain(&self, blocks: &[Block]) -> Result<()>;
    /// `None` when nothing has been saved yet.
    fn load_chain(&self) -> Result<Option<Vec<Block>>>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    blocks: Mutex<Option<Vec<Block>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for InMemoryStore {
    fn save_chain(&self, blocks: &[Block]) -> Result<()> {
        *self.blocks.lock() = Some(blocks.to_vec());
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>> {
        Ok(self.blocks.lock().clone())
    }
}

/// Pretty JSON array of blocks, written to a sibling temp file and renamed
/// into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChainStore for JsonFileStore {
    fn save_chain(&self, blocks: &[Block]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(blocks)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}
