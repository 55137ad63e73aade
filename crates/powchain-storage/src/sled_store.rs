use anyhow::{Context, Result};
use powchain_core::{Block, ChainStore};
use sled::{Batch, Db, IVec, Tree};
use std::path::Path;
use tracing::info;

const TREE_BLOCKS: &str = "blocks";
const KEY_TIP_HEIGHT: &[u8] = b"tip_height";

/// Blocks are bincode-encoded and keyed by big-endian index, so tree order is chain order.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).with_context(|| format!("opening sled db at {}", path.display()))?;
    info!(path = %path.display(), "sled store opened");
    Ok(Self { db })
  }

  fn blocks(&self) -> Result<Tree> {
    self.db.open_tree(TREE_BLOCKS).context("opening blocks tree")
  }

  /// Drops every stored block and the tip marker.
  pub fn clear(&self) -> Result<()> {
    self.blocks()?.clear()?;
    self.db.remove(KEY_TIP_HEIGHT)?;
    self.db.flush()?;
    Ok(())
  }

  fn decode(index: u64, bytes: &IVec) -> Result<Block> {
    bincode::deserialize(bytes).with_context(|| format!("decoding block {index}"))
  }
}

impl ChainStore for SledStore {
  fn put_block(&self, block: &Block) -> Result<()> {
    let tree = self.blocks()?;
    let bytes = bincode::serialize(block)?;
    tree.insert(block.index.to_be_bytes(), bytes)?;

    // update tip
    self
      .db
      .insert(KEY_TIP_HEIGHT, block.index.to_be_bytes().to_vec())?;

    self.db.flush()?;
    Ok(())
  }

  fn tip_height(&self) -> Result<u64> {
    match self.db.get(KEY_TIP_HEIGHT)? {
      Some(v) => {
        let arr: [u8; 8] = v.as_ref().try_into().context("corrupt tip height")?;
        Ok(u64::from_be_bytes(arr))
      }
      None => Ok(0),
    }
  }

  fn load_chain(&self) -> Result<Vec<Block>> {
    let tree = self.blocks()?;
    let mut chain = Vec::with_capacity(tree.len());
    for entry in tree.iter() {
      let (key, value) = entry?;
      let index = key
        .as_ref()
        .try_into()
        .map(u64::from_be_bytes)
        .context("corrupt block key")?;
      chain.push(Self::decode(index, &value)?);
    }
    Ok(chain)
  }

  fn replace_chain(&self, chain: &[Block]) -> Result<()> {
    let tree = self.blocks()?;
    let tip = chain.last().map_or(0, |b| b.index);

    // one batch so readers never observe a half-written chain
    let mut batch = Batch::default();
    for entry in tree.iter().keys() {
      let key = entry?;
      let stale = key
        .as_ref()
        .try_into()
        .map(u64::from_be_bytes)
        .map_or(true, |index| index > tip);
      if stale {
        batch.remove(key);
      }
    }
    for block in chain {
      batch.insert(block.index.to_be_bytes().to_vec(), bincode::serialize(block)?);
    }
    tree.apply_batch(batch)?;

    self.db.insert(KEY_TIP_HEIGHT, tip.to_be_bytes().to_vec())?;
    self.db.flush()?;
    info!(height = chain.len(), "replaced stored chain");
    Ok(())
  }

  fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}
