use serde::{Deserialize, Serialize};

/// A single on-chain actor at a fixed epoch, as supplied by the chain-state
/// collaborator. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfo {
    /// Chain address of the actor, e.g. `f02`.
    pub address: String,
    /// Content identifier of the actor's code, used for extractor dispatch.
    pub code: String,
    /// Content identifier of the actor's state head.
    pub head: String,
    /// Chain height the state was observed at.
    pub epoch: i64,
    /// State root of the parent tipset.
    pub parent_state_root: String,
}

/// Header of one block in a tipset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Content identifier of the block.
    pub cid: String,
    pub height: i64,
    /// Content identifiers of the parent blocks.
    pub parents: Vec<String>,
    pub parent_state_root: String,
}
