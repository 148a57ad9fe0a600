use crate::chain::{ChainStateReader, RewardState};
use crate::error::ChainError;
use crate::types::{ActorInfo, BlockHeader};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

const METHOD_CHAIN_HEAD: &str = "Filecoin.ChainHead";
const METHOD_TIPSET_BY_HEIGHT: &str = "Filecoin.ChainGetTipSetByHeight";
const METHOD_STATE_GET_ACTOR: &str = "Filecoin.StateGetActor";
const METHOD_STATE_READ_STATE: &str = "Filecoin.StateReadState";

/// JSON-RPC client for the chain node's state API.
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    url: Url,
    token: Option<String>,
}

impl NodeClient {
    pub fn new(url: Url, token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), url, token }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let mut req = self.http.post(self.url.clone()).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp: RpcResponse<T> = req.send().await?.error_for_status()?.json().await?;
        if let Some(err) = resp.error {
            return Err(ChainError::Rpc { code: err.code, message: err.message });
        }
        resp.result
            .ok_or_else(|| ChainError::Decode(format!("{method}: missing result")))
    }

    async fn tipset(&self, epoch: i64) -> Result<TipSetJson, ChainError> {
        self.call(METHOD_TIPSET_BY_HEIGHT, json!([epoch, null])).await
    }
}

#[async_trait]
impl ChainStateReader for NodeClient {
    async fn head_epoch(&self) -> Result<i64, ChainError> {
        let head: TipSetJson = self.call(METHOD_CHAIN_HEAD, json!([])).await?;
        Ok(head.height)
    }

    async fn block_headers(&self, epoch: i64) -> Result<Vec<BlockHeader>, ChainError> {
        self.tipset(epoch).await?.into_headers()
    }

    async fn actor(&self, address: &str, epoch: i64) -> Result<ActorInfo, ChainError> {
        let tipset = self.tipset(epoch).await?;
        let state_root = tipset.parent_state_root()?;
        let key = tipset.key();
        let actor: ActorJson = self.call(METHOD_STATE_GET_ACTOR, json!([address, key])).await?;
        Ok(ActorInfo {
            address: address.to_string(),
            code: actor.code.cid,
            head: actor.head.cid,
            epoch,
            parent_state_root: state_root,
        })
    }

    async fn reward_state(&self, info: &ActorInfo) -> Result<RewardState, ChainError> {
        let tipset = self.tipset(info.epoch).await?;
        let read: ReadStateJson<RewardState> = self
            .call(METHOD_STATE_READ_STATE, json!([info.address, tipset.key()]))
            .await?;
        Ok(read.state)
    }
}

/// CIDs are encoded on the wire as `{"/": "bafy..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CidJson {
    #[serde(rename = "/")]
    cid: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TipSetJson {
    #[serde(rename = "Cids")]
    cids: Vec<CidJson>,
    #[serde(rename = "Blocks")]
    blocks: Vec<BlockJson>,
    #[serde(rename = "Height")]
    height: i64,
}

#[derive(Debug, Deserialize)]
struct BlockJson {
    #[serde(rename = "Parents")]
    parents: Vec<CidJson>,
    #[serde(rename = "ParentStateRoot")]
    parent_state_root: CidJson,
    #[serde(rename = "Height")]
    height: i64,
}

#[derive(Debug, Deserialize)]
struct ActorJson {
    #[serde(rename = "Code")]
    code: CidJson,
    #[serde(rename = "Head")]
    head: CidJson,
}

#[derive(Debug, Deserialize)]
struct ReadStateJson<S> {
    #[serde(rename = "State")]
    state: S,
}

impl TipSetJson {
    fn key(&self) -> Vec<CidJson> {
        self.cids.clone()
    }

    fn parent_state_root(&self) -> Result<String, ChainError> {
        self.blocks
            .first()
            .map(|b| b.parent_state_root.cid.clone())
            .ok_or_else(|| ChainError::Decode(format!("tipset at {} has no blocks", self.height)))
    }

    fn into_headers(self) -> Result<Vec<BlockHeader>, ChainError> {
        if self.cids.len() != self.blocks.len() {
            return Err(ChainError::Decode(format!(
                "tipset at {}: {} cids for {} blocks",
                self.height,
                self.cids.len(),
                self.blocks.len()
            )));
        }
        Ok(self
            .cids
            .into_iter()
            .zip(self.blocks)
            .map(|(cid, block)| BlockHeader {
                cid: cid.cid,
                height: block.height,
                parents: block.parents.into_iter().map(|p| p.cid).collect(),
                parent_state_root: block.parent_state_root.cid,
            })
            .collect())
    }
}
