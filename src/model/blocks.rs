use crate::model::Persistable;
use crate::types::BlockHeader;
use async_trait::async_trait;
use sqlx::SqliteConnection;

/// One edge of the block DAG, keyed by (block, parent). Created once per
/// observed pair, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BlockParent {
    pub block: String,
    pub parent: String,
}

#[async_trait]
impl Persistable for BlockParent {
    fn kind(&self) -> &'static str {
        "block_parent"
    }

    async fn persist_with_tx(&self, tx: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO block_parents (block, parent) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(&self.block)
        .bind(&self.parent)
        .execute(tx)
        .await?;
        Ok(())
    }
}

/// All parent edges of one block header.
#[derive(Debug, Clone, Default)]
pub struct BlockParents(pub Vec<BlockParent>);

impl BlockParents {
    pub fn from_header(header: &BlockHeader) -> Self {
        Self(
            header
                .parents
                .iter()
                .map(|parent| BlockParent { block: header.cid.clone(), parent: parent.clone() })
                .collect(),
        )
    }
}

#[async_trait]
impl Persistable for BlockParents {
    fn kind(&self) -> &'static str {
        "block_parents"
    }

    async fn persist_with_tx(&self, tx: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        for edge in &self.0 {
            edge.persist_with_tx(&mut *tx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_from_header() {
        let header = BlockHeader {
            cid: "bafyblock".into(),
            height: 5,
            parents: vec!["bafyp1".into(), "bafyp2".into()],
            parent_state_root: "bafyroot".into(),
        };
        let edges = BlockParents::from_header(&header);
        assert_eq!(edges.0.len(), 2);
        assert!(edges.0.iter().all(|e| e.block == "bafyblock"));
        assert_eq!(edges.0[1].parent, "bafyp2");
    }
}
