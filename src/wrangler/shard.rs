use super::Wrangler;
use crate::action::ActionNode;
use crate::core::{Result, ShardKey, TabletType};

// shard related methods for Wrangler

impl Wrangler {
    /// Changes the tablet types a shard serves.
    ///
    /// Does not rebuild any serving graph or check consistency with other
    /// shards.
    pub async fn set_shard_served_types(
        &self,
        keyspace: &str,
        shard: &str,
        served_types: Vec<TabletType>,
    ) -> Result<()> {
        let mut node = ActionNode::set_shard_served_types(served_types.clone());
        self.run_guarded(keyspace, shard, &mut node, || {
            self.apply_shard_served_types(keyspace, shard, served_types)
        })
        .await
    }

    /// Must only run with the shard lock held.
    async fn apply_shard_served_types(
        &self,
        keyspace: &str,
        shard: &str,
        served_types: Vec<TabletType>,
    ) -> Result<()> {
        let key = ShardKey::checked(keyspace, shard)?;
        let mut info = self.ts.get_shard(&key).await?;
        info.shard.served_types = served_types;
        self.ts.update_shard(&info).await?;
        Ok(())
    }
}
