use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use topowrangler::{
    ActionNode, FileTopo, FileTopoConfig, InterruptSignal, Shard, ShardKey, TabletType,
    TopoServer, Wrangler, WranglerConfig,
};

#[derive(Parser)]
#[command(name = "topoctl")]
#[command(about = "Inspect and change shard metadata in a file-backed topology")]
pub struct Cli {
    /// Directory holding the topology
    #[arg(long)]
    root: PathBuf,

    /// How long to wait for a busy shard lock
    #[arg(long, default_value_t = 30_000)]
    lock_timeout_ms: u64,

    /// How often to re-check a busy shard lock
    #[arg(long, default_value_t = 50)]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty shard record
    CreateShard {
        keyspace: String,
        shard: String,
        #[arg(long, value_delimiter = ',')]
        served_types: Vec<TabletType>,
    },
    /// Print a shard record as JSON
    GetShard { keyspace: String, shard: String },
    /// Replace the tablet types a shard serves, under the shard lock
    SetServedTypes {
        keyspace: String,
        shard: String,
        #[arg(required = true, value_delimiter = ',')]
        served_types: Vec<TabletType>,
    },
    /// Print the action currently holding the shard lock and past actions
    ActionLog { keyspace: String, shard: String },
}

pub struct App {
    cli: Cli,
    interrupt: InterruptSignal,
}

impl App {
    pub fn new(cli: Cli, interrupt: InterruptSignal) -> Self {
        Self { cli, interrupt }
    }

    pub async fn run(self) -> Result<()> {
        let topo_config = FileTopoConfig::new(&self.cli.root)
            .poll_interval(Duration::from_millis(self.cli.poll_interval_ms));
        let ts: Arc<dyn TopoServer> =
            Arc::new(FileTopo::new(topo_config).context("invalid topology configuration")?);

        match self.cli.command {
            Command::CreateShard {
                keyspace,
                shard,
                served_types,
            } => {
                let key = ShardKey::checked(&keyspace, &shard)?;
                ts.create_shard(&key, Shard::with_served_types(served_types))
                    .await
                    .with_context(|| format!("creating shard {}", key))?;
                println!("created {}", key);
            }
            Command::GetShard { keyspace, shard } => {
                let key = ShardKey::checked(&keyspace, &shard)?;
                let info = ts
                    .get_shard(&key)
                    .await
                    .with_context(|| format!("reading shard {}", key))?;
                println!("{}", serde_json::to_string_pretty(&info.shard)?);
            }
            Command::SetServedTypes {
                keyspace,
                shard,
                served_types,
            } => {
                let config = WranglerConfig::new()
                    .lock_timeout(Duration::from_millis(self.cli.lock_timeout_ms));
                let wr = Wrangler::with_interrupt(ts, config, self.interrupt)?;
                wr.set_shard_served_types(&keyspace, &shard, served_types)
                    .await
                    .with_context(|| format!("setting served types of {}/{}", keyspace, shard))?;
            }
            Command::ActionLog { keyspace, shard } => {
                let key = ShardKey::checked(&keyspace, &shard)?;
                if let Some(pending) = ts.shard_lock_contents(&key).await? {
                    print_action("LOCKED", &pending);
                }
                for entry in ts.shard_action_log(&key).await? {
                    print_action("", &entry);
                }
            }
        }
        Ok(())
    }
}

fn print_action(prefix: &str, payload: &str) {
    match ActionNode::from_json(payload) {
        Ok(node) => {
            let mut line = format!(
                "{} {} {} {}@{} pid={} state={}",
                node.time().to_rfc3339(),
                node.action_guid(),
                node.action(),
                node.user_name(),
                node.host_name(),
                node.pid(),
                node.state()
            );
            if !node.error().is_empty() {
                line.push_str(&format!(" error={:?}", node.error()));
            }
            if prefix.is_empty() {
                println!("{}", line);
            } else {
                println!("{} {}", prefix, line);
            }
        }
        Err(err) => println!("{} unreadable action ({}): {}", prefix, err, payload),
    }
}
