// ============================================================================
// Wrangler
// ============================================================================
//
// Runs actions against the topology store. Every action that changes a shard
// record takes the shard's action lock first and releases it afterwards,
// leaving an audit trail of ActionNodes behind in the store.
//
// ============================================================================

pub mod config;
mod lock;
mod shard;

pub use config::WranglerConfig;

use crate::core::Result;
use crate::interrupt::InterruptSignal;
use crate::topo::TopoServer;
use std::sync::Arc;

pub struct Wrangler {
    ts: Arc<dyn TopoServer>,
    config: WranglerConfig,
    interrupt: InterruptSignal,
}

impl Wrangler {
    /// Creates a wrangler with its own, never fired, interrupt signal.
    pub fn new(ts: Arc<dyn TopoServer>, config: WranglerConfig) -> Result<Self> {
        Self::with_interrupt(ts, config, InterruptSignal::new())
    }

    /// Creates a wrangler whose lock waits are aborted when `interrupt` fires.
    pub fn with_interrupt(
        ts: Arc<dyn TopoServer>,
        config: WranglerConfig,
        interrupt: InterruptSignal,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ts,
            config,
            interrupt,
        })
    }

    pub fn topo_server(&self) -> &Arc<dyn TopoServer> {
        &self.ts
    }

    pub fn config(&self) -> &WranglerConfig {
        &self.config
    }

    pub fn interrupt(&self) -> &InterruptSignal {
        &self.interrupt
    }
}
