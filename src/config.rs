use clap::Parser;

/// A swarm of producer and consumer ranks coordinating assembly slots
/// and finished artifacts over point-to-point messages.
#[derive(Parser, Debug, Clone)]
#[command(name = "artifact-forge")]
pub struct Config {
    /// Rank of this process within the peer list.
    #[arg(long)]
    pub rank: Option<usize>,

    /// Listen addresses of every rank, comma separated, ordered by rank.
    #[arg(long, value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Run this many ranks inside one process over an in-memory mesh
    /// instead of TCP.
    #[arg(long)]
    pub local: Option<usize>,

    /// Producer cap; the first min(cap, world size) ranks produce.
    #[arg(long, default_value_t = 2)]
    pub producers: usize,

    /// Consumer cap over the ranks the producers leave.
    #[arg(long, default_value_t = 1)]
    pub consumers: usize,

    /// Assembly-slot capacity each producer starts believing in.
    #[arg(long, default_value_t = 1)]
    pub slots: usize,

    /// Initial artifact count; 0 makes consumers wait for the first
    /// producer cycle.
    #[arg(long, default_value_t = 0)]
    pub artifacts: usize,

    /// Lower dwell bound in seconds.
    #[arg(long, default_value_t = 1.0)]
    pub dwell_min: f64,

    /// Upper dwell bound in seconds; equal bounds fix the dwell.
    #[arg(long, default_value_t = 1.0)]
    pub dwell_max: f64,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.producers == 0 && self.consumers == 0 {
            return Err("at least one producer or consumer is required".into());
        }
        if self.dwell_min < 0.0 || self.dwell_max < self.dwell_min {
            return Err("dwell bounds must satisfy 0 <= min <= max".into());
        }
        match self.local {
            Some(0) => Err("--local needs at least one rank".into()),
            Some(_) => Ok(()),
            None => {
                let rank = self.rank.ok_or("--rank is required without --local")?;
                if self.peers.is_empty() {
                    return Err("--peers is required without --local".into());
                }
                if rank >= self.peers.len() {
                    return Err(format!("rank {rank} is outside the peer list"));
                }
                Ok(())
            }
        }
    }

    pub fn world_size(&self) -> usize {
        self.local.unwrap_or(self.peers.len())
    }
}
