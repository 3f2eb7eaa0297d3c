use crate::dwell::DwellSampler;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sleeping,
    Resting,
    Requesting,
    Critical,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Sleeping => "SLEEPING",
            Phase::Resting => "RESTING",
            Phase::Requesting => "REQUESTING",
            Phase::Critical => "CRITICAL",
        }
    }
}

// a fresh dwell is drawn on every transition; REQUESTING ignores it
// and leaves only when the tally completes
pub struct Lifecycle {
    phase: Phase,
    last_transition: Instant,
    dwell: Duration,
    sampler: DwellSampler,
}

impl Lifecycle {
    pub fn new(mut sampler: DwellSampler) -> Self {
        Self {
            phase: Phase::Sleeping,
            last_transition: Instant::now(),
            dwell: sampler.next_dwell(),
            sampler,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dwell_elapsed(&self) -> bool {
        self.last_transition.elapsed() >= self.dwell
    }

    pub fn remaining(&self) -> Duration {
        self.dwell.saturating_sub(self.last_transition.elapsed())
    }

    pub fn advance(&mut self, next: Phase) {
        self.phase = next;
        self.last_transition = Instant::now();
        self.dwell = self.sampler.next_dwell();
    }
}
