//! Module that implements the per-rank engine driving the
//! request/consume/produce lifecycle.

use crate::clock::LamportClock;
use crate::fsm::{Lifecycle, Phase};
use crate::log;
use crate::mesh::Mesh;
use crate::message::{MessageKind, ProtocolMessage};
use crate::queue::ResourceQueue;
use crate::role::Profile;
use crate::tally::AckTally;
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub rank: usize,
    pub phase: Phase,
    pub clock: u64,
}

// cap on one blocked slice of a SLEEPING dwell so grants keep flowing
const SLEEP_SLICE: Duration = Duration::from_millis(20);

pub struct Crafter {
    profile: Profile,
    clock: LamportClock,
    queue: ResourceQueue,
    tally: AckTally,
    lifecycle: Lifecycle,
    mesh: Mesh,
    events: Option<UnboundedSender<Transition>>,
}

impl Crafter {
    pub fn new(profile: Profile, available: usize, lifecycle: Lifecycle, mesh: Mesh) -> Self {
        let tally = AckTally::new(&profile.class_peers);
        let queue = ResourceQueue::new(profile.input, available);
        Self {
            profile,
            clock: LamportClock::new(),
            queue,
            tally,
            lifecycle,
            mesh,
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<Transition>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn queue(&self) -> &ResourceQueue {
        &self.queue
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        loop {
            self.tick().await?;
            match self.mesh.try_recv() {
                Some((from, message)) => self.handle(from, message)?,
                None => tokio::task::yield_now().await,
            }
        }
    }

    async fn tick(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.lifecycle.phase() {
            Phase::Sleeping => {
                if self.lifecycle.dwell_elapsed() {
                    self.transition(Phase::Resting);
                } else {
                    tokio::time::sleep(self.lifecycle.remaining().min(SLEEP_SLICE)).await;
                }
            }
            Phase::Resting => {
                if self.lifecycle.dwell_elapsed() {
                    self.broadcast_request()?;
                    self.transition(Phase::Requesting);
                }
            }
            Phase::Requesting => {
                if self.tally.complete() {
                    self.transition(Phase::Critical);
                }
            }
            Phase::Critical => {
                if self.lifecycle.dwell_elapsed() {
                    self.release()?;
                    self.transition(Phase::Sleeping);
                }
            }
        }
        Ok(())
    }

    pub fn handle(
        &mut self,
        from: usize,
        message: ProtocolMessage,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.clock.observe(message.ts);
        assert_eq!(
            message.resource,
            self.queue.resource(),
            "rank {} got a {:?} about a resource it does not track",
            self.profile.rank,
            message.kind,
        );

        let candidate = match message.kind {
            MessageKind::Request => {
                if self.queue.add_request(from, message.ts) {
                    Some(from)
                } else {
                    None
                }
            }
            MessageKind::Consume => {
                self.queue.consume(from);
                None
            }
            MessageKind::Produce => self.queue.produce(),
            MessageKind::Ack => {
                self.tally.record(from);
                None
            }
        };

        if let Some(peer) = candidate {
            self.queue.mark_ack_sent(peer);
            if peer == self.profile.rank {
                // the window slid onto our own pending request
                self.tally.record_self();
            } else {
                self.send_ack(peer)?;
            }
        }
        Ok(())
    }

    fn broadcast_request(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let ts = self.clock.current();
        if self.queue.add_request(self.profile.rank, ts) {
            self.queue.mark_ack_sent(self.profile.rank);
            self.tally.record_self();
        }
        let request = ProtocolMessage {
            kind: MessageKind::Request,
            resource: self.profile.input,
            ts,
        };
        for &peer in &self.profile.class_peers {
            self.mesh.send(peer, request)?;
        }
        self.clock.advance();
        Ok(())
    }

    fn release(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.tally.reset();
        self.queue.consume(self.profile.rank);

        let consume = ProtocolMessage {
            kind: MessageKind::Consume,
            resource: self.profile.input,
            ts: self.clock.current(),
        };
        for &peer in &self.profile.class_peers {
            self.mesh.send(peer, consume)?;
        }
        self.clock.advance();

        let produce = ProtocolMessage {
            kind: MessageKind::Produce,
            resource: self.profile.output,
            ts: self.clock.current(),
        };
        for &peer in &self.profile.other_class {
            self.mesh.send(peer, produce)?;
        }
        self.clock.advance();
        Ok(())
    }

    fn send_ack(&mut self, peer: usize) -> Result<(), Box<dyn Error + Send + Sync>> {
        let ack = ProtocolMessage {
            kind: MessageKind::Ack,
            resource: self.profile.input,
            ts: self.clock.current(),
        };
        self.mesh.send(peer, ack)?;
        self.clock.advance();
        Ok(())
    }

    fn transition(&mut self, next: Phase) {
        self.lifecycle.advance(next);
        log::state(
            self.profile.class_letter(),
            self.profile.rank,
            self.clock.current(),
            next.name(),
        );
        if let Some(events) = &self.events {
            let _ = events.send(Transition {
                rank: self.profile.rank,
                phase: next,
                clock: self.clock.current(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwell::DwellSampler;
    use crate::message::Resource;
    use crate::role::RoleMap;

    fn producer(rank: usize, world: usize, producers: usize, available: usize) -> (Crafter, Vec<Mesh>) {
        let roles = RoleMap::assign(world, producers, world - producers);
        let mut meshes = Mesh::local(world);
        let mesh = meshes.remove(rank);
        let profile = Profile::new(rank, &roles).unwrap();
        let lifecycle = Lifecycle::new(DwellSampler::from_seed(60.0, 60.0, &[rank as u8; 32]));
        (Crafter::new(profile, available, lifecycle, mesh), meshes)
    }

    fn message(kind: MessageKind, resource: Resource, ts: u64) -> ProtocolMessage {
        ProtocolMessage { kind, resource, ts }
    }

    fn next_kind(mesh: &mut Mesh) -> Option<MessageKind> {
        mesh.try_recv().map(|(_, m)| m.kind)
    }

    #[test]
    fn concurrent_requests_grant_up_to_capacity_in_rank_order() {
        // four producers, capacity two, all requests at the same
        // timestamp: only the two lowest ranks get granted
        let (mut crafter, mut peers) = producer(0, 5, 4, 2);

        crafter.handle(1, message(MessageKind::Request, Resource::Slot, 5)).unwrap();
        crafter.handle(2, message(MessageKind::Request, Resource::Slot, 5)).unwrap();
        crafter.handle(3, message(MessageKind::Request, Resource::Slot, 5)).unwrap();

        assert_eq!(next_kind(&mut peers[0]), Some(MessageKind::Ack));
        assert_eq!(next_kind(&mut peers[1]), Some(MessageKind::Ack));
        assert_eq!(next_kind(&mut peers[2]), None);

        // rank 1 takes its unit: the window shrinks in step, rank 3
        // still waits
        crafter.handle(1, message(MessageKind::Consume, Resource::Slot, 9)).unwrap();
        assert_eq!(next_kind(&mut peers[2]), None);

        // the other class regenerates a unit: the window reaches rank 3
        crafter.handle(4, message(MessageKind::Produce, Resource::Slot, 11)).unwrap();
        assert_eq!(next_kind(&mut peers[2]), Some(MessageKind::Ack));
    }

    #[test]
    fn produce_can_grant_our_own_pending_request() {
        let (mut crafter, mut peers) = producer(0, 3, 2, 0);

        // no capacity: our own request stays ungranted
        crafter.broadcast_request().unwrap();
        assert_eq!(next_kind(&mut peers[0]), Some(MessageKind::Request));
        assert!(!crafter.queue().ack_sent(0));

        crafter.handle(2, message(MessageKind::Produce, Resource::Slot, 4)).unwrap();
        assert!(crafter.queue().ack_sent(0));

        // with the peer's ack the request is fully granted
        crafter.handle(1, message(MessageKind::Ack, Resource::Slot, 6)).unwrap();
        assert!(crafter.tally_complete());
    }

    #[test]
    fn request_broadcast_shares_one_timestamp_with_the_own_entry() {
        let (mut crafter, mut peers) = producer(0, 3, 2, 1);

        crafter.handle(1, message(MessageKind::Request, Resource::Slot, 0)).unwrap();
        let before = crafter.clock_value();
        crafter.broadcast_request().unwrap();

        // peer 1 already got an ack; the request follows with the
        // pre-broadcast clock value, bumped once afterwards
        assert_eq!(next_kind(&mut peers[0]), Some(MessageKind::Ack));
        let (_, request) = peers[0].try_recv().unwrap();
        assert_eq!(request.ts, before);
        assert_eq!(crafter.clock_value(), before + 1);
    }

    #[test]
    #[should_panic(expected = "no pending REQUEST")]
    fn consume_from_a_silent_peer_aborts() {
        let (mut crafter, _peers) = producer(0, 3, 2, 1);
        crafter.handle(1, message(MessageKind::Consume, Resource::Slot, 3)).unwrap();
    }

    #[test]
    #[should_panic(expected = "does not track")]
    fn message_about_the_wrong_resource_aborts() {
        let (mut crafter, _peers) = producer(0, 3, 2, 1);
        crafter.handle(1, message(MessageKind::Request, Resource::Artifact, 3)).unwrap();
    }

    impl Crafter {
        fn tally_complete(&self) -> bool {
            self.tally.complete()
        }

        fn clock_value(&self) -> u64 {
            self.clock.current()
        }
    }
}
