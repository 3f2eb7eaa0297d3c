use std::collections::HashMap;

pub struct AckTally {
    received: HashMap<usize, bool>,
    count: usize,
    self_granted: bool,
}

impl AckTally {
    // peers is the same-class peer set, self excluded
    pub fn new(peers: &[usize]) -> Self {
        Self {
            received: peers.iter().map(|p| (*p, false)).collect(),
            count: 0,
            self_granted: false,
        }
    }

    pub fn record(&mut self, rank: usize) {
        let received = match self.received.get_mut(&rank) {
            Some(received) => received,
            None => panic!("ACK from rank {rank}, which is not in the class"),
        };
        assert!(!*received, "duplicate ACK from rank {rank}");
        *received = true;
        self.count += 1;
    }

    pub fn record_self(&mut self) {
        assert!(!self.self_granted, "own request granted twice");
        self.self_granted = true;
    }

    pub fn complete(&self) -> bool {
        self.self_granted && self.count == self.received.len()
    }

    pub fn reset(&mut self) {
        for received in self.received.values_mut() {
            *received = false;
        }
        self.count = 0;
        self.self_granted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_needs_every_peer_and_self() {
        let mut tally = AckTally::new(&[1, 2]);
        assert!(!tally.complete());
        tally.record(1);
        tally.record(2);
        assert!(!tally.complete());
        tally.record_self();
        assert!(tally.complete());
    }

    #[test]
    fn lone_member_completes_on_self_grant() {
        let mut tally = AckTally::new(&[]);
        assert!(!tally.complete());
        tally.record_self();
        assert!(tally.complete());
    }

    #[test]
    fn reset_starts_a_fresh_round() {
        let mut tally = AckTally::new(&[1]);
        tally.record(1);
        tally.record_self();
        assert!(tally.complete());
        tally.reset();
        assert!(!tally.complete());
        tally.record(1);
        tally.record_self();
        assert!(tally.complete());
    }

    #[test]
    #[should_panic(expected = "duplicate ACK")]
    fn duplicate_ack_aborts() {
        let mut tally = AckTally::new(&[1]);
        tally.record(1);
        tally.record(1);
    }

    #[test]
    #[should_panic(expected = "not in the class")]
    fn ack_from_outside_the_class_aborts() {
        let mut tally = AckTally::new(&[1]);
        tally.record(7);
    }
}
