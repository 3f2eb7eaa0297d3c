use crate::message::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
    // ranks past both classes run no protocol
    Observer,
}

#[derive(Debug, Clone)]
pub struct RoleMap {
    pub producers: Vec<usize>,
    pub consumers: Vec<usize>,
    pub size: usize,
}

impl RoleMap {
    pub fn assign(size: usize, max_producers: usize, max_consumers: usize) -> Self {
        let wp = max_producers.min(size);
        let wc = (size - wp).min(max_consumers);
        Self {
            producers: (0..wp).collect(),
            consumers: (wp..wp + wc).collect(),
            size,
        }
    }

    pub fn role_of(&self, rank: usize) -> Role {
        if self.producers.contains(&rank) {
            Role::Producer
        } else if self.consumers.contains(&rank) {
            Role::Consumer
        } else {
            Role::Observer
        }
    }
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub rank: usize,
    pub role: Role,
    pub input: Resource,
    pub output: Resource,
    // same class, self excluded
    pub class_peers: Vec<usize>,
    pub other_class: Vec<usize>,
}

impl Profile {
    pub fn new(rank: usize, roles: &RoleMap) -> Option<Self> {
        let role = roles.role_of(rank);
        let (input, same, other) = match role {
            Role::Producer => (Resource::Slot, &roles.producers, &roles.consumers),
            Role::Consumer => (Resource::Artifact, &roles.consumers, &roles.producers),
            Role::Observer => return None,
        };
        Some(Self {
            rank,
            role,
            input,
            output: input.counterpart(),
            class_peers: same.iter().copied().filter(|p| *p != rank).collect(),
            other_class: other.clone(),
        })
    }

    pub fn class_letter(&self) -> char {
        match self.role {
            Role::Producer => 'P',
            Role::Consumer => 'C',
            Role::Observer => '-',
        }
    }

    pub fn role_name(&self) -> &'static str {
        match self.role {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
            Role::Observer => "observer",
        }
    }
}
