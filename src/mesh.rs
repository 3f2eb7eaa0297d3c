use crate::log;
use crate::message::{Hello, ProtocolMessage};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::sleep;
use tokio_util::codec::{Framed, LinesCodec};

// tagged with the local rank so in-process wiring needs no handshake
struct Link {
    from: usize,
    tx: UnboundedSender<(usize, ProtocolMessage)>,
}

// TCP keeps each pair's traffic reliable and in order, and one channel
// per direction preserves that order through the bridge tasks
pub struct Mesh {
    rank: usize,
    size: usize,
    links: HashMap<usize, Link>,
    inbound: UnboundedReceiver<(usize, ProtocolMessage)>,
}

impl Mesh {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn send(
        &self,
        dest: usize,
        message: ProtocolMessage,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let link = self
            .links
            .get(&dest)
            .ok_or_else(|| format!("no link to rank {dest}"))?;
        link.tx
            .send((link.from, message))
            .map_err(|_| format!("link to rank {dest} is down"))?;
        Ok(())
    }

    pub fn try_recv(&mut self) -> Option<(usize, ProtocolMessage)> {
        self.inbound.try_recv().ok()
    }

    pub fn local(size: usize) -> Vec<Mesh> {
        let mut inboxes = Vec::with_capacity(size);
        for _ in 0..size {
            inboxes.push(mpsc::unbounded_channel());
        }
        let txs: Vec<_> = inboxes.iter().map(|(tx, _)| tx.clone()).collect();
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, (_, inbound))| Mesh {
                rank,
                size,
                links: txs
                    .iter()
                    .enumerate()
                    .filter(|(dest, _)| *dest != rank)
                    .map(|(dest, tx)| (dest, Link { from: rank, tx: tx.clone() }))
                    .collect(),
                inbound,
            })
            .collect()
    }

    pub async fn connect(
        rank: usize,
        addrs: &[String],
    ) -> Result<Mesh, Box<dyn Error + Send + Sync>> {
        let listener = TcpListener::bind(&addrs[rank]).await?;
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        tokio::spawn(Self::accept_loop(listener, inbound_tx));

        let mut links = HashMap::new();
        for (dest, addr) in addrs.iter().enumerate() {
            if dest == rank {
                continue;
            }
            // peers that are not up yet are retried inside dial
            let stream = Self::dial(addr).await;
            let mut lines = Framed::new(stream, LinesCodec::new());
            lines.send(Hello { rank }.to_json_string()?).await?;
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(Self::write_loop(dest, lines, rx));
            links.insert(dest, Link { from: rank, tx });
        }

        Ok(Mesh {
            rank,
            size: addrs.len(),
            links,
            inbound,
        })
    }

    async fn dial(addr: &str) -> TcpStream {
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => return stream,
                Err(_) => sleep(Duration::from_millis(100)).await,
            }
        }
    }

    async fn write_loop(
        dest: usize,
        mut lines: Framed<TcpStream, LinesCodec>,
        mut rx: UnboundedReceiver<(usize, ProtocolMessage)>,
    ) {
        while let Some((_, message)) = rx.recv().await {
            let line = match message.to_json_string() {
                Ok(line) => line,
                Err(_) => {
                    log::error(&format!("Couldn't encode a message for rank {dest}."));
                    return;
                }
            };
            if lines.send(line).await.is_err() {
                log::error(&format!("Couldn't send a message to rank {dest}."));
                return;
            }
        }
    }

    async fn accept_loop(
        listener: TcpListener,
        inbound_tx: UnboundedSender<(usize, ProtocolMessage)>,
    ) {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(connection) => connection,
                Err(_) => continue,
            };
            tokio::spawn(Self::read_loop(stream, inbound_tx.clone()));
        }
    }

    async fn read_loop(stream: TcpStream, inbound_tx: UnboundedSender<(usize, ProtocolMessage)>) {
        let mut lines = Framed::new(stream, LinesCodec::new());

        let peer = match lines.next().await {
            Some(Ok(line)) => match Hello::from_json_string(&line) {
                Ok(hello) => hello.rank,
                Err(_) => {
                    log::error("A connection opened without a hello frame.");
                    return;
                }
            },
            _ => {
                log::error("A connection closed before the hello frame.");
                return;
            }
        };

        while let Some(Ok(line)) = lines.next().await {
            match ProtocolMessage::from_json_string(&line) {
                Ok(message) => {
                    if inbound_tx.send((peer, message)).is_err() {
                        return;
                    }
                }
                Err(_) => {
                    // the protocol assumes a reliable transport; a frame
                    // we cannot parse means that assumption broke
                    log::error(&format!("Malformed frame from rank {peer}."));
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, Resource};

    fn request(ts: u64) -> ProtocolMessage {
        ProtocolMessage {
            kind: MessageKind::Request,
            resource: Resource::Slot,
            ts,
        }
    }

    #[test]
    fn local_mesh_delivers_in_send_order_per_pair() {
        let mut meshes = Mesh::local(3);
        let mut receiver = meshes.remove(2);
        let (a, b) = (meshes.remove(0), meshes.remove(0));

        a.send(2, request(1)).unwrap();
        a.send(2, request(2)).unwrap();
        b.send(2, request(7)).unwrap();

        let (from, first) = receiver.try_recv().unwrap();
        assert_eq!((from, first.ts), (0, 1));
        let (from, second) = receiver.try_recv().unwrap();
        assert_eq!((from, second.ts), (0, 2));
        let (from, third) = receiver.try_recv().unwrap();
        assert_eq!((from, third.ts), (1, 7));
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn there_is_no_link_to_self() {
        let meshes = Mesh::local(2);
        assert!(meshes[0].send(0, request(1)).is_err());
    }
}
