use bytes::Bytes;
use std::collections::VecDeque;

/// A reliability protocol layered over datagrams (KCP and the like).
///
/// The session feeds it raw datagrams and pulls ordered stream bytes out.
/// Datagrams it wants on the wire are collected with `poll_transmit`.
pub trait Reliability: Send {
    /// Feed one received datagram.
    fn input(&mut self, datagram: &[u8]);

    /// Next chunk of reassembled, in-order stream bytes.
    fn receive(&mut self) -> Option<Bytes>;

    /// Queue application bytes for reliable delivery.
    fn send(&mut self, data: &[u8]);

    /// Drive timers. Called every update tick with a wrapping millisecond
    /// clock.
    fn update(&mut self, now_millis: u32);

    /// Next datagram to put on the wire.
    fn poll_transmit(&mut self) -> Option<Bytes>;
}

/// Datagram payload size `Passthrough` splits sends into.
pub const DEFAULT_MTU: usize = 1400;

/// No acknowledgements and no retransmission: every datagram is delivered
/// as it arrives. Only correct on links that never drop or reorder, such as
/// loopback.
#[derive(Debug)]
pub struct Passthrough {
    mtu: usize,
    inbound: VecDeque<Bytes>,
    outbound: VecDeque<Bytes>,
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::with_mtu(DEFAULT_MTU)
    }
}

impl Passthrough {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mtu(mtu: usize) -> Self {
        Self { mtu: mtu.max(1), inbound: VecDeque::new(), outbound: VecDeque::new() }
    }
}

impl Reliability for Passthrough {
    fn input(&mut self, datagram: &[u8]) {
        if !datagram.is_empty() {
            self.inbound.push_back(Bytes::copy_from_slice(datagram));
        }
    }

    fn receive(&mut self) -> Option<Bytes> {
        self.inbound.pop_front()
    }

    fn send(&mut self, data: &[u8]) {
        for chunk in data.chunks(self.mtu) {
            self.outbound.push_back(Bytes::copy_from_slice(chunk));
        }
    }

    fn update(&mut self, _now_millis: u32) {}

    fn poll_transmit(&mut self) -> Option<Bytes> {
        self.outbound.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_splits_by_mtu() {
        let mut link = Passthrough::with_mtu(4);
        link.send(b"abcdefghij");
        let sent: Vec<Bytes> = std::iter::from_fn(|| link.poll_transmit()).collect();
        assert_eq!(sent, vec![&b"abcd"[..], &b"efgh"[..], &b"ij"[..]]);
    }

    #[test]
    fn test_input_is_delivered_in_order() {
        let mut link = Passthrough::new();
        link.input(b"one");
        link.input(b"");
        link.input(b"two");
        assert_eq!(link.receive().as_deref(), Some(&b"one"[..]));
        assert_eq!(link.receive().as_deref(), Some(&b"two"[..]));
        assert!(link.receive().is_none());
    }
}
