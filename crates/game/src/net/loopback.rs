//! In-memory transport pair for running both nodes in one process.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use bytes::Bytes;

use super::transport::{Transport, TransportError, TransportKind};

#[derive(Debug, Default)]
struct Shared {
    to_first: RefCell<VecDeque<Bytes>>,
    to_second: RefCell<VecDeque<Bytes>>,
    open: Cell<bool>,
}

#[derive(Debug)]
pub struct LoopbackTransport {
    shared: Rc<Shared>,
    first: bool,
    kind: TransportKind,
}

impl LoopbackTransport {
    /// Two connected ends; bytes sent on one are received on the other.
    pub fn pair(kind: TransportKind) -> (Self, Self) {
        let shared = Rc::new(Shared {
            open: Cell::new(true),
            ..Default::default()
        });
        (
            Self {
                shared: Rc::clone(&shared),
                first: true,
                kind,
            },
            Self {
                shared,
                first: false,
                kind,
            },
        )
    }

    /// Drops the connection for both ends. Already queued bytes can still be
    /// read before the peer sees the disconnect.
    pub fn close(&self) {
        self.shared.open.set(false);
    }

    pub fn in_flight(&self) -> usize {
        self.outbox().borrow().len()
    }

    fn inbox(&self) -> &RefCell<VecDeque<Bytes>> {
        if self.first {
            &self.shared.to_first
        } else {
            &self.shared.to_second
        }
    }

    fn outbox(&self) -> &RefCell<VecDeque<Bytes>> {
        if self.first {
            &self.shared.to_second
        } else {
            &self.shared.to_first
        }
    }
}

impl Transport for LoopbackTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.shared.open.get() {
            return Err(TransportError::Disconnected);
        }
        self.outbox()
            .borrow_mut()
            .push_back(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.inbox().borrow_mut().pop_front() {
            Some(bytes) => Ok(Some(bytes)),
            None if self.shared.open.get() => Ok(None),
            None => Err(TransportError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_cross_to_the_other_end_in_order() {
        let (mut a, mut b) = LoopbackTransport::pair(TransportKind::Tcp);

        a.send(b"one").unwrap();
        a.send(b"two").unwrap();
        assert_eq!(a.in_flight(), 2);

        assert_eq!(b.try_recv().unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(b.try_recv().unwrap().as_deref(), Some(&b"two"[..]));
        assert_eq!(b.try_recv().unwrap(), None);
        assert_eq!(a.try_recv().unwrap(), None);
    }

    #[test]
    fn close_is_seen_after_queued_bytes_drain() {
        let (mut a, mut b) = LoopbackTransport::pair(TransportKind::Udp);
        a.send(b"last").unwrap();
        a.close();

        assert!(b.try_recv().unwrap().is_some());
        assert!(matches!(b.try_recv(), Err(TransportError::Disconnected)));
        assert!(matches!(a.send(b"x"), Err(TransportError::Disconnected)));
    }
}
