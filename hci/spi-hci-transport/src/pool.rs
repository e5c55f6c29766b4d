//! Packet buffers and the queues they move between
//!
//! The buffers are allocated once within an arena of `N` slots and are never allocated or freed
//! afterwards. A buffer is identified by the index of its slot and the queues are intrusive lists
//! of these indexes, so moving a buffer from one queue to another is only a matter of relinking.
//!
//! # Ownership
//! Every buffer is owned by exactly one of
//! * the free pool
//! * the ready queue
//! * a side queue local to a synchronous request
//! * a [`Packet`] handle (the buffer is "in flight" while it is read into or dispatched)
//!
//! A `Packet` is only created by removing an index from a queue and is consumed when it is put
//! back into one. Because it is neither `Clone` nor `Copy` there is never more than one handle to
//! a slot, and access to the bytes of a slot goes through the handle.

use core::cell::UnsafeCell;
use core::fmt;

/// The size of a packet buffer
///
/// This is the largest HCI packet (including the packet indicator) that the transport will read
/// from the link.
pub const HCI_READ_PACKET_SIZE: usize = 128;

/// The default number of packet buffers
pub const DEFAULT_POOL_SIZE: usize = 5;

/// A fixed size buffer for a single HCI packet
pub struct PacketBuffer {
    data: [u8; HCI_READ_PACKET_SIZE],
    len: usize,
}

impl PacketBuffer {
    pub const CAPACITY: usize = HCI_READ_PACKET_SIZE;

    const fn new() -> Self {
        PacketBuffer {
            data: [0; HCI_READ_PACKET_SIZE],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the packet bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Get the entire storage of the buffer for reading a frame into it
    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Set the number of valid bytes, this is clamped to the capacity
    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = core::cmp::min(len, Self::CAPACITY);
    }
}

impl fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketBuffer").field("data", &self.as_slice()).finish()
    }
}

/// Handle to a buffer that is not within any queue
#[must_use = "a packet must be returned to a queue or its buffer is lost"]
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Packet(usize);

impl Packet {
    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

/// The storage for all packet buffers
pub(crate) struct Slots<const N: usize> {
    buffers: [UnsafeCell<PacketBuffer>; N],
}

// SAFETY: a slot is only ever accessed through the single `Packet` handle for its index.
unsafe impl<const N: usize> Sync for Slots<N> {}

impl<const N: usize> Slots<N> {
    pub(crate) fn new() -> Self {
        Slots {
            buffers: core::array::from_fn(|_| UnsafeCell::new(PacketBuffer::new())),
        }
    }

    pub(crate) fn get<'a>(&'a self, packet: &'a Packet) -> &'a PacketBuffer {
        // SAFETY: `packet` is the only handle to this slot and it is borrowed for the lifetime of
        // the returned reference.
        unsafe { &*self.buffers[packet.0].get() }
    }

    #[allow(clippy::mut_from_ref)]
    pub(crate) fn get_mut<'a>(&'a self, packet: &'a mut Packet) -> &'a mut PacketBuffer {
        // SAFETY: `packet` is the only handle to this slot and it is mutably borrowed for the
        // lifetime of the returned reference.
        unsafe { &mut *self.buffers[packet.0].get() }
    }
}

/// Error from an operation on the queues
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PoolError {
    /// There is no free packet buffer
    PoolExhausted,
    /// There is no packet within the ready queue
    QueueEmpty,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::PoolExhausted => f.write_str("no free packet buffers"),
            PoolError::QueueEmpty => f.write_str("ready queue is empty"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PoolError {}

/// A snapshot of where the packet buffers are
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PoolStatus {
    /// Buffers within the free pool
    pub free: usize,
    /// Buffers waiting within the ready queue
    pub ready: usize,
    /// Total number of buffers
    pub capacity: usize,
}

impl PoolStatus {
    /// Buffers that are neither free nor ready
    pub fn in_flight(&self) -> usize {
        self.capacity - self.free - self.ready
    }
}

#[derive(Copy, Clone, Default)]
struct Node {
    prev: Option<usize>,
    next: Option<usize>,
}

/// An intrusive list of slot indexes
///
/// The links of a list are stored within the nodes of [`Queues`], so a `List` is only meaningful
/// together with the `Queues` it was used with.
#[derive(Default, Debug)]
pub(crate) struct List {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl List {
    pub(crate) const fn new() -> Self {
        List {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push_front(&mut self, nodes: &mut [Node], index: usize) {
        nodes[index] = Node {
            prev: None,
            next: self.head,
        };

        match self.head {
            Some(head) => nodes[head].prev = Some(index),
            None => self.tail = Some(index),
        }

        self.head = Some(index);
        self.len += 1;
    }

    fn push_back(&mut self, nodes: &mut [Node], index: usize) {
        nodes[index] = Node {
            prev: self.tail,
            next: None,
        };

        match self.tail {
            Some(tail) => nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }

        self.tail = Some(index);
        self.len += 1;
    }

    fn pop_front(&mut self, nodes: &mut [Node]) -> Option<usize> {
        let index = self.head?;

        self.head = nodes[index].next;

        match self.head {
            Some(head) => nodes[head].prev = None,
            None => self.tail = None,
        }

        nodes[index] = Node::default();
        self.len -= 1;

        Some(index)
    }

    fn pop_back(&mut self, nodes: &mut [Node]) -> Option<usize> {
        let index = self.tail?;

        self.tail = nodes[index].prev;

        match self.tail {
            Some(tail) => nodes[tail].next = None,
            None => self.head = None,
        }

        nodes[index] = Node::default();
        self.len -= 1;

        Some(index)
    }

    fn iter<'a>(&self, nodes: &'a [Node]) -> impl Iterator<Item = usize> + 'a {
        let mut current = self.head;

        core::iter::from_fn(move || {
            let index = current?;

            current = nodes[index].next;

            Some(index)
        })
    }
}

/// The free pool and the ready queue
///
/// This must only be accessed within the exclusion region of the transport.
pub(crate) struct Queues<const N: usize> {
    nodes: [Node; N],
    pool: List,
    ready: List,
}

impl<const N: usize> Queues<N> {
    /// Create the queues with every buffer within the free pool
    pub(crate) fn new() -> Self {
        let mut queues = Queues {
            nodes: [Node::default(); N],
            pool: List::new(),
            ready: List::new(),
        };

        for index in 0..N {
            queues.pool.push_back(&mut queues.nodes, index);
        }

        queues
    }

    /// Take the buffer at the head of the free pool
    pub(crate) fn acquire(&mut self) -> Result<Packet, PoolError> {
        self.pool
            .pop_front(&mut self.nodes)
            .map(Packet)
            .ok_or(PoolError::PoolExhausted)
    }

    /// Put a buffer at the head of the free pool
    ///
    /// The most recently freed buffer is the next one to be acquired.
    pub(crate) fn release(&mut self, packet: Packet) {
        self.pool.push_front(&mut self.nodes, packet.0)
    }

    /// Put a buffer at the tail of the ready queue
    pub(crate) fn enqueue_ready(&mut self, packet: Packet) {
        self.ready.push_back(&mut self.nodes, packet.0)
    }

    /// Take the buffer at the head of the ready queue
    pub(crate) fn dequeue_ready(&mut self) -> Result<Packet, PoolError> {
        self.ready
            .pop_front(&mut self.nodes)
            .map(Packet)
            .ok_or(PoolError::QueueEmpty)
    }

    /// Put a buffer at the tail of a side queue
    pub(crate) fn divert(&mut self, side: &mut List, packet: Packet) {
        side.push_back(&mut self.nodes, packet.0)
    }

    /// Move every buffer of a side queue to the front of the ready queue
    ///
    /// The buffers keep the order they had within the side queue and are ahead of every buffer
    /// that was already in the ready queue.
    pub(crate) fn restore(&mut self, side: &mut List) {
        while let Some(index) = side.pop_back(&mut self.nodes) {
            self.ready.push_front(&mut self.nodes, index)
        }
    }

    pub(crate) fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub(crate) fn pool_is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub(crate) fn ready_is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub(crate) fn status(&self) -> PoolStatus {
        PoolStatus {
            free: self.pool.len(),
            ready: self.ready.len(),
            capacity: N,
        }
    }

    /// Check that every buffer is owned exactly once
    ///
    /// `others` are the side queues and `in_flight` the indexes of outstanding `Packet`s.
    #[cfg(test)]
    pub(crate) fn owned_exactly_once(&self, others: &[&List], in_flight: &[usize]) -> bool {
        let mut seen = [0usize; N];

        let lists = [&self.pool, &self.ready].into_iter().chain(others.iter().copied());

        for list in lists {
            let mut count = 0;

            for index in list.iter(&self.nodes) {
                seen[index] += 1;
                count += 1;
            }

            if count != list.len() {
                return false;
            }
        }

        for index in in_flight {
            seen[*index] += 1;
        }

        seen.iter().all(|count| *count == 1)
    }

    /// The slot indexes of the ready queue from head to tail
    #[cfg(test)]
    pub(crate) fn ready_order(&self) -> alloc::vec::Vec<usize> {
        self.ready.iter(&self.nodes).collect()
    }
}
