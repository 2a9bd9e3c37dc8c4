use crate::base::neterror::{ErrorCode, NetError};
use crate::base::state::ConnectionState;
use crate::buffer::{BufferPool, BufferQueue, ByteBuffer};
use crate::socket::client::SocketType;
use crate::socket::config::ConnectionConfig;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};

type Callback = Box<dyn FnMut() + Send>;

/// Notifications a connection raises from its update tick.
///
/// Every callback runs on the thread that calls [`Connection::update`] or
/// [`Connection::close`], never on an I/O task.
#[derive(Default)]
pub struct ConnectionEvents {
    connecting: Option<Callback>,
    connected: Option<Callback>,
    closed: Option<Box<dyn FnMut(ErrorCode) + Send>>,
    packet: Option<Box<dyn FnMut(&mut ByteBuffer) + Send>>,
}

impl ConnectionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a connect attempt starts.
    pub fn on_connecting(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.connecting = Some(Box::new(f));
        self
    }

    /// Called when the connection starts running.
    pub fn on_connected(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.connected = Some(Box::new(f));
        self
    }

    /// Called exactly once each time the connection reaches `Closed`, with
    /// the error that closed it (`ErrorCode::None` for a voluntary close).
    pub fn on_closed(mut self, f: impl FnMut(ErrorCode) + Send + 'static) -> Self {
        self.closed = Some(Box::new(f));
        self
    }

    /// Called once per received chunk, in arrival order. The buffer is
    /// released when the callback returns.
    pub fn on_packet(mut self, f: impl FnMut(&mut ByteBuffer) + Send + 'static) -> Self {
        self.packet = Some(Box::new(f));
        self
    }

    fn fire_connecting(&mut self) {
        if let Some(f) = self.connecting.as_mut() {
            f();
        }
    }

    fn fire_connected(&mut self) {
        if let Some(f) = self.connected.as_mut() {
            f();
        }
    }

    fn fire_closed(&mut self, code: ErrorCode) {
        if let Some(f) = self.closed.as_mut() {
            f(code);
        }
    }
}

impl std::fmt::Debug for ConnectionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEvents")
            .field("on_connecting", &self.connecting.is_some())
            .field("on_connected", &self.connected.is_some())
            .field("on_closed", &self.closed.is_some())
            .field("on_packet", &self.packet.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Transport {
    Tcp,
    Udp { local: SocketAddr },
}

struct Inner {
    state: ConnectionState,
    error: ErrorCode,
    last_error: ErrorCode,
    remote: Option<SocketAddr>,
    socket: Option<Arc<SocketType>>,
    /// Dropped on close to stop this run's I/O tasks
    shutdown: Option<watch::Sender<bool>>,
    /// Bumped on every close; I/O and connect tasks carry the epoch they
    /// were started in and go quiet once it moves on.
    epoch: u64,
}

/// State shared between the owner and the I/O tasks.
pub(super) struct Shared {
    inner: Mutex<Inner>,
    send_queue: BufferQueue,
    recv_queue: BufferQueue,
    wake: Notify,
    pool: BufferPool,
    config: ConnectionConfig,
    sent_bytes: AtomicU64,
    recv_bytes: AtomicU64,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    fn is_running(&self, epoch: u64) -> bool {
        let inner = self.inner.lock();
        inner.epoch == epoch && inner.state == ConnectionState::Running
    }

    fn remote(&self) -> Option<SocketAddr> {
        self.inner.lock().remote
    }

    /// Record `code` and request `Closing`. Ignored unless the connection
    /// is still in the run (or connect attempt) identified by `epoch`.
    pub(super) fn fail(&self, epoch: u64, code: ErrorCode) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return false;
        }
        let state = inner.state;
        if state.is_closing_or_closed() {
            return false;
        }
        tracing::debug!(state = %state, code = ?code, "connection failed");
        inner.error = code;
        inner.last_error = code;
        inner.state = ConnectionState::Closing;
        drop(inner);
        self.wake.notify_one();
        true
    }

    /// Change the default peer. Returns the state it was changed in.
    pub(super) fn set_remote(&self, remote: SocketAddr) -> ConnectionState {
        let mut inner = self.inner.lock();
        inner.remote = Some(remote);
        inner.state
    }

    /// Install a bound datagram socket and move to `Connected`.
    pub(super) fn bound(&self, socket: SocketType, remote: Option<SocketAddr>) {
        let mut inner = self.inner.lock();
        inner.socket = Some(Arc::new(socket));
        if remote.is_some() {
            inner.remote = remote;
        }
        inner.error = ErrorCode::None;
        inner.state = ConnectionState::Connected;
    }

    /// Install a freshly connected socket, unless the attempt went stale.
    pub(super) fn connected(&self, epoch: u64, socket: SocketType) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || inner.state != ConnectionState::Connecting {
            tracing::debug!("discarding stale connect");
            return false;
        }
        inner.socket = Some(Arc::new(socket));
        inner.state = ConnectionState::Connected;
        true
    }
}

/// A client connection over one TCP or UDP socket.
///
/// The owner drives the connection by calling [`update`](Self::update) at a
/// steady cadence. While running, a sender task and a receiver task move
/// data between the socket and two buffer queues; `update` never blocks on
/// I/O. See [`ConnectionState`] for the lifecycle.
pub struct Connection {
    shared: Arc<Shared>,
    events: ConnectionEvents,
    transport: Transport,
    runtime: Handle,
}

impl Connection {
    pub(super) fn new(
        pool: BufferPool,
        config: ConnectionConfig,
        transport: Transport,
    ) -> Result<Self, NetError> {
        let runtime = config.runtime_handle()?;
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: ConnectionState::Closed,
                error: ErrorCode::None,
                last_error: ErrorCode::None,
                remote: None,
                socket: None,
                shutdown: None,
                epoch: 0,
            }),
            send_queue: BufferQueue::new(),
            recv_queue: BufferQueue::new(),
            wake: Notify::new(),
            pool,
            config,
            sent_bytes: AtomicU64::new(0),
            recv_bytes: AtomicU64::new(0),
        });
        Ok(Self { shared, events: ConnectionEvents::default(), transport, runtime })
    }

    pub(super) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    pub(super) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Replace the notification handlers.
    pub fn set_events(&mut self, events: ConnectionEvents) {
        self.events = events;
    }

    /// Point the connection at `remote`.
    ///
    /// TCP starts a fresh connect, closing any previous socket first. UDP
    /// changes the default peer, re-binding first if the connection was
    /// closed.
    pub fn set_remote_endpoint(&mut self, remote: SocketAddr) -> Result<(), NetError> {
        match self.transport {
            Transport::Tcp => {
                self.begin_connect(remote);
                Ok(())
            }
            Transport::Udp { local } => self.retarget(local, remote),
        }
    }

    /// Re-establish the connection to the current remote endpoint.
    pub fn reconnect(&mut self) -> Result<(), NetError> {
        match self.transport {
            Transport::Tcp => {
                let remote = self.remote_addr().ok_or(NetError::Unreachable)?;
                self.begin_connect(remote);
                Ok(())
            }
            Transport::Udp { local } => {
                if self.state() == ConnectionState::Closed {
                    self.rebind(local)?;
                }
                Ok(())
            }
        }
    }

    /// Run one tick: promote, deliver received data, or tear down.
    ///
    /// Returns the number of received chunks delivered to `on_packet`.
    pub fn update(&mut self) -> usize {
        self.tick(None)
    }

    /// Like [`update`](Self::update) but delivers received chunks to
    /// `handler` instead of the stored `on_packet` callback.
    pub fn update_with(&mut self, handler: &mut dyn FnMut(&mut ByteBuffer)) -> usize {
        self.tick(Some(handler))
    }

    fn tick(&mut self, handler: Option<&mut dyn FnMut(&mut ByteBuffer)>) -> usize {
        match self.state() {
            ConnectionState::Connected => {
                self.start();
                0
            }
            ConnectionState::Running => {
                let mut batch = Vec::new();
                let count = self.shared.recv_queue.transfer_to(&mut batch);
                // Each buffer is released as soon as its callback returns,
                // and the rest of the batch is released if one panics.
                match handler {
                    Some(handler) => {
                        for mut buf in batch {
                            handler(&mut buf);
                        }
                    }
                    None => {
                        if let Some(f) = self.events.packet.as_mut() {
                            for mut buf in batch {
                                f(&mut buf);
                            }
                        }
                    }
                }
                count
            }
            ConnectionState::Closing => {
                self.close();
                0
            }
            ConnectionState::Closed | ConnectionState::Connecting => 0,
        }
    }

    /// `Connected -> Running`: spawn the I/O tasks.
    fn start(&mut self) {
        let (socket, shutdown, epoch) = {
            let mut inner = self.shared.inner.lock();
            if inner.state != ConnectionState::Connected {
                return;
            }
            let Some(socket) = inner.socket.clone() else {
                inner.error = ErrorCode::ConnectionError;
                inner.last_error = ErrorCode::ConnectionError;
                inner.state = ConnectionState::Closing;
                return;
            };
            let (tx, rx) = watch::channel(false);
            inner.shutdown = Some(tx);
            inner.state = ConnectionState::Running;
            (socket, rx, inner.epoch)
        };

        // Leftovers from a previous run.
        self.shared.recv_queue.clear();

        self.runtime.spawn(receive_loop(
            Arc::clone(&self.shared),
            Arc::clone(&socket),
            shutdown.clone(),
            epoch,
        ));
        self.runtime.spawn(send_loop(Arc::clone(&self.shared), socket, shutdown, epoch));

        tracing::debug!(remote = ?self.remote_addr(), "connection running");
        self.events.fire_connected();
    }

    /// Begin a TCP connect to `remote`.
    fn begin_connect(&mut self, remote: SocketAddr) {
        self.close();
        let epoch = {
            let mut inner = self.shared.inner.lock();
            inner.remote = Some(remote);
            inner.error = ErrorCode::None;
            inner.state = ConnectionState::Connecting;
            inner.epoch
        };
        tracing::debug!(remote = %remote, "connecting");
        self.events.fire_connecting();
        self.spawn_connect(remote, epoch);
    }

    /// Queue a buffer for transmission and wake the sender.
    ///
    /// Accepted in every state. Buffers queued before the connection runs,
    /// including while `Closed`, are transmitted once it does; use
    /// [`clear`](Self::clear) to discard them instead.
    pub fn send(&self, buf: ByteBuffer) {
        self.shared.send_queue.push_back(buf);
        self.shared.wake.notify_one();
    }

    /// Copy `data` into a pooled buffer and send it.
    pub fn send_bytes(&self, data: &[u8]) -> Result<(), NetError> {
        let mut buf = self.shared.pool.alloc(data.len())?;
        buf.write_bytes(data)?;
        self.send(buf);
        Ok(())
    }

    /// Record a protocol error and request `Closing`.
    pub fn abort(&self, code: ErrorCode) {
        let epoch = self.shared.inner.lock().epoch;
        self.shared.fail(epoch, code);
    }

    /// Tear the connection down. A no-op when already `Closed`.
    ///
    /// Stops the I/O tasks, shuts the socket, releases every undelivered
    /// received buffer and fires `on_closed`. Queued outbound buffers are
    /// kept; see [`clear`](Self::clear).
    pub fn close(&mut self) {
        let (socket, shutdown, code) = {
            let mut inner = self.shared.inner.lock();
            if inner.state == ConnectionState::Closed {
                return;
            }
            let code = inner.error;
            inner.state = ConnectionState::Closed;
            inner.epoch += 1;
            inner.last_error = code;
            inner.error = ErrorCode::None;
            (inner.socket.take(), inner.shutdown.take(), code)
        };

        drop(shutdown);
        if let Some(socket) = socket {
            socket.shutdown();
        }
        let released = self.shared.recv_queue.clear();

        tracing::debug!(code = ?code, released, "connection closed");
        self.events.fire_closed(code);
    }

    /// Release every buffer still waiting to be sent.
    pub fn clear(&self) -> usize {
        self.shared.send_queue.clear()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ConnectionState::Running
    }

    /// Error of the current run. Reset to `None` by `close`.
    pub fn error(&self) -> ErrorCode {
        self.shared.inner.lock().error
    }

    /// Error that ended the most recent run; survives `close`.
    pub fn last_error(&self) -> ErrorCode {
        self.shared.inner.lock().last_error
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.shared.remote()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        let socket = self.shared.inner.lock().socket.clone()?;
        socket.local_addr().ok()
    }

    pub fn sent_bytes(&self) -> u64 {
        self.shared.sent_bytes.load(Ordering::Relaxed)
    }

    pub fn recv_bytes(&self) -> u64 {
        self.shared.recv_bytes.load(Ordering::Relaxed)
    }

    /// Buffers queued but not yet handed to the sender.
    pub fn pending_sends(&self) -> usize {
        self.shared.send_queue.len()
    }

    /// Received chunks waiting for the next update tick.
    pub fn pending_receives(&self) -> usize {
        self.shared.recv_queue.len()
    }

    pub fn pool(&self) -> &BufferPool {
        &self.shared.pool
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    pub fn is_datagram(&self) -> bool {
        matches!(self.transport, Transport::Udp { .. })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("transport", &self.transport)
            .field("state", &self.state())
            .field("remote", &self.remote_addr())
            .field("pending_sends", &self.pending_sends())
            .finish()
    }
}

async fn receive_loop(
    shared: Arc<Shared>,
    socket: Arc<SocketType>,
    mut shutdown: watch::Receiver<bool>,
    epoch: u64,
) {
    let size = shared.config.scratch_size(socket.recv_buffer_size().ok(), shared.pool.max_capacity());
    let mut scratch = vec![0u8; size];

    loop {
        let result = tokio::select! {
            _ = shutdown.changed() => return,
            result = socket.recv(&mut scratch) => result,
        };

        let n = match result {
            Ok(0) => {
                shared.fail(epoch, ErrorCode::Aborted);
                return;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "receive failed");
                shared.fail(epoch, ErrorCode::from(&e));
                return;
            }
        };

        if !shared.is_running(epoch) {
            return;
        }
        shared.recv_bytes.fetch_add(n as u64, Ordering::Relaxed);
        if shared.config.debug {
            tracing::trace!(bytes = n, "received");
        }

        let buf = shared.pool.alloc(n).and_then(|mut buf| {
            buf.write_bytes(&scratch[..n])?;
            Ok(buf)
        });
        match buf {
            Ok(buf) => shared.recv_queue.push_back(buf),
            Err(e) => {
                tracing::debug!(error = %e, "receive allocation failed");
                shared.fail(epoch, ErrorCode::ConnectionError);
                return;
            }
        }
    }
}

async fn send_loop(
    shared: Arc<Shared>,
    socket: Arc<SocketType>,
    mut shutdown: watch::Receiver<bool>,
    epoch: u64,
) {
    loop {
        while let Some(buf) = shared.send_queue.pop() {
            if !send_one(&shared, &socket, &mut shutdown, epoch, buf).await {
                return;
            }
        }
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = shared.wake.notified() => {}
        }
    }
}

/// Transmit one buffer completely. On any stop the buffer goes back to the
/// head of the send queue and `false` is returned.
async fn send_one(
    shared: &Shared,
    socket: &SocketType,
    shutdown: &mut watch::Receiver<bool>,
    epoch: u64,
    mut buf: ByteBuffer,
) -> bool {
    while buf.is_readable() {
        if !shared.is_running(epoch) {
            shared.send_queue.push_front(buf);
            return false;
        }
        let remote = shared.remote();

        let result = tokio::select! {
            _ = shutdown.changed() => None,
            result = socket.send(buf.readable(), remote) => Some(result),
        };

        match result {
            None => {
                shared.send_queue.push_front(buf);
                return false;
            }
            Some(Ok(0)) => {
                shared.send_queue.push_front(buf);
                shared.fail(epoch, ErrorCode::Aborted);
                return false;
            }
            Some(Ok(n)) => {
                shared.sent_bytes.fetch_add(n as u64, Ordering::Relaxed);
                if shared.config.debug {
                    tracing::trace!(bytes = n, remaining = buf.readable_bytes().saturating_sub(n), "sent");
                }
                if let Err(e) = buf.skip(n) {
                    tracing::debug!(error = %e, "send overran buffer");
                    shared.fail(epoch, ErrorCode::ConnectionError);
                    return false;
                }
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "send failed");
                shared.send_queue.push_front(buf);
                shared.fail(epoch, ErrorCode::from(&e));
                return false;
            }
        }
    }
    true
}
