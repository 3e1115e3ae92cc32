//! The event loop (spec.md §4.6): a single-threaded, edge-triggered,
//! one-shot reactor over one listening socket and a table of live
//! connections, bounded on each wait by the timer wheel's next deadline.
//!
//! Grounded on `examples/original_source/src/mainloop.c`'s `server_loop`
//! (`epoll_create1`/`epoll_wait`/`EPOLLET`/`EPOLLONESHOT` structure),
//! translated to `mio::Poll`/`Events`/`Token`. mio has no native one-shot
//! mode on every platform, so one-shot is emulated here by deregistering a
//! connection's interest once its readiness event has been handled and
//! only re-registering once the connection driver decides to re-arm,
//! matching spec.md's arming-exclusivity invariant (P5) regardless of the
//! underlying OS primitive.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use slab::Slab;

use crate::connection::{Connection, Progress};
use crate::error::ReactorError;
use crate::request::ParsedRequest;
use crate::response;
use crate::ring_buffer::RingBuffer;

const LISTENER: Token = Token(usize::MAX);
const EVENTS_CAPACITY: usize = 1024;

/// Per-worker configuration the reactor needs (a subset of
/// `config::ServerConfig`, plus the listener it should drive).
pub struct ReactorConfig {
    pub document_root: std::path::PathBuf,
    pub ring_capacity: usize,
    pub idle_timeout: Duration,
}

/// Bind a `SO_REUSEPORT` listener on `addr`, letting each worker thread own
/// an independent accept queue on the same port (spec.md §9's
/// "multi-worker fan-out" note explicitly allows thread-per-core with
/// `SO_REUSEPORT` in place of the original's `fork()`-per-CPU). Grounded on
/// the reference pack's `socket2`-based listener setup
/// (`pelikan-io-grow-a-cache`, `hyperium-hyper`): `mio` itself has no
/// `SO_REUSEPORT` knob, so the socket is built and configured with
/// `socket2` first, then handed to `mio::net::TcpListener::from_std`.
pub fn bind_reuseport(addr: SocketAddr) -> Result<TcpListener, ReactorError> {
    use socket2::{Domain, Protocol, Socket, Type};

    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| ReactorError::Bind { addr: addr.to_string(), source })?;
    socket
        .set_reuse_address(true)
        .map_err(|source| ReactorError::Bind { addr: addr.to_string(), source })?;
    socket
        .set_reuse_port(true)
        .map_err(|source| ReactorError::Bind { addr: addr.to_string(), source })?;
    socket
        .set_nonblocking(true)
        .map_err(|source| ReactorError::Bind { addr: addr.to_string(), source })?;
    socket
        .bind(&addr.into())
        .map_err(|source| ReactorError::Bind { addr: addr.to_string(), source })?;
    socket
        .listen(1024)
        .map_err(|source| ReactorError::Bind { addr: addr.to_string(), source })?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener).map_err(ReactorError::Listen)
}

/// Runs one reactor loop until `shutdown` is observed set. Owns its own
/// `Poll`, connection table, and timer wheel exclusively — spec.md §5: no
/// shared mutable state between workers.
pub fn run(
    mut listener: TcpListener,
    config: ReactorConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<(), ReactorError> {
    let mut poll = Poll::new().map_err(ReactorError::Poll)?;
    poll.registry()
        .register(&mut listener, LISTENER, Interest::READABLE)
        .map_err(ReactorError::Listen)?;

    let mut events = Events::with_capacity(EVENTS_CAPACITY);
    let mut connections: Slab<Connection> = Slab::new();
    let mut timers = crate::timer_wheel::TimerWheel::new();
    // Maps a TimerId back to the slab index it belongs to, so a sweep can
    // find the connection to close without the wheel owning it (spec.md
    // §9's "Connection ownership vs. timer entries" note: the wheel holds
    // only an opaque handle, never the connection itself).
    let mut timer_owner: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();

    while !shutdown.load(Ordering::Relaxed) {
        let timeout = timers.next_delay_ms().map(Duration::from_millis);
        match poll.poll(&mut events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReactorError::Poll(e)),
        }

        let expired = timers.sweep();
        debug!("timer sweep expired {} connections", expired.len());
        for timer_id in expired {
            if let Some(index) = timer_owner.remove(&timer_id.id()) {
                if connections.contains(index) {
                    info!("closing connection {} on idle timeout", index);
                    close_connection(&poll, &mut connections, index);
                }
            }
        }

        for event in events.iter() {
            if event.token() == LISTENER {
                accept_loop(&poll, &mut listener, &mut connections, &mut timers, &mut timer_owner, &config);
                continue;
            }

            let index = event.token().0;
            if !connections.contains(index) {
                continue;
            }

            if event.is_error() || (!event.is_readable() && event.is_read_closed()) {
                warn!("connection {} error/hangup", index);
                remove_timer(&mut timers, &mut timer_owner, &mut connections, index);
                close_connection(&poll, &mut connections, index);
                continue;
            }

            if let Some(id) = connections[index].timer {
                timers.remove(id);
                timer_owner.remove(&id.id());
            }

            // Emulate edge-triggered one-shot (spec.md §4.6): deregister
            // before handling so no further notification can arrive for
            // this fd until `drive` decides to re-arm it below.
            let _ = poll.registry().deregister(&mut connections[index].stream);

            match drive(&mut connections, index, &config) {
                Ok(Progress::NeedMore) => {
                    let id = timers.add(config.idle_timeout);
                    timer_owner.insert(id.id(), index);
                    connections[index].timer = Some(id);
                    if let Err(e) = poll.registry().register(
                        &mut connections[index].stream,
                        event.token(),
                        Interest::READABLE,
                    ) {
                        warn!("re-arm failed for connection {}: {}", index, e);
                        close_connection(&poll, &mut connections, index);
                    }
                }
                Ok(Progress::Complete(request)) => {
                    respond(&mut connections, index, &request, &config);
                    close_connection(&poll, &mut connections, index);
                }
                Err(e) => {
                    debug!("connection {} closing: {}", index, e);
                    close_connection(&poll, &mut connections, index);
                }
            }
        }
    }

    Ok(())
}

fn accept_loop(
    poll: &Poll,
    listener: &mut TcpListener,
    connections: &mut Slab<Connection>,
    timers: &mut crate::timer_wheel::TimerWheel,
    timer_owner: &mut std::collections::HashMap<u64, usize>,
    config: &ReactorConfig,
) {
    loop {
        match listener.accept() {
            Ok((stream, _addr)) => {
                register_new_connection(poll, connections, timers, timer_owner, config, stream);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                warn!("accept failed: {}", e);
                break;
            }
        }
    }
}

fn register_new_connection(
    poll: &Poll,
    connections: &mut Slab<Connection>,
    timers: &mut crate::timer_wheel::TimerWheel,
    timer_owner: &mut std::collections::HashMap<u64, usize>,
    config: &ReactorConfig,
    stream: TcpStream,
) {
    let mut conn = Connection::new(stream, config.ring_capacity);
    let entry = connections.vacant_entry();
    let index = entry.key();
    let token = Token(index);

    if let Err(e) = poll
        .registry()
        .register(&mut conn.stream, token, Interest::READABLE)
    {
        warn!("failed to register new connection: {}", e);
        return;
    }

    let timer_id = timers.add(config.idle_timeout);
    timer_owner.insert(timer_id.id(), index);
    conn.timer = Some(timer_id);
    entry.insert(conn);
    debug!("accepted connection {}", index);
}

fn drive(
    connections: &mut Slab<Connection>,
    index: usize,
    _config: &ReactorConfig,
) -> Result<Progress, crate::error::ConnectionError> {
    connections[index].advance()
}

fn respond(connections: &mut Slab<Connection>, index: usize, request: &ParsedRequest, config: &ReactorConfig) {
    let conn = &mut connections[index];
    let rb_snapshot: &RingBuffer = &conn.buffer;
    let mut out = Vec::new();
    match response::serve(request, rb_snapshot, &config.document_root, &mut out) {
        Ok(status) => {
            info!("served {:?} -> {:?}", request.method, status);
        }
        Err(e) => {
            error!("response generation failed: {}", e);
            return;
        }
    }
    if let Err(e) = conn.write_all(&out) {
        warn!("write failed for connection {}: {}", index, e);
    }
}

fn remove_timer(
    timers: &mut crate::timer_wheel::TimerWheel,
    timer_owner: &mut std::collections::HashMap<u64, usize>,
    connections: &mut Slab<Connection>,
    index: usize,
) {
    if connections.contains(index) {
        if let Some(id) = connections[index].timer.take() {
            timers.remove(id);
            timer_owner.remove(&id.id());
        }
    }
}

fn close_connection(poll: &Poll, connections: &mut Slab<Connection>, index: usize) {
    if connections.contains(index) {
        let mut conn = connections.remove(index);
        let _ = poll.registry().deregister(&mut conn.stream);
    }
}
