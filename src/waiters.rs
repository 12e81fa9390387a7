//! Waiter queue.
//!
//! There is no shared queue structure between contenders. The holder keeps
//! every accepted connection open; each waiter blocks on its own connection
//! until it sees end-of-stream, then re-runs the election on its own. Which
//! waiter wins the next bind is decided by the kernel.

use crate::holder::HolderInfo;
use crate::transport::ChannelStream;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Longest metadata line a waiter will buffer.
const MAX_GREETING_BYTES: usize = 4096;

/// Holder-side registry of connected waiters.
#[derive(Debug)]
pub(crate) struct WaiterQueue<S> {
    waiters: Vec<S>,
    greeting: Option<String>,
}

impl<S: ChannelStream> WaiterQueue<S> {
    /// `greeting` is written to each waiter as it is admitted.
    pub(crate) fn new(greeting: Option<String>) -> Self {
        Self {
            waiters: Vec::new(),
            greeting,
        }
    }

    /// Register a newly accepted waiter connection.
    pub(crate) async fn admit(&mut self, mut stream: S) {
        if let Some(greeting) = &self.greeting
            && let Err(e) = stream.write_all(greeting.as_bytes()).await
        {
            debug!(error = %e, "waiter left before greeting");
            return;
        }
        self.prune();
        self.waiters.push(stream);
    }

    /// Drop connections whose waiter already went away. Returns how many
    /// were dropped.
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.waiters.len();
        self.waiters.retain(|stream| !stream.peer_closed());
        before - self.waiters.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Close every waiter connection, delivering the disconnect notification.
    pub(crate) fn disconnect_all(&mut self) -> usize {
        let count = self.waiters.len();
        self.waiters.clear();
        count
    }
}

/// First message seen on a waiter connection.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Greeting {
    /// A complete line arrived; parsed when it is holder metadata.
    Line(Option<HolderInfo>),
    /// The connection closed before a full line arrived.
    Closed,
}

/// Read the holder's metadata line, if it sends one.
pub(crate) async fn read_greeting<R: AsyncRead + Unpin>(stream: &mut R) -> Greeting {
    let mut line = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return Greeting::Closed,
            Ok(n) => n,
        };
        if let Some(pos) = buf[..n].iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&buf[..pos]);
            let text = String::from_utf8_lossy(&line);
            return Greeting::Line(HolderInfo::from_line(&text));
        }
        line.extend_from_slice(&buf[..n]);
        if line.len() > MAX_GREETING_BYTES {
            return Greeting::Line(None);
        }
    }
}

/// Block until the holder closes this waiter's connection.
///
/// `on_holder` fires at most once, with the holder's metadata.
pub(crate) async fn await_disconnect<R, F>(mut stream: R, on_holder: F)
where
    R: AsyncRead + Unpin,
    F: FnOnce(HolderInfo),
{
    match read_greeting(&mut stream).await {
        Greeting::Closed => return,
        Greeting::Line(Some(info)) => on_holder(info),
        Greeting::Line(None) => {}
    }

    let mut buf = [0u8; 512];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => return,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "waiter connection failed; treating as disconnect");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn greeting_parses_holder_line() {
        let info = HolderInfo::current("jobs");
        let (mut holder, mut waiter) = tokio::io::duplex(1024);
        holder
            .write_all(info.to_line().unwrap().as_bytes())
            .await
            .unwrap();

        assert_eq!(read_greeting(&mut waiter).await, Greeting::Line(Some(info)));
    }

    #[tokio::test]
    async fn greeting_from_foreign_server_is_empty() {
        let (mut holder, mut waiter) = tokio::io::duplex(1024);
        holder.write_all(b"220 welcome\n").await.unwrap();

        assert_eq!(read_greeting(&mut waiter).await, Greeting::Line(None));
    }

    #[tokio::test]
    async fn greeting_sees_close() {
        let (holder, mut waiter) = tokio::io::duplex(1024);
        drop(holder);

        assert_eq!(read_greeting(&mut waiter).await, Greeting::Closed);
    }

    #[tokio::test]
    async fn oversized_greeting_is_cut_off() {
        let (mut holder, mut waiter) = tokio::io::duplex(16 * 1024);
        holder.write_all(&[b'x'; 8192]).await.unwrap();

        assert_eq!(read_greeting(&mut waiter).await, Greeting::Line(None));
    }

    #[tokio::test]
    async fn disconnect_resolves_after_holder_closes() {
        let info = HolderInfo::current("jobs");
        let (mut holder, waiter) = tokio::io::duplex(1024);
        holder
            .write_all(info.to_line().unwrap().as_bytes())
            .await
            .unwrap();

        let seen = std::sync::Mutex::new(None);
        let wait = await_disconnect(waiter, |h| *seen.lock().unwrap() = Some(h));
        let close = async move {
            tokio::task::yield_now().await;
            drop(holder);
        };
        tokio::join!(wait, close);

        assert_eq!(seen.into_inner().unwrap(), Some(info));
    }

    #[tokio::test]
    async fn disconnect_without_greeting_skips_callback() {
        let (holder, waiter) = tokio::io::duplex(64);
        drop(holder);

        let mut called = false;
        await_disconnect(waiter, |_| called = true).await;
        assert!(!called);
    }

    #[tokio::test]
    async fn prune_drops_departed_waiters() {
        let (stayed, _stayed_peer) = tokio::net::UnixStream::pair().unwrap();
        let (left, left_peer) = tokio::net::UnixStream::pair().unwrap();
        let mut queue = WaiterQueue::new(None);
        queue.admit(stayed).await;
        queue.admit(left).await;
        assert_eq!(queue.len(), 2);

        drop(left_peer);
        let mut dropped = 0;
        for _ in 0..50 {
            dropped += queue.prune();
            if dropped > 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(dropped, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.prune(), 0);
    }
}
