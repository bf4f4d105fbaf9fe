//! # Cache Server
//!
//! Thin TCP plumbing over the cache facade. One acceptor thread hands each
//! connection to a reader thread; readers split the byte stream into lines
//! and enqueue them on the shared work queue; a fixed pool of workers
//! executes commands against the cache and writes responses back. All of
//! the interesting state lives in [`Cache`]; this layer only moves lines.
//!
//! ```text
//! acceptor ──> reader (per connection) ──> work queue ──> workers ──> cache
//!                                                            │
//!                client <── response line <──────────────────┘
//! ```
//!
//! Responses go out through a per-connection write lock, so a slow client
//! stalls only its own responses. Disconnects cancel nothing: queued lines
//! from a dead client still execute, and their responses are dropped on the
//! closed socket.
//!
//! ## Module Organization
//!
//! - `protocol`: line parsing into [`Command`]
//! - `worker`: work queue, worker pool, shutdown flag

pub mod protocol;
mod worker;

pub use protocol::Command;

use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use eyre::WrapErr;
use parking_lot::Mutex;

use crate::cache::Cache;
use crate::config::{CacheConfig, MAX_LINE_BYTES};

use self::worker::{send_response, WorkItem, WorkQueue};

pub struct CacheServer {
    cache: Arc<Cache>,
    listener: TcpListener,
    queue: Arc<WorkQueue>,
    worker_count: usize,
    next_client: AtomicU64,
}

impl CacheServer {
    /// Binds the listening socket. `serve` starts the accept loop.
    pub fn bind(config: &CacheConfig, cache: Arc<Cache>) -> eyre::Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr)
            .wrap_err_with(|| format!("failed to bind cache server to {addr}"))?;

        Ok(Self {
            cache,
            listener,
            queue: Arc::new(WorkQueue::new()),
            worker_count: config.worker_count,
            next_client: AtomicU64::new(1),
        })
    }

    /// The bound address; useful when the configured port was 0.
    pub fn local_addr(&self) -> eyre::Result<SocketAddr> {
        self.listener
            .local_addr()
            .wrap_err("failed to read server address")
    }

    /// Runs the accept loop on the calling thread. Returns when the
    /// listener fails or the queue has been shut down.
    pub fn serve(&self) -> eyre::Result<()> {
        let workers = self.spawn_workers();

        for stream in self.listener.incoming() {
            if self.queue.is_stopped() {
                break;
            }
            match stream {
                Ok(stream) => self.spawn_reader(stream),
                Err(err) => {
                    // transient accept failures (per-connection resets,
                    // fd pressure) should not take the server down
                    eprintln!("accept failed: {err}");
                }
            }
        }

        self.queue.shutdown();
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }

    fn spawn_workers(&self) -> Vec<JoinHandle<()>> {
        (0..self.worker_count)
            .map(|_| {
                let queue = Arc::clone(&self.queue);
                let cache = Arc::clone(&self.cache);
                std::thread::spawn(move || {
                    while let Some(item) = queue.pop() {
                        match execute(&cache, &item.client_id, &item.line) {
                            Some(response) => send_response(&item, &response),
                            // QUIT: shutting the write side signals the
                            // reader loop on the client end
                            None => {
                                let stream = item.stream.lock();
                                let _ = stream.shutdown(std::net::Shutdown::Both);
                            }
                        }
                    }
                })
            })
            .collect()
    }

    fn spawn_reader(&self, stream: TcpStream) {
        let client_id = format!("client-{}", self.next_client.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::clone(&self.queue);

        let write_half = match stream.try_clone() {
            Ok(clone) => Arc::new(Mutex::new(clone)),
            Err(err) => {
                eprintln!("{client_id}: failed to clone stream: {err}");
                return;
            }
        };

        std::thread::spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(n) if n > MAX_LINE_BYTES => {
                        send_line(&write_half, "ERROR line too long");
                    }
                    Ok(_) => {
                        if queue.is_stopped() {
                            break;
                        }
                        queue.push(WorkItem {
                            client_id: client_id.clone(),
                            line: std::mem::take(&mut line),
                            stream: Arc::clone(&write_half),
                        });
                    }
                }
            }
        });
    }

    /// Stops the worker pool. The accept loop exits on its next wake-up.
    pub fn stop(&self) {
        self.queue.shutdown();
    }
}

/// Executes one protocol line, returning the response to send, or `None`
/// when the connection should close (QUIT).
pub fn execute(cache: &Cache, client_id: &str, line: &str) -> Option<String> {
    let command = match protocol::parse(line) {
        Ok(command) => command,
        Err(err) => return Some(format!("ERROR {err}")),
    };

    let response = match command {
        Command::Add { key, value } => match cache.insert(&key, value.as_bytes(), client_id) {
            Ok(()) => "STORED".to_string(),
            Err(crate::Error::KeyExists(_)) => "EXISTS".to_string(),
            Err(crate::Error::OutOfSpace { .. }) => "OUT_OF_SPACE".to_string(),
            Err(err) => format!("ERROR {err}"),
        },
        Command::Update { key, value } => match cache.update(&key, value.as_bytes(), client_id) {
            Ok(()) => "STORED".to_string(),
            Err(crate::Error::NotFound(_)) => "NOT_FOUND".to_string(),
            Err(crate::Error::OutOfSpace { .. }) => "OUT_OF_SPACE".to_string(),
            Err(err) => format!("ERROR {err}"),
        },
        Command::Get { key } => match cache.get(&key, client_id) {
            Ok(bytes) => format!("VALUE {}", String::from_utf8_lossy(&bytes)),
            Err(crate::Error::NotFound(_)) => "NOT_FOUND".to_string(),
            Err(err) => format!("ERROR {err}"),
        },
        Command::Delete { key } => match cache.delete(&key, client_id) {
            Ok(()) => "DELETED".to_string(),
            Err(crate::Error::NotFound(_)) => "NOT_FOUND".to_string(),
            Err(err) => format!("ERROR {err}"),
        },
        Command::Stats => format!("STATS {}", cache.stats()),
        Command::Frag => format!("FRAG {}", cache.fragmentation()),
        Command::Reset => {
            cache.reset_stats();
            "OK".to_string()
        }
        Command::Quit => return None,
    };
    Some(response)
}

fn send_line(stream: &Arc<Mutex<TcpStream>>, line: &str) {
    use std::io::Write;
    let mut stream = stream.lock();
    let _ = stream.write_all(line.as_bytes());
    let _ = stream.write_all(b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> Cache {
        Cache::new(&CacheConfig {
            page_size: 10,
            num_pages: 100,
            ..CacheConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn execute_add_get_delete_cycle() {
        let cache = test_cache();

        assert_eq!(execute(&cache, "c1", "ADD k hello"), Some("STORED".into()));
        assert_eq!(execute(&cache, "c1", "GET k"), Some("VALUE hello".into()));
        assert_eq!(execute(&cache, "c1", "DELETE k"), Some("DELETED".into()));
        assert_eq!(execute(&cache, "c1", "GET k"), Some("NOT_FOUND".into()));
    }

    #[test]
    fn execute_maps_duplicate_add_to_exists() {
        let cache = test_cache();
        execute(&cache, "c1", "ADD k one");

        assert_eq!(execute(&cache, "c1", "ADD k two"), Some("EXISTS".into()));
    }

    #[test]
    fn execute_maps_update_of_missing_key() {
        let cache = test_cache();

        assert_eq!(
            execute(&cache, "c1", "UPDATE ghost value"),
            Some("NOT_FOUND".into())
        );
    }

    #[test]
    fn execute_reports_out_of_space() {
        let cache = test_cache();
        let value = "x".repeat(1500);

        assert_eq!(
            execute(&cache, "c1", &format!("ADD big {value}")),
            Some("OUT_OF_SPACE".into())
        );
    }

    #[test]
    fn execute_quit_closes() {
        let cache = test_cache();

        assert_eq!(execute(&cache, "c1", "QUIT"), None);
    }

    #[test]
    fn execute_bad_line_is_error_reply() {
        let cache = test_cache();

        let reply = execute(&cache, "c1", "BOGUS").unwrap();
        assert!(reply.starts_with("ERROR"));
    }

    #[test]
    fn execute_stats_and_frag_render() {
        let cache = test_cache();
        execute(&cache, "c1", "ADD k v");

        assert!(execute(&cache, "c1", "STATS").unwrap().starts_with("STATS "));
        assert!(execute(&cache, "c1", "FRAG").unwrap().starts_with("FRAG "));
        assert_eq!(execute(&cache, "c1", "RESET"), Some("OK".into()));
    }
}
