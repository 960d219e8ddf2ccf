//! Server configuration from environment variables.

use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Buffered events per quiz topic before slow subscribers start lagging.
    pub topic_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("QUIZCAST_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8350)));

        let topic_capacity = std::env::var("QUIZCAST_TOPIC_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&c: &usize| c > 0)
            .unwrap_or(crate::broadcast::DEFAULT_TOPIC_CAPACITY);

        Self {
            bind_addr,
            topic_capacity,
        }
    }
}
