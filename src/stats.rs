use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide counters, kept atomic so they can be read off-thread.
pub struct Stats {
    connected_clients: AtomicU64,
    total_commands_processed: AtomicU64,
    keyspace_hits: AtomicU64,
    keyspace_misses: AtomicU64,
    start: Instant,
    tcp_port: u16,
}

impl Stats {
    pub fn new(tcp_port: u16) -> Stats {
        Stats {
            connected_clients: AtomicU64::new(0),
            total_commands_processed: AtomicU64::new(0),
            keyspace_hits: AtomicU64::new(0),
            keyspace_misses: AtomicU64::new(0),
            start: Instant::now(),
            tcp_port,
        }
    }

    pub fn client_connected(&self) {
        self.connected_clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        self.connected_clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.total_commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn keyspace_hit(&self) {
        self.keyspace_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn keyspace_miss(&self) {
        self.keyspace_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connected_clients(&self) -> u64 {
        self.connected_clients.load(Ordering::Relaxed)
    }

    pub fn total_commands_processed(&self) -> u64 {
        self.total_commands_processed.load(Ordering::Relaxed)
    }

    pub fn keyspace_hits(&self) -> u64 {
        self.keyspace_hits.load(Ordering::Relaxed)
    }

    pub fn keyspace_misses(&self) -> u64 {
        self.keyspace_misses.load(Ordering::Relaxed)
    }

    /// Renders the INFO report: `name:value` lines grouped into sections,
    /// every line CRLF-terminated.
    pub fn render(&self, num_keys: usize) -> String {
        let mut out = String::new();

        out.push_str("# Server\r\n");
        out.push_str(&format!("redis_version:{}\r\n", env!("CARGO_PKG_VERSION")));
        out.push_str(&format!("tcp_port:{}\r\n", self.tcp_port));
        out.push_str(&format!(
            "uptime_in_seconds:{}\r\n",
            self.start.elapsed().as_secs()
        ));
        out.push_str("\r\n");

        out.push_str("# Clients\r\n");
        out.push_str(&format!(
            "connected_clients:{}\r\n",
            self.connected_clients()
        ));
        out.push_str("\r\n");

        out.push_str("# Stats\r\n");
        out.push_str(&format!(
            "total_commands_processed:{}\r\n",
            self.total_commands_processed()
        ));
        out.push_str(&format!("keyspace_hits:{}\r\n", self.keyspace_hits()));
        out.push_str(&format!("keyspace_misses:{}\r\n", self.keyspace_misses()));
        out.push_str("\r\n");

        out.push_str("# Keyspace\r\n");
        out.push_str(&format!("db0:keys={},expires=0,avg_ttl=0\r\n", num_keys));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new(6379);
        stats.client_connected();
        stats.client_connected();
        stats.client_disconnected();
        stats.command_processed();
        stats.keyspace_hit();
        stats.keyspace_miss();
        stats.keyspace_miss();

        assert_eq!(stats.connected_clients(), 1);
        assert_eq!(stats.total_commands_processed(), 1);
        assert_eq!(stats.keyspace_hits(), 1);
        assert_eq!(stats.keyspace_misses(), 2);
    }

    #[test]
    fn render_reports_all_sections() {
        let stats = Stats::new(6380);
        stats.command_processed();
        stats.keyspace_hit();

        let report = stats.render(42);

        assert!(report.contains("# Server\r\n"));
        assert!(report.contains("tcp_port:6380\r\n"));
        assert!(report.contains("# Clients\r\n"));
        assert!(report.contains("connected_clients:0\r\n"));
        assert!(report.contains("# Stats\r\n"));
        assert!(report.contains("total_commands_processed:1\r\n"));
        assert!(report.contains("keyspace_hits:1\r\n"));
        assert!(report.contains("keyspace_misses:0\r\n"));
        assert!(report.contains("# Keyspace\r\n"));
        assert!(report.contains("db0:keys=42,expires=0,avg_ttl=0\r\n"));
    }
}
