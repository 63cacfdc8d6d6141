//! Demo host statistics.

use std::time::Duration;

use observability::DeliveryStats;

/// Statistics from a demo host run
#[derive(Debug, Clone, Default)]
pub struct HostStats {
    /// Delivery totals accumulated across every session
    pub delivery: DeliveryStats,

    /// Number of sessions hosted
    pub sessions: usize,

    /// Total duration of the run
    pub duration: Duration,
}

impl HostStats {
    /// Acknowledged batches per second over the whole run
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.delivery.batches_acked as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Host Statistics                          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sessions: {}", self.sessions);
        println!("   └─ Throughput: {:.2} acked/s", self.throughput());

        println!("\n📈 Delivery");
        println!("   ├─ Batches produced: {}", self.delivery.batches_produced);
        println!("   ├─ Batches acked: {}", self.delivery.batches_acked);
        println!("   ├─ Batches resent: {}", self.delivery.batches_resent);
        println!("   ├─ Disconnects: {}", self.delivery.disconnects);
        println!("   └─ In flight at shutdown: {}", self.delivery.in_flight());

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_zero_duration() {
        let stats = HostStats::default();
        assert_eq!(stats.throughput(), 0.0);
    }

    #[test]
    fn test_throughput() {
        let stats = HostStats {
            delivery: DeliveryStats {
                batches_acked: 10,
                ..Default::default()
            },
            sessions: 1,
            duration: Duration::from_secs(2),
        };
        assert!((stats.throughput() - 5.0).abs() < f64::EPSILON);
    }
}
