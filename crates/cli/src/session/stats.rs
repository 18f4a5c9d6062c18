//! Session statistics.

use std::time::Duration;

use driver::WiringReport;
use observability::TickSummary;

/// Statistics from a driver run
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Total wall time of the scheduling loop
    pub duration: Duration,

    /// What `wire` managed to register
    pub wiring: WiringReport,

    /// Aggregated tick reports
    pub ticks: TickSummary,

    /// Durable logs written during the session (recordings and dumps)
    pub written: Vec<String>,
}

impl SessionStats {
    /// Serviced ticks per second
    pub fn tick_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.ticks.total_ticks - self.ticks.idle_ticks) as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Driver Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Channels: {}", self.wiring.channels.len());
        println!("   ├─ Events: {}", self.wiring.events.len());
        println!("   ├─ Skipped entries: {}", self.wiring.skipped.len());
        println!("   └─ Ticks/s: {:.2}", self.tick_rate());

        for (name, reason) in &self.wiring.skipped {
            println!("      ⚠ {name}: {reason}");
        }

        println!("\n{}", self.ticks);

        if !self.written.is_empty() {
            println!("💾 Durable logs");
            for (i, location) in self.written.iter().enumerate() {
                let prefix = if i == self.written.len() - 1 { "└─" } else { "├─" };
                println!("   {prefix} {location}");
            }
        }

        println!();
    }
}
