// Background tick thread with run control.
//
// Architecture: one thread owns the cadence, everyone shares the network.
//
// - **Tick thread**: loops at `tick_hz`. Each iteration measures wall-clock
//   time since the previous one, scales it by the playback rate, reports
//   simulation time to the dispatch channel, and calls `update` under the
//   network mutex.
// - **Callers**: flip the running flag (`start`/`pause`), adjust the rate,
//   or borrow the network through `with_network` between ticks.
//
// The wall-clock anchor is refreshed every iteration whether or not the
// simulation is running, so resuming after a long pause continues from a
// normal-sized dt instead of jumping by the pause length. Shutdown mirrors
// the rest of the codebase: `stop` flips a keep-alive flag and joins.

use crate::dispatch::TickSender;
use carillon_sim::error::NetworkError;
use carillon_sim::network::SoundNetwork;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for spawning a transport.
pub struct TransportConfig {
    /// Update cadence in ticks per second.
    pub tick_hz: u32,
    /// Initial playback rate: simulation seconds per wall-clock second.
    pub rate: f64,
    /// Where to report simulation time, normally from `dispatch::channel`.
    pub ticker: Option<TickSender>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tick_hz: 50,
            rate: 1.0,
            ticker: None,
        }
    }
}

/// State shared between the tick thread and control handles.
struct Shared {
    network: Mutex<SoundNetwork>,
    running: AtomicBool,
    keep_alive: AtomicBool,
    /// Playback rate as `f64::to_bits`; atomics cannot hold floats.
    rate_bits: AtomicU64,
    ticks: AtomicU64,
}

impl Shared {
    fn lock_network(&self) -> MutexGuard<'_, SoundNetwork> {
        self.network.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::SeqCst))
    }
}

/// Handle returned by `Transport::spawn` to control the tick thread.
pub struct Transport {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Transport {
    /// Take ownership of a configured network and spawn its tick thread.
    /// The transport starts paused; call `start` to run.
    pub fn spawn(network: SoundNetwork, config: TransportConfig) -> Result<Self, NetworkError> {
        if config.tick_hz == 0 {
            return Err(NetworkError::InvalidArgument {
                reason: "tick_hz must be at least 1".to_owned(),
            });
        }
        if !config.rate.is_finite() || config.rate < 0.0 {
            return Err(NetworkError::InvalidArgument {
                reason: format!("rate {} must be finite and non-negative", config.rate),
            });
        }

        let shared = Arc::new(Shared {
            network: Mutex::new(network),
            running: AtomicBool::new(false),
            keep_alive: AtomicBool::new(true),
            rate_bits: AtomicU64::new(config.rate.to_bits()),
            ticks: AtomicU64::new(0),
        });

        let shared_clone = Arc::clone(&shared);
        let thread = thread::spawn(move || {
            run_ticker(shared_clone, config.tick_hz, config.ticker);
        });

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub fn start(&self) {
        self.shared.running.store(true, Ordering::SeqCst);
        info!("transport running");
    }

    pub fn pause(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        info!("transport paused");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Clear the network back to its configured topology. The transport
    /// keeps ticking; pause first for a silent stop.
    pub fn reset(&self) {
        self.shared.lock_network().reset();
        info!("network reset");
    }

    /// Change the playback rate. Zero freezes simulation time while the
    /// thread keeps ticking.
    pub fn set_rate(&self, rate: f64) -> Result<(), NetworkError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(NetworkError::InvalidArgument {
                reason: format!("rate {rate} must be finite and non-negative"),
            });
        }
        self.shared.rate_bits.store(rate.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    pub fn rate(&self) -> f64 {
        self.shared.rate()
    }

    /// Updates the tick thread has performed while running.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::SeqCst)
    }

    /// Borrow the network between ticks. Keep the closure short: the tick
    /// thread is blocked on the same mutex for its duration.
    pub fn with_network<R>(&self, f: impl FnOnce(&mut SoundNetwork) -> R) -> R {
        f(&mut self.shared.lock_network())
    }

    /// Stop the tick thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shared.keep_alive.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Tick loop. Runs until `keep_alive` is cleared.
fn run_ticker(shared: Arc<Shared>, tick_hz: u32, ticker: Option<TickSender>) {
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_hz));
    let mut last = Instant::now();
    let mut sim_time = 0.0_f64;
    info!(tick_hz, "transport thread started");

    while shared.keep_alive.load(Ordering::SeqCst) {
        let iteration_started = Instant::now();
        let wall_dt = iteration_started.duration_since(last).as_secs_f64();
        last = iteration_started;

        if shared.running.load(Ordering::SeqCst) {
            let dt = wall_dt * shared.rate();
            if let Some(ticker) = &ticker {
                ticker.tick(sim_time);
            }
            match shared.lock_network().update(dt) {
                Ok(report) => {
                    if !report.failures.is_empty() {
                        warn!(failures = report.failures.len(), "arrivals failed to resolve");
                    }
                }
                Err(err) => warn!(%err, "update rejected its dt"),
            }
            sim_time += dt;
            shared.ticks.fetch_add(1, Ordering::SeqCst);
        }

        thread::sleep(period.saturating_sub(iteration_started.elapsed()));
    }
    debug!("transport thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use carillon_sim::behavior::EndBehavior;
    use carillon_sim::note::CollectingPlayer;
    use carillon_sim::types::{EdgeKey, NodeId};

    fn seeded_network() -> (SoundNetwork, CollectingPlayer) {
        let view = CollectingPlayer::new();
        let mut net = SoundNetwork::new(Box::new(view.clone()));
        net.set_up(&[NodeId(0), NodeId(1)], &[(NodeId(0), NodeId(1))])
            .unwrap();
        net.set_edge_speeds(&[EdgeKey::from((0, 1))], &[0.2]).unwrap();
        net.set_node_notes(&[NodeId(0), NodeId(1)], &[60.0]).unwrap();
        net.set_node_velocities(&[NodeId(0), NodeId(1)], &[90.0])
            .unwrap();
        net.set_node_durations(&[NodeId(0), NodeId(1)], &[0.3])
            .unwrap();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        (net, view)
    }

    #[test]
    fn spawns_paused_and_ticks_only_while_running() {
        let (net, view) = seeded_network();
        let transport = Transport::spawn(net, TransportConfig {
            tick_hz: 100,
            ..TransportConfig::default()
        })
        .unwrap();

        thread::sleep(Duration::from_millis(80));
        assert_eq!(transport.ticks(), 0);
        assert_eq!(view.batch_count(), 0);

        transport.start();
        assert!(transport.is_running());
        thread::sleep(Duration::from_millis(200));
        transport.pause();
        let after_pause = transport.ticks();
        assert!(after_pause > 0, "a running transport must tick");
        assert!(view.batch_count() > 0);

        // Give an in-flight iteration time to finish, then expect silence.
        thread::sleep(Duration::from_millis(80));
        let settled = transport.ticks();
        thread::sleep(Duration::from_millis(120));
        assert_eq!(transport.ticks(), settled);

        transport.stop();
    }

    #[test]
    fn a_zero_rate_freezes_simulation_time() {
        let (net, _view) = seeded_network();
        let transport = Transport::spawn(net, TransportConfig {
            tick_hz: 100,
            rate: 0.0,
            ..TransportConfig::default()
        })
        .unwrap();
        transport.start();
        thread::sleep(Duration::from_millis(150));

        // Ticks happen, but dt is always zero, so nothing moves.
        assert!(transport.ticks() > 0);
        let fractions = transport.with_network(|net| net.explorer_fractions());
        assert_eq!(fractions, vec![(EdgeKey::from((0, 1)), 0.0)]);
        transport.stop();
    }

    #[test]
    fn with_network_edits_land_between_ticks() {
        let (net, _view) = seeded_network();
        let transport = Transport::spawn(net, TransportConfig::default()).unwrap();

        let count = transport.with_network(|net| {
            net.add_explorer(EdgeKey::from((1, 0)), 0.5, EndBehavior::Bounce)
                .unwrap();
            net.explorer_count()
        });
        assert_eq!(count, 2);
        transport.stop();
    }

    #[test]
    fn reset_clears_the_live_population() {
        let (net, _view) = seeded_network();
        let transport = Transport::spawn(net, TransportConfig {
            tick_hz: 100,
            ..TransportConfig::default()
        })
        .unwrap();
        transport.start();
        thread::sleep(Duration::from_millis(100));
        transport.reset();
        let count = transport.with_network(|net| net.explorer_count());
        assert_eq!(count, 0);
        transport.stop();
    }

    #[test]
    fn invalid_configs_and_rates_are_rejected() {
        let (net, _view) = seeded_network();
        assert!(
            Transport::spawn(net, TransportConfig {
                tick_hz: 0,
                ..TransportConfig::default()
            })
            .is_err()
        );

        let (net, _view) = seeded_network();
        let transport = Transport::spawn(net, TransportConfig::default()).unwrap();
        assert!(transport.set_rate(f64::NAN).is_err());
        assert!(transport.set_rate(-1.0).is_err());
        transport.set_rate(2.0).unwrap();
        assert_eq!(transport.rate(), 2.0);
        transport.stop();
    }
}
