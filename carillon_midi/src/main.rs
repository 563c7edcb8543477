// Carillon Performer — CLI entry point.
//
// Renders a sound-network performance to a Standard MIDI File. The
// pipeline: score loading → network build around the dispatch channel →
// fixed-step update loop → SMF capture on the consumer thread. Rendering
// is offline, so the loop runs as fast as it can rather than pacing to the
// wall clock.
//
// Usage:
//   cargo run -p carillon_midi -- [output.mid] [--seconds N] [--tick-rate HZ]
//     [--tempo BPM] [--score FILE.json]

use carillon_engine::dispatch::{self, run_consumer};
use carillon_midi::score;
use carillon_midi::smf::SmfRecorder;
use carillon_sim::blueprint::Blueprint;
use std::path::Path;
use std::thread;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();

    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("performance.mid");
    let seconds: f64 = parse_flag(&args, "--seconds").unwrap_or(20.0);
    let tick_rate: u32 = parse_flag(&args, "--tick-rate").unwrap_or(50);
    let tempo: u16 = parse_flag(&args, "--tempo").unwrap_or(120);
    let score_path: Option<String> = parse_flag(&args, "--score");

    if tick_rate == 0 || !seconds.is_finite() || seconds < 0.0 {
        eprintln!("--tick-rate must be at least 1 and --seconds non-negative.");
        std::process::exit(1);
    }

    println!("=== Carillon Performer ===");
    println!("Output: {}", output_path);
    println!("Length: {:.1}s at {} ticks/s", seconds, tick_rate);
    println!("Tempo: {} BPM", tempo);
    println!();

    // Load the score
    println!("[1/4] Loading score...");
    let blueprint = match &score_path {
        Some(path) => match load_score(path) {
            Ok(b) => {
                println!("  Loaded {}.", path);
                b
            }
            Err(e) => {
                eprintln!("  Error loading {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            println!("  Using the built-in demo score.");
            score::demo()
        }
    };
    println!(
        "  {} nodes, {} pairs, {} departures.",
        blueprint.nodes.len(),
        blueprint.edges.len(),
        blueprint.explorers.len()
    );

    // Build the network around the dispatch channel. The channel is sized
    // to the whole render so an offline run can never drop a batch.
    println!("[2/4] Building network...");
    let total_ticks = (seconds * tick_rate as f64).ceil() as u64;
    let capacity = (total_ticks as usize * 2).max(dispatch::DEFAULT_CAPACITY);
    let (player, ticker, rx) = dispatch::channel(capacity);
    let mut network = match blueprint.build(Box::new(player)) {
        Ok(net) => net,
        Err(e) => {
            eprintln!("  Error building network: {}", e);
            std::process::exit(1);
        }
    };
    let consumer = thread::spawn(move || run_consumer(rx, SmfRecorder::new(tempo)));

    // Drive the simulation
    println!("[3/4] Rendering {} ticks...", total_ticks);
    let dt = 1.0 / tick_rate as f64;
    let mut sim_time = 0.0;
    let mut notes = 0usize;
    let mut failures = 0usize;
    for _ in 0..total_ticks {
        ticker.tick(sim_time);
        match network.update(dt) {
            Ok(report) => {
                notes += report.notes;
                failures += report.failures.len();
            }
            Err(e) => {
                eprintln!("  Update failed: {}", e);
                std::process::exit(1);
            }
        }
        sim_time += dt;
    }
    ticker.tick(sim_time);
    let played_pairs = network
        .graph()
        .declared_pairs()
        .iter()
        .filter(|&&pair| network.graph().edge_played(pair).unwrap_or(false))
        .count();
    println!(
        "  {} notes played across {}/{} pairs, {} explorers live at the end.",
        notes,
        played_pairs,
        network.graph().pair_count(),
        network.explorer_count()
    );
    if failures > 0 {
        println!("  {} arrivals could not resolve.", failures);
    }

    // Close the channel so the consumer drains and finishes.
    println!("[4/4] Writing MIDI to {}...", output_path);
    drop(network);
    drop(ticker);
    let recorder = match consumer.join() {
        Ok(recorder) => recorder,
        Err(_) => {
            eprintln!("  Consumer thread panicked.");
            std::process::exit(1);
        }
    };
    match recorder.write(Path::new(output_path)) {
        Ok(()) => {
            println!(
                "  Done! {} MIDI events over {:.1}s.",
                recorder.event_count(),
                sim_time
            );
        }
        Err(e) => {
            eprintln!("  Error writing MIDI: {}", e);
            std::process::exit(1);
        }
    }

    println!();
    println!("Listen with: timidity {} (or any MIDI player)", output_path);
}

fn load_score(path: &str) -> Result<Blueprint, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(Blueprint::from_json(&json)?)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
