// Long-running consistency checks over a live network.
//
// Unit tests pin individual rules; these soaks drive a denser graph for
// hundreds of ticks and re-check the structural invariants after every one:
// locations stay in [0, 1], occupancy matches the live population, and the
// player hears exactly one batch per tick.

use carillon_sim::behavior::EndBehavior;
use carillon_sim::blueprint::{Blueprint, Departure};
use carillon_sim::network::SoundNetwork;
use carillon_sim::note::CollectingPlayer;

/// Six-node ring with one chord, mixed speeds, three seed explorers.
fn ring_blueprint() -> Blueprint {
    Blueprint {
        nodes: vec![0, 1, 2, 3, 4, 5],
        edges: vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 3)],
        speeds: vec![0.31, 0.53, 0.47, 0.61, 0.29, 0.43, 0.37],
        notes: vec![60.0, 62.0, 65.0, 67.0, 69.0, 72.0],
        velocities: vec![96.0],
        durations: vec![0.4],
        explorers: vec![
            Departure {
                edge: (0, 1),
                natural_speed: 1.0,
                behavior: EndBehavior::Bounce,
            },
            Departure {
                edge: (3, 4),
                natural_speed: 1.3,
                behavior: EndBehavior::Explode,
            },
            Departure {
                edge: (5, 0),
                natural_speed: 0.7,
                behavior: EndBehavior::Bounce,
            },
        ],
        ..Blueprint::default()
    }
}

fn assert_invariants(net: &SoundNetwork) {
    for (edge, location) in net.explorer_fractions() {
        assert!(
            (0.0..=1.0).contains(&location),
            "explorer on {edge} escaped its edge: {location}"
        );
    }
    let total_occupancy: u32 = net
        .graph()
        .declared_pairs()
        .iter()
        .map(|&pair| net.graph().pair_mite_count(pair).unwrap())
        .sum();
    assert_eq!(
        total_occupancy as usize,
        2 * net.explorer_count(),
        "occupancy out of step with the live population"
    );
}

#[test]
fn population_and_occupancy_stay_consistent() {
    let view = CollectingPlayer::new();
    let mut net = ring_blueprint().build(Box::new(view.clone())).unwrap();
    assert_invariants(&net);

    let dts = [0.3, 0.7, 1.1];
    for tick in 0..300 {
        let before = net.explorer_count();
        let report = net.update(dts[tick % dts.len()]).unwrap();
        assert!(report.failures.is_empty(), "tick {tick}: {:?}", report.failures);
        assert_eq!(
            net.explorer_count(),
            before + report.spawned - report.removed
        );
        assert_invariants(&net);
    }

    assert_eq!(view.batch_count() as u64, net.ticks());
    assert!(view.total_notes() > 0, "a seeded ring must make sound");
}

#[test]
fn reset_reruns_reproduce_the_same_performance() {
    let view = CollectingPlayer::new();
    let mut net = ring_blueprint().build(Box::new(view.clone())).unwrap();

    let blueprint = ring_blueprint();
    let run = |net: &mut SoundNetwork| {
        for tick in 0..120 {
            net.update(if tick % 2 == 0 { 0.4 } else { 0.9 }).unwrap();
        }
    };

    run(&mut net);
    let first_run = view.all_batches();
    assert!(first_run.iter().any(|batch| !batch.is_empty()));

    // Reset wipes explorers and bookkeeping; reseeding the same departures
    // must replay the identical performance.
    net.reset();
    assert_eq!(net.explorer_count(), 0);
    assert_invariants(&net);
    for departure in &blueprint.explorers {
        net.add_explorer(
            departure.edge.into(),
            departure.natural_speed,
            departure.behavior,
        )
        .unwrap();
    }
    run(&mut net);

    let all = view.all_batches();
    let (first, second) = all.split_at(first_run.len());
    assert_eq!(first, second);
    assert_invariants(&net);
}
