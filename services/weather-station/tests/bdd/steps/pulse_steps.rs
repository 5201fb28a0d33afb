//! BDD step definitions for pulse accumulator feature

use std::time::{Duration, Instant};

use cucumber::{given, then, when};
use weather_station::PulseAccumulator;

use crate::world::StationWorld;

fn edge_at(world: &mut StationWorld, offset_ms: u64) -> Instant {
    let base = *world.base_instant.get_or_insert_with(Instant::now);
    base + Duration::from_millis(offset_ms)
}

#[given(expr = "a pulse accumulator with a {int} ms debounce")]
fn accumulator_with_debounce(world: &mut StationWorld, debounce_ms: u64) {
    world.accumulator = Some(PulseAccumulator::new(Duration::from_millis(debounce_ms)));
    world.base_instant = Some(Instant::now());
}

#[when(expr = "edges arrive at {string} ms")]
fn edges_arrive(world: &mut StationWorld, offsets: String) {
    let offsets: Vec<u64> = offsets
        .split(',')
        .map(|s| s.trim().parse().expect("edge offset"))
        .collect();
    for offset in offsets {
        let edge = edge_at(world, offset);
        world
            .accumulator
            .as_ref()
            .expect("accumulator not set")
            .accept(edge);
    }
}

#[when("the accumulator is drained")]
fn drain(world: &mut StationWorld) {
    let count = world
        .accumulator
        .as_ref()
        .expect("accumulator not set")
        .drain();
    world.drained = Some(count);
}

#[then(expr = "{int} edges should be counted")]
fn edges_counted(world: &mut StationWorld, expected: u32) {
    let count = world
        .accumulator
        .as_ref()
        .expect("accumulator not set")
        .count();
    assert_eq!(count, expected);
}

#[then(expr = "the drain should return {int}")]
fn drain_returned(world: &mut StationWorld, expected: u32) {
    assert_eq!(world.drained, Some(expected));
}
