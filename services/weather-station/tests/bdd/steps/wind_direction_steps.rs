//! BDD step definitions for wind direction feature

use cucumber::{then, when};
use weather_station::derived::classify_wind_direction;

use crate::world::StationWorld;

#[when(expr = "the vane reads {float} volts")]
fn vane_reads(world: &mut StationWorld, volts: f64) {
    world.direction = Some(classify_wind_direction(Some(volts)));
}

#[when("the vane has no reading")]
fn vane_missing(world: &mut StationWorld) {
    world.direction = Some(classify_wind_direction(None));
}

#[then(expr = "the wind direction should be {string}")]
fn direction_is(world: &mut StationWorld, expected: String) {
    let direction = world.direction.expect("direction not classified");
    assert_eq!(direction.to_string(), expected);
}
