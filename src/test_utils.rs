//! Snapshot builders shared by unit tests and benchmarks

#![cfg(any(test, feature = "benchmark"))]

use crate::types::{CarSample, TelemetrySnapshot};

/// Track used by the builders unless overridden.
pub const TEST_TRACK: &str = "magione";

/// Track length in meters used by the builders.
pub const TEST_TRACK_LENGTH_M: f32 = 3_400.0;

/// Fluent builder for a [`TelemetrySnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: TelemetrySnapshot,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: TelemetrySnapshot {
                track_name: TEST_TRACK.to_string(),
                track_length_m: TEST_TRACK_LENGTH_M,
                ..Default::default()
            },
        }
    }

    pub fn session(mut self, session: u32) -> Self {
        self.snapshot.session = session;
        self
    }

    pub fn track(mut self, name: &str, layout: Option<&str>) -> Self {
        self.snapshot.track_name = name.to_string();
        self.snapshot.track_layout = layout.map(str::to_string);
        self
    }

    pub fn focused(mut self, index: i32) -> Self {
        self.snapshot.focused_car = index;
        self
    }

    pub fn car(mut self, car: CarSample) -> Self {
        self.snapshot.cars.push(car);
        self
    }

    pub fn build(self) -> TelemetrySnapshot {
        self.snapshot
    }
}

/// Car with a name and last lap, placed on the leaderboard by its position.
pub fn car(name: &str, position: i32, last_lap_ms: i32) -> CarSample {
    CarSample {
        car_name: name.to_string(),
        driver_name: format!("Driver {}", position + 1),
        leaderboard_position: position,
        last_lap_ms,
        speed_ms: 40.0,
        ..Default::default()
    }
}

/// `count` cars spread evenly around the lap, the leader furthest ahead.
pub fn field(count: usize) -> TelemetrySnapshot {
    let builder = (0..count).fold(SnapshotBuilder::new(), |builder, index| {
        let position = index as i32;
        let spline = 1.0 - (index as f32 + 1.0) / (count as f32 + 1.0);
        builder.car(CarSample {
            spline_position: spline,
            lap_count: 1,
            ..car(&format!("car_{index}"), position, 90_000 + position * 250)
        })
    });
    builder.focused(0).build()
}
