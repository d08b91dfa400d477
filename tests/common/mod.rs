//! Fixtures shared by the integration tests. Mirrors `src/testing.rs`, which
//! is `#[cfg(test)]` and not visible from here; keep the two in step.

#![allow(dead_code)]

use std::cell::Cell;

use chrono::{DateTime, Utc};
use nalgebra::{Vector2, Vector3};

use satcat_engine::tle::parse_catalog_number;
use satcat_engine::{ElementRecord, Picker, PriorityClass, PropagationError, Propagator, RenderSink, StateVector};

pub fn line1(id: u32, epoch_yy: u32) -> String {
    format!("1 {id:05}U 20001A   {epoch_yy:02}001.00000000  .00000000  00000-0  00000-0 0  9990")
}

pub fn line2(id: u32, mean_motion: f64) -> String {
    format!("2 {id:05}  53.0000 100.0000 0001000  90.0000 270.0000 {mean_motion:11.8}000010")
}

pub fn record(id: u32, name: &str) -> ElementRecord {
    orbit_record(id, name, 24, 15.5)
}

pub fn orbit_record(id: u32, name: &str, epoch_yy: u32, mean_motion: f64) -> ElementRecord {
    ElementRecord::new(id, name, line1(id, epoch_yy), line2(id, mean_motion))
}

/// Object `id` sits at `(id, 0, 0)`; ids listed in `failing` never propagate.
#[derive(Default)]
pub struct LinePropagator {
    pub failing: Vec<u32>,
    pub calls: Cell<usize>,
}

impl Propagator for LinePropagator {
    type Handle = u32;

    fn build(&self, line1: &str, _line2: &str) -> Result<u32, PropagationError> {
        parse_catalog_number(line1).ok_or_else(|| PropagationError::MalformedRecord(line1.to_string()))
    }

    fn propagate(&self, id: &u32, _at: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.contains(id) {
            return Err(PropagationError::NoValidState(id.to_string()));
        }
        Ok(StateVector {
            position: Vector3::new(*id as f64, 0.0, 0.0),
            velocity: Vector3::zeros(),
        })
    }
}

#[derive(Default)]
pub struct Recorder {
    pub placed: Vec<(usize, u32, PriorityClass)>,
    pub hidden: Vec<(usize, u32)>,
    pub active_len: usize,
}

impl Recorder {
    pub fn clear(&mut self) {
        self.placed.clear();
        self.hidden.clear();
    }
}

impl RenderSink for Recorder {
    fn place(&mut self, slot: usize, id: u32, _position: Vector3<f64>, class: PriorityClass) {
        self.placed.push((slot, id, class));
    }

    fn hide(&mut self, slot: usize, id: u32) {
        self.hidden.push((slot, id));
    }

    fn set_active_len(&mut self, len: usize) {
        self.active_len = len;
    }
}

pub struct NoPick;

impl Picker for NoPick {
    fn pick(&mut self, _pointer: Vector2<f64>, _active: &[u32]) -> Option<u32> {
        None
    }
}
