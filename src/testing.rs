use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use nalgebra::{Vector2, Vector3};

use crate::error::PropagationError;
use crate::pipeline::{Picker, PriorityClass, RenderSink};
use crate::propagation::{Propagator, StateVector};
use crate::scheduler::{Ranked, RankedSubset};
use crate::tle::{parse_catalog_number, ElementRecord};

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

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FakeHandle {
    pub id: u32,
}

/// Places object `id` at `(id, 0, 0)` unless overridden.
#[derive(Default)]
pub struct FakePropagator {
    malformed: HashSet<u32>,
    transient: HashSet<u32>,
    positions: HashMap<u32, Vector3<f64>>,
    pub calls: RefCell<Vec<u32>>,
}

impl FakePropagator {
    pub fn with_malformed(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.malformed.extend(ids);
        self
    }

    pub fn with_transient(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.transient.extend(ids);
        self
    }

    pub fn with_position(mut self, id: u32, position: Vector3<f64>) -> Self {
        self.positions.insert(id, position);
        self
    }

    pub fn take_calls(&self) -> Vec<u32> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl Propagator for FakePropagator {
    type Handle = FakeHandle;

    fn build(&self, line1: &str, _line2: &str) -> Result<FakeHandle, PropagationError> {
        let id = parse_catalog_number(line1).ok_or_else(|| PropagationError::MalformedRecord("no id".into()))?;
        if self.malformed.contains(&id) {
            return Err(PropagationError::MalformedRecord(format!("{id}")));
        }
        Ok(FakeHandle { id })
    }

    fn propagate(&self, handle: &FakeHandle, _at: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        self.calls.borrow_mut().push(handle.id);
        if self.transient.contains(&handle.id) {
            return Err(PropagationError::NoValidState(format!("{}", handle.id)));
        }
        let position = self
            .positions
            .get(&handle.id)
            .copied()
            .unwrap_or_else(|| Vector3::new(handle.id as f64, 0.0, 0.0));
        Ok(StateVector {
            position,
            velocity: Vector3::zeros(),
        })
    }
}

pub fn ranked_subset(ids: &[u32]) -> RankedSubset {
    RankedSubset::from_entries(
        ids.iter()
            .map(|&id| Ranked {
                id,
                distance_sq: id as f64 * id as f64,
                position: Vector3::new(id as f64, 0.0, 0.0),
            })
            .collect(),
    )
}

#[derive(Default)]
pub struct RecordingSink {
    pub placed: Vec<(usize, u32, PriorityClass)>,
    pub hidden: Vec<(usize, u32)>,
    pub active_len: usize,
}

impl RecordingSink {
    pub fn clear(&mut self) {
        self.placed.clear();
        self.hidden.clear();
    }
}

impl RenderSink for RecordingSink {
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

pub struct FixedPicker {
    result: Option<u32>,
    pub calls: usize,
    pub last_active_len: usize,
}

impl FixedPicker {
    pub fn new(result: Option<u32>) -> Self {
        Self {
            result,
            calls: 0,
            last_active_len: 0,
        }
    }
}

impl Picker for FixedPicker {
    fn pick(&mut self, _pointer: Vector2<f64>, active: &[u32]) -> Option<u32> {
        self.calls += 1;
        self.last_active_len = active.len();
        self.result
    }
}
