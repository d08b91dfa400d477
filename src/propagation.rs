//! Propagation collaborator.
//!
//! The engine never does orbital mechanics itself: it builds an opaque handle
//! per element record once, then asks for a state vector at a time point.
//! `Sgp4Propagator` is the production implementation on top of the `sgp4` crate.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use crate::error::PropagationError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

pub trait Propagator {
    type Handle;

    fn build(&self, line1: &str, line2: &str) -> Result<Self::Handle, PropagationError>;

    fn propagate(&self, handle: &Self::Handle, at: DateTime<Utc>) -> Result<StateVector, PropagationError>;
}

#[derive(Clone)]
pub struct Sgp4Handle {
    constants: sgp4::Constants,
    epoch_minutes: f64,
}

impl Sgp4Handle {
    pub fn epoch_minutes(&self) -> f64 {
        self.epoch_minutes
    }
}

/// SGP4 in the TEME frame, positions in km and velocities in km/s.
///
/// With `y_up` set the axes are remapped to `(x, z, -y)`, matching a renderer
/// whose vertical axis is y.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sgp4Propagator {
    pub y_up: bool,
}

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn y_up() -> Self {
        Self { y_up: true }
    }

    fn axes(&self, v: [f64; 3]) -> Vector3<f64> {
        if self.y_up {
            Vector3::new(v[0], v[2], -v[1])
        } else {
            Vector3::new(v[0], v[1], v[2])
        }
    }
}

pub fn datetime_to_minutes(dt: &sgp4::chrono::NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / 60_000.0
}

pub fn timestamp_to_minutes(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 60_000.0
}

impl Propagator for Sgp4Propagator {
    type Handle = Sgp4Handle;

    fn build(&self, line1: &str, line2: &str) -> Result<Sgp4Handle, PropagationError> {
        let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| PropagationError::MalformedRecord(e.to_string()))?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| PropagationError::MalformedRecord(e.to_string()))?;
        Ok(Sgp4Handle {
            constants,
            epoch_minutes: datetime_to_minutes(&elements.datetime),
        })
    }

    fn propagate(&self, handle: &Sgp4Handle, at: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let minutes_since_epoch = timestamp_to_minutes(at) - handle.epoch_minutes;
        let prediction = handle
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes_since_epoch))
            .map_err(|e| PropagationError::NoValidState(e.to_string()))?;
        let position = self.axes(prediction.position);
        if !position.iter().all(|c| c.is_finite()) {
            return Err(PropagationError::NoValidState("non-finite position".to_string()));
        }
        Ok(StateVector {
            position,
            velocity: self.axes(prediction.velocity),
        })
    }
}
