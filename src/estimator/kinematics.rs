//! First-order strapdown velocity/position integration.
//!
//! The damping constants were tuned against plain Euler steps; swapping in a
//! higher-order scheme changes their effect.

use nalgebra::{UnitQuaternion, Vector3};

use super::config::EstimatorConfig;

#[derive(Debug, Clone)]
pub struct KinematicIntegrator {
    gravity: Vector3<f64>,
    velocity_leak: f64,
    stationary_velocity_decay: f64,
    stationary_accel_suppression: f64,
}

impl KinematicIntegrator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            gravity: Vector3::new(0.0, 0.0, config.gravity_magnitude),
            velocity_leak: config.velocity_leak,
            stationary_velocity_decay: config.stationary_velocity_decay,
            stationary_accel_suppression: config.stationary_accel_suppression,
        }
    }

    /// Body-frame specific force rotated into the world frame, gravity removed
    /// when the stream carries it.
    pub fn world_acceleration(
        &self,
        orientation: &UnitQuaternion<f64>,
        accel_body: &Vector3<f64>,
        subtract_gravity: bool,
    ) -> Vector3<f64> {
        let accel_world = orientation * accel_body;
        if subtract_gravity {
            accel_world - self.gravity
        } else {
            accel_world
        }
    }

    /// Advance velocity and position by one step.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &self,
        orientation: &UnitQuaternion<f64>,
        velocity: &mut Vector3<f64>,
        position: &mut Vector3<f64>,
        accel_body: &Vector3<f64>,
        dt: f64,
        subtract_gravity: bool,
        stationary: bool,
    ) {
        let mut accel_world = self.world_acceleration(orientation, accel_body, subtract_gravity);

        if stationary {
            *velocity *= self.stationary_velocity_decay;
            accel_world *= self.stationary_accel_suppression;
        }

        *velocity += accel_world * dt;
        *velocity *= self.velocity_leak;
        *position += *velocity * dt;
    }
}
