//! Geometry utilities: rotation helpers and Sim3 transforms.

pub mod sim3;
pub mod so3;

pub use sim3::Sim3;
pub use so3::{leveling_angles, rotation_increment, EulerXyz};
