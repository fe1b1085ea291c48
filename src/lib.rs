pub mod estimator;
pub mod eval;
pub mod geometry;
pub mod imu;
pub mod io;
pub mod system;
pub mod trajectory;
