pub mod euroc;

pub use euroc::{load_groundtruth_csv, load_imu_csv, EurocSequence};
