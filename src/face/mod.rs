// Face-side processing: landmark geometry to behavioral axes, and head pose
// normalization from the provider's rigid transform
pub mod head_pose;
pub mod landmarks;
pub mod signals;

pub use head_pose::{HeadPose, HeadPoseNormalizer};
pub use signals::{FaceSignalProcessor, FaceSignals};
