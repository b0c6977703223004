use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "degenerate or non-finite bounding box: {:?}", _0)]
    InvalidBBox([f32; 4]),

    #[error(display = "keypoint matrix must have 3 columns (x, y, score), got {}", _0)]
    KeypointShape(usize),

    #[error(display = "cannot derive a bounding box from an empty keypoint set")]
    EmptyKeypoints,

    #[error(display = "action classifier failed: {}", _0)]
    Classifier(String),
}
