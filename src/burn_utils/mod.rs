pub mod distribution;
pub mod grad_clip;
pub mod sequence;
pub mod tensor;
pub use grad_clip::*;
pub use sequence::*;
pub use tensor::*;
