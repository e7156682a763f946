pub mod decode;
pub mod frame;
pub mod queue;
pub mod source;
