pub mod buffer;
pub mod decode;
pub mod features;
pub mod fft;
pub mod preprocess;
