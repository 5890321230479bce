mod buffer;

pub use buffer::AudioInput;
