mod json_file_backend;
mod memory_backend;

pub use json_file_backend::JsonFileBackend;
pub use memory_backend::MemoryBackend;
