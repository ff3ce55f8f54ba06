pub mod index;
pub mod metadata;
pub mod repository;
pub mod wav_writer;
