pub mod level_meter;
pub mod wav_format;
