pub mod audio_service;
pub mod event_sink;
