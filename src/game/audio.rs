//! Fire-and-forget audio clips.

/// Every clip the game can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Map,
    InitBattle,
    Battle,
    TackleHit,
    FireballHit,
    InitFireball,
    Victory,
}

/// Audio playback as seen by the game: no callbacks, no failures.
pub trait AudioSink {
    fn play(&mut self, sound: Sound);
    fn stop(&mut self, sound: Sound);
}

/// Sink that only logs, for builds without an audio backend.
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&mut self, sound: Sound) {
        log::debug!("audio: play {sound:?}");
    }

    fn stop(&mut self, sound: Sound) {
        log::debug!("audio: stop {sound:?}");
    }
}
