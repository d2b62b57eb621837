//! Hand-off point to whatever plays sounds.

use crate::game::AudibleSound;
use log::info;

/// Receives every sound that is loud enough to play.
pub trait AudioSink {
    fn play(&mut self, sound: &AudibleSound);
}

/// Writes sounds to the log instead of a speaker.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl AudioSink for LoggingSink {
    fn play(&mut self, sound: &AudibleSound) {
        info!(
            "{:?} at ({:.1}, {:.1}, {:.1}), gain {:.2}",
            sound.kind, sound.position.x, sound.position.y, sound.position.z, sound.gain
        );
    }
}

/// Collects sounds for later inspection.
impl AudioSink for Vec<AudibleSound> {
    fn play(&mut self, sound: &AudibleSound) {
        self.push(*sound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use shared::SoundKind;

    #[test]
    fn test_vec_sink_records_in_order() {
        let mut sink: Vec<AudibleSound> = Vec::new();
        for gain in [0.5, 0.25] {
            sink.play(&AudibleSound {
                kind: SoundKind::Footstep,
                position: Vec3::ZERO,
                gain,
            });
        }
        assert_eq!(sink.iter().map(|s| s.gain).collect::<Vec<_>>(), vec![0.5, 0.25]);
    }
}
