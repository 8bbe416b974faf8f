//! Generative audio on the device clock.
//!
//! The game core never blocks on audio: it pokes a shared sequencer state and
//! the cpal output callback renders from it. The beat counter counts rendered
//! frames, so the music loop is timed by the hardware clock rather than the
//! game's tick queue. No output device (or an unsupported sample format)
//! degrades every call to a silent no-op.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rand::Rng;
use std::sync::{Arc, Mutex};

use crate::config::AudioConfig;

/// Sound surface the game drives. `AudioEngine` is the real one; `NullAudio`
/// keeps headless runs and tests silent.
pub trait AudioBackend {
    fn start_music(&mut self);
    fn stop_music(&mut self);
    /// Flips the mute flag and returns the new value. Muting silences the
    /// loop; unmuting resumes it only if music was already meant to play.
    fn toggle_mute(&mut self) -> bool;
    fn play_pop(&mut self);
    fn play_hit(&mut self);
    fn play_game_over(&mut self);
}

#[derive(Debug, Default)]
pub struct NullAudio {
    muted: bool,
}

impl AudioBackend for NullAudio {
    fn start_music(&mut self) {}
    fn stop_music(&mut self) {}
    fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }
    fn play_pop(&mut self) {}
    fn play_hit(&mut self) {}
    fn play_game_over(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Waveform {
    Sine,
    Sawtooth,
    Triangle,
}

/// One-shot envelope generators. Effects reproduce the arcade sweeps; notes
/// carry their pitch from the sequencer.
#[derive(Debug, Clone, Copy, PartialEq)]
enum VoiceKind {
    Pop,
    Hit,
    GameOver,
    Note { freq: f32, dur: f32 },
}

#[derive(Debug)]
struct Voice {
    kind: VoiceKind,
    t: f32,
    phase: f32,
}

impl Voice {
    fn new(kind: VoiceKind) -> Self {
        Self {
            kind,
            t: 0.0,
            phase: 0.0,
        }
    }

    fn duration(&self) -> f32 {
        match self.kind {
            VoiceKind::Pop => 0.1,
            VoiceKind::Hit => 0.15,
            VoiceKind::GameOver => 0.6,
            VoiceKind::Note { dur, .. } => dur,
        }
    }

    fn waveform(&self) -> Waveform {
        match self.kind {
            VoiceKind::Pop => Waveform::Sine,
            VoiceKind::Hit => Waveform::Sawtooth,
            VoiceKind::GameOver | VoiceKind::Note { .. } => Waveform::Triangle,
        }
    }

    fn freq_at(&self, t: f32) -> f32 {
        match self.kind {
            // 400 Hz rising exponentially to 800 Hz
            VoiceKind::Pop => 400.0 * (800.0_f32 / 400.0).powf(t / 0.1),
            // 300 Hz falling exponentially to 50 Hz
            VoiceKind::Hit => 300.0 * (50.0_f32 / 300.0).powf(t / 0.15),
            // two-stage slide: 400 -> 200 -> 100
            VoiceKind::GameOver => {
                if t < 0.3 {
                    400.0 - 200.0 * (t / 0.3)
                } else {
                    200.0 - 100.0 * ((t - 0.3) / 0.3)
                }
            }
            VoiceKind::Note { freq, .. } => freq,
        }
    }

    fn gain_at(&self, t: f32) -> f32 {
        match self.kind {
            VoiceKind::Pop => 0.3 * (0.01_f32 / 0.3).powf(t / 0.1),
            VoiceKind::Hit => 0.3 * (1.0 - t / 0.15),
            VoiceKind::GameOver => 0.4 * (1.0 - t / 0.6),
            VoiceKind::Note { dur, .. } => {
                let attack = 0.05_f32.min(dur / 2.0);
                if t < attack {
                    0.05 * (t / attack)
                } else {
                    0.05 * (1.0 - (t - attack) / (dur - attack).max(f32::EPSILON))
                }
            }
        }
    }

    fn finished(&self) -> bool {
        self.t >= self.duration()
    }

    /// Renders one mono sample and advances the voice by `dt` seconds.
    fn sample(&mut self, dt: f32) -> f32 {
        if self.finished() {
            return 0.0;
        }
        let t = self.t;
        self.phase = (self.phase + self.freq_at(t) * dt).fract();
        let raw = match self.waveform() {
            Waveform::Sine => (self.phase * std::f32::consts::TAU).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
        };
        self.t += dt;
        raw * self.gain_at(t).max(0.0)
    }
}

/// Shared state between the game thread and the device callback. All timing
/// in here is in seconds of rendered audio.
#[derive(Debug)]
struct SequencerState {
    muted: bool,
    /// The game asked for music; survives mute so unmute can resume.
    music_requested: bool,
    /// The loop is actually emitting notes.
    music_running: bool,
    pitches_hz: Vec<f32>,
    beat_secs: f32,
    note_secs: f32,
    /// Rendered-audio seconds until the next note fires.
    next_note_in: f32,
    voices: Vec<Voice>,
}

impl SequencerState {
    fn new(cfg: &AudioConfig) -> Self {
        Self {
            muted: false,
            music_requested: false,
            music_running: false,
            pitches_hz: cfg.pitches_hz.clone(),
            beat_secs: cfg.beat_ms as f32 / 1000.0,
            note_secs: cfg.note_ms as f32 / 1000.0,
            next_note_in: 0.0,
            voices: Vec::new(),
        }
    }

    fn start_music(&mut self) {
        self.music_requested = true;
        if self.muted || self.music_running {
            return;
        }
        self.music_running = true;
        self.next_note_in = 0.0;
    }

    fn stop_music(&mut self) {
        self.music_requested = false;
        self.music_running = false;
        // halt sounding and pending notes; one-shot effects ring out
        self.voices
            .retain(|v| !matches!(v.kind, VoiceKind::Note { .. }));
    }

    fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if self.muted {
            self.music_running = false;
            self.voices.clear();
        } else if self.music_requested {
            self.music_running = true;
            self.next_note_in = 0.0;
        }
        self.muted
    }

    fn trigger(&mut self, kind: VoiceKind) {
        if self.muted {
            return;
        }
        self.voices.push(Voice::new(kind));
    }

    /// Renders one mono sample; `dt` is the sample period. The beat counter
    /// only moves with rendered frames, which keeps the loop on the device
    /// clock and makes drift self-correcting.
    fn render(&mut self, dt: f32, rng: &mut impl Rng) -> f32 {
        if self.music_running && !self.pitches_hz.is_empty() {
            self.next_note_in -= dt;
            if self.next_note_in <= 0.0 {
                let freq = self.pitches_hz[rng.gen_range(0..self.pitches_hz.len())];
                self.voices.push(Voice::new(VoiceKind::Note {
                    freq,
                    dur: self.note_secs,
                }));
                self.next_note_in += self.beat_secs;
                // a long device stall yields one catch-up note, not a burst
                if self.next_note_in < 0.0 {
                    self.next_note_in = self.beat_secs;
                }
            }
        }
        let mut out = 0.0;
        for voice in &mut self.voices {
            out += voice.sample(dt);
        }
        self.voices.retain(|v| !v.finished());
        out.clamp(-1.0, 1.0)
    }
}

/// cpal-backed implementation. Holds the stream alive for its own lifetime;
/// dropping the engine tears the stream down.
pub struct AudioEngine {
    state: Arc<Mutex<SequencerState>>,
    _stream: Option<cpal::Stream>,
}

impl AudioEngine {
    pub fn new(cfg: &AudioConfig) -> Self {
        let state = Arc::new(Mutex::new(SequencerState::new(cfg)));
        let stream = Self::open_stream(Arc::clone(&state));
        Self {
            state,
            _stream: stream,
        }
    }

    fn open_stream(state: Arc<Mutex<SequencerState>>) -> Option<cpal::Stream> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;
        let dt = 1.0 / config.sample_rate().0 as f32;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let config: cpal::StreamConfig = config.into();
                let channels = config.channels as usize;
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            let mut rng = rand::thread_rng();
                            let mut state = state.lock().unwrap();
                            for frame in data.chunks_mut(channels) {
                                let s = state.render(dt, &mut rng);
                                for out in frame {
                                    *out = s;
                                }
                            }
                        },
                        |_err| {},
                        None,
                    )
                    .ok()?
            }
            cpal::SampleFormat::I16 => {
                let config: cpal::StreamConfig = config.into();
                let channels = config.channels as usize;
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            let mut rng = rand::thread_rng();
                            let mut state = state.lock().unwrap();
                            for frame in data.chunks_mut(channels) {
                                let s = state.render(dt, &mut rng);
                                let s = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
                                for out in frame {
                                    *out = s;
                                }
                            }
                        },
                        |_err| {},
                        None,
                    )
                    .ok()?
            }
            _ => return None,
        };

        stream.play().ok()?;
        Some(stream)
    }
}

impl AudioBackend for AudioEngine {
    fn start_music(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.start_music();
        }
    }

    fn stop_music(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.stop_music();
        }
    }

    fn toggle_mute(&mut self) -> bool {
        self.state
            .lock()
            .map(|mut s| s.toggle_mute())
            .unwrap_or(false)
    }

    fn play_pop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.trigger(VoiceKind::Pop);
        }
    }

    fn play_hit(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.trigger(VoiceKind::Hit);
        }
    }

    fn play_game_over(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.trigger(VoiceKind::GameOver);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> SequencerState {
        SequencerState::new(&AudioConfig::default())
    }

    fn note_count(state: &SequencerState) -> usize {
        state
            .voices
            .iter()
            .filter(|v| matches!(v.kind, VoiceKind::Note { .. }))
            .count()
    }

    #[test]
    fn start_music_arms_and_runs() {
        let mut state = test_state();
        state.start_music();
        assert!(state.music_requested);
        assert!(state.music_running);
    }

    #[test]
    fn start_music_while_muted_only_arms() {
        let mut state = test_state();
        state.muted = true;
        state.start_music();
        assert!(state.music_requested);
        assert!(!state.music_running);
    }

    #[test]
    fn unmute_resumes_only_requested_music() {
        let mut state = test_state();
        state.start_music();

        assert!(state.toggle_mute());
        assert!(!state.music_running);

        assert!(!state.toggle_mute());
        assert!(state.music_running, "unmute resumes a requested loop");
    }

    #[test]
    fn unmute_does_not_start_unrequested_music() {
        let mut state = test_state();
        state.toggle_mute();
        state.toggle_mute();
        assert!(!state.music_running);
    }

    #[test]
    fn stop_music_halts_notes_but_lets_effects_ring_out() {
        let mut state = test_state();
        state.start_music();
        let mut rng = rand::thread_rng();
        state.render(0.001, &mut rng); // first beat fires immediately
        state.trigger(VoiceKind::GameOver);
        assert!(note_count(&state) > 0);

        state.stop_music();
        assert_eq!(note_count(&state), 0);
        assert_eq!(state.voices.len(), 1, "game-over voice survives");
        assert!(!state.music_requested);
    }

    #[test]
    fn trigger_is_a_noop_while_muted() {
        let mut state = test_state();
        state.toggle_mute();
        state.trigger(VoiceKind::Pop);
        assert!(state.voices.is_empty());
    }

    #[test]
    fn notes_fire_one_per_beat_of_rendered_audio() {
        let mut state = test_state();
        state.note_secs = 0.01; // keep voices short so spawn counting is easy
        state.start_music();
        let mut rng = rand::thread_rng();

        let dt = 1.0 / 1000.0;
        let mut spawned = 0;
        let mut last = 0;
        // 900 ms of audio at a 250 ms beat: the immediate note plus three
        for _ in 0..900 {
            state.render(dt, &mut rng);
            let now = note_count(&state);
            if now > last {
                spawned += 1;
            }
            last = now;
        }
        assert_eq!(spawned, 4);
    }

    #[test]
    fn beat_catches_up_without_bursting_after_a_stall() {
        let mut state = test_state();
        state.start_music();
        let mut rng = rand::thread_rng();

        // a single huge dt simulates the device stalling for many beats
        state.render(2.0, &mut rng);
        assert_eq!(note_count(&state), 1);
        assert!(state.next_note_in > 0.0);
    }

    #[test]
    fn pop_voice_finishes_after_its_sweep() {
        let mut voice = Voice::new(VoiceKind::Pop);
        let dt = 1.0 / 44_100.0;
        let mut samples = 0;
        while !voice.finished() {
            voice.sample(dt);
            samples += 1;
            assert!(samples < 10_000, "pop must end near 100ms");
        }
        assert!((samples as f32 * dt - 0.1).abs() < 0.01);
    }

    #[test]
    fn hit_gain_decays_to_silence() {
        let voice = Voice::new(VoiceKind::Hit);
        assert!(voice.gain_at(0.0) > voice.gain_at(0.1));
        assert!(voice.gain_at(0.15) <= 0.0 + f32::EPSILON);
    }

    #[test]
    fn game_over_slides_down_in_two_stages() {
        let voice = Voice::new(VoiceKind::GameOver);
        assert_eq!(voice.freq_at(0.0), 400.0);
        assert!((voice.freq_at(0.3) - 200.0).abs() < 1.0);
        assert!((voice.freq_at(0.6) - 100.0).abs() < 1.0);
    }

    #[test]
    fn note_envelope_rises_then_falls() {
        let voice = Voice::new(VoiceKind::Note {
            freq: 523.25,
            dur: 0.2,
        });
        assert!(voice.gain_at(0.0) < voice.gain_at(0.05));
        assert!(voice.gain_at(0.05) > voice.gain_at(0.19));
    }

    #[test]
    fn null_audio_toggles_mute() {
        let mut audio = NullAudio::default();
        assert!(audio.toggle_mute());
        assert!(!audio.toggle_mute());
    }

    #[test]
    fn empty_pitch_set_never_spawns_notes() {
        let mut state = SequencerState::new(&AudioConfig {
            pitches_hz: vec![],
            beat_ms: 250,
            note_ms: 200,
        });
        state.start_music();
        let mut rng = rand::thread_rng();
        state.render(1.0, &mut rng);
        assert!(state.voices.is_empty());
    }
}
