//! Events delivered to the call state machine and the actions it returns.

/// One inbound call event, correlated to a `call_control_id` by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// The call was answered; creates the `CallState` if absent.
    CallAnswered { user_number: String },
    /// A playback command finished. Carries the echoed correlation token.
    PlaybackFinished { client_state: Option<String> },
    /// A recording command finished and the audio is retrievable.
    RecordingFinished { audio_url: String },
    /// A transcription job reached a terminal status.
    TranscriptionReady { job_id: String },
    /// The remote side hung up.
    CallHangup,
    /// Periodic poll tick; drives idle-timeout enforcement.
    TimerTick,
}

impl CallEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CallEvent::CallAnswered { .. } => "call_answered",
            CallEvent::PlaybackFinished { .. } => "playback_finished",
            CallEvent::RecordingFinished { .. } => "recording_finished",
            CallEvent::TranscriptionReady { .. } => "transcription_ready",
            CallEvent::CallHangup => "call_hangup",
            CallEvent::TimerTick => "timer_tick",
        }
    }
}

/// The single next external side-effect to perform for a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    PlayAudio { url: String, client_state: String },
    StartRecording { client_state: String },
    StartTranscription { audio_url: String, client_state: String },
    Hangup,
    Wait,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::PlayAudio { .. } => "play_audio",
            Action::StartRecording { .. } => "start_recording",
            Action::StartTranscription { .. } => "start_transcription",
            Action::Hangup => "hangup",
            Action::Wait => "wait",
        }
    }
}
