use super::ServerConfig;

/// Reject configurations that would put the call flow into an unrecoverable
/// state at the first answered call rather than at startup.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.greeting_audio_url.trim().is_empty() {
        return Err("GREETING_AUDIO_URL must be set to a playable audio URL".into());
    }
    if config.chat_intro_audio_url.trim().is_empty() {
        return Err("CHAT_INTRO_AUDIO_URL must be set to a playable audio URL".into());
    }
    if config.public_url.trim().is_empty() {
        return Err("PUBLIC_URL must be set so the telephony provider can fetch audio".into());
    }
    match config.after_response.as_str() {
        "hangup" | "continue" => {}
        other => {
            return Err(format!(
                "Invalid AFTER_RESPONSE '{other}'. Must be 'hangup' or 'continue'"
            )
            .into());
        }
    }
    if config.after_response == "continue" && config.max_chat_turns == 0 {
        return Err("MAX_CHAT_TURNS must be at least 1 when AFTER_RESPONSE is 'continue'".into());
    }
    if config.poll_interval_seconds == 0 {
        return Err("POLL_INTERVAL_SECONDS must be at least 1".into());
    }
    Ok(())
}
