//! Vendor adapter tests against wiremock HTTP fakes.

use bytes::Bytes;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use morning_coffee::core::pipeline::VoiceStyle;
use morning_coffee::core::providers::{
    AssemblyAiTranscription, AudioSource, DeepgramTranscription, LlmAdapter, LlmMessage,
    OpenAiChat, OpenAiSpeech, SubmitResult, TelephonyAdapter, TelnyxTelephony,
    TranscriptionAdapter, TranscriptionCheck, TtsAdapter,
};

const TIMEOUT: Duration = Duration::from_secs(2);

fn telnyx(server: &MockServer) -> TelnyxTelephony {
    TelnyxTelephony::new("key", "conn-1", "+15557000", TIMEOUT).with_base_url(server.uri())
}

#[tokio::test]
async fn telnyx_place_call_parses_call_control_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calls"))
        .and(body_partial_json(json!({
            "connection_id": "conn-1",
            "to": "+15550100",
            "from": "+15557000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "call_control_id": "v3:abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = telnyx(&server).place_call("+15550100").await.unwrap();
    assert_eq!(id, "v3:abc");
}

#[tokio::test]
async fn telnyx_commands_treat_terminated_calls_as_no_ops() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calls/v3:gone/actions/playback_start"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calls/v3:gone/actions/record_start"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calls/v3:gone/actions/hangup"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = telnyx(&server);
    adapter
        .play_audio("v3:gone", "http://cdn.test/a.mp3", "token")
        .await
        .unwrap();
    adapter.start_recording("v3:gone", "token").await.unwrap();
    adapter.hangup("v3:gone").await.unwrap();
}

#[tokio::test]
async fn telnyx_server_errors_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calls/v3:abc/actions/playback_start"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = telnyx(&server)
        .play_audio("v3:abc", "http://cdn.test/a.mp3", "token")
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn telnyx_sends_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(json!({
            "to": "+15550100",
            "text": "Good morning!"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    telnyx(&server)
        .send_message("+15550100", "Good morning!")
        .await
        .unwrap();
}

#[tokio::test]
async fn telnyx_stop_recording_hits_record_stop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calls/v3:abc/actions/record_stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    telnyx(&server).stop_recording("v3:abc").await.unwrap();
}

#[tokio::test]
async fn assemblyai_submits_urls_and_polls_to_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcript"))
        .and(body_partial_json(json!({ "audio_url": "http://rec.test/a.mp3" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t-1", "status": "queued"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/transcript/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t-1", "status": "completed", "text": "I am capable"
        })))
        .mount(&server)
        .await;

    let adapter =
        AssemblyAiTranscription::new("key", TIMEOUT).with_base_url(server.uri());
    assert!(!adapter.is_synchronous());

    let submitted = adapter
        .submit(&AudioSource::Url("http://rec.test/a.mp3".to_string()))
        .await
        .unwrap();
    let job_ref = match submitted {
        SubmitResult::Queued { job_ref } => job_ref,
        other => panic!("expected queued job, got {other:?}"),
    };
    assert_eq!(job_ref, "t-1");

    match adapter.check(&job_ref).await.unwrap() {
        TranscriptionCheck::Completed { text } => assert_eq!(text, "I am capable"),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn assemblyai_uploads_raw_bytes_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "upload_url": "http://cdn.assembly.test/u-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/transcript"))
        .and(body_partial_json(json!({ "audio_url": "http://cdn.assembly.test/u-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "t-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter =
        AssemblyAiTranscription::new("key", TIMEOUT).with_base_url(server.uri());
    let submitted = adapter
        .submit(&AudioSource::Bytes(Bytes::from_static(b"\x00\x01")))
        .await
        .unwrap();
    assert!(matches!(submitted, SubmitResult::Queued { job_ref } if job_ref == "t-2"));
}

#[tokio::test]
async fn assemblyai_reports_provider_side_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript/t-err"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t-err", "status": "error", "error": "audio too short"
        })))
        .mount(&server)
        .await;

    let adapter =
        AssemblyAiTranscription::new("key", TIMEOUT).with_base_url(server.uri());
    match adapter.check("t-err").await.unwrap() {
        TranscriptionCheck::Failed { detail } => assert_eq!(detail, "audio too short"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn deepgram_resolves_terminally_at_submit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/listen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "channels": [ { "alternatives": [ { "transcript": "I am capable" } ] } ]
            }
        })))
        .mount(&server)
        .await;

    let adapter = DeepgramTranscription::new("key", TIMEOUT).with_base_url(server.uri());
    assert!(adapter.is_synchronous());

    let submitted = adapter
        .submit(&AudioSource::Url("http://rec.test/a.mp3".to_string()))
        .await
        .unwrap();
    assert!(matches!(submitted, SubmitResult::Completed { text } if text == "I am capable"));

    // No poll shape exists for pre-recorded jobs.
    assert!(adapter.check("anything").await.is_err());
}

#[tokio::test]
async fn openai_chat_extracts_and_trims_the_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "  Good morning!\n" } } ]
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiChat::new("key", "gpt-4o-mini", TIMEOUT).with_base_url(server.uri());
    let reply = adapter
        .complete(&[LlmMessage::new("user", "hello")])
        .await
        .unwrap();
    assert_eq!(reply, "Good morning!");
}

#[tokio::test]
async fn openai_chat_rate_limits_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let adapter = OpenAiChat::new("key", "gpt-4o-mini", TIMEOUT).with_base_url(server.uri());
    let err = adapter
        .complete(&[LlmMessage::new("user", "hello")])
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn openai_speech_returns_audio_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini-tts",
            "voice": "alloy",
            "input": "Good morning!",
            "response_format": "mp3"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".as_slice()),
        )
        .mount(&server)
        .await;

    let adapter = OpenAiSpeech::new("key", "gpt-4o-mini-tts", "alloy", TIMEOUT)
        .with_base_url(server.uri());
    let audio = adapter
        .synthesize("Good morning!", &VoiceStyle::resolve("warm"))
        .await
        .unwrap();
    assert_eq!(audio.as_ref(), b"mp3-bytes");

    let voices = adapter.list_voices().await.unwrap();
    assert!(voices.contains(&"alloy".to_string()));
}

#[tokio::test]
async fn health_checks_reflect_endpoint_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/calls"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let llm = OpenAiChat::new("key", "gpt-4o-mini", TIMEOUT).with_base_url(server.uri());
    assert!(llm.health_check().await.is_healthy());

    let telephony = telnyx(&server);
    assert!(!telephony.health_check().await.is_healthy());
}
