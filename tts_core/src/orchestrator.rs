//! Speech generation pipeline.
//!
//! One call to [`SpeechOrchestrator::generate_speech`] runs, in order:
//! optional style scripting, chunking (plain text) or a length check
//! (markup), one remote call per unit, then assembly. Units are synthesized
//! strictly one after another so the cancellation token is observed between
//! every pair of calls and fragments never need reordering.
//!
//! Configuration and the cancellation token are passed per call; the
//! orchestrator itself holds no mutable state, so two generations on the
//! same instance never interfere.

use std::sync::Arc;
use std::time::Instant;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{validate_styled_script, SpeechApi, StyleScripter, SynthesisCall, SynthesisInput};
use crate::audio::{merge_fragments, single_fragment, AudioFragment, GeneratedAudio};
use crate::chunker::split_text_into_chunks;
use crate::config::{GenerationLimits, TtsConfig};
use crate::error::{Result, TtsError};
use crate::local::{map_pitch, pick_local_voice, LocalSynthesizer, Utterance};
use crate::progress::ProgressEvent;
use crate::request::SpeechRequest;
use crate::voice::{requires_markup, Voice};

/// Result of [`SpeechOrchestrator::synthesize`].
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Audio(GeneratedAudio),
    /// Spoken on the local engine; there is no buffer to return.
    PlayedLocally,
}

/// Item of [`SpeechOrchestrator::generate_speech_stream`].
#[derive(Debug)]
pub enum GenerationUpdate {
    Progress(ProgressEvent),
    Finished(Result<GeneratedAudio>),
}

pub struct SpeechOrchestrator {
    api: Arc<dyn SpeechApi>,
    scripter: Option<Arc<dyn StyleScripter>>,
    local: Option<Arc<dyn LocalSynthesizer>>,
    limits: GenerationLimits,
}

impl SpeechOrchestrator {
    pub fn new(api: Arc<dyn SpeechApi>) -> Self {
        Self {
            api,
            scripter: None,
            local: None,
            limits: GenerationLimits::default(),
        }
    }

    #[must_use]
    pub fn with_style_scripter(mut self, scripter: Arc<dyn StyleScripter>) -> Self {
        self.scripter = Some(scripter);
        self
    }

    #[must_use]
    pub fn with_local_synthesizer(mut self, local: Arc<dyn LocalSynthesizer>) -> Self {
        self.local = Some(local);
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> GenerationLimits {
        self.limits
    }

    pub fn has_style_scripter(&self) -> bool {
        self.scripter.is_some()
    }

    /// Generate one audio buffer for `request` through the remote API.
    ///
    /// Fails with `Configuration` before any network call when no key is
    /// set or the voice has no API name. Cancelling `cancel` aborts before
    /// the next remote call or before assembly and never yields partial
    /// audio.
    pub async fn generate_speech<F>(
        &self,
        config: &TtsConfig,
        request: &SpeechRequest,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<GeneratedAudio>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        if !config.is_configured() {
            return Err(TtsError::Configuration("API key not configured.".to_string()));
        }
        let voice_name = match request.voice.api_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(TtsError::Configuration(format!(
                    "Voice '{}' is not available through the API.",
                    request.voice.id
                )))
            }
        };
        request.validate()?;

        let started = Instant::now();
        let mut effective_text = request.text.clone();
        let mut is_ssml = request.is_ssml;

        if let Some(instructions) = request.effective_style_instructions() {
            on_progress(ProgressEvent::GeneratingScript);
            effective_text = self
                .generate_styled_script(&request.text, instructions, &request.voice)
                .await?;
            is_ssml = true;
        }

        let audio = if is_ssml {
            self.generate_markup(config, request, voice_name, effective_text, cancel, &mut on_progress)
                .await?
        } else {
            self.generate_chunked(config, request, voice_name, &effective_text, cancel, &mut on_progress)
                .await?
        };

        on_progress(ProgressEvent::Done);
        info!(
            voice = %request.voice.id,
            fragments = audio.fragment_count,
            bytes = audio.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "speech generated"
        );
        Ok(audio)
    }

    /// Pull-style variant of [`generate_speech`](Self::generate_speech):
    /// yields every progress event, then exactly one `Finished`.
    pub fn generate_speech_stream<'a>(
        &'a self,
        config: TtsConfig,
        request: SpeechRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = GenerationUpdate> + Send + 'a {
        enum Step {
            Event(ProgressEvent),
            Finished(Result<GeneratedAudio>),
        }

        async_stream::stream! {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let generation = self.generate_speech(&config, &request, &cancel, move |event| {
                let _ = tx.send(event);
            });
            tokio::pin!(generation);

            loop {
                let step = tokio::select! {
                    biased;
                    Some(event) = rx.recv() => Step::Event(event),
                    result = &mut generation => Step::Finished(result),
                };
                match step {
                    Step::Event(event) => yield GenerationUpdate::Progress(event),
                    Step::Finished(result) => {
                        while let Ok(event) = rx.try_recv() {
                            yield GenerationUpdate::Progress(event);
                        }
                        yield GenerationUpdate::Finished(result);
                        break;
                    }
                }
            }
        }
    }

    /// Remote generation when possible, local playback otherwise.
    ///
    /// The local engine is used when no key is configured or the request
    /// opts out. A configured key with a voice lacking an API name is a
    /// `Configuration` error; the caller decides whether to fall back.
    pub async fn synthesize<F>(
        &self,
        config: &TtsConfig,
        request: &SpeechRequest,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<SynthesisOutcome>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        if request.prefer_local || !config.is_configured() {
            debug!(voice = %request.voice.id, "using local speech engine");
            self.speak_locally(request, cancel).await?;
            return Ok(SynthesisOutcome::PlayedLocally);
        }
        self.generate_speech(config, request, cancel, on_progress)
            .await
            .map(SynthesisOutcome::Audio)
    }

    /// Speak `request` on the local engine, resolving when playback ends.
    ///
    /// Markup is not interpreted and no progress is reported.
    pub async fn speak_locally(&self, request: &SpeechRequest, cancel: &CancellationToken) -> Result<()> {
        let engine = match self.local.as_ref() {
            Some(engine) if !request.text.trim().is_empty() => engine,
            _ => {
                return Err(TtsError::Synthesis(
                    "Speech synthesis not available or text is empty.".to_string(),
                ))
            }
        };

        engine.stop();
        let voice = pick_local_voice(
            &engine.voices(),
            request.voice_id(),
            request.voice.region.language_prefix(),
        );
        let utterance = Utterance {
            text: request.text.clone(),
            voice,
            rate: request.speaking_rate(),
            pitch: map_pitch(request.pitch()),
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                engine.stop();
                Err(TtsError::Cancelled)
            }
            result = engine.speak(utterance) => result,
        }
    }

    async fn generate_styled_script(&self, text: &str, instructions: &str, voice: &Voice) -> Result<String> {
        let scripter = self.scripter.as_ref().ok_or_else(|| {
            TtsError::ScriptGeneration(
                "Style scripting is not configured. Please configure the API key.".to_string(),
            )
        })?;

        let raw = scripter
            .generate_styled_script(text, instructions, &voice.profile())
            .await
            .map_err(|e| match e {
                TtsError::ScriptGeneration(_) => e,
                other => TtsError::ScriptGeneration(format!(
                    "An error occurred while generating the voice style script with AI. ({other})"
                )),
            })?;
        validate_styled_script(&raw)
    }

    async fn generate_markup<F>(
        &self,
        config: &TtsConfig,
        request: &SpeechRequest,
        voice_name: &str,
        markup: String,
        cancel: &CancellationToken,
        on_progress: &mut F,
    ) -> Result<GeneratedAudio>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let limit = self.limits.markup_chars;
        if markup.chars().count() > limit {
            return Err(TtsError::Validation(format!(
                "SSML input is too long. Maximum is {limit} characters."
            )));
        }
        ensure_not_cancelled(cancel)?;

        on_progress(ProgressEvent::Generating { current: 1, total: 1 });
        let bytes = self
            .generate_speech_with_api(config, request, voice_name, SynthesisInput::Ssml(markup))
            .await?;

        ensure_not_cancelled(cancel)?;
        Ok(single_fragment(AudioFragment { index: 0, bytes }))
    }

    async fn generate_chunked<F>(
        &self,
        config: &TtsConfig,
        request: &SpeechRequest,
        voice_name: &str,
        text: &str,
        cancel: &CancellationToken,
        on_progress: &mut F,
    ) -> Result<GeneratedAudio>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let chunks = split_text_into_chunks(text, self.limits.chunk_chars);
        let total = chunks.len();
        debug!(chunks = total, "text split for synthesis");

        let mut fragments = Vec::with_capacity(total);
        for (index, chunk) in chunks.into_iter().enumerate() {
            ensure_not_cancelled(cancel)?;
            on_progress(ProgressEvent::Generating { current: index + 1, total });
            let bytes = self
                .generate_speech_with_api(config, request, voice_name, SynthesisInput::Text(chunk))
                .await?;
            fragments.push(AudioFragment { index, bytes });
        }
        ensure_not_cancelled(cancel)?;

        match fragments.len() {
            0 => Err(TtsError::NoContent("No audio content was generated.".to_string())),
            1 => Ok(single_fragment(fragments.remove(0))),
            _ => {
                on_progress(ProgressEvent::Merging);
                merge_fragments(fragments)
            }
        }
    }

    /// The single network boundary: one synthesis call.
    async fn generate_speech_with_api(
        &self,
        config: &TtsConfig,
        request: &SpeechRequest,
        voice_name: &str,
        input: SynthesisInput,
    ) -> Result<Vec<u8>> {
        let input = match input {
            SynthesisInput::Text(text) if requires_markup(voice_name) => {
                SynthesisInput::Ssml(wrap_in_speak(&text))
            }
            other => other,
        };
        let call = SynthesisCall {
            input,
            voice_name: voice_name.to_string(),
            language_code: request.language_code().to_string(),
            speaking_rate: request.speaking_rate(),
            pitch: request.pitch(),
        };
        self.api.synthesize(config, &call).await
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        warn!("speech generation cancelled");
        return Err(TtsError::Cancelled);
    }
    Ok(())
}

/// Minimal markup for voices that reject plain text. Reserved characters
/// are escaped so arbitrary text stays well-formed.
fn wrap_in_speak(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 15);
    out.push_str("<speak>");
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out.push_str("</speak>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalVoice;
    use crate::voice::{Gender, Region, VoiceProfile};
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns `[index]` as audio for the n-th call and records every call.
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<SynthesisCall>>,
        cancel_after_call: Option<(usize, CancellationToken)>,
        fail_on_call: Option<(usize, TtsError)>,
    }

    impl FakeApi {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn calls(&self) -> Vec<SynthesisCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechApi for FakeApi {
        async fn synthesize(&self, _config: &TtsConfig, call: &SynthesisCall) -> Result<Vec<u8>> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(call.clone());
                calls.len()
            };
            if let Some((at, err)) = &self.fail_on_call {
                if *at == n {
                    return Err(err.clone());
                }
            }
            if let Some((at, token)) = &self.cancel_after_call {
                if *at == n {
                    token.cancel();
                }
            }
            Ok(vec![b'F', b'0' + (n - 1) as u8])
        }
    }

    struct FakeScripter {
        output: Result<String>,
        calls: AtomicUsize,
    }

    impl FakeScripter {
        fn returning(output: Result<String>) -> Self {
            Self { output, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl StyleScripter for FakeScripter {
        async fn generate_styled_script(&self, _text: &str, _instructions: &str, voice: &VoiceProfile) -> Result<String> {
            assert!(!voice.name.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone()
        }
    }

    #[derive(Default)]
    struct FakeLocal {
        spoken: Mutex<Vec<Utterance>>,
        stops: AtomicUsize,
        block_forever: bool,
    }

    #[async_trait]
    impl LocalSynthesizer for FakeLocal {
        fn voices(&self) -> Vec<LocalVoice> {
            vec![
                LocalVoice { id: "a".into(), name: "A".into(), language: "vi-VN".into() },
                LocalVoice { id: "b".into(), name: "B".into(), language: "en-US".into() },
            ]
        }

        async fn speak(&self, utterance: Utterance) -> Result<()> {
            self.spoken.lock().unwrap().push(utterance);
            if self.block_forever {
                std::future::pending::<()>().await;
            }
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn voice() -> Voice {
        Voice::new("hue-female-ngoc-huyen", "Ngọc Huyền", Gender::Female, Region::Central)
            .with_api_name("vi-VN-Wavenet-A")
    }

    fn config() -> TtsConfig {
        TtsConfig::new("test-key")
    }

    fn small_chunks() -> GenerationLimits {
        GenerationLimits { chunk_chars: 8, markup_chars: 5000 }
    }

    async fn run(
        orchestrator: &SpeechOrchestrator,
        request: &SpeechRequest,
        cancel: &CancellationToken,
    ) -> (Result<GeneratedAudio>, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let result = orchestrator
            .generate_speech(&config(), request, cancel, |e| events.push(e))
            .await;
        (result, events)
    }

    #[tokio::test]
    async fn test_three_chunks_emit_ordered_progress_and_merge_in_order() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_limits(small_chunks());
        let request = SpeechRequest::new("One. Two. Three.", voice());

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;
        let audio = result.unwrap();

        assert_eq!(
            events,
            vec![
                ProgressEvent::Generating { current: 1, total: 3 },
                ProgressEvent::Generating { current: 2, total: 3 },
                ProgressEvent::Generating { current: 3, total: 3 },
                ProgressEvent::Merging,
                ProgressEvent::Done,
            ]
        );
        assert_eq!(audio.bytes, b"F0F1F2");
        assert_eq!(audio.fragment_count, 3);

        let texts: Vec<String> = api.calls().iter().map(|c| c.input.as_str().to_string()).collect();
        assert_eq!(texts, vec!["One.", "Two.", "Three."]);
    }

    #[tokio::test]
    async fn test_single_fragment_is_returned_without_merging() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let request = SpeechRequest::new("Xin chào.", voice()).with_speaking_rate(1.5).with_pitch(-3.0);

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert_eq!(result.unwrap().bytes, b"F0");
        assert_eq!(
            events,
            vec![ProgressEvent::Generating { current: 1, total: 1 }, ProgressEvent::Done]
        );
        let call = &api.calls()[0];
        assert_eq!(call.input, SynthesisInput::Text("Xin chào.".into()));
        assert_eq!(call.voice_name, "vi-VN-Wavenet-A");
        assert_eq!(call.language_code, "vi-VN");
        assert_eq!(call.speaking_rate, 1.5);
        assert_eq!(call.pitch, -3.0);
    }

    #[tokio::test]
    async fn test_cancel_between_chunks_discards_partial_audio() {
        let cancel = CancellationToken::new();
        let api = Arc::new(FakeApi {
            cancel_after_call: Some((1, cancel.clone())),
            ..Default::default()
        });
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_limits(small_chunks());
        let request = SpeechRequest::new("One. Two. Three.", voice());

        let (result, events) = run(&orchestrator, &request, &cancel).await;

        assert_eq!(result.unwrap_err(), TtsError::Cancelled);
        assert_eq!(api.call_count(), 1);
        assert_eq!(events, vec![ProgressEvent::Generating { current: 1, total: 3 }]);
    }

    #[tokio::test]
    async fn test_cancel_during_last_call_fails_before_assembly() {
        let cancel = CancellationToken::new();
        let api = Arc::new(FakeApi {
            cancel_after_call: Some((1, cancel.clone())),
            ..Default::default()
        });
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let request = SpeechRequest::new("Only one chunk.", voice());

        let (result, events) = run(&orchestrator, &request, &cancel).await;

        assert!(result.unwrap_err().is_cancelled());
        assert!(!events.contains(&ProgressEvent::Done));
    }

    #[tokio::test]
    async fn test_fresh_token_is_unaffected_by_earlier_cancellation() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let request = SpeechRequest::new("Hello.", voice());

        let first = CancellationToken::new();
        first.cancel();
        let (result, _) = run(&orchestrator, &request, &first).await;
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(api.call_count(), 0);

        let (result, _) = run(&orchestrator, &request, &CancellationToken::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error_without_calls() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let request = SpeechRequest::new("Hello.", voice());

        let result = orchestrator
            .generate_speech(&TtsConfig::default(), &request, &CancellationToken::new(), |_| {})
            .await;

        assert!(matches!(result, Err(TtsError::Configuration(_))));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_voice_without_api_name_is_configuration_error() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let cloned = Voice::new("cloned-1", "Mine", Gender::Male, Region::South);
        let request = SpeechRequest::new("Hello.", cloned);

        let (result, _) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::Configuration(_))));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_is_validation_error() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let request = SpeechRequest::new("   ", voice());

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::Validation(_))));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_markup_over_limit_fails_before_network() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let body = "a".repeat(5001 - "<speak></speak>".len());
        let markup = format!("<speak>{body}</speak>");
        assert_eq!(markup.chars().count(), 5001);
        let request = SpeechRequest::new(markup, voice()).with_ssml(true);

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::Validation(_))));
        assert_eq!(api.call_count(), 0);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_markup_is_sent_whole_in_one_call() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_limits(small_chunks());
        let markup = "<speak>One. Two. <break time=\"1s\"/> Three.</speak>";
        let request = SpeechRequest::new(markup, voice()).with_ssml(true);

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert_eq!(result.unwrap().fragment_count, 1);
        assert_eq!(api.calls()[0].input, SynthesisInput::Ssml(markup.into()));
        assert_eq!(
            events,
            vec![ProgressEvent::Generating { current: 1, total: 1 }, ProgressEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_neural2_plain_text_is_wrapped() {
        let api = Arc::new(FakeApi::default());
        let orchestrator = SpeechOrchestrator::new(api.clone());
        let neural = Voice::new("vn-male-neural2-d-horror", "Minh Tuấn", Gender::Male, Region::South)
            .with_api_name("vi-VN-Neural2-D");
        let request = SpeechRequest::new("Tom & Jerry.", neural);

        let (result, _) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(
            api.calls()[0].input,
            SynthesisInput::Ssml("<speak>Tom &amp; Jerry.</speak>".into())
        );
    }

    #[tokio::test]
    async fn test_style_instructions_run_scripter_and_force_markup() {
        let api = Arc::new(FakeApi::default());
        let script = "<speak><prosody rate=\"slow\">One. Two. Three.</prosody></speak>";
        let scripter = Arc::new(FakeScripter::returning(Ok(format!("  {script}\n"))));
        let orchestrator = SpeechOrchestrator::new(api.clone())
            .with_style_scripter(scripter.clone())
            .with_limits(small_chunks());
        let request = SpeechRequest::new("One. Two. Three.", voice()).with_style_instructions("đọc chậm rãi");

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(scripter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.calls()[0].input, SynthesisInput::Ssml(script.into()));
        assert_eq!(
            events,
            vec![
                ProgressEvent::GeneratingScript,
                ProgressEvent::Generating { current: 1, total: 1 },
                ProgressEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_script_aborts_without_audio() {
        let api = Arc::new(FakeApi::default());
        let scripter = Arc::new(FakeScripter::returning(Ok("```xml\n<speak>x</speak>\n```".into())));
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_style_scripter(scripter);
        let request = SpeechRequest::new("Hello.", voice()).with_style_instructions("whisper");

        let (result, _) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::ScriptGeneration(_))));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scripter_failure_is_script_generation_error() {
        let api = Arc::new(FakeApi::default());
        let scripter = Arc::new(FakeScripter::returning(Err(TtsError::RemoteApi("503".into()))));
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_style_scripter(scripter);
        let request = SpeechRequest::new("Hello.", voice()).with_style_instructions("shout");

        let (result, _) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::ScriptGeneration(_))));
    }

    #[tokio::test]
    async fn test_missing_scripter_is_script_generation_error() {
        let orchestrator = SpeechOrchestrator::new(Arc::new(FakeApi::default()));
        let request = SpeechRequest::new("Hello.", voice()).with_style_instructions("shout");

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::ScriptGeneration(_))));
        assert_eq!(events, vec![ProgressEvent::GeneratingScript]);
    }

    #[tokio::test]
    async fn test_remote_failure_discards_earlier_fragments() {
        let api = Arc::new(FakeApi {
            fail_on_call: Some((2, TtsError::InvalidMarkup("bad ssml".into()))),
            ..Default::default()
        });
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_limits(small_chunks());
        let request = SpeechRequest::new("One. Two. Three.", voice());

        let (result, events) = run(&orchestrator, &request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::InvalidMarkup(_))));
        assert_eq!(api.call_count(), 2);
        assert!(!events.contains(&ProgressEvent::Merging));
    }

    #[tokio::test]
    async fn test_stream_yields_events_then_result() {
        let orchestrator = SpeechOrchestrator::new(Arc::new(FakeApi::default())).with_limits(small_chunks());
        let request = SpeechRequest::new("Hello. World.", voice());

        let updates: Vec<GenerationUpdate> = orchestrator
            .generate_speech_stream(config(), request, CancellationToken::new())
            .collect()
            .await;

        assert_eq!(updates.len(), 5);
        assert!(matches!(
            updates[0],
            GenerationUpdate::Progress(ProgressEvent::Generating { current: 1, total: 2 })
        ));
        assert!(matches!(updates[3], GenerationUpdate::Progress(ProgressEvent::Done)));
        match &updates[4] {
            GenerationUpdate::Finished(Ok(audio)) => assert_eq!(audio.bytes, b"F0F1"),
            other => panic!("unexpected final update: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_to_local_without_key() {
        let api = Arc::new(FakeApi::default());
        let local = Arc::new(FakeLocal::default());
        let orchestrator = SpeechOrchestrator::new(api.clone()).with_local_synthesizer(local.clone());
        let request = SpeechRequest::new("Xin chào", voice()).with_pitch(10.0).with_speaking_rate(0.5);

        let outcome = orchestrator
            .synthesize(&TtsConfig::default(), &request, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(outcome, SynthesisOutcome::PlayedLocally);
        assert_eq!(api.call_count(), 0);
        let spoken = local.spoken.lock().unwrap();
        assert_eq!(spoken[0].pitch, 1.5);
        assert_eq!(spoken[0].rate, 0.5);
        assert_eq!(spoken[0].voice.as_ref().unwrap().language, "vi-VN");
    }

    #[tokio::test]
    async fn test_synthesize_uses_api_when_configured() {
        let orchestrator = SpeechOrchestrator::new(Arc::new(FakeApi::default()))
            .with_local_synthesizer(Arc::new(FakeLocal::default()));
        let request = SpeechRequest::new("Hello.", voice());

        let outcome = orchestrator
            .synthesize(&config(), &request, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert!(matches!(outcome, SynthesisOutcome::Audio(_)));
    }

    #[tokio::test]
    async fn test_local_playback_stops_on_cancel() {
        let local = Arc::new(FakeLocal { block_forever: true, ..Default::default() });
        let orchestrator = SpeechOrchestrator::new(Arc::new(FakeApi::default()))
            .with_local_synthesizer(local.clone());
        let request = SpeechRequest::new("Xin chào", voice());
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };
        let result = orchestrator.speak_locally(&request, &cancel).await;
        canceller.await.unwrap();

        assert_eq!(result.unwrap_err(), TtsError::Cancelled);
        // once before speaking, once on cancel
        assert_eq!(local.stops.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_local_without_engine_is_synthesis_error() {
        let orchestrator = SpeechOrchestrator::new(Arc::new(FakeApi::default()));
        let request = SpeechRequest::new("Xin chào", voice());

        let result = orchestrator.speak_locally(&request, &CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::Synthesis(_))));
    }
}
