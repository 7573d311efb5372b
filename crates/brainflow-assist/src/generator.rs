//! The content generation service and its fallback policy.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brainflow_shared::Item;
use tracing::{debug, info, warn};

use crate::action::{ActionResult, LlmActionRequest};
use crate::canned;
use crate::error::{AssistError, Result};
use crate::llm::{
    extract_json, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_TRANSCRIPTION_MODEL,
};
use crate::prompt::{
    action_prompt, improve_prompt, structure_prompt, ACTION_SYSTEM, STRUCTURE_SYSTEM,
};
use crate::sections::resolve_target;
use crate::voice::{
    improve_by_indentation, parse_structured, rule_based_structure, StructuredItem, Transcriber,
    Transcript, MIN_AUDIO_BYTES,
};

/// A text-in, text-out model.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// What to do when the generator is missing, slow or talking nonsense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Answer with deterministic stand-in content.
    #[default]
    Canned,
    /// Surface the failure to the caller.
    Fail,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canned" => Ok(FallbackPolicy::Canned),
            "fail" => Ok(FallbackPolicy::Fail),
            other => Err(format!("unknown fallback policy: {other}")),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackPolicy::Canned => "canned",
            FallbackPolicy::Fail => "fail",
        })
    }
}

#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// No key means no generator and no transcriber.
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub timeout: Duration,
    pub fallback: FallbackPolicy,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            fallback: FallbackPolicy::default(),
        }
    }
}

#[derive(Clone)]
pub struct AssistService {
    generator: Option<Arc<dyn ContentGenerator>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    policy: FallbackPolicy,
    timeout: Duration,
}

impl AssistService {
    pub fn new(
        generator: Option<Arc<dyn ContentGenerator>>,
        transcriber: Option<Arc<dyn Transcriber>>,
        policy: FallbackPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            transcriber,
            policy,
            timeout,
        }
    }

    pub fn from_config(config: &AssistConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) else {
            info!(fallback = %config.fallback, "no generator configured");
            return Ok(Self::new(None, None, config.fallback, config.timeout));
        };

        let client = Arc::new(OpenAiClient::new(
            api_key,
            config.base_url.clone(),
            config.chat_model.clone(),
            config.transcription_model.clone(),
            config.timeout,
        )?);
        info!(
            base_url = %config.base_url,
            model = %config.chat_model,
            fallback = %config.fallback,
            "content generator configured"
        );
        Ok(Self::new(
            Some(client.clone()),
            Some(client),
            config.fallback,
            config.timeout,
        ))
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Ask the generator for JSON, bounded by the timeout.
    async fn ask(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let generator = self.generator.as_ref().ok_or(AssistError::NotConfigured)?;
        let text = tokio::time::timeout(self.timeout, generator.complete(system, user))
            .await
            .map_err(|_| AssistError::Timeout(self.timeout))??;
        debug!(generator = generator.name(), reply_len = text.len(), "generator replied");
        extract_json(&text).ok_or_else(|| AssistError::Malformed("no JSON in reply".into()))
    }

    fn fallback<T>(&self, what: &str, err: AssistError, canned: impl FnOnce() -> T) -> Result<T> {
        match self.policy {
            FallbackPolicy::Canned if err.is_recoverable() => {
                if matches!(err, AssistError::NotConfigured) {
                    debug!(what, "using canned content");
                } else {
                    warn!(what, error = %err, "generator failed, using canned content");
                }
                Ok(canned())
            }
            _ => {
                warn!(what, error = %err, "generator failed");
                Err(err)
            }
        }
    }

    /// Run a create/edit/research action against an outline snapshot.
    pub async fn run_action(
        &self,
        request: &LlmActionRequest,
        snapshot: &[Item],
    ) -> Result<ActionResult> {
        let target = resolve_target(request, snapshot);
        let prompt = action_prompt(request, target.as_ref(), snapshot);

        let generated = match self.ask(ACTION_SYSTEM, &prompt).await {
            Ok(value) => ActionResult::from_value(request.kind, value)
                .map_err(|e| AssistError::Malformed(e.to_string())),
            Err(e) => Err(e),
        };
        let result = match generated {
            Ok(result) => result,
            Err(e) => self.fallback("llm action", e, || canned::action_result(request))?,
        };

        info!(
            action = request.kind.as_str(),
            section = target.as_ref().map(|t| t.section.as_str()).unwrap_or("-"),
            "llm action completed"
        );
        Ok(result.with_target(target))
    }

    async fn leveled(
        &self,
        prompt: String,
        fallback: impl FnOnce() -> Vec<StructuredItem>,
    ) -> Result<Vec<StructuredItem>> {
        let generated = match self.ask(STRUCTURE_SYSTEM, &prompt).await {
            Ok(value) => parse_structured(value).and_then(|items| {
                if items.is_empty() {
                    Err(AssistError::Malformed("empty item list".into()))
                } else {
                    Ok(items)
                }
            }),
            Err(e) => Err(e),
        };
        match generated {
            Ok(items) => Ok(items),
            Err(e) => self.fallback("structure", e, fallback),
        }
    }

    /// Turn free text into leveled items.
    pub async fn structure(&self, text: &str) -> Result<Vec<StructuredItem>> {
        if text.trim().is_empty() {
            return Err(AssistError::InvalidInput("Text cannot be empty".into()));
        }
        self.leveled(structure_prompt(text), || rule_based_structure(text))
            .await
    }

    /// Restructure existing outline text.
    pub async fn improve(&self, text: &str) -> Result<Vec<StructuredItem>> {
        if text.trim().is_empty() {
            return Err(AssistError::InvalidInput("Text cannot be empty".into()));
        }
        self.leveled(improve_prompt(text), || improve_by_indentation(text))
            .await
    }

    /// Transcribe audio. Upstream failures become a marker transcript
    /// instead of canned text.
    pub async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<Transcript> {
        if audio.is_empty() {
            return Err(AssistError::InvalidInput("Empty audio file".into()));
        }
        let len = audio.len();

        let Some(transcriber) = self.transcriber.as_ref() else {
            return self.fallback("transcription", AssistError::NotConfigured, || {
                canned::transcript(len)
            });
        };

        if len < MIN_AUDIO_BYTES {
            warn!(bytes = len, "audio too small to transcribe");
            return Ok(Transcript::new("", len));
        }

        let outcome = tokio::time::timeout(self.timeout, transcriber.transcribe(audio, filename))
            .await
            .unwrap_or(Err(AssistError::Timeout(self.timeout)));
        match outcome {
            Ok(text) => {
                info!(bytes = len, chars = text.len(), "audio transcribed");
                Ok(Transcript::new(text, len))
            }
            Err(e) => {
                warn!(bytes = len, error = %e, "transcription failed");
                let reason: String = e.to_string().chars().take(50).collect();
                Ok(Transcript::new(format!("[Transcription failed: {reason}]"), len))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::sections::default_brainlift;
    use chrono::Utc;

    struct Scripted(Option<&'static str>);

    #[async_trait]
    impl ContentGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| AssistError::Upstream("503: overloaded".into()))
        }
    }

    struct Slow;

    #[async_trait]
    impl ContentGenerator for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("{}".into())
        }
    }

    #[async_trait]
    impl Transcriber for Scripted {
        async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| AssistError::Upstream("401: bad key".into()))
        }
    }

    fn service(
        generator: impl ContentGenerator + 'static,
        policy: FallbackPolicy,
    ) -> AssistService {
        AssistService::new(Some(Arc::new(generator)), None, policy, Duration::from_millis(100))
    }

    fn unconfigured(policy: FallbackPolicy) -> AssistService {
        AssistService::new(None, None, policy, Duration::from_secs(1))
    }

    fn create(prompt: &str) -> LlmActionRequest {
        LlmActionRequest {
            kind: ActionType::Create,
            user_prompt: prompt.into(),
            target_id: None,
            parent_id: None,
            section: None,
            current_content: None,
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("Canned".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Canned));
        assert_eq!("fail".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Fail));
        assert!("maybe".parse::<FallbackPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_generated_action_gets_target() {
        let svc = service(
            Scripted(Some(r#"Sure: {"items":[{"text":"Churn SPOV"}],"suggestions":[]}"#)),
            FallbackPolicy::Fail,
        );
        let result = svc
            .run_action(&create("an spov about churn"), &default_brainlift(Utc::now()))
            .await
            .unwrap();
        match result {
            ActionResult::Create(create) => {
                assert_eq!(create.items[0].text, "Churn SPOV");
                assert_eq!(create.target_section.unwrap().item_id.as_deref(), Some("6"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_canned() {
        let result = unconfigured(FallbackPolicy::Canned)
            .run_action(&create("retention plan"), &[])
            .await
            .unwrap();
        assert!(matches!(result, ActionResult::Create(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_fail() {
        let err = unconfigured(FallbackPolicy::Fail)
            .run_action(&create("retention plan"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::NotConfigured));
    }

    #[tokio::test]
    async fn test_upstream_error_policies() {
        let canned = service(Scripted(None), FallbackPolicy::Canned)
            .run_action(&create("x"), &[])
            .await;
        assert!(canned.is_ok());

        let failed = service(Scripted(None), FallbackPolicy::Fail)
            .run_action(&create("x"), &[])
            .await;
        assert!(matches!(failed, Err(AssistError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let svc = service(Scripted(Some("I cannot do that")), FallbackPolicy::Canned);
        let items = svc.structure("milk, eggs and bread").await.unwrap();
        assert_eq!(items.len(), 3);

        let svc = service(Scripted(Some(r#"{"content":"x"}"#)), FallbackPolicy::Fail);
        assert!(matches!(
            svc.run_action(&create("x"), &[]).await,
            Err(AssistError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_bounded() {
        let started = std::time::Instant::now();
        let err = service(Slow, FallbackPolicy::Fail)
            .structure("a, b")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_structure_from_generator() {
        let svc = service(
            Scripted(Some(r#"[{"content":"Trip","level":0},{"content":"flights","level":1}]"#)),
            FallbackPolicy::Fail,
        );
        let items = svc.structure("plan the trip and book flights").await.unwrap();
        assert_eq!(items[1], StructuredItem::new("flights", 1));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_under_any_policy() {
        let err = unconfigured(FallbackPolicy::Canned)
            .structure("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_transcribe_rules() {
        let svc = unconfigured(FallbackPolicy::Canned);
        assert!(svc.transcribe(Vec::new(), "a.webm").await.is_err());
        let canned = svc.transcribe(vec![0; 400], "a.webm").await.unwrap();
        assert!(canned.text.starts_with("Today I need"));

        let svc = AssistService::new(
            None,
            Some(Arc::new(Scripted(Some("hello world")))),
            FallbackPolicy::Canned,
            Duration::from_secs(1),
        );
        assert_eq!(svc.transcribe(vec![0; 10], "a.webm").await.unwrap().text, "");
        assert_eq!(
            svc.transcribe(vec![0; 500], "a.webm").await.unwrap().text,
            "hello world"
        );

        let svc = AssistService::new(
            None,
            Some(Arc::new(Scripted(None))),
            FallbackPolicy::Canned,
            Duration::from_secs(1),
        );
        let failed = svc.transcribe(vec![0; 500], "a.webm").await.unwrap();
        assert!(failed.text.starts_with("[Transcription failed: "));
    }
}
