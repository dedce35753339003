//! Yes/no classification that decides whether a message gets an answer at all.

use std::sync::OnceLock;

use regex::Regex;

use super::persona::AssistantPersona;
use crate::llm::{ChatMessage, ChatRequest, LlmService};

const GATE_TEMPERATURE: f64 = 0.0;
const GATE_MAX_TOKENS: i32 = 5;

static AFFIRMATIVE: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicVerdict {
    OnTopic,
    OffTopic,
    /// The classification call itself failed.
    Unavailable { reason: String },
}

impl TopicVerdict {
    /// Fail-closed: only an explicit affirmative lets the message through.
    pub fn is_on_topic(&self) -> bool {
        matches!(self, TopicVerdict::OnTopic)
    }
}

#[derive(Clone)]
pub struct TopicGate {
    llm: LlmService,
    persona: AssistantPersona,
}

impl TopicGate {
    pub fn new(llm: LlmService, persona: AssistantPersona) -> Self {
        Self { llm, persona }
    }

    pub async fn classify(&self, message: &str) -> TopicVerdict {
        let request = ChatRequest::new(vec![
            ChatMessage::system(classification_prompt(self.persona)),
            ChatMessage::user(message),
        ])
        .with_temperature(GATE_TEMPERATURE)
        .with_max_tokens(GATE_MAX_TOKENS);

        match self.llm.chat(request).await {
            Ok(answer) if is_affirmative(&answer) => TopicVerdict::OnTopic,
            Ok(answer) => {
                tracing::debug!(persona = self.persona.as_str(), answer = %answer.trim(), "message classified off-topic");
                TopicVerdict::OffTopic
            }
            Err(err) => {
                tracing::warn!(persona = self.persona.as_str(), "topic classification failed: {}", err);
                TopicVerdict::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub async fn is_on_topic(&self, message: &str) -> bool {
        self.classify(message).await.is_on_topic()
    }
}

fn classification_prompt(persona: AssistantPersona) -> String {
    format!(
        "Eres un clasificador. Decide si el mensaje del usuario trata sobre {}.\n\
         Responde ÚNICAMENTE con una palabra: SI o NO.",
        persona.gate_scope()
    )
}

/// True when the answer contains SI, SÍ or YES as a whole word, in any case.
pub fn is_affirmative(answer: &str) -> bool {
    AFFIRMATIVE
        .get_or_init(|| Regex::new(r"(?i)\b(si|sí|yes)\b").ok())
        .as_ref()
        .map(|re| re.is_match(answer))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::llm::LlmProvider;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Scripted {
        reply: Result<String, String>,
        seen: Mutex<Option<ChatRequest>>,
    }

    impl Scripted {
        fn answering(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("503 upstream".to_string()),
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            *self.seen.lock().unwrap() = Some(request);
            self.reply.clone().map_err(ApiError::Internal)
        }
    }

    struct Hanging;

    #[async_trait]
    impl LlmProvider for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn gate(provider: Arc<dyn LlmProvider>, persona: AssistantPersona) -> TopicGate {
        TopicGate::new(LlmService::new(provider, "m", Duration::from_millis(100)), persona)
    }

    #[test]
    fn affirmative_tokens_match_whole_words_only() {
        assert!(is_affirmative("SI"));
        assert!(is_affirmative("Sí."));
        assert!(is_affirmative(" yes"));
        assert!(!is_affirmative("NO"));
        assert!(!is_affirmative("SIN duda no"));
        assert!(!is_affirmative(""));
    }

    #[tokio::test]
    async fn affirmative_answer_lets_message_through() {
        let provider = Scripted::answering("SI");
        let verdict = gate(provider.clone(), AssistantPersona::Teacher)
            .classify("¿Cómo enseño fracciones?")
            .await;
        assert_eq!(verdict, TopicVerdict::OnTopic);

        let request = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(5));
        assert!(request.messages[0].content.contains(AssistantPersona::Teacher.gate_scope()));
        assert_eq!(request.messages[1].content, "¿Cómo enseño fracciones?");
    }

    #[tokio::test]
    async fn student_gate_uses_student_scope() {
        let provider = Scripted::answering("NO");
        let on_topic = gate(provider.clone(), AssistantPersona::Student)
            .is_on_topic("receta de arepas")
            .await;
        assert!(!on_topic);
        let request = provider.seen.lock().unwrap().clone().unwrap();
        assert!(request.messages[0].content.contains(AssistantPersona::Student.gate_scope()));
    }

    #[tokio::test]
    async fn failures_fail_closed() {
        let failed = gate(Scripted::failing(), AssistantPersona::Teacher)
            .classify("x")
            .await;
        assert!(matches!(failed, TopicVerdict::Unavailable { .. }));
        assert!(!failed.is_on_topic());

        let timed_out = gate(Arc::new(Hanging), AssistantPersona::Teacher)
            .is_on_topic("x")
            .await;
        assert!(!timed_out);

        let ambiguous = gate(Scripted::answering("Tal vez"), AssistantPersona::Teacher)
            .is_on_topic("x")
            .await;
        assert!(!ambiguous);
    }
}
