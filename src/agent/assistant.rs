//! One conversation turn: gate, ground, generate, record.

use std::sync::Arc;

use crate::context::pipeline::{ContextAssembler, Source, DEFAULT_MAX_SOURCES};
use crate::context::prompt::{build_system_prompt, format_sources_reference, has_inline_citation};
use crate::core::errors::ApiError;
use crate::core::security::Owner;
use crate::history::ChatTurnStore;
use crate::llm::{ChatMessage, ChatRequest, LlmService};

use super::persona::AssistantPersona;
use super::topic_gate::TopicGate;

pub const GENERATION_FAILED_MESSAGE: &str =
    "Lo siento, no pude generar una respuesta en este momento. Por favor, intenta de nuevo.";

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub response: String,
    pub sources: Vec<Source>,
    pub search_query_id: Option<i64>,
    pub on_topic: bool,
}

#[derive(Clone)]
pub struct Assistant {
    persona: AssistantPersona,
    gate: TopicGate,
    assembler: ContextAssembler,
    llm: LlmService,
    turns: Option<Arc<dyn ChatTurnStore>>,
}

impl Assistant {
    pub fn new(
        persona: AssistantPersona,
        llm: LlmService,
        assembler: ContextAssembler,
        turns: Option<Arc<dyn ChatTurnStore>>,
    ) -> Self {
        Self {
            persona,
            gate: TopicGate::new(llm.clone(), persona),
            assembler,
            llm,
            turns,
        }
    }

    pub async fn respond(&self, message: &str, owner: Option<&Owner>) -> Result<AssistantReply, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::BadRequest("Message is required".to_string()));
        }

        if !self.gate.is_on_topic(message).await {
            return Ok(AssistantReply {
                response: self.persona.redirect_message().to_string(),
                sources: Vec::new(),
                search_query_id: None,
                on_topic: false,
            });
        }

        let assembled = self.assembler.assemble(message, owner, DEFAULT_MAX_SOURCES).await;
        let system_prompt = build_system_prompt(self.persona, &assembled.sources, &assembled.context);

        let request = ChatRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(message),
        ])
        .with_temperature(self.persona.temperature())
        .with_max_tokens(self.persona.max_tokens());

        let mut response = self.llm.chat(request).await.map_err(|err| {
            tracing::warn!(persona = self.persona.as_str(), "answer generation failed: {}", err);
            ApiError::Internal(GENERATION_FAILED_MESSAGE.to_string())
        })?;

        if !assembled.sources.is_empty() && !has_inline_citation(&response, &assembled.sources) {
            response.push_str(&format_sources_reference(&assembled.sources));
        }

        let search_query_id = assembled.query_record.as_ref().map(|record| record.id);
        if let (Some(owner), Some(turns)) = (owner, &self.turns) {
            if let Err(err) = turns
                .add_chat_turn(owner, message, &response, search_query_id)
                .await
            {
                tracing::warn!(owner = owner.id(), "failed to record chat turn: {}", err);
            }
        }

        Ok(AssistantReply {
            response,
            sources: assembled.sources,
            search_query_id,
            on_topic: true,
        })
    }
}
