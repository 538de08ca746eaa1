// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message admission and response pipeline.
//!
//! [`Dispatcher::dispatch`] takes one inbound message through access
//! policy, runtime state, dedup and rate guards, voice transcription,
//! style routing, and reply generation. It never returns an error;
//! every stage failure maps to a [`DispatchOutcome`] plus, where the
//! user should hear about it, an apology message.
//!
//! Pipelines for the same channel are serialized through a per-channel
//! mutex; unrelated channels proceed in parallel.

mod classify;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use doppel_config::{DoppelConfig, StyleConfig};
use doppel_context::ConversationStore;
use doppel_core::{
    Attachment, ChannelGateway, DoppelError, GenerationRequest, InboundMessage, ReasonCode,
    ReplyBackend, Role, Transcriber,
};
use doppel_guard::{Deduplicator, RateLimiter};
use doppel_policy::{scope_id, AccessPolicy};
use doppel_router::{StyleDecision, StyleRouter};
use doppel_state::{RuntimeState, StateStore};
use doppel_storage::{AuditLog, ConversationLog, EventBuffer};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use classify::{first_audio, has_image};

const APOLOGY_ASR_ERROR: &str = "语音解析出了点问题，麻烦用文字再说一次～";
const APOLOGY_ASR_NONE: &str = "语音解析失败了，能否改用文字？";
const APOLOGY_IMAGE_ONLY: &str = "我暂不支持直接看图，麻烦用文字描述一下吧～";
const APOLOGY_BACKEND: &str = "我这边出错了，稍后再聊可以吗？";
const TRANSCRIPT_PREFIX: &str = "\n语音转写：";
const IMAGE_HINT: &str = "\n（提示：图片内容无法读取）";

/// Terminal state of one dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Reply generated and sent.
    Replied,
    /// Authored by this account.
    SelfMessage,
    /// Rejected by the access policy.
    Blocked(ReasonCode),
    /// Runtime state has the agent switched off.
    Disabled,
    /// Nothing to respond to after trimming and attachment handling.
    EmptyContent,
    /// Near-identical to a recent message in the same channel.
    Duplicate,
    /// Channel is over its admission window.
    RateLimited,
    /// Voice message could not be turned into text.
    TranscriptionFailed,
    /// Only an image, no usable text.
    ImageOnly,
    /// The reply backend failed after its own retries.
    BackendFailed,
    /// Reply was generated but the channel refused the send.
    SendFailed,
}

/// External collaborators and persistence sidecars, injected at startup.
pub struct DispatcherParts {
    pub channel: Arc<dyn ChannelGateway>,
    pub backend: Arc<dyn ReplyBackend>,
    pub transcriber: Arc<dyn Transcriber>,
    pub state: Arc<StateStore>,
    pub audit: Arc<AuditLog>,
    pub events: Arc<EventBuffer>,
    pub conversation_log: Arc<ConversationLog>,
}

pub struct Dispatcher {
    config: DoppelConfig,
    self_id: Option<u64>,
    policy: AccessPolicy,
    dedup: Deduplicator,
    rate: RateLimiter,
    context: ConversationStore,
    router: StyleRouter,
    parts: DispatcherParts,
    channel_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    pub fn new(config: DoppelConfig, self_id: Option<u64>, parts: DispatcherParts) -> Self {
        let policy = AccessPolicy::new(config.discord.clone(), config.behavior.clone());
        let dedup = Deduplicator::new(config.behavior.dedup.clone());
        let rate = RateLimiter::new(config.behavior.rate_limit.clone());
        let context = ConversationStore::new(config.behavior.context.clone());
        let router = StyleRouter::new(config.router.clone(), &config.styles);
        Self {
            config,
            self_id,
            policy,
            dedup,
            rate,
            context,
            router,
            parts,
            channel_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Read access for the status surface.
    pub fn events(&self) -> &EventBuffer {
        self.parts.events.as_ref()
    }

    /// Runs one message through the full pipeline.
    pub async fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        if self.self_id == Some(message.author_id) {
            return DispatchOutcome::SelfMessage;
        }

        let lock = self.channel_lock(message.channel_id).await;
        let _guard = lock.lock().await;

        let decision = self.policy.check(message, self.self_id);
        if !decision.allowed {
            debug!(
                reason = %decision.reason,
                channel = message.channel_id,
                user = message.author_id,
                "message blocked"
            );
            self.parts.events.push(
                "blocked",
                &format!(
                    "reason={} channel={} user={}",
                    decision.reason, message.channel_id, message.author_id
                ),
            );
            self.audit(
                "blocked",
                &format!(
                    "reason={} channel={} user={}",
                    decision.reason, message.channel_id, message.author_id
                ),
            )
            .await;
            return DispatchOutcome::Blocked(decision.reason);
        }

        let state = self.runtime_state().await;
        if !state.enabled {
            return DispatchOutcome::Disabled;
        }

        let mut content = message.content.trim().to_string();
        if content.is_empty() && message.attachments.is_empty() {
            return DispatchOutcome::EmptyContent;
        }

        // Attachment-only messages carry no text yet; fingerprinting ""
        // would mark every pair of them duplicates.
        if !content.is_empty() && self.dedup.is_duplicate(message.channel_id, &content) {
            info!(channel = message.channel_id, "near-duplicate message skipped");
            return DispatchOutcome::Duplicate;
        }

        if !self.rate.allow(message.channel_id) {
            if self.config.behavior.rate_limit.notify_when_limited
                && self.rate.mark_notified(message.channel_id)
            {
                self.send(
                    message.channel_id,
                    &self.config.behavior.rate_limit.cooldown_prompt,
                    None,
                )
                .await;
            }
            self.parts.events.push(
                "rate_limited",
                &format!("channel={}", message.channel_id),
            );
            return DispatchOutcome::RateLimited;
        }

        let scope = scope_id(message, self.config.behavior.context.scope);

        let audio = first_audio(&message.attachments);
        let image_present = has_image(&message.attachments);

        if let Some(attachment) = audio {
            match self.transcribe(message, attachment).await {
                TranscriptionResult::Text(text) => {
                    content.push_str(TRANSCRIPT_PREFIX);
                    content.push_str(&text);
                    content = content.trim().to_string();
                }
                TranscriptionResult::Failed(outcome) => return outcome,
            }
        } else if image_present && content.is_empty() {
            self.send(message.channel_id, APOLOGY_IMAGE_ONLY, Some(message.id))
                .await;
            return DispatchOutcome::ImageOnly;
        }

        if content.is_empty() {
            return DispatchOutcome::EmptyContent;
        }

        let manual = self.manual_style(message).await;
        let decision = self.router.decide(&content, manual.as_deref());
        let style = self.style_for(&decision.style_id);
        debug!(
            style = %style.id,
            confidence = decision.confidence,
            reason = %decision.reason,
            "style selected"
        );

        self.human_pause(message.channel_id).await;

        let mut user_content = content.clone();
        if image_present {
            user_content.push_str(IMAGE_HINT);
        }
        let request = GenerationRequest {
            model: style.model.clone(),
            system_prompt: style.system_prompt.clone(),
            history: self.context.history_for_llm(&scope),
            user_content,
            temperature: style.temperature,
            presence_penalty: style.presence_penalty,
            frequency_penalty: style.frequency_penalty,
            max_tokens: style.max_tokens,
            emoji_density: style.emoji_density,
        };

        let reply = match self.parts.backend.generate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, channel = message.channel_id, "reply generation failed");
                self.parts.events.push(
                    "llm_error",
                    &format!("channel={} error={e}", message.channel_id),
                );
                self.send(message.channel_id, APOLOGY_BACKEND, Some(message.id))
                    .await;
                return DispatchOutcome::BackendFailed;
            }
        };

        self.context.add(&scope, Role::User, &content);
        self.context.add(&scope, Role::Assistant, &reply);

        if let Err(e) = self
            .parts
            .channel
            .send_message(message.channel_id, &reply, Some(message.id))
            .await
        {
            error!(error = %e, channel = message.channel_id, "reply send failed");
            self.parts.events.push(
                "send_error",
                &format!("channel={} error={e}", message.channel_id),
            );
            return DispatchOutcome::SendFailed;
        }

        self.finish_reply(message, &scope, &content, &reply, &decision)
            .await;
        DispatchOutcome::Replied
    }

    async fn finish_reply(
        &self,
        message: &InboundMessage,
        scope: &str,
        content: &str,
        reply: &str,
        decision: &StyleDecision,
    ) {
        info!(
            channel = message.channel_id,
            user = message.author_id,
            style = %decision.style_id,
            confidence = decision.confidence,
            "reply sent"
        );
        self.parts.events.push(
            "reply",
            &format!(
                "style={} confidence={:.2} reason={} channel={} user={}",
                decision.style_id,
                decision.confidence,
                decision.reason,
                message.channel_id,
                message.author_id
            ),
        );
        self.audit(
            "reply",
            &format!(
                "style={} channel={} user={}",
                decision.style_id, message.channel_id, message.author_id
            ),
        )
        .await;
        if let Err(e) = self
            .parts
            .conversation_log
            .record(
                scope,
                message.author_id,
                content,
                reply,
                &decision.style_id,
                &decision.reason.to_string(),
            )
            .await
        {
            warn!(error = %e, scope, "conversation log write failed");
        }
    }

    async fn transcribe(
        &self,
        message: &InboundMessage,
        attachment: &Attachment,
    ) -> TranscriptionResult {
        if self.config.behavior.send_typing {
            self.typing(message.channel_id).await;
        }

        let bytes = match self.parts.channel.fetch_attachment(attachment).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, filename = %attachment.filename, "attachment fetch failed");
                return self.asr_failure(message, APOLOGY_ASR_ERROR, &e).await;
            }
        };

        match self
            .parts
            .transcriber
            .transcribe(&bytes, &attachment.filename)
            .await
        {
            Ok(Some(text)) => TranscriptionResult::Text(text),
            Ok(None) => {
                info!(filename = %attachment.filename, "no speech recognized");
                self.send(message.channel_id, APOLOGY_ASR_NONE, Some(message.id))
                    .await;
                self.parts.events.push(
                    "asr_error",
                    &format!("channel={} no_recognition", message.channel_id),
                );
                TranscriptionResult::Failed(DispatchOutcome::TranscriptionFailed)
            }
            Err(e) => {
                warn!(error = %e, filename = %attachment.filename, "transcription failed");
                self.asr_failure(message, APOLOGY_ASR_ERROR, &e).await
            }
        }
    }

    async fn asr_failure(
        &self,
        message: &InboundMessage,
        apology: &str,
        error: &DoppelError,
    ) -> TranscriptionResult {
        self.send(message.channel_id, apology, Some(message.id)).await;
        self.parts.events.push(
            "asr_error",
            &format!("channel={} error={error}", message.channel_id),
        );
        TranscriptionResult::Failed(DispatchOutcome::TranscriptionFailed)
    }

    /// Manual style resolution order: channel pin, then guild, then user.
    async fn manual_style(&self, message: &InboundMessage) -> Option<String> {
        let mut keys = vec![format!("channel:{}", message.channel_id)];
        if let Some(guild) = message.guild_id {
            keys.push(format!("guild:{guild}"));
        }
        keys.push(format!("user:{}", message.author_id));
        self.parts.state.resolve_manual_style(&keys).await
    }

    fn style_for(&self, style_id: &str) -> &StyleConfig {
        let styles = self.config.style_map();
        styles
            .get(style_id)
            .or_else(|| styles.get(self.config.router.fallback_style.as_str()))
            .copied()
            // Validation guarantees the fallback style exists.
            .unwrap_or(&self.config.styles[0])
    }

    async fn human_pause(&self, channel_id: u64) {
        if self.config.behavior.send_typing {
            self.typing(channel_id).await;
        }
        let min = self.config.behavior.min_reply_delay;
        let max = self.config.behavior.max_reply_delay;
        let delay = if max > min {
            rand::thread_rng().gen_range(min..max)
        } else {
            min
        };
        if delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }

    async fn runtime_state(&self) -> RuntimeState {
        match self.parts.state.load().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "runtime state unreadable, assuming defaults");
                RuntimeState::default()
            }
        }
    }

    /// Outbound sends on failure paths are best effort.
    async fn send(&self, channel_id: u64, text: &str, reply_to: Option<u64>) {
        if let Err(e) = self.parts.channel.send_message(channel_id, text, reply_to).await {
            warn!(error = %e, channel = channel_id, "notification send failed");
        }
    }

    async fn typing(&self, channel_id: u64) {
        if let Err(e) = self.parts.channel.show_typing(channel_id).await {
            debug!(error = %e, channel = channel_id, "typing indicator failed");
        }
    }

    async fn audit(&self, event: &str, detail: &str) {
        if let Err(e) = self.parts.audit.record(event, detail).await {
            warn!(error = %e, event, "audit record failed");
        }
    }

    // One entry per channel ever seen; entries are a bare mutex each and
    // are never reclaimed. The map is bounded by the number of distinct
    // channels the agent participates in.
    async fn channel_lock(&self, channel_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.channel_locks.lock().await;
        locks
            .entry(channel_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

enum TranscriptionResult {
    Text(String),
    Failed(DispatchOutcome),
}
