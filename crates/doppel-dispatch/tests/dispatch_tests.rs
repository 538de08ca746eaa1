// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests over the mock adapters.

use std::sync::Arc;

use doppel_config::DoppelConfig;
use doppel_core::{Attachment, ReasonCode};
use doppel_dispatch::{DispatchOutcome, Dispatcher, DispatcherParts};
use doppel_state::StateStore;
use doppel_storage::{AuditLog, ConversationLog, EventBuffer};
use doppel_test_utils::{text_message, MockBackend, MockChannel, MockTranscriber};
use tempfile::TempDir;

const SELF_ID: u64 = 1000;

struct Fixture {
    log: Arc<ConversationLog>,
    dispatcher: Dispatcher,
    channel: Arc<MockChannel>,
    backend: Arc<MockBackend>,
    state: Arc<StateStore>,
    config: DoppelConfig,
    _dir: TempDir,
}

fn test_config() -> DoppelConfig {
    let mut config = DoppelConfig::default();
    config.behavior.min_reply_delay = 0.0;
    config.behavior.max_reply_delay = 0.0;
    config
}

fn fixture_with(config: DoppelConfig, transcriber: MockTranscriber) -> Fixture {
    let dir = TempDir::new().unwrap();
    let channel = Arc::new(MockChannel::new());
    let backend = Arc::new(MockBackend::new());
    let state = Arc::new(StateStore::new(dir.path().join("state.json")).unwrap());
    let parts = DispatcherParts {
        channel: channel.clone(),
        backend: backend.clone(),
        transcriber: Arc::new(transcriber),
        state: state.clone(),
        audit: Arc::new(AuditLog::open(dir.path().join("audit.json")).unwrap()),
        events: Arc::new(EventBuffer::new()),
        conversation_log: Arc::new(
            ConversationLog::open(
                dir.path().join("conversations.jsonl"),
                dir.path().join("exports"),
            )
            .unwrap(),
        ),
    };
    Fixture {
        log: parts.conversation_log.clone(),
        dispatcher: Dispatcher::new(config.clone(), Some(SELF_ID), parts),
        channel,
        backend,
        state,
        config,
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(test_config(), MockTranscriber::hearing_nothing())
}

#[tokio::test]
async fn thanks_routes_to_warm_and_replies() {
    let f = fixture();
    f.backend.add_response("不客气呀").await;

    let msg = text_message(1, 42, 7, "谢谢你");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Replied);

    let sent = f.channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "不客气呀");
    assert_eq!(sent[0].channel_id, 7);
    assert_eq!(sent[0].reply_to, Some(1));

    let warm = f.config.styles.iter().find(|s| s.id == "warm").unwrap();
    let requests = f.backend.requests().await;
    assert_eq!(requests[0].system_prompt, warm.system_prompt);
    assert!(requests[0].history.is_empty());

    // The follow-up sees both turns of the first exchange.
    let msg2 = text_message(2, 42, 7, "今天心情好多了");
    assert_eq!(f.dispatcher.dispatch(&msg2).await, DispatchOutcome::Replied);
    let requests = f.backend.requests().await;
    let history = &requests[1].history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "谢谢你");
    assert_eq!(history[1].content, "不客气呀");
}

#[tokio::test]
async fn successful_exchange_is_logged_with_style_and_reason() {
    let f = fixture();
    f.backend.add_response("不客气呀").await;

    let msg = text_message(1, 42, 7, "谢谢你");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Replied);

    let records = f.log.tail(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].scope, "channel:7");
    assert_eq!(records[0].user, 42);
    assert_eq!(records[0].content, "谢谢你");
    assert_eq!(records[0].reply, "不客气呀");
    assert_eq!(records[0].style, "warm");
    assert_eq!(records[0].reason, "rule_match");
}

#[tokio::test]
async fn self_messages_are_ignored_silently() {
    let f = fixture();
    let msg = text_message(1, SELF_ID, 7, "自言自语");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::SelfMessage);
    assert_eq!(f.channel.sent_count().await, 0);
    assert_eq!(f.backend.call_count(), 0);
}

#[tokio::test]
async fn blacklisted_user_is_blocked() {
    let mut config = test_config();
    config.discord.blacklist.users.push(42);
    let f = fixture_with(config, MockTranscriber::hearing_nothing());

    let msg = text_message(1, 42, 7, "在吗");
    assert_eq!(
        f.dispatcher.dispatch(&msg).await,
        DispatchOutcome::Blocked(ReasonCode::UserBlacklisted)
    );
    assert_eq!(f.channel.sent_count().await, 0);
    let events = f.dispatcher.events().snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "blocked");
}

#[tokio::test]
async fn disabled_state_short_circuits() {
    let f = fixture();
    f.state.set_enabled(false).await.unwrap();

    let msg = text_message(1, 42, 7, "在吗");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Disabled);
    assert_eq!(f.channel.sent_count().await, 0);
}

#[tokio::test]
async fn near_identical_repeat_is_dropped() {
    let f = fixture();
    let msg = text_message(1, 42, 7, "今晚一起吃饭吗");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Replied);

    let repeat = text_message(2, 42, 7, "今晚一起吃饭吗 ");
    assert_eq!(f.dispatcher.dispatch(&repeat).await, DispatchOutcome::Duplicate);
    assert_eq!(f.channel.sent_count().await, 1);
}

#[tokio::test]
async fn rate_limit_notifies_once_per_cooldown() {
    let mut config = test_config();
    config.behavior.rate_limit.max_messages = 1;
    let f = fixture_with(config.clone(), MockTranscriber::hearing_nothing());

    let first = text_message(1, 42, 7, "第一条");
    assert_eq!(f.dispatcher.dispatch(&first).await, DispatchOutcome::Replied);

    let second = text_message(2, 42, 7, "第二条完全不同的话");
    assert_eq!(f.dispatcher.dispatch(&second).await, DispatchOutcome::RateLimited);
    let sent = f.channel.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].text, config.behavior.rate_limit.cooldown_prompt);

    // Still limited, but the prompt is not repeated.
    let third = text_message(3, 42, 7, "第三条又是别的内容");
    assert_eq!(f.dispatcher.dispatch(&third).await, DispatchOutcome::RateLimited);
    assert_eq!(f.channel.sent_count().await, 2);
}

#[tokio::test]
async fn voice_message_is_transcribed_into_the_prompt() {
    let f = fixture_with(test_config(), MockTranscriber::recognizing("明天几点开会"));
    f.backend.add_response("十点，会议室A").await;

    let mut msg = text_message(1, 42, 7, "");
    msg.attachments.push(Attachment {
        filename: "voice.ogg".into(),
        content_type: Some("audio/ogg".into()),
        url: "https://cdn.test/voice.ogg".into(),
    });
    f.channel.stage_attachment("https://cdn.test/voice.ogg", vec![1, 2, 3]).await;

    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Replied);
    let requests = f.backend.requests().await;
    assert!(requests[0].user_content.contains("语音转写：明天几点开会"));
}

#[tokio::test]
async fn transcription_error_sends_an_apology() {
    let f = fixture_with(test_config(), MockTranscriber::failing());

    let mut msg = text_message(1, 42, 7, "");
    msg.attachments.push(Attachment {
        filename: "voice.ogg".into(),
        content_type: Some("audio/ogg".into()),
        url: "https://cdn.test/voice.ogg".into(),
    });
    f.channel.stage_attachment("https://cdn.test/voice.ogg", vec![1]).await;

    assert_eq!(
        f.dispatcher.dispatch(&msg).await,
        DispatchOutcome::TranscriptionFailed
    );
    let sent = f.channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("语音"));
    assert_eq!(f.backend.call_count(), 0);
}

#[tokio::test]
async fn image_only_message_asks_for_text() {
    let f = fixture();

    let mut msg = text_message(1, 42, 7, "");
    msg.attachments.push(Attachment {
        filename: "photo.png".into(),
        content_type: Some("image/png".into()),
        url: "https://cdn.test/photo.png".into(),
    });

    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::ImageOnly);
    let sent = f.channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("文字"));
    assert_eq!(f.backend.call_count(), 0);
}

#[tokio::test]
async fn image_alongside_text_adds_a_hint() {
    let f = fixture();

    let mut msg = text_message(1, 42, 7, "你看这张图");
    msg.attachments.push(Attachment {
        filename: "photo.png".into(),
        content_type: Some("image/png".into()),
        url: "https://cdn.test/photo.png".into(),
    });

    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Replied);
    let requests = f.backend.requests().await;
    assert!(requests[0].user_content.contains("图片内容无法读取"));
}

#[tokio::test]
async fn backend_failure_becomes_an_apology() {
    let f = fixture();
    f.backend.fail_next();

    let msg = text_message(1, 42, 7, "在吗");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::BackendFailed);
    let sent = f.channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("出错"));

    // Failed exchanges leave no trace in the history.
    f.backend.add_response("我在").await;
    let msg2 = text_message(2, 42, 7, "还在吗");
    assert_eq!(f.dispatcher.dispatch(&msg2).await, DispatchOutcome::Replied);
    let requests = f.backend.requests().await;
    assert!(requests[1].history.is_empty());
}

#[tokio::test]
async fn manual_style_pin_overrides_routing() {
    let f = fixture();
    f.state.set_manual_style("channel:7", Some("snark")).await.unwrap();

    let msg = text_message(1, 42, 7, "谢谢你");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::Replied);

    let snark = f.config.styles.iter().find(|s| s.id == "snark").unwrap();
    let requests = f.backend.requests().await;
    assert_eq!(requests[0].system_prompt, snark.system_prompt);
}

#[tokio::test]
async fn empty_message_is_ignored() {
    let f = fixture();
    let msg = text_message(1, 42, 7, "   ");
    assert_eq!(f.dispatcher.dispatch(&msg).await, DispatchOutcome::EmptyContent);
    assert_eq!(f.channel.sent_count().await, 0);
}
