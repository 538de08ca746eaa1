// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access filtering and conversation-scope derivation.
//!
//! [`AccessPolicy::check`] is a pure function over the inbound message and
//! configuration: it evaluates rejections in a fixed order and short-circuits
//! on the first match. The blacklist always wins; each whitelist dimension is
//! only enforced when it is non-empty.

use doppel_config::model::{BehaviorConfig, DiscordConfig};
use doppel_core::types::{AccessDecision, InboundMessage, ReasonCode, ScopeMode};

/// Stateless admission filter over platform access rules.
pub struct AccessPolicy {
    discord: DiscordConfig,
    behavior: BehaviorConfig,
}

impl AccessPolicy {
    pub fn new(discord: DiscordConfig, behavior: BehaviorConfig) -> Self {
        Self { discord, behavior }
    }

    /// Decide whether a message may enter the pipeline.
    ///
    /// Evaluation order: bot author, DM policy, blacklists (guild, channel,
    /// user), whitelists (guild, channel, user), mention-only gate.
    /// `self_id` is the agent's own user id, needed by the mention gate;
    /// `None` disables that gate.
    pub fn check(&self, message: &InboundMessage, self_id: Option<u64>) -> AccessDecision {
        if message.author_is_bot && !self.behavior.respond_to_bots {
            return AccessDecision::deny(ReasonCode::BotMessage);
        }

        if message.guild_id.is_none() && !self.discord.allow_dm {
            return AccessDecision::deny(ReasonCode::DmBlocked);
        }

        // Blacklist first.
        if let Some(guild_id) = message.guild_id {
            if self.discord.blacklist.guilds.contains(&guild_id) {
                return AccessDecision::deny(ReasonCode::GuildBlacklisted);
            }
        }
        if self.discord.blacklist.channels.contains(&message.channel_id) {
            return AccessDecision::deny(ReasonCode::ChannelBlacklisted);
        }
        if self.discord.blacklist.users.contains(&message.author_id) {
            return AccessDecision::deny(ReasonCode::UserBlacklisted);
        }

        // Whitelists only if provided.
        if let Some(guild_id) = message.guild_id {
            if !self.discord.whitelist.guilds.is_empty()
                && !self.discord.whitelist.guilds.contains(&guild_id)
            {
                return AccessDecision::deny(ReasonCode::GuildNotWhitelisted);
            }
        }
        if !self.discord.whitelist.channels.is_empty()
            && !self.discord.whitelist.channels.contains(&message.channel_id)
        {
            return AccessDecision::deny(ReasonCode::ChannelNotWhitelisted);
        }
        if !self.discord.whitelist.users.is_empty()
            && !self.discord.whitelist.users.contains(&message.author_id)
        {
            return AccessDecision::deny(ReasonCode::UserNotWhitelisted);
        }

        if self.behavior.mention_only
            && message.guild_id.is_some()
            && let Some(me) = self_id
            && !message.mentions.contains(&me)
        {
            return AccessDecision::deny(ReasonCode::NotMentioned);
        }

        AccessDecision::allow()
    }
}

/// Derive the context key for a message under the configured scope mode.
///
/// `user:<id>` in user mode, `thread:<id>` in thread mode when the message
/// lives in a thread, otherwise `channel:<id>`.
pub fn scope_id(message: &InboundMessage, mode: ScopeMode) -> String {
    match mode {
        ScopeMode::User => format!("user:{}", message.author_id),
        ScopeMode::Thread => match message.thread_id {
            Some(thread_id) => format!("thread:{thread_id}"),
            None => format!("channel:{}", message.channel_id),
        },
        ScopeMode::Channel => format!("channel:{}", message.channel_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_message() -> InboundMessage {
        InboundMessage {
            id: 1,
            author_id: 100,
            channel_id: 200,
            guild_id: Some(300),
            thread_id: None,
            content: "hello".into(),
            attachments: Vec::new(),
            author_is_bot: false,
            mentions: Vec::new(),
        }
    }

    fn policy(discord: DiscordConfig, behavior: BehaviorConfig) -> AccessPolicy {
        AccessPolicy::new(discord, behavior)
    }

    #[test]
    fn plain_guild_message_is_allowed() {
        let p = policy(DiscordConfig::default(), BehaviorConfig::default());
        let decision = p.check(&base_message(), None);
        assert!(decision.allowed);
        assert_eq!(decision.reason, ReasonCode::Allowed);
    }

    #[test]
    fn bot_author_is_rejected_by_default() {
        let p = policy(DiscordConfig::default(), BehaviorConfig::default());
        let mut msg = base_message();
        msg.author_is_bot = true;
        assert_eq!(p.check(&msg, None).reason, ReasonCode::BotMessage);
    }

    #[test]
    fn bot_author_allowed_when_configured() {
        let behavior = BehaviorConfig {
            respond_to_bots: true,
            ..BehaviorConfig::default()
        };
        let p = policy(DiscordConfig::default(), behavior);
        let mut msg = base_message();
        msg.author_is_bot = true;
        assert!(p.check(&msg, None).allowed);
    }

    #[test]
    fn dm_blocked_when_disallowed() {
        let discord = DiscordConfig {
            allow_dm: false,
            ..DiscordConfig::default()
        };
        let p = policy(discord, BehaviorConfig::default());
        let mut msg = base_message();
        msg.guild_id = None;
        assert_eq!(p.check(&msg, None).reason, ReasonCode::DmBlocked);
    }

    #[test]
    fn blacklist_beats_whitelist() {
        let mut discord = DiscordConfig::default();
        discord.whitelist.users.push(100);
        discord.blacklist.users.push(100);
        let p = policy(discord, BehaviorConfig::default());
        assert_eq!(
            p.check(&base_message(), None).reason,
            ReasonCode::UserBlacklisted
        );
    }

    #[test]
    fn empty_whitelist_imposes_no_restriction() {
        let mut discord = DiscordConfig::default();
        discord.whitelist.guilds.clear();
        let p = policy(discord, BehaviorConfig::default());
        assert!(p.check(&base_message(), None).allowed);
    }

    #[test]
    fn nonempty_whitelist_excludes_other_channels() {
        let mut discord = DiscordConfig::default();
        discord.whitelist.channels.push(999);
        let p = policy(discord, BehaviorConfig::default());
        assert_eq!(
            p.check(&base_message(), None).reason,
            ReasonCode::ChannelNotWhitelisted
        );
    }

    #[test]
    fn guild_whitelist_ignored_for_dms() {
        let mut discord = DiscordConfig::default();
        discord.whitelist.guilds.push(999);
        let p = policy(discord, BehaviorConfig::default());
        let mut msg = base_message();
        msg.guild_id = None;
        assert!(p.check(&msg, None).allowed);
    }

    #[test]
    fn mention_only_requires_self_mention_in_guild() {
        let behavior = BehaviorConfig {
            mention_only: true,
            ..BehaviorConfig::default()
        };
        let p = policy(DiscordConfig::default(), behavior);

        let msg = base_message();
        assert_eq!(p.check(&msg, Some(7)).reason, ReasonCode::NotMentioned);

        let mut mentioned = base_message();
        mentioned.mentions.push(7);
        assert!(p.check(&mentioned, Some(7)).allowed);
    }

    #[test]
    fn mention_only_does_not_gate_dms() {
        let behavior = BehaviorConfig {
            mention_only: true,
            ..BehaviorConfig::default()
        };
        let p = policy(DiscordConfig::default(), behavior);
        let mut msg = base_message();
        msg.guild_id = None;
        assert!(p.check(&msg, Some(7)).allowed);
    }

    #[test]
    fn scope_id_per_mode() {
        let mut msg = base_message();
        assert_eq!(scope_id(&msg, ScopeMode::Channel), "channel:200");
        assert_eq!(scope_id(&msg, ScopeMode::User), "user:100");
        // Thread mode without a thread falls back to the channel.
        assert_eq!(scope_id(&msg, ScopeMode::Thread), "channel:200");
        msg.thread_id = Some(555);
        assert_eq!(scope_id(&msg, ScopeMode::Thread), "thread:555");
    }
}
