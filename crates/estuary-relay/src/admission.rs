// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source admission policy.
//!
//! A pure predicate consulted before resolution. The per-key `enabled`
//! gate is separate and enforced by the resolver against a fresh store
//! read, so administrative toggles take effect immediately.

use std::collections::HashSet;

use estuary_config::RelayConfig;
use estuary_core::InboundMessage;

/// Telegram's service notification account.
pub const PLATFORM_SERVICE_SENDER: i64 = 777000;

/// Why a message was (or was not) admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionVerdict {
    Admitted,
    ExcludedSender(i64),
    ServiceMessage,
    NotAllowListed(i64),
}

impl AdmissionVerdict {
    pub fn is_admitted(self) -> bool {
        self == AdmissionVerdict::Admitted
    }
}

/// Decides which inbound messages may enter the relay pipeline.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    excluded_senders: HashSet<i64>,
    /// `None` when allow-list enforcement is off.
    allowlist: Option<HashSet<i64>>,
}

impl AdmissionPolicy {
    /// Builds the policy from relay configuration.
    ///
    /// The excluded set always contains the relay's own bot id (when
    /// known), the destination chat itself, and the platform service
    /// sender, plus any configured extras.
    pub fn from_config(config: &RelayConfig, self_id: Option<i64>) -> Self {
        let mut excluded_senders: HashSet<i64> =
            config.excluded_senders.iter().copied().collect();
        excluded_senders.insert(PLATFORM_SERVICE_SENDER);
        excluded_senders.insert(config.destination_chat_id);
        if let Some(id) = self_id {
            excluded_senders.insert(id);
        }

        let allowlist = config
            .only_allowlist
            .then(|| config.allowed_sources.iter().copied().collect());

        Self {
            excluded_senders,
            allowlist,
        }
    }

    /// The admission predicate. Pure: no store reads, no side effects.
    pub fn admit(&self, msg: &InboundMessage) -> AdmissionVerdict {
        if msg.is_service {
            return AdmissionVerdict::ServiceMessage;
        }
        if let Some(sender) = msg.sender_id
            && self.excluded_senders.contains(&sender)
        {
            return AdmissionVerdict::ExcludedSender(sender);
        }
        if let Some(allowlist) = &self.allowlist
            && !allowlist.contains(&msg.chat_id)
        {
            return AdmissionVerdict::NotAllowListed(msg.chat_id);
        }
        AdmissionVerdict::Admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::text_message;

    fn policy(only_allowlist: bool, allowed: Vec<i64>) -> AdmissionPolicy {
        AdmissionPolicy::from_config(
            &RelayConfig {
                destination_chat_id: -100999,
                excluded_senders: vec![5555],
                allowed_sources: allowed,
                only_allowlist,
                ..Default::default()
            },
            Some(424242),
        )
    }

    #[test]
    fn ordinary_message_is_admitted() {
        let policy = policy(false, vec![]);
        let msg = text_message(-100111, 1, "hello");
        assert!(policy.admit(&msg).is_admitted());
    }

    #[test]
    fn own_bot_and_service_senders_are_excluded() {
        let policy = policy(false, vec![]);

        let mut msg = text_message(-100111, 1, "hi");
        msg.sender_id = Some(424242);
        assert_eq!(policy.admit(&msg), AdmissionVerdict::ExcludedSender(424242));

        msg.sender_id = Some(PLATFORM_SERVICE_SENDER);
        assert_eq!(
            policy.admit(&msg),
            AdmissionVerdict::ExcludedSender(PLATFORM_SERVICE_SENDER)
        );

        msg.sender_id = Some(5555);
        assert_eq!(policy.admit(&msg), AdmissionVerdict::ExcludedSender(5555));
    }

    #[test]
    fn service_messages_are_filtered() {
        let policy = policy(false, vec![]);
        let mut msg = text_message(-100111, 1, "");
        msg.is_service = true;
        assert_eq!(policy.admit(&msg), AdmissionVerdict::ServiceMessage);
    }

    #[test]
    fn allowlist_gates_only_when_enforced() {
        let msg = text_message(-100111, 1, "hello");

        let open = policy(false, vec![-100333]);
        assert!(open.admit(&msg).is_admitted());

        let enforced = policy(true, vec![-100333]);
        assert_eq!(
            enforced.admit(&msg),
            AdmissionVerdict::NotAllowListed(-100111)
        );

        let listed = policy(true, vec![-100111]);
        assert!(listed.admit(&msg).is_admitted());
    }
}
