// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subject codec.
//!
//! Outbound subjects are `{prefix}.{action}.{client_id}`. Agents subscribe to
//! `{prefix}.>` and classify every inbound subject back into the action, the
//! sender's identifier, and whether the sender is this agent.

/// Message kind encoded in the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Interest,
    ServiceList,
    Stop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interest => "interest",
            Self::ServiceList => "servicelist",
            Self::Stop => "stop",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "interest" => Some(Self::Interest),
            "servicelist" => Some(Self::ServiceList),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Result of classifying an inbound subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// `None` when the action token is not one we understand.
    pub action: Option<Action>,
    pub sender: String,
    pub is_self: bool,
}

/// Builds and parses subjects for one agent.
#[derive(Debug, Clone)]
pub struct SubjectCodec {
    prefix: String,
    client_id: String,
}

impl SubjectCodec {
    pub fn new(prefix: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), client_id: client_id.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Wildcard pattern covering every discovery subject under the prefix.
    pub fn subscription(&self) -> String {
        format!("{}.>", self.prefix)
    }

    pub fn outbound(&self, action: Action) -> String {
        format!("{}.{}.{}", self.prefix, action.as_str(), self.client_id)
    }

    /// Classify an inbound subject. Returns `None` for subjects outside the
    /// prefix or without a sender segment.
    pub fn parse(&self, subject: &str) -> Option<Inbound> {
        let rest = subject.strip_prefix(self.prefix.as_str())?.strip_prefix('.')?;
        let (action, sender) = rest.split_once('.')?;
        if sender.is_empty() {
            return None;
        }
        Some(Inbound {
            action: Action::from_token(action),
            sender: sender.to_owned(),
            is_self: sender == self.client_id,
        })
    }
}

#[cfg(test)]
#[path = "subject_tests.rs"]
mod tests;
