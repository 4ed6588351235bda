// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protobuf wire messages exchanged between agents.

use prost::Message as _;

use crate::subject::Action;

/// One announced service instance.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceInfoProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub address: String,
    #[prost(string, tag = "3")]
    pub client_id: String,
}

/// Request asking providers of the named services to announce them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceInterest {
    #[prost(string, repeated, tag = "1")]
    pub service_name: Vec<String>,
}

/// Orderly shutdown notice from an agent.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AgentStopped {
    #[prost(string, tag = "1")]
    pub agent_id: String,
}

/// Announcement of one or more services.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServicesList {
    #[prost(message, repeated, tag = "1")]
    pub services: Vec<ServiceInfoProto>,
}

/// A decoded discovery message, tagged by the subject action it travels on.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Interest(ServiceInterest),
    ServicesList(ServicesList),
    Stopped(AgentStopped),
}

impl Message {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Interest(m) => m.encode_to_vec(),
            Self::ServicesList(m) => m.encode_to_vec(),
            Self::Stopped(m) => m.encode_to_vec(),
        }
    }

    /// Decode a payload according to the action it arrived on.
    pub fn decode(action: Action, payload: &[u8]) -> Result<Self, prost::DecodeError> {
        Ok(match action {
            Action::Interest => Self::Interest(ServiceInterest::decode(payload)?),
            Action::ServiceList => Self::ServicesList(ServicesList::decode(payload)?),
            Action::Stop => Self::Stopped(AgentStopped::decode(payload)?),
        })
    }
}
