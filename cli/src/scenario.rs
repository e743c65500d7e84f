//! Canned peer behaviours for the simulator

use clap::ValueEnum;
use confpush_core::simulation::{
    ConflictingHandler, FixedReplyHandler, ScriptedSessionSource, StaticPeerSession,
};
use confpush_core::{CapabilitySet, ConfigSnapshot};
use serde_json::json;

/// Capability every simulated snapshot depends on
const REQUIRED_CAPABILITY: &str = "urn:example:params:xml:ns:yang:device-config?module=device-config";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// The peer never advertises the required capability
    MissingCapability,
    /// The peer accepts the first push
    Success,
    /// Every push hits a conflicting version
    Conflict,
    /// Three conflicts, then a renegotiated session accepts the push
    ConflictThenSuccess,
}

impl Scenario {
    pub fn session_source(&self) -> ScriptedSessionSource {
        let advertised = [REQUIRED_CAPABILITY];
        let sessions = match self {
            Scenario::MissingCapability => {
                vec![StaticPeerSession::new(Vec::<&str>::new()).with_handler(FixedReplyHandler::ok())]
            }
            Scenario::Success => {
                vec![StaticPeerSession::new(advertised).with_handler(FixedReplyHandler::ok())]
            }
            Scenario::Conflict => {
                vec![StaticPeerSession::new(advertised).with_handler(ConflictingHandler::always())]
            }
            Scenario::ConflictThenSuccess => {
                let conflicting =
                    StaticPeerSession::new(advertised).with_handler(ConflictingHandler::always());
                let working = StaticPeerSession::new(advertised).with_handler(FixedReplyHandler::ok());
                vec![conflicting.clone(), conflicting.clone(), conflicting, working]
            }
        };
        ScriptedSessionSource::new(sessions)
    }

    pub fn snapshots(&self, count: u64) -> Vec<ConfigSnapshot> {
        let required: CapabilitySet = [REQUIRED_CAPABILITY].into_iter().collect();
        (1..=count)
            .map(|position| {
                ConfigSnapshot::new(
                    position,
                    json!({
                        "edit-config": {
                            "target": "candidate",
                            "default-operation": "merge",
                            "config": { "snapshot": position }
                        }
                    }),
                    required.clone(),
                )
            })
            .collect()
    }
}
