// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feeds arbitrary peer frames to a hosting session.
//! Whatever arrives, the host must not panic and must still be in a live or
//! errored state.

#![no_main]

use libfuzzer_sys::fuzz_target;
use onitama_core::{Engine, GameSettings, StandardRules};
use onitama_network::protocol::Frame;
use onitama_network::{ConnectionStatus, Connector, MemoryRelay, RemoteSession, SessionConfig};
use std::sync::Arc;
use std::time::Instant;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let relay = MemoryRelay::new();
    let engine: Arc<dyn Engine> = Arc::new(StandardRules::new(GameSettings {
        seed: Some(0),
        ..Default::default()
    }));
    let now = Instant::now();
    let Ok(mut host) = RemoteSession::host(engine, Box::new(relay.clone()), &SessionConfig::default(), now) else {
        return;
    };
    host.pump(now);
    let Ok(peer) = relay.connect(host.room_id()) else {
        return;
    };
    host.pump(now);

    // First byte picks the frame kind, the rest is payload
    let frame = if data[0] % 2 == 0 {
        Frame::Binary(data[1..].to_vec())
    } else {
        Frame::Text(String::from_utf8_lossy(&data[1..]).into_owned())
    };
    let _ = peer.transport.send(frame);
    host.pump(now);

    assert!(matches!(
        host.status(),
        ConnectionStatus::Playing | ConnectionStatus::OpponentDisconnected | ConnectionStatus::Errored
    ));
});
