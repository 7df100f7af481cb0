//! Doublures partagées par les tests d'intégration.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use ipmchannels::{Channel, ChannelDirectory};
use ipmcontrol::{EngineError, EngineLogMessage, LoadTicket, MediaEngine, Mixer, MixerError, PropertyChange};
use parking_lot::Mutex;
use serde_json::Value;

pub const NOVIDEO: &str = "/images/novideo.png";
pub const NOSIGNAL: &str = "/images/nosignal.png";

/// Moteur en mémoire qui démarre chaque chargement immédiatement.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<String>>,
    pub properties: Mutex<HashMap<String, Value>>,
    observers: Mutex<Vec<(String, Sender<PropertyChange>)>>,
    log_subscribers: Mutex<Vec<Sender<EngineLogMessage>>>,
    next_ticket: Mutex<u64>,
    pub fail_loads: Mutex<bool>,
}

impl FakeEngine {
    pub fn with_video(height: u64, interlaced: bool, codec: &str) -> Self {
        let engine = Self::default();
        {
            let mut props = engine.properties.lock();
            props.insert("video-params".into(), serde_json::json!({ "h": height }));
            props.insert(
                "video-frame-info".into(),
                serde_json::json!({ "interlaced": interlaced }),
            );
            props.insert("video-format".into(), Value::String(codec.into()));
        }
        engine
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("load ").map(str::to_string))
            .collect()
    }

    pub fn emit(&self, name: &str, value: Value) {
        for (observed, tx) in self.observers.lock().iter() {
            if observed == name {
                let _ = tx.send(PropertyChange {
                    name: name.to_string(),
                    value: value.clone(),
                });
            }
        }
    }

    pub fn emit_log(&self, level: &str, component: &str, text: &str) {
        self.log_subscribers
            .lock()
            .retain(|tx| tx.send(EngineLogMessage::new(level, component, text)).is_ok());
    }

    /// Ferme le flux de logs, ce qui termine les observateurs.
    pub fn close_logs(&self) {
        self.log_subscribers.lock().clear();
    }
}

impl MediaEngine for FakeEngine {
    fn load(&self, source: &str) -> Result<LoadTicket, EngineError> {
        self.calls.lock().push(format!("load {}", source));
        let mut next = self.next_ticket.lock();
        *next += 1;
        Ok(LoadTicket(*next))
    }

    fn wait_until_started(&self, ticket: LoadTicket) -> Result<(), EngineError> {
        if *self.fail_loads.lock() {
            return Err(EngineError::LoadFailed(format!("ticket {}", ticket.0)));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.calls.lock().push("stop".into());
        Ok(())
    }

    fn set_property(&self, name: &str, value: &str) -> Result<(), EngineError> {
        self.calls.lock().push(format!("set {}={}", name, value));
        Ok(())
    }

    fn get_property(&self, name: &str) -> Result<Value, EngineError> {
        self.properties
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Command(name.to_string(), "property unavailable".into()))
    }

    fn observe(&self, name: &str) -> Result<Receiver<PropertyChange>, EngineError> {
        let (tx, rx) = unbounded();
        self.observers.lock().push((name.to_string(), tx));
        Ok(rx)
    }

    fn log_messages(&self) -> Receiver<EngineLogMessage> {
        let (tx, rx) = unbounded();
        self.log_subscribers.lock().push(tx);
        rx
    }
}

/// Mixer en mémoire.
pub struct FakeMixer {
    pub level: Mutex<u8>,
    pub muted: Mutex<bool>,
}

impl FakeMixer {
    pub fn new(level: u8, muted: bool) -> Self {
        Self {
            level: Mutex::new(level),
            muted: Mutex::new(muted),
        }
    }
}

impl Mixer for FakeMixer {
    fn name(&self) -> &str {
        "Fake"
    }

    fn volume(&self) -> Result<u8, MixerError> {
        Ok(*self.level.lock())
    }

    fn set_volume(&self, level: u8) -> Result<(), MixerError> {
        *self.level.lock() = level;
        Ok(())
    }

    fn is_muted(&self) -> Result<bool, MixerError> {
        Ok(*self.muted.lock())
    }

    fn set_muted(&self, muted: bool) -> Result<(), MixerError> {
        *self.muted.lock() = muted;
        Ok(())
    }
}

/// Mixer partagé, pour garder la main dessus après l'avoir confié à la session.
pub struct SharedMixer(pub Arc<FakeMixer>);

impl Mixer for SharedMixer {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn volume(&self) -> Result<u8, MixerError> {
        self.0.volume()
    }

    fn set_volume(&self, level: u8) -> Result<(), MixerError> {
        self.0.set_volume(level)
    }

    fn is_muted(&self) -> Result<bool, MixerError> {
        self.0.is_muted()
    }

    fn set_muted(&self, muted: bool) -> Result<(), MixerError> {
        self.0.set_muted(muted)
    }
}

pub fn channels(count: usize) -> Arc<ChannelDirectory> {
    let channels = (0..count)
        .map(|i| Channel {
            name: format!("Channel {}", i),
            url: format!("http://streams.example/{}.m3u8", i),
            logo: format!("http://logos.example/{}.png", i),
            group: if i % 2 == 0 { "News".into() } else { "Sports".into() },
        })
        .collect();
    Arc::new(ChannelDirectory::new(channels))
}
