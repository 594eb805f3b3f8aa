//! A backend that produces no sound and remembers everything asked of it.
//!
//! Used by tests and by dry-run simulation to inspect routing, disposal and
//! the exact stream of note triggers.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use seq_song::{EffectConfig, Note};
use seq_transport::TransportTime;

use crate::{
    AudioBackend, ChannelOptions, EngineError, GeneratorNode, GeneratorParams, LevelMeter,
    MeterNode, NodeId, Voice,
};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Destination,
    Channel(ChannelOptions),
    Gain(f64),
    Generator(&'static str),
    Effect(&'static str),
    Splitter,
    Meter,
}

impl NodeKind {
    /// Whether this is a gain node, whatever its level.
    pub fn is_gain(&self) -> bool {
        matches!(self, NodeKind::Gain(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
    pub output: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    AttackRelease,
    Attack,
    Release,
}

/// One trigger received by a generator voice.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRecord {
    pub generator: NodeId,
    pub kind: TriggerKind,
    pub note: Note,
    /// Set for attack-release triggers only
    pub duration: Option<TransportTime>,
    /// Context time in seconds
    pub time: f64,
    /// Absent for releases
    pub velocity: Option<f64>,
}

type TriggerLog = Arc<Mutex<Vec<TriggerRecord>>>;

struct RecordingVoice {
    generator: NodeId,
    log: TriggerLog,
}

impl RecordingVoice {
    fn record(&self, record: TriggerRecord) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl Voice for RecordingVoice {
    fn trigger_attack_release(&self, note: &Note, duration: TransportTime, time: f64, velocity: f64) {
        self.record(TriggerRecord {
            generator: self.generator,
            kind: TriggerKind::AttackRelease,
            note: note.clone(),
            duration: Some(duration),
            time,
            velocity: Some(velocity),
        });
    }

    fn trigger_attack(&self, note: &Note, time: f64, velocity: f64) {
        self.record(TriggerRecord {
            generator: self.generator,
            kind: TriggerKind::Attack,
            note: note.clone(),
            duration: None,
            time,
            velocity: Some(velocity),
        });
    }

    fn trigger_release(&self, note: &Note, time: f64) {
        self.record(TriggerRecord {
            generator: self.generator,
            kind: TriggerKind::Release,
            note: note.clone(),
            duration: None,
            time,
            velocity: None,
        });
    }
}

/// Level stored as `f64` bits so it can be set from the control thread and
/// read from anywhere.
struct RecordingMeter {
    level: Arc<AtomicU64>,
}

impl LevelMeter for RecordingMeter {
    fn level(&self) -> f64 {
        f64::from_bits(self.level.load(Ordering::Relaxed))
    }
}

pub struct RecordingBackend {
    nodes: BTreeMap<NodeId, NodeKind>,
    connections: Vec<Connection>,
    disposals: BTreeMap<NodeId, usize>,
    meters: BTreeMap<NodeId, Arc<AtomicU64>>,
    triggers: TriggerLog,
    refused_effects: HashSet<&'static str>,
    refused_generators: HashSet<&'static str>,
    next_id: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        let mut backend = Self {
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            disposals: BTreeMap::new(),
            meters: BTreeMap::new(),
            triggers: Arc::new(Mutex::new(Vec::new())),
            refused_effects: HashSet::new(),
            refused_generators: HashSet::new(),
            next_id: 0,
        };
        backend.add(NodeKind::Destination);
        backend
    }

    /// Makes `create_effect` fail for the named effect, the way a backend
    /// without that effect would.
    pub fn refusing_effect(mut self, name: &'static str) -> Self {
        self.refused_effects.insert(name);
        self
    }

    /// Makes `create_generator` fail for the given generator type.
    pub fn refusing_generator(mut self, kind: &'static str) -> Self {
        self.refused_generators.insert(kind);
        self
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, kind);
        id
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).cloned()
    }

    /// Every node created so far, in creation order, disposed or not.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeKind)> {
        self.nodes.iter().map(|(id, kind)| (*id, kind))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.iter().any(|c| c.from == from && c.to == to)
    }

    /// Outgoing connections of `from`.
    pub fn targets(&self, from: NodeId) -> Vec<(NodeId, usize)> {
        self.connections
            .iter()
            .filter(|c| c.from == from)
            .map(|c| (c.to, c.output))
            .collect()
    }

    pub fn dispose_count(&self, id: NodeId) -> usize {
        self.disposals.get(&id).copied().unwrap_or(0)
    }

    /// Created nodes that have not been disposed, the destination excluded.
    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(id, kind)| **kind != NodeKind::Destination && self.dispose_count(**id) == 0)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Nodes disposed more than once, or disposed without ever being created.
    pub fn over_disposed(&self) -> Vec<NodeId> {
        self.disposals
            .iter()
            .filter(|(id, count)| **count > 1 || !self.nodes.contains_key(*id))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Snapshot of the triggers received so far, in the order they arrived.
    pub fn triggers(&self) -> Vec<TriggerRecord> {
        self.triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_triggers(&self) {
        self.triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Sets what the meter `id` reports. Unknown ids are ignored.
    pub fn set_meter_level(&self, id: NodeId, decibels: f64) {
        if let Some(level) = self.meters.get(&id) {
            level.store(decibels.to_bits(), Ordering::Relaxed);
        }
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingBackend")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("live", &self.live_nodes().len())
            .finish()
    }
}

impl AudioBackend for RecordingBackend {
    fn destination(&self) -> NodeId {
        NodeId(0)
    }

    fn create_channel(&mut self, options: &ChannelOptions) -> Result<NodeId, EngineError> {
        Ok(self.add(NodeKind::Channel(*options)))
    }

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, EngineError> {
        Ok(self.add(NodeKind::Gain(gain)))
    }

    fn create_generator(&mut self, params: &GeneratorParams) -> Result<GeneratorNode, EngineError> {
        if self.refused_generators.contains(params.kind()) {
            return Err(EngineError::UnsupportedGenerator(params.kind()));
        }
        let id = self.add(NodeKind::Generator(params.kind()));
        let voice = Arc::new(RecordingVoice {
            generator: id,
            log: Arc::clone(&self.triggers),
        });
        Ok(GeneratorNode { id, voice })
    }

    fn create_effect(&mut self, config: &EffectConfig) -> Result<NodeId, EngineError> {
        if self.refused_effects.contains(config.name()) {
            return Err(EngineError::UnsupportedEffect(config.name()));
        }
        Ok(self.add(NodeKind::Effect(config.name())))
    }

    fn create_splitter(&mut self) -> Result<NodeId, EngineError> {
        Ok(self.add(NodeKind::Splitter))
    }

    fn create_meter(&mut self) -> Result<MeterNode, EngineError> {
        let id = self.add(NodeKind::Meter);
        let level = Arc::new(AtomicU64::new(f64::NEG_INFINITY.to_bits()));
        self.meters.insert(id, Arc::clone(&level));
        Ok(MeterNode {
            id,
            meter: Arc::new(RecordingMeter { level }),
        })
    }

    fn connect(&mut self, from: NodeId, to: NodeId, output: usize) -> Result<(), EngineError> {
        for id in [from, to] {
            if self.dispose_count(id) > 0 {
                return Err(EngineError::Disposed(id));
            }
        }
        self.connections.push(Connection { from, to, output });
        Ok(())
    }

    fn dispose(&mut self, node: NodeId) {
        *self.disposals.entry(node).or_insert(0) += 1;
    }
}
