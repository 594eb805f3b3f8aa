use std::collections::HashMap;

use seq_song::{Channel, ChannelSettings, EffectConfig, Instrument, Song};

use crate::{
    AudioBackend, ChannelOptions, EngineError, InstrumentHandle, InstrumentNode, MeterNode, NodeId,
    build_instrument,
};

/// Id under which the master channel's nodes are logged.
pub const MASTER_CHANNEL_ID: &str = "_master";

/// A channel node, the effects it feeds through, and the instruments
/// instantiated on it.
#[derive(Debug)]
struct ChannelStrip {
    node: NodeId,
    effects: Vec<NodeId>,
    instruments: HashMap<String, InstrumentNode>,
}

impl ChannelStrip {
    /// Creates the channel node and chains it through `effects` into
    /// `connect_to`, releasing what was built if any step fails.
    fn create<B: AudioBackend + ?Sized>(
        backend: &mut B,
        settings: &ChannelSettings,
        connect_to: NodeId,
    ) -> Result<Self, EngineError> {
        let node = backend.create_channel(&ChannelOptions::from(settings))?;
        let mut strip = ChannelStrip {
            node,
            effects: Vec::new(),
            instruments: HashMap::new(),
        };
        if let Err(err) = strip.chain(backend, &settings.effects, connect_to) {
            strip.dispose_effects(backend);
            backend.dispose(strip.node);
            return Err(err);
        }
        Ok(strip)
    }

    fn chain<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        effects: &[EffectConfig],
        connect_to: NodeId,
    ) -> Result<(), EngineError> {
        let mut current = self.node;
        for config in effects {
            let effect = backend.create_effect(config)?;
            self.effects.push(effect);
            backend.connect(current, effect, 0)?;
            current = effect;
        }
        backend.connect(current, connect_to, 0)
    }

    fn dispose_instruments<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        for (_, instrument) in self.instruments.drain() {
            instrument.dispose(backend);
        }
    }

    fn dispose_effects<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        for effect in self.effects.drain(..) {
            backend.dispose(effect);
        }
    }
}

/// L/R metering taps on the master channel.
struct Analyzers {
    splitter: NodeId,
    left: MeterNode,
    right: MeterNode,
}

/// Every live node of a loaded song and how they connect.
///
/// Instruments are created lazily, one instance per (channel, instrument)
/// pair, the first time a note needs them. [`RoutingGraph::dispose`] releases
/// every node exactly once and leaves the graph empty; disposing again does
/// nothing.
pub struct RoutingGraph {
    beats_per_bar: u32,
    master: Option<ChannelStrip>,
    channels: HashMap<String, ChannelStrip>,
    /// Channel ids in declaration order
    channel_order: Vec<String>,
    instrument_configs: HashMap<String, Instrument>,
    analyzers: Option<Analyzers>,
}

impl RoutingGraph {
    pub fn new(beats_per_bar: u32) -> Self {
        Self {
            beats_per_bar,
            master: None,
            channels: HashMap::new(),
            channel_order: Vec::new(),
            instrument_configs: HashMap::new(),
            analyzers: None,
        }
    }

    /// Builds master channel, channels, metering and the instrument table for
    /// `song`. On failure everything built so far is released.
    pub fn build<B: AudioBackend + ?Sized>(song: &Song, backend: &mut B) -> Result<Self, EngineError> {
        let mut graph = Self::new(song.beats_per_bar);
        if let Err(err) = graph.build_nodes(song, backend) {
            graph.dispose(backend);
            return Err(err);
        }
        graph.store_instrument_configs(&song.instruments);
        Ok(graph)
    }

    fn build_nodes<B: AudioBackend + ?Sized>(
        &mut self,
        song: &Song,
        backend: &mut B,
    ) -> Result<(), EngineError> {
        self.create_master_channel(backend, &song.master_channel)?;
        self.create_channels(backend, &song.channels)?;
        self.create_analyzers(backend)
    }

    /// Creates the master channel feeding the device output. Must come before
    /// [`RoutingGraph::create_channels`].
    pub fn create_master_channel<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        settings: &ChannelSettings,
    ) -> Result<NodeId, EngineError> {
        if self.master.is_some() {
            tracing::warn!("replacing existing master channel");
            self.dispose_master(backend);
        }
        let destination = backend.destination();
        let strip = ChannelStrip::create(backend, settings, destination)?;
        let node = strip.node;
        self.master = Some(strip);
        tracing::debug!(channel = MASTER_CHANNEL_ID, %node, "created channel");
        Ok(node)
    }

    /// Creates each channel, routed through its own effects into the master
    /// channel. A repeated id keeps the first channel.
    pub fn create_channels<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        channels: &[Channel],
    ) -> Result<(), EngineError> {
        let master = self.master.as_ref().ok_or(EngineError::NoMasterChannel)?.node;

        for channel in channels {
            if self.channels.contains_key(&channel.id) {
                tracing::warn!(channel = %channel.id, "duplicate channel id, keeping the first");
                continue;
            }
            let strip = ChannelStrip::create(backend, &channel.settings, master)?;
            tracing::debug!(channel = %channel.id, node = %strip.node, "created channel");
            self.channels.insert(channel.id.clone(), strip);
            self.channel_order.push(channel.id.clone());
        }
        Ok(())
    }

    /// Splits the master channel into left and right and meters each side.
    pub fn create_analyzers<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<(), EngineError> {
        let master = self.master.as_ref().ok_or(EngineError::NoMasterChannel)?.node;
        self.dispose_analyzers(backend);

        let splitter = backend.create_splitter()?;
        let left = match backend.create_meter() {
            Ok(meter) => meter,
            Err(err) => {
                backend.dispose(splitter);
                return Err(err);
            }
        };
        let right = match backend.create_meter() {
            Ok(meter) => meter,
            Err(err) => {
                backend.dispose(left.id);
                backend.dispose(splitter);
                return Err(err);
            }
        };
        let (left_id, right_id) = (left.id, right.id);
        self.analyzers = Some(Analyzers {
            splitter,
            left,
            right,
        });

        backend.connect(master, splitter, 0)?;
        backend.connect(splitter, left_id, 0)?;
        backend.connect(splitter, right_id, 1)
    }

    pub fn store_instrument_configs(&mut self, instruments: &[Instrument]) {
        for instrument in instruments {
            self.instrument_configs
                .entry(instrument.id.clone())
                .or_insert_with(|| instrument.clone());
        }
    }

    /// The instrument instance for `instrument_id` on `channel_id`, built and
    /// connected to the channel on first use.
    ///
    /// Unknown channel or instrument ids are logged and yield `Ok(None)`.
    pub fn get_or_create_channel_instrument<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        channel_id: &str,
        instrument_id: &str,
    ) -> Result<Option<InstrumentHandle>, EngineError> {
        let Some(strip) = self.channels.get_mut(channel_id) else {
            tracing::warn!(channel = channel_id, "channel not found");
            return Ok(None);
        };

        if let Some(existing) = strip.instruments.get(instrument_id) {
            return Ok(Some(existing.handle()));
        }

        let Some(config) = self.instrument_configs.get(instrument_id) else {
            tracing::warn!(instrument = instrument_id, "instrument config not found");
            return Ok(None);
        };

        let node = build_instrument(backend, config, self.beats_per_bar)?;
        if let Err(err) = backend.connect(node.output, strip.node, 0) {
            node.dispose(backend);
            return Err(err);
        }
        tracing::debug!(
            instrument = instrument_id,
            channel = channel_id,
            "created instrument for channel"
        );

        let handle = node.handle();
        strip.instruments.insert(instrument_id.to_string(), node);
        Ok(Some(handle))
    }

    pub fn master_node(&self) -> Option<NodeId> {
        self.master.as_ref().map(|m| m.node)
    }

    pub fn channel_node(&self, channel_id: &str) -> Option<NodeId> {
        self.channels.get(channel_id).map(|c| c.node)
    }

    /// Channel ids in the order they were created.
    pub fn channel_ids(&self) -> &[String] {
        &self.channel_order
    }

    /// Number of instrument instances across all channels.
    pub fn instrument_count(&self) -> usize {
        self.channels.values().map(|c| c.instruments.len()).sum()
    }

    /// True once nothing is left to dispose.
    pub fn is_empty(&self) -> bool {
        self.master.is_none()
            && self.channels.is_empty()
            && self.channel_order.is_empty()
            && self.instrument_configs.is_empty()
            && self.analyzers.is_none()
    }

    /// Left master level in decibels, `f64::NEG_INFINITY` without meters.
    pub fn left_level(&self) -> f64 {
        self.analyzers
            .as_ref()
            .map_or(f64::NEG_INFINITY, |a| a.left.meter.level())
    }

    pub fn right_level(&self) -> f64 {
        self.analyzers
            .as_ref()
            .map_or(f64::NEG_INFINITY, |a| a.right.meter.level())
    }

    /// Meter node ids (left, right), when metering is set up.
    pub fn meter_nodes(&self) -> Option<(NodeId, NodeId)> {
        self.analyzers.as_ref().map(|a| (a.left.id, a.right.id))
    }

    /// Releases instruments, then channel effects, then channels, then
    /// meters, then the master channel.
    pub fn dispose<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        for strip in self.channels.values_mut() {
            strip.dispose_instruments(backend);
        }

        for strip in self.channels.values_mut() {
            strip.dispose_effects(backend);
        }
        if let Some(master) = self.master.as_mut() {
            master.dispose_effects(backend);
        }

        for id in self.channel_order.drain(..) {
            if let Some(strip) = self.channels.remove(&id) {
                backend.dispose(strip.node);
            }
        }
        for (_, strip) in self.channels.drain() {
            backend.dispose(strip.node);
        }

        self.dispose_analyzers(backend);
        self.dispose_master(backend);
        self.instrument_configs.clear();
    }

    fn dispose_analyzers<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(analyzers) = self.analyzers.take() {
            backend.dispose(analyzers.left.id);
            backend.dispose(analyzers.right.id);
            backend.dispose(analyzers.splitter);
        }
    }

    fn dispose_master<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(mut master) = self.master.take() {
            master.dispose_instruments(backend);
            master.dispose_effects(backend);
            backend.dispose(master.node);
        }
    }
}

impl std::fmt::Debug for RoutingGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingGraph")
            .field("master", &self.master_node())
            .field("channels", &self.channel_order)
            .field("instruments", &self.instrument_count())
            .field("metered", &self.analyzers.is_some())
            .finish()
    }
}
