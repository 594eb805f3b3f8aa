//! The song laid out on absolute time for display: one entry per note and one
//! marker per nested pattern trigger.

use serde::Serialize;

use seq_song::Song;

use crate::expand::expand_song;

/// Lane used for pattern markers when the song has no channels.
pub const MASTER_LANE: &str = "master";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimelineEventKind {
    #[serde(rename_all = "camelCase")]
    Note { instrument_id: String, note: String },
    #[serde(rename_all = "camelCase")]
    Pattern { pattern_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(flatten)]
    pub kind: TimelineEventKind,
    pub channel_id: String,
    /// Absolute start in beats
    pub start_beat: f64,
    /// In beats
    pub duration: f64,
    /// Whether the note comes from a pattern nested in another
    pub is_nested: bool,
}

impl TimelineEvent {
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration
    }

    /// Short label: the note name, or the triggered pattern.
    pub fn label(&self) -> String {
        match &self.kind {
            TimelineEventKind::Note { note, .. } => note.clone(),
            TimelineEventKind::Pattern { pattern_id } => format!("▶ {pattern_id}"),
        }
    }
}

/// Every note and nested-pattern marker of `song`, stably sorted by start.
///
/// Pattern markers sit on the first channel's lane (or [`MASTER_LANE`]) and
/// last as long as the nested pattern, or one beat when it does not exist.
pub fn flatten_timeline(song: &Song) -> Vec<TimelineEvent> {
    let expansion = expand_song(song);
    let marker_lane = song
        .channels
        .first()
        .map_or(MASTER_LANE, |c| c.id.as_str());

    let notes = expansion.notes.into_iter().map(|n| TimelineEvent {
        is_nested: n.is_nested(),
        kind: TimelineEventKind::Note {
            instrument_id: n.instrument_id,
            note: n.note.to_string(),
        },
        channel_id: n.channel_id,
        start_beat: n.start,
        duration: n.duration,
    });
    let markers = expansion.placements.into_iter().map(|p| TimelineEvent {
        kind: TimelineEventKind::Pattern {
            pattern_id: p.pattern_id,
        },
        channel_id: marker_lane.to_string(),
        start_beat: p.start,
        duration: p.length,
        is_nested: false,
    });

    let mut events: Vec<TimelineEvent> = notes.chain(markers).collect();
    events.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));
    events
}

/// A channel's share of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLane {
    pub channel_id: String,
    pub events: Vec<TimelineEvent>,
}

/// Buckets `events` into lanes: one per declared channel in song order, then
/// any other lane in order of first appearance.
pub fn group_by_channel(song: &Song, events: &[TimelineEvent]) -> Vec<ChannelLane> {
    let mut lanes: Vec<ChannelLane> = song
        .channels
        .iter()
        .map(|c| ChannelLane {
            channel_id: c.id.clone(),
            events: Vec::new(),
        })
        .collect();

    for event in events {
        match lanes.iter_mut().find(|l| l.channel_id == event.channel_id) {
            Some(lane) => lane.events.push(event.clone()),
            None => lanes.push(ChannelLane {
                channel_id: event.channel_id.clone(),
                events: vec![event.clone()],
            }),
        }
    }
    lanes
}
