use seq_engine::{AudioBackend, RoutingGraph};
use seq_transport::{Clock, EventId, beats_to_time};

use crate::expand::ExpandedNote;

/// Schedules a trigger-attack-release on the clock for every note,
/// instantiating instruments on their channels as they are first needed.
///
/// Notes whose channel or instrument is unknown are skipped, as are notes
/// whose instrument the backend fails to build. Returns the handles of every
/// scheduled callback.
pub fn schedule_notes<C, B>(
    notes: &[ExpandedNote],
    beats_per_bar: u32,
    clock: &mut C,
    graph: &mut RoutingGraph,
    backend: &mut B,
) -> Vec<EventId>
where
    C: Clock + ?Sized,
    B: AudioBackend + ?Sized,
{
    let mut scheduled = Vec::with_capacity(notes.len());

    for note in notes {
        let instrument = match graph.get_or_create_channel_instrument(
            backend,
            &note.channel_id,
            &note.instrument_id,
        ) {
            Ok(Some(instrument)) => instrument,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(
                    channel = %note.channel_id,
                    instrument = %note.instrument_id,
                    "skipping note, instrument unavailable: {err}"
                );
                continue;
            }
        };

        let at = beats_to_time(note.start, beats_per_bar);
        let duration = beats_to_time(note.duration, beats_per_bar);
        let pitch = note.note.clone();
        let velocity = note.velocity;
        let id = clock.schedule(
            at,
            Box::new(move |time| instrument.trigger(&pitch, duration, time, velocity)),
        );
        scheduled.push(id);
    }

    tracing::debug!(scheduled = scheduled.len(), notes = notes.len(), "scheduled notes");
    scheduled
}

/// Cancels every handle in `scheduled`, leaving it empty.
pub fn cancel_all<C: Clock + ?Sized>(clock: &mut C, scheduled: &mut Vec<EventId>) {
    for id in scheduled.drain(..) {
        clock.cancel(id);
    }
}
