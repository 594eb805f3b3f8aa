use crate::TransportTime;

/// Handle returned by [`Clock::schedule`], used to cancel the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// Invoked by the clock at the scheduled position with the precise audio
/// context time (seconds) the event falls on.
///
/// Real clocks fire callbacks from their own thread, hence `Send`.
pub type Callback = Box<dyn FnMut(f64) + Send + 'static>;

/// Messages pushed from clock callbacks back to the control thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    /// The song reached its end bound while not looping.
    Ended { time: f64 },
}

/// The transport a sequencer schedules against.
///
/// Positions are symbolic ([`TransportTime`]); the clock resolves them with
/// the tempo and time signature given to [`Clock::set_tempo`].
pub trait Clock {
    fn set_tempo(&mut self, bpm: f64, beats_per_bar: u32);

    /// Schedule `callback` at an absolute transport position. With looping
    /// enabled the callback fires once per iteration.
    fn schedule(&mut self, at: TransportTime, callback: Callback) -> EventId;

    /// Cancel a scheduled callback. Unknown ids are ignored.
    fn cancel(&mut self, id: EventId);

    /// Arm or disarm looping between zero and `end`.
    fn set_loop(&mut self, enabled: bool, end: TransportTime);

    fn seek(&mut self, position: TransportTime);

    fn start(&mut self);

    /// Halt and rewind to zero.
    fn stop(&mut self);

    /// Halt, keeping the current position.
    fn pause(&mut self);

    /// Transport position in seconds.
    fn elapsed_seconds(&self) -> f64;

    /// Audio context time in seconds. Monotonic, unaffected by seeks.
    fn now(&self) -> f64;
}
