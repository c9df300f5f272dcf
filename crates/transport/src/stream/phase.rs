use derive_more::Display;

/// Lifecycle phase of a streaming session.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Phase {
    #[display("idle")]
    Idle,
    /// The sink is open and the initial prefix is being fetched.
    #[display("buffering")]
    Buffering,
    /// Enough is buffered to start playback; the remainder is scheduled.
    #[display("playable")]
    Playable,
    /// The remainder is being fetched.
    #[display("loading")]
    Loading,
    #[display("complete")]
    Complete,
    #[display("error")]
    Error,
}
impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Something that happened to a streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// The session started opening its sink.
    Open,
    /// The buffered duration reached the target.
    Buffered,
    /// Playback started, or the lazy-load delay passed.
    Promote,
    /// Every chunk has been handed to the sink.
    Loaded,
    Fail,
    Cancel,
}

/// The phase `phase` moves to on `event`, or `None` if the event does not
/// apply in that phase.
pub fn transition(phase: Phase, event: Event) -> Option<Phase> {
    use Event as E;
    use Phase as P;
    match (phase, event) {
        (P::Idle, E::Open) => Some(P::Buffering),
        (P::Buffering, E::Buffered) => Some(P::Playable),
        (P::Playable, E::Promote) => Some(P::Loading),
        (P::Buffering | P::Loading, E::Loaded) => Some(P::Complete),
        (P::Idle | P::Buffering | P::Playable | P::Loading, E::Fail) => Some(P::Error),
        (P::Buffering | P::Playable | P::Loading, E::Cancel) => Some(P::Idle),
        _ => None,
    }
}
