/// App-lifecycle and audio-interruption event for observers.
///
/// `EnteredBackground { continuing: true }` is the hand-off point for a
/// background-audio-session component; the engine keeps playing and expects
/// control back on the matching `EnteredForeground`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum LifecycleEvent {
    EnteredBackground { continuing: bool },
    EnteredForeground { resumed: bool },
    InterruptionBegan,
    InterruptionEnded { resumed: bool },
}
