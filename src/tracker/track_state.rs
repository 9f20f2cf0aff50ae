/// Lifecycle of a tracked entity.
///
/// `New -> Active <-> Stale -> Evicted`. An entity is `Stale` while it goes
/// unmatched and `Evicted` once the no-match counter exceeds the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Created from a detection in the current frame
    #[default]
    New,
    /// Matched in the latest frame
    Active,
    /// Missed at least one frame
    Stale,
    /// Dropped from the store
    Evicted,
}
