mod blob;
mod history;
mod kalman_filter;
mod matching;
mod track_state;
mod track_store;

pub use blob::{Motion, TrackedEntity};
pub use history::TrackHistory;
pub use kalman_filter::{KalmanFilter, KalmanState};
pub use matching::{
    AssignmentResult, Detection, MatchStrategy, assign, greedy_assignment, linear_assignment,
};
pub use track_state::TrackState;
pub use track_store::{EntitySnapshot, MatchReport, TrackStore, TrackerConfig, TrackerKind};
