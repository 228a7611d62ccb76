pub mod controller;
pub mod edit;
pub mod view_state;
pub mod zoom;

pub use controller::{
    CommitOutcome, CycleResult, CycleStatus, FetchCycle, PollCommand, PollState,
    PollingController, PollingSettings, QueryPlan, VisibleQuery, VisibleState,
};
pub use edit::{EditOutcome, FocusTarget, QueryChange, QueryEdit, QueryList};
pub use view_state::ViewState;
pub use zoom::ZoomController;
