pub mod capabilities;
pub mod collaborators;
pub mod completion;
pub mod model;
pub mod navigation;
pub mod outcome;
pub mod predicates;
pub mod session;
pub mod state;
pub mod step;
pub mod submission;
pub mod timeline;
pub mod units;
pub mod validation;

pub use completion::{is_step_complete, reconcile_completed_steps, CompletedSteps};
pub use navigation::{route, Direction, NavState, Route, RouteContext, WizardAction};
pub use session::{ChannelCompletion, UpdateTarget, WizardSession};
pub use state::{WizardState, WizardStore};
pub use step::{WizardMode, WizardStep};
pub use timeline::{build_timeline, Timeline};
