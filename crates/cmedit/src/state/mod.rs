pub mod selection;
pub mod session;
pub mod settings;

pub use selection::Selection;
pub use session::{EditOutcome, EditSession, PredictedLayer};
pub use settings::{AppSettings, CloudSettings, PredictedSettings, ViewportSettings};
