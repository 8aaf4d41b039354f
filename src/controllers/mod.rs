pub mod app_detail;
pub mod processor_edit;

pub use app_detail::{AppDetailController, AppView, CLOCK_CONCERN};
pub use processor_edit::{ModifyOptions, ProcessorEditForm, SubmitOutcome};
