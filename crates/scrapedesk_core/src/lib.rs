//! Scrapedesk core: pure scrape-session state machine and view-model helpers.
mod bundle;
mod effect;
mod error;
mod msg;
mod request;
mod state;
mod update;
mod view_model;

pub use bundle::{ResultBundle, TEAM_ID};
pub use effect::Effect;
pub use error::{UploadError, ValidationError};
pub use msg::Msg;
pub use request::{PdfSelection, ScrapeRequest, SCRAPE_REQUEST_EVENT};
pub use state::{AppState, FormInput, Phase, ScrapeSession, SubmissionId};
pub use update::update;
pub use view_model::AppViewModel;
