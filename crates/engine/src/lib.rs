pub mod detector;
pub mod diff;
pub mod dispatcher;
pub mod display;
pub mod router;

pub use detector::{ChangeDetector, Detection};
pub use diff::diff;
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use display::DisplayNames;
pub use router::RecipientRouter;
