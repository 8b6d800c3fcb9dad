//! Services module
//!
//! Business logic for the collaborative workspace: event lifecycle, board
//! synchronization, notification fan-out and the inbox. Every service is
//! generic over `DocumentStore` and takes the acting `Session` explicitly.

pub mod attachments;
pub mod events;
pub mod fanout;
pub mod inbox;
pub mod users;
pub mod workspace;

pub use attachments::AttachmentsService;
pub use events::EventsService;
pub use fanout::{Delivery, DeliveryOutcome, FanoutService, WorkspaceChange};
pub use inbox::{InboxService, InboxSubscription, PendingNotification};
pub use users::UsersService;
pub use workspace::{CardDetails, Workspace, WorkspaceService};
