pub mod enums;
pub mod event;
pub mod ids;
pub mod io;
pub mod profile;
pub mod request;

pub use enums::{CallRoomStatus, EndOutcome, RequestKind, RequestPriority, RequestStatus, Role};
pub use event::EventBody;
pub use ids::{HelpRequestId, IdError, RoomName, UserId};
pub use io::{AvailabilityInput, CallTarget, CreateHelpRequestInput, EndCallInput, RecentQuery};
pub use profile::{Caller, Profile};
pub use request::{CallRoom, CallSession, HelpRequest, RoomRef};
