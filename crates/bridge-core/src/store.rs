use crate::BridgeError;
use crate::calls::CallRoomRepository;
use crate::events::EventRepository;
use crate::profiles::ProfileRepository;
use crate::requests::HelpRequestRepository;

pub trait Store {
    type Requests<'a>: HelpRequestRepository
    where
        Self: 'a;
    type Calls<'a>: CallRoomRepository
    where
        Self: 'a;
    type Profiles<'a>: ProfileRepository
    where
        Self: 'a;
    type Events<'a>: EventRepository
    where
        Self: 'a;

    fn requests(&self) -> Self::Requests<'_>;
    fn calls(&self) -> Self::Calls<'_>;
    fn profiles(&self) -> Self::Profiles<'_>;
    fn events(&self) -> Self::Events<'_>;

    fn with_tx<F, T>(&self, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&Self) -> Result<T, BridgeError>;
}
