use bridge_core::error::BridgeError;
use bridge_core::store::Store;
use rusqlite::Connection;

use crate::call_room_repo::CallRoomRepo;
use crate::event_repo::EventRepo;
use crate::help_request_repo::HelpRequestRepo;
use crate::profile_repo::ProfileRepo;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

fn storage_error(err: rusqlite::Error) -> BridgeError {
    BridgeError::Storage {
        message: err.to_string(),
    }
}

impl Store for DbStore {
    type Requests<'a>
        = HelpRequestRepo<'a>
    where
        Self: 'a;
    type Calls<'a>
        = CallRoomRepo<'a>
    where
        Self: 'a;
    type Profiles<'a>
        = ProfileRepo<'a>
    where
        Self: 'a;
    type Events<'a>
        = EventRepo<'a>
    where
        Self: 'a;

    fn requests(&self) -> Self::Requests<'_> {
        HelpRequestRepo::new(&self.conn)
    }

    fn calls(&self) -> Self::Calls<'_> {
        CallRoomRepo::new(&self.conn)
    }

    fn profiles(&self) -> Self::Profiles<'_> {
        ProfileRepo::new(&self.conn)
    }

    fn events(&self) -> Self::Events<'_> {
        EventRepo::new(&self.conn)
    }

    /// `BEGIN IMMEDIATE` takes the write lock up front, so concurrent
    /// connections queue on `busy_timeout` instead of failing mid-transaction.
    fn with_tx<F, T>(&self, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&Self) -> Result<T, BridgeError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(storage_error)?;
        let result = f(self);
        match result {
            Ok(value) => {
                self.conn.execute_batch("COMMIT").map_err(storage_error)?;
                Ok(value)
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK")
                    .map_err(storage_error)?;
                Err(err)
            }
        }
    }
}
