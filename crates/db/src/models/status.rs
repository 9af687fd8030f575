//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Dataset request lifecycle status.
    ///
    /// Forward-only: `Queued -> Processing -> Finished | Failed`. The two
    /// terminal states are written exactly once; the single backward edge
    /// (`Processing -> Queued`) exists only for the reaper requeueing
    /// requests whose owning worker died.
    DatasetStatus {
        Queued = 1,
        Processing = 2,
        Finished = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Worker process availability status.
    WorkerStatus {
        Idle = 1,
        Busy = 2,
        Offline = 3,
    }
}

impl DatasetStatus {
    /// Map a raw status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(DatasetStatus::Queued),
            2 => Some(DatasetStatus::Processing),
            3 => Some(DatasetStatus::Finished),
            4 => Some(DatasetStatus::Failed),
            _ => None,
        }
    }

    /// The lowercase name as seeded in `dataset_statuses` and shown to
    /// polling clients.
    pub fn name(self) -> &'static str {
        match self {
            DatasetStatus::Queued => "queued",
            DatasetStatus::Processing => "processing",
            DatasetStatus::Finished => "finished",
            DatasetStatus::Failed => "failed",
        }
    }

    /// Whether this status is terminal (never changes again).
    pub fn is_terminal(self) -> bool {
        matches!(self, DatasetStatus::Finished | DatasetStatus::Failed)
    }
}
