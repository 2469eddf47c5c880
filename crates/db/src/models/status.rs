//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use forge_core::generation::TaskState;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
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

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
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
    /// Generation task lifecycle status.
    TaskStatus {
        Queued = 1,
        Processing = 2,
        Succeeded = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Generation session lifecycle status.
    SessionStatus {
        Active = 1,
        Completed = 2,
        Failed = 3,
    }
}

impl From<TaskState> for TaskStatus {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Queued => Self::Queued,
            TaskState::Processing => Self::Processing,
            TaskState::Succeeded => Self::Succeeded,
            TaskState::Failed => Self::Failed,
        }
    }
}

impl From<TaskStatus> for TaskState {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Queued => Self::Queued,
            TaskStatus::Processing => Self::Processing,
            TaskStatus::Succeeded => Self::Succeeded,
            TaskStatus::Failed => Self::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_ids_match_seed_data() {
        assert_eq!(TaskStatus::Queued.id(), 1);
        assert_eq!(TaskStatus::Processing.id(), 2);
        assert_eq!(TaskStatus::Succeeded.id(), 3);
        assert_eq!(TaskStatus::Failed.id(), 4);
    }

    #[test]
    fn session_status_ids_match_seed_data() {
        assert_eq!(SessionStatus::Active.id(), 1);
        assert_eq!(SessionStatus::Completed.id(), 2);
        assert_eq!(SessionStatus::Failed.id(), 3);
    }

    #[test]
    fn from_id_rejects_unknown() {
        assert_eq!(TaskStatus::from_id(3), Some(TaskStatus::Succeeded));
        assert_eq!(TaskStatus::from_id(0), None);
        assert_eq!(SessionStatus::from_id(9), None);
    }

    #[test]
    fn task_state_round_trip() {
        for status in [
            TaskStatus::Queued,
            TaskStatus::Processing,
            TaskStatus::Succeeded,
            TaskStatus::Failed,
        ] {
            let state: TaskState = status.into();
            assert_eq!(TaskStatus::from(state), status);
        }
    }
}
