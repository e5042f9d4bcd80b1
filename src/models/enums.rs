use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Requested => "REQUESTED",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
    Expired => "EXPIRED",
});

impl AppointmentStatus {
    /// Active statuses occupy calendar time and participate in conflict checks.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Requested | Self::Confirmed)
    }

    /// Terminal statuses permit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }
}

str_enum!(NotificationStatus {
    Pending => "PENDING",
    Sent => "SENT",
    Failed => "FAILED",
});

str_enum!(EditScope {
    Single => "single",
    Future => "future",
});

str_enum!(DeleteScope {
    Single => "single",
    Series => "series",
});

str_enum!(BlockerDeleteScope {
    Single => "single",
    Group => "group",
});
