use crate::db::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
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
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Frequency {
    Daily => "daily",
    TwiceDaily => "twice_daily",
    ThreeTimesDaily => "three_times_daily",
    AsNeeded => "as_needed",
    Weekly => "weekly",
});

str_enum!(CheckinStatus {
    Completed => "completed",
    Skipped => "skipped",
    Missed => "missed",
});

str_enum!(RelationType {
    Family => "family",
    Friend => "friend",
    Doctor => "doctor",
    Caregiver => "caregiver",
});

str_enum!(SupervisionStatus {
    Active => "active",
    Blocked => "blocked",
});

str_enum!(RequestStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});
