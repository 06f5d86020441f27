use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid enum value for {field}: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Frequency {
    Daily => "daily",
    TwiceDaily => "twice_daily",
    ThreeTimesDaily => "three_times_daily",
    Weekly => "weekly",
    AsNeeded => "as_needed",
});

str_enum!(ScanSource {
    Camera => "camera",
    Upload => "upload",
});

str_enum!(Politeness {
    Polite => "polite",
    Assertive => "assertive",
});

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Daily
    }
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::TwiceDaily,
        Frequency::ThreeTimesDaily,
        Frequency::Weekly,
        Frequency::AsNeeded,
    ];

    /// Label shown next to the frequency picker.
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::TwiceDaily => "Twice Daily",
            Frequency::ThreeTimesDaily => "Three Times Daily",
            Frequency::Weekly => "Weekly",
            Frequency::AsNeeded => "As Needed",
        }
    }
}
