//! Units of measurement a metric may declare.

/// The unit a metric value is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Unitless. This is the zero unit and is omitted from JSON.
    None,
    /// Milliseconds
    #[serde(rename = "Milliseconds")]
    Millisecond,
    /// Seconds
    #[serde(rename = "Seconds")]
    Second,
    /// Degrees Celsius
    Celsius,
    /// Bytes
    #[serde(rename = "Bytes")]
    Byte,
    /// Bytes per second
    #[serde(rename = "BytesPerSecond")]
    BytePerSecond,
}

const ALL: [Unit; 6] = [
    Unit::None,
    Unit::Millisecond,
    Unit::Second,
    Unit::Celsius,
    Unit::Byte,
    Unit::BytePerSecond,
];

impl Unit {
    /// True for `Unit::None`.
    pub fn is_none(&self) -> bool {
        *self == Unit::None
    }

    /// Single byte identifying the unit on the native wire.
    pub fn tag(&self) -> u8 {
        match *self {
            Unit::None => 0,
            Unit::Millisecond => 1,
            Unit::Second => 2,
            Unit::Celsius => 3,
            Unit::Byte => 4,
            Unit::BytePerSecond => 5,
        }
    }

    /// Inverse of `Unit::tag`.
    pub fn from_tag(tag: u8) -> Option<Unit> {
        ALL.iter().find(|u| u.tag() == tag).cloned()
    }
}

impl Default for Unit {
    fn default() -> Unit {
        Unit::None
    }
}
