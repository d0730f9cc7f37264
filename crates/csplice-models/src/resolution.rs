//! Output resolution ("WxH") parsing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Default portrait output resolution for splices and exports.
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1080,
    height: 1920,
};

/// Target pixel dimensions.
///
/// Both dimensions are positive and even so that yuv420p output can be
/// encoded without an extra padding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> ModelResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(ModelError::InvalidResolution(format!("{}x{}", width, height)));
        }
        Ok(Self { width, height })
    }

    /// Parse a "WxH" string such as "1080x1920".
    pub fn parse(s: &str) -> ModelResult<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ModelError::InvalidResolution(s.to_string()))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidResolution(s.to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidResolution(s.to_string()))?;
        Self::new(width, height).map_err(|_| ModelError::InvalidResolution(s.to_string()))
    }

    /// Half of the width, rounded down to an even pixel count.
    pub fn half_width(&self) -> u32 {
        even_half(self.width)
    }

    /// Half of the height, rounded down to an even pixel count.
    pub fn half_height(&self) -> u32 {
        even_half(self.height)
    }
}

fn even_half(v: u32) -> u32 {
    ((v / 2) & !1).max(2)
}

// Serialized as a "WxH" string.
impl JsonSchema for Resolution {
    fn schema_name() -> String {
        "Resolution".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        DEFAULT_RESOLUTION
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Resolution {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}
