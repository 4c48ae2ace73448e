//! Column sizing.

use serde::{Deserialize, Serialize};

/// Unit multiplier for LOB lengths (`blob(2M)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LobMultiplier {
    #[default]
    None,
    K,
    M,
    G,
}

impl LobMultiplier {
    pub fn factor(self) -> i64 {
        match self {
            LobMultiplier::None => 1,
            LobMultiplier::K => 1024,
            LobMultiplier::M => 1024 * 1024,
            LobMultiplier::G => 1024 * 1024 * 1024,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            LobMultiplier::None => "",
            LobMultiplier::K => "K",
            LobMultiplier::M => "M",
            LobMultiplier::G => "G",
        }
    }
}

/// Sizing of a column: length for character/binary types, precision and
/// scale for numerics, plus array length for array-typed columns.
///
/// Values left unset fall back to the `DEFAULT_*` constants when the type
/// pattern is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    array_length: Option<i32>,
    #[serde(default)]
    lob_multiplier: LobMultiplier,
}

impl Size {
    pub const DEFAULT_LENGTH: i64 = 255;
    pub const LONG_LENGTH: i64 = 32_600;
    pub const DEFAULT_PRECISION: i32 = 19;
    pub const DEFAULT_SCALE: i32 = 2;

    pub fn nil() -> Self {
        Self::default()
    }

    pub fn length(length: i64) -> Self {
        Self {
            length: Some(length),
            ..Self::default()
        }
    }

    pub fn precision(precision: i32) -> Self {
        Self {
            precision: Some(precision),
            ..Self::default()
        }
    }

    pub fn precision_and_scale(precision: i32, scale: i32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::default()
        }
    }

    pub fn set_length(&mut self, length: i64) -> &mut Self {
        self.length = Some(length);
        self
    }

    pub fn set_precision(&mut self, precision: i32) -> &mut Self {
        self.precision = Some(precision);
        self
    }

    pub fn set_scale(&mut self, scale: i32) -> &mut Self {
        self.scale = Some(scale);
        self
    }

    pub fn set_array_length(&mut self, array_length: i32) -> &mut Self {
        self.array_length = Some(array_length);
        self
    }

    pub fn set_lob_multiplier(&mut self, multiplier: LobMultiplier) -> &mut Self {
        self.lob_multiplier = multiplier;
        self
    }

    pub fn get_length(&self) -> Option<i64> {
        self.length
    }

    pub fn get_precision(&self) -> Option<i32> {
        self.precision
    }

    pub fn get_scale(&self) -> Option<i32> {
        self.scale
    }

    pub fn get_array_length(&self) -> Option<i32> {
        self.array_length
    }

    pub fn get_lob_multiplier(&self) -> LobMultiplier {
        self.lob_multiplier
    }

    /// Length in bytes/characters after applying the LOB multiplier.
    pub fn effective_length(&self) -> i64 {
        self.length.unwrap_or(Self::DEFAULT_LENGTH) * self.lob_multiplier.factor()
    }

    /// Substitute `$l`, `$p` and `$s` in a type pattern such as `varchar($l)`
    /// or `numeric($p,$s)`.
    pub fn apply_to_pattern(&self, pattern: &str) -> String {
        let length = match self.lob_multiplier {
            LobMultiplier::None => self.length.unwrap_or(Self::DEFAULT_LENGTH).to_string(),
            m => format!("{}{}", self.length.unwrap_or(Self::DEFAULT_LENGTH), m.suffix()),
        };
        pattern
            .replace("$l", &length)
            .replace("$p", &self.precision.unwrap_or(Self::DEFAULT_PRECISION).to_string())
            .replace("$s", &self.scale.unwrap_or(Self::DEFAULT_SCALE).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_setters_chain() {
        let mut size = Size::nil();
        size.set_precision(10).set_scale(3).set_array_length(4);
        assert_eq!(size.get_precision(), Some(10));
        assert_eq!(size.get_scale(), Some(3));
        assert_eq!(size.get_array_length(), Some(4));
        assert_eq!(size.get_length(), None);
    }

    #[test]
    fn test_apply_to_pattern_uses_defaults() {
        assert_eq!(Size::nil().apply_to_pattern("varchar($l)"), "varchar(255)");
        assert_eq!(
            Size::nil().apply_to_pattern("numeric($p,$s)"),
            "numeric(19,2)"
        );
        assert_eq!(
            Size::precision_and_scale(8, 0).apply_to_pattern("numeric($p,$s)"),
            "numeric(8,0)"
        );
    }

    #[test]
    fn test_lob_multiplier() {
        let mut size = Size::length(2);
        size.set_lob_multiplier(LobMultiplier::M);
        assert_eq!(size.effective_length(), 2 * 1024 * 1024);
        assert_eq!(size.apply_to_pattern("blob($l)"), "blob(2M)");
    }
}
