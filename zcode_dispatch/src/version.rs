// Copyright 2026 the ZCode Dispatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Version masks, generation targets, and the label names derived from them.
//!
//! Every emitted jump label and duplicate-emission guard is built from an operation name plus
//! the suffix of its [`VersionMask`]. Suffixes are canonical: two masks produce the same suffix
//! exactly when they are the same mask.

use core::fmt;

/// Highest version number a mask can name.
pub const MAX_VERSION: u8 = 31;

/// The set of format versions an operation variant applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VersionMask {
    /// Applies to every version, including version-independent builds.
    All,
    /// Applies to the versions whose bit is set (bit `n` is version `n`, bit 0 is never set).
    Only(u32),
}

/// A version number or mask was outside `1..=31`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// A version number was 0 or above [`MAX_VERSION`].
    OutOfRange {
        /// The rejected version number.
        version: u32,
    },
    /// A raw mask had bit 0 set.
    ZeroBit,
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { version } => {
                write!(f, "version {version} out of range 1..={MAX_VERSION}")
            }
            Self::ZeroBit => write!(f, "version mask has bit 0 set"),
        }
    }
}

impl core::error::Error for VersionError {}

impl VersionMask {
    /// Builds a finite mask from raw bits.
    pub fn from_bits(bits: u32) -> Result<Self, VersionError> {
        if bits & 1 != 0 {
            return Err(VersionError::ZeroBit);
        }
        Ok(Self::Only(bits))
    }

    /// Builds a finite mask from a list of version numbers.
    pub fn from_versions<I>(versions: I) -> Result<Self, VersionError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut bits = 0_u32;
        for version in versions {
            if version == 0 || version > u32::from(MAX_VERSION) {
                return Err(VersionError::OutOfRange { version });
            }
            bits |= 1_u32 << version;
        }
        Ok(Self::Only(bits))
    }

    /// Returns `true` if this mask is the "all versions" sentinel.
    #[must_use]
    pub fn is_all(self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns `true` if `version` is covered by this mask.
    #[must_use]
    pub fn contains(self, version: u8) -> bool {
        match self {
            Self::All => true,
            Self::Only(bits) => version <= MAX_VERSION && bits & (1_u32 << version) != 0,
        }
    }

    /// Iterates the versions of a finite mask in ascending order (empty for [`VersionMask::All`]).
    pub fn versions(self) -> impl Iterator<Item = u8> {
        let bits = match self {
            Self::All => 0,
            Self::Only(bits) => bits,
        };
        (1..=MAX_VERSION).filter(move |v| bits & (1_u32 << v) != 0)
    }

    /// Canonical label suffix for this mask.
    ///
    /// The sentinel has an empty suffix. A finite mask is `_` followed by one token per version:
    /// a single digit for versions below 10, and `x` plus two digits above that, so that `{1, 2}`
    /// (`_12`) and `{12}` (`_x12`) stay distinct.
    #[must_use]
    pub fn suffix(self) -> String {
        match self {
            Self::All => String::new(),
            Self::Only(_) => {
                let mut s = String::from("_");
                for v in self.versions() {
                    if v < 10 {
                        s.push(char::from(b'0' + v));
                    } else {
                        s.push('x');
                        s.push(char::from(b'0' + v / 10));
                        s.push(char::from(b'0' + v % 10));
                    }
                }
                s
            }
        }
    }
}

impl fmt::Display for VersionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all versions"),
            Self::Only(_) => {
                f.write_str("{")?;
                for (i, v) in self.versions().enumerate() {
                    if i != 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Jump label for an operation variant: `op_<name><suffix>`.
#[must_use]
pub fn op_label(name: &str, versions: VersionMask) -> String {
    format!("op_{name}{}", versions.suffix())
}

/// Preprocessor guard for an operation variant: `ZCODE_OP_<name><suffix>`.
#[must_use]
pub fn guard_name(name: &str, versions: VersionMask) -> String {
    format!("ZCODE_OP_{name}{}", versions.suffix())
}

/// The interpreter a generation pass is specialised for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// A single format version.
    Version(u8),
    /// Operations common to every version; unmatched opcodes defer to a per-version fallback.
    Independent,
}

/// A command-line version selector was not `-1` or `1..=31`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TargetError {
    /// The rejected selector.
    pub selector: i64,
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid version selector {} (expected {} or 1..={MAX_VERSION})",
            self.selector,
            Target::INDEPENDENT_SELECTOR
        )
    }
}

impl core::error::Error for TargetError {}

impl Target {
    /// Selector value that denotes [`Target::Independent`].
    pub const INDEPENDENT_SELECTOR: i64 = -1;

    /// Parses a numeric selector.
    pub fn from_selector(selector: i64) -> Result<Self, TargetError> {
        if selector == Self::INDEPENDENT_SELECTOR {
            return Ok(Self::Independent);
        }
        match u8::try_from(selector) {
            Ok(v) if (1..=MAX_VERSION).contains(&v) => Ok(Self::Version(v)),
            _ => Err(TargetError { selector }),
        }
    }

    /// Returns `true` if an operation with `versions` is generated for this target.
    #[must_use]
    pub fn selects(self, versions: VersionMask) -> bool {
        match self {
            Self::Version(v) => versions.contains(v),
            Self::Independent => versions.is_all(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(v) => write!(f, "version {v}"),
            Self::Independent => write!(f, "all versions"),
        }
    }
}
