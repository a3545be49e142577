//! Core domain types used throughout the UDF registry.
//!
//! These types are shared by the client core, the transports and the
//! reference node, so a module described on one side means exactly the
//! same thing on the other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::errors::{Error, Result};
use crate::fingerprint::ContentHash;

/// Wire code for Lua modules.
pub const LUA_CODE: u32 = 0;

/// Language a UDF module is written in.
///
/// # Rust Learning Note
///
/// This is an **open enum**: `Lua` is the only language the cluster runs
/// today, but `Unknown(u32)` lets a summary from a newer server survive a
/// round trip through this client, and lets callers express an
/// unsupported value so it can be rejected with a proper error.
///
/// ```rust,ignore
/// match language {
///     UdfLanguage::Lua => { /* supported */ }
///     UdfLanguage::Unknown(code) => { /* reject */ }
/// }
/// ```
///
/// Serde goes through `u32` (`#[serde(from, into)]`), so the wire form is
/// always the numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum UdfLanguage {
    /// Lua source module.
    Lua,
    /// A language code this client does not know.
    Unknown(u32),
}

impl UdfLanguage {
    /// Returns the numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            UdfLanguage::Lua => LUA_CODE,
            UdfLanguage::Unknown(code) => *code,
        }
    }

    /// Returns true if modules in this language can be registered.
    pub fn is_supported(&self) -> bool {
        matches!(self, UdfLanguage::Lua)
    }

    /// Fails with `UnsupportedLanguage` unless the language is supported.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(Error::unsupported_language(*self))
        }
    }

    /// Parses a language given by name ("lua") or by numeric code.
    ///
    /// Names other than "lua" fail with `UnsupportedLanguage`; blank input
    /// fails with `InvalidArgument`. Unknown numeric codes parse and are
    /// rejected later by [`UdfLanguage::ensure_supported`].
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_argument("UDF language must not be empty"));
        }
        if trimmed.eq_ignore_ascii_case("lua") {
            return Ok(UdfLanguage::Lua);
        }
        match trimmed.parse::<u32>() {
            Ok(code) => Ok(UdfLanguage::from(code)),
            Err(_) => Err(Error::unsupported_language_name(trimmed)),
        }
    }
}

impl Default for UdfLanguage {
    fn default() -> Self {
        UdfLanguage::Lua
    }
}

impl From<u32> for UdfLanguage {
    fn from(code: u32) -> Self {
        match code {
            LUA_CODE => UdfLanguage::Lua,
            other => UdfLanguage::Unknown(other),
        }
    }
}

impl From<UdfLanguage> for u32 {
    fn from(language: UdfLanguage) -> Self {
        language.code()
    }
}

impl fmt::Display for UdfLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UdfLanguage::Lua => write!(f, "LUA"),
            UdfLanguage::Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}

/// Cluster-wide registration key of a UDF module.
///
/// The name is the final component of the source path: `udfs/avg.lua` and
/// `backup/avg.lua` both register as `avg.lua`, and the later put replaces
/// the earlier one.
///
/// # Example
/// ```
/// use udf_common::ModuleName;
///
/// let name = ModuleName::from_path("/srv/udfs/avg.lua").unwrap();
/// assert_eq!(name.as_str(), "avg.lua");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Validates and wraps a module name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_argument("module name cannot be empty"));
        }
        if name == "." || name == ".." {
            return Err(Error::invalid_argument(format!("invalid module name: {}", name)));
        }
        if name.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
            return Err(Error::invalid_argument(format!(
                "module name must not contain path separators: {}",
                name
            )));
        }
        Ok(Self(name))
    }

    /// Derives the module name from the basename of a source path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path.file_name().ok_or_else(|| {
            Error::invalid_argument(format!("path has no file name: {}", path.display()))
        })?;
        let file_name = file_name.to_str().ok_or_else(|| {
            Error::invalid_argument(format!("file name is not valid UTF-8: {}", path.display()))
        })?;
        Self::new(file_name)
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ModuleName {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a cluster node, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new NodeId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the node ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete UDF module: name, language and content.
///
/// The hash is computed once at construction and the fields are private,
/// so `content_hash` always describes `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdfModule {
    name: ModuleName,
    language: UdfLanguage,
    content: Vec<u8>,
    content_hash: ContentHash,
}

impl UdfModule {
    /// Builds a module and fingerprints its content.
    pub fn new(name: ModuleName, language: UdfLanguage, content: Vec<u8>) -> Self {
        let content_hash = ContentHash::of(&content);
        Self {
            name,
            language,
            content,
            content_hash,
        }
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    pub fn language(&self) -> UdfLanguage {
        self.language
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    /// Returns the lightweight summary of this module.
    pub fn summary(&self) -> UdfFileSummary {
        UdfFileSummary {
            name: self.name.clone(),
            language: self.language,
            content_hash: self.content_hash,
        }
    }
}

/// Entry of a module listing as it travels over the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleListing {
    pub name: String,
    pub language: UdfLanguage,
    pub hash: ContentHash,
}

/// Summary of a registered module returned by `list` (content omitted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdfFileSummary {
    pub name: ModuleName,
    pub language: UdfLanguage,
    pub content_hash: ContentHash,
}

impl TryFrom<ModuleListing> for UdfFileSummary {
    type Error = Error;

    fn try_from(listing: ModuleListing) -> Result<Self> {
        Ok(Self {
            name: ModuleName::new(listing.name)?,
            language: listing.language,
            content_hash: listing.hash,
        })
    }
}
