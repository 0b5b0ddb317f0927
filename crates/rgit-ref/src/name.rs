use std::fmt;

use bstr::{BStr, BString, ByteSlice};

use crate::error::RefError;

/// A validated reference name.
///
/// Enforces the rules from `git-check-ref-format(1)`: no `..`, no control
/// characters or ` ~^:?*[\`, no leading/trailing `/` or `//`, components
/// may not start with `.` or end with `.lock`, no `@{`, not the single
/// character `@`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefName(BString);

/// Characters forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[u8] = b" ~^:?*[\\";

impl RefName {
    /// Create and validate a ref name.
    pub fn new(name: impl Into<BString>) -> Result<Self, RefError> {
        let name = name.into();
        validate_ref_name(&name)?;
        Ok(Self(name))
    }

    /// The short display name (`main` from `refs/heads/main`).
    pub fn short_name(&self) -> &BStr {
        let s = self.0.as_bstr();
        if let Some(rest) = s.strip_prefix(b"refs/heads/") {
            rest.as_bstr()
        } else if let Some(rest) = s.strip_prefix(b"refs/tags/") {
            rest.as_bstr()
        } else if let Some(rest) = s.strip_prefix(b"refs/remotes/") {
            rest.as_bstr()
        } else {
            s
        }
    }

    /// Is this under `refs/heads/`?
    pub fn is_branch(&self) -> bool {
        self.0.starts_with(b"refs/heads/")
    }

    /// Is this under `refs/tags/`?
    pub fn is_tag(&self) -> bool {
        self.0.starts_with(b"refs/tags/")
    }

    /// The raw bytes.
    pub fn as_bstr(&self) -> &BStr {
        self.0.as_bstr()
    }

    /// As a string slice (ref names are ASCII/UTF-8 in practice).
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("<invalid-utf8>")
    }
}

impl AsRef<BStr> for RefName {
    fn as_ref(&self) -> &BStr {
        self.0.as_bstr()
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate_ref_name(name: &[u8]) -> Result<(), RefError> {
    let name_str = || String::from_utf8_lossy(name).into_owned();

    if name.is_empty() {
        return Err(RefError::InvalidName("ref name is empty".into()));
    }
    if name.contains(&0) {
        return Err(RefError::InvalidName(format!(
            "'{}': contains NUL byte",
            name_str()
        )));
    }
    if name == b"@" {
        return Err(RefError::InvalidName("'@' is not a valid ref name".into()));
    }

    for (i, &b) in name.iter().enumerate() {
        if b < 0x20 || b == 0x7f {
            return Err(RefError::InvalidName(format!(
                "'{}': contains control character at position {i}",
                name_str()
            )));
        }
        if FORBIDDEN_CHARS.contains(&b) {
            return Err(RefError::InvalidName(format!(
                "'{}': contains forbidden character '{}' at position {i}",
                name_str(),
                b as char
            )));
        }
    }

    if name.starts_with(b"/") || name.ends_with(b"/") {
        return Err(RefError::InvalidName(format!(
            "'{}': begins or ends with '/'",
            name_str()
        )));
    }
    if name.ends_with(b".") {
        return Err(RefError::InvalidName(format!(
            "'{}': ends with '.'",
            name_str()
        )));
    }
    if name.find(b"..").is_some() {
        return Err(RefError::InvalidName(format!(
            "'{}': contains '..'",
            name_str()
        )));
    }
    if name.find(b"//").is_some() {
        return Err(RefError::InvalidName(format!(
            "'{}': contains '//'",
            name_str()
        )));
    }
    if name.find(b"@{").is_some() {
        return Err(RefError::InvalidName(format!(
            "'{}': contains '@{{'",
            name_str()
        )));
    }

    for component in name.split_str(b"/") {
        if component.starts_with(b".") {
            return Err(RefError::InvalidName(format!(
                "'{}': component starts with '.'",
                name_str()
            )));
        }
        if component.ends_with(b".lock") {
            return Err(RefError::InvalidName(format!(
                "'{}': component ends with '.lock'",
                name_str()
            )));
        }
    }

    Ok(())
}
