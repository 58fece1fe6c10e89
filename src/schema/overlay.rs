//! Overlay descriptors
//!
//! The cache only needs to know what an overlay is called and which
//! sub-variants it produces. Computing the values is somebody else's job.

use crate::error::{CacheError, Result};

/// Identifies an overlay kind to the cache
pub trait OverlayDescriptor {
    /// Stable name, used verbatim in table names
    fn name(&self) -> &str;

    /// Suffixes of the related rasters, or `None` for a single raster
    fn sub_variants(&self) -> Option<&[String]> {
        None
    }
}

/// Plain descriptor value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayKind {
    pub name: String,
    pub sub_variants: Option<Vec<String>>,
}

impl OverlayKind {
    /// Single-valued overlay
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_variants: None,
        }
    }

    /// Overlay producing one raster per suffix
    pub fn with_sub_variants<I, S>(name: impl Into<String>, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            sub_variants: Some(suffixes.into_iter().map(Into::into).collect()),
        }
    }

    /// Entities per chunk; the overlay every store is initialized with
    pub fn entity_amount() -> Self {
        Self::new("entity_amount")
    }

    /// Check the name and every suffix are usable as table identifiers
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.name)?;
        if let Some(suffixes) = &self.sub_variants {
            for suffix in suffixes {
                validate_identifier(suffix)?;
            }
        }
        Ok(())
    }
}

impl OverlayDescriptor for OverlayKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn sub_variants(&self) -> Option<&[String]> {
        self.sub_variants.as_deref()
    }
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_identifier(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidIdentifier(ident.to_string()))
    }
}
