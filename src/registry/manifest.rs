//! TOML manifest describing a distribution.
//!
//! A manifest file declares the distribution name and version plus every
//! sub-package with its members and export list. Building the manifest
//! validates the export lists against the member sets, so a distribution
//! loaded from disk always satisfies the manifest-subset invariant.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::{Distribution, RegistryError, SubPackage, Symbol, SymbolKind};

/// Errors raised while reading, parsing, or building a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("cannot read manifest \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The manifest is not valid TOML or contains unknown fields.
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
    /// Two sub-packages share a name.
    #[error("duplicate sub-package `{name}` in manifest")]
    DuplicateSubPackage { name: String },
    /// Two members of one sub-package share a name.
    #[error("duplicate member `{name}` in sub-package `{sub_package}`")]
    DuplicateMember { sub_package: String, name: String },
    /// A member kind is not one of `function`, `constant`, `type`.
    #[error(
        "member `{name}` in sub-package `{sub_package}` has invalid kind \"{kind}\" \
         (expected function, constant, or type)"
    )]
    InvalidKind {
        sub_package: String,
        name: String,
        kind: String,
    },
    /// An export list names a symbol that is not a member.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Top-level manifest parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionManifest {
    /// Distribution name.
    pub name: String,
    /// Distribution version.
    pub version: String,
    /// Constituent sub-packages.
    #[serde(default)]
    pub sub_packages: Vec<SubPackageEntry>,
}

/// One sub-package declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubPackageEntry {
    /// Sub-package name (lowercase_with_underscores).
    pub name: String,
    /// Member symbols, in definition order.
    #[serde(default)]
    pub members: Vec<MemberEntry>,
    /// Exported member names, in declaration order.
    #[serde(default)]
    pub exports: Vec<String>,
}

/// One member symbol declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    /// Symbol name.
    pub name: String,
    /// Symbol kind: `"function"`, `"constant"`, or `"type"`.
    pub kind: String,
}

impl DistributionManifest {
    /// Parses a manifest from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] if the TOML is invalid or contains
    /// unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(s)?)
    }

    /// Parses a manifest from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read, or
    /// [`ManifestError::Parse`] if its contents are invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Validates the manifest and builds the distribution it describes.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate sub-packages or members, an invalid
    /// member kind, or an export that names a missing member
    /// ([`RegistryError::UnknownSymbol`]).
    pub fn build(&self) -> Result<Distribution, ManifestError> {
        let mut dist = Distribution::new(&self.name, &self.version);
        for entry in &self.sub_packages {
            if dist.sub_package(&entry.name).is_some() {
                return Err(ManifestError::DuplicateSubPackage {
                    name: entry.name.clone(),
                });
            }
            let mut sub = SubPackage::new(&entry.name);
            for member in &entry.members {
                if sub.is_member(&member.name) {
                    return Err(ManifestError::DuplicateMember {
                        sub_package: entry.name.clone(),
                        name: member.name.clone(),
                    });
                }
                sub.add_member(Symbol::new(&member.name, parse_kind(entry, member)?));
            }
            sub.declare(&entry.exports)?;
            dist.add_sub_package(sub);
        }
        Ok(dist)
    }
}

fn parse_kind(entry: &SubPackageEntry, member: &MemberEntry) -> Result<SymbolKind, ManifestError> {
    match member.kind.as_str() {
        "function" => Ok(SymbolKind::Function),
        "constant" => Ok(SymbolKind::Constant),
        "type" => Ok(SymbolKind::Type),
        other => Err(ManifestError::InvalidKind {
            sub_package: entry.name.clone(),
            name: member.name.clone(),
            kind: other.to_string(),
        }),
    }
}

/// Reads a manifest file and builds the distribution it describes.
///
/// # Errors
///
/// Propagates any [`ManifestError`] from reading, parsing, or building.
pub fn load_distribution(path: &Path) -> Result<Distribution, ManifestError> {
    DistributionManifest::from_toml_file(path)?.build()
}
