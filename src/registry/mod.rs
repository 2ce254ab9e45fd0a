//! Curated export surfaces for the toolkit distribution.
//!
//! The distribution is a single installable unit made of named sub-packages.
//! Each sub-package owns a set of member symbols and an explicit export
//! manifest declaring which of those members external callers may use.
//! Names outside the manifest are implementation detail: internal files can
//! be reorganized freely without breaking consumers, and a caller reaching
//! for an undeclared name gets a typed error instead of silently coupling
//! itself to internals.

pub mod manifest;

use std::collections::HashMap;

use thiserror::Error;

/// Kind of a symbol defined in a sub-package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Constant,
    Type,
}

impl SymbolKind {
    /// Lowercase label used in diagnostics and manifest files.
    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Constant => "constant",
            SymbolKind::Type => "type",
        }
    }
}

/// A function, constant, or type defined within a sub-package.
///
/// Visibility is not stored here: a symbol is public exactly when its name
/// appears in the owning sub-package's export manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a function symbol.
    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Function)
    }

    /// Shorthand for a constant symbol.
    pub fn constant(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Constant)
    }

    /// Shorthand for a type symbol.
    pub fn type_(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
}

/// Errors surfaced by export declaration and lookup.
///
/// `NotExported` and `UnknownSymbol` are deliberately distinct: the first
/// means a caller is depending on an internal detail, the second that the
/// name never existed (typo, removed symbol). Both are local and
/// non-retryable: manifests are static once the distribution is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested name has no corresponding member in the sub-package.
    #[error("sub-package `{sub_package}` has no member named `{name}`")]
    UnknownSymbol { sub_package: String, name: String },
    /// The requested name exists but is not part of the export manifest.
    #[error("`{name}` is internal to sub-package `{sub_package}` (not in its export manifest)")]
    NotExported { sub_package: String, name: String },
    /// The distribution has no sub-package under that name.
    #[error("distribution has no sub-package named `{name}`")]
    UnknownSubPackage { name: String },
}

/// A named grouping of related symbols within the distribution.
///
/// Members are kept in insertion order; the export manifest is an ordered
/// subset of member names, in declaration order.
#[derive(Debug, Clone)]
pub struct SubPackage {
    name: String,
    members: Vec<Symbol>,
    by_name: HashMap<String, usize>,
    exports: Vec<String>,
}

impl SubPackage {
    /// Creates an empty sub-package with no members and an empty manifest.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            by_name: HashMap::new(),
            exports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a member symbol. Redefining an existing name replaces the
    /// symbol in place, keeping its original position.
    pub fn add_member(&mut self, symbol: Symbol) {
        match self.by_name.get(symbol.name()) {
            Some(&idx) => self.members[idx] = symbol,
            None => {
                self.by_name.insert(symbol.name().to_string(), self.members.len());
                self.members.push(symbol);
            }
        }
    }

    /// Convenience builder used when assembling a distribution by hand.
    pub fn with_member(mut self, symbol: Symbol) -> Self {
        self.add_member(symbol);
        self
    }

    /// Looks a member up by name, exported or not.
    pub fn member(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&idx| &self.members[idx])
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = &Symbol> {
        self.members.iter()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Sets the export manifest to exactly `names`, in the given order.
    ///
    /// Replaces any prior manifest; declarations are not additive across
    /// calls. All-or-nothing: if any name is not a member, the previous
    /// manifest is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSymbol`] naming the first requested
    /// name that does not resolve to a defined member.
    pub fn declare<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), RegistryError> {
        for name in names {
            if !self.is_member(name.as_ref()) {
                return Err(RegistryError::UnknownSymbol {
                    sub_package: self.name.clone(),
                    name: name.as_ref().to_string(),
                });
            }
        }
        self.exports = names.iter().map(|n| n.as_ref().to_string()).collect();
        Ok(())
    }

    /// Looks a name up against the export manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotExported`] if the name is a member but
    /// not declared public, and [`RegistryError::UnknownSymbol`] if it is
    /// not a member at all.
    pub fn resolve(&self, name: &str) -> Result<&Symbol, RegistryError> {
        if self.exports.iter().any(|e| e == name) {
            // Manifest names are validated against members at declaration
            // time, so the lookup cannot miss.
            return Ok(&self.members[self.by_name[name]]);
        }
        if self.is_member(name) {
            Err(RegistryError::NotExported {
                sub_package: self.name.clone(),
                name: name.to_string(),
            })
        } else {
            Err(RegistryError::UnknownSymbol {
                sub_package: self.name.clone(),
                name: name.to_string(),
            })
        }
    }

    /// The declared public names, in declaration order.
    ///
    /// Freshly computed on each call; callers may iterate the returned
    /// vector independently and restart at will.
    pub fn list_exports(&self) -> Vec<&str> {
        self.exports.iter().map(String::as_str).collect()
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.exports.iter().any(|e| e == name)
    }

    /// Reports naming-convention violations for authoring-time tooling.
    ///
    /// Functions and constants are expected in lowercase_with_underscores,
    /// types in CapitalizedWords. Violations are reported, never rejected:
    /// the convention is a lint concern, not a data-model invariant.
    pub fn lint_names(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for symbol in &self.members {
            let ok = match symbol.kind() {
                SymbolKind::Function | SymbolKind::Constant => is_snake_case(symbol.name()),
                SymbolKind::Type => is_capitalized(symbol.name()),
            };
            if !ok {
                warnings.push(format!(
                    "{}.{}: {} name does not follow naming conventions",
                    self.name,
                    symbol.name(),
                    symbol.kind().label()
                ));
            }
        }
        warnings
    }
}

/// True for lowercase_with_underscores names; a leading underscore marks
/// internal symbols and is allowed.
fn is_snake_case(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// True for CapitalizedWords names.
fn is_capitalized(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// The top-level installable unit: a named, versioned set of sub-packages.
///
/// Built once at packaging time and treated as read-only afterwards; all
/// mutation goes through `&mut self`, so a published `Distribution` behind a
/// shared reference cannot change and may be read from multiple contexts
/// without coordination.
#[derive(Debug, Clone)]
pub struct Distribution {
    name: String,
    version: String,
    sub_packages: Vec<SubPackage>,
    by_name: HashMap<String, usize>,
}

impl Distribution {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            sub_packages: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Adds a sub-package. Re-adding an existing name replaces it in place.
    pub fn add_sub_package(&mut self, sub_package: SubPackage) {
        match self.by_name.get(sub_package.name()) {
            Some(&idx) => self.sub_packages[idx] = sub_package,
            None => {
                self.by_name
                    .insert(sub_package.name().to_string(), self.sub_packages.len());
                self.sub_packages.push(sub_package);
            }
        }
    }

    /// Convenience builder used when assembling a distribution by hand.
    pub fn with_sub_package(mut self, sub_package: SubPackage) -> Self {
        self.add_sub_package(sub_package);
        self
    }

    pub fn sub_package(&self, name: &str) -> Option<&SubPackage> {
        self.by_name.get(name).map(|&idx| &self.sub_packages[idx])
    }

    /// Sub-packages in insertion order.
    pub fn sub_packages(&self) -> impl Iterator<Item = &SubPackage> {
        self.sub_packages.iter()
    }

    pub fn sub_package_count(&self) -> usize {
        self.sub_packages.len()
    }

    fn sub_package_mut(&mut self, name: &str) -> Result<&mut SubPackage, RegistryError> {
        match self.by_name.get(name) {
            Some(&idx) => Ok(&mut self.sub_packages[idx]),
            None => Err(RegistryError::UnknownSubPackage {
                name: name.to_string(),
            }),
        }
    }

    fn sub_package_ref(&self, name: &str) -> Result<&SubPackage, RegistryError> {
        self.sub_package(name)
            .ok_or_else(|| RegistryError::UnknownSubPackage {
                name: name.to_string(),
            })
    }

    /// Sets the export manifest of `sub_package` to exactly `names`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSubPackage`] for an unknown
    /// sub-package and [`RegistryError::UnknownSymbol`] for a name that is
    /// not a member; see [`SubPackage::declare`].
    pub fn declare<S: AsRef<str>>(
        &mut self,
        sub_package: &str,
        names: &[S],
    ) -> Result<(), RegistryError> {
        self.sub_package_mut(sub_package)?.declare(names)
    }

    /// Resolves `name` against the export manifest of `sub_package`.
    ///
    /// # Errors
    ///
    /// See [`SubPackage::resolve`]; additionally returns
    /// [`RegistryError::UnknownSubPackage`] for an unknown sub-package.
    pub fn resolve(&self, sub_package: &str, name: &str) -> Result<&Symbol, RegistryError> {
        self.sub_package_ref(sub_package)?.resolve(name)
    }

    /// The declared public names of `sub_package`, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSubPackage`] for an unknown
    /// sub-package.
    pub fn list_exports(&self, sub_package: &str) -> Result<Vec<&str>, RegistryError> {
        Ok(self.sub_package_ref(sub_package)?.list_exports())
    }

    /// Naming-convention warnings across every sub-package.
    pub fn lint_names(&self) -> Vec<String> {
        self.sub_packages
            .iter()
            .flat_map(SubPackage::lint_names)
            .collect()
    }
}
