//! Static plug-in metadata.

use std::fmt;

/// Version triple of a plug-in: major, minor, patch.
pub type InfoVersion = [u32; 3];

/// Separator between a plug-in's name and its version in the full name.
pub const INFO_SEPARATOR: &str = ":";

/// Metadata a plug-in module declares about itself.
///
/// The full name (`namespace.name[-qualifier]:major.minor.patch`) identifies
/// a plug-in uniquely in the registry; the plain name (`namespace.name`) is
/// shared by every version of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    namespace: String,
    short_name: String,
    version: InfoVersion,
    qualifier: String,
    dependencies: Vec<String>,
    name: String,
    full_name: String,
}

impl Info {
    /// Create plug-in info with no qualifier and no dependencies.
    pub fn new(
        namespace: impl Into<String>,
        short_name: impl Into<String>,
        version: InfoVersion,
    ) -> Self {
        let namespace = namespace.into();
        let short_name = short_name.into();
        let name = Self::build_namespace_name(&namespace, &short_name);
        let full_name = Self::build_full_name(&namespace, &short_name, &version, "");

        Self {
            namespace,
            short_name,
            version,
            qualifier: String::new(),
            dependencies: Vec::new(),
            name,
            full_name,
        }
    }

    /// Set the qualifier (e.g. a build flavour).
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self.full_name = Self::build_full_name(
            &self.namespace,
            &self.short_name,
            &self.version,
            &self.qualifier,
        );
        self
    }

    /// Declare plug-ins this one depends on, by plain or full name.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Namespace-qualified name without version.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn version(&self) -> &InfoVersion {
        &self.version
    }

    pub fn major(&self) -> u32 {
        self.version[0]
    }

    pub fn minor(&self) -> u32 {
        self.version[1]
    }

    pub fn patch(&self) -> u32 {
        self.version[2]
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether `other` is listed as a dependency, by full or plain name.
    pub fn depends_on(&self, other: &Info) -> bool {
        self.dependencies
            .iter()
            .any(|d| d == other.full_name() || d == other.name())
    }

    /// Build `namespace.short_name[-qualifier]:major.minor.patch`.
    pub fn build_full_name(
        namespace: &str,
        short_name: &str,
        version: &InfoVersion,
        qualifier: &str,
    ) -> String {
        let mut full_name = Self::build_namespace_name(namespace, short_name);

        if !qualifier.is_empty() {
            full_name.push('-');
            full_name.push_str(qualifier);
        }

        format!(
            "{}{}{}.{}.{}",
            full_name, INFO_SEPARATOR, version[0], version[1], version[2]
        )
    }

    /// Build `namespace.short_name`, or just `short_name` when the namespace
    /// is empty.
    pub fn build_namespace_name(namespace: &str, short_name: &str) -> String {
        if namespace.is_empty() {
            short_name.to_string()
        } else {
            format!("{}.{}", namespace, short_name)
        }
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}
