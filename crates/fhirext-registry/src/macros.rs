//! Convenience macros for customization modules.

/// Builds a [`ModuleInfo`](crate::module::ModuleInfo).
///
/// # Example
/// ```rust,ignore
/// let info = module_info!(
///     id: "consent-labels",
///     name: "Consent by security label",
///     version: "1.0.0",
///     description: "Hides labelled resources",
///     author: "Dev"
/// );
/// ```
#[macro_export]
macro_rules! module_info {
    (
        id: $id:expr,
        name: $name:expr,
        version: $version:expr,
        description: $desc:expr,
        author: $author:expr
    ) => {
        $crate::module::ModuleInfo {
            id: $id.to_string(),
            name: $name.to_string(),
            version: $version.to_string(),
            description: $desc.to_string(),
            author: $author.to_string(),
        }
    };
}
