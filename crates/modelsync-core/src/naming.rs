//! Identifier synthesis for new decision-model variables
//!
//! Names are lower camel case built from the ASCII alphanumeric runs of a
//! display text, optionally followed by a sanitised version suffix.

use std::collections::HashSet;

const FALLBACK_NAME: &str = "var";

/// Turn arbitrary text into a lower camel case identifier
///
/// Returns an empty string if `text` holds no ASCII alphanumerics.
///
/// ```
/// use modelsync_core::naming::to_identifier;
///
/// assert_eq!(to_identifier("test my String"), "testMyString");
/// assert_eq!(to_identifier("4 Sale"), "v4Sale");
/// ```
pub fn to_identifier(text: &str) -> String {
    let mut out = String::new();
    for (i, word) in text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.push(first.to_ascii_lowercase());
            } else {
                out.push(first.to_ascii_uppercase());
            }
            out.extend(chars);
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'v');
    }
    out
}

/// Like [`to_identifier`] with the first character upper case
///
/// Used for generated project names such as `ServiceMeshPartMyMesh`.
pub fn to_identifier_first_upper(text: &str) -> String {
    let ident = to_identifier(text);
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Is `name` a syntactically valid identifier?
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// First of `base`, `base_1`, `base_2`, ... for which `taken` is false
pub fn disambiguate(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n: u64 = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Session-scoped generator of collision-free variable names
///
/// Identical inputs produce identical names on an empty registry; every
/// name issued from one registry is distinct.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    issued: HashSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate name before disambiguation
    pub fn base_name(type_hint: &str, display_name: &str, version_hint: &str) -> String {
        let mut base = to_identifier(display_name);
        if base.is_empty() {
            base = to_identifier(type_hint);
        }
        if base.is_empty() {
            base = FALLBACK_NAME.to_string();
        }
        let version: String = version_hint
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if !version.is_empty() {
            base.push('_');
            base.push_str(&version);
        }
        base
    }

    pub fn generate(&mut self, type_hint: &str, display_name: &str, version_hint: &str) -> String {
        self.generate_avoiding(type_hint, display_name, version_hint, |_| false)
    }

    /// Generate a name that is neither issued before nor `taken`
    ///
    /// `taken` lets callers exclude names already present in the model.
    pub fn generate_avoiding(
        &mut self,
        type_hint: &str,
        display_name: &str,
        version_hint: &str,
        taken: impl Fn(&str) -> bool,
    ) -> String {
        let base = Self::base_name(type_hint, display_name, version_hint);
        let name = disambiguate(&base, |n| self.issued.contains(n) || taken(n));
        self.issued.insert(name.clone());
        name
    }

    pub fn is_issued(&self, name: &str) -> bool {
        self.issued.contains(name)
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Forget all issued names
    pub fn reset(&mut self) {
        self.issued.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_identifier() {
        assert_eq!(to_identifier("my Test-Mesh"), "myTestMesh");
        assert_eq!(to_identifier("  "), "");
        assert_eq!(to_identifier("3d view"), "v3dView");
        assert_eq!(to_identifier_first_upper("myTestMesh"), "MyTestMesh");
        assert_eq!(to_identifier_first_upper("my app"), "MyApp");
    }

    #[test]
    fn test_generate_deterministic_on_empty_registry() {
        let a = NameGenerator::new().generate("String", "test my String", "1.01");
        let b = NameGenerator::new().generate("String", "test my String", "1.01");
        assert_eq!(a, "testMyString_1_01");
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_fallbacks() {
        let mut names = NameGenerator::new();
        assert_eq!(names.generate("", "", ""), "var");
        assert_eq!(names.generate("ServiceBase", "", ""), "serviceBase");
        assert_eq!(names.generate("", "", ""), "var_1");
    }

    #[test]
    fn test_generate_avoids_taken_and_reset() {
        let mut names = NameGenerator::new();
        let name = names.generate_avoiding("", "mesh", "", |n| n == "mesh");
        assert_eq!(name, "mesh_1");
        assert!(names.is_issued("mesh_1"));
        names.reset();
        assert_eq!(names.issued_count(), 0);
        assert_eq!(names.generate("", "mesh", ""), "mesh");
    }

    #[test]
    fn test_disambiguate() {
        let taken = ["a", "a_1"];
        assert_eq!(disambiguate("a", |n| taken.contains(&n)), "a_2");
        assert_eq!(disambiguate("b", |n| taken.contains(&n)), "b");
    }

    #[test]
    fn test_disambiguate_never_returns_a_taken_name() {
        let mut taken: HashSet<String> = HashSet::from(["node".to_string()]);
        for n in 1..=50 {
            let name = disambiguate("node", |c| taken.contains(c));
            assert_eq!(name, format!("node_{}", n));
            assert!(taken.insert(name));
        }
    }

    proptest! {
        #[test]
        fn prop_generated_names_are_identifiers(
            ty in ".{0,12}",
            display in ".{0,24}",
            version in ".{0,8}",
        ) {
            let mut names = NameGenerator::new();
            let first = names.generate(&ty, &display, &version);
            let second = names.generate(&ty, &display, &version);
            prop_assert!(is_identifier(&first), "{:?}", first);
            prop_assert!(is_identifier(&second), "{:?}", second);
            prop_assert_ne!(first, second);
        }
    }
}
