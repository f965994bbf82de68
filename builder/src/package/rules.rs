//! Wanted-file rules selecting the subset of a toolchain that is packaged.
//!
//! Rules are relative POSIX paths under the toolchain root. A rule without
//! wildcards is a literal that must exist; a rule with `*`, `?` or `[` is a
//! glob that may match nothing. Every rule may contain the `$V` placeholder,
//! which is replaced by the release version once, when the manifest is
//! built.

use super::error::PackagingError;
use super::host::{HostOs, HostPlatform};
use glob::{MatchOptions, Pattern};
use std::path::Component;

/// Placeholder substituted with the release version in every rule.
pub const VERSION_PLACEHOLDER: &str = "$V";

/// Matching is case-sensitive and `*` crosses `/`, mirroring `fnmatch`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Sanitizer and profiling runtimes shipped for the host triple on Linux.
const LINUX_HOST_RUNTIMES: &[&str] = &[
    "libclang_rt.asan.a",
    "libclang_rt.asan_cxx.a",
    "libclang_rt.asan_static.a",
    "libclang_rt.builtins.a",
    "libclang_rt.profile.a",
    "libclang_rt.ubsan_standalone.a",
    "libclang_rt.ubsan_standalone_cxx.a",
    "clang_rt.crtbegin.o",
    "clang_rt.crtend.o",
];

/// Triples whose builtins are shipped for cross compilation from Linux.
const LINUX_CROSS_TRIPLES: &[&str] = &[
    "aarch64-unknown-linux-gnu",
    "armv7-unknown-linux-gnueabihf",
    "i386-unknown-linux-gnu",
    "x86_64-unknown-linux-gnu",
];

/// A single wanted-file rule after placeholder substitution.
#[derive(Debug, Clone)]
pub enum PathRule {
    /// A path that must exist under the toolchain root.
    Literal(String),
    /// A pattern matched against every relative file path.
    Glob(Pattern),
}

impl PathRule {
    /// Parse a substituted rule, rejecting paths that escape the root.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidRule`] if the rule is empty,
    /// absolute, contains `..` or a backslash, or is not a valid glob.
    pub fn parse(rule: &str) -> Result<Self, PackagingError> {
        validate_relative(rule)?;
        if !has_wildcard(rule) {
            return Ok(Self::Literal(rule.to_owned()));
        }
        Pattern::new(rule)
            .map(Self::Glob)
            .map_err(|e| PackagingError::InvalidRule {
                rule: rule.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Return the rule text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(path) => path,
            Self::Glob(pattern) => pattern.as_str(),
        }
    }

    /// Return true when `relative_path` is selected by this rule.
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> bool {
        match self {
            Self::Literal(path) => path == relative_path,
            Self::Glob(pattern) => pattern.matches_with(relative_path, MATCH_OPTIONS),
        }
    }
}

/// The immutable set of rules for one packaging run.
#[derive(Debug, Clone)]
pub struct WantedFileManifest {
    rules: Vec<PathRule>,
}

impl WantedFileManifest {
    /// Build the manifest for `host`, substituting `release` for `$V`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidRule`] if any rule is malformed
    /// after substitution.
    pub fn for_host(host: HostPlatform, release: &str) -> Result<Self, PackagingError> {
        Self::from_templates(rule_templates(host), release)
    }

    /// Build a manifest from raw rule templates.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidRule`] if any rule is malformed
    /// after substitution.
    pub fn from_templates<I, S>(templates: I, release: &str) -> Result<Self, PackagingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = templates
            .into_iter()
            .map(|template| PathRule::parse(&template.as_ref().replace(VERSION_PLACEHOLDER, release)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Return every rule in manifest order.
    #[must_use]
    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    /// Iterate over the literal (mandatory) rules in manifest order.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| match rule {
            PathRule::Literal(path) => Some(path.as_str()),
            PathRule::Glob(_) => None,
        })
    }

    /// Return true when `relative_path` matches at least one rule.
    #[must_use]
    pub fn is_wanted(&self, relative_path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(relative_path))
    }
}

/// Return the unsubstituted rule templates for `host`.
#[must_use]
pub fn rule_templates(host: HostPlatform) -> Vec<String> {
    let exe = host.exe_suffix();
    let mut want: Vec<String> = vec![
        format!("bin/llvm-pdbutil{exe}"),
        format!("bin/llvm-symbolizer{exe}"),
        format!("bin/llvm-undname{exe}"),
        // Built-in headers.
        "lib/clang/$V/include/*".to_owned(),
        "lib/clang/$V/share/asan_*list.txt".to_owned(),
        "lib/clang/$V/share/cfi_*list.txt".to_owned(),
    ];

    if host.is_windows() {
        want.extend(
            ["bin/clang-cl.exe", "bin/lld-link.exe", "bin/llvm-ml.exe"]
                .map(str::to_owned),
        );
    } else {
        want.extend(
            [
                "bin/clang",
                "bin/lld",
                "bin/llvm-ar",
                "bin/llvm-objcopy",
                "bin/llvm-objdump",
                "bin/llvm-readobj",
            ]
            .map(str::to_owned),
        );
    }

    match host.os {
        HostOs::Linux => want.extend(linux_templates(host)),
        HostOs::MacOs => want.extend(
            [
                "lib/clang/$V/lib/darwin/libclang_rt.osx.a",
                "lib/clang/$V/lib/darwin/libclang_rt.*_osx_dynamic.dylib",
            ]
            .map(str::to_owned),
        ),
        HostOs::Windows => want.push("lib/clang/$V/lib/windows/clang_rt.*.lib".to_owned()),
    }

    want
}

fn linux_templates(host: HostPlatform) -> Vec<String> {
    let host_triple = host.linux_triple();
    let mut want: Vec<String> = LINUX_HOST_RUNTIMES
        .iter()
        .map(|name| format!("lib/clang/$V/lib/{host_triple}/{name}"))
        .collect();
    want.push(format!("lib/clang/$V/lib/{host_triple}/libclang_rt.*.a.syms"));
    want.extend(
        LINUX_CROSS_TRIPLES
            .iter()
            .filter(|triple| **triple != host_triple)
            .map(|triple| format!("lib/clang/$V/lib/{triple}/libclang_rt.builtins.a")),
    );
    // Android builtins keep their debug sections; see `stage::should_strip_debug`.
    want.push("lib/clang/$V/lib/linux/libclang_rt.builtins-*-android.a".to_owned());
    want
}

fn has_wildcard(rule: &str) -> bool {
    rule.contains(['*', '?', '['])
}

fn validate_relative(rule: &str) -> Result<(), PackagingError> {
    let reject = |reason: &str| PackagingError::InvalidRule {
        rule: rule.to_owned(),
        reason: reason.to_owned(),
    };
    if rule.is_empty() {
        return Err(reject("rule must not be empty"));
    }
    if rule.contains('\\') {
        return Err(reject("rules use '/' as the only separator"));
    }
    if rule.starts_with('/') {
        return Err(reject("rule must be relative to the toolchain root"));
    }
    if std::path::Path::new(rule)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(reject("rule must not contain '..'"));
    }
    Ok(())
}
