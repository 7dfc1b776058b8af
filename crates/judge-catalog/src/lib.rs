//! Read-only mapping from language to the container image, compile step,
//! run step, source filename, and per-language limits used to execute it.
//! The catalog is process-global and constant; callers treat it as
//! configuration data, never as code to branch on ad hoc.

use std::collections::HashMap;

use judge_core::Language;

/// One language's execution recipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageSpec {
    pub image: String,
    pub compile_cmd: Option<Vec<String>>,
    pub run_cmd: Vec<String>,
    pub source_filename: &'static str,
    pub run_timeout_ms: u64,
    pub memory_limit_mb: u64,
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The built-in defaults, grounded verbatim on the language/image/command
/// table of the system this engine replaces.
fn default_spec(language: Language) -> LanguageSpec {
    match language {
        Language::Python3 => LanguageSpec {
            image: "python:3.9-slim".into(),
            compile_cmd: None,
            run_cmd: strs(&["python3", "/tmp/solution.py"]),
            source_filename: "solution.py",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Python2 => LanguageSpec {
            image: "judge0/python2:latest".into(),
            compile_cmd: None,
            run_cmd: strs(&["python2", "/tmp/solution.py"]),
            source_filename: "solution.py",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Java => LanguageSpec {
            image: "judge0/java:latest".into(),
            compile_cmd: Some(strs(&["javac", "/tmp/Solution.java"])),
            run_cmd: strs(&["java", "-cp", "/tmp", "Solution"]),
            source_filename: "Solution.java",
            run_timeout_ms: 10_000,
            memory_limit_mb: 256,
        },
        Language::Cpp => LanguageSpec {
            image: "gcc:latest".into(),
            compile_cmd: Some(strs(&[
                "g++",
                "-o",
                "/tmp/solution",
                "/tmp/solution.cpp",
                "-std=c++17",
            ])),
            run_cmd: strs(&["/tmp/solution"]),
            source_filename: "solution.cpp",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::C => LanguageSpec {
            image: "gcc:latest".into(),
            compile_cmd: Some(strs(&["gcc", "-o", "/tmp/solution", "/tmp/solution.c"])),
            run_cmd: strs(&["/tmp/solution"]),
            source_filename: "solution.c",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Javascript => LanguageSpec {
            image: "judge0/node:latest".into(),
            compile_cmd: None,
            run_cmd: strs(&["node", "/tmp/solution.js"]),
            source_filename: "solution.js",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Typescript => LanguageSpec {
            image: "judge0/typescript:latest".into(),
            compile_cmd: Some(strs(&["tsc", "/tmp/solution.ts", "--outDir", "/tmp"])),
            run_cmd: strs(&["node", "/tmp/solution.js"]),
            source_filename: "solution.ts",
            run_timeout_ms: 8000,
            memory_limit_mb: 128,
        },
        Language::Rust => LanguageSpec {
            image: "judge0/rust:latest".into(),
            compile_cmd: Some(strs(&["rustc", "/tmp/solution.rs", "-o", "/tmp/solution"])),
            run_cmd: strs(&["/tmp/solution"]),
            source_filename: "solution.rs",
            run_timeout_ms: 10_000,
            memory_limit_mb: 128,
        },
        Language::Go => LanguageSpec {
            image: "judge0/go:latest".into(),
            compile_cmd: Some(strs(&["go", "build", "-o", "/tmp/solution", "/tmp/solution.go"])),
            run_cmd: strs(&["/tmp/solution"]),
            source_filename: "solution.go",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Ruby => LanguageSpec {
            image: "judge0/ruby:latest".into(),
            compile_cmd: None,
            run_cmd: strs(&["ruby", "/tmp/solution.rb"]),
            source_filename: "solution.rb",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Php => LanguageSpec {
            image: "judge0/php:latest".into(),
            compile_cmd: None,
            run_cmd: strs(&["php", "/tmp/solution.php"]),
            source_filename: "solution.php",
            run_timeout_ms: 5000,
            memory_limit_mb: 128,
        },
        Language::Csharp => LanguageSpec {
            image: "judge0/csharp:latest".into(),
            compile_cmd: Some(strs(&["csc", "/tmp/solution.cs", "-out:/tmp/solution.exe"])),
            run_cmd: strs(&["mono", "/tmp/solution.exe"]),
            source_filename: "solution.cs",
            run_timeout_ms: 8000,
            memory_limit_mb: 256,
        },
    }
}

/// The catalog resolved for this process: defaults patched with any
/// operator-supplied image overrides. Built once at startup and shared
/// behind an immutable reference (an `Arc` at the call site); never
/// mutated after construction.
#[derive(Clone, Debug)]
pub struct Catalog {
    specs: HashMap<Language, LanguageSpec>,
}

/// Global resource ceilings, operator-configured, that cap (never raise)
/// the per-language defaults. A language whose built-in limit already sits
/// below a ceiling is left untouched; the catalog's own table remains the
/// per-language override the spec describes.
#[derive(Clone, Copy, Debug)]
pub struct ResourceCeilings {
    pub max_memory_mb: u64,
    pub max_wall_time_ms: u64,
    pub max_cpu_time_ms: u64,
}

impl Default for ResourceCeilings {
    fn default() -> Self {
        Self { max_memory_mb: u64::MAX, max_wall_time_ms: u64::MAX, max_cpu_time_ms: u64::MAX }
    }
}

impl Catalog {
    /// Builds the catalog from built-in defaults, applying `image_overrides`
    /// (language -> image reference) on top. Ceilings are left uncapped;
    /// use [`Catalog::with_config`] to apply operator-configured limits.
    pub fn with_overrides(image_overrides: &HashMap<Language, String>) -> Self {
        Self::with_config(image_overrides, &ResourceCeilings::default())
    }

    /// Builds the catalog from built-in defaults, applying image overrides
    /// and then capping every language's memory/wall-time limit at
    /// `ceilings`.
    pub fn with_config(
        image_overrides: &HashMap<Language, String>,
        ceilings: &ResourceCeilings,
    ) -> Self {
        let mut specs = HashMap::with_capacity(Language::ALL.len());
        for &lang in Language::ALL {
            let mut spec = default_spec(lang);
            if let Some(image) = image_overrides.get(&lang) {
                spec.image = image.clone();
            }
            spec.memory_limit_mb = spec.memory_limit_mb.min(ceilings.max_memory_mb);
            spec.run_timeout_ms =
                spec.run_timeout_ms.min(ceilings.max_wall_time_ms).min(ceilings.max_cpu_time_ms);
            specs.insert(lang, spec);
        }
        Self { specs }
    }

    pub fn lookup(&self, language: Language) -> &LanguageSpec {
        self.specs
            .get(&language)
            .expect("catalog is built for every Language variant")
    }

    pub fn languages(&self) -> impl Iterator<Item = (Language, &LanguageSpec)> {
        Language::ALL.iter().map(move |&l| (l, self.lookup(l)))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_overrides(&HashMap::new())
    }
}
