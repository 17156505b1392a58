use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::errors::SandboxError;

/// One argument of a command template.
///
/// Placeholders are resolved to paths chosen by the sandbox. Submitted code
/// never becomes part of a command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    Lit(&'static str),
    /// `{file}`: the source file.
    Source,
    /// `{output}`: the compiled artifact.
    Output,
    /// `{workdir}`: the working directory.
    WorkDir,
    /// A flag glued to the artifact path, as in `-out:{output}`.
    OutputFlag(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandTemplate(pub &'static [Arg]);

/// A command with every placeholder substituted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Paths inside one working directory that placeholders refer to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkPaths {
    pub workdir: PathBuf,
    pub source: PathBuf,
    pub output: PathBuf,
}

impl CommandTemplate {
    /// The program the template starts with, when it is a literal.
    pub fn tool(&self) -> Option<&'static str> {
        match self.0.first() {
            Some(Arg::Lit(tool)) => Some(tool),
            _ => None,
        }
    }

    pub fn resolve(&self, paths: &WorkPaths) -> Invocation {
        let mut resolved = self.0.iter().map(|arg| match arg {
            Arg::Lit(text) => OsString::from(text),
            Arg::Source => paths.source.clone().into_os_string(),
            Arg::Output => paths.output.clone().into_os_string(),
            Arg::WorkDir => paths.workdir.clone().into_os_string(),
            Arg::OutputFlag(flag) => {
                let mut joined = OsString::from(flag);
                joined.push(&paths.output);
                joined
            }
        });

        Invocation {
            program: resolved.next().unwrap_or_default(),
            args: resolved.collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageDescriptor {
    pub id: &'static str,
    pub source_extension: &'static str,
    /// File stem of the source file. Some toolchains require a fixed one.
    pub source_stem: &'static str,
    /// File name of the compiled artifact inside the working directory.
    pub artifact_name: &'static str,
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
}

impl LanguageDescriptor {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.source_stem, self.source_extension)
    }

    pub fn paths(&self, workdir: &Path) -> WorkPaths {
        WorkPaths {
            workdir: workdir.to_path_buf(),
            source: workdir.join(self.source_file_name()),
            output: workdir.join(self.artifact_name),
        }
    }

    /// The tool whose presence decides whether this language can be used.
    pub fn toolchain(&self) -> Option<&'static str> {
        self.compile.as_ref().unwrap_or(&self.run).tool()
    }
}

const fn interpreted(
    id: &'static str,
    source_extension: &'static str,
    run: &'static [Arg],
) -> LanguageDescriptor {
    LanguageDescriptor {
        id,
        source_extension,
        source_stem: "solution",
        artifact_name: "solution",
        compile: None,
        run: CommandTemplate(run),
    }
}

const fn compiled(
    id: &'static str,
    source_extension: &'static str,
    compile: &'static [Arg],
) -> LanguageDescriptor {
    LanguageDescriptor {
        id,
        source_extension,
        source_stem: "solution",
        artifact_name: "solution",
        compile: Some(CommandTemplate(compile)),
        run: CommandTemplate(&[Arg::Output]),
    }
}

use Arg::{Lit, Output, OutputFlag, Source, WorkDir};

pub static BUILTIN_LANGUAGES: &[LanguageDescriptor] = &[
    interpreted("python", "py", &[Lit("python3"), Source]),
    interpreted("javascript", "js", &[Lit("node"), Source]),
    interpreted("typescript", "ts", &[Lit("npx"), Lit("ts-node"), Source]),
    interpreted("ruby", "rb", &[Lit("ruby"), Source]),
    interpreted("php", "php", &[Lit("php"), Source]),
    compiled(
        "c",
        "c",
        &[Lit("gcc"), Lit("-O2"), Lit("-o"), Output, Source, Lit("-lm")],
    ),
    compiled(
        "cpp",
        "cpp",
        &[Lit("g++"), Lit("-O2"), Lit("-std=c++17"), Lit("-o"), Output, Source],
    ),
    compiled(
        "rust",
        "rs",
        &[Lit("rustc"), Lit("-O"), Source, Lit("-o"), Output],
    ),
    compiled(
        "go",
        "go",
        &[Lit("go"), Lit("build"), Lit("-o"), Output, Source],
    ),
    LanguageDescriptor {
        id: "java",
        source_extension: "java",
        source_stem: "Solution",
        // javac names the class file itself; the run step only needs {workdir}
        artifact_name: "Solution.class",
        compile: Some(CommandTemplate(&[Lit("javac"), Source])),
        run: CommandTemplate(&[Lit("java"), Lit("-cp"), WorkDir, Lit("Solution")]),
    },
    LanguageDescriptor {
        id: "csharp",
        source_extension: "cs",
        source_stem: "solution",
        artifact_name: "solution.exe",
        compile: Some(CommandTemplate(&[Lit("mcs"), OutputFlag("-out:"), Source])),
        run: CommandTemplate(&[Lit("mono"), Output]),
    },
];

/// Immutable lookup table from language id to descriptor.
#[derive(Clone, Debug)]
pub struct LanguageRegistry {
    languages: Vec<LanguageDescriptor>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LanguageRegistry {
    pub fn builtin() -> Self {
        Self::new(BUILTIN_LANGUAGES.to_vec())
    }

    /// Later descriptors with an already registered id are ignored.
    pub fn new(languages: Vec<LanguageDescriptor>) -> Self {
        let mut unique: Vec<LanguageDescriptor> = Vec::with_capacity(languages.len());
        for language in languages {
            if unique.iter().all(|known| known.id != language.id) {
                unique.push(language);
            } else {
                tracing::warn!("Duplicate language id ignored: {}", language.id);
            }
        }
        Self { languages: unique }
    }

    pub fn resolve(&self, language_id: &str) -> Result<&LanguageDescriptor, SandboxError> {
        self.languages
            .iter()
            .find(|language| language.id == language_id)
            .ok_or_else(|| SandboxError::UnsupportedLanguage(language_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageDescriptor> {
        self.languages.iter()
    }
}
