use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages a submission fragment can be resolved to.
/// Serialized/deserialized in `lowercase`; common aliases are accepted
/// (e.g. "cc", "c++", "py"). Anything unrecognised becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "py", alias = "python3")]
    Python,
    Java,
    C,
    #[serde(alias = "cc", alias = "c++")]
    Cpp,
    #[default]
    #[serde(other)]
    Unknown,
}

static JAVA_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(public\s+)?class\s+\w+\s*\{").unwrap());

static PYTHON_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(^\s*(def|class)\s+\w+.*:\s*$|^\s*(import|from)\s+\w+|\bprint\s*\(|\binput\s*\()",
    )
    .unwrap()
});

static GENERIC_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(input|scanf|cin|readline|gets|Scanner)\b").unwrap());

static C_READ: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bread\s*\(").unwrap());

impl Language {
    /// Map a free-form label (as returned by an external service) to a language.
    pub fn from_label(label: &str) -> Language {
        match label.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase().as_str() {
            "python" | "python3" | "py" => Language::Python,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" | "c++" | "cc" | "cxx" => Language::Cpp,
            _ => Language::Unknown,
        }
    }

    /// Keyword sniffing used when no external language detection is available.
    ///
    /// Java and C-family markers are checked before Python hints because
    /// `import` lines are common to Java and Python.
    pub fn sniff(code: &str) -> Language {
        let lower = code.to_lowercase();
        if lower.trim().is_empty() {
            return Language::Unknown;
        }
        if lower.contains("public static void main")
            || lower.contains("system.out.print")
            || (JAVA_CLASS.is_match(code) && lower.contains("static"))
        {
            return Language::Java;
        }
        if lower.contains("#include") {
            let cpp = ["std::", "iostream", "cin >>", "cin>>", "cout", "using namespace"]
                .iter()
                .any(|tok| lower.contains(tok));
            return if cpp { Language::Cpp } else { Language::C };
        }
        if PYTHON_HINT.is_match(&lower) {
            return Language::Python;
        }
        Language::Unknown
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

pub trait LanguageExt {
    /// e.g., "main.py", "Main.java", "main.c", "main.cpp"
    fn main_filename(&self) -> &'static str;

    /// Compile step run inside the sandbox, if the language needs one.
    /// Warnings are suppressed; a failing build is reported through the exit status.
    fn build_command(&self) -> Option<&'static str>;

    /// Command that runs the program (after any build step) with stdin attached.
    fn run_command(&self) -> Option<&'static str>;

    /// Static check: does the program read standard input?
    fn reads_input(&self, code: &str) -> bool;
}

impl LanguageExt for Language {
    fn main_filename(&self) -> &'static str {
        match self {
            Language::Python => "main.py",
            Language::Java => "Main.java",
            Language::C => "main.c",
            Language::Cpp => "main.cpp",
            Language::Unknown => "main.txt",
        }
    }

    fn build_command(&self) -> Option<&'static str> {
        match self {
            Language::C => Some("gcc -w -O2 -o /tmp/prog /code/main.c -lm"),
            Language::Cpp => Some("g++ -w -O2 -o /tmp/prog /code/main.cpp"),
            Language::Java => Some("mkdir -p /tmp/classes && javac -nowarn -d /tmp/classes /code/Main.java"),
            Language::Python | Language::Unknown => None,
        }
    }

    fn run_command(&self) -> Option<&'static str> {
        match self {
            Language::Python => Some("python3 /code/main.py"),
            Language::C | Language::Cpp => Some("/tmp/prog"),
            Language::Java => Some("java -cp /tmp/classes Main"),
            Language::Unknown => None,
        }
    }

    fn reads_input(&self, code: &str) -> bool {
        match self {
            Language::Python => code.contains("input(") || code.contains("sys.stdin"),
            Language::Java => {
                let lower = code.to_lowercase();
                lower.contains("scanner(") || lower.contains("system.in")
            }
            Language::C | Language::Cpp => {
                ["scanf(", "cin >>", "cin>>", "gets(", "getchar(", "getline("]
                    .iter()
                    .any(|tok| code.contains(tok))
                    || C_READ.is_match(code)
            }
            Language::Unknown => GENERIC_INPUT.is_match(code),
        }
    }
}
