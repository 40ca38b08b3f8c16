//! Languages of the solutions, picked from the file extension.

use std::{fmt, path::Path};

use crate::error::ValidationError;

/// Languages accepted by the grader.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Language {
    /// `.py`
    Python,
    /// `.cpp`
    Cpp,
    /// `.go`
    Golang,
}

impl Language {
    /// Picks the language from the file extension (case-insensitive).
    ///
    /// # Errors
    /// [`ValidationError::UnknownLanguage`] for any other extension, or none.
    pub fn from_path(path: &Path) -> Result<Language, ValidationError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "py" => Ok(Language::Python),
            "cpp" => Ok(Language::Cpp),
            "go" => Ok(Language::Golang),
            _ => Err(ValidationError::UnknownLanguage(extension)),
        }
    }

    /// Name expected by the service.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Cpp => "C++",
            Language::Golang => "Golang",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(Language::from_path(Path::new("a.py")), Ok(Language::Python));
        assert_eq!(Language::from_path(Path::new("dir/sol.cpp")), Ok(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("main.GO")), Ok(Language::Golang));
        assert_eq!(Language::Cpp.as_str(), "C++");
    }

    #[test]
    fn other_extensions_are_refused() {
        assert_eq!(
            Language::from_path(Path::new("Main.java")),
            Err(ValidationError::UnknownLanguage("java".into()))
        );
        assert_eq!(
            Language::from_path(Path::new("Makefile")),
            Err(ValidationError::UnknownLanguage(String::new()))
        );
    }
}
