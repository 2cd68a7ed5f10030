use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::ocr::error::OcrError;

/// `eng`, `chi_sim`, `eng+deu+fra`, ...
static LANGUAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z_]{1,15}(\+[a-z][a-z_]{1,15}){0,4}$").unwrap());

/// Checks the local tesseract installation.
pub struct OcrHealthChecker {
    binary: String,
    languages: OnceCell<Vec<String>>,
}

impl OcrHealthChecker {
    pub fn new() -> Self {
        Self::with_binary("tesseract")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: OnceCell::new(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Returns the first line of `tesseract --version`.
    pub async fn check_tesseract_installation(&self) -> Result<String, OcrError> {
        let output = self.run(&["--version"]).await?;
        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or(OcrError::TesseractNotInstalled)
    }

    /// Installed language packs, cached after the first successful lookup.
    pub async fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
        self.languages
            .get_or_try_init(|| async {
                let output = self.run(&["--list-langs"]).await?;
                Ok::<_, OcrError>(parse_language_list(&output))
            })
            .await
            .cloned()
    }

    /// Validate syntax and make sure every component language is installed.
    pub async fn validate_language_combination(&self, lang: &str) -> Result<(), OcrError> {
        validate_language_syntax(lang)?;

        let installed = self.installed_languages().await?;
        for part in lang.split('+') {
            if !installed.iter().any(|l| l == part) {
                return Err(OcrError::LanguageNotInstalled { lang: part.to_string() });
            }
        }
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::TesseractNotInstalled
                } else {
                    OcrError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(OcrError::InitializationFailed {
                details: format!(
                    "{} {} exited with {}: {}",
                    self.binary,
                    args.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        // Older tesseract releases print to stderr
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push('\n');
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }
}

impl Default for OcrHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_language_syntax(lang: &str) -> Result<(), OcrError> {
    if LANGUAGE_PATTERN.is_match(lang) {
        Ok(())
    } else {
        Err(OcrError::InvalidLanguage {
            lang: lang.to_string(),
            details: "expected tesseract language codes such as 'eng' or 'eng+deu'".to_string(),
        })
    }
}

fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(' '))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_syntax() {
        assert!(validate_language_syntax("eng").is_ok());
        assert!(validate_language_syntax("chi_sim").is_ok());
        assert!(validate_language_syntax("eng+deu+fra").is_ok());

        assert!(validate_language_syntax("").is_err());
        assert!(validate_language_syntax("ENG").is_err());
        assert!(validate_language_syntax("eng+").is_err());
        assert!(validate_language_syntax("eng; rm -rf /").is_err());
        assert!(validate_language_syntax("../eng").is_err());
    }

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\neng\nosd\nspa\n\n";
        assert_eq!(parse_language_list(output), vec!["eng", "osd", "spa"]);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_not_installed() {
        let checker = OcrHealthChecker::with_binary("definitely-not-tesseract-binary");
        let err = checker.check_tesseract_installation().await.unwrap_err();
        assert!(matches!(err, OcrError::TesseractNotInstalled));
    }
}
