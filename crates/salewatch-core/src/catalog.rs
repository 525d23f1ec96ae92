use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Retailer catalog layout: where category JSON lives and which categories
/// make up one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Prefix every category id is appended to, e.g. `"http://www.bonobos.com/b/"`.
    pub base_url: String,
    /// The retailer's own sale listing. Fetched alongside the ordinary
    /// categories but kept in its own collection.
    pub sale_category: String,
    /// Ordinary categories; together they make up the full product list.
    pub categories: Vec<String>,
}

impl CatalogFile {
    /// Number of ordinary categories a refresh cycle waits for.
    #[must_use]
    pub fn expected_categories(&self) -> usize {
        self.categories.len()
    }
}

/// Load and validate the catalog configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate catalog YAML that is already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    if !(catalog.base_url.starts_with("http://") || catalog.base_url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must start with http:// or https://",
            catalog.base_url
        )));
    }

    validate_category_id(&catalog.sale_category)?;

    if catalog.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for category in &catalog.categories {
        validate_category_id(category)?;

        if category == &catalog.sale_category {
            return Err(ConfigError::Validation(format!(
                "sale category '{category}' must not also be listed as an ordinary category"
            )));
        }

        if !seen.insert(category.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category: '{category}'"
            )));
        }
    }

    Ok(())
}

/// Category ids are spliced into a URL path segment verbatim.
fn validate_category_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Validation(
            "category id must be non-empty".to_string(),
        ));
    }
    if id.contains('/') || id.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "category id '{id}' must not contain '/' or whitespace"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
base_url: "http://www.bonobos.com/b/"
sale_category: sale-for-men
categories:
  - mens-pants
  - mens-jeans
"#;

    #[test]
    fn parses_valid_catalog() {
        let catalog = parse_catalog(VALID).expect("valid catalog");
        assert_eq!(catalog.base_url, "http://www.bonobos.com/b/");
        assert_eq!(catalog.sale_category, "sale-for-men");
        assert_eq!(catalog.categories, vec!["mens-pants", "mens-jeans"]);
        assert_eq!(catalog.expected_categories(), 2);
    }

    #[test]
    fn rejects_empty_category_list() {
        let yaml = r#"
base_url: "http://www.bonobos.com/b/"
sale_category: sale-for-men
categories: []
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("at least one")));
    }

    #[test]
    fn rejects_duplicate_category() {
        let yaml = r#"
base_url: "http://www.bonobos.com/b/"
sale_category: sale-for-men
categories: [mens-pants, mens-pants]
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_sale_category_listed_twice() {
        let yaml = r#"
base_url: "http://www.bonobos.com/b/"
sale_category: sale-for-men
categories: [mens-pants, sale-for-men]
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("must not also")));
    }

    #[test]
    fn rejects_category_with_path_separator() {
        let yaml = r#"
base_url: "http://www.bonobos.com/b/"
sale_category: sale-for-men
categories: ["mens/pants"]
"#;
        assert!(matches!(
            parse_catalog(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let yaml = r#"
base_url: "www.bonobos.com/b/"
sale_category: sale-for-men
categories: [mens-pants]
"#;
        assert!(matches!(
            parse_catalog(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            parse_catalog("categories: [unterminated"),
            Err(ConfigError::CatalogFileParse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_catalog(Path::new("/nonexistent/salewatch/catalog.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
    }
}
