//! Template and parser listings.

use std::io::Write;

use herald_route::{Router, RoutingConfig};

use crate::error::CliError;
use crate::output::{OutputFormat, ParserList, TemplateList};

/// Handler for the templates command.
pub struct TemplatesCommand<'a> {
    router: &'a Router,
    config: Option<&'a RoutingConfig>,
}

impl<'a> TemplatesCommand<'a> {
    /// Creates a new templates command handler.
    #[must_use]
    pub const fn new(router: &'a Router, config: Option<&'a RoutingConfig>) -> Self {
        Self { router, config }
    }

    /// Lists custom templates from the configuration, then the presets.
    ///
    /// # Errors
    ///
    /// Returns error if writing fails.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let templates = self
            .config
            .map(|c| c.templates.clone())
            .unwrap_or_default()
            .into_iter()
            .chain(self.router.templates().presets().iter().cloned())
            .collect();
        format.write(out, &TemplateList { templates })
    }
}

/// Handler for the parsers command.
pub struct ParsersCommand<'a> {
    router: &'a Router,
}

impl<'a> ParsersCommand<'a> {
    /// Creates a new parsers command handler.
    #[must_use]
    pub const fn new(router: &'a Router) -> Self {
        Self { router }
    }

    /// Lists the registered parsers in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns error if writing fails.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let list = ParserList {
            parsers: self.router.parsers(),
        };
        format.write(out, &list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn custom_templates_listed_before_presets() {
        let config = RoutingConfig::from_json(
            r#"{"templates": [{"id": "mine", "name": "mine",
                "style": {"title_template": "{title}", "color": "blue"}}]}"#,
        )
        .expect("valid config");
        let router = Router::new();
        let mut buf = Vec::new();
        TemplatesCommand::new(&router, Some(&config))
            .execute(&mut buf, &OutputFormat::new(Format::Json))
            .expect("should list");

        let parsed: serde_json::Value = serde_json::from_slice(&buf).expect("valid json");
        assert_eq!(parsed["templates"][0]["id"], "mine");
        assert_eq!(parsed["templates"][1]["id"], "preset_p0");
    }

    #[test]
    fn presets_without_config() {
        let router = Router::new();
        let mut buf = Vec::new();
        TemplatesCommand::new(&router, None)
            .execute(&mut buf, &OutputFormat::default())
            .expect("should list");
        let output = String::from_utf8(buf).expect("utf8");
        assert!(output.contains("Total: 3 template(s)"));
    }

    #[test]
    fn lists_parsers_in_dispatch_order() {
        let router = Router::new();
        let mut buf = Vec::new();
        ParsersCommand::new(&router)
            .execute(&mut buf, &OutputFormat::new(Format::Json))
            .expect("should list");
        let parsed: serde_json::Value = serde_json::from_slice(&buf).expect("valid json");
        assert_eq!(parsed["parsers"][0]["name"], "tencent-cls");
        assert_eq!(parsed["parsers"][3]["name"], "generic-text");
    }
}
