//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;

use herald_route::{ParseResult, ParsedMessage, ParserInfo, RoutingDecision, Template, Validation};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for ParsedMessage {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Message: {}", self.title)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "ID:          {}", self.id)?;
        writeln!(writer, "Level:       {}", self.level)?;
        writeln!(writer, "Source:      {}", self.source)?;
        writeln!(writer, "Service:     {}", self.service)?;
        writeln!(writer, "Time:        {}", self.timestamp.to_rfc3339())?;
        writeln!(writer, "Parser:      {} ({:.1})", self.parser, self.confidence)?;
        if !self.tags.is_empty() {
            writeln!(writer, "Tags:        {}", self.tags.join(", "))?;
        }
        if !self.labels.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Labels")?;
            for (k, v) in &self.labels {
                writeln!(writer, "  {k}: {v}")?;
            }
        }
        writeln!(writer)?;
        writeln!(writer, "{}", self.content)?;
        Ok(())
    }
}

/// Results of a batch parse, in input order.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct BatchResults {
    /// One result per input payload.
    pub results: Vec<ParseResult>,
}

impl TableDisplay for BatchResults {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.results.is_empty() {
            writeln!(writer, "No payloads")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>4}  {:<14}  {:<7}  {:<20}  {:<40}",
            "#", "PARSER", "LEVEL", "SERVICE", "TITLE"
        )?;
        writeln!(writer, "{}", "─".repeat(93))?;

        for (i, result) in self.results.iter().enumerate() {
            match &result.message {
                Some(msg) => writeln!(
                    writer,
                    "{:>4}  {:<14}  {:<7}  {:<20}  {:<40}",
                    i,
                    msg.parser,
                    msg.level.as_str(),
                    truncate(&msg.service, 20),
                    truncate(&msg.title, 40)
                )?,
                None => writeln!(
                    writer,
                    "{:>4}  ✗ {}",
                    i,
                    result.error.as_deref().unwrap_or("unknown error")
                )?,
            }
        }

        let parsed = self.results.iter().filter(|r| r.success).count();
        writeln!(writer)?;
        writeln!(writer, "Parsed: {parsed}/{}", self.results.len())?;
        Ok(())
    }
}

impl TableDisplay for Validation {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.valid {
            writeln!(writer, "✓ Payload is valid")?;
        } else {
            writeln!(writer, "✗ Payload is invalid")?;
            for error in &self.errors {
                writeln!(writer, "  - {error}")?;
            }
        }
        Ok(())
    }
}

impl TableDisplay for RoutingDecision {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Routing Decision")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Group:       {} ({})", self.group.name, self.group.identifier)?;
        writeln!(
            writer,
            "Message:     [{}] {} via {}",
            self.message.level, self.message.title, self.message.parser
        )?;
        match &self.rule {
            Some(rule) => writeln!(writer, "Rule:        {} (priority {})", rule.name, rule.priority)?,
            None => writeln!(writer, "Rule:        none matched")?,
        }
        if self.matched_rules.len() > 1 {
            let others: Vec<&str> =
                self.matched_rules[1..].iter().map(|r| r.name.as_str()).collect();
            writeln!(writer, "Also:        {}", others.join(", "))?;
        }
        if self.users.is_empty() {
            writeln!(writer, "Notify:      nobody")?;
        } else {
            let names: Vec<&str> = self.users.iter().map(|u| u.name.as_str()).collect();
            writeln!(writer, "Notify:      {}", names.join(", "))?;
        }
        writeln!(writer, "Template:    {} ({})", self.template.name, self.template.id)?;

        writeln!(writer)?;
        writeln!(writer, "{} [{}]", self.rendered.title, self.rendered.color)?;
        for line in self.rendered.left.iter().chain(&self.rendered.right) {
            writeln!(writer, "  {line}")?;
        }
        if !self.rendered.button_text.is_empty() {
            writeln!(writer, "  [{}]", self.rendered.button_text)?;
        }
        Ok(())
    }
}

/// Templates available for selection.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateList {
    /// Custom templates first, then presets.
    pub templates: Vec<Template>,
}

impl TableDisplay for TemplateList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{:<24}  {:<7}  {:<7}  {:<50}",
            "ID", "KIND", "COLOR", "CONDITIONS"
        )?;
        writeln!(writer, "{}", "─".repeat(94))?;

        for template in &self.templates {
            let conditions = if template.conditions.is_empty() {
                "always".to_string()
            } else {
                template
                    .conditions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" AND ")
            };
            writeln!(
                writer,
                "{:<24}  {:<7}  {:<7}  {:<50}",
                truncate(&template.id, 24),
                if template.is_preset() { "preset" } else { "custom" },
                template.style.color.as_str(),
                truncate(&conditions, 50)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} template(s)", self.templates.len())?;
        Ok(())
    }
}

/// Registered parsers in dispatch order.
#[derive(Debug, Clone, Serialize)]
pub struct ParserList {
    /// Parsers.
    pub parsers: Vec<ParserInfo>,
}

impl TableDisplay for ParserList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{:>3}  {:<16}  {:<50}", "#", "NAME", "DESCRIPTION")?;
        writeln!(writer, "{}", "─".repeat(73))?;
        for (i, parser) in self.parsers.iter().enumerate() {
            writeln!(
                writer,
                "{:>3}  {:<16}  {:<50}",
                i + 1,
                parser.name,
                truncate(&parser.description, 50)
            )?;
        }
        Ok(())
    }
}

/// Truncates to `max_chars` characters, marking the cut with `...`.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars > 3 {
        let cut: String = s.chars().take(max_chars - 3).collect();
        format!("{cut}...")
    } else {
        s.chars().take(max_chars).collect()
    }
}
