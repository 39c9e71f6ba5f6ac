//! Route command implementation.

use std::io::Write;

use herald_route::{Router, RoutingConfig};

use crate::cli::RouteArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

use super::read_payload;

/// Handler for the route command.
pub struct RouteCommand<'a> {
    router: &'a Router,
    config: Option<&'a RoutingConfig>,
}

impl<'a> RouteCommand<'a> {
    /// Creates a new route command handler.
    #[must_use]
    pub const fn new(router: &'a Router, config: Option<&'a RoutingConfig>) -> Self {
        Self { router, config }
    }

    /// Routes the payload to the group named in `args`.
    ///
    /// # Errors
    ///
    /// Returns error if no configuration was given, the input cannot be
    /// read, or routing fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &RouteArgs,
    ) -> Result<(), CliError> {
        let config = self.config.ok_or_else(|| {
            CliError::Config("route needs a routing configuration (--config or HERALD_CONFIG)".into())
        })?;
        let payload = read_payload(args.input.as_deref())?;
        let decision = self.router.route(config, &args.group, &payload)?;
        format.write(out, &decision)
    }
}
