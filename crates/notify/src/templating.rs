//! Minijinja template rendering for alert messages.
//!
//! Templates are arbitrary strings taken from config, so a fresh
//! [`minijinja::Environment`] is created per render call.

use crate::traits::SinkError;

/// Message used when no template is configured.
pub const DEFAULT_ALERT_TEMPLATE: &str = "Trip {{ trip_id }} on route {{ route }} (bus {{ bus_id }}) \
is {{ delay_minutes }} min behind its {{ scheduled_departure }} departure: {{ severity | upper }}";

/// Context data available to alert templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertContext {
    pub trip_id: String,
    pub bus_id: String,
    pub route: String,
    /// Severity label, e.g. `"Critical"`.
    pub severity: String,
    pub delay_minutes: u32,
    /// Scheduled departure as given by the catalog.
    pub scheduled_departure: String,
    pub last_known_location: Option<String>,
    /// Evaluation time in ISO 8601 format.
    pub now: String,
}

/// Renders alert messages, falling back to [`DEFAULT_ALERT_TEMPLATE`].
#[derive(Debug, Clone)]
pub struct AlertRenderer {
    template: String,
}

impl AlertRenderer {
    /// Build a renderer. An invalid template is rejected up front.
    pub fn new(template: Option<&str>) -> Result<Self, SinkError> {
        let template = template.unwrap_or(DEFAULT_ALERT_TEMPLATE).to_string();
        Self::validate(&template)?;
        Ok(Self { template })
    }

    /// Like [`AlertRenderer::new`], but logs and uses the default template on error.
    pub fn or_default(template: Option<&str>) -> Self {
        match Self::new(template) {
            Ok(renderer) => renderer,
            Err(e) => {
                tracing::warn!(error = %e, "invalid alert template, using default");
                Self::default()
            }
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn build_env() -> minijinja::Environment<'static> {
        minijinja::Environment::new()
    }

    /// Render the configured template with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Template`] if rendering fails.
    pub fn render(&self, ctx: &AlertContext) -> Result<String, SinkError> {
        let env = Self::build_env();
        env.render_str(&self.template, ctx)
            .map_err(|e| SinkError::Template(e.to_string()))
    }

    /// Check that a template string parses without evaluating it.
    pub fn validate(template_str: &str) -> Result<(), SinkError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| SinkError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for AlertRenderer {
    fn default() -> Self {
        Self {
            template: DEFAULT_ALERT_TEMPLATE.to_string(),
        }
    }
}
