//! Script rendering over a [`ScriptSource`].
//!
//! Parameterized provisioning scripts (`*.j2`) are rendered with Tera
//! before staging; plain scripts pass through unchanged.

use std::collections::HashMap;

use tera::{Context, Tera};

use crate::assets::{AssetError, ScriptSource};

pub struct ScriptRenderer {
    tera: Tera,
    source: Box<dyn ScriptSource>,
}

impl ScriptRenderer {
    /// Build a renderer by registering every template-suffixed asset from
    /// the source.
    pub fn new(source: Box<dyn ScriptSource>) -> Result<ScriptRenderer, AssetError> {
        let mut tera = Tera::default();
        let mut template_count = 0;

        for name in source.names() {
            if !name.ends_with(".j2") {
                continue;
            }
            let content = source.open(&name)?;
            let text = String::from_utf8_lossy(&content);
            if let Err(e) = tera.add_raw_template(&name, &text) {
                tracing::warn!("[ScriptRenderer] Failed to add template {name}: {e}");
            } else {
                template_count += 1;
                tracing::debug!("[ScriptRenderer] Loaded template: {name}");
            }
        }
        tracing::info!("[ScriptRenderer] Loaded {template_count} script templates");

        Ok(ScriptRenderer { tera, source })
    }

    /// Open a plain (non-templated) script asset.
    pub fn raw(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        self.source.open(name)
    }

    /// Render a templated script with variables.
    pub fn render(
        &self,
        name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Vec<u8>, AssetError> {
        let mut context = Context::new();
        for (key, value) in vars {
            context.insert(key, value);
        }
        let rendered = self.tera.render(name, &context).map_err(|e| AssetError::Render {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
        tracing::debug!(
            "[ScriptRenderer] Rendered {name} ({} bytes)",
            rendered.len()
        );
        Ok(rendered.into_bytes())
    }
}
