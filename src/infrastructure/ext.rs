//! Extension bootstrap
//!
//! Registers the `VOCABULARIES_EXTRA_*` defaults in the host application's
//! config namespace. Values already set by the host are left alone.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::config::{
    DDC_FILE_KEY, DDC_LANG_KEY, DEFAULT_DDC_FILE, DEFAULT_GND_FILE_URL, DEFAULT_GND_OAI_URL,
    DEFAULT_LANG, GND_FILE_URL_KEY, GND_OAI_URL_KEY, MESH_FILE_URL_KEY, MESH_LANG_KEY,
};

pub const EXTENSION_NAME: &str = "invenio-vocabularies-extra";

/// The parts of a host application an extension touches
#[derive(Debug, Default)]
pub struct HostApp {
    pub config: BTreeMap<String, Value>,
    pub extensions: BTreeSet<String>,
}

impl HostApp {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Default config values registered by the extension
pub fn default_config() -> Vec<(&'static str, Value)> {
    vec![
        (DDC_LANG_KEY, Value::from(DEFAULT_LANG)),
        (MESH_LANG_KEY, Value::from(DEFAULT_LANG)),
        (DDC_FILE_KEY, Value::from(DEFAULT_DDC_FILE)),
        (GND_FILE_URL_KEY, Value::from(DEFAULT_GND_FILE_URL)),
        (MESH_FILE_URL_KEY, Value::Null),
        (GND_OAI_URL_KEY, Value::from(DEFAULT_GND_OAI_URL)),
    ]
}

#[derive(Debug, Default)]
pub struct VocabulariesExtra;

impl VocabulariesExtra {
    /// Create the extension, initializing `app` right away when given.
    pub fn new(app: Option<&mut HostApp>) -> Self {
        let ext = Self;
        if let Some(app) = app {
            ext.init_app(app);
        }
        ext
    }

    pub fn init_app(&self, app: &mut HostApp) {
        self.init_config(app);
        app.extensions.insert(EXTENSION_NAME.to_string());
        tracing::debug!("Registered extension {}", EXTENSION_NAME);
    }

    fn init_config(&self, app: &mut HostApp) {
        for (key, value) in default_config() {
            app.config.entry(key.to_string()).or_insert(value);
        }
    }
}
