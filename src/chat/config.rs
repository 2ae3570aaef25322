//! Configuration types for the tutor chat.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved configuration the session runs with.
//! Values given on the command line override values from the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::resolve_documents;

/// Command-line arguments for the tutor-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Project the conversation belongs to.
    #[arrrg(optional, "Project to study (required here or in --config)", "PROJECT")]
    pub project: Option<String>,

    /// Document the tutor is opened on.
    #[arrrg(optional, "Document id the tutor is opened on", "DOC_ID")]
    pub document: Option<String>,

    /// Display name of that document.
    #[arrrg(optional, "Display name of the document", "NAME")]
    pub document_name: Option<String>,

    /// Topic label for the conversation.
    #[arrrg(optional, "Topic being studied", "TOPIC")]
    pub topic: Option<String>,

    /// Comma-separated document ids; takes precedence over --document.
    #[arrrg(optional, "Comma-separated document ids to answer from", "IDS")]
    pub documents: Option<String>,

    #[arrrg(optional, "Backend base URL (default: $TUTOR_API_URL)", "URL")]
    pub base_url: Option<String>,

    #[arrrg(optional, "Directory holding the settings and token files", "DIR")]
    pub settings_dir: Option<String>,

    #[arrrg(optional, "Request timeout in seconds (default: 300)", "SECONDS")]
    pub timeout: Option<u64>,

    /// YAML file providing defaults for the options above.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log request lifecycle to stderr.
    #[arrrg(flag, "Verbose logging to stderr")]
    pub verbose: bool,
}

/// The on-disk shape of a configuration file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfigFile {
    pub project_id: Option<String>,
    pub document_id: Option<String>,
    pub document_name: Option<String>,
    pub topic: Option<String>,
    pub selected_documents: Vec<String>,
    pub base_url: Option<String>,
    pub settings_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub no_color: bool,
}

/// Configuration for a tutor session.
///
/// This struct holds the resolved values after merging the configuration
/// file and command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Project the conversation belongs to.
    pub project_id: String,

    /// Document the tutor is opened on, if any.
    pub document_id: Option<String>,

    /// Display name of the document, used in the greeting and instructions.
    pub document_name: Option<String>,

    /// Topic label, used in the instructions.
    pub topic: Option<String>,

    /// Explicit document selection. When non-empty it wins over `document_id`.
    pub selected_documents: Vec<String>,

    /// Backend base URL. `None` defers to the environment.
    pub base_url: Option<String>,

    /// Settings directory. `None` uses the default location.
    pub settings_dir: Option<PathBuf>,

    /// Request timeout. `None` uses the client default.
    pub timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether debug logging was requested.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a configuration for `project_id` with default values.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            document_id: None,
            document_name: None,
            topic: None,
            selected_documents: Vec::new(),
            base_url: None,
            settings_dir: None,
            timeout: None,
            use_color: true,
            verbose: false,
        }
    }

    /// Loads a configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        let file: ChatConfigFile = serde_yaml::from_str(&content)?;
        Ok(Self::from(file))
    }

    /// Resolves arguments into a validated configuration, reading the file
    /// named by `--config` first.
    pub fn load(args: ChatArgs) -> Result<Self> {
        let config = match args.config.as_deref() {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields with the values present in `args`.
    pub fn merge_args(mut self, args: ChatArgs) -> Self {
        if let Some(project) = args.project {
            self.project_id = project;
        }
        if let Some(document) = args.document {
            self.document_id = Some(document);
        }
        if let Some(name) = args.document_name {
            self.document_name = Some(name);
        }
        if let Some(topic) = args.topic {
            self.topic = Some(topic);
        }
        if let Some(documents) = args.documents {
            self.selected_documents = parse_document_list(&documents);
        }
        if let Some(url) = args.base_url {
            self.base_url = Some(url);
        }
        if let Some(dir) = args.settings_dir {
            self.settings_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = args.timeout {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if args.no_color {
            self.use_color = false;
        }
        self.verbose |= args.verbose;
        self
    }

    /// Checks that the configuration can start a session.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(Error::validation(
                "a project is required (--project or project_id in the config file)",
                Some("project".to_string()),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(Error::validation(
                "timeout must be positive",
                Some("timeout".to_string()),
            ));
        }
        Ok(())
    }

    /// The document ids sent with every request.
    pub fn documents(&self) -> Vec<String> {
        resolve_documents(&self.selected_documents, self.document_id.as_deref())
    }

    /// Sets the document the tutor is opened on.
    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Sets the document display name.
    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = Some(name.into());
        self
    }

    /// Sets the topic label.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Sets the explicit document selection.
    pub fn with_selected_documents(mut self, documents: Vec<String>) -> Self {
        self.selected_documents = documents;
        self
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the settings directory.
    pub fn with_settings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings_dir = Some(dir.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables debug logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl From<ChatConfigFile> for ChatConfig {
    fn from(file: ChatConfigFile) -> Self {
        ChatConfig {
            project_id: file.project_id.unwrap_or_default(),
            document_id: file.document_id,
            document_name: file.document_name,
            topic: file.topic,
            selected_documents: file.selected_documents,
            base_url: file.base_url,
            settings_dir: file.settings_dir,
            timeout: file.timeout_secs.map(Duration::from_secs),
            use_color: !file.no_color,
            verbose: false,
        }
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig::default().merge_args(args)
    }
}

/// Splits a comma-separated id list, dropping blanks.
fn parse_document_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
