//! Generation settings and output layout.

use std::path::{Path, PathBuf};

use crate::ident::{derive_client_name_from_path, format_identifier};

/// Input file used when none is given.
pub const DEFAULT_INPUT: &str = "abi.json";

/// Output directory used when none is given.
pub const DEFAULT_OUT_DIR: &str = "src";

/// Class name used when nothing else decides it.
pub const DEFAULT_CLIENT_NAME: &str = "Client";

/// Module the generated client imports its runtime from.
pub const DEFAULT_IMPORT_PATH: &str = "@calimero-network/calimero-client";

/// File name of the type declarations document.
pub const TYPES_FILE_NAME: &str = "types.ts";

/// Settings shared by both generated documents.
///
/// The client name is normalized to a legal identifier on construction, so
/// the class name, the client file stem and the types document import all
/// agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    client_name: String,
    import_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            import_path: DEFAULT_IMPORT_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(client_name: impl AsRef<str>) -> Self {
        Self {
            client_name: format_identifier(client_name.as_ref()),
            ..Self::default()
        }
    }

    pub fn with_import_path(mut self, import_path: impl Into<String>) -> Self {
        self.import_path = import_path.into();
        self
    }

    /// Client class name; also the stem of the client file.
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Module specifier for `CalimeroApp` and `Context`.
    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    /// File name of the client document, e.g. `KVStoreClient.ts`.
    pub fn client_file_name(&self) -> String {
        format!("{}.ts", self.client_name)
    }

    /// Module specifier the types document uses to import from the client.
    pub fn client_module_specifier(&self) -> String {
        format!("./{}.js", self.client_name)
    }
}

/// Where the client class name comes from, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNameSource<'a> {
    Explicit(&'a str),
    /// Derived from an arbitrary path, e.g. the compiled `.wasm` file.
    NameFrom(&'a str),
    /// Derived from the manifest input path.
    InputPath(&'a str),
}

impl ClientNameSource<'_> {
    /// Picks the highest-priority source that is present.
    pub fn select<'a>(
        explicit: Option<&'a str>,
        name_from: Option<&'a str>,
        input_path: &'a str,
    ) -> ClientNameSource<'a> {
        match (explicit, name_from) {
            (Some(name), _) => ClientNameSource::Explicit(name),
            (None, Some(path)) => ClientNameSource::NameFrom(path),
            (None, None) => ClientNameSource::InputPath(input_path),
        }
    }

    pub fn resolve(&self) -> String {
        match self {
            ClientNameSource::Explicit(name) => (*name).to_string(),
            ClientNameSource::NameFrom(path) | ClientNameSource::InputPath(path) => {
                derive_client_name_from_path(path)
            }
        }
    }
}

/// Resolves the client name: explicit name, then `name_from`, then input path.
pub fn resolve_client_name(
    explicit: Option<&str>,
    name_from: Option<&str>,
    input_path: &str,
) -> String {
    ClientNameSource::select(explicit, name_from, input_path).resolve()
}

/// Paths of the two documents written for one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub types: PathBuf,
    pub client: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: &Path, config: &ClientConfig) -> Self {
        Self {
            types: out_dir.join(TYPES_FILE_NAME),
            client: out_dir.join(config.client_file_name()),
        }
    }
}
