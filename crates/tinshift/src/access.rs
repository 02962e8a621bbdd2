//! Locating and opening the SQLite container behind a mesh.

use std::io::Write;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tempfile::NamedTempFile;

use crate::config::OpenOptions;
use crate::error::{Error, Result};

/// An open container and whatever backs it.
///
/// Fields drop in declaration order, so the connection is closed before any
/// temporary backing file is removed.
#[derive(Debug)]
pub(crate) struct Container {
    pub(crate) conn: Connection,
    backing: Option<NamedTempFile>,
    access: AccessPath,
}

impl Container {
    pub(crate) fn access(&self) -> AccessPath {
        self.access
    }

    /// Temporary file holding a materialised container, if any.
    pub(crate) fn backing_path(&self) -> Option<&Path> {
        self.backing.as_ref().map(NamedTempFile::path)
    }
}

/// Ways a location can be resolved, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    Local,
    Embedded,
    Network,
}

/// Outcome of one access path.
enum Attempt {
    Opened(Container),
    /// Not found or unsupported: the next path may try.
    Declined(String),
}

impl AccessPath {
    const ORDER: [Self; 3] = [Self::Local, Self::Embedded, Self::Network];

    fn name(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Embedded => "embedded",
            Self::Network => "network",
        }
    }

    fn try_open(self, location: &str, options: &OpenOptions) -> Result<Attempt> {
        match self {
            Self::Local => open_local(location),
            Self::Embedded => open_embedded(location, options),
            Self::Network => open_network(location, options),
        }
    }
}

/// Open `location` through the first access path that recognises it.
pub(crate) fn open_container(location: &str, options: &OpenOptions) -> Result<Container> {
    let mut reasons = Vec::new();
    for path in AccessPath::ORDER {
        match path.try_open(location, options)? {
            Attempt::Opened(container) => {
                tracing::debug!(location, access = path.name(), "opened mesh container");
                return Ok(container);
            }
            Attempt::Declined(reason) => {
                tracing::trace!(location, access = path.name(), %reason, "access path declined");
                reasons.push(format!("{}: {reason}", path.name()));
            }
        }
    }
    Err(Error::Open {
        location: location.to_string(),
        reason: reasons.join("; "),
    })
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn connect(path: &Path, location: &str) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| Error::Open {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

fn open_local(location: &str) -> Result<Attempt> {
    if is_url(location) {
        return Ok(Attempt::Declined("not a filesystem path".into()));
    }
    let path = Path::new(location);
    if !path.is_file() {
        return Ok(Attempt::Declined("no such file".into()));
    }
    Ok(Attempt::Opened(Container {
        conn: connect(path, location)?,
        backing: None,
        access: AccessPath::Local,
    }))
}

fn open_embedded(location: &str, options: &OpenOptions) -> Result<Attempt> {
    let Some(bytes) = options.resource(location) else {
        return Ok(Attempt::Declined("no such resource".into()));
    };
    let container = materialize(bytes, location, AccessPath::Embedded)?;
    Ok(Attempt::Opened(container))
}

#[cfg(feature = "network")]
fn open_network(location: &str, options: &OpenOptions) -> Result<Attempt> {
    if !is_url(location) {
        return Ok(Attempt::Declined("not a URL".into()));
    }
    if !options.network_enabled() {
        return Ok(Attempt::Declined("network access disabled".into()));
    }

    let fail = |reason: String| Error::Open {
        location: location.to_string(),
        reason,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(options.network_timeout())
        .build()
        .map_err(|e| fail(e.to_string()))?;
    let response = client
        .get(location)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| fail(e.to_string()))?;
    let bytes = response.bytes().map_err(|e| fail(e.to_string()))?;
    tracing::debug!(location, len = bytes.len(), "fetched mesh container");

    let container = materialize(&bytes, location, AccessPath::Network)?;
    Ok(Attempt::Opened(container))
}

#[cfg(not(feature = "network"))]
#[allow(clippy::unnecessary_wraps)]
fn open_network(location: &str, _options: &OpenOptions) -> Result<Attempt> {
    if !is_url(location) {
        return Ok(Attempt::Declined("not a URL".into()));
    }
    Ok(Attempt::Declined("built without network support".into()))
}

/// Copy an in-memory container into a private temporary file and open it.
fn materialize(bytes: &[u8], location: &str, access: AccessPath) -> Result<Container> {
    let fail = |e: std::io::Error| Error::Open {
        location: location.to_string(),
        reason: e.to_string(),
    };
    let mut file = tempfile::Builder::new()
        .prefix("tinshift-")
        .suffix(".gpkg")
        .tempfile()
        .map_err(fail)?;
    file.write_all(bytes).map_err(fail)?;
    file.flush().map_err(fail)?;

    let conn = connect(file.path(), location)?;
    Ok(Container {
        conn,
        backing: Some(file),
        access,
    })
}
