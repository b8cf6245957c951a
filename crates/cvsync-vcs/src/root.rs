//! CVSROOT parsing.

use crate::error::{Result, VcsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the client reaches the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMethod {
    /// Repository on a local filesystem.
    Local,
    /// Password server.
    Pserver,
    /// Remote shell (`CVS_RSH`).
    Ext,
    /// Built-in ssh.
    Ssh,
    /// Local repository through a forked server.
    Fork,
    /// Any other method, passed through verbatim.
    Other(String),
}

impl AccessMethod {
    fn parse(method: &str) -> Self {
        match method.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "pserver" => Self::Pserver,
            "ext" => Self::Ext,
            "ssh" | "extssh" => Self::Ssh,
            "fork" => Self::Fork,
            _ => Self::Other(method.to_string()),
        }
    }

    /// Whether the repository is reached over the network.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        !matches!(self, Self::Local | Self::Fork)
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Pserver => write!(f, "pserver"),
            Self::Ext => write!(f, "ext"),
            Self::Ssh => write!(f, "ssh"),
            Self::Fork => write!(f, "fork"),
            Self::Other(m) => write!(f, "{m}"),
        }
    }
}

/// A parsed CVSROOT.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvsRoot {
    /// Access method.
    pub method: AccessMethod,
    /// User name.
    pub user: Option<String>,
    /// Inline password (pserver only).
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Host name for remote methods.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// Repository path on the server.
    pub path: String,
}

impl CvsRoot {
    /// Parse a CVSROOT string.
    ///
    /// Accepts `:method:[user[:password]@]host[:port][:]/path`, the implicit
    /// ext form `[user@]host:/path`, and bare local paths.
    ///
    /// # Errors
    /// Returns [`VcsError::InvalidRoot`] when the string cannot be parsed.
    pub fn parse(root: &str) -> Result<Self> {
        let trimmed = root.trim();
        let invalid = |reason: &str| VcsError::InvalidRoot {
            root: root.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty root"));
        }

        if let Some(rest) = trimmed.strip_prefix(':') {
            let (method, rest) = rest
                .split_once(':')
                .ok_or_else(|| invalid("missing ':' after access method"))?;
            let method = AccessMethod::parse(method);
            if !method.is_remote() {
                if rest.is_empty() {
                    return Err(invalid("missing repository path"));
                }
                return Ok(Self::local_with(method, rest));
            }
            return Self::parse_remote(method, rest).ok_or_else(|| invalid("expected [user@]host[:port]:/path"));
        }

        if trimmed.starts_with('/') || !trimmed.contains(':') {
            return Ok(Self::local_with(AccessMethod::Local, trimmed));
        }

        // Windows drive letters are local paths.
        let bytes = trimmed.as_bytes();
        if bytes.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
            return Ok(Self::local_with(AccessMethod::Local, trimmed));
        }

        Self::parse_remote(AccessMethod::Ext, trimmed)
            .ok_or_else(|| invalid("expected [user@]host:/path"))
    }

    fn local_with(method: AccessMethod, path: &str) -> Self {
        Self {
            method,
            user: None,
            password: None,
            host: None,
            port: None,
            path: path.to_string(),
        }
    }

    fn parse_remote(method: AccessMethod, rest: &str) -> Option<Self> {
        let (userinfo, hostpart) = match rest.rsplit_once('@') {
            Some((u, h)) => (Some(u), h),
            None => (None, rest),
        };
        let (user, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((u, p)) => (Some(u.to_string()), Some(p.to_string())),
                None => (Some(info.to_string()), None),
            },
            None => (None, None),
        };

        let slash = hostpart.find('/')?;
        let (hostport, path) = hostpart.split_at(slash);
        let hostport = hostport.trim_end_matches(':');
        let (host, port) = match hostport.split_once(':') {
            Some((h, p)) if p.is_empty() => (h, None),
            Some((h, p)) => (h, Some(p.parse::<u16>().ok()?)),
            None => (hostport, None),
        };
        if host.is_empty() {
            return None;
        }

        Some(Self {
            method,
            user: user.filter(|u| !u.is_empty()),
            password,
            host: Some(host.to_string()),
            port,
            path: path.to_string(),
        })
    }

    /// Whether logging in with a password applies.
    #[must_use]
    pub const fn uses_password(&self) -> bool {
        matches!(self.method, AccessMethod::Pserver)
    }

    /// The root without any inline password, safe for logs.
    #[must_use]
    pub fn redacted(&self) -> String {
        let mut copy = self.clone();
        copy.password = None;
        copy.to_string()
    }
}

impl fmt::Display for CvsRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}:", self.method)?;
        if let Some(host) = &self.host {
            if let Some(user) = &self.user {
                write!(f, "{user}")?;
                if let Some(password) = &self.password {
                    write!(f, ":{password}")?;
                }
                write!(f, "@")?;
            }
            write!(f, "{host}")?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
            write!(f, ":")?;
        }
        write!(f, "{}", self.path)
    }
}

impl std::str::FromStr for CvsRoot {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
