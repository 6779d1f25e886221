//! Connection descriptor
//!
//! Pure value object describing how the bridge reaches the office process
//! (named pipe or TCP socket) plus the process-startup flags. The identity
//! must be unique per concurrently running bridge on the same machine;
//! random pipe names satisfy that by default.

use std::collections::HashMap;

/// Default executable name; resolution through PATH is left to the OS
pub const DEFAULT_SOFFICE_PATH: &str = "soffice";

/// Transport identity of the office connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectIdentity {
    /// Named pipe (local connections)
    Pipe { name: String },
    /// TCP socket
    Socket { host: String, port: u16 },
}

impl ConnectIdentity {
    /// A pipe with a random hex name, collision-safe across concurrent
    /// instances on the same machine
    pub fn random_pipe() -> Self {
        ConnectIdentity::Pipe {
            name: format!("uno{}", uuid::Uuid::new_v4().simple()),
        }
    }

    /// The client-side connect string for this identity
    pub fn connect_string(&self) -> String {
        match self {
            ConnectIdentity::Pipe { name } => format!("pipe,name={name}"),
            ConnectIdentity::Socket { host, port } => format!("socket,host={host},port={port}"),
        }
    }

    /// The string the office's `--accept` switch listens on
    ///
    /// The socket variant adds `tcpNoDelay=1`; small URP packets must not
    /// wait on Nagle coalescing.
    pub fn accept_string(&self) -> String {
        match self {
            ConnectIdentity::Pipe { name } => format!("pipe,name={name}"),
            ConnectIdentity::Socket { host, port } => {
                format!("socket,host={host},port={port},tcpNoDelay=1")
            }
        }
    }
}

impl Default for ConnectIdentity {
    fn default() -> Self {
        Self::random_pipe()
    }
}

/// How to reach the office process plus how to start it
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    /// Pipe or socket identity; unique per concurrently live bridge
    pub identity: ConnectIdentity,

    /// Path to the office executable
    pub soffice_path: String,

    /// Suppress document recovery on start
    pub no_restore: bool,

    /// Skip the first-start wizard
    pub no_first_start_wizard: bool,

    /// Suppress the splash screen
    pub no_logo: bool,

    /// Start without visible windows
    pub invisible: bool,

    /// Full headless mode (no GUI toolkit at all)
    pub headless: bool,

    /// Append `StarOffice.Service`, letting the office relaunch itself as a
    /// background service
    pub start_as_service: bool,

    /// Spawn the office process on connect; false attaches to one already
    /// listening on the identity
    pub start_office: bool,

    /// Extra environment variables for the spawned process
    pub env_overrides: HashMap<String, String>,
}

impl Default for ConnectionDescriptor {
    fn default() -> Self {
        Self {
            identity: ConnectIdentity::default(),
            soffice_path: DEFAULT_SOFFICE_PATH.to_string(),
            no_restore: true,
            no_first_start_wizard: true,
            no_logo: true,
            invisible: true,
            headless: false,
            start_as_service: false,
            start_office: true,
            env_overrides: HashMap::new(),
        }
    }
}

impl ConnectionDescriptor {
    /// The client-side connect string (`pipe,name=<id>` or
    /// `socket,host=<h>,port=<p>`)
    pub fn connect_string(&self) -> String {
        self.identity.connect_string()
    }

    /// The full `--accept=...` switch for the office command line
    pub fn accept_arg(&self) -> String {
        format!("--accept={};urp;", self.identity.accept_string())
    }

    /// Append the boolean startup flags as CLI switches, each independently
    /// gated, in a fixed order
    pub fn update_startup_args(&self, args: &mut Vec<String>) {
        if self.no_restore {
            args.push("--norestore".to_string());
        }
        if self.invisible {
            args.push("--invisible".to_string());
        }
        if self.no_first_start_wizard {
            args.push("--nofirststartwizard".to_string());
        }
        if self.no_logo {
            args.push("--nologo".to_string());
        }
        if self.headless {
            args.push("--headless".to_string());
        }
    }

    /// The complete argv for spawning the office process
    ///
    /// `profile_url` is the `file://` URI of the isolated user profile; when
    /// given it is passed via `-env:UserInstallation=`.
    pub fn spawn_args(&self, profile_url: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();
        self.update_startup_args(&mut args);

        if let Some(url) = profile_url {
            args.push(format!("-env:UserInstallation={url}"));
        }

        args.push(self.accept_arg());

        if self.start_as_service {
            args.push("StarOffice.Service".to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_flags_fixed_order() {
        let descriptor = ConnectionDescriptor {
            headless: true,
            ..ConnectionDescriptor::default()
        };

        let mut args = Vec::new();
        descriptor.update_startup_args(&mut args);
        assert_eq!(
            args,
            vec![
                "--norestore",
                "--invisible",
                "--nofirststartwizard",
                "--nologo",
                "--headless",
            ]
        );
    }

    #[test]
    fn test_startup_flags_independently_gated() {
        let descriptor = ConnectionDescriptor {
            no_restore: false,
            invisible: false,
            no_first_start_wizard: true,
            no_logo: false,
            headless: false,
            ..ConnectionDescriptor::default()
        };

        let mut args = Vec::new();
        descriptor.update_startup_args(&mut args);
        assert_eq!(args, vec!["--nofirststartwizard"]);

        let none = ConnectionDescriptor {
            no_restore: false,
            invisible: false,
            no_first_start_wizard: false,
            no_logo: false,
            headless: false,
            ..ConnectionDescriptor::default()
        };
        let mut args = Vec::new();
        none.update_startup_args(&mut args);
        assert!(args.is_empty());
    }

    #[test]
    fn test_pipe_connect_strings() {
        let identity = ConnectIdentity::Pipe {
            name: "office1".to_string(),
        };
        assert_eq!(identity.connect_string(), "pipe,name=office1");
        assert_eq!(identity.accept_string(), "pipe,name=office1");
    }

    #[test]
    fn test_socket_connect_strings() {
        let identity = ConnectIdentity::Socket {
            host: "localhost".to_string(),
            port: 2002,
        };
        assert_eq!(identity.connect_string(), "socket,host=localhost,port=2002");
        assert_eq!(
            identity.accept_string(),
            "socket,host=localhost,port=2002,tcpNoDelay=1"
        );
    }

    #[test]
    fn test_random_pipe_names_are_unique() {
        let a = ConnectIdentity::random_pipe();
        let b = ConnectIdentity::random_pipe();
        assert_ne!(a, b);
    }

    #[test]
    fn test_spawn_args_full_command_line() {
        let descriptor = ConnectionDescriptor {
            identity: ConnectIdentity::Pipe {
                name: "abc123".to_string(),
            },
            headless: true,
            start_as_service: true,
            ..ConnectionDescriptor::default()
        };

        let args = descriptor.spawn_args(Some("file:///tmp/uno-session-x/user"));
        assert_eq!(
            args,
            vec![
                "--norestore",
                "--invisible",
                "--nofirststartwizard",
                "--nologo",
                "--headless",
                "-env:UserInstallation=file:///tmp/uno-session-x/user",
                "--accept=pipe,name=abc123;urp;",
                "StarOffice.Service",
            ]
        );
    }

    #[test]
    fn test_spawn_args_socket_without_profile() {
        let descriptor = ConnectionDescriptor {
            identity: ConnectIdentity::Socket {
                host: "127.0.0.1".to_string(),
                port: 8100,
            },
            ..ConnectionDescriptor::default()
        };

        let args = descriptor.spawn_args(None);
        assert!(args.contains(
            &"--accept=socket,host=127.0.0.1,port=8100,tcpNoDelay=1;urp;".to_string()
        ));
        assert!(!args.iter().any(|arg| arg.starts_with("-env:")));
    }
}
