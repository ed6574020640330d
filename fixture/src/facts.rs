use std::fmt;

/// How to reach one provisioned instance.
///
/// Obtained from a [`Provider`](crate::Provider) and never mutated
/// afterwards; a restarted ephemeral instance yields a fresh value.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionFacts {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String
}

// Keeps the password out of logs.
impl fmt::Debug for ConnectionFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFacts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Display for ConnectionFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}
