// ── Query parsing / validation ───────────────────────────────────────────────

use percent_encoding::percent_decode_str;
use url::Url;
use weft_storage_core::error::{Result, StorageError};
use weft_storage_core::provider::QueryValidation;

use crate::sftp::types::DEFAULT_PORT;

pub const SCHEME: &str = "sftp";

/// Parsed form of an `sftp://host[:port]/path` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpQuery {
    pub host: String,
    /// Port as written in the query; absent when the query relied on the
    /// default.
    pub port: Option<u16>,
    /// Absolute remote path. May still contain `{wildcard}` placeholders.
    pub path: String,
}

impl SftpQuery {
    pub fn parse(query: &str) -> Result<Self> {
        let invalid = |reason: String| StorageError::InvalidQuery {
            query: query.to_string(),
            reason,
        };

        let url = Url::parse(query).map_err(|e| invalid(format!("unparseable URI: {}", e)))?;
        if url.scheme() != SCHEME {
            return Err(invalid(format!(
                "scheme is not '{}://'",
                SCHEME
            )));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        // The url crate percent-encodes wildcard braces; decode so
        // `{sample}` placeholders survive a parse round-trip.
        let path = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|e| invalid(format!("path is not valid UTF-8: {}", e)))?
            .into_owned();
        if path.is_empty() {
            return Err(invalid(
                "missing path to a file or directory".to_string(),
            ));
        }

        Ok(Self {
            host,
            port: url.port(),
            path,
        })
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// `host[:port]`, the port included only when the query named one.
    /// Keys the engine's rate limiter.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Relative staging path for the local materialisation, unique across
    /// hosts serving the same remote path.
    pub fn local_suffix(&self) -> String {
        format!("{}{}", self.authority(), self.path)
    }
}

/// Syntactic validation; wildcard placeholders in the path are accepted.
pub fn validate(query: &str) -> QueryValidation {
    match SftpQuery::parse(query) {
        Ok(_) => QueryValidation::valid(),
        Err(StorageError::InvalidQuery { reason, .. }) => QueryValidation::invalid(reason),
        Err(other) => QueryValidation::invalid(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_query() {
        let q = SftpQuery::parse("sftp://example.com/data/a.txt").unwrap();
        assert_eq!(q.host, "example.com");
        assert_eq!(q.port, None);
        assert_eq!(q.port_or_default(), 22);
        assert_eq!(q.path, "/data/a.txt");
    }

    #[test]
    fn test_parse_explicit_port() {
        let q = SftpQuery::parse("sftp://example.com:2222/a.txt").unwrap();
        assert_eq!(q.port, Some(2222));
        assert_eq!(q.port_or_default(), 2222);
    }

    #[test]
    fn test_wildcard_path_survives_parsing() {
        let q = SftpQuery::parse("sftp://example.com/data/{sample}/run-{n}.txt").unwrap();
        assert_eq!(q.path, "/data/{sample}/run-{n}.txt");
    }

    #[test]
    fn test_invalid_queries_carry_reasons() {
        for query in [
            "example.com/data/a.txt",
            "http://example.com/a.txt",
            "sftp://example.com",
            "sftp:///data/a.txt",
        ] {
            let v = validate(query);
            assert!(!v.valid, "{} should be invalid", query);
            assert!(!v.reason.clone().unwrap_or_default().is_empty());
        }
    }

    #[test]
    fn test_valid_queries() {
        for query in [
            "sftp://example.com/a.txt",
            "sftp://example.com:22/a.txt",
            "sftp://example.com/{sample}.txt",
        ] {
            assert!(validate(query).valid, "{} should be valid", query);
        }
    }

    #[test]
    fn test_authority_includes_port_only_when_written() {
        let with_port = SftpQuery::parse("sftp://h:2222/p").unwrap();
        assert_eq!(with_port.authority(), "h:2222");
        let without = SftpQuery::parse("sftp://h/p").unwrap();
        assert_eq!(without.authority(), "h");
    }

    #[test]
    fn test_local_suffix_disambiguates_hosts() {
        let a = SftpQuery::parse("sftp://a.example.com/data/x").unwrap();
        let b = SftpQuery::parse("sftp://b.example.com/data/x").unwrap();
        assert_ne!(a.local_suffix(), b.local_suffix());
        assert_eq!(a.local_suffix(), "a.example.com/data/x");

        let c = SftpQuery::parse("sftp://a.example.com:2222/data/x").unwrap();
        assert_eq!(c.local_suffix(), "a.example.com:2222/data/x");
    }
}
