use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service principal identity the user supplies as a comma-separated triple.
/// Immutable once parsed; every segment is guaranteed non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipalCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CredentialParseError {
    #[error("expected exactly three comma-separated values, found {found}")]
    WrongSegmentCount { found: usize },
}

impl ServicePrincipalCredentials {
    /// Parses `client id,client secret,tenant id`. Empty segments produced by
    /// stray separators are discarded before counting; anything other than
    /// exactly three remaining segments is rejected outright, never a
    /// partial tuple.
    pub fn parse(text: &str) -> Result<Self, CredentialParseError> {
        let segments: Vec<&str> = text.split(',').filter(|segment| !segment.is_empty()).collect();

        match segments.as_slice() {
            [client_id, client_secret, tenant_id] => Ok(Self {
                client_id: (*client_id).to_string(),
                client_secret: (*client_secret).to_string(),
                tenant_id: (*tenant_id).to_string(),
            }),
            _ => Err(CredentialParseError::WrongSegmentCount { found: segments.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialParseError, ServicePrincipalCredentials};

    #[test]
    fn three_segments_map_positionally() {
        let credentials = ServicePrincipalCredentials::parse("abc,def,ghi").expect("parse");

        assert_eq!(credentials.client_id, "abc");
        assert_eq!(credentials.client_secret, "def");
        assert_eq!(credentials.tenant_id, "ghi");
    }

    #[test]
    fn empty_segments_from_stray_separators_are_discarded() {
        let credentials = ServicePrincipalCredentials::parse("abc,,def,ghi,").expect("parse");

        assert_eq!(
            credentials,
            ServicePrincipalCredentials {
                client_id: "abc".to_string(),
                client_secret: "def".to_string(),
                tenant_id: "ghi".to_string(),
            }
        );
    }

    #[test]
    fn segment_contents_are_preserved_verbatim() {
        let credentials = ServicePrincipalCredentials::parse(" abc, d ef,ghi ").expect("parse");

        assert_eq!(credentials.client_id, " abc");
        assert_eq!(credentials.client_secret, " d ef");
        assert_eq!(credentials.tenant_id, "ghi ");
    }

    #[test]
    fn wrong_segment_counts_are_rejected() {
        for (text, found) in
            [("onlyonevalue", 1), ("a,b", 2), ("a,b,c,d", 4), ("", 0), (",,,", 0)]
        {
            let error = ServicePrincipalCredentials::parse(text).expect_err(text);
            assert_eq!(error, CredentialParseError::WrongSegmentCount { found });
        }
    }

    #[test]
    fn serde_round_trip_preserves_tuple() {
        let credentials = ServicePrincipalCredentials::parse("abc,def,ghi").expect("parse");
        let json = serde_json::to_string(&credentials).expect("serialize");
        let restored: ServicePrincipalCredentials =
            serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored, credentials);
    }
}
