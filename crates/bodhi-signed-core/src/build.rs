use serde::{Deserialize, Serialize};

/// A build submitted to an update, identified by its NVR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: i64,
    pub nvr: String,
    pub release_id: Option<i64>,
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBuild {
    pub nvr: String,
    pub release_id: Option<i64>,
    pub signed: bool,
}

impl NewBuild {
    #[must_use]
    pub fn unsigned(nvr: impl Into<String>, release_id: Option<i64>) -> Self {
        Self {
            nvr: nvr.into(),
            release_id,
            signed: false,
        }
    }
}

/// Compose a name-version-release identifier.
#[must_use]
pub fn compose_nvr(name: &str, version: &str, release: &str) -> String {
    format!("{name}-{version}-{release}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvr_is_dash_joined() {
        assert_eq!(compose_nvr("colord", "1.3.4", "1.fc26"), "colord-1.3.4-1.fc26");
    }

    #[test]
    fn nvr_keeps_dashes_in_name() {
        assert_eq!(
            compose_nvr("python-requests", "2.18.4", "1.fc27"),
            "python-requests-2.18.4-1.fc27"
        );
    }

    #[test]
    fn new_build_starts_unsigned() {
        let build = NewBuild::unsigned("colord-1.3.4-1.fc26", Some(3));
        assert!(!build.signed);
        assert_eq!(build.release_id, Some(3));
    }
}
