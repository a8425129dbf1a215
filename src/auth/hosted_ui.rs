//! URLs for the identity provider's hosted sign-in pages.

use url::Url;

use super::AuthError;

/// Default hosted UI domain.
pub const DEFAULT_COGNITO_DOMAIN: &str = "us-east-1cjfhgfmkc.auth.us-east-1.amazoncognito.com";

/// Default app client id.
pub const DEFAULT_CLIENT_ID: &str = "3hvaqou47k64shd2qmra5211sb";

/// Default redirect target after sign-in and sign-out.
pub const DEFAULT_REDIRECT_URI: &str = "https://d1k8502xw64gvv.cloudfront.net";

/// Hosted UI settings for the implicit (`response_type=token`) flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedUi {
    domain: String,
    client_id: String,
    redirect_uri: String,
}

impl Default for HostedUi {
    fn default() -> Self {
        Self {
            domain: DEFAULT_COGNITO_DOMAIN.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

impl HostedUi {
    /// Creates hosted UI settings.
    ///
    /// `domain` may be given with or without an `https://` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHostedUi`] when a value is blank or the
    /// domain does not form a valid URL.
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let domain = domain.into();
        let domain = domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        let client_id = client_id.into().trim().to_string();
        let redirect_uri = redirect_uri.into().trim().to_string();

        if domain.is_empty() || client_id.is_empty() || redirect_uri.is_empty() {
            return Err(AuthError::InvalidHostedUi(
                "domain, client id and redirect URI must be set".to_string(),
            ));
        }

        let hosted_ui = Self {
            domain,
            client_id,
            redirect_uri,
        };
        hosted_ui.page("login")?;
        Ok(hosted_ui)
    }

    /// Hosted UI domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// App client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// `https://{domain}/login?client_id=..&response_type=token&redirect_uri=..`
    #[must_use]
    pub fn login_url(&self) -> String {
        self.token_flow_url("login")
    }

    /// `https://{domain}/signup?client_id=..&response_type=token&redirect_uri=..`
    #[must_use]
    pub fn signup_url(&self) -> String {
        self.token_flow_url("signup")
    }

    /// `https://{domain}/logout?client_id=..&logout_uri=..`
    #[must_use]
    pub fn logout_url(&self) -> String {
        match self.page("logout") {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("client_id", &self.client_id)
                    .append_pair("logout_uri", &self.redirect_uri);
                url.into()
            }
            Err(_) => String::new(),
        }
    }

    fn token_flow_url(&self, page: &str) -> String {
        match self.page(page) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("client_id", &self.client_id)
                    .append_pair("response_type", "token")
                    .append_pair("redirect_uri", &self.redirect_uri);
                url.into()
            }
            Err(_) => String::new(),
        }
    }

    fn page(&self, page: &str) -> Result<Url, AuthError> {
        let raw = format!("https://{}/{page}", self.domain);
        Url::parse(&raw)
            .map_err(|_| AuthError::InvalidHostedUi(format!("invalid domain: {}", self.domain)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_login_url() {
        let url = HostedUi::default().login_url();
        assert_eq!(
            url,
            "https://us-east-1cjfhgfmkc.auth.us-east-1.amazoncognito.com/login\
             ?client_id=3hvaqou47k64shd2qmra5211sb&response_type=token\
             &redirect_uri=https%3A%2F%2Fd1k8502xw64gvv.cloudfront.net"
        );
    }

    #[test]
    fn test_signup_and_logout_urls() {
        let ui = HostedUi::new("auth.example.com", "client", "https://app.example/cb").unwrap();
        assert_eq!(
            ui.signup_url(),
            "https://auth.example.com/signup?client_id=client&response_type=token\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcb"
        );
        assert_eq!(
            ui.logout_url(),
            "https://auth.example.com/logout?client_id=client\
             &logout_uri=https%3A%2F%2Fapp.example%2Fcb"
        );
    }

    #[test]
    fn test_new_strips_scheme_from_domain() {
        let ui = HostedUi::new("https://auth.example.com/", "c", "https://r").unwrap();
        assert_eq!(ui.domain(), "auth.example.com");
    }

    #[test]
    fn test_new_rejects_blank_values() {
        assert!(HostedUi::new("", "c", "https://r").is_err());
        assert!(HostedUi::new("auth.example.com", " ", "https://r").is_err());
        assert!(HostedUi::new("bad domain with spaces", "c", "https://r").is_err());
    }
}
