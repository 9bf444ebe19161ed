use crate::error::FetchError;
use crate::options::Cli;
use std::error::Error;
use std::future::Future;
use url::Url;

/// Reports are always requested for the mobile form factor.
pub const STRATEGY: &str = "mobile";

/// The report categories requested for every URL.
pub const CATEGORIES: [&str; 4] = ["performance", "accessibility", "best-practices", "seo"];

/// Builds the HTTP client based on the provided CLI options.
///
/// No request timeout is configured; a request takes as long as the
/// transport allows.
pub fn build_client(options: &Cli) -> Result<reqwest::Client, Box<dyn Error>> {
    Ok(reqwest::Client::builder()
        .user_agent(options.user_agent.as_str())
        .build()?)
}

/// One target URL paired with the API credential used to request its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    url: String,
    api_key: String,
}

impl ReportRequest {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        ReportRequest {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Renders the request against `endpoint`, percent-encoding the target URL.
    ///
    /// ```rust
    /// use pagescore::network::ReportRequest;
    /// use url::Url;
    ///
    /// let endpoint = Url::parse("https://psi.test/run").unwrap();
    /// let request = ReportRequest::new("https://a.test/?q=1", "secret");
    /// assert_eq!(
    ///     request.endpoint_url(&endpoint).as_str(),
    ///     "https://psi.test/run?url=https%3A%2F%2Fa.test%2F%3Fq%3D1&strategy=mobile\
    ///      &category=performance&category=accessibility&category=best-practices\
    ///      &category=seo&key=secret"
    /// );
    /// ```
    pub fn endpoint_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("url", &self.url);
            query.append_pair("strategy", STRATEGY);
            for category in CATEGORIES {
                query.append_pair("category", category);
            }
            query.append_pair("key", &self.api_key);
        }
        url
    }
}

/// Something that returns the raw report body for a URL.
///
/// [`PageSpeedClient`] is the production implementation; tests substitute
/// their own to count or fail calls.
pub trait ReportSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Requests reports from the PageSpeed Insights API.
#[derive(Debug, Clone)]
pub struct PageSpeedClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl PageSpeedClient {
    pub fn new(client: reqwest::Client, endpoint: Url, api_key: impl Into<String>) -> Self {
        PageSpeedClient {
            client,
            endpoint,
            api_key: api_key.into(),
        }
    }
}

impl ReportSource for PageSpeedClient {
    /// Sends a GET request for the report of `url` and returns the body.
    ///
    /// # Errors
    ///
    /// - The request fails (e.g., connection issues).
    /// - The response status is not successful (e.g., 4xx for an invalid key).
    /// - The response body cannot be read.
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request = ReportRequest::new(url, self.api_key.as_str());
        let body = self
            .client
            .get(request.endpoint_url(&self.endpoint))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}
