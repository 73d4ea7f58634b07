//! Codeforces problem pages: URL recognition and download.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info};

const SITE: &str = "https://codeforces.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";
const TIMEOUT: Duration = Duration::from_secs(20);

/// A problem location in any of the URL shapes the site uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemUrl {
    Contest { contest: String, index: String },
    Problemset { contest: String, index: String },
    Gym { contest: String, index: String },
    Group {
        group: String,
        contest: String,
        index: String,
    },
}

impl FromStr for ProblemUrl {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s).with_context(|| format!("failed to parse URL {s:?}"))?;
        let parts: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        match parts.as_slice() {
            ["contest", contest, "problem", idx, ..] => Ok(ProblemUrl::Contest {
                contest: contest.to_string(),
                index: idx.to_uppercase(),
            }),
            ["problemset", "problem", contest, idx, ..] => Ok(ProblemUrl::Problemset {
                contest: contest.to_string(),
                index: idx.to_uppercase(),
            }),
            ["gym", contest, "problem", idx, ..] => Ok(ProblemUrl::Gym {
                contest: contest.to_string(),
                index: idx.to_uppercase(),
            }),
            ["group", group, "contest", contest, "problem", idx, ..] => Ok(ProblemUrl::Group {
                group: group.to_string(),
                contest: contest.to_string(),
                index: idx.to_uppercase(),
            }),
            ["contest", ..] => bail!("expected /contest/{{id}}/problem/{{index}}"),
            ["problemset", ..] => bail!("expected /problemset/problem/{{id}}/{{index}}"),
            ["gym", ..] => bail!("expected /gym/{{id}}/problem/{{index}}"),
            ["group", ..] => bail!("unsupported group URL structure: {:?}", url.path()),
            [first, ..] => bail!("unsupported URL type: {first:?}"),
            [] => bail!("invalid URL path structure"),
        }
    }
}

impl fmt::Display for ProblemUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemUrl::Contest { contest, index } => {
                write!(f, "{SITE}/contest/{contest}/problem/{index}")
            }
            ProblemUrl::Problemset { contest, index } => {
                write!(f, "{SITE}/problemset/problem/{contest}/{index}")
            }
            ProblemUrl::Gym { contest, index } => write!(f, "{SITE}/gym/{contest}/problem/{index}"),
            ProblemUrl::Group {
                group,
                contest,
                index,
            } => write!(f, "{SITE}/group/{group}/contest/{contest}/problem/{index}"),
        }
    }
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(header::REFERER, HeaderValue::from_static("https://codeforces.com/"));

        let client = Client::builder()
            .cookie_store(true)
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    /// Downloads the problem page. The home page is visited first so the site
    /// hands out its session cookies.
    pub async fn fetch(&self, problem: &ProblemUrl) -> Result<String> {
        self.client
            .get(format!("{SITE}/"))
            .send()
            .await
            .context("failed to fetch homepage")?;
        debug!("session cookies obtained");

        let url = problem.to_string();
        info!(%url, "fetching problem page");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("HTTP request failed")?;

        match resp.status() {
            StatusCode::OK => Ok(resp.text().await?),
            StatusCode::FORBIDDEN => Err(anyhow!(
                "received HTTP 403 Forbidden. The server may block automated access; try again later or through a VPN"
            )),
            status => Err(anyhow!("failed to fetch page, status code: {status}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ProblemUrl {
        s.parse().unwrap()
    }

    #[test]
    fn contest_urls_should_parse() {
        assert_eq!(
            parse("https://codeforces.com/contest/1234/problem/a"),
            ProblemUrl::Contest {
                contest: "1234".into(),
                index: "A".into()
            }
        );
    }

    #[test]
    fn every_shape_round_trips_to_canonical_url() {
        for url in [
            "https://codeforces.com/contest/1900/problem/B",
            "https://codeforces.com/problemset/problem/1900/B1",
            "https://codeforces.com/gym/104114/problem/C",
            "https://codeforces.com/group/AbCdEf/contest/12345/problem/D",
        ] {
            assert_eq!(parse(url).to_string(), url);
        }
    }

    #[test]
    fn trailing_slashes_and_mirrors_are_accepted() {
        assert_eq!(
            parse("https://m1.codeforces.com/gym/100001/problem/e/").to_string(),
            "https://codeforces.com/gym/100001/problem/E"
        );
    }

    #[test]
    fn unsupported_urls_should_fail() {
        for url in [
            "https://codeforces.com/blog/entry/1",
            "https://codeforces.com/contest/1234",
            "https://codeforces.com/problemset/problem/1234",
            "https://codeforces.com/group/x/blog",
            "https://codeforces.com/",
            "not a url",
        ] {
            assert!(url.parse::<ProblemUrl>().is_err(), "{url} should be rejected");
        }
    }
}
