// # Route 53 DNS Provider
//
// AWS Route 53 backend for the DDNS system, speaking the REST/XML API
// (version 2013-04-01) directly with SigV4-signed requests.
//
// - The hosted zone id comes from `hosted_zone_id`, or is looked up once by
//   `zone` name via ListHostedZonesByName and cached.
// - Reads use ListResourceRecordSets starting at the record's name and type.
// - Writes use ChangeResourceRecordSets with a single `UPSERT`, so the
//   create and update branches of the reconciler issue the same call.
//
// Route 53 has no proxy concept; only content and TTL are compared.

pub mod sigv4;
mod xml;

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::registry::ProviderRegistry;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};
use reqwest::Method;
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::OnceCell;

use sigv4::{Signer, canonical_query};

/// Route 53 API endpoint (global service)
pub const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Region used for the signing scope when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

const API_VERSION: &str = "2013-04-01";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "route53";

/// Error codes Route 53 returns with 400 that clear on their own
const RETRYABLE_CODES: &[&str] = &["Throttling", "PriorRequestNotComplete"];

/// Route 53 DNS provider
#[derive(Debug)]
pub struct Route53Provider {
    signer: Signer,

    /// Zone name without trailing dot
    zone: String,

    /// Hosted zone id, configured or looked up on first use
    hosted_zone_id: OnceCell<String>,

    endpoint: String,

    client: reqwest::Client,
}

impl Route53Provider {
    pub fn new(signer: Signer, zone: impl Into<String>, hosted_zone_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        let hosted_zone_id = match hosted_zone_id {
            Some(id) => OnceCell::new_with(Some(strip_zone_prefix(&id).to_string())),
            None => OnceCell::new(),
        };

        Self {
            signer,
            zone: normalize_name(&zone.into()),
            hosted_zone_id,
            endpoint: ROUTE53_ENDPOINT.to_string(),
            client,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn host(&self) -> &str {
        let without_scheme = self
            .endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }

    /// Issue one signed request and return the response body
    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        payload: String,
    ) -> Result<String> {
        let query = canonical_query(query);
        let url = if query.is_empty() {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}{}?{}", self.endpoint, path, query)
        };

        let signed = self.signer.sign(
            method.as_str(),
            self.host(),
            path,
            &query,
            &payload,
            chrono::Utc::now(),
        );

        let mut request = self
            .client
            .request(method, &url)
            .header("x-amz-date", signed.amz_date)
            .header("authorization", signed.authorization);
        if !payload.is_empty() {
            request = request.header("content-type", "text/xml").body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transient(format!("{PROVIDER}: HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transient(format!("{PROVIDER}: failed to read response: {e}")))?;

        if status.is_success() {
            return Ok(body);
        }

        let code = xml::first_tag(&body, "Code").unwrap_or_default();
        let message = xml::first_text(&body, "Message").unwrap_or(Cow::Borrowed(body.as_str()));

        if RETRYABLE_CODES.contains(&code) {
            return Err(Error::transient(format!("{PROVIDER}: {code}: {message}")));
        }
        Err(Error::from_status(
            PROVIDER,
            status.as_u16(),
            &format!("{code}: {message}"),
        ))
    }

    async fn zone_id(&self) -> Result<&str> {
        let id = self
            .hosted_zone_id
            .get_or_try_init(|| self.lookup_zone_id())
            .await?;
        Ok(id.as_str())
    }

    async fn lookup_zone_id(&self) -> Result<String> {
        tracing::debug!("Looking up Route 53 hosted zone for {}", self.zone);

        let body = self
            .call(
                Method::GET,
                &format!("/{API_VERSION}/hostedzonesbyname"),
                &[("dnsname", self.zone.as_str()), ("maxitems", "1")],
                String::new(),
            )
            .await?;

        // The listing starts at dnsname; the first zone may be a different one
        let id = xml::tag_values(&body, "HostedZone")
            .into_iter()
            .find(|zone| {
                xml::first_text(zone, "Name").map(|n| normalize_name(&n)).as_deref()
                    == Some(self.zone.as_str())
            })
            .and_then(|zone| xml::first_text(zone, "Id"))
            .map(|id| strip_zone_prefix(&id).to_string())
            .ok_or_else(|| Error::config(format!("Route 53 hosted zone not found: {}", self.zone)))?;

        tracing::debug!("Found hosted zone {} for {}", id, self.zone);
        Ok(id)
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn fetch_record(&self, record: &DnsRecord) -> Result<Option<LiveRecord>> {
        let zone_id = self.zone_id().await?;
        let name = normalize_name(&record.name);

        let body = self
            .call(
                Method::GET,
                &format!("/{API_VERSION}/hostedzone/{zone_id}/rrset"),
                &[
                    ("name", name.as_str()),
                    ("type", record.record_type.as_str()),
                    ("maxitems", "1"),
                ],
                String::new(),
            )
            .await?;

        // Listing starts at (name, type); the first set may belong to another record
        let live = xml::tag_values(&body, "ResourceRecordSet")
            .into_iter()
            .find(|set| {
                xml::first_text(set, "Name").map(|n| normalize_name(&n)).as_deref()
                    == Some(name.as_str())
                    && xml::first_tag(set, "Type") == Some(record.record_type.as_str())
            })
            .map(|set| LiveRecord {
                id: None,
                content: xml::first_text(set, "Value").unwrap_or_default().into_owned(),
                ttl: xml::first_tag(set, "TTL")
                    .and_then(|ttl| ttl.parse().ok())
                    .unwrap_or_default(),
                proxied: None,
            });

        Ok(live)
    }

    async fn write_record(&self, record: &DnsRecord, _existing: Option<&LiveRecord>) -> Result<()> {
        let zone_id = self.zone_id().await?;

        let payload = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<ChangeResourceRecordSetsRequest xmlns="https://route53.amazonaws.com/doc/{version}/">"#,
                "<ChangeBatch><Changes><Change>",
                "<Action>UPSERT</Action>",
                "<ResourceRecordSet>",
                "<Name>{name}</Name><Type>{rtype}</Type><TTL>{ttl}</TTL>",
                "<ResourceRecords><ResourceRecord><Value>{value}</Value></ResourceRecord></ResourceRecords>",
                "</ResourceRecordSet>",
                "</Change></Changes></ChangeBatch>",
                "</ChangeResourceRecordSetsRequest>"
            ),
            version = API_VERSION,
            name = xml::escape(&normalize_name(&record.name)),
            rtype = record.record_type.as_str(),
            ttl = record.ttl,
            value = record.content,
        );

        let body = self
            .call(
                Method::POST,
                &format!("/{API_VERSION}/hostedzone/{zone_id}/rrset/"),
                &[],
                payload,
            )
            .await?;

        if let Some(change_id) = xml::first_tag(&body, "Id") {
            tracing::debug!("Route 53 accepted change {}", change_id);
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Lowercase, without the trailing root dot
fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_lowercase()
}

fn strip_zone_prefix(id: &str) -> &str {
    id.trim_start_matches("/hostedzone/")
}

/// Factory for creating Route 53 providers
pub struct Route53Factory;

impl DnsProviderFactory for Route53Factory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let access_key_id = config.required_setting("access_key_id")?;
        let secret_access_key = config.required_setting("secret_access_key")?;
        let zone = config.required_setting("zone")?;
        let region = config.setting("region").unwrap_or(DEFAULT_REGION);

        let signer = Signer::new(access_key_id, secret_access_key, region, PROVIDER);
        let mut provider = Route53Provider::new(
            signer,
            zone,
            config.setting("hosted_zone_id").map(str::to_string),
        );
        if let Some(endpoint) = config.setting("api_base_url") {
            provider = provider.with_endpoint(endpoint);
        }

        Ok(Box::new(provider))
    }
}

/// Register the Route 53 provider with a registry
pub fn register(registry: &mut ProviderRegistry) {
    registry.register_provider("route53", Box::new(Route53Factory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::config::{RecordConfig, RecordType};
    use ddns_core::reconcile::reconcile;
    use ddns_core::traits::UpdateResult;
    use mockito::Matcher;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    const ZONE_ID: &str = "Z1D633PJN98FT9";

    fn provider(server: &mockito::ServerGuard, hosted_zone_id: Option<&str>) -> Route53Provider {
        Route53Provider::new(
            Signer::new("AKIDEXAMPLE", SECRET, DEFAULT_REGION, PROVIDER),
            "example.com",
            hosted_zone_id.map(str::to_string),
        )
        .with_endpoint(server.url())
    }

    fn desired(name: &str, ip: &str) -> DnsRecord {
        DnsRecord::new(
            &RecordConfig::new(name, RecordType::A).with_ttl(300),
            ip.parse().unwrap(),
        )
    }

    fn rrset_body(name: &str, rtype: &str, ttl: u32, value: &str) -> String {
        format!(
            "<ListResourceRecordSetsResponse><ResourceRecordSets><ResourceRecordSet>\
             <Name>{name}</Name><Type>{rtype}</Type><TTL>{ttl}</TTL>\
             <ResourceRecords><ResourceRecord><Value>{value}</Value></ResourceRecord></ResourceRecords>\
             </ResourceRecordSet></ResourceRecordSets><IsTruncated>false</IsTruncated>\
             <MaxItems>1</MaxItems></ListResourceRecordSetsResponse>"
        )
    }

    const CHANGE_BODY: &str = "<ChangeResourceRecordSetsResponse><ChangeInfo><Id>/change/C2682N5HXP0BZ4</Id>\
         <Status>PENDING</Status></ChangeInfo></ChangeResourceRecordSetsResponse>";

    fn rrset_path() -> String {
        format!("/2013-04-01/hostedzone/{ZONE_ID}/rrset")
    }

    fn rrset_query(name: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), name.into()),
            Matcher::UrlEncoded("type".into(), "A".into()),
            Matcher::UrlEncoded("maxitems".into(), "1".into()),
        ])
    }

    #[test]
    fn test_factory_requires_credentials_and_zone() {
        let config = ProviderConfig::new("route53")
            .with_setting("access_key_id", "AKIDEXAMPLE")
            .with_setting("zone", "example.com");
        assert!(matches!(Route53Factory.create(&config), Err(Error::Config(_))));

        let config = config.with_setting("secret_access_key", SECRET);
        assert!(Route53Factory.create(&config).is_ok());
    }

    #[test]
    fn test_configured_zone_id_prefix_stripped() {
        let provider = Route53Provider::new(
            Signer::new("AKIDEXAMPLE", SECRET, DEFAULT_REGION, PROVIDER),
            "Example.com.",
            Some("/hostedzone/Z1D633PJN98FT9".to_string()),
        );

        assert_eq!(provider.hosted_zone_id.get().map(String::as_str), Some(ZONE_ID));
        assert_eq!(provider.zone, "example.com");
        assert_eq!(provider.host(), "route53.amazonaws.com");
        assert!(!format!("{:?}", provider).contains(SECRET));
    }

    #[tokio::test]
    async fn test_zone_lookup_then_matching_record() {
        let mut server = mockito::Server::new_async().await;
        let zones = server
            .mock("GET", "/2013-04-01/hostedzonesbyname")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("dnsname".into(), "example.com".into()),
                Matcher::UrlEncoded("maxitems".into(), "1".into()),
            ]))
            .with_body(
                "<ListHostedZonesByNameResponse><HostedZones><HostedZone>\
                 <Id>/hostedzone/Z1D633PJN98FT9</Id><Name>example.com.</Name>\
                 </HostedZone></HostedZones></ListHostedZonesByNameResponse>",
            )
            .create_async()
            .await;
        let rrset = server
            .mock("GET", rrset_path().as_str())
            .match_query(rrset_query("home.example.com"))
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/route53/aws4_request, "
                        .to_string(),
                ),
            )
            .match_header("x-amz-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".to_string()))
            .with_body(rrset_body("home.example.com.", "A", 300, "203.0.113.5"))
            .create_async()
            .await;
        let provider = provider(&server, None);

        let outcome = reconcile(&provider, &desired("home.example.com", "203.0.113.5"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateResult::Unchanged);
        zones.assert_async().await;
        rrset.assert_async().await;
    }

    #[tokio::test]
    async fn test_escaped_zone_name_matches() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2013-04-01/hostedzonesbyname")
            .match_query(Matcher::Any)
            .with_body(
                "<ListHostedZonesByNameResponse><HostedZones><HostedZone>\
                 <Id>/hostedzone/Z1D633PJN98FT9</Id><Name>example&#46;com.</Name>\
                 </HostedZone></HostedZones></ListHostedZonesByNameResponse>",
            )
            .create_async()
            .await;
        let rrset = server
            .mock("GET", rrset_path().as_str())
            .match_query(Matcher::Any)
            .with_body(rrset_body("home.example.com.", "A", 300, "203.0.113.5"))
            .create_async()
            .await;
        let provider = provider(&server, None);

        provider
            .fetch_record(&desired("home.example.com", "203.0.113.5"))
            .await
            .unwrap();

        rrset.assert_async().await;
    }

    #[tokio::test]
    async fn test_neighbouring_record_set_counts_as_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", rrset_path().as_str())
            .match_query(rrset_query("home.example.com"))
            .with_body(rrset_body("www.example.com.", "A", 300, "198.51.100.1"))
            .create_async()
            .await;
        let change = server
            .mock("POST", format!("{}/", rrset_path()).as_str())
            .with_body(CHANGE_BODY)
            .create_async()
            .await;
        let provider = provider(&server, Some(ZONE_ID));

        let outcome = reconcile(&provider, &desired("home.example.com", "203.0.113.5"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateResult::Created);
        change.assert_async().await;
    }

    #[tokio::test]
    async fn test_divergent_record_is_upserted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", rrset_path().as_str())
            .match_query(rrset_query("home.example.com"))
            .with_body(rrset_body("home.example.com.", "A", 60, "203.0.113.5"))
            .create_async()
            .await;
        let change = server
            .mock("POST", format!("{}/", rrset_path()).as_str())
            .match_header("content-type", "text/xml")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("<Action>UPSERT</Action>".to_string()),
                Matcher::Regex("<Name>home.example.com</Name>".to_string()),
                Matcher::Regex("<TTL>300</TTL>".to_string()),
                Matcher::Regex("<Value>203.0.113.5</Value>".to_string()),
            ]))
            .with_body(CHANGE_BODY)
            .create_async()
            .await;
        let provider = provider(&server, Some(ZONE_ID));

        let outcome = reconcile(&provider, &desired("home.example.com", "203.0.113.5"))
            .await
            .unwrap();

        assert!(matches!(outcome, UpdateResult::Updated { .. }));
        change.assert_async().await;
    }

    #[tokio::test]
    async fn test_throttling_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", rrset_path().as_str())
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(
                "<ErrorResponse><Error><Type>Sender</Type><Code>Throttling</Code>\
                 <Message>Rate exceeded</Message></Error></ErrorResponse>",
            )
            .create_async()
            .await;
        let provider = provider(&server, Some(ZONE_ID));

        let err = provider
            .fetch_record(&desired("home.example.com", "203.0.113.5"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_signature_mismatch_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", format!("{}/", rrset_path()).as_str())
            .with_status(403)
            .with_body(
                "<ErrorResponse><Error><Code>SignatureDoesNotMatch</Code>\
                 <Message>The request signature we calculated does not match</Message>\
                 </Error></ErrorResponse>",
            )
            .create_async()
            .await;
        let provider = provider(&server, Some(ZONE_ID));

        let err = provider
            .write_record(&desired("home.example.com", "203.0.113.5"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
    }
}
