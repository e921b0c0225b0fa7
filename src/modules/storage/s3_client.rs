//! S3-compatible implementation of [`ObjectStorageClient`]
//!
//! Object uploads, listings and bucket creation go through the rust-s3 crate.
//! Bulk deletes and bucket HEAD checks are not exposed by rust-s3, so those
//! are sent with reqwest and signed with AWS Signature v4.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, Method, Response, Url};
use s3::bucket_ops::CannedBucketAcl;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::error::{Result, StorageError};
use crate::modules::storage::client::ObjectStorageClient;
use crate::modules::storage::signer::{CanonicalParts, SigV4Signer};
use crate::shared::types::{Acl, S3Credentials, Scheme};

/// Maximum number of keys S3 accepts in one DeleteObjects request
const MAX_DELETE_KEYS: usize = 1000;

lazy_static! {
    static ref DELETE_ERROR_REGEX: Regex =
        Regex::new(r"(?s)<Error>.*?<Key>(.*?)</Key>.*?<Code>(.*?)</Code>.*?</Error>").unwrap();
}

/// Object storage client for AWS S3, MinIO, or any S3-compatible service
pub struct S3ObjectClient {
    credentials: Credentials,
    /// Base endpoint URL without trailing slash
    endpoint: String,
    region_name: String,
    scheme: Scheme,
    /// Custom endpoints use path-style addressing (http://endpoint/bucket)
    path_style: bool,
    signer: SigV4Signer,
    /// HTTP client for requests rust-s3 does not cover
    http_client: Client,
}

impl S3ObjectClient {
    /// Create a new client from attachment credentials
    pub fn new(config: &S3Credentials) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.key),
            Some(&config.secret),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Auth(format!("Failed to create S3 credentials: {}", e)))?;

        let http_client = Client::builder()
            .build()
            .map_err(|e| StorageError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = config.endpoint_url();
        debug!(
            "S3 client initialized for endpoint: {}, region: {}",
            endpoint, config.region
        );

        Ok(Self {
            credentials,
            endpoint,
            region_name: config.region.clone(),
            scheme: config.scheme,
            path_style: config.endpoint.is_some(),
            signer: SigV4Signer::new(&config.key, &config.secret, &config.region),
            http_client,
        })
    }

    fn region(&self, region_name: &str) -> Region {
        Region::Custom {
            region: region_name.to_string(),
            endpoint: self.endpoint.clone(),
        }
    }

    /// Region used when creating a bucket. On AWS a known region name maps to
    /// its named variant, so `us-east-1` is sent without a location constraint.
    fn bucket_region(&self, region_name: &str) -> Region {
        if !self.path_style {
            if let Ok(region) = region_name.parse::<Region>() {
                if !matches!(region, Region::Custom { .. }) {
                    return region;
                }
            }
        }
        self.region(region_name)
    }

    /// rust-s3 handle for a bucket
    fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let mut bucket = Bucket::new(
            name,
            self.region(&self.region_name),
            self.credentials.clone(),
        )?;
        if self.path_style {
            bucket.set_path_style();
        }
        Ok(bucket)
    }

    /// Send a request against `/{bucket}[?subresource]`, signed with SigV4
    async fn send_signed(
        &self,
        method: Method,
        bucket: &str,
        subresource: Option<&str>,
        body: Vec<u8>,
        extra_headers: &[(&str, String)],
    ) -> Result<Response> {
        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| StorageError::Config(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| StorageError::Config("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let canonical_uri = format!(
            "{}/{}",
            endpoint_url.path().trim_end_matches('/'),
            urlencoding::encode(bucket)
        );
        let canonical_query = subresource.map(|s| format!("{}=", s)).unwrap_or_default();
        let url = match subresource {
            Some(s) => format!("{}/{}?{}", self.endpoint, bucket, s),
            None => format!("{}/{}", self.endpoint, bucket),
        };

        let headers = self.signer.sign(
            &CanonicalParts {
                method: method.as_str(),
                uri: &canonical_uri,
                query: &canonical_query,
                host: &host_header,
                payload: &body,
                extra_headers,
            },
            Utc::now(),
        )?;

        debug!("{} {}", method, url);

        let mut request = self.http_client.request(method, &url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    /// One DeleteObjects request for at most `MAX_DELETE_KEYS` keys
    async fn delete_chunk(&self, bucket: &str, keys: &[String]) -> Result<()> {
        let body = delete_request_body(keys).into_bytes();
        let checksum = BASE64.encode(Sha256::digest(&body));
        let extra = [
            ("content-type", "application/xml".to_string()),
            ("x-amz-checksum-sha256", checksum),
            ("x-amz-sdk-checksum-algorithm", "SHA256".to_string()),
        ];

        let response = self
            .send_signed(Method::POST, bucket, Some("delete"), body, &extra)
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StorageError::from_status(
                status.as_u16(),
                format!("Failed to delete objects from '{}': {}", bucket, text),
            ));
        }

        let failures = parse_delete_errors(&text);
        if !failures.is_empty() {
            warn!(
                "Bulk delete in bucket '{}' failed for {} key(s)",
                bucket,
                failures.len()
            );
            let summary = failures
                .iter()
                .map(|(key, code)| format!("{} ({})", key, code))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(StorageError::Internal(format!(
                "Failed to delete objects from '{}': {}",
                bucket, summary
            )));
        }

        debug!("Deleted {} object(s) from bucket '{}'", keys.len(), bucket);
        Ok(())
    }
}

#[async_trait]
impl ObjectStorageClient for S3ObjectClient {
    fn get_object_url(&self, bucket: &str, key: &str) -> String {
        let key = encode_key(key);
        if self.path_style || bucket.contains('.') {
            format!("{}/{}/{}", self.endpoint, bucket, key)
        } else {
            format!(
                "{}://{}.s3.{}.amazonaws.com/{}",
                self.scheme.as_str(),
                bucket,
                self.region_name,
                key
            )
        }
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        for chunk in keys.chunks(MAX_DELETE_KEYS) {
            self.delete_chunk(bucket, chunk).await?;
        }
        Ok(())
    }

    async fn delete_matching_objects(&self, bucket: &str, prefix: &str) -> Result<usize> {
        let results = self.bucket(bucket)?.list(prefix.to_string(), None).await?;
        let keys: Vec<String> = results
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect();

        debug!(
            "Found {} object(s) under '{}' in bucket '{}'",
            keys.len(),
            prefix,
            bucket
        );
        self.delete_objects(bucket, &keys).await?;
        Ok(keys.len())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        acl: Acl,
        content_type: Option<&str>,
    ) -> Result<()> {
        let data = tokio::fs::read(source).await?;
        let content_type = content_type.unwrap_or_else(|| content_type_for(source));

        let mut handle = self.bucket(bucket)?;
        handle.add_header("x-amz-acl", acl.as_str());

        let response = handle
            .put_object_with_content_type(key, &data, content_type)
            .await?;
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::from_status(
                status,
                format!(
                    "Failed to upload file '{}': {}",
                    key,
                    String::from_utf8_lossy(response.bytes())
                ),
            ));
        }

        debug!(
            "Uploaded '{}' to '{}/{}' ({} bytes, {})",
            source.display(),
            bucket,
            key,
            data.len(),
            content_type
        );
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str, accept_forbidden: bool) -> Result<bool> {
        let response = self
            .send_signed(Method::HEAD, bucket, None, Vec::new(), &[])
            .await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(true),
            404 => Ok(false),
            403 if accept_forbidden => {
                debug!("Bucket '{}' exists but is not accessible", bucket);
                Ok(true)
            }
            code => Err(StorageError::from_status(
                code,
                format!("Failed to check bucket '{}'", bucket),
            )),
        }
    }

    async fn create_bucket(&self, bucket: &str, acl: Acl, region: &str) -> Result<()> {
        let config = BucketConfiguration::new(
            Some(canned_bucket_acl(acl)),
            false,
            None,
            None,
            None,
            None,
            None,
            None,
        );
        let region = self.bucket_region(region);

        let response = if self.path_style {
            Bucket::create_with_path_style(bucket, region, self.credentials.clone(), config)
                .await?
        } else {
            Bucket::create(bucket, region, self.credentials.clone(), config).await?
        };

        if response.success() {
            info!("Bucket '{}' created successfully", bucket);
            return Ok(());
        }

        // Bucket already exists - this is fine
        if response.response_text.contains("BucketAlreadyOwnedByYou") {
            debug!("Bucket '{}' already exists", bucket);
            return Ok(());
        }

        Err(StorageError::from_status(
            response.response_code,
            format!(
                "Failed to create bucket '{}': {}",
                bucket, response.response_text
            ),
        ))
    }
}

fn canned_bucket_acl(acl: Acl) -> CannedBucketAcl {
    match acl {
        Acl::Private => CannedBucketAcl::Private,
        Acl::PublicRead => CannedBucketAcl::PublicRead,
        Acl::PublicReadWrite => CannedBucketAcl::PublicReadWrite,
        Acl::AuthenticatedRead => CannedBucketAcl::AuthenticatedRead,
        Acl::BucketOwnerRead | Acl::BucketOwnerFullControl => {
            CannedBucketAcl::Custom(acl.as_str().to_string())
        }
    }
}

/// URL-encode each path segment of an object key, keeping the slashes
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Quiet-mode DeleteObjects body: only failures are reported back
fn delete_request_body(keys: &[String]) -> String {
    let objects: String = keys
        .iter()
        .map(|key| format!("<Object><Key>{}</Key></Object>", xml_escape(key)))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Delete><Quiet>true</Quiet>{}</Delete>",
        objects
    )
}

/// (key, error code) pairs from a DeleteObjects response
fn parse_delete_errors(body: &str) -> Vec<(String, String)> {
    DELETE_ERROR_REGEX
        .captures_iter(body)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    /// Request as received by [`serve`]
    struct Captured {
        head: String,
        body: Vec<u8>,
    }

    impl Captured {
        fn request_line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }

        fn header(&self, name: &str) -> Option<&str> {
            self.head.lines().skip(1).find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case(name)
                    .then(|| value.trim())
            })
        }

        fn body_text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> Captured {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < head_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request body");
            buf.extend_from_slice(&chunk[..n]);
        }

        Captured {
            head,
            body: buf[head_end..head_end + length].to_vec(),
        }
    }

    /// Local HTTP endpoint answering each connection with the next
    /// `(status, body)` pair and recording the requests it saw
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Captured>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                captured.push(read_request(&mut socket).await);
                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            captured
        });

        (endpoint, handle)
    }

    fn client(endpoint: Option<&str>) -> S3ObjectClient {
        S3ObjectClient::new(&S3Credentials {
            key: "AKIDEXAMPLE".to_string(),
            secret: "secret".to_string(),
            region: "eu-west-1".to_string(),
            scheme: Scheme::Https,
            endpoint: endpoint.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_object_url_virtual_host_style_for_aws() {
        let client = client(None);
        assert_eq!(
            client.get_object_url("photos", "photos/thumb/42.jpg"),
            "https://photos.s3.eu-west-1.amazonaws.com/photos/thumb/42.jpg"
        );
    }

    #[test]
    fn test_object_url_path_style_for_custom_endpoint() {
        let client = client(Some("http://localhost:9000"));
        assert_eq!(
            client.get_object_url("photos", "users/my cat.jpg"),
            "http://localhost:9000/photos/users/my%20cat.jpg"
        );
    }

    #[test]
    fn test_dotted_bucket_uses_path_style() {
        let client = client(None);
        assert_eq!(
            client.get_object_url("my.photos", "a.jpg"),
            "https://s3.eu-west-1.amazonaws.com/my.photos/a.jpg"
        );
    }

    #[test]
    fn test_delete_request_body_escapes_keys() {
        let body = delete_request_body(&["a&b.jpg".to_string(), "<c>.png".to_string()]);
        assert_eq!(
            body,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Delete><Quiet>true</Quiet>\
             <Object><Key>a&amp;b.jpg</Key></Object>\
             <Object><Key>&lt;c&gt;.png</Key></Object></Delete>"
        );
    }

    #[test]
    fn test_parse_delete_errors() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult>
  <Error>
    <Key>photos/thumb/42.jpg</Key>
    <Code>AccessDenied</Code>
    <Message>Access Denied</Message>
  </Error>
</DeleteResult>"#;
        assert_eq!(
            parse_delete_errors(body),
            vec![(
                "photos/thumb/42.jpg".to_string(),
                "AccessDenied".to_string()
            )]
        );
        assert!(parse_delete_errors("<DeleteResult></DeleteResult>").is_empty());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("/tmp/a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("/tmp/a.png")), "image/png");
        assert_eq!(
            content_type_for(Path::new("/tmp/phpA1B2")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_us_east_1_bucket_on_aws_has_no_location_constraint() {
        let client = client(None);

        let mut config = BucketConfiguration::private();
        config.set_region(client.bucket_region("us-east-1"));
        assert_eq!(config.location_constraint_payload(), None);

        let mut config = BucketConfiguration::private();
        config.set_region(client.bucket_region("eu-west-1"));
        assert!(config
            .location_constraint_payload()
            .unwrap()
            .contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
    }

    #[test]
    fn test_custom_endpoint_bucket_region_keeps_endpoint() {
        let client = client(Some("http://localhost:9000"));
        assert!(matches!(
            client.bucket_region("us-east-1"),
            Region::Custom { ref region, ref endpoint }
                if region == "us-east-1" && endpoint == "http://localhost:9000"
        ));
    }

    #[test]
    fn test_canned_bucket_acl_keeps_every_acl() {
        for acl in [
            Acl::Private,
            Acl::PublicRead,
            Acl::PublicReadWrite,
            Acl::AuthenticatedRead,
            Acl::BucketOwnerRead,
            Acl::BucketOwnerFullControl,
        ] {
            assert_eq!(canned_bucket_acl(acl).to_string(), acl.as_str());
        }
    }

    #[tokio::test]
    async fn test_create_bucket_sends_descriptor_acl() {
        let (endpoint, server) = serve(vec![(200, ""), (200, "")]).await;
        let client = client(Some(&endpoint));

        assert_ok!(
            client
                .create_bucket("photos", Acl::PublicRead, "eu-west-1")
                .await
        );
        assert_ok!(
            client
                .create_bucket("archive", Acl::BucketOwnerFullControl, "eu-west-1")
                .await
        );

        let requests = server.await.unwrap();
        assert!(requests[0].request_line().starts_with("PUT /photos"));
        assert_eq!(requests[0].header("x-amz-acl"), Some("public-read"));
        assert!(requests[0]
            .body_text()
            .contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
        assert_eq!(
            requests[1].header("x-amz-acl"),
            Some("bucket-owner-full-control")
        );
    }

    #[tokio::test]
    async fn test_create_bucket_tolerates_already_owned_bucket() {
        let body = "<Error><Code>BucketAlreadyOwnedByYou</Code></Error>";
        let (endpoint, server) = serve(vec![(409, body), (403, "<Error/>")]).await;
        let client = client(Some(&endpoint));

        assert_ok!(client.create_bucket("photos", Acl::Private, "eu-west-1").await);
        assert!(matches!(
            client.create_bucket("photos", Acl::Private, "eu-west-1").await,
            Err(StorageError::Forbidden(_))
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_bucket_exists_status_mapping() {
        let (endpoint, server) =
            serve(vec![(200, ""), (404, ""), (403, ""), (403, ""), (500, "")]).await;
        let client = client(Some(&endpoint));

        assert!(client.bucket_exists("photos", true).await.unwrap());
        assert!(!client.bucket_exists("photos", true).await.unwrap());
        assert!(client.bucket_exists("photos", true).await.unwrap());
        assert!(matches!(
            client.bucket_exists("photos", false).await,
            Err(StorageError::Forbidden(_))
        ));
        assert!(matches!(
            client.bucket_exists("photos", true).await,
            Err(StorageError::Internal(_))
        ));

        let requests = server.await.unwrap();
        assert!(requests[0].request_line().starts_with("HEAD /photos "));
        assert!(requests[0]
            .header("authorization")
            .unwrap()
            .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    }

    #[tokio::test]
    async fn test_put_object_sends_acl_and_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("phpA1B2");
        std::fs::write(&temp, b"png bytes").unwrap();

        let (endpoint, server) = serve(vec![(200, ""), (200, "")]).await;
        let client = client(Some(&endpoint));

        assert_ok!(
            client
                .put_object(
                    "photos",
                    "photos/thumb/42.png",
                    &temp,
                    Acl::PublicRead,
                    Some("image/png")
                )
                .await
        );
        assert_ok!(
            client
                .put_object("photos", "photos/original/42", &temp, Acl::Private, None)
                .await
        );

        let requests = server.await.unwrap();
        assert!(requests[0]
            .request_line()
            .starts_with("PUT /photos/photos/thumb/42.png"));
        assert_eq!(requests[0].header("x-amz-acl"), Some("public-read"));
        assert_eq!(requests[0].header("content-type"), Some("image/png"));
        assert_eq!(requests[0].body, b"png bytes");

        assert_eq!(requests[1].header("x-amz-acl"), Some("private"));
        assert_eq!(
            requests[1].header("content-type"),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn test_put_object_rejection_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("a.jpg");
        std::fs::write(&temp, b"jpeg bytes").unwrap();

        let (endpoint, server) = serve(vec![(403, "<Error><Code>AccessDenied</Code></Error>")]).await;
        let client = client(Some(&endpoint));

        assert!(matches!(
            client
                .put_object("photos", "a.jpg", &temp, Acl::PublicRead, None)
                .await,
            Err(StorageError::Forbidden(_))
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_objects_posts_one_bulk_request() {
        let (endpoint, server) = serve(vec![(200, "<DeleteResult></DeleteResult>")]).await;
        let client = client(Some(&endpoint));
        let keys = vec![
            "photos/original/42.jpg".to_string(),
            "photos/thumb/42.jpg".to_string(),
        ];

        assert_ok!(client.delete_objects("photos", &keys).await);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].request_line().starts_with("POST /photos?delete "));
        assert_eq!(requests[0].body_text(), delete_request_body(&keys));
        assert!(requests[0].header("x-amz-checksum-sha256").is_some());
    }

    #[tokio::test]
    async fn test_delete_objects_failures_surface() {
        let partial = "<DeleteResult><Error><Key>photos/thumb/42.jpg</Key>\
                       <Code>AccessDenied</Code></Error></DeleteResult>";
        let (endpoint, server) = serve(vec![(500, "<Error/>"), (200, partial)]).await;
        let client = client(Some(&endpoint));
        let keys = vec!["photos/thumb/42.jpg".to_string()];

        assert!(matches!(
            client.delete_objects("photos", &keys).await,
            Err(StorageError::Internal(_))
        ));
        let err = assert_err!(client.delete_objects("photos", &keys).await);
        assert!(err.to_string().contains("AccessDenied"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_truncated_delete_response_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            // Promise more bytes than are sent, then hang up
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 500\r\n\r\n<DeleteResult>")
                .await
                .unwrap();
            let _ = socket.shutdown().await;
        });
        let client = client(Some(&endpoint));

        assert!(matches!(
            client
                .delete_objects("photos", &["photos/thumb/42.jpg".to_string()])
                .await,
            Err(StorageError::Network(_))
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_matching_objects_lists_then_deletes() {
        let listing = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
            <ListBucketResult><Name>photos</Name><Prefix>photos/thumb</Prefix>\
            <IsTruncated>false</IsTruncated>\
            <Contents><Key>photos/thumb/41.jpg</Key>\
            <LastModified>2024-01-02T03:04:05.000Z</LastModified><Size>10</Size></Contents>\
            <Contents><Key>photos/thumb/42.jpg</Key>\
            <LastModified>2024-01-02T03:04:05.000Z</LastModified><Size>12</Size></Contents>\
            </ListBucketResult>";
        let (endpoint, server) = serve(vec![(200, listing), (200, "<DeleteResult/>")]).await;
        let client = client(Some(&endpoint));

        let deleted = client
            .delete_matching_objects("photos", "photos/thumb")
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let requests = server.await.unwrap();
        assert!(requests[0].request_line().starts_with("GET /photos"));
        assert!(requests[1].request_line().starts_with("POST /photos?delete "));
        assert_eq!(
            requests[1].body_text(),
            delete_request_body(&[
                "photos/thumb/41.jpg".to_string(),
                "photos/thumb/42.jpg".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_delete_objects_with_no_keys_sends_nothing() {
        // Unreachable endpoint: any request would fail
        let client = client(Some("http://127.0.0.1:1"));
        assert!(client.delete_objects("photos", &[]).await.is_ok());
    }
}
