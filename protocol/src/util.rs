use {
    crate::ObjectId,
    url::{ParseError, Url, form_urlencoded},
};

/// Strips trailing slashes so that paths can be appended with a single `/`.
#[must_use]
#[inline]
pub fn clean_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[inline]
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, ParseError> {
    Url::parse(&format!("{}/{path}", clean_url(base)))
}

fn escape(component: &str) -> String {
    // Same escaping as a query component, so `+` in an object id becomes `%2B`
    // instead of being read back as a space by the storage service.
    form_urlencoded::byte_serialize(component.as_bytes()).collect()
}

fn storage_url(region: &str, bucket: &str, prefix: &str, id: &ObjectId) -> Result<Url, ParseError> {
    Url::parse(&format!(
        "https://s3-{}.amazonaws.com/{}/{prefix}{}",
        escape(region),
        escape(bucket),
        escape(id.as_str()),
    ))
}

/// Public download location of an encrypted file.
#[inline]
pub fn object_url(region: &str, bucket: &str, id: &ObjectId) -> Result<Url, ParseError> {
    storage_url(region, bucket, "", id)
}

/// Public download location of an encrypted file's metadata.
#[inline]
pub fn metadata_url(region: &str, bucket: &str, id: &ObjectId) -> Result<Url, ParseError> {
    storage_url(region, bucket, "meta/", id)
}
