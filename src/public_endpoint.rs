/// Path prefix every public object URL carries, up to and including the bucket
pub fn object_path_marker(bucket: &str) -> String {
    format!("/storage/v1/object/public/{bucket}/")
}

/// returns the public url a blob stored under `key` is fetched from
///
/// Each `/`-separated segment of the key is percent-encoded on its own.
pub fn public_object_url(base_url: &str, bucket: &str, key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let encoded = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{base}{}{encoded}", object_path_marker(bucket))
}
