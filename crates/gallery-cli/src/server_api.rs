use anyhow::{Context, Result};
use gallery_types::{
    CategoriesResponse, CollectionsResponse, ReshuffleResponse, SortOrder, StatsResponse,
    VideosResponse,
};
use serde::de::DeserializeOwned;

/// Parameters for `GET /api/videos`.
#[derive(Clone, Debug, Default)]
pub(crate) struct VideosParams {
    pub(crate) page: usize,
    pub(crate) limit: usize,
    pub(crate) search: Option<String>,
    pub(crate) collection: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) sort: SortOrder,
}

pub(crate) fn videos_url(server: &str, params: &VideosParams) -> String {
    let mut url = format!(
        "{}/api/videos?page={}&limit={}&sort={}",
        server.trim_end_matches('/'),
        params.page,
        params.limit,
        sort_param(params.sort),
    );
    if let Some(search) = params.search.as_deref() {
        url.push_str("&search=");
        url.push_str(&urlencoding::encode(search));
    }
    if let Some(collection) = params.collection.as_deref() {
        url.push_str("&collection=");
        url.push_str(&urlencoding::encode(collection));
    }
    if let Some(category) = params.category.as_deref() {
        url.push_str("&category=");
        url.push_str(&urlencoding::encode(category));
    }
    url
}

pub(crate) fn list_videos(server: &str, params: &VideosParams) -> Result<VideosResponse> {
    let url = videos_url(server, params);
    tracing::debug!(url = %url, "GET videos");
    read_json(ureq::get(&url).call().context("request /api/videos")?, "api/videos")
}

pub(crate) fn reshuffle(server: &str) -> Result<ReshuffleResponse> {
    let url = format!("{}/api/reshuffle", server.trim_end_matches('/'));
    let resp = ureq::post(&url)
        .send_empty()
        .context("request /api/reshuffle")?;
    if !resp.status().is_success() {
        return Err(anyhow::anyhow!("reshuffle failed with {}", resp.status()));
    }
    read_json(resp, "api/reshuffle")
}

pub(crate) fn stats(server: &str) -> Result<StatsResponse> {
    let url = format!("{}/api/stats", server.trim_end_matches('/'));
    read_json(ureq::get(&url).call().context("request /api/stats")?, "api/stats")
}

pub(crate) fn collections(server: &str) -> Result<CollectionsResponse> {
    let url = format!("{}/api/collections", server.trim_end_matches('/'));
    read_json(
        ureq::get(&url).call().context("request /api/collections")?,
        "api/collections",
    )
}

pub(crate) fn categories(server: &str) -> Result<CategoriesResponse> {
    let url = format!("{}/api/categories", server.trim_end_matches('/'));
    read_json(
        ureq::get(&url).call().context("request /api/categories")?,
        "api/categories",
    )
}

fn sort_param(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Random => "random",
        SortOrder::Newest => "newest",
        SortOrder::Oldest => "oldest",
        SortOrder::Name => "name",
    }
}

fn read_json<T: DeserializeOwned>(
    mut resp: ureq::http::Response<ureq::Body>,
    label: &str,
) -> Result<T> {
    let body = resp
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read /{label} response body"))?;
    serde_json::from_str(&body).with_context(|| format!("decode /{label} response"))
}
