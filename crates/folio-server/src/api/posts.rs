use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use folio_core::{ArchiveEntry, Page, PostMeta, PostQuery, PostSort, TagCount};
use folio_engagement::{DailyCount, PostStats};
use serde::{Deserialize, Serialize};

use super::{post_not_found, store_unavailable, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

const RELATED_LIMIT: usize = 3;
const DEFAULT_DAILY_DAYS: u32 = 90;

#[derive(Debug, Deserialize)]
pub(super) struct ListPostsQuery {
    pub tag: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub year: Option<i32>,
    pub sort: Option<PostSort>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub featured: Option<bool>,
}

impl From<ListPostsQuery> for PostQuery {
    fn from(query: ListPostsQuery) -> Self {
        PostQuery {
            tag: query.tag,
            category: query.category,
            q: query.q,
            year: query.year,
            include_drafts: false,
            featured_only: query.featured.unwrap_or(false),
            sort: query.sort.unwrap_or_default(),
            page: query.page,
            per_page: query.per_page,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PostSummary {
    #[serde(flatten)]
    pub post: PostMeta,
    pub views: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct SidebarData {
    pub tags: Vec<TagCount>,
    pub categories: Vec<String>,
    pub archive: Vec<ArchiveEntry>,
}

#[derive(Debug, Serialize)]
pub(super) struct PostDetail {
    pub post: PostMeta,
    pub stats: PostStats,
    pub related: Vec<PostMeta>,
    pub older: Option<PostMeta>,
    pub newer: Option<PostMeta>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DailyQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct DailyViews {
    pub slug: String,
    pub days: Vec<DailyCount>,
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<ApiResponse<Page<PostSummary>>>, ApiError> {
    let query = PostQuery::from(query);

    // Popularity ordering needs every count up front; otherwise only the
    // page being returned is looked up.
    let popularity = if query.sort == PostSort::Popular {
        let slugs: Vec<String> = state
            .catalog
            .published()
            .map(|p| p.slug.clone())
            .collect();
        Some(state.engagement.get_views_for_slugs(&slugs).await)
    } else {
        None
    };

    let page = state.catalog.query(&query, popularity.as_ref());
    let views: HashMap<String, u64> = match popularity {
        Some(views) => views,
        None => {
            let slugs: Vec<String> = page.items.iter().map(|p| p.slug.clone()).collect();
            state.engagement.get_views_for_slugs(&slugs).await
        }
    };

    let items = page
        .items
        .into_iter()
        .map(|post| PostSummary {
            views: views.get(&post.slug).copied().unwrap_or(0),
            post,
        })
        .collect();

    Ok(ApiResponse::new(
        req_id.0,
        Page {
            items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
        },
    ))
}

pub(super) async fn sidebar(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SidebarData>> {
    ApiResponse::new(
        req_id.0,
        SidebarData {
            tags: state.catalog.tag_counts(),
            categories: state.catalog.categories(),
            archive: state.catalog.archive(),
        },
    )
}

pub(super) async fn get_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    let Some(post) = state.catalog.get(&slug) else {
        return Err(post_not_found(req_id.0, &slug));
    };

    let stats = state.engagement.get_post_stats(&slug).await;
    let (older, newer) = state.catalog.adjacent(&slug);

    Ok(ApiResponse::new(
        req_id.0,
        PostDetail {
            post: post.clone(),
            stats,
            related: state
                .catalog
                .related(&slug, RELATED_LIMIT)
                .into_iter()
                .cloned()
                .collect(),
            older: older.cloned(),
            newer: newer.cloned(),
        },
    ))
}

pub(super) async fn post_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PostStats>>, ApiError> {
    if !state.catalog.contains(&slug) {
        return Err(post_not_found(req_id.0, &slug));
    }
    let stats = state.engagement.get_post_stats(&slug).await;
    Ok(ApiResponse::new(req_id.0, stats))
}

pub(super) async fn daily_views(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<ApiResponse<DailyViews>>, ApiError> {
    if !state.catalog.contains(&slug) {
        return Err(post_not_found(req_id.0, &slug));
    }

    let days = query.days.unwrap_or(DEFAULT_DAILY_DAYS);
    let Some(counts) = state.engagement.daily_views(&slug, days).await else {
        return Err(store_unavailable(req_id.0));
    };

    Ok(ApiResponse::new(req_id.0, DailyViews { slug, days: counts }))
}
