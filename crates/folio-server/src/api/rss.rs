use std::io::Write;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::NaiveTime;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use super::{ApiError, AppState, SiteInfo};
use crate::middleware::RequestId;

const RSS_ITEM_LIMIT: usize = 20;

pub(super) async fn rss_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Response, ApiError> {
    let posts: Vec<_> = state.catalog.published().take(RSS_ITEM_LIMIT).collect();
    match render_rss(&state.site, &posts) {
        Ok(body) => Ok((
            [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
            body,
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "failed to render rss feed");
            Err(ApiError::new(
                req_id.0,
                "internal_error",
                "failed to render feed",
            ))
        }
    }
}

fn absolute(site: &SiteInfo, path: &str) -> String {
    format!("{}{path}", site.url.trim_end_matches('/'))
}

fn text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// RSS 2.0 document for `posts`, which are expected newest first.
pub(crate) fn render_rss(
    site: &SiteInfo,
    posts: &[&folio_core::PostMeta],
) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("rss").with_attributes([("version", "2.0")]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &site.title)?;
    text_element(&mut writer, "link", &absolute(site, "/"))?;
    text_element(&mut writer, "description", &format!("Latest posts from {}", site.title))?;
    if let Some(latest) = posts.first() {
        let built = latest.updated_at.unwrap_or(latest.published_at).max(latest.published_at);
        text_element(
            &mut writer,
            "lastBuildDate",
            &built.and_time(NaiveTime::MIN).and_utc().to_rfc2822(),
        )?;
    }

    for post in posts {
        let link = absolute(site, &post.href());
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &post.title)?;
        text_element(&mut writer, "link", &link)?;
        writer.write_event(Event::Start(
            BytesStart::new("guid").with_attributes([("isPermaLink", "true")]),
        ))?;
        writer.write_event(Event::Text(BytesText::new(&link)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;
        text_element(
            &mut writer,
            "pubDate",
            &post.published_at.and_time(NaiveTime::MIN).and_utc().to_rfc2822(),
        )?;
        if let Some(summary) = &post.summary {
            text_element(&mut writer, "description", summary)?;
        }
        for tag in &post.tags {
            text_element(&mut writer, "category", tag)?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}
