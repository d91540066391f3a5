//! `gallery-cli`: query and control a running `gallery-server`.
//!
//! Subcommands:
//! - `videos`: print one page of the listing
//! - `reshuffle`: draw a new shuffle order
//! - `stats`: print catalog counters
//! - `collections`: list collections with video counts
//! - `categories`: list keyword categories with video counts

mod server_api;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gallery_types::{CategoryInfo, CollectionInfo, SortOrder, StatsResponse, VideoItem};
use tracing_subscriber::EnvFilter;

use crate::server_api::VideosParams;

#[derive(Parser, Debug)]
#[command(name = "gallery-cli", version)]
struct Args {
    /// Base URL of the gallery server, e.g. http://192.168.1.10:3000
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List one page of videos.
    Videos {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// random, newest, oldest or name
        #[arg(long, default_value = "random")]
        sort: String,
    },
    /// Draw a new shuffle order.
    Reshuffle,
    /// Print catalog counters.
    Stats,
    /// List collections.
    Collections,
    /// List keyword categories.
    Categories,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let server = args.server.as_str();
    match args.command {
        Command::Videos {
            page,
            limit,
            search,
            collection,
            category,
            sort,
        } => {
            let params = VideosParams {
                page,
                limit,
                search,
                collection,
                category,
                sort: SortOrder::parse_lenient(&sort),
            };
            let resp = server_api::list_videos(server, &params)?;
            for video in &resp.videos {
                println!("{}", video_line(video));
            }
            println!(
                "page {} ({} per page), {} total{}",
                resp.page,
                resp.limit,
                resp.total,
                if resp.has_more { ", more available" } else { "" }
            );
        }
        Command::Reshuffle => {
            let resp = server_api::reshuffle(server)?;
            println!("{} ({} videos)", resp.message, resp.total);
        }
        Command::Stats => {
            for line in stats_lines(&server_api::stats(server)?) {
                println!("{line}");
            }
        }
        Command::Collections => {
            for collection in server_api::collections(server)?.collections {
                println!("{}", collection_line(&collection));
            }
        }
        Command::Categories => {
            for category in server_api::categories(server)?.categories {
                println!("{}", category_line(&category));
            }
        }
    }
    Ok(())
}

fn video_line(video: &VideoItem) -> String {
    let mut line = video.title.clone();
    if line.is_empty() {
        line = video.file_name.clone();
    }
    for tag in [video.quality.as_deref(), video.duration.as_deref()].into_iter().flatten() {
        line.push_str(" [");
        line.push_str(tag);
        line.push(']');
    }
    if let Some(name) = video.collection_display_name.as_deref() {
        line.push_str(" - ");
        line.push_str(name);
    }
    format!("{line}  ({})", video.relative_path)
}

fn collection_line(collection: &CollectionInfo) -> String {
    format!(
        "{:<32} {:>5}  {}",
        collection.display_name, collection.video_count, collection.name
    )
}

fn category_line(category: &CategoryInfo) -> String {
    format!(
        "{:<32} {:>5}  {}",
        category.display_name, category.count, category.name
    )
}

fn stats_lines(stats: &StatsResponse) -> Vec<String> {
    vec![
        format!("videos:             {}", stats.total_videos),
        format!("watched dirs:       {}", stats.watched_directory_count),
        format!("pending thumbnails: {}", stats.pending_thumbnail_count),
        format!("pending previews:   {}", stats.pending_preview_count),
        format!("shuffle generation: {}", stats.shuffle_generation),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> VideoItem {
        VideoItem {
            id: "jane_doe/clip-1080p.mp4".to_string(),
            relative_path: "jane_doe/clip-1080p.mp4".to_string(),
            file_name: "clip-1080p.mp4".to_string(),
            collection: Some("jane_doe".to_string()),
            collection_display_name: Some("Jane Doe".to_string()),
            is_root: false,
            title: "Clip".to_string(),
            quality: Some("1080P".to_string()),
            duration: None,
            categories: vec!["general".to_string()],
            video_url: String::new(),
            thumbnail_url: String::new(),
            preview_url: String::new(),
            thumbnail_exists: false,
            preview_exists: false,
        }
    }

    #[test]
    fn video_line_shows_tags_and_collection() {
        assert_eq!(
            video_line(&video()),
            "Clip [1080P] - Jane Doe  (jane_doe/clip-1080p.mp4)"
        );
    }

    #[test]
    fn video_line_falls_back_to_file_name() {
        let mut item = video();
        item.title.clear();
        item.quality = None;
        assert!(video_line(&item).starts_with("clip-1080p.mp4 - Jane Doe"));
    }

    #[test]
    fn args_parse_videos_subcommand() {
        let args = Args::try_parse_from([
            "gallery-cli",
            "--server",
            "http://h:1",
            "videos",
            "--page",
            "3",
            "--sort",
            "name",
        ])
        .unwrap();
        match args.command {
            Command::Videos { page, sort, limit, .. } => {
                assert_eq!(page, 3);
                assert_eq!(limit, 20);
                assert_eq!(sort, "name");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn args_parse_category_filter_and_subcommand() {
        let args =
            Args::try_parse_from(["gallery-cli", "videos", "--category", "travel"]).unwrap();
        match args.command {
            Command::Videos { category, .. } => assert_eq!(category.as_deref(), Some("travel")),
            other => panic!("unexpected command: {other:?}"),
        }
        let args = Args::try_parse_from(["gallery-cli", "categories"]).unwrap();
        assert!(matches!(args.command, Command::Categories));
    }

    #[test]
    fn category_line_aligns_columns() {
        let line = category_line(&CategoryInfo {
            name: "home-video".to_string(),
            display_name: "Home Video".to_string(),
            count: 12,
        });
        assert!(line.starts_with("Home Video "));
        assert!(line.ends_with("   12  home-video"));
    }

    #[test]
    fn stats_lines_cover_every_counter() {
        let lines = stats_lines(&StatsResponse {
            total_videos: 5,
            ..StatsResponse::default()
        });
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with('5'));
    }
}
