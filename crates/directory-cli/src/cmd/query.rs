//! Query commands

use std::path::Path;

use anyhow::{Context as _, Result};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use directory_core::DirectoryEndpoint;
use directory_schema::DeviceAttributes;
use directory_schema::api::{
    AppListing, AppListingView, GetAppDownloadInfoRequest, GetAppListingRequest,
    GetUpdateInfoRequest, ListAppListingsRequest,
};
use serde::Serialize;

use super::context::Context;
use crate::QueryArgs;

/// Paging options of `list`
#[derive(Debug, Clone, Default)]
pub struct PageArgs {
    /// Listings per page
    pub page_size: Option<u32>,
    /// Listings to skip
    pub skip: Option<u32>,
    /// Token from a previous page
    pub page_token: Option<String>,
    /// Use the full view
    pub full: bool,
}

async fn load_device(path: Option<&Path>) -> Result<Option<DeviceAttributes>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let source = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let device = serde_json::from_slice(&source)
        .with_context(|| format!("{} is not a device attributes file", path.display()))?;
    Ok(Some(device))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

fn listing_row(listing: &AppListing) -> Vec<String> {
    let compatibility = listing.compatibility.map_or("-", |c| {
        if c.is_compatible() {
            "compatible"
        } else {
            "incompatible"
        }
    });
    vec![
        listing.app_id.clone(),
        listing.name.clone(),
        listing.language.clone(),
        listing.version_name.clone().unwrap_or_else(|| "-".into()),
        compatibility.to_string(),
        listing
            .download_size
            .map_or_else(|| "-".into(), |s| format_size(s.uncompressed_total)),
    ]
}

const LISTING_HEADER: [&str; 6] = ["App", "Name", "Language", "Version", "Compatibility", "Size"];

/// Show the best listing of one app
pub async fn listing(ctx: &Context, app_id: String, query: &QueryArgs, json: bool) -> Result<()> {
    let service = ctx.service()?;
    let response = service
        .get_app_listing(GetAppListingRequest {
            app_id: Some(app_id),
            release_channel: None,
            device_attributes: load_device(query.device.as_deref()).await?,
            preferred_languages: query.languages.clone(),
            country_code: query.country.clone(),
        })
        .await?;

    if json {
        return print_json(&response);
    }
    let listing = &response.listing;
    println!("{}", listing.name);
    println!("{}", listing.short_description);
    println!("icon: {}", listing.icon.url);
    let mut table = table();
    table.set_header(LISTING_HEADER.to_vec());
    table.add_row(listing_row(listing));
    println!("{table}");
    Ok(())
}

/// Print one page of listings and the token for the next
pub async fn list(ctx: &Context, page: PageArgs, query: &QueryArgs, json: bool) -> Result<()> {
    let service = ctx.service()?;
    let response = service
        .list_app_listings(ListAppListingsRequest {
            page_size: page.page_size,
            skip: page.skip,
            page_token: page.page_token,
            device_attributes: load_device(query.device.as_deref()).await?,
            view: Some(if page.full {
                AppListingView::Full
            } else {
                AppListingView::Basic
            }),
            preferred_languages: query.languages.clone(),
        })
        .await?;

    if json {
        return print_json(&response);
    }
    if response.listings.is_empty() {
        println!("No listings on this page.");
    } else {
        let mut table = table();
        table.set_header(LISTING_HEADER.to_vec());
        for listing in &response.listings {
            table.add_row(listing_row(listing));
        }
        println!("{table}");
    }
    if let Some(token) = &response.next_page_token {
        println!("next page: --page-token {token}");
    }
    Ok(())
}

/// Show the splits a device downloads
pub async fn download_info(
    ctx: &Context,
    app_id: String,
    base_version_code: Option<u32>,
    query: &QueryArgs,
    json: bool,
) -> Result<()> {
    let service = ctx.service()?;
    let response = service
        .get_app_download_info(GetAppDownloadInfoRequest {
            app_id: Some(app_id),
            release_channel: None,
            device_attributes: load_device(query.device.as_deref()).await?,
            base_version_code,
            country_code: query.country.clone(),
        })
        .await?;

    if json {
        return print_json(&response);
    }
    let info = &response.app_download_info;
    let mut table = table();
    table.set_header(vec!["URL", "Size"]);
    for split in &info.split_download_info {
        table.add_row(vec![split.url.clone(), format_size(split.download_size)]);
    }
    println!("{table}");
    println!("total: {} ({} bytes)", format_size(info.download_size), info.download_size);
    Ok(())
}

/// Report whether an update is available
pub async fn update_info(
    ctx: &Context,
    app_id: String,
    base_version_code: u32,
    query: &QueryArgs,
    json: bool,
) -> Result<()> {
    let service = ctx.service()?;
    let response = service
        .get_update_info(GetUpdateInfoRequest {
            app_id: Some(app_id.clone()),
            release_channel: None,
            base_version_code: Some(base_version_code),
            device_attributes: load_device(query.device.as_deref()).await?,
            country_code: query.country.clone(),
        })
        .await?;

    if json {
        return print_json(&response);
    }
    match &response.update_info {
        None => println!("{app_id} is up to date"),
        Some(update) => match update.compatibility {
            Some(c) if !c.is_compatible() => {
                println!("{app_id} has an update, but not for this device");
            }
            _ => println!("{app_id} has an update"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(4_648_720), "4.4 MB");
        assert_eq!(format_size(44_897), "43.8 KB");
    }
}
