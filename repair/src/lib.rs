//! # Batch media maintenance
//!
//! Two explicitly-invoked passes over the product table. Neither ever runs
//! on the read path; the server only normalizes in memory.
//!
//! ## `images`
//!
//! Re-resolves every stored image reference with the same normalizer the
//! API uses, verifies that the public identifier still exists on the CDN
//! and substitutes the configured fallback placeholder when it does not.
//! Dry run by default: nothing is written without `--apply`, and when it
//! is, all rewrites happen in a single transaction so a failure partway
//! through leaves no mix of old and new references.
//!
//! ## `sync-media`
//!
//! Uploads local image files to the CDN's upload folder and points every
//! product whose stored reference names that file at the returned
//! `secure_url`. Products already on the CDN are left alone unless
//! `--overwrite` is given. Uploads are per-file; a failed upload is
//! reported and skipped rather than aborting the run.

use std::{env, fs, path::Path};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use media::{CDN_HOST, CdnClient, CdnConfig, ImageRef};
use sqlx::{PgPool, postgres::PgPoolOptions};

const UPLOAD_FOLDER: &str = "productos";

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "svg"];

pub struct RepairConfig {
    pub database_url: String,
    pub cdn: CdnConfig,
}

impl RepairConfig {
    pub fn load() -> Self {
        Self {
            database_url: require("DATABASE_URL"),
            cdn: CdnConfig {
                cloud_name: require("CLOUDINARY_CLOUD_NAME"),
                api_key: require("CLOUDINARY_API_KEY"),
                api_secret: require("CLOUDINARY_API_SECRET"),
                fallback_url: env::var("CLOUDINARY_FALLBACK_URL").unwrap_or_else(|_| {
                    "https://res.cloudinary.com/demo/image/upload/productos/fallback.webp".into()
                }),
            },
        }
    }
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} not set"))
}

struct Change {
    id: i32,
    name: String,
    old: String,
    new: String,
}

pub async fn repair_images(apply: bool) -> Result<()> {
    let config = RepairConfig::load();
    let db = connect(&config.database_url).await?;
    let cdn = CdnClient::new(config.cdn.clone());

    let products: Vec<(i32, String, Option<String>)> =
        sqlx::query_as("SELECT id, name, image FROM products ORDER BY id")
            .fetch_all(&db)
            .await?;

    println!("Analyzing image references of {} products...\n", products.len());

    let pb = progress_bar(products.len() as u64);

    let mut changes = Vec::new();
    let mut invalid = 0;

    for (id, name, image) in &products {
        pb.set_message(name.clone());

        let image_ref = ImageRef::parse(image.as_deref());
        if image_ref == ImageRef::Empty {
            pb.inc(1);
            continue;
        }

        let Some(mut resolved) = image_ref.resolve(&config.cdn.cloud_name) else {
            println!("Product {id} ({name}) has an unresolvable reference: {image:?}");
            invalid += 1;
            pb.inc(1);
            continue;
        };

        // fall back when the asset is gone from the CDN; plain absolute
        // URLs outside the CDN have nothing to verify
        if let Some(public_id) = image_ref.public_id() {
            if !cdn.resource_exists(&public_id).await? {
                println!("Product {id} ({name}): {public_id} is missing on the CDN");
                resolved = config.cdn.fallback_url.clone();
            }
        }

        let old = image.clone().unwrap_or_default();
        if old != resolved {
            changes.push(Change {
                id: *id,
                name: name.clone(),
                old,
                new: resolved,
            });
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");

    for change in &changes {
        println!("\nProduct {} ({})", change.id, change.name);
        println!("    OLD: {}", change.old);
        println!("    NEW: {}", change.new);
    }

    println!("\nProducts to change: {}", changes.len());
    println!("Unresolvable references: {invalid}");

    if changes.is_empty() {
        return Ok(());
    }

    if !apply {
        println!("Dry run, nothing written. Re-run with --apply to persist.");
        return Ok(());
    }

    // all-or-nothing: a failure mid-rewrite must not leave mixed references
    let mut tx = db.begin().await?;

    for change in &changes {
        sqlx::query("UPDATE products SET image = $1, updated_at = now() WHERE id = $2")
            .bind(&change.new)
            .bind(change.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    println!("Updated {} products.", changes.len());
    Ok(())
}

pub async fn sync_media(dir: &Path, overwrite: bool) -> Result<()> {
    let config = RepairConfig::load();
    let db = connect(&config.database_url).await?;
    let cdn = CdnClient::new(config.cdn.clone());

    let files = image_files(dir)?;
    if files.is_empty() {
        println!("No image files found under {}", dir.display());
        return Ok(());
    }

    println!("Uploading {} files to folder '{UPLOAD_FOLDER}'...\n", files.len());

    let pb = progress_bar(files.len() as u64);

    let mut uploaded = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for file_name in &files {
        pb.set_message(file_name.clone());

        let mut targets: Vec<(i32, String)> =
            sqlx::query_as("SELECT id, image FROM products WHERE image LIKE '%' || $1")
                .bind(file_name)
                .fetch_all(&db)
                .await?;

        if !overwrite {
            targets.retain(|(_, image)| !image.contains(CDN_HOST));
        }

        if targets.is_empty() {
            skipped += 1;
            pb.inc(1);
            continue;
        }

        let bytes = match fs::read(dir.join(file_name)) {
            Ok(bytes) => bytes,
            Err(e) => {
                println!("Could not read {file_name}: {e}");
                failed += 1;
                pb.inc(1);
                continue;
            }
        };

        let response = match cdn.upload(file_name, bytes, UPLOAD_FOLDER, overwrite).await {
            Ok(response) => response,
            Err(e) => {
                println!("Upload of {file_name} failed: {e:#}");
                failed += 1;
                pb.inc(1);
                continue;
            }
        };

        for (id, _) in &targets {
            sqlx::query("UPDATE products SET image = $1, updated_at = now() WHERE id = $2")
                .bind(&response.secure_url)
                .bind(id)
                .execute(&db)
                .await?;
        }

        uploaded += 1;
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!("\nUploaded: {uploaded}");
    println!("Skipped (no matching product): {skipped}");
    println!("Failed: {failed}");
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    pb
}

async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .context("could not connect to the database")
}

fn image_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("could not read {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase());

        if extension.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str())) {
            files.push(name);
        }
    }

    files.sort();
    Ok(files)
}
